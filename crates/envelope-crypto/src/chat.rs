use crate::error::{Result, VerifyError};
use crate::signature::sorted_sha1;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Wire envelope for an encrypted chat callback or reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    pub encrypt: String,
    pub msg_signature: String,
    pub timestamp: String,
    pub nonce: String,
}

/// Chat vendor envelope codec with receiver binding.
///
/// The encrypted block is 16 random bytes, a 4-byte big-endian message
/// length, the message, then the receiver id. Decryption rejects envelopes
/// whose embedded receiver id is not ours.
#[derive(Debug)]
pub struct ChatCrypto {
    token: String,
    key: [u8; 32],
    receiver_id: String,
}

impl ChatCrypto {
    /// `aes_key_b64` is the vendor's 43-character key, base64 minus padding
    pub fn new(
        token: impl Into<String>,
        aes_key_b64: &str,
        receiver_id: impl Into<String>,
    ) -> Result<Self> {
        let decoded = BASE64
            .decode(format!("{aes_key_b64}="))
            .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
        let key: [u8; 32] = decoded
            .try_into()
            .map_err(|_| VerifyError::InvalidKey("key must decode to 32 bytes".to_string()))?;
        Ok(Self { token: token.into(), key, receiver_id: receiver_id.into() })
    }

    /// URL-verification handshake: verify the signature over the echo string
    /// and return its decrypted plaintext
    pub fn verify_url(
        &self,
        msg_signature: &str,
        timestamp: &str,
        nonce: &str,
        echostr: &str,
    ) -> Result<String> {
        self.verify_and_decrypt(msg_signature, timestamp, nonce, echostr)
    }

    /// Verify the envelope signature, decrypt, and enforce receiver binding.
    ///
    /// A signature mismatch returns before any decryption work.
    pub fn verify_and_decrypt(
        &self,
        msg_signature: &str,
        timestamp: &str,
        nonce: &str,
        ciphertext: &str,
    ) -> Result<String> {
        let expected = sorted_sha1(&self.token, timestamp, nonce, ciphertext);
        if expected != msg_signature {
            return Err(VerifyError::SignatureMismatch);
        }

        let (message, receiver) = self.decrypt(ciphertext)?;
        if receiver != self.receiver_id {
            return Err(VerifyError::ReceiverMismatch {
                expected: self.receiver_id.clone(),
                actual: receiver,
            });
        }
        Ok(message)
    }

    /// Encrypt a reply and wrap it in a signed wire envelope
    pub fn encrypt_reply(
        &self,
        plaintext: &str,
        timestamp: &str,
        nonce: &str,
    ) -> Result<ChatEnvelope> {
        let msg = plaintext.as_bytes();
        let mut block = Vec::with_capacity(20 + msg.len() + self.receiver_id.len());
        let mut random = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut random);
        block.extend_from_slice(&random);
        block.extend_from_slice(&(msg.len() as u32).to_be_bytes());
        block.extend_from_slice(msg);
        block.extend_from_slice(self.receiver_id.as_bytes());

        let cipher = Aes256CbcEnc::new_from_slices(&self.key, &self.key[..16])
            .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
        let encrypt = BASE64.encode(cipher.encrypt_padded_vec_mut::<Pkcs7>(&block));
        let msg_signature = sorted_sha1(&self.token, timestamp, nonce, &encrypt);

        Ok(ChatEnvelope {
            encrypt,
            msg_signature,
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
        })
    }

    fn decrypt(&self, ciphertext: &str) -> Result<(String, String)> {
        let raw = BASE64
            .decode(ciphertext)
            .map_err(|e| VerifyError::MalformedEnvelope(format!("ciphertext base64: {e}")))?;
        let cipher = Aes256CbcDec::new_from_slices(&self.key, &self.key[..16])
            .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
        let block = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&raw)
            .map_err(|_| VerifyError::DecryptionFailed("bad padding".to_string()))?;

        if block.len() < 20 {
            return Err(VerifyError::MalformedEnvelope("block shorter than header".to_string()));
        }
        let msg_len =
            u32::from_be_bytes([block[16], block[17], block[18], block[19]]) as usize;
        let msg_end = 20usize
            .checked_add(msg_len)
            .filter(|end| *end <= block.len())
            .ok_or_else(|| VerifyError::MalformedEnvelope("message length out of range".to_string()))?;

        let message = String::from_utf8(block[20..msg_end].to_vec())
            .map_err(|e| VerifyError::DecryptionFailed(format!("message not utf-8: {e}")))?;
        let receiver = String::from_utf8(block[msg_end..].to_vec())
            .map_err(|e| VerifyError::DecryptionFailed(format!("receiver not utf-8: {e}")))?;
        Ok((message, receiver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 43 characters, the vendor's key format
    const KEY_B64: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY";

    fn crypto(receiver: &str) -> ChatCrypto {
        ChatCrypto::new("chat-token", KEY_B64, receiver).unwrap()
    }

    #[test]
    fn reply_envelope_round_trips() {
        let c = crypto("corp-1");
        let envelope = c.encrypt_reply(r#"{"msg_type":"text","content":"ok"}"#, "1715400000", "n1").unwrap();

        let plain = c
            .verify_and_decrypt(&envelope.msg_signature, &envelope.timestamp, &envelope.nonce, &envelope.encrypt)
            .unwrap();

        assert_eq!(plain, r#"{"msg_type":"text","content":"ok"}"#);
    }

    #[test]
    fn wrong_token_fails_before_decryption() {
        let c = crypto("corp-1");
        let envelope = c.encrypt_reply("hello", "1715400000", "n1").unwrap();

        let other = ChatCrypto::new("other-token", KEY_B64, "corp-1").unwrap();
        let err = other
            .verify_and_decrypt(&envelope.msg_signature, &envelope.timestamp, &envelope.nonce, "!!garbage!!")
            .unwrap_err();

        assert_eq!(err, VerifyError::SignatureMismatch);
    }

    #[test]
    fn foreign_receiver_id_is_rejected() {
        let sender = crypto("corp-other");
        let envelope = sender.encrypt_reply("hello", "1715400000", "n1").unwrap();

        let receiver = crypto("corp-1");
        let err = receiver
            .verify_and_decrypt(&envelope.msg_signature, &envelope.timestamp, &envelope.nonce, &envelope.encrypt)
            .unwrap_err();

        assert!(matches!(err, VerifyError::ReceiverMismatch { .. }));
    }

    #[test]
    fn url_verification_returns_the_echo_plaintext() {
        let c = crypto("corp-1");
        let envelope = c.encrypt_reply("random-echo-string", "1715400000", "n1").unwrap();

        let echoed = c
            .verify_url(&envelope.msg_signature, &envelope.timestamp, &envelope.nonce, &envelope.encrypt)
            .unwrap();

        assert_eq!(echoed, "random-echo-string");
    }

    #[test]
    fn key_must_decode_to_32_bytes() {
        let err = ChatCrypto::new("t", "c2hvcnQ", "corp-1").unwrap_err();
        assert!(matches!(err, VerifyError::InvalidKey(_)));
    }
}
