use crate::error::{Result, VerifyError};
use crate::signature::sorted_sha1;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// A sealed payload as the vendor would send it
#[derive(Debug, Clone, PartialEq)]
pub struct SealedPayload {
    pub payload: String,
    pub signature: String,
}

/// Meeting vendor envelope codec.
///
/// Signature covers the sorted concatenation of token, timestamp, nonce and
/// the base64 ciphertext. The AES key is the base64-decoded secret laid into
/// a zero-padded 32-byte buffer, and the IV is the key's first 16 bytes.
pub struct MeetingCrypto {
    token: String,
    key: [u8; 32],
}

impl MeetingCrypto {
    pub fn new(token: impl Into<String>, aes_key_b64: &str) -> Result<Self> {
        let decoded = BASE64
            .decode(aes_key_b64)
            .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
        let mut key = [0u8; 32];
        let len = decoded.len().min(32);
        key[..len].copy_from_slice(&decoded[..len]);
        Ok(Self { token: token.into(), key })
    }

    /// Verify the envelope signature, then decrypt the payload.
    ///
    /// A signature mismatch returns before any decryption work.
    pub fn verify_and_decrypt(
        &self,
        timestamp: &str,
        nonce: &str,
        payload: &str,
        signature: &str,
    ) -> Result<String> {
        let expected = sorted_sha1(&self.token, timestamp, nonce, payload);
        if expected != signature {
            return Err(VerifyError::SignatureMismatch);
        }
        self.decrypt(payload)
    }

    /// The inverse of `verify_and_decrypt`: encrypt and sign a plaintext
    pub fn seal(&self, timestamp: &str, nonce: &str, plaintext: &str) -> Result<SealedPayload> {
        let cipher = Aes256CbcEnc::new_from_slices(&self.key, &self.key[..16])
            .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        let payload = BASE64.encode(ciphertext);
        let signature = sorted_sha1(&self.token, timestamp, nonce, &payload);
        Ok(SealedPayload { payload, signature })
    }

    fn decrypt(&self, payload: &str) -> Result<String> {
        let ciphertext = BASE64
            .decode(payload)
            .map_err(|e| VerifyError::MalformedEnvelope(format!("payload base64: {e}")))?;
        let cipher = Aes256CbcDec::new_from_slices(&self.key, &self.key[..16])
            .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| VerifyError::DecryptionFailed("bad padding".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| VerifyError::DecryptionFailed(format!("not utf-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_B64: &str = "dGVzdC1hZXMta2V5LW1hdGVyaWFsLTMyLWJ5dGVzISE=";

    #[test]
    fn seal_then_verify_round_trips() {
        let crypto = MeetingCrypto::new("cb-token", KEY_B64).unwrap();
        let sealed = crypto.seal("1715400000", "nonce-1", r#"{"event":"recording.completed"}"#).unwrap();

        let plain = crypto
            .verify_and_decrypt("1715400000", "nonce-1", &sealed.payload, &sealed.signature)
            .unwrap();

        assert_eq!(plain, r#"{"event":"recording.completed"}"#);
    }

    #[test]
    fn wrong_token_fails_before_decryption() {
        let sender = MeetingCrypto::new("cb-token", KEY_B64).unwrap();
        let sealed = sender.seal("1715400000", "nonce-1", "check-me").unwrap();

        let receiver = MeetingCrypto::new("other-token", KEY_B64).unwrap();
        // Payload is not even valid base64; a signature mismatch must win
        let err = receiver
            .verify_and_decrypt("1715400000", "nonce-1", "!!not-base64!!", &sealed.signature)
            .unwrap_err();

        assert_eq!(err, VerifyError::SignatureMismatch);
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let crypto = MeetingCrypto::new("cb-token", KEY_B64).unwrap();
        let sealed = crypto.seal("1715400000", "nonce-1", "original").unwrap();

        let mut tampered = sealed.payload.clone();
        tampered.push('A');
        let err = crypto
            .verify_and_decrypt("1715400000", "nonce-1", &tampered, &sealed.signature)
            .unwrap_err();

        assert_eq!(err, VerifyError::SignatureMismatch);
    }

    #[test]
    fn wrong_key_never_yields_the_plaintext() {
        let sender = MeetingCrypto::new("cb-token", KEY_B64).unwrap();
        let sealed = sender.seal("1715400000", "nonce-1", "secret message").unwrap();

        // Same token so the signature passes, different key material
        let receiver =
            MeetingCrypto::new("cb-token", "b3RoZXIta2V5LW1hdGVyaWFsLTMyLWJ5dGVzLWxvbmch").unwrap();
        let result =
            receiver.verify_and_decrypt("1715400000", "nonce-1", &sealed.payload, &sealed.signature);

        assert_ne!(result.ok().as_deref(), Some("secret message"));
    }

    #[test]
    fn short_key_material_is_zero_padded() {
        let crypto = MeetingCrypto::new("tok", "c2hvcnQ=").unwrap();
        let sealed = crypto.seal("1", "n", "hi").unwrap();
        let plain = crypto.verify_and_decrypt("1", "n", &sealed.payload, &sealed.signature).unwrap();
        assert_eq!(plain, "hi");
    }

    #[test]
    fn multibyte_plaintext_round_trips() {
        let crypto = MeetingCrypto::new("cb-token", KEY_B64).unwrap();
        let sealed = crypto.seal("2", "n2", "会议录制完成").unwrap();
        let plain = crypto.verify_and_decrypt("2", "n2", &sealed.payload, &sealed.signature).unwrap();
        assert_eq!(plain, "会议录制完成");
    }
}
