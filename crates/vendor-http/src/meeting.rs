use crate::config::MeetingApiConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::{
    DomainError, DomainResult, MeetingDetail, Participant, RecordMeeting, RecordingArtifacts,
    RecordingPage, RecordingSource,
};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, instrument};

type HmacSha256 = Hmac<Sha256>;

/// The vendor rejects listing windows wider than this
const MAX_WINDOW_SECS: i64 = 31 * 86_400;
const MAX_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
struct ErrorInfo {
    error_code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_info: ErrorInfo,
}

#[derive(Debug, Deserialize)]
struct RecordsPageDto {
    #[serde(default)]
    current_page: u32,
    #[serde(default)]
    total_page: u32,
    #[serde(default)]
    record_meetings: Vec<RecordMeeting>,
}

#[derive(Debug, Deserialize, Default)]
struct FileVariant {
    #[serde(default)]
    file_type: String,
    #[serde(default)]
    download_address: String,
}

#[derive(Debug, Deserialize, Default)]
struct AddressesDto {
    #[serde(default)]
    ai_meeting_summary: Vec<FileVariant>,
    #[serde(default)]
    ai_meeting_transcripts: Vec<FileVariant>,
    #[serde(default)]
    ai_minutes: Vec<FileVariant>,
}

#[derive(Debug, Deserialize)]
struct MeetingInfoDto {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    start_time: i64,
    #[serde(default)]
    end_time: i64,
}

#[derive(Debug, Deserialize)]
struct MeetingDetailDto {
    #[serde(default)]
    meeting_info_list: Vec<MeetingInfoDto>,
}

#[derive(Debug, Deserialize)]
struct ParticipantsDto {
    #[serde(default)]
    participants: Vec<Participant>,
}

/// Meeting vendor API client with per-request HMAC signing
pub struct MeetingClient {
    http: reqwest::Client,
    config: MeetingApiConfig,
}

impl MeetingClient {
    pub fn new(http: reqwest::Client, config: MeetingApiConfig) -> Self {
        Self { http, config }
    }

    /// Signature over `"{method}\n{signed headers}\n{uri}\n{body}"`:
    /// HMAC-SHA256 hex, then base64 of the hex string
    fn sign(
        &self,
        method: &str,
        uri: &str,
        body: &str,
        timestamp: &str,
        nonce: &str,
    ) -> DomainResult<String> {
        let header_string = format!(
            "X-TC-Key={}&X-TC-Nonce={nonce}&X-TC-Timestamp={timestamp}",
            self.config.secret_id
        );
        let string_to_sign = format!("{method}\n{header_string}\n{uri}\n{body}");
        let mut mac = HmacSha256::new_from_slice(self.config.secret_key.as_bytes())
            .map_err(|e| DomainError::SourceError(format!("hmac key: {e}")))?;
        mac.update(string_to_sign.as_bytes());
        let hex_digest = hex::encode(mac.finalize().into_bytes());
        Ok(BASE64.encode(hex_digest.as_bytes()))
    }

    async fn get_signed<T: DeserializeOwned>(&self, uri: &str) -> DomainResult<T> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let nonce = rand::thread_rng().gen_range(100_000..1_000_000u32).to_string();
        let signature = self.sign("GET", uri, "", &timestamp, &nonce)?;

        let mut request = self
            .http
            .get(format!("{}{uri}", self.config.base_url))
            .header("Content-Type", "application/json")
            .header("X-TC-Key", &self.config.secret_id)
            .header("X-TC-Timestamp", &timestamp)
            .header("X-TC-Nonce", &nonce)
            .header("X-TC-Signature", &signature)
            .header("AppId", &self.config.app_id)
            .header("X-TC-Registered", "1");
        if let Some(sdk_id) = &self.config.sdk_id {
            request = request.header("SdkId", sdk_id);
        }

        let text = request
            .send()
            .await
            .map_err(|e| DomainError::SourceError(format!("GET {uri}: {e}")))?
            .text()
            .await
            .map_err(|e| DomainError::SourceError(format!("GET {uri} body: {e}")))?;

        // Errors arrive as 200s with an error_info body
        if let Ok(err) = serde_json::from_str::<ErrorBody>(&text) {
            return Err(DomainError::VendorApi {
                code: err.error_info.error_code,
                message: err.error_info.message,
            });
        }
        serde_json::from_str(&text)
            .map_err(|e| DomainError::SourceError(format!("GET {uri} decode: {e}")))
    }

    fn txt_address(variants: &[FileVariant]) -> Option<String> {
        variants
            .iter()
            .find(|v| v.file_type == "txt")
            .map(|v| v.download_address.clone())
            .filter(|addr| !addr.is_empty())
    }
}

#[async_trait]
impl RecordingSource for MeetingClient {
    #[instrument(skip(self))]
    async fn list_recordings(
        &self,
        start: i64,
        end: i64,
        page_size: u32,
        page: u32,
    ) -> DomainResult<RecordingPage> {
        if end <= start {
            return Err(DomainError::ValidationError(
                "end_time must be after start_time".to_string(),
            ));
        }
        if end - start > MAX_WINDOW_SECS {
            return Err(DomainError::ValidationError(
                "listing window must not exceed 31 days".to_string(),
            ));
        }
        if page_size > MAX_PAGE_SIZE {
            return Err(DomainError::ValidationError(format!(
                "page_size must not exceed {MAX_PAGE_SIZE}"
            )));
        }

        let uri = format!(
            "/v1/corp/records?start_time={start}&end_time={end}&page_size={page_size}&page={page}"
        );
        let dto: RecordsPageDto = self.get_signed(&uri).await?;
        debug!(
            current_page = dto.current_page,
            total_page = dto.total_page,
            meetings = dto.record_meetings.len(),
            "listed recordings page"
        );
        Ok(RecordingPage {
            meetings: dto.record_meetings,
            current_page: dto.current_page,
            total_page: dto.total_page,
        })
    }

    #[instrument(skip(self))]
    async fn get_recording_artifacts(
        &self,
        record_file_id: &str,
        operator_id: &str,
    ) -> DomainResult<RecordingArtifacts> {
        let uri = format!("/v1/addresses/{record_file_id}?userid={operator_id}");
        let dto: AddressesDto = self.get_signed(&uri).await?;
        Ok(RecordingArtifacts {
            summary_url: Self::txt_address(&dto.ai_meeting_summary),
            transcript_url: Self::txt_address(&dto.ai_meeting_transcripts),
            minutes_url: Self::txt_address(&dto.ai_minutes),
        })
    }

    #[instrument(skip(self))]
    async fn get_meeting_detail(
        &self,
        meeting_id: &str,
        operator_id: &str,
    ) -> DomainResult<MeetingDetail> {
        let uri = format!("/v1/meetings/{meeting_id}?userid={operator_id}&instanceid=1");
        let dto: MeetingDetailDto = self.get_signed(&uri).await?;
        let info = dto
            .meeting_info_list
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::SourceError(format!("meeting {meeting_id} not found")))?;
        Ok(MeetingDetail {
            meeting_id: meeting_id.to_string(),
            subject: info.subject,
            start_time: info.start_time,
            end_time: info.end_time,
        })
    }

    #[instrument(skip(self))]
    async fn get_participants<'a>(
        &self,
        meeting_id: &str,
        operator_id: &str,
        sub_meeting_id: Option<&'a str>,
    ) -> DomainResult<Vec<Participant>> {
        let mut uri = format!("/v1/meetings/{meeting_id}/participants?userid={operator_id}");
        if let Some(sub) = sub_meeting_id {
            uri.push_str(&format!("&sub_meeting_id={sub}"));
        }
        let dto: ParticipantsDto = self.get_signed(&uri).await?;
        Ok(dto.participants)
    }
}
