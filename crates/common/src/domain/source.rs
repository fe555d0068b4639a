use crate::domain::result::DomainResult;
use async_trait::async_trait;
use serde::Deserialize;

/// One recording file attached to a meeting
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordingFile {
    pub record_file_id: String,
    #[serde(default)]
    pub record_start_time: i64,
    #[serde(default)]
    pub record_end_time: i64,
}

/// A meeting entry from the corp-level recordings listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordMeeting {
    pub meeting_id: String,
    #[serde(default)]
    pub meeting_code: String,
    #[serde(default)]
    pub userid: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub media_start_time: i64,
    #[serde(default)]
    pub record_files: Vec<RecordingFile>,
}

/// One page of the recordings listing
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingPage {
    pub meetings: Vec<RecordMeeting>,
    pub current_page: u32,
    pub total_page: u32,
}

/// Text-transcript download addresses for one recording file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordingArtifacts {
    pub summary_url: Option<String>,
    pub transcript_url: Option<String>,
    pub minutes_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeetingDetail {
    pub meeting_id: String,
    pub subject: String,
    pub start_time: i64,
    pub end_time: i64,
}

/// A meeting participant; `user_name` arrives base64-encoded from the vendor
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub userid: String,
    pub user_name: String,
}

/// Meeting vendor API, read side
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RecordingSource: Send + Sync {
    /// List corp recordings in `[start, end]` (unix seconds). The vendor
    /// rejects ranges wider than 31 days and caps page size at 20.
    async fn list_recordings(
        &self,
        start: i64,
        end: i64,
        page_size: u32,
        page: u32,
    ) -> DomainResult<RecordingPage>;

    /// Download addresses for a recording file's text artifacts
    async fn get_recording_artifacts(
        &self,
        record_file_id: &str,
        operator_id: &str,
    ) -> DomainResult<RecordingArtifacts>;

    async fn get_meeting_detail(
        &self,
        meeting_id: &str,
        operator_id: &str,
    ) -> DomainResult<MeetingDetail>;

    async fn get_participants<'a>(
        &self,
        meeting_id: &str,
        operator_id: &str,
        sub_meeting_id: Option<&'a str>,
    ) -> DomainResult<Vec<Participant>>;
}

/// A group chat as listed (id plus lifecycle status)
#[derive(Debug, Clone, PartialEq)]
pub struct GroupChatSummary {
    pub chat_id: String,
    pub status: i64,
}

/// Full group chat detail
#[derive(Debug, Clone, PartialEq)]
pub struct GroupChat {
    pub chat_id: String,
    pub name: String,
    pub owner: String,
    pub create_time: i64,
    pub notice: String,
    pub member_count: usize,
    pub admin_count: usize,
    pub member_version: String,
}

/// Chat vendor API, read side
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait GroupChatSource: Send + Sync {
    /// Full listing; implementations follow the vendor's cursor pagination
    async fn list_group_chats(&self) -> DomainResult<Vec<GroupChatSummary>>;

    async fn get_group_chat(&self, chat_id: &str) -> DomainResult<GroupChat>;
}
