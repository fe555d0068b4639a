use serde::Deserialize;

/// Decrypted meeting-vendor webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingEvent {
    pub event: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub payload: Vec<MeetingEventPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingEventPayload {
    #[serde(default)]
    pub operate_time: i64,
    pub meeting_info: MeetingInfo,
    #[serde(default)]
    pub recording_files: Vec<RecordingFileRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingInfo {
    pub meeting_id: String,
    #[serde(default)]
    pub meeting_code: String,
    #[serde(default)]
    pub subject: String,
    pub creator: MeetingCreator,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
    #[serde(default)]
    pub sub_meeting_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingCreator {
    pub userid: String,
    #[serde(default)]
    pub user_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingFileRef {
    pub record_file_id: String,
}

/// Decrypted chat-vendor callback message
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub msg_type: String,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub change_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub from_user: Option<String>,
    #[serde(default)]
    pub to_user: Option<String>,
    #[serde(default)]
    pub create_time: i64,
}

/// Payment vendor event envelope (already signature-verified)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEventData {
    pub object: CheckoutSession,
}

/// The completed checkout session carried by the event
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub amount_total: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}
