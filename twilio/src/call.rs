use crate::{non_empty, Client, FromMap, TwilioError};
use reqwest::Method;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Ringing,
    InProgress,
    Canceled,
    Completed,
    Failed,
    Busy,
    NoAnswer,
}

/// A voice call, either from a voice webhook or from the REST call resource.
#[derive(Debug, Deserialize)]
pub struct Call {
    pub from: String,
    pub to: String,
    pub sid: String,
    pub status: CallStatus,
    /// Keypad input collected by a `<Gather>`.
    #[serde(default)]
    pub digits: Option<String>,
}

/// Payload of the `<Record action=...>` webhook.
#[derive(Debug)]
pub struct Recording {
    pub call_sid: String,
    pub from: String,
    pub sid: Option<String>,
    pub url: Option<String>,
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    InProgress,
    Completed,
    Absent,
    Failed,
}

/// Payload of the `recordingStatusCallback` webhook. It carries no caller
/// information, only the call the recording belongs to.
#[derive(Debug)]
pub struct RecordingStatus {
    pub call_sid: String,
    pub sid: String,
    pub status: RecordingState,
    pub url: Option<String>,
    pub duration: u32,
}

impl Client {
    pub async fn fetch_call(&self, sid: &str) -> Result<Call, TwilioError> {
        self.send_request(Method::GET, &format!("Calls/{sid}"), &[])
            .await
    }
}

fn parse_call_status(status: Option<&str>) -> Result<CallStatus, TwilioError> {
    match status {
        Some("queued") => Ok(CallStatus::Queued),
        Some("ringing") => Ok(CallStatus::Ringing),
        Some("in-progress") => Ok(CallStatus::InProgress),
        Some("canceled") => Ok(CallStatus::Canceled),
        Some("completed") => Ok(CallStatus::Completed),
        Some("failed") => Ok(CallStatus::Failed),
        Some("busy") => Ok(CallStatus::Busy),
        Some("no-answer") => Ok(CallStatus::NoAnswer),
        _ => Err(TwilioError::ParsingError),
    }
}

fn parse_duration(value: Option<String>) -> u32 {
    value.and_then(|d| d.trim().parse().ok()).unwrap_or(0)
}

impl FromMap for Call {
    fn from_map(mut m: BTreeMap<String, String>) -> Result<Box<Call>, TwilioError> {
        let from = match m.remove("From") {
            Some(v) => v,
            None => return Err(TwilioError::ParsingError),
        };
        let to = m.remove("To").unwrap_or_default();
        let sid = match m.remove("CallSid") {
            Some(v) => v,
            None => return Err(TwilioError::ParsingError),
        };
        let status = parse_call_status(m.get("CallStatus").map(|s| s.as_str()))?;
        let digits = non_empty(m.remove("Digits"));

        Ok(Box::new(Call {
            from,
            to,
            sid,
            status,
            digits,
        }))
    }
}

impl FromMap for Recording {
    fn from_map(mut m: BTreeMap<String, String>) -> Result<Box<Recording>, TwilioError> {
        Ok(Box::new(Recording {
            call_sid: m.remove("CallSid").unwrap_or_default(),
            from: m.remove("From").unwrap_or_default(),
            sid: non_empty(m.remove("RecordingSid")),
            url: non_empty(m.remove("RecordingUrl")),
            duration: parse_duration(m.remove("RecordingDuration")),
        }))
    }
}

impl FromMap for RecordingStatus {
    fn from_map(mut m: BTreeMap<String, String>) -> Result<Box<RecordingStatus>, TwilioError> {
        let sid = match non_empty(m.remove("RecordingSid")) {
            Some(v) => v,
            None => return Err(TwilioError::ParsingError),
        };
        let status = match m.get("RecordingStatus").map(|s| s.as_str()) {
            Some("in-progress") => RecordingState::InProgress,
            Some("completed") => RecordingState::Completed,
            Some("absent") => RecordingState::Absent,
            Some("failed") => RecordingState::Failed,
            _ => return Err(TwilioError::ParsingError),
        };

        Ok(Box::new(RecordingStatus {
            call_sid: m.remove("CallSid").unwrap_or_default(),
            sid,
            status,
            url: non_empty(m.remove("RecordingUrl")),
            duration: parse_duration(m.remove("RecordingDuration")),
        }))
    }
}
