use super::{format_xml_string, Action, Method};

#[derive(Debug, Clone)]
pub struct Record {
    pub action: Option<String>,
    pub method: Method,
    pub max_length: Option<u32>,
    pub timeout_seconds: Option<u32>,
    pub play_beep: bool,
    pub finish_on_key: Option<String>,
    pub recording_status_callback: Option<String>,
}

impl Action for Record {
    fn as_twiml(&self) -> String {
        let max_length = self.max_length.map(|m| m.to_string());
        let timeout = self.timeout_seconds.map(|t| t.to_string());

        let mut attrs = Vec::new();
        if let Some(ref a) = self.action {
            attrs.push(("action", a.as_str()));
        }
        attrs.push(("method", self.method.as_str()));
        if let Some(ref m) = max_length {
            attrs.push(("maxLength", m.as_str()));
        }
        attrs.push(("playBeep", if self.play_beep { "true" } else { "false" }));
        if let Some(ref t) = timeout {
            attrs.push(("timeout", t.as_str()));
        }
        if let Some(ref k) = self.finish_on_key {
            attrs.push(("finishOnKey", k.as_str()));
        }
        if let Some(ref c) = self.recording_status_callback {
            attrs.push(("recordingStatusCallback", c.as_str()));
            attrs.push(("recordingStatusCallbackMethod", "POST"));
        }

        format_xml_string("Record", &attrs, "")
    }
}

impl Default for Record {
    fn default() -> Record {
        Record {
            action: None,
            method: Method::Post,
            max_length: None,
            timeout_seconds: None,
            play_beep: true,
            finish_on_key: None,
            recording_status_callback: None,
        }
    }
}
