use crate::{FromMap, TwilioError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub url: String,
    pub content_type: String,
}

/// Inbound SMS/MMS webhook payload.
#[derive(Debug)]
pub struct Message {
    pub sid: String,
    pub from: String,
    pub to: String,
    pub body: String,
    pub media: Vec<MediaAttachment>,
}

/// Twilio never sends more than ten attachments per message.
pub const MAX_MEDIA: usize = 10;

impl FromMap for Message {
    fn from_map(mut m: BTreeMap<String, String>) -> Result<Box<Message>, TwilioError> {
        let num_media: usize = m
            .get("NumMedia")
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0);

        // Partial attachments are kept so the caller can report them,
        // a missing type is left empty
        let media = (0..num_media.min(MAX_MEDIA))
            .filter_map(|i| {
                let url = m.remove(&format!("MediaUrl{i}")).unwrap_or_default();
                let content_type = m
                    .remove(&format!("MediaContentType{i}"))
                    .unwrap_or_default();
                if url.trim().is_empty() && content_type.trim().is_empty() {
                    return None;
                }
                Some(MediaAttachment {
                    url: url.trim().to_string(),
                    content_type: content_type.trim().to_string(),
                })
            })
            .collect();

        Ok(Box::new(Message {
            sid: m
                .remove("MessageSid")
                .or_else(|| m.remove("SmsSid"))
                .unwrap_or_default(),
            from: m.remove("From").unwrap_or_default(),
            to: m.remove("To").unwrap_or_default(),
            body: m.remove("Body").unwrap_or_default(),
            media,
        }))
    }
}
