use super::{escape_xml, format_xml_string, Action};

/// Reply to an inbound SMS/MMS.
#[derive(Debug, Clone)]
pub struct Message {
    pub txt: String,
}

impl Message {
    pub fn new(txt: impl Into<String>) -> Message {
        Message { txt: txt.into() }
    }
}

impl Action for Message {
    fn as_twiml(&self) -> String {
        format_xml_string("Message", &[], &escape_xml(&self.txt))
    }
}
