mod gather;
mod hangup;
mod message;
mod record;
mod say;

pub use gather::{Gather, GatherInput, Prompt};
pub use hangup::Hangup;
pub use message::Message;
pub use record::Record;
pub use say::{Say, Voice};

pub trait Action {
    fn as_twiml(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub enum Method {
    Get,
    #[default]
    Post,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A TwiML `<Response>` document assembled from verbs.
#[derive(Debug, Clone, Default)]
pub struct Twiml {
    body: String,
}

impl Twiml {
    pub fn new() -> Twiml {
        Twiml::default()
    }

    pub fn add(&mut self, action: &impl Action) -> &mut Twiml {
        self.body.push_str(&action.as_twiml());
        self
    }

    pub fn as_twiml(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>{}</Response>",
            self.body
        )
    }
}

/// Escape text for use in XML character data and attribute values.
pub fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `inner` is inserted verbatim, callers escape text content themselves.
fn format_xml_string(tag: &str, attributes: &[(&str, &str)], inner: &str) -> String {
    let attrs: String = attributes
        .iter()
        .map(|(name, value)| format!(" {}=\"{}\"", name, escape_xml(value)))
        .collect();

    if inner.is_empty() {
        format!("<{tag}{attrs}/>")
    } else {
        format!("<{tag}{attrs}>{inner}</{tag}>")
    }
}
