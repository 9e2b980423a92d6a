use super::{format_xml_string, Action, Method, Say};
use std::default::Default;

#[derive(Debug, Clone)]
pub enum Prompt {
    Nothing,
    Say(Say),
}

#[derive(Debug, Clone)]
pub struct Gather {
    pub action: Option<String>,
    pub input: Option<GatherInput>,
    pub method: Method,
    pub timeout_seconds: u32,
    pub num_digits: Option<u32>,
    pub prompt: Prompt,
}

impl Action for Gather {
    fn as_twiml(&self) -> String {
        let timeout_string = format!("{}", self.timeout_seconds);
        let digits_string = self.num_digits.map(|d| format!("{}", d));
        let mut attrs = Vec::new();
        if let Some(ref a) = self.action {
            attrs.push(("action", a.as_str()));
        }
        attrs.push(("method", self.method.as_str()));
        attrs.push(("timeout", timeout_string.as_str()));
        if let Some(ref d) = digits_string {
            attrs.push(("numDigits", d.as_str()));
        }

        if let Some(ref i) = self.input {
            let input_str = match i {
                GatherInput::Dtmf => "dtmf",
                GatherInput::Speech => "speech",
                GatherInput::DtmfSpeech => "dtmf speech",
            };
            attrs.push(("input", input_str));
        }

        let inner = match self.prompt {
            Prompt::Nothing => "".to_string(),
            Prompt::Say(ref s) => s.as_twiml(),
        };

        format_xml_string("Gather", &attrs, &inner)
    }
}

impl Default for Gather {
    fn default() -> Gather {
        Gather {
            action: None,
            input: None,
            method: Method::Post,
            timeout_seconds: 5,
            num_digits: None,
            prompt: Prompt::Nothing,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum GatherInput {
    Dtmf,
    Speech,
    DtmfSpeech,
}
