use crate::CONFIG;

/// Static directory of known team numbers, used to put a name on inbound
/// calls and messages.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    // (normalized number, display name)
    entries: Vec<(String, String)>,
}

/// Display name for events that carry no caller number.
pub const UNKNOWN_SENDER: &str = "Unknown Caller";

impl Directory {
    /// Parse `number=name` pairs separated by commas. Malformed pairs are
    /// skipped.
    pub fn parse(entries: &str) -> Self {
        let entries = entries
            .split(',')
            .filter(|pair| !pair.trim().is_empty())
            .filter_map(|pair| {
                let parsed = pair.split_once('=').and_then(|(number, name)| {
                    let number = normalize(number);
                    let name = name.trim();
                    (!number.is_empty() && !name.is_empty()).then(|| (number, name.to_string()))
                });
                if parsed.is_none() {
                    log::warn!("Ignoring malformed sender directory entry {pair:?}");
                }
                parsed
            })
            .collect();

        Self { entries }
    }

    /// The environment override when set, otherwise the compiled-in default.
    pub fn from_config(env_override: Option<&str>) -> Self {
        Self::parse(env_override.unwrap_or(CONFIG.settings.sender_directory))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolve a display name for a raw phone number. Never fails: unknown
    /// numbers become `User-` followed by their last four digits, and a
    /// missing number becomes [`UNKNOWN_SENDER`].
    pub fn resolve(&self, phone_number: &str) -> String {
        let clean = normalize(phone_number);
        if clean.is_empty() {
            return UNKNOWN_SENDER.to_string();
        }

        if let Some((_, name)) = self
            .entries
            .iter()
            .find(|(known, _)| clean.contains(known.as_str()))
        {
            return name.clone();
        }

        let tail: String = clean
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("User-{tail}")
    }
}

/// Strip the `+1` country code and formatting punctuation.
pub fn normalize(phone_number: &str) -> String {
    phone_number
        .replace("+1", "")
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect()
}
