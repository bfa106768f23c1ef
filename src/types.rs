use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Entity identifier
pub type EntityId = String;

/// Voice session identifier, unique per client connection
pub type SessionId = u32;

/// Language keyed text, e.g. `{"en": "Living room", "de": "Wohnzimmer"}`
///
/// Keeps the order of the source document.
pub type LanguageText = IndexMap<String, String>;

/// Attribute map of an entity
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Identifier of a connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Device state of the integration driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
    Connected,
    Connecting,
    #[default]
    Disconnected,
    Error,
}

/// Conversion into a [`LanguageText`]
///
/// Plain strings become an English text.
pub trait IntoLanguageText {
    fn into_language_text(self) -> LanguageText;
}

impl IntoLanguageText for LanguageText {
    fn into_language_text(self) -> LanguageText {
        self
    }
}

impl IntoLanguageText for &str {
    fn into_language_text(self) -> LanguageText {
        self.to_string().into_language_text()
    }
}

impl IntoLanguageText for String {
    fn into_language_text(self) -> LanguageText {
        let mut text = LanguageText::new();
        text.insert("en".to_string(), self);
        text
    }
}

impl<const N: usize> IntoLanguageText for [(&str, &str); N] {
    fn into_language_text(self) -> LanguageText {
        self.into_iter()
            .map(|(lang, text)| (lang.to_string(), text.to_string()))
            .collect()
    }
}

/// Pick the default language string of a text.
///
/// Prefers `en`, then any `en-*` variant, then the first entry.
pub fn default_language_string(text: Option<&LanguageText>, fallback: &str) -> String {
    let Some(text) = text else {
        return fallback.to_string();
    };

    if let Some(en) = text.get("en") {
        return en.clone();
    }

    text.iter()
        .find(|(lang, _)| lang.starts_with("en-"))
        .or_else(|| text.iter().next())
        .map_or_else(|| fallback.to_string(), |(_, value)| value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_string_becomes_english() {
        let text = "Hello".into_language_text();
        assert_eq!(text.get("en").map(String::as_str), Some("Hello"));
        assert_eq!(text.len(), 1);
    }

    #[test]
    fn default_language_prefers_en() {
        let text = [("de", "Hallo"), ("en", "Hello")].into_language_text();
        assert_eq!(default_language_string(Some(&text), "x"), "Hello");
    }

    #[test]
    fn default_language_falls_back_to_en_variant_then_first() {
        let text = [("de", "Hallo"), ("en-US", "Howdy")].into_language_text();
        assert_eq!(default_language_string(Some(&text), "x"), "Howdy");

        let text = [("fr", "Bonjour"), ("it", "Ciao")].into_language_text();
        assert_eq!(default_language_string(Some(&text), "x"), "Bonjour");

        let text: LanguageText = serde_json::from_str(r#"{"fr": "Bonjour", "de": "Hallo"}"#).unwrap();
        assert_eq!(default_language_string(Some(&text), "x"), "Bonjour");

        assert_eq!(default_language_string(None, "Unknown driver"), "Unknown driver");
        assert_eq!(
            default_language_string(Some(&LanguageText::new()), "Unknown driver"),
            "Unknown driver"
        );
    }

    #[test]
    fn device_state_wire_names() {
        assert_eq!(
            serde_json::to_value(DeviceState::Connected).ok(),
            Some(serde_json::json!("CONNECTED"))
        );
    }
}
