//! Internal helpers for input validation.
//!
//! These utilities are **not** part of the public API.

use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

/// Trim `value` and reject it when empty.
pub(crate) fn required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Trimmed, NFC-normalised display name.
///
/// Names typed on phones mix composed and decomposed accents ("Adéolá");
/// normalising keeps lookups and unique checks stable.
pub(crate) fn display_name(value: &str, label: &str) -> ResultEngine<String> {
    let name: String = required_text(value, label)?.nfc().collect();
    Ok(name)
}

/// Trim `value`, mapping blank strings to `None`.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected_or_dropped() {
        assert!(required_text("   ", "reason").is_err());
        assert_eq!(required_text(" payout ", "reason").unwrap(), "payout");
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" RC123 ")), Some("RC123".to_string()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn display_names_are_nfc() {
        let decomposed = "Ade\u{301}ola";
        assert_eq!(display_name(decomposed, "name").unwrap(), "Ad\u{e9}ola");
    }
}
