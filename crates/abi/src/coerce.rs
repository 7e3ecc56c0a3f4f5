//! Turns raw user text into candidate argument values.

use crate::descriptor::TypeDescriptor;

/// A structured argument value, as sent to the engine.
pub type CandidateValue = serde_json::Value;

/// Coerce raw input text into a candidate value for the declared type.
///
/// `field` and `uN` leaves keep the raw text as a JSON string, untouched:
/// their literals may exceed any machine integer. Every other type is parsed
/// as a JSON literal; unparseable text is kept as a string so the validator
/// can report it. Never fails.
pub fn coerce(ty: &TypeDescriptor, raw: &str) -> CandidateValue {
    if ty.is_numeric_text() {
        return CandidateValue::String(raw.to_string());
    }
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::trace!(ty = %ty, error = %e, "input is not a JSON literal; keeping raw text");
            CandidateValue::String(raw.to_string())
        }
    }
}
