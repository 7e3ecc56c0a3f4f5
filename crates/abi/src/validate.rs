//! Applies compiled rules to candidate values.
//!
//! Structural only: shape, pattern and length. Whether a value satisfies
//! the program's constraints is decided by the engine at compute time.

use crate::coerce::CandidateValue;
use crate::schema::ValidationRule;

/// Outcome of validating one candidate value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub valid: bool,
    /// One line per violation; empty when valid.
    pub diagnostic: String,
}

impl Verdict {
    pub fn valid() -> Self {
        Verdict {
            valid: true,
            diagnostic: String::new(),
        }
    }

    pub fn invalid(diagnostic: impl Into<String>) -> Self {
        Verdict {
            valid: false,
            diagnostic: diagnostic.into(),
        }
    }
}

impl ValidationRule {
    /// Validate a candidate value. Never fails; violations become the verdict.
    pub fn validate(&self, value: &CandidateValue) -> Verdict {
        let errors: Vec<String> = self
            .validator()
            .iter_errors(value)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Verdict::valid()
        } else {
            Verdict::invalid(errors.join("\n"))
        }
    }
}
