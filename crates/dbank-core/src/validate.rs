//! # Declarative Field Validation
//!
//! Small vocabulary of field checks used by the per-input validators in
//! the API crate. A validator runs every check and collects all failures
//! into a [`Violations`] list — a request with three bad fields reports
//! three violations, not one.
//!
//! The patterns are narrow enough (digit runs, IBAN shape, month stamps)
//! that they are checked with plain character predicates rather than a
//! regex engine.

use serde::{Deserialize, Serialize};

/// A single violated constraint, tagged with the input field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The full set of constraints violated by one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violations(pub Vec<Violation>);

impl std::error::Error for Violations {}

impl Violations {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finish a validation pass: `Ok(())` when nothing was violated.
    pub fn into_result(self) -> Result<(), Violations> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for v in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
            first = false;
        }
        Ok(())
    }
}

// ── Field checks ────────────────────────────────────────────────────

/// Required, non-blank, at most `max` characters.
pub fn check_non_blank(out: &mut Violations, field: &str, value: &str, max: usize) {
    if value.trim().is_empty() {
        out.push(field, "must not be blank");
    } else if value.len() > max {
        out.push(field, format!("must not exceed {max} characters"));
    }
}

/// Digits only, any length (at least one digit).
pub fn check_digits(out: &mut Violations, field: &str, value: &str) {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        out.push(field, "must contain only digits");
    }
}

/// Exactly `len` digits.
pub fn check_exact_digits(out: &mut Violations, field: &str, value: &str, len: usize) {
    if value.len() != len || !value.bytes().all(|b| b.is_ascii_digit()) {
        out.push(field, format!("must be exactly {len} digits"));
    }
}

/// Between `min` and `max` digits inclusive.
pub fn check_digit_range(out: &mut Violations, field: &str, value: &str, min: usize, max: usize) {
    if value.len() < min || value.len() > max || !value.bytes().all(|b| b.is_ascii_digit()) {
        out.push(field, format!("must be {min} to {max} digits"));
    }
}

/// IBAN shape: two uppercase letters followed by 13 to 32 digits.
pub fn check_iban(out: &mut Violations, field: &str, value: &str) {
    let bytes = value.as_bytes();
    let ok = bytes.len() >= 15
        && bytes.len() <= 34
        && bytes[..2].iter().all(|b| b.is_ascii_uppercase())
        && bytes[2..].iter().all(|b| b.is_ascii_digit());
    if !ok {
        out.push(
            field,
            "must be two uppercase letters followed by 13 to 32 digits",
        );
    }
}

/// Card expiration month stamp: `YYYY-MM` with a month of 01..=12.
pub fn check_month(out: &mut Violations, field: &str, value: &str) {
    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 7
        && bytes[..4].iter().all(|b| b.is_ascii_digit())
        && bytes[4] == b'-'
        && bytes[5..].iter().all(|b| b.is_ascii_digit());
    let month_ok = shape_ok && {
        let month = (bytes[5] - b'0') * 10 + (bytes[6] - b'0');
        (1..=12).contains(&month)
    };
    if !month_ok {
        out.push(field, "must be a YYYY-MM month");
    }
}
