//! Error types.
//!
//! Updating and reading adders never fails: overflow wraps and every internal
//! retry is invisible to the caller. The only fallible surface of the crate is
//! turning configuration text into an [`AdderKind`](crate::adders::AdderKind).

use thiserror::Error;

/// Returned when a string does not name any [`AdderKind`](crate::adders::AdderKind).
///
/// # Examples
///
/// ```rust
/// use sommatori::adders::AdderKind;
///
/// let err = "lock-free-ish".parse::<AdderKind>().unwrap_err();
/// assert_eq!(err.input(), "lock-free-ish");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown adder kind `{input}` (expected one of: striped, fixed-stripe, single-value, mutex)")]
pub struct ParseAdderKindError {
    input: String,
}

impl ParseAdderKindError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// The rejected input.
    pub fn input(&self) -> &str {
        &self.input
    }
}
