//! State-dependent mutation errors.
//!
//! Each variant names the terminal state that rejected the mutation.
//! The API layer maps all of them to a 403 state-conflict response.

use thiserror::Error;
use uuid::Uuid;

/// A mutation was rejected because the record is in a terminal state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The card was blocked; no field mutation is permitted.
    #[error("card {0} is blocked")]
    CardBlocked(Uuid),

    /// The card has expired; only the (idempotent) expire endpoint may
    /// touch it.
    #[error("card {0} has expired")]
    CardExpired(Uuid),

    /// The operation was confirmed; only its category remains mutable
    /// and deletion is forbidden.
    #[error("operation {0} is confirmed")]
    OperationConfirmed(Uuid),
}
