//! # dbank-state — Entity Records and In-Memory State
//!
//! Domain records for the three banking entities plus the machinery the
//! API layer drives them with:
//!
//! - [`Account`], [`Card`], [`Operation`] — plain records with their
//!   state-dependent mutation rules attached as methods. The one-way
//!   ratchets live here: a blocked or expired card refuses edits, a
//!   confirmed operation refuses everything but a category change.
//! - [`Store`] — soft-delete-aware in-memory store keyed by id. Normal
//!   lookups see active records only; soft-deleted records stay resident
//!   for audit and startup rehydration.
//! - Per-entity filter structs implementing the partial-match search
//!   contract of the list endpoints.
//!
//! Nothing here knows about HTTP, roles beyond the ownership secret, or
//! persistence — those live in `dbank-api`.

pub mod account;
pub mod card;
pub mod error;
pub mod filter;
pub mod operation;
pub mod store;

pub use account::{Account, AccountFilter};
pub use card::{Card, CardFilter};
pub use error::StateError;
pub use operation::{Operation, OperationFilter};
pub use store::{Entity, Store};
