//! # dbank-core — Foundational Types for the dbank API
//!
//! Leaf crate of the workspace: it depends on nothing internal and every
//! other crate depends on it. It defines:
//!
//! - The closed set of caller [`Role`]s and the [`Caller`] context that is
//!   threaded explicitly through every lookup and mutation — there is no
//!   ambient security context anywhere in the workspace.
//! - The declarative field validation vocabulary ([`validate`]): every
//!   input validator reports the complete set of violated fields at once,
//!   never just the first.
//! - Card credential primitives ([`credential`]): one-way PIN hashing,
//!   constant-time verification, and number masking.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod credential;
pub mod role;
pub mod validate;

pub use credential::{hash_code, mask_number, verify_code};
pub use role::{Caller, Role};
pub use validate::{Violation, Violations};
