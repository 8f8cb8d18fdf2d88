//! Route modules, one per entity collection.

pub mod accounts;
pub mod cards;
pub mod operations;

use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::CallerIdentity;
use dbank_core::Role;

/// Pagination parameters shared by every list endpoint.
#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct PageParams {
    /// Page size (default 20, capped at 1000).
    pub interval: Option<usize>,
    /// Number of records to skip (default 0).
    pub offset: Option<usize>,
}

impl PageParams {
    const DEFAULT_INTERVAL: usize = 20;
    const MAX_INTERVAL: usize = 1000;

    pub fn effective_interval(&self) -> usize {
        self.interval
            .unwrap_or(Self::DEFAULT_INTERVAL)
            .min(Self::MAX_INTERVAL)
    }

    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// The ownership conjunct for list endpoints: clients only ever see
/// records owned by their own subject; every other role sees all.
pub(crate) fn client_owner(caller: &CallerIdentity) -> Option<String> {
    caller
        .is(Role::Client)
        .then(|| caller.subject.clone())
}
