//! Money-transfer operation record.
//!
//! An operation starts pending and is confirmed exactly once, through
//! the dedicated confirm endpoint. Confirmation is the single code path
//! in the service that moves an account balance. Once confirmed, every
//! field except `category` is frozen and deletion is refused.
//!
//! The counterpart (`second_account_*`) is an external party, not a
//! stored entity. `rate` is an opaque optional the service never
//! populates.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StateError;
use crate::filter;
use crate::store::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: Uuid,
    pub label: String,
    /// Signed; the sign carries the direction.
    pub amount: Decimal,
    pub second_account_name: String,
    pub second_account_country: String,
    pub second_account_iban: String,
    /// Opaque, never set by this service.
    pub rate: Option<Decimal>,
    /// Freely mutable even after confirmation.
    pub category: Option<String>,
    pub confirmed: bool,
    pub date_added: DateTime<Utc>,
    pub active: bool,
    /// Originating account.
    pub first_account_id: Uuid,
    /// Card used for the payment, when there is one.
    pub first_account_card_id: Option<Uuid>,
}

impl Operation {
    /// Reject full updates and deletion once confirmed.
    pub fn ensure_mutable(&self) -> Result<(), StateError> {
        if self.confirmed {
            Err(StateError::OperationConfirmed(self.id))
        } else {
            Ok(())
        }
    }

    /// Flip the one-way confirmed ratchet. Errors when already confirmed
    /// so a repeated confirm can never re-apply the balance effect.
    pub fn confirm(&mut self) -> Result<(), StateError> {
        if self.confirmed {
            return Err(StateError::OperationConfirmed(self.id));
        }
        self.confirmed = true;
        Ok(())
    }
}

impl Entity for Operation {
    fn id(&self) -> Uuid {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Partial-match search filter for the operations collection.
#[derive(Debug, Clone, Default)]
pub struct OperationFilter {
    pub id: Option<String>,
    pub label: Option<String>,
    pub amount: Option<String>,
    pub second_account_name: Option<String>,
    pub second_account_country: Option<String>,
    pub second_account_iban: Option<String>,
    pub rate: Option<String>,
    pub category: Option<String>,
    pub confirmed: Option<bool>,
    pub date_added: Option<String>,
    pub first_account_id: Option<String>,
    pub first_account_card_id: Option<String>,
}

impl OperationFilter {
    pub fn matches(&self, operation: &Operation) -> bool {
        filter::id_matches(self.id.as_deref(), &operation.id)
            && filter::text_matches(self.label.as_deref(), &operation.label)
            && filter::decimal_matches(self.amount.as_deref(), &operation.amount)
            && filter::text_matches(
                self.second_account_name.as_deref(),
                &operation.second_account_name,
            )
            && filter::text_matches(
                self.second_account_country.as_deref(),
                &operation.second_account_country,
            )
            && filter::text_matches(
                self.second_account_iban.as_deref(),
                &operation.second_account_iban,
            )
            && filter::opt_decimal_matches(self.rate.as_deref(), operation.rate.as_ref())
            && filter::opt_text_matches(self.category.as_deref(), operation.category.as_deref())
            && filter::bool_matches(self.confirmed, operation.confirmed)
            && filter::date_matches(self.date_added.as_deref(), &operation.date_added)
            && filter::id_matches(self.first_account_id.as_deref(), &operation.first_account_id)
            && filter::opt_id_matches(
                self.first_account_card_id.as_deref(),
                operation.first_account_card_id.as_ref(),
            )
    }
}
