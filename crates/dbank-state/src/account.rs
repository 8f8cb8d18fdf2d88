//! Bank account record.
//!
//! The balance is never written by update endpoints — the only path that
//! touches it is operation confirmation, which calls [`Account::credit`].
//! The ownership `secret` is set once at creation from the creating
//! caller's subject and never changes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter;
use crate::store::Entity;

/// A bank account. Profile fields are opaque strings/dates; the service
/// attaches no semantics beyond validation shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub country: String,
    pub passport_number: String,
    pub phone_number: String,
    pub iban: String,
    /// Mutated only by operation confirmation.
    pub balance: Decimal,
    /// Ownership token: the creating caller's subject. Immutable.
    pub secret: String,
    pub date_added: DateTime<Utc>,
    pub active: bool,
}

impl Account {
    /// Apply a signed amount to the balance and return the new value.
    pub fn credit(&mut self, amount: Decimal) -> Decimal {
        self.balance += amount;
        self.balance
    }
}

impl Entity for Account {
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

/// Partial-match search filter for the accounts collection. Each field
/// conjunct must match; absent fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub country: Option<String>,
    pub passport_number: Option<String>,
    pub phone_number: Option<String>,
    pub iban: Option<String>,
    pub balance: Option<String>,
    pub date_added: Option<String>,
}

impl AccountFilter {
    pub fn matches(&self, account: &Account) -> bool {
        filter::id_matches(self.id.as_deref(), &account.id)
            && filter::text_matches(self.first_name.as_deref(), &account.first_name)
            && filter::text_matches(self.last_name.as_deref(), &account.last_name)
            && filter::text_matches(
                self.birth_date.as_deref(),
                &account.birth_date.format("%Y-%m-%d").to_string(),
            )
            && filter::text_matches(self.country.as_deref(), &account.country)
            && filter::text_matches(self.passport_number.as_deref(), &account.passport_number)
            && filter::text_matches(self.phone_number.as_deref(), &account.phone_number)
            && filter::text_matches(self.iban.as_deref(), &account.iban)
            && filter::decimal_matches(self.balance.as_deref(), &account.balance)
            && filter::date_matches(self.date_added.as_deref(), &account.date_added)
    }
}
