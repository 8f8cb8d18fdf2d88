//! Payment card record.
//!
//! Two one-way ratchets: `blocked` (set through an ordinary update) and
//! `expired` (set only through the dedicated expire endpoint). Either
//! one makes the card terminal — every later edit or use is refused, and
//! there is no reverse path through the API. The PIN is stored as a
//! one-way hash and never leaves the record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StateError;
use crate::filter;
use crate::store::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    /// 16-digit primary account number.
    pub number: String,
    /// 3–4 digit card verification value.
    pub cryptogram: String,
    /// Expiration month, `YYYY-MM`.
    pub expiration: String,
    /// SHA-256 hex of the 4-digit PIN. The plaintext is never stored.
    pub code_hash: String,
    /// Positive spending cap.
    pub ceiling: Decimal,
    pub virtual_card: bool,
    pub localization: bool,
    pub contactless: bool,
    pub blocked: bool,
    pub expired: bool,
    pub date_added: DateTime<Utc>,
    pub active: bool,
    /// Exactly one owning account.
    pub account_id: Uuid,
}

impl Card {
    /// Reject any mutation or use once the card is terminal. Blocked
    /// wins over expired when both are set, matching the order the
    /// update path checks them.
    pub fn ensure_usable(&self) -> Result<(), StateError> {
        if self.blocked {
            Err(StateError::CardBlocked(self.id))
        } else if self.expired {
            Err(StateError::CardExpired(self.id))
        } else {
            Ok(())
        }
    }

    /// Drive the card into the expired terminal state. Idempotent — a
    /// second call leaves the record unchanged.
    pub fn expire(&mut self) {
        self.expired = true;
    }

    /// The number as shown to non-privileged roles: everything but the
    /// last four characters replaced by `*`.
    pub fn masked_number(&self) -> String {
        dbank_core::mask_number(&self.number)
    }
}

impl Entity for Card {
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

/// Partial-match search filter for the cards collection.
#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub id: Option<String>,
    pub number: Option<String>,
    pub cryptogram: Option<String>,
    pub expiration: Option<String>,
    pub ceiling: Option<String>,
    pub virtual_card: Option<bool>,
    pub localization: Option<bool>,
    pub contactless: Option<bool>,
    pub blocked: Option<bool>,
    pub expired: Option<bool>,
    pub date_added: Option<String>,
    pub account_id: Option<String>,
}

impl CardFilter {
    pub fn matches(&self, card: &Card) -> bool {
        filter::id_matches(self.id.as_deref(), &card.id)
            && filter::text_matches(self.number.as_deref(), &card.number)
            && filter::text_matches(self.cryptogram.as_deref(), &card.cryptogram)
            && filter::text_matches(self.expiration.as_deref(), &card.expiration)
            && filter::decimal_matches(self.ceiling.as_deref(), &card.ceiling)
            && filter::bool_matches(self.virtual_card, card.virtual_card)
            && filter::bool_matches(self.localization, card.localization)
            && filter::bool_matches(self.contactless, card.contactless)
            && filter::bool_matches(self.blocked, card.blocked)
            && filter::bool_matches(self.expired, card.expired)
            && filter::date_matches(self.date_added.as_deref(), &card.date_added)
            && filter::id_matches(self.account_id.as_deref(), &card.account_id)
    }
}
