//! Card persistence operations.
//!
//! The stored `code_hash` is the one-way PIN digest — plaintext codes
//! never reach this layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use dbank_state::Card;

/// Insert or update a card (write-through upsert).
pub async fn save(pool: &PgPool, card: &Card) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cards (id, number, cryptogram, expiration, code_hash, ceiling, virtual,
         localization, contactless, blocked, expired, date_added, active, account_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
         ON CONFLICT (id) DO UPDATE SET
             number = EXCLUDED.number,
             cryptogram = EXCLUDED.cryptogram,
             expiration = EXCLUDED.expiration,
             code_hash = EXCLUDED.code_hash,
             ceiling = EXCLUDED.ceiling,
             virtual = EXCLUDED.virtual,
             localization = EXCLUDED.localization,
             contactless = EXCLUDED.contactless,
             blocked = EXCLUDED.blocked,
             expired = EXCLUDED.expired,
             active = EXCLUDED.active,
             account_id = EXCLUDED.account_id",
    )
    .bind(card.id)
    .bind(&card.number)
    .bind(&card.cryptogram)
    .bind(&card.expiration)
    .bind(&card.code_hash)
    .bind(card.ceiling)
    .bind(card.virtual_card)
    .bind(card.localization)
    .bind(card.contactless)
    .bind(card.blocked)
    .bind(card.expired)
    .bind(card.date_added)
    .bind(card.active)
    .bind(card.account_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all cards for startup hydration, inactive rows included.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Card>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CardRow>(
        "SELECT id, number, cryptogram, expiration, code_hash, ceiling, virtual,
         localization, contactless, blocked, expired, date_added, active, account_id
         FROM cards ORDER BY date_added",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(CardRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CardRow {
    id: Uuid,
    number: String,
    cryptogram: String,
    expiration: String,
    code_hash: String,
    ceiling: Decimal,
    r#virtual: bool,
    localization: bool,
    contactless: bool,
    blocked: bool,
    expired: bool,
    date_added: DateTime<Utc>,
    active: bool,
    account_id: Uuid,
}

impl CardRow {
    fn into_record(self) -> Card {
        Card {
            id: self.id,
            number: self.number,
            cryptogram: self.cryptogram,
            expiration: self.expiration,
            code_hash: self.code_hash,
            ceiling: self.ceiling,
            virtual_card: self.r#virtual,
            localization: self.localization,
            contactless: self.contactless,
            blocked: self.blocked,
            expired: self.expired,
            date_added: self.date_added,
            active: self.active,
            account_id: self.account_id,
        }
    }
}
