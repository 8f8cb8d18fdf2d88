//! Account persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `accounts` table.
//! Access rules and soft-delete filtering are enforced at the
//! application layer, not in SQL.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use dbank_state::Account;

/// Insert or update an account (write-through upsert).
pub async fn save(pool: &PgPool, account: &Account) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO accounts (id, first_name, last_name, birth_date, country, passport_number,
         phone_number, iban, balance, secret, date_added, active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         ON CONFLICT (id) DO UPDATE SET
             first_name = EXCLUDED.first_name,
             last_name = EXCLUDED.last_name,
             birth_date = EXCLUDED.birth_date,
             country = EXCLUDED.country,
             passport_number = EXCLUDED.passport_number,
             phone_number = EXCLUDED.phone_number,
             iban = EXCLUDED.iban,
             balance = EXCLUDED.balance,
             active = EXCLUDED.active",
    )
    .bind(account.id)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(account.birth_date)
    .bind(&account.country)
    .bind(&account.passport_number)
    .bind(&account.phone_number)
    .bind(&account.iban)
    .bind(account.balance)
    .bind(&account.secret)
    .bind(account.date_added)
    .bind(account.active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all accounts for startup hydration, inactive rows included.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Account>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccountRow>(
        "SELECT id, first_name, last_name, birth_date, country, passport_number,
         phone_number, iban, balance, secret, date_added, active
         FROM accounts ORDER BY date_added",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AccountRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    birth_date: NaiveDate,
    country: String,
    passport_number: String,
    phone_number: String,
    iban: String,
    balance: Decimal,
    secret: String,
    date_added: DateTime<Utc>,
    active: bool,
}

impl AccountRow {
    fn into_record(self) -> Account {
        Account {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date: self.birth_date,
            country: self.country,
            passport_number: self.passport_number,
            phone_number: self.phone_number,
            iban: self.iban,
            balance: self.balance,
            secret: self.secret,
            date_added: self.date_added,
            active: self.active,
        }
    }
}
