//! Operation persistence operations.
//!
//! Confirmation is the one place two records must land together: the
//! confirmed operation and the credited account are written in a single
//! transaction so a restart can never observe one without the other.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use dbank_state::{Account, Operation};

const UPSERT: &str =
    "INSERT INTO operations (id, label, amount, second_account_name, second_account_country,
     second_account_iban, rate, category, confirmed, date_added, active, first_account_id,
     first_account_card_id)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
     ON CONFLICT (id) DO UPDATE SET
         label = EXCLUDED.label,
         amount = EXCLUDED.amount,
         second_account_name = EXCLUDED.second_account_name,
         second_account_country = EXCLUDED.second_account_country,
         second_account_iban = EXCLUDED.second_account_iban,
         rate = EXCLUDED.rate,
         category = EXCLUDED.category,
         confirmed = EXCLUDED.confirmed,
         active = EXCLUDED.active,
         first_account_id = EXCLUDED.first_account_id,
         first_account_card_id = EXCLUDED.first_account_card_id";

fn bind_operation<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    operation: &'q Operation,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(operation.id)
        .bind(&operation.label)
        .bind(operation.amount)
        .bind(&operation.second_account_name)
        .bind(&operation.second_account_country)
        .bind(&operation.second_account_iban)
        .bind(operation.rate)
        .bind(&operation.category)
        .bind(operation.confirmed)
        .bind(operation.date_added)
        .bind(operation.active)
        .bind(operation.first_account_id)
        .bind(operation.first_account_card_id)
}

/// Insert or update an operation (write-through upsert).
pub async fn save(pool: &PgPool, operation: &Operation) -> Result<(), sqlx::Error> {
    bind_operation(sqlx::query(UPSERT), operation)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist a confirmation: the confirmed operation and the credited
/// account in one transaction.
pub async fn save_confirmation(
    pool: &PgPool,
    operation: &Operation,
    account: &Account,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    bind_operation(sqlx::query(UPSERT), operation)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE accounts SET balance = $1 WHERE id = $2")
        .bind(account.balance)
        .bind(account.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

/// Load all operations for startup hydration, inactive rows included.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Operation>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OperationRow>(
        "SELECT id, label, amount, second_account_name, second_account_country,
         second_account_iban, rate, category, confirmed, date_added, active,
         first_account_id, first_account_card_id
         FROM operations ORDER BY date_added",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(OperationRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct OperationRow {
    id: Uuid,
    label: String,
    amount: Decimal,
    second_account_name: String,
    second_account_country: String,
    second_account_iban: String,
    rate: Option<Decimal>,
    category: Option<String>,
    confirmed: bool,
    date_added: DateTime<Utc>,
    active: bool,
    first_account_id: Uuid,
    first_account_card_id: Option<Uuid>,
}

impl OperationRow {
    fn into_record(self) -> Operation {
        Operation {
            id: self.id,
            label: self.label,
            amount: self.amount,
            second_account_name: self.second_account_name,
            second_account_country: self.second_account_country,
            second_account_iban: self.second_account_iban,
            rate: self.rate,
            category: self.category,
            confirmed: self.confirmed,
            date_added: self.date_added,
            active: self.active,
            first_account_id: self.first_account_id,
            first_account_card_id: self.first_account_card_id,
        }
    }
}
