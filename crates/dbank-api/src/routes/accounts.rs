//! # Bank Accounts API
//!
//! Routes:
//! - GET    /accounts — list, paginated, partial-match filterable
//! - GET    /accounts/:id — fetch one
//! - POST   /accounts — create (ownership secret := caller subject)
//! - PUT    /accounts/:id — full update of the mutable profile fields
//! - PATCH  /accounts/:id — partial update, merged then re-validated
//!
//! The balance is read-only here; only operation confirmation moves it.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use dbank_core::validate::{check_digits, check_iban, check_non_blank};
use dbank_core::{Role, Violations};
use dbank_state::{Account, AccountFilter};

use crate::auth::{require_any_role, CallerIdentity};
use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::links::{self, Collection, Linked};
use crate::routes::{client_owner, PageParams};
use crate::state::AppState;

/// Full account input: the mutable profile fields.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountInput {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub country: String,
    pub passport_number: String,
    pub phone_number: String,
    #[serde(rename = "IBAN")]
    pub iban: String,
}

impl AccountInput {
    /// Rebuild the full input from a (merged) record for PATCH
    /// re-validation.
    fn from_account(account: &Account) -> Self {
        Self {
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            birth_date: account.birth_date,
            country: account.country.clone(),
            passport_number: account.passport_number.clone(),
            phone_number: account.phone_number.clone(),
            iban: account.iban.clone(),
        }
    }
}

impl Validate for AccountInput {
    fn validate(&self) -> Result<(), Violations> {
        let mut out = Violations::new();
        check_non_blank(&mut out, "firstName", &self.first_name, 255);
        check_non_blank(&mut out, "lastName", &self.last_name, 255);
        check_non_blank(&mut out, "country", &self.country, 255);
        check_digits(&mut out, "passportNumber", &self.passport_number);
        check_non_blank(&mut out, "phoneNumber", &self.phone_number, 255);
        check_iban(&mut out, "IBAN", &self.iban);
        out.into_result()
    }
}

/// Partial account input: only supplied fields are applied.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub country: Option<String>,
    pub passport_number: Option<String>,
    pub phone_number: Option<String>,
    #[serde(rename = "IBAN")]
    pub iban: Option<String>,
}

impl AccountPatch {
    fn apply(&self, account: &mut Account) {
        if let Some(v) = &self.first_name {
            account.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            account.last_name = v.clone();
        }
        if let Some(v) = self.birth_date {
            account.birth_date = v;
        }
        if let Some(v) = &self.country {
            account.country = v.clone();
        }
        if let Some(v) = &self.passport_number {
            account.passport_number = v.clone();
        }
        if let Some(v) = &self.phone_number {
            account.phone_number = v.clone();
        }
        if let Some(v) = &self.iban {
            account.iban = v.clone();
        }
    }
}

/// Role-shaped external representation of an account.
///
/// The restricted tier (every role) carries the profile basics and the
/// balance; only admins additionally see birth date, passport number,
/// and phone number. The ownership secret appears in no tier.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    #[serde(rename = "IBAN")]
    pub iban: String,
    #[schema(value_type = String)]
    pub balance: Decimal,
    pub date_added: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passport_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl AccountView {
    fn project(account: &Account, role: Role) -> Self {
        let complete = role == Role::Admin;
        Self {
            id: account.id,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            country: account.country.clone(),
            iban: account.iban.clone(),
            balance: account.balance,
            date_added: account.date_added,
            birth_date: complete.then_some(account.birth_date),
            passport_number: complete.then(|| account.passport_number.clone()),
            phone_number: complete.then(|| account.phone_number.clone()),
        }
    }
}

/// Partial-match filter parameters for the accounts collection.
#[derive(Debug, Deserialize, Default, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AccountListQuery {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub country: Option<String>,
    pub passport_number: Option<String>,
    pub phone_number: Option<String>,
    #[serde(rename = "IBAN")]
    pub iban: Option<String>,
    pub balance: Option<String>,
    pub date_added: Option<String>,
}

impl AccountListQuery {
    /// Filters on identity- and balance-sensitive fields are reserved to
    /// admins. Supplying one as any other role fails the whole request.
    fn ensure_permitted(&self, caller: &CallerIdentity) -> Result<(), AppError> {
        if caller.is(Role::Admin) {
            return Ok(());
        }
        let privileged = [
            ("birthDate", &self.birth_date),
            ("passportNumber", &self.passport_number),
            ("phoneNumber", &self.phone_number),
            ("balance", &self.balance),
        ];
        for (name, value) in privileged {
            if value.as_deref().is_some_and(|v| !v.is_empty()) {
                return Err(AppError::Forbidden(format!(
                    "filter '{name}' requires the Admin role"
                )));
            }
        }
        Ok(())
    }

    fn into_filter(self) -> AccountFilter {
        AccountFilter {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date: self.birth_date,
            country: self.country,
            passport_number: self.passport_number,
            phone_number: self.phone_number,
            iban: self.iban,
            balance: self.balance,
            date_added: self.date_added,
        }
    }
}

/// Active lookup + ownership check shared by every handler that targets
/// one account (also used by the card and operation routes to resolve
/// owning accounts). Absent or soft-deleted → 404; present but owned by
/// someone else (Client caller) → 403.
pub(crate) fn find_account_checked(
    state: &AppState,
    caller: &CallerIdentity,
    id: &Uuid,
) -> Result<Account, AppError> {
    let account = state
        .accounts
        .find_active(id)
        .ok_or_else(|| AppError::not_found("account", id))?;
    if !caller.owns(&account.secret) {
        return Err(AppError::Forbidden(format!(
            "account {id} does not belong to the caller"
        )));
    }
    Ok(account)
}

/// Build the accounts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route(
            "/accounts/:id",
            get(get_account).put(update_account).patch(patch_account),
        )
}

/// GET /accounts — List accounts.
#[utoipa::path(
    get,
    path = "/accounts",
    params(PageParams, AccountListQuery),
    responses(
        (status = 200, description = "Page of accounts", body = [AccountView]),
        (status = 403, description = "Privileged filter denied", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn list_accounts(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(page): Query<PageParams>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<Collection<AccountView>>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client, Role::Atm])?;
    query.ensure_permitted(&caller)?;

    let owner = client_owner(&caller);
    let filter = query.into_filter();
    let accounts = state.accounts.list_active(
        page.effective_offset(),
        page.effective_interval(),
        |account| {
            filter.matches(account)
                && owner.as_deref().map_or(true, |s| account.secret == s)
        },
    );

    let items = accounts
        .into_iter()
        .map(|a| (a.id, AccountView::project(&a, caller.role)))
        .collect();
    Ok(Json(links::collection(items, "accounts")))
}

/// GET /accounts/:id — Fetch one account.
#[utoipa::path(
    get,
    path = "/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account found", body = AccountView),
        (status = 403, description = "Not the caller's account", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn get_account(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Linked<AccountView>>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client, Role::Atm])?;
    let account = find_account_checked(&state, &caller, &id)?;
    Ok(Json(links::linked(
        AccountView::project(&account, caller.role),
        "accounts",
        account.id,
    )))
}

/// POST /accounts — Create an account.
///
/// The server assigns the id and creation timestamp, zeroes the
/// balance, and sets the ownership secret to the caller's subject.
#[utoipa::path(
    post,
    path = "/accounts",
    request_body = AccountInput,
    responses(
        (status = 201, description = "Account created", body = AccountView),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn create_account(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<AccountInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Linked<AccountView>>), AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client])?;
    let input = extract_validated_json(body)?;

    let account = Account {
        id: Uuid::new_v4(),
        first_name: input.first_name,
        last_name: input.last_name,
        birth_date: input.birth_date,
        country: input.country,
        passport_number: input.passport_number,
        phone_number: input.phone_number,
        iban: input.iban,
        balance: Decimal::ZERO,
        secret: caller.subject.clone(),
        date_added: Utc::now(),
        active: true,
    };

    state.accounts.insert(account.clone());
    db::persist!(state, db::accounts::save, &account);

    Ok((
        StatusCode::CREATED,
        Json(links::linked(
            AccountView::project(&account, caller.role),
            "accounts",
            account.id,
        )),
    ))
}

/// PUT /accounts/:id — Replace the mutable profile fields.
#[utoipa::path(
    put,
    path = "/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = AccountInput,
    responses(
        (status = 200, description = "Account updated", body = AccountView),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
        (status = 403, description = "Not the caller's account", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn update_account(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<AccountInput>, JsonRejection>,
) -> Result<Json<Linked<AccountView>>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client])?;
    let input = extract_validated_json(body)?;
    find_account_checked(&state, &caller, &id)?;

    let updated = state
        .accounts
        .update(&id, |account| {
            account.first_name = input.first_name.clone();
            account.last_name = input.last_name.clone();
            account.birth_date = input.birth_date;
            account.country = input.country.clone();
            account.passport_number = input.passport_number.clone();
            account.phone_number = input.phone_number.clone();
            account.iban = input.iban.clone();
        })
        .ok_or_else(|| AppError::not_found("account", id))?;

    db::persist!(state, db::accounts::save, &updated);
    Ok(Json(links::linked(
        AccountView::project(&updated, caller.role),
        "accounts",
        updated.id,
    )))
}

/// PATCH /accounts/:id — Merge the supplied fields, then re-validate the
/// complete resulting profile before persisting.
#[utoipa::path(
    patch,
    path = "/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = AccountPatch,
    responses(
        (status = 200, description = "Account updated", body = AccountView),
        (status = 400, description = "Merged result fails validation", body = crate::error::ErrorBody),
        (status = 403, description = "Not the caller's account", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn patch_account(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<AccountPatch>, JsonRejection>,
) -> Result<Json<Linked<AccountView>>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client])?;
    let patch = extract_json(body)?;
    let account = find_account_checked(&state, &caller, &id)?;

    // Re-validate the merged whole, not the delta: a patch that blanks a
    // required field must fail even though the field was "supplied".
    let mut merged = account.clone();
    patch.apply(&mut merged);
    AccountInput::from_account(&merged).validate()?;

    let updated = state
        .accounts
        .update(&id, |account| patch.apply(account))
        .ok_or_else(|| AppError::not_found("account", id))?;

    db::persist!(state, db::accounts::save, &updated);
    Ok(Json(links::linked(
        AccountView::project(&updated, caller.role),
        "accounts",
        updated.id,
    )))
}
