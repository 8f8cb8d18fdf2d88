//! # Money-Transfer Operations API
//!
//! Routes:
//! - GET    /operations — list, paginated, partial-match filterable
//! - GET    /operations/:id — fetch one
//! - POST   /operations — create (pending)
//! - POST   /operations/:id/confirm — confirm + credit the account
//! - PUT    /operations/:id — full update (pending operations only)
//! - PATCH  /operations/:id — partial update; once confirmed, only the
//!          category may change
//! - DELETE /operations/:id — soft delete (pending operations only)
//!
//! Confirmation is the single code path that moves an account balance.
//! The confirmed flag flips under the store's write lock so a repeated
//! confirm can never credit twice, and the operation + account pair is
//! mirrored to Postgres in one transaction.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use dbank_core::validate::{check_iban, check_non_blank};
use dbank_core::{Role, Violations};
use dbank_state::{Operation, OperationFilter, StateError};

use crate::auth::{require_any_role, require_role, CallerIdentity};
use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::links::{self, Collection, Linked};
use crate::routes::accounts::find_account_checked;
use crate::routes::cards::find_card_checked;
use crate::routes::{client_owner, PageParams};
use crate::state::AppState;

/// Full operation input.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationInput {
    pub label: String,
    /// Signed; the sign carries the direction.
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub second_account_name: String,
    pub second_account_country: String,
    #[serde(rename = "secondAccountIBAN")]
    pub second_account_iban: String,
    pub category: Option<String>,
    pub first_account_id: Uuid,
    /// Card used for the payment, when there is one.
    pub first_account_card_id: Option<Uuid>,
}

impl OperationInput {
    /// Rebuild the full input from a (merged) record for PATCH
    /// re-validation.
    fn from_operation(operation: &Operation) -> Self {
        Self {
            label: operation.label.clone(),
            amount: operation.amount,
            second_account_name: operation.second_account_name.clone(),
            second_account_country: operation.second_account_country.clone(),
            second_account_iban: operation.second_account_iban.clone(),
            category: operation.category.clone(),
            first_account_id: operation.first_account_id,
            first_account_card_id: operation.first_account_card_id,
        }
    }
}

impl Validate for OperationInput {
    fn validate(&self) -> Result<(), Violations> {
        let mut out = Violations::new();
        check_non_blank(&mut out, "label", &self.label, 255);
        check_non_blank(&mut out, "secondAccountName", &self.second_account_name, 255);
        check_non_blank(
            &mut out,
            "secondAccountCountry",
            &self.second_account_country,
            255,
        );
        check_iban(&mut out, "secondAccountIBAN", &self.second_account_iban);
        out.into_result()
    }
}

/// Partial operation input: only supplied fields are applied.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationPatch {
    pub label: Option<String>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub second_account_name: Option<String>,
    pub second_account_country: Option<String>,
    #[serde(rename = "secondAccountIBAN")]
    pub second_account_iban: Option<String>,
    pub category: Option<String>,
    pub first_account_id: Option<Uuid>,
    pub first_account_card_id: Option<Uuid>,
}

impl OperationPatch {
    /// Whether the patch touches anything beyond the category. Those
    /// fields are frozen once the operation is confirmed.
    fn touches_frozen_fields(&self) -> bool {
        self.label.is_some()
            || self.amount.is_some()
            || self.second_account_name.is_some()
            || self.second_account_country.is_some()
            || self.second_account_iban.is_some()
            || self.first_account_id.is_some()
            || self.first_account_card_id.is_some()
    }

    fn apply(&self, operation: &mut Operation) {
        if let Some(v) = &self.label {
            operation.label = v.clone();
        }
        if let Some(v) = self.amount {
            operation.amount = v;
        }
        if let Some(v) = &self.second_account_name {
            operation.second_account_name = v.clone();
        }
        if let Some(v) = &self.second_account_country {
            operation.second_account_country = v.clone();
        }
        if let Some(v) = &self.second_account_iban {
            operation.second_account_iban = v.clone();
        }
        if let Some(v) = &self.category {
            operation.category = Some(v.clone());
        }
        if let Some(v) = self.first_account_id {
            operation.first_account_id = v;
        }
        if let Some(v) = self.first_account_card_id {
            operation.first_account_card_id = Some(v);
        }
    }
}

/// Role-shaped external representation of an operation.
///
/// Admins and clients get the complete tier with `rate` and `category`;
/// ATM and merchant callers get the restricted tier without them.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationView {
    pub id: Uuid,
    pub label: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub second_account_name: String,
    pub second_account_country: String,
    #[serde(rename = "secondAccountIBAN")]
    pub second_account_iban: String,
    pub confirmed: bool,
    pub date_added: DateTime<Utc>,
    pub first_account_id: Uuid,
    pub first_account_card_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl OperationView {
    fn project(operation: &Operation, role: Role) -> Self {
        let complete = matches!(role, Role::Admin | Role::Client);
        Self {
            id: operation.id,
            label: operation.label.clone(),
            amount: operation.amount,
            second_account_name: operation.second_account_name.clone(),
            second_account_country: operation.second_account_country.clone(),
            second_account_iban: operation.second_account_iban.clone(),
            confirmed: operation.confirmed,
            date_added: operation.date_added,
            first_account_id: operation.first_account_id,
            first_account_card_id: operation.first_account_card_id,
            rate: if complete { operation.rate } else { None },
            category: if complete {
                operation.category.clone()
            } else {
                None
            },
        }
    }
}

/// Partial-match filter parameters for the operations collection.
#[derive(Debug, Deserialize, Default, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct OperationListQuery {
    pub id: Option<String>,
    pub label: Option<String>,
    pub amount: Option<String>,
    pub second_account_name: Option<String>,
    pub second_account_country: Option<String>,
    #[serde(rename = "secondAccountIBAN")]
    pub second_account_iban: Option<String>,
    pub rate: Option<String>,
    pub category: Option<String>,
    pub confirmed: Option<bool>,
    pub date_added: Option<String>,
    pub first_account_id: Option<String>,
    pub first_account_card_id: Option<String>,
}

impl OperationListQuery {
    /// The amount filter is reserved to admins. The check fires on a
    /// supplied non-empty value, so merely hitting the endpoint without
    /// it stays permitted.
    fn ensure_permitted(&self, caller: &CallerIdentity) -> Result<(), AppError> {
        if caller.is(Role::Admin) {
            return Ok(());
        }
        if self.amount.as_deref().is_some_and(|v| !v.is_empty()) {
            return Err(AppError::Forbidden(
                "filter 'amount' requires the Admin role".to_string(),
            ));
        }
        Ok(())
    }

    fn into_filter(self) -> OperationFilter {
        OperationFilter {
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
            first_account_id: self.first_account_id,
            first_account_card_id: self.first_account_card_id,
        }
    }
}

/// Active lookup + ownership check through the originating account.
fn find_operation_checked(
    state: &AppState,
    caller: &CallerIdentity,
    id: &Uuid,
) -> Result<Operation, AppError> {
    let operation = state
        .operations
        .find_active(id)
        .ok_or_else(|| AppError::not_found("operation", id))?;
    let owner_secret = state
        .accounts
        .get(&operation.first_account_id)
        .map(|a| a.secret)
        .unwrap_or_default();
    if !caller.owns(&owner_secret) {
        return Err(AppError::Forbidden(format!(
            "operation {id} does not belong to the caller"
        )));
    }
    Ok(operation)
}

/// Build the operations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/operations", get(list_operations).post(create_operation))
        .route(
            "/operations/:id",
            get(get_operation)
                .put(update_operation)
                .patch(patch_operation)
                .delete(delete_operation),
        )
        .route("/operations/:id/confirm", post(confirm_operation))
}

/// GET /operations — List operations.
#[utoipa::path(
    get,
    path = "/operations",
    params(PageParams, OperationListQuery),
    responses(
        (status = 200, description = "Page of operations", body = [OperationView]),
        (status = 403, description = "Privileged filter denied", body = crate::error::ErrorBody),
    ),
    tag = "operations"
)]
pub(crate) async fn list_operations(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(page): Query<PageParams>,
    Query(query): Query<OperationListQuery>,
) -> Result<Json<Collection<OperationView>>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client, Role::Atm])?;
    query.ensure_permitted(&caller)?;

    let owner = client_owner(&caller);
    let filter = query.into_filter();
    let accounts = state.accounts.clone();
    let operations = state.operations.list_active(
        page.effective_offset(),
        page.effective_interval(),
        |operation| {
            filter.matches(operation)
                && owner.as_deref().map_or(true, |s| {
                    accounts
                        .get(&operation.first_account_id)
                        .is_some_and(|a| a.secret == s)
                })
        },
    );

    let items = operations
        .into_iter()
        .map(|o| (o.id, OperationView::project(&o, caller.role)))
        .collect();
    Ok(Json(links::collection(items, "operations")))
}

/// GET /operations/:id — Fetch one operation.
#[utoipa::path(
    get,
    path = "/operations/{id}",
    params(("id" = Uuid, Path, description = "Operation ID")),
    responses(
        (status = 200, description = "Operation found", body = OperationView),
        (status = 403, description = "Not the caller's operation", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "operations"
)]
pub(crate) async fn get_operation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Linked<OperationView>>, AppError> {
    require_any_role(
        &caller,
        &[Role::Admin, Role::Client, Role::Atm, Role::Merchant],
    )?;
    let operation = find_operation_checked(&state, &caller, &id)?;
    Ok(Json(links::linked(
        OperationView::project(&operation, caller.role),
        "operations",
        operation.id,
    )))
}

/// POST /operations — Create a pending operation.
///
/// The server assigns the id and timestamp and forces the pending
/// state; `rate` is never client-settable and starts unset. A card
/// payment must reference a usable card on an account the caller may
/// act for.
#[utoipa::path(
    post,
    path = "/operations",
    request_body = OperationInput,
    responses(
        (status = 201, description = "Operation created", body = OperationView),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
        (status = 403, description = "Denied or card blocked/expired", body = crate::error::ErrorBody),
        (status = 404, description = "Account or card not found", body = crate::error::ErrorBody),
    ),
    tag = "operations"
)]
pub(crate) async fn create_operation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<OperationInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Linked<OperationView>>), AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client, Role::Atm])?;
    let input = extract_validated_json(body)?;

    let account = find_account_checked(&state, &caller, &input.first_account_id)?;
    if let Some(card_id) = input.first_account_card_id {
        let card = find_card_checked(&state, &caller, &card_id)?;
        card.ensure_usable()?;
    }

    let operation = Operation {
        id: Uuid::new_v4(),
        label: input.label,
        amount: input.amount,
        second_account_name: input.second_account_name,
        second_account_country: input.second_account_country,
        second_account_iban: input.second_account_iban,
        rate: None,
        category: input.category,
        confirmed: false,
        date_added: Utc::now(),
        active: true,
        first_account_id: account.id,
        first_account_card_id: input.first_account_card_id,
    };

    state.operations.insert(operation.clone());
    db::persist!(state, db::operations::save, &operation);

    Ok((
        StatusCode::CREATED,
        Json(links::linked(
            OperationView::project(&operation, caller.role),
            "operations",
            operation.id,
        )),
    ))
}

/// POST /operations/:id/confirm — Confirm and credit the account.
///
/// The confirmed flag flips atomically under the store lock; a second
/// confirm attempt hits the ratchet and is rejected before any balance
/// arithmetic, so the credit can never be applied twice. Operation and
/// account are then mirrored to Postgres in one transaction.
#[utoipa::path(
    post,
    path = "/operations/{id}/confirm",
    params(("id" = Uuid, Path, description = "Operation ID")),
    responses(
        (status = 200, description = "Operation confirmed", body = OperationView),
        (status = 403, description = "Already confirmed", body = crate::error::ErrorBody),
        (status = 404, description = "Operation or account not found", body = crate::error::ErrorBody),
    ),
    tag = "operations"
)]
pub(crate) async fn confirm_operation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Linked<OperationView>>, AppError> {
    require_role(&caller, Role::Admin)?;

    // The account must exist before the ratchet flips — confirming an
    // operation whose account is gone would strand a half-applied state.
    let operation = state
        .operations
        .find_active(&id)
        .ok_or_else(|| AppError::not_found("operation", id))?;
    state
        .accounts
        .find_active(&operation.first_account_id)
        .ok_or_else(|| AppError::not_found("account", operation.first_account_id))?;

    let confirmed = state
        .operations
        .try_update(&id, |operation| operation.confirm())
        .ok_or_else(|| AppError::not_found("operation", id))?
        .map_err(AppError::from)?;

    let credited = state
        .accounts
        .update(&confirmed.first_account_id, |account| {
            account.credit(confirmed.amount);
        })
        .ok_or_else(|| AppError::not_found("account", confirmed.first_account_id))?;

    if let Some(ref pool) = state.db_pool {
        if let Err(e) = db::operations::save_confirmation(pool, &confirmed, &credited).await {
            tracing::error!(error = %e, "failed to persist confirmation to database");
            return Err(AppError::Internal(
                "confirmation applied in-memory but database persist failed".to_string(),
            ));
        }
    }

    Ok(Json(links::linked(
        OperationView::project(&confirmed, caller.role),
        "operations",
        confirmed.id,
    )))
}

/// PUT /operations/:id — Replace every mutable field. Refused once
/// confirmed.
#[utoipa::path(
    put,
    path = "/operations/{id}",
    params(("id" = Uuid, Path, description = "Operation ID")),
    request_body = OperationInput,
    responses(
        (status = 200, description = "Operation updated", body = OperationView),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
        (status = 403, description = "Already confirmed", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "operations"
)]
pub(crate) async fn update_operation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<OperationInput>, JsonRejection>,
) -> Result<Json<Linked<OperationView>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let input = extract_validated_json(body)?;

    let operation = find_operation_checked(&state, &caller, &id)?;
    operation.ensure_mutable()?;

    let account = find_account_checked(&state, &caller, &input.first_account_id)?;
    if let Some(card_id) = input.first_account_card_id {
        let card = find_card_checked(&state, &caller, &card_id)?;
        card.ensure_usable()?;
    }

    let updated = state
        .operations
        .update(&id, |operation| {
            operation.label = input.label.clone();
            operation.amount = input.amount;
            operation.second_account_name = input.second_account_name.clone();
            operation.second_account_country = input.second_account_country.clone();
            operation.second_account_iban = input.second_account_iban.clone();
            operation.category = input.category.clone();
            operation.first_account_id = account.id;
            operation.first_account_card_id = input.first_account_card_id;
        })
        .ok_or_else(|| AppError::not_found("operation", id))?;

    db::persist!(state, db::operations::save, &updated);
    Ok(Json(links::linked(
        OperationView::project(&updated, caller.role),
        "operations",
        updated.id,
    )))
}

/// PATCH /operations/:id — Merge the supplied fields. Once confirmed,
/// only a category-only patch is accepted.
#[utoipa::path(
    patch,
    path = "/operations/{id}",
    params(("id" = Uuid, Path, description = "Operation ID")),
    request_body = OperationPatch,
    responses(
        (status = 200, description = "Operation updated", body = OperationView),
        (status = 400, description = "Merged result fails validation", body = crate::error::ErrorBody),
        (status = 403, description = "Confirmed operation, frozen field touched", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "operations"
)]
pub(crate) async fn patch_operation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<OperationPatch>, JsonRejection>,
) -> Result<Json<Linked<OperationView>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let patch = extract_json(body)?;

    let operation = find_operation_checked(&state, &caller, &id)?;
    if operation.confirmed && patch.touches_frozen_fields() {
        return Err(StateError::OperationConfirmed(operation.id).into());
    }

    let mut merged = operation.clone();
    patch.apply(&mut merged);
    OperationInput::from_operation(&merged).validate()?;

    if let Some(account_id) = patch.first_account_id {
        find_account_checked(&state, &caller, &account_id)?;
    }
    if let Some(card_id) = patch.first_account_card_id {
        let card = find_card_checked(&state, &caller, &card_id)?;
        card.ensure_usable()?;
    }

    let updated = state
        .operations
        .update(&id, |operation| patch.apply(operation))
        .ok_or_else(|| AppError::not_found("operation", id))?;

    db::persist!(state, db::operations::save, &updated);
    Ok(Json(links::linked(
        OperationView::project(&updated, caller.role),
        "operations",
        updated.id,
    )))
}

/// DELETE /operations/:id — Soft delete. Refused once confirmed; the
/// record stays resident (inactive) for audit.
#[utoipa::path(
    delete,
    path = "/operations/{id}",
    params(("id" = Uuid, Path, description = "Operation ID")),
    responses(
        (status = 204, description = "Operation soft-deleted"),
        (status = 403, description = "Already confirmed", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or already soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "operations"
)]
pub(crate) async fn delete_operation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Merchant])?;

    let operation = state
        .operations
        .find_active(&id)
        .ok_or_else(|| AppError::not_found("operation", id))?;
    operation.ensure_mutable()?;

    let deleted = state
        .operations
        .soft_delete(&id)
        .ok_or_else(|| AppError::not_found("operation", id))?;

    db::persist!(state, db::operations::save, &deleted);
    Ok(StatusCode::NO_CONTENT)
}
