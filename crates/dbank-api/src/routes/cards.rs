//! # Payment Cards API
//!
//! Routes:
//! - GET    /cards — list, paginated, partial-match filterable
//! - GET    /cards/:id — fetch one
//! - POST   /cards — create (PIN stored as a one-way hash)
//! - POST   /cards/:id/code/check — verify a PIN
//! - POST   /cards/identity/check — verify number/cryptogram/expiration
//! - POST   /cards/:id/expire — drive into the expired terminal state
//! - PUT    /cards/:id — full update
//! - PATCH  /cards/:id — partial update, merged then re-validated
//!
//! A blocked or expired card is terminal: updates and checks are refused
//! with a state conflict; only the expire endpoint stays callable (and
//! is idempotent).

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

use dbank_core::validate::{check_digit_range, check_exact_digits, check_month};
use dbank_core::{hash_code, verify_code, Role, Violations};
use dbank_state::{Card, CardFilter};

use crate::auth::{require_any_role, require_role, CallerIdentity};
use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::links::{self, Collection, Linked};
use crate::routes::accounts::find_account_checked;
use crate::routes::{client_owner, PageParams};
use crate::state::AppState;

/// Shared shape checks for the card credential fields.
fn check_card_fields(
    out: &mut Violations,
    number: &str,
    cryptogram: &str,
    expiration: &str,
    ceiling: &Decimal,
) {
    check_exact_digits(out, "number", number, 16);
    check_digit_range(out, "cryptogram", cryptogram, 3, 4);
    check_month(out, "expirationDate", expiration);
    if *ceiling <= Decimal::ZERO {
        out.push("ceiling", "must be positive");
    }
}

/// Full card input.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    pub number: String,
    pub cryptogram: String,
    /// Expiration month, `YYYY-MM`.
    pub expiration_date: String,
    /// 4-digit PIN; hashed before storage, never echoed.
    pub code: String,
    #[schema(value_type = String)]
    pub ceiling: Decimal,
    #[serde(rename = "virtual")]
    pub virtual_card: bool,
    pub localization: bool,
    pub contactless: bool,
    pub blocked: bool,
    pub account_id: Uuid,
}

impl Validate for CardInput {
    fn validate(&self) -> Result<(), Violations> {
        let mut out = Violations::new();
        check_card_fields(
            &mut out,
            &self.number,
            &self.cryptogram,
            &self.expiration_date,
            &self.ceiling,
        );
        check_exact_digits(&mut out, "code", &self.code, 4);
        out.into_result()
    }
}

/// Partial card input: only supplied fields are applied.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    pub number: Option<String>,
    pub cryptogram: Option<String>,
    pub expiration_date: Option<String>,
    pub code: Option<String>,
    #[schema(value_type = Option<String>)]
    pub ceiling: Option<Decimal>,
    #[serde(rename = "virtual")]
    pub virtual_card: Option<bool>,
    pub localization: Option<bool>,
    pub contactless: Option<bool>,
    pub blocked: Option<bool>,
    pub account_id: Option<Uuid>,
}

impl CardPatch {
    fn apply(&self, card: &mut Card) {
        if let Some(v) = &self.number {
            card.number = v.clone();
        }
        if let Some(v) = &self.cryptogram {
            card.cryptogram = v.clone();
        }
        if let Some(v) = &self.expiration_date {
            card.expiration = v.clone();
        }
        if let Some(v) = &self.code {
            card.code_hash = hash_code(v);
        }
        if let Some(v) = self.ceiling {
            card.ceiling = v;
        }
        if let Some(v) = self.virtual_card {
            card.virtual_card = v;
        }
        if let Some(v) = self.localization {
            card.localization = v;
        }
        if let Some(v) = self.contactless {
            card.contactless = v;
        }
        if let Some(v) = self.blocked {
            card.blocked = v;
        }
        if let Some(v) = self.account_id {
            card.account_id = v;
        }
    }

    /// Validate the merged result: the stored PIN hash already attests a
    /// valid code, so the code shape is only checked when the patch
    /// supplies a new one.
    fn validate_merged(&self, merged: &Card) -> Result<(), Violations> {
        let mut out = Violations::new();
        check_card_fields(
            &mut out,
            &merged.number,
            &merged.cryptogram,
            &merged.expiration,
            &merged.ceiling,
        );
        if let Some(code) = &self.code {
            check_exact_digits(&mut out, "code", code, 4);
        }
        out.into_result()
    }
}

/// PIN check input.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CardCodeInput {
    pub code: String,
}

impl Validate for CardCodeInput {
    fn validate(&self) -> Result<(), Violations> {
        let mut out = Violations::new();
        check_exact_digits(&mut out, "code", &self.code, 4);
        out.into_result()
    }
}

/// Card identity check input: the credential triple a merchant sees.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardIdentityInput {
    pub number: String,
    pub cryptogram: String,
    pub expiration_date: String,
}

impl Validate for CardIdentityInput {
    fn validate(&self) -> Result<(), Violations> {
        let mut out = Violations::new();
        check_exact_digits(&mut out, "number", &self.number, 16);
        check_digit_range(&mut out, "cryptogram", &self.cryptogram, 3, 4);
        check_month(&mut out, "expirationDate", &self.expiration_date);
        out.into_result()
    }
}

/// Result of a PIN or identity check. Never carries the stored hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckResult {
    pub checked: bool,
    pub message: String,
}

/// Role-shaped external representation of a card.
///
/// Non-admin roles get the number masked to its last four characters
/// and never see the cryptogram or expiration. The PIN hash appears in
/// no tier.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub id: Uuid,
    pub number: String,
    #[schema(value_type = String)]
    pub ceiling: Decimal,
    #[serde(rename = "virtual")]
    pub virtual_card: bool,
    pub localization: bool,
    pub contactless: bool,
    pub blocked: bool,
    pub expired: bool,
    pub date_added: DateTime<Utc>,
    pub account_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cryptogram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
}

impl CardView {
    fn project(card: &Card, role: Role) -> Self {
        let complete = role == Role::Admin;
        Self {
            id: card.id,
            number: if complete {
                card.number.clone()
            } else {
                card.masked_number()
            },
            ceiling: card.ceiling,
            virtual_card: card.virtual_card,
            localization: card.localization,
            contactless: card.contactless,
            blocked: card.blocked,
            expired: card.expired,
            date_added: card.date_added,
            account_id: card.account_id,
            cryptogram: complete.then(|| card.cryptogram.clone()),
            expiration_date: complete.then(|| card.expiration.clone()),
        }
    }
}

/// Partial-match filter parameters for the cards collection.
#[derive(Debug, Deserialize, Default, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CardListQuery {
    pub id: Option<String>,
    pub number: Option<String>,
    pub cryptogram: Option<String>,
    pub expiration_date: Option<String>,
    pub ceiling: Option<String>,
    #[serde(rename = "virtual")]
    pub virtual_card: Option<bool>,
    pub localization: Option<bool>,
    pub contactless: Option<bool>,
    pub blocked: Option<bool>,
    pub expired: Option<bool>,
    pub date_added: Option<String>,
    pub account_id: Option<String>,
}

impl CardListQuery {
    /// Credential filters are reserved to admins.
    fn ensure_permitted(&self, caller: &CallerIdentity) -> Result<(), AppError> {
        if caller.is(Role::Admin) {
            return Ok(());
        }
        let privileged = [
            ("cryptogram", &self.cryptogram),
            ("expirationDate", &self.expiration_date),
            ("ceiling", &self.ceiling),
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

    fn into_filter(self) -> CardFilter {
        CardFilter {
            id: self.id,
            number: self.number,
            cryptogram: self.cryptogram,
            expiration: self.expiration_date,
            ceiling: self.ceiling,
            virtual_card: self.virtual_card,
            localization: self.localization,
            contactless: self.contactless,
            blocked: self.blocked,
            expired: self.expired,
            date_added: self.date_added,
            account_id: self.account_id,
        }
    }
}

/// Active lookup + ownership check through the owning account. Also
/// used by the operation routes when a payment references a card.
pub(crate) fn find_card_checked(
    state: &AppState,
    caller: &CallerIdentity,
    id: &Uuid,
) -> Result<Card, AppError> {
    let card = state
        .cards
        .find_active(id)
        .ok_or_else(|| AppError::not_found("card", id))?;
    let owner_secret = state
        .accounts
        .get(&card.account_id)
        .map(|a| a.secret)
        .unwrap_or_default();
    if !caller.owns(&owner_secret) {
        return Err(AppError::Forbidden(format!(
            "card {id} does not belong to the caller"
        )));
    }
    Ok(card)
}

/// Build the cards router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cards", get(list_cards).post(create_card))
        .route(
            "/cards/:id",
            get(get_card).put(update_card).patch(patch_card),
        )
        .route("/cards/:id/code/check", post(check_code))
        .route("/cards/identity/check", post(check_identity))
        .route("/cards/:id/expire", post(expire_card))
}

/// GET /cards — List cards.
#[utoipa::path(
    get,
    path = "/cards",
    params(PageParams, CardListQuery),
    responses(
        (status = 200, description = "Page of cards", body = [CardView]),
        (status = 403, description = "Privileged filter denied", body = crate::error::ErrorBody),
    ),
    tag = "cards"
)]
pub(crate) async fn list_cards(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(page): Query<PageParams>,
    Query(query): Query<CardListQuery>,
) -> Result<Json<Collection<CardView>>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client])?;
    query.ensure_permitted(&caller)?;

    let owner = client_owner(&caller);
    let filter = query.into_filter();
    let accounts = state.accounts.clone();
    let cards = state.cards.list_active(
        page.effective_offset(),
        page.effective_interval(),
        |card| {
            filter.matches(card)
                && owner.as_deref().map_or(true, |s| {
                    accounts
                        .get(&card.account_id)
                        .is_some_and(|a| a.secret == s)
                })
        },
    );

    let items = cards
        .into_iter()
        .map(|c| (c.id, CardView::project(&c, caller.role)))
        .collect();
    Ok(Json(links::collection(items, "cards")))
}

/// GET /cards/:id — Fetch one card.
#[utoipa::path(
    get,
    path = "/cards/{id}",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses(
        (status = 200, description = "Card found", body = CardView),
        (status = 403, description = "Not the caller's card", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "cards"
)]
pub(crate) async fn get_card(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Linked<CardView>>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client])?;
    let card = find_card_checked(&state, &caller, &id)?;
    Ok(Json(links::linked(
        CardView::project(&card, caller.role),
        "cards",
        card.id,
    )))
}

/// POST /cards — Create a card on an account the caller may use.
#[utoipa::path(
    post,
    path = "/cards",
    request_body = CardInput,
    responses(
        (status = 201, description = "Card created", body = CardView),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
        (status = 404, description = "Owning account not found", body = crate::error::ErrorBody),
    ),
    tag = "cards"
)]
pub(crate) async fn create_card(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CardInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Linked<CardView>>), AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client])?;
    let input = extract_validated_json(body)?;
    let account = find_account_checked(&state, &caller, &input.account_id)?;

    let card = Card {
        id: Uuid::new_v4(),
        number: input.number,
        cryptogram: input.cryptogram,
        expiration: input.expiration_date,
        code_hash: hash_code(&input.code),
        ceiling: input.ceiling,
        virtual_card: input.virtual_card,
        localization: input.localization,
        contactless: input.contactless,
        blocked: input.blocked,
        expired: false,
        date_added: Utc::now(),
        active: true,
        account_id: account.id,
    };

    state.cards.insert(card.clone());
    db::persist!(state, db::cards::save, &card);

    Ok((
        StatusCode::CREATED,
        Json(links::linked(
            CardView::project(&card, caller.role),
            "cards",
            card.id,
        )),
    ))
}

/// POST /cards/:id/code/check — Verify a PIN against the stored hash.
///
/// Comparison happens in constant time on the hashed values; neither
/// outcome echoes anything about the stored credential.
#[utoipa::path(
    post,
    path = "/cards/{id}/code/check",
    params(("id" = Uuid, Path, description = "Card ID")),
    request_body = CardCodeInput,
    responses(
        (status = 200, description = "Check performed", body = CheckResult),
        (status = 403, description = "Card blocked or expired", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "cards"
)]
pub(crate) async fn check_code(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<CardCodeInput>, JsonRejection>,
) -> Result<Json<CheckResult>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Atm])?;
    let input = extract_validated_json(body)?;

    let card = state
        .cards
        .find_active(&id)
        .ok_or_else(|| AppError::not_found("card", id))?;
    card.ensure_usable()?;

    let checked = verify_code(&input.code, &card.code_hash);
    Ok(Json(CheckResult {
        checked,
        message: if checked {
            "Card code checked.".to_string()
        } else {
            "Card code not checked!".to_string()
        },
    }))
}

/// POST /cards/identity/check — Verify a card credential triple.
///
/// Matches only usable cards: a blocked or expired card fails the check
/// the same way an unknown one does.
#[utoipa::path(
    post,
    path = "/cards/identity/check",
    request_body = CardIdentityInput,
    responses(
        (status = 200, description = "Check performed", body = CheckResult),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    tag = "cards"
)]
pub(crate) async fn check_identity(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CardIdentityInput>, JsonRejection>,
) -> Result<Json<CheckResult>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Merchant])?;
    let input = extract_validated_json(body)?;

    let matches = state.cards.list_active(0, 1, |card| {
        card.ensure_usable().is_ok()
            && card.number == input.number
            && card.cryptogram == input.cryptogram
            && card.expiration == input.expiration_date
    });

    let checked = !matches.is_empty();
    Ok(Json(CheckResult {
        checked,
        message: if checked {
            "Card identity checked.".to_string()
        } else {
            "Card identity not checked!".to_string()
        },
    }))
}

/// POST /cards/:id/expire — Drive the card into the expired terminal
/// state. Idempotent: expiring an already-expired card succeeds and
/// leaves it unchanged.
#[utoipa::path(
    post,
    path = "/cards/{id}/expire",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses(
        (status = 200, description = "Card expired", body = CardView),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "cards"
)]
pub(crate) async fn expire_card(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Linked<CardView>>, AppError> {
    require_role(&caller, Role::Admin)?;

    let updated = state
        .cards
        .update(&id, |card| card.expire())
        .ok_or_else(|| AppError::not_found("card", id))?;

    db::persist!(state, db::cards::save, &updated);
    Ok(Json(links::linked(
        CardView::project(&updated, caller.role),
        "cards",
        updated.id,
    )))
}

/// PUT /cards/:id — Replace every mutable field. Refused once the card
/// is blocked or expired.
#[utoipa::path(
    put,
    path = "/cards/{id}",
    params(("id" = Uuid, Path, description = "Card ID")),
    request_body = CardInput,
    responses(
        (status = 200, description = "Card updated", body = CardView),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
        (status = 403, description = "Denied or card blocked/expired", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "cards"
)]
pub(crate) async fn update_card(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<CardInput>, JsonRejection>,
) -> Result<Json<Linked<CardView>>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client])?;
    let input = extract_validated_json(body)?;

    let card = find_card_checked(&state, &caller, &id)?;
    card.ensure_usable()?;
    let account = find_account_checked(&state, &caller, &input.account_id)?;

    let updated = state
        .cards
        .update(&id, |card| {
            card.number = input.number.clone();
            card.cryptogram = input.cryptogram.clone();
            card.expiration = input.expiration_date.clone();
            card.code_hash = hash_code(&input.code);
            card.ceiling = input.ceiling;
            card.virtual_card = input.virtual_card;
            card.localization = input.localization;
            card.contactless = input.contactless;
            card.blocked = input.blocked;
            card.account_id = account.id;
        })
        .ok_or_else(|| AppError::not_found("card", id))?;

    db::persist!(state, db::cards::save, &updated);
    Ok(Json(links::linked(
        CardView::project(&updated, caller.role),
        "cards",
        updated.id,
    )))
}

/// PATCH /cards/:id — Merge the supplied fields, then re-validate the
/// complete result. Refused once the card is blocked or expired.
#[utoipa::path(
    patch,
    path = "/cards/{id}",
    params(("id" = Uuid, Path, description = "Card ID")),
    request_body = CardPatch,
    responses(
        (status = 200, description = "Card updated", body = CardView),
        (status = 400, description = "Merged result fails validation", body = crate::error::ErrorBody),
        (status = 403, description = "Denied or card blocked/expired", body = crate::error::ErrorBody),
        (status = 404, description = "Absent or soft-deleted", body = crate::error::ErrorBody),
    ),
    tag = "cards"
)]
pub(crate) async fn patch_card(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<CardPatch>, JsonRejection>,
) -> Result<Json<Linked<CardView>>, AppError> {
    require_any_role(&caller, &[Role::Admin, Role::Client])?;
    let patch = extract_json(body)?;

    let card = find_card_checked(&state, &caller, &id)?;
    card.ensure_usable()?;

    let mut merged = card.clone();
    patch.apply(&mut merged);
    patch.validate_merged(&merged)?;

    if let Some(account_id) = patch.account_id {
        find_account_checked(&state, &caller, &account_id)?;
    }

    let updated = state
        .cards
        .update(&id, |card| patch.apply(card))
        .ok_or_else(|| AppError::not_found("card", id))?;

    db::persist!(state, db::cards::save, &updated);
    Ok(Json(links::linked(
        CardView::project(&updated, caller.role),
        "cards",
        updated.id,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    fn admin() -> CallerIdentity {
        CallerIdentity::new(Role::Admin, "ops")
    }

    fn client(subject: &str) -> CallerIdentity {
        CallerIdentity::new(Role::Client, subject)
    }

    fn test_app(state: AppState, caller: CallerIdentity) -> Router {
        router()
            .layer(axum::Extension(caller))
            .with_state(state)
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Seed an account owned by `subject` directly into the store.
    fn seed_account(state: &AppState, subject: &str) -> Uuid {
        let account = dbank_state::Account {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
            country: "FR".to_string(),
            passport_number: "123456789".to_string(),
            phone_number: "+33600000001".to_string(),
            iban: "FR7630006000011234567890189".to_string(),
            balance: Decimal::ZERO,
            secret: subject.to_string(),
            date_added: Utc::now(),
            active: true,
        };
        let id = account.id;
        state.accounts.insert(account);
        id
    }

    fn card_input(account_id: Uuid) -> String {
        format!(
            r#"{{
                "number": "4970101122334455",
                "cryptogram": "123",
                "expirationDate": "2027-05",
                "code": "1234",
                "ceiling": "2000",
                "virtual": false,
                "localization": true,
                "contactless": true,
                "blocked": false,
                "accountId": "{account_id}"
            }}"#
        )
    }

    async fn create_card_for(state: &AppState, caller: CallerIdentity, account_id: Uuid) -> Uuid {
        let resp = test_app(state.clone(), caller)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cards")
                    .header("content-type", "application/json")
                    .body(Body::from(card_input(account_id)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        json["id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn create_hashes_the_code_and_never_echoes_it() {
        let state = AppState::new();
        let account_id = seed_account(&state, "u1");
        let id = create_card_for(&state, client("u1"), account_id).await;

        let stored = state.cards.find_active(&id).unwrap();
        assert_eq!(stored.code_hash, dbank_core::hash_code("1234"));

        let resp = test_app(state, admin())
            .oneshot(
                Request::builder()
                    .uri(format!("/cards/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert!(json.get("code").is_none());
        assert!(json.get("codeHash").is_none());
    }

    #[tokio::test]
    async fn projection_masks_number_for_non_admins() {
        let state = AppState::new();
        let account_id = seed_account(&state, "u1");
        let id = create_card_for(&state, client("u1"), account_id).await;

        let resp = test_app(state.clone(), client("u1"))
            .oneshot(
                Request::builder()
                    .uri(format!("/cards/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let restricted = body_json(resp).await;
        assert_eq!(restricted["number"], "************4455");
        assert!(restricted.get("cryptogram").is_none());
        assert!(restricted.get("expirationDate").is_none());

        let resp = test_app(state, admin())
            .oneshot(
                Request::builder()
                    .uri(format!("/cards/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let complete = body_json(resp).await;
        assert_eq!(complete["number"], "4970101122334455");
        assert_eq!(complete["cryptogram"], "123");
        assert_eq!(complete["expirationDate"], "2027-05");
    }

    #[tokio::test]
    async fn foreign_client_cannot_see_or_create_on_others_accounts() {
        let state = AppState::new();
        let account_id = seed_account(&state, "u1");
        let id = create_card_for(&state, client("u1"), account_id).await;

        let resp = test_app(state.clone(), client("u2"))
            .oneshot(
                Request::builder()
                    .uri(format!("/cards/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test_app(state, client("u2"))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cards")
                    .header("content-type", "application/json")
                    .body(Body::from(card_input(account_id)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn blocked_card_refuses_put_with_state_conflict() {
        let state = AppState::new();
        let account_id = seed_account(&state, "u1");
        let id = create_card_for(&state, client("u1"), account_id).await;

        // Block through a patch (the ordinary route into the ratchet).
        let resp = test_app(state.clone(), client("u1"))
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/cards/{id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"blocked": true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test_app(state.clone(), client("u1"))
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/cards/{id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(card_input(account_id)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "STATE_CONFLICT");

        // The ratchet has no reverse: un-blocking via patch is refused too.
        let resp = test_app(state, client("u1"))
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/cards/{id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"blocked": false}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn expire_is_admin_only_and_idempotent() {
        let state = AppState::new();
        let account_id = seed_account(&state, "u1");
        let id = create_card_for(&state, client("u1"), account_id).await;

        let resp = test_app(state.clone(), client("u1"))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/cards/{id}/expire"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        for _ in 0..2 {
            let resp = test_app(state.clone(), admin())
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(format!("/cards/{id}/expire"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let json = body_json(resp).await;
            assert_eq!(json["expired"], true);
        }

        // Terminal with respect to ordinary edits.
        let resp = test_app(state, client("u1"))
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/cards/{id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"ceiling": "5000"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn code_check_verifies_without_echoing_hash() {
        let state = AppState::new();
        let account_id = seed_account(&state, "u1");
        let id = create_card_for(&state, client("u1"), account_id).await;
        let atm = CallerIdentity::new(Role::Atm, "terminal-7");

        let resp = test_app(state.clone(), atm.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/cards/{id}/code/check"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"code": "1234"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["checked"], true);
        assert!(!json.to_string().contains(&dbank_core::hash_code("1234")));

        let resp = test_app(state, atm)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/cards/{id}/code/check"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"code": "0000"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["checked"], false);
    }

    #[tokio::test]
    async fn code_check_on_blocked_card_is_a_state_conflict() {
        let state = AppState::new();
        let account_id = seed_account(&state, "u1");
        let id = create_card_for(&state, client("u1"), account_id).await;
        state.cards.update(&id, |c| c.blocked = true).unwrap();

        let resp = test_app(state, admin())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/cards/{id}/code/check"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"code": "1234"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn identity_check_matches_usable_cards_only() {
        let state = AppState::new();
        let account_id = seed_account(&state, "u1");
        let id = create_card_for(&state, client("u1"), account_id).await;
        let merchant = CallerIdentity::new(Role::Merchant, "shop-1");

        let matching = r#"{
            "number": "4970101122334455",
            "cryptogram": "123",
            "expirationDate": "2027-05"
        }"#;

        let resp = test_app(state.clone(), merchant.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cards/identity/check")
                    .header("content-type", "application/json")
                    .body(Body::from(matching))
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["checked"], true);

        // Wrong cryptogram fails the check.
        let resp = test_app(state.clone(), merchant.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cards/identity/check")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{
                            "number": "4970101122334455",
                            "cryptogram": "999",
                            "expirationDate": "2027-05"
                        }"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["checked"], false);

        // Once expired, the same triple stops matching.
        state.cards.update(&id, |c| c.expire()).unwrap();
        let resp = test_app(state, merchant)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cards/identity/check")
                    .header("content-type", "application/json")
                    .body(Body::from(matching))
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["checked"], false);
    }

    #[tokio::test]
    async fn privileged_filters_are_admin_only() {
        let state = AppState::new();
        let resp = test_app(state.clone(), client("u1"))
            .oneshot(
                Request::builder()
                    .uri("/cards?cryptogram=12")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = test_app(state, admin())
            .oneshot(
                Request::builder()
                    .uri("/cards?cryptogram=12")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn patch_rejects_merged_result_that_fails_validation() {
        let state = AppState::new();
        let account_id = seed_account(&state, "u1");
        let id = create_card_for(&state, client("u1"), account_id).await;

        let resp = test_app(state.clone(), client("u1"))
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/cards/{id}"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"ceiling": "-5"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            state.cards.find_active(&id).unwrap().ceiling,
            dec!(2000)
        );
    }
}
