//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single spec served at
//! `/openapi.json`.

use utoipa::OpenApi;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "dbank API",
        version = "0.3.2",
        description = "REST backend for a toy banking domain: accounts, payment cards, and money-transfer operations with role-gated field visibility, ownership-filtered lookups, soft-delete semantics, and partial-match search.\n\nIdentity is supplied by the gateway via the `x-auth-role` and `x-auth-subject` headers. Roles: Admin, Client, ATM, Merchant.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // ── Accounts ─────────────────────────────────────────────────────
        crate::routes::accounts::list_accounts,
        crate::routes::accounts::get_account,
        crate::routes::accounts::create_account,
        crate::routes::accounts::update_account,
        crate::routes::accounts::patch_account,
        // ── Cards ────────────────────────────────────────────────────────
        crate::routes::cards::list_cards,
        crate::routes::cards::get_card,
        crate::routes::cards::create_card,
        crate::routes::cards::check_code,
        crate::routes::cards::check_identity,
        crate::routes::cards::expire_card,
        crate::routes::cards::update_card,
        crate::routes::cards::patch_card,
        // ── Operations ───────────────────────────────────────────────────
        crate::routes::operations::list_operations,
        crate::routes::operations::get_operation,
        crate::routes::operations::create_operation,
        crate::routes::operations::confirm_operation,
        crate::routes::operations::update_operation,
        crate::routes::operations::patch_operation,
        crate::routes::operations::delete_operation,
    ),
    components(schemas(
        crate::routes::accounts::AccountInput,
        crate::routes::accounts::AccountPatch,
        crate::routes::accounts::AccountView,
        crate::routes::cards::CardInput,
        crate::routes::cards::CardPatch,
        crate::routes::cards::CardView,
        crate::routes::cards::CardCodeInput,
        crate::routes::cards::CardIdentityInput,
        crate::routes::cards::CheckResult,
        crate::routes::operations::OperationInput,
        crate::routes::operations::OperationPatch,
        crate::routes::operations::OperationView,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::links::Link,
        crate::links::EntityLinks,
        crate::links::CollectionLinks,
    )),
    tags(
        (name = "accounts", description = "Bank account management"),
        (name = "cards", description = "Payment card management and checks"),
        (name = "operations", description = "Money-transfer operations and confirmation"),
    )
)]
pub struct ApiDoc;
