//! End-to-end scenarios through the fully assembled app, identity
//! supplied via the forwarded gateway headers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tower::ServiceExt;

use dbank_api::{app, state::AppState};

fn test_app() -> (Router, AppState) {
    let state = AppState::new();
    (app(state.clone()), state)
}

fn request(
    method: &str,
    uri: &str,
    identity: Option<(&str, &str)>,
    body: Option<String>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((role, subject)) = identity {
        builder = builder
            .header("x-auth-role", role)
            .header("x-auth-subject", subject);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn account_input() -> String {
    r#"{
        "firstName": "Ada",
        "lastName": "Lovelace",
        "birthDate": "1990-12-10",
        "country": "FR",
        "passportNumber": "123456789",
        "phoneNumber": "+33600000001",
        "IBAN": "FR7630006000011234567890189"
    }"#
    .to_string()
}

fn operation_input(account_id: &str, amount: &str) -> String {
    format!(
        r#"{{
            "label": "Salary",
            "amount": "{amount}",
            "secondAccountName": "ACME Corp",
            "secondAccountCountry": "FR",
            "secondAccountIBAN": "FR7630006000011234567890189",
            "category": "income",
            "firstAccountId": "{account_id}"
        }}"#
    )
}

fn card_input(account_id: &str) -> String {
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

#[tokio::test]
async fn requests_without_identity_are_rejected() {
    let (app, _) = test_app();
    let (status, _) = send(&app, request("GET", "/accounts", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_confirm_freeze_lifecycle() {
    let (app, state) = test_app();
    let client = Some(("Client", "u1"));
    let admin = Some(("Admin", "ops"));

    // Client u1 creates an account; balance starts at zero.
    let (status, account) =
        send(&app, request("POST", "/accounts", client, Some(account_input()))).await;
    assert_eq!(status, StatusCode::CREATED);
    let account_id = account["id"].as_str().unwrap().to_string();
    assert_eq!(account["balance"], "0");

    // Client creates a pending operation of 100.0 on it.
    let (status, operation) = send(
        &app,
        request(
            "POST",
            "/operations",
            client,
            Some(operation_input(&account_id, "100.0")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(operation["confirmed"], false);
    let operation_id = operation["id"].as_str().unwrap().to_string();

    // Admin confirms: the balance moves exactly once.
    let (status, confirmed) = send(
        &app,
        request(
            "POST",
            &format!("/operations/{operation_id}/confirm"),
            admin,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["confirmed"], true);

    let (_, fetched) = send(
        &app,
        request("GET", &format!("/accounts/{account_id}"), admin, None),
    )
    .await;
    let balance: Decimal = fetched["balance"].as_str().unwrap().parse().unwrap();
    assert_eq!(balance, dec!(100));

    // A second confirm is rejected and the balance stays put.
    let (status, body) = send(
        &app,
        request(
            "POST",
            &format!("/operations/{operation_id}/confirm"),
            admin,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "STATE_CONFLICT");
    let account_uuid = account_id.parse().unwrap();
    assert_eq!(
        state.accounts.find_active(&account_uuid).unwrap().balance,
        dec!(100)
    );

    // PUT on the confirmed operation is frozen out.
    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/operations/{operation_id}"),
            admin,
            Some(operation_input(&account_id, "999")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "STATE_CONFLICT");

    // Category stays editable after confirmation.
    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/operations/{operation_id}"),
            admin,
            Some(r#"{"category": "bonus"}"#.to_string()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ownership_gates_clients_but_not_admins() {
    let (app, _) = test_app();

    let (_, account) = send(
        &app,
        request("POST", "/accounts", Some(("Client", "u1")), Some(account_input())),
    )
    .await;
    let account_id = account["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        request(
            "GET",
            &format!("/accounts/{account_id}"),
            Some(("Client", "u2")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(
            "GET",
            &format!("/accounts/{account_id}"),
            Some(("Admin", "ops")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn card_pin_check_never_leaks_the_stored_hash() {
    let (app, _) = test_app();
    let client = Some(("Client", "u1"));
    let atm = Some(("ATM", "terminal-7"));

    let (_, account) =
        send(&app, request("POST", "/accounts", client, Some(account_input()))).await;
    let account_id = account["id"].as_str().unwrap();

    let (status, card) = send(
        &app,
        request("POST", "/cards", client, Some(card_input(account_id))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let card_id = card["id"].as_str().unwrap();

    let (status, result) = send(
        &app,
        request(
            "POST",
            &format!("/cards/{card_id}/code/check"),
            atm,
            Some(r#"{"code": "1234"}"#.to_string()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["checked"], true);
    assert!(!result.to_string().contains(&dbank_core::hash_code("1234")));

    let (_, result) = send(
        &app,
        request(
            "POST",
            &format!("/cards/{card_id}/code/check"),
            atm,
            Some(r#"{"code": "0000"}"#.to_string()),
        ),
    )
    .await;
    assert_eq!(result["checked"], false);
    assert!(!result.to_string().contains(&dbank_core::hash_code("1234")));
}

#[tokio::test]
async fn masked_number_for_clients_full_number_for_admins() {
    let (app, _) = test_app();
    let client = Some(("Client", "u1"));

    let (_, account) =
        send(&app, request("POST", "/accounts", client, Some(account_input()))).await;
    let account_id = account["id"].as_str().unwrap();
    let (_, card) = send(
        &app,
        request("POST", "/cards", client, Some(card_input(account_id))),
    )
    .await;
    let card_id = card["id"].as_str().unwrap();

    // The create response already went to a client: masked.
    assert_eq!(card["number"], "************4455");

    let (_, complete) = send(
        &app,
        request(
            "GET",
            &format!("/cards/{card_id}"),
            Some(("Admin", "ops")),
            None,
        ),
    )
    .await;
    assert_eq!(complete["number"], "4970101122334455");
}

#[tokio::test]
async fn blocked_then_expired_card_ratchets() {
    let (app, _) = test_app();
    let client = Some(("Client", "u1"));
    let admin = Some(("Admin", "ops"));

    let (_, account) =
        send(&app, request("POST", "/accounts", client, Some(account_input()))).await;
    let account_id = account["id"].as_str().unwrap().to_string();
    let (_, card) = send(
        &app,
        request("POST", "/cards", client, Some(card_input(&account_id))),
    )
    .await;
    let card_id = card["id"].as_str().unwrap().to_string();

    // Block, then every edit is refused.
    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/cards/{card_id}"),
            client,
            Some(r#"{"blocked": true}"#.to_string()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/cards/{card_id}"),
            client,
            Some(card_input(&account_id)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "STATE_CONFLICT");

    // Expire is admin-only and idempotent: same terminal state twice.
    let (status, first) = send(
        &app,
        request("POST", &format!("/cards/{card_id}/expire"), admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send(
        &app,
        request("POST", &format!("/cards/{card_id}/expire"), admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["expired"], second["expired"]);
    assert_eq!(first["blocked"], second["blocked"]);
}

#[tokio::test]
async fn soft_deleted_operations_vanish_from_lookups_but_stay_resident() {
    let (app, state) = test_app();
    let client = Some(("Client", "u1"));
    let admin = Some(("Admin", "ops"));

    let (_, account) =
        send(&app, request("POST", "/accounts", client, Some(account_input()))).await;
    let account_id = account["id"].as_str().unwrap().to_string();
    let (_, operation) = send(
        &app,
        request(
            "POST",
            "/operations",
            client,
            Some(operation_input(&account_id, "10")),
        ),
    )
    .await;
    let operation_id = operation["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/operations/{operation_id}"), admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Gone from single fetch and from the list.
    let (status, _) = send(
        &app,
        request("GET", &format!("/operations/{operation_id}"), admin, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = send(&app, request("GET", "/operations", admin, None)).await;
    assert!(listed["items"].as_array().unwrap().is_empty());

    // Still resident for audit.
    let operation_uuid = operation_id.parse().unwrap();
    let resident = state.operations.get(&operation_uuid).unwrap();
    assert!(!dbank_state::Entity::is_active(&resident));
}

#[tokio::test]
async fn malformed_identifiers_are_400_not_404() {
    let (app, _) = test_app();
    let (status, _) = send(
        &app,
        request("GET", "/accounts/not-a-uuid", Some(("Admin", "ops")), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_pagination_applies_interval_and_offset() {
    let (app, _) = test_app();
    let client = Some(("Client", "u1"));

    for _ in 0..5 {
        let (status, _) =
            send(&app, request("POST", "/accounts", client, Some(account_input()))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, page) = send(
        &app,
        request("GET", "/accounts?interval=2", Some(("Admin", "ops")), None),
    )
    .await;
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let (_, page) = send(
        &app,
        request(
            "GET",
            "/accounts?interval=20&offset=4",
            Some(("Admin", "ops")),
            None,
        ),
    )
    .await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
}
