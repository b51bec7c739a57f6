//! End-to-end tests of the HTTP surface against an in-memory database.

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use convenio_db::{Database, DbConfig};
use convenio_server::{router, AppState, ServerConfig};

// =============================================================================
// Helpers
// =============================================================================

async fn app() -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    router(AppState::new(db, ServerConfig::default()))
}

fn encode(pairs: &[(&str, &str)]) -> String {
    fn escape(s: &str) -> String {
        s.bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                b' ' => "+".to_string(),
                _ => format!("%{:02X}", b),
            })
            .collect()
    }

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(encode(pairs)))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_client(app: &Router, code: &str, tax_id: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        post(
            "/clients",
            &[
                ("internal_code", code),
                ("full_name", name),
                ("tax_id", tax_id),
                ("email", "cliente@example.com"),
                ("city", "Recife"),
                ("state", "PE"),
                ("salary", "3.000,00"),
                ("percentage", "30"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

async fn create_agreement(app: &Router, max_installments: &str) -> Value {
    let (status, body) = send(
        app,
        post(
            "/agreements",
            &[
                ("store_code", "101"),
                ("name", "Prefeitura de Olinda"),
                ("tax_id", "11.222.333/0001-81"),
                ("active", "on"),
                ("max_installments", max_installments),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

fn id(record: &Value) -> &str {
    record["id"].as_str().unwrap()
}

// =============================================================================
// CRUD
// =============================================================================

#[tokio::test]
async fn test_create_client_computes_balance() {
    let app = app().await;
    let client = create_client(&app, "C-001", "123.456.789-01", "Ana Souza").await;

    assert_eq!(client["tax_id"], "12345678901");
    assert_eq!(client["balance_cents"], 90_000);

    let (status, detail) = send(&app, get(&format!("/clients/{}", id(&client)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["full_name"], "Ana Souza");
}

#[tokio::test]
async fn test_rejected_form_reports_every_field() {
    let app = app().await;
    let (status, body) = send(&app, post("/clients", &[("full_name", "Sem Dados")])).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    for field in ["internal_code", "tax_id", "email", "city"] {
        assert!(body["errors"]["fields"][field].is_array(), "missing error for {}", field);
    }
}

#[tokio::test]
async fn test_duplicate_tax_id_is_a_conflict() {
    let app = app().await;
    create_client(&app, "C-001", "12345678901", "Ana Souza").await;

    let (status, body) = send(
        &app,
        post(
            "/clients",
            &[
                ("internal_code", "C-002"),
                ("full_name", "Bruno Lima"),
                ("tax_id", "123.456.789-01"),
                ("email", "bruno@example.com"),
                ("city", "Recife"),
                ("state", "PE"),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE");
    assert!(body["errors"]["fields"]["tax_id"].is_array());
}

#[tokio::test]
async fn test_unknown_record_is_not_found() {
    let app = app().await;

    let (status, body) = send(&app, get("/clients/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(&app, post("/sectors/does-not-exist/delete", &[])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        post("/sectors/does-not-exist", &[("code", "01"), ("description", "Bebidas")]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_confirm_then_delete() {
    let app = app().await;
    let (status, sector) = send(
        &app,
        post("/sectors", &[("code", "01"), ("description", "Bebidas")]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let path = format!("/sectors/{}/delete", id(&sector));

    let (status, confirm) = send(&app, get(&path)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirm["record"]["description"], "Bebidas");
    assert!(confirm["message"].as_str().unwrap().contains("sector"));

    let (status, deleted) = send(&app, post(&path, &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], true);

    let (status, _) = send(&app, get(&format!("/sectors/{}", id(&sector)))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_password_is_never_returned() {
    let app = app().await;
    let (status, user) = send(
        &app,
        post(
            "/users",
            &[
                ("access_level", "Operador"),
                ("permission", "Parcial"),
                ("name", "Caixa 1"),
                ("username", "caixa1"),
                ("password", "s3nha-forte"),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{}", user);
    assert_eq!(user["username"], "caixa1");
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());

    // Updating without a password keeps the stored one
    let (status, _) = send(
        &app,
        post(
            &format!("/users/{}", id(&user)),
            &[
                ("access_level", "Operador"),
                ("permission", "Parcial"),
                ("name", "Caixa Um"),
                ("username", "caixa1"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Lists
// =============================================================================

#[tokio::test]
async fn test_list_clamps_page_and_honours_partial_header() {
    let app = app().await;
    create_client(&app, "C-001", "11111111111", "Ana Souza").await;
    create_client(&app, "C-002", "22222222222", "Bruno Lima").await;
    create_client(&app, "C-003", "33333333333", "Carla Dias").await;

    let (status, page) = send(&app, get("/clients?per_page=2&page=9999")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["page"], 2);
    assert_eq!(page["pagination"]["total"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["schema"]["key"], "clients");

    let (_, page) = send(&app, get("/clients?per_page=2&page=abc")).await;
    assert_eq!(page["pagination"]["page"], 1);
    assert_eq!(page["items"][0]["full_name"], "Ana Souza");

    let request = Request::builder()
        .uri("/clients?search=bruno")
        .header("X-Requested-With", "XMLHttpRequest")
        .body(Body::empty())
        .unwrap();
    let (status, fragment) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(fragment.get("schema").is_none());
    assert_eq!(fragment["items"].as_array().unwrap().len(), 1);
    assert_eq!(fragment["filters"]["search"], "bruno");
}

#[tokio::test]
async fn test_unknown_sort_falls_back_to_default() {
    let app = app().await;
    create_client(&app, "C-002", "22222222222", "Bruno Lima").await;
    create_client(&app, "C-001", "11111111111", "Ana Souza").await;

    let (status, page) = send(&app, get("/clients?sort_by=salary_cents;DROP&order=desc")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["filters"]["sort_by"], "full_name");
    assert_eq!(page["items"][0]["full_name"], "Bruno Lima");
}

#[tokio::test]
async fn test_undecodable_query_answers_json() {
    let app = app().await;

    let (status, body) = send(&app, get("/clients?page=1&page=2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("page"));
}

#[tokio::test]
async fn test_json_body_answers_json() {
    let app = app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/clients")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"full_name":"Ana Souza"}"#))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["code"], "UNSUPPORTED_MEDIA_TYPE");

    let (_, page) = send(&app, get("/clients")).await;
    assert_eq!(page["pagination"]["total"], 0);
}

// =============================================================================
// Lookups
// =============================================================================

#[tokio::test]
async fn test_client_lookup_by_tax_id() {
    let app = app().await;
    let client = create_client(&app, "C-001", "12345678901", "Ana Souza").await;

    let (status, found) = send(&app, get("/api/clients/by-tax-id?tax_id=123.456.789-01")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], client["id"]);
    assert_eq!(found["name"], "Ana Souza");
    assert_eq!(found["balance"], "900.00");

    let (status, found) = send(&app, get("/api/clients/by-tax-id?cpf=12345678901")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], client["id"]);

    let (status, missing) = send(&app, get("/api/clients/by-tax-id?tax_id=99999999999")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(missing["id"].is_null());
    assert_eq!(missing["name"], "Client not found.");
    assert_eq!(missing["balance"], "0.00");

    let (status, _) = send(&app, get("/api/clients/by-tax-id")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_installment_limit_lookup() {
    let app = app().await;
    let agreement = create_agreement(&app, "6").await;

    let (status, limit) = send(
        &app,
        get(&format!("/api/agreements/installment-limit?id={}", id(&agreement))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(limit["max_installments"], 6);

    let (status, _) = send(&app, get("/api/agreements/installment-limit?id=nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/api/agreements/installment-limit")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Issuances and sales
// =============================================================================

#[tokio::test]
async fn test_issuance_lifecycle() {
    let app = app().await;
    let client = create_client(&app, "C-001", "12345678901", "Ana Souza").await;
    let agreement = create_agreement(&app, "6").await;

    let issuance_form = |value: &'static str| {
        vec![
            ("tax_id", "123.456.789-01"),
            ("client_id", id(&client)),
            ("agreement_id", id(&agreement)),
            ("value", value),
            ("installments", "3"),
            ("reference_month", "07/2025"),
        ]
    };

    // Over the R$ 900,00 balance
    let (status, body) = send(&app, post("/issuances", &issuance_form("1.000,00"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["fields"]["value"][0]
        .as_str()
        .unwrap()
        .contains("exceeds"));

    let (status, issuance) = send(&app, post("/issuances", &issuance_form("150,00"))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", issuance);
    assert_eq!(issuance["value_cents"], 15_000);
    assert_eq!(issuance["reference_month"], "072025");
    assert_eq!(issuance["client_name"], "Ana Souza");

    let (status, details) = send(
        &app,
        get(&format!("/api/issuances/details?id={}", id(&issuance))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["value"], "150.00");
    assert_eq!(details["installments"], 3);

    let (status, installments) = send(
        &app,
        get(&format!("/issuances/{}/installments", id(&issuance))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let installments = installments.as_array().unwrap().clone();
    assert_eq!(installments.len(), 3);
    assert_eq!(installments[0]["value_cents"], 5_000);

    // A referenced client can't be deleted
    let (status, body) = send(&app, post(&format!("/clients/{}/delete", id(&client)), &[])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "REFERENCE_VIOLATION");

    // Unknown status word
    let first = installments[0]["id"].as_str().unwrap().to_string();
    let (status, body) = send(
        &app,
        post(&format!("/installments/{}/status", first), &[("status", "refunded")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["fields"]["status"].is_array());

    let (status, paid) = send(
        &app,
        post(&format!("/installments/{}/status", first), &[("status", "paid")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["payment_status"], "paid");

    // A paid installment freezes the issuance
    let (status, body) = send(
        &app,
        post(&format!("/issuances/{}", id(&issuance)), &issuance_form("100,00")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["non_field"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sale_defaults_from_issuance() {
    let app = app().await;
    let client = create_client(&app, "C-001", "12345678901", "Ana Souza").await;
    let agreement = create_agreement(&app, "6").await;

    let (_, issuance) = send(
        &app,
        post(
            "/issuances",
            &[
                ("tax_id", "12345678901"),
                ("agreement_id", id(&agreement)),
                ("value", "300"),
                ("installments", "2"),
                ("reference_month", "082025"),
            ],
        ),
    )
    .await;
    let (_, user) = send(
        &app,
        post(
            "/users",
            &[
                ("access_level", "Operador"),
                ("permission", "Parcial"),
                ("name", "Caixa 1"),
                ("username", "caixa1"),
                ("password", "s3nha-forte"),
            ],
        ),
    )
    .await;

    let (status, sale) = send(
        &app,
        post(
            "/sales",
            &[("user_id", id(&user)), ("issuance_id", id(&issuance))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", sale);
    assert_eq!(sale["client_id"], client["id"]);
    assert_eq!(sale["value_cents"], 30_000);
    assert_eq!(sale["installments"], 2);
    assert_eq!(sale["username"], "caixa1");

    // The sale now pins the issuance
    let (status, _) = send(
        &app,
        post(&format!("/issuances/{}/delete", id(&issuance)), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// =============================================================================
// System
// =============================================================================

#[tokio::test]
async fn test_schema_endpoint() {
    let app = app().await;

    let (status, schema) = send(&app, get("/api/schema/agreement-openings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schema["key"], "agreement-openings");
    assert!(schema["fields"].as_array().unwrap().len() > 1);

    let (status, _) = send(&app, get("/api/schema/spaceships")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, health) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["database"], true);
    assert_eq!(health["migrations_applied"], health["migrations_total"]);
}
