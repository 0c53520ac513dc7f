mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{assert_close, store};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`
use usage_billing::config::BillingSettings;
use usage_billing::routes;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_raw(app, method, uri, body.map(|body| body.to_string())).await
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn app() -> Router {
    routes::app(store().await, BillingSettings::default())
}

#[tokio::test]
async fn root_responds_ok() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("Usage Billing API".into()));
}

#[tokio::test]
async fn end_to_end_billing_flow() {
    let app = app().await;

    let (status, customer) = send(
        &app,
        "POST",
        "/v1/customers",
        Some(json!({"name": "Acme Corp", "email": "contact@acme.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(customer["timezone"], "UTC");
    let customer_id = customer["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/v1/events/batch",
        Some(json!([
            {"customer_id": customer_id, "feature": "api_calls", "quantity": 10, "ts_event": "2024-01-05T00:00:00"},
            {"customer_id": customer_id, "feature": "api_calls", "quantity": 5, "ts_event": "2024-01-20T00:00:00"},
            {"customer_id": customer_id, "feature": "storage", "ts_event": "2024-01-28"},
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"inserted": 3}));

    let (status, usage) = send(
        &app,
        "GET",
        &format!("/v1/customers/{customer_id}/usage?start=2024-01-01T00:00:00Z&end=2024-02-01T00:00:00Z"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        usage,
        json!([
            {"feature": "api_calls", "quantity": 15.0},
            {"feature": "storage", "quantity": 1.0},
        ])
    );

    let (status, body) = send(
        &app,
        "POST",
        "/v1/invoices/run?period=2024-01&unit_price=0.01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({"invoices_generated": 1}));

    let (status, invoices) = send(
        &app,
        "GET",
        &format!("/v1/customers/{customer_id}/invoices"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let invoices = invoices.as_array().unwrap();
    assert_eq!(invoices.len(), 1);
    assert_close(invoices[0]["total"].as_f64().unwrap(), 0.16);
    assert_eq!(invoices[0]["line_items"].as_array().unwrap().len(), 2);
    assert_eq!(invoices[0]["line_items"][0]["feature"], "api_calls");
}

#[tokio::test]
async fn customer_creation_errors() {
    let app = app().await;

    let (status, body) = send(&app, "POST", "/v1/customers", Some(json!({"email": "x@example.com"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));

    let payload = json!({"name": "Dup", "email": "dup@example.com"});
    let (status, _) = send(&app, "POST", "/v1/customers", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", "/v1/customers", Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("dup@example.com"));
}

#[tokio::test]
async fn malformed_ingest_is_rejected() {
    let app = app().await;
    let (_, customer) = send(
        &app,
        "POST",
        "/v1/customers",
        Some(json!({"name": "Ingest", "email": "ingest@example.com"})),
    )
    .await;
    let customer_id = customer["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/v1/events/batch",
        Some(json!([
            {"customer_id": customer_id, "feature": "api_calls", "ts_event": "2024-01-05"},
            {"customer_id": customer_id, "feature": "api_calls", "quantity": "many", "ts_event": "2024-01-05"},
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("quantity"));

    let (status, _) = send(&app, "POST", "/v1/events/batch", Some(json!({"not": "an array"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/events/batch",
        Some(json!([{"customer_id": customer_id + 1, "feature": "api_calls", "ts_event": "2024-01-05"}])),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn query_parameter_validation() {
    let app = app().await;

    let (status, _) = send(&app, "GET", "/v1/customers/1/usage?start=2024-01-01", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/v1/customers/1/usage?start=soon&end=later", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/v1/invoices/run", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/v1/invoices/run?period=2024-13", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/v1/invoices/run?period=2024-01&unit_price=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/v1/invoices/run?period=2024-01&unit_price=cheap", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_customer_has_no_invoices() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/v1/customers/999/invoices", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn unparseable_bodies_get_a_json_error() {
    let app = app().await;

    let (status, body) =
        send_raw(&app, "POST", "/v1/customers", Some("{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/v1/customers",
        Some(json!({"name": 5, "email": "typed@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) =
        send_raw(&app, "POST", "/v1/events/batch", Some("[{".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn non_numeric_customer_id_gets_a_json_error() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/v1/customers/abc/invoices", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "GET",
        "/v1/customers/abc/usage?start=2024-01-01&end=2024-02-01",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
