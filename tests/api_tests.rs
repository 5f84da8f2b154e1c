use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use labflow::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

/// API key of the administrator seeded by the initial migrations.
const ADMIN_KEY: &str = "labflow_default_admin_api_key_please_regenerate";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = labflow::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    labflow::api::router(state).await
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-Api-Key", key);
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Registers an account and returns `(account_id, api_key, registration_payment_id)`.
async fn register(app: &Router, username: &str) -> (i64, String, i64) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@clinic.test"),
            "password": "secret123",
            "full_name": format!("{username} Tester"),
            "plan": "basic",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    (
        body["data"]["account"]["id"].as_i64().unwrap(),
        body["data"]["api_key"].as_str().unwrap().to_string(),
        body["data"]["payment"]["id"].as_i64().unwrap(),
    )
}

async fn approve(app: &Router, account_id: i64) -> (StatusCode, Value) {
    send(
        app,
        "PUT",
        &format!("/api/admin/approve-membership/{account_id}"),
        Some(ADMIN_KEY),
        Some(json!({})),
    )
    .await
}

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_plans_are_public() {
    let app = spawn_app().await;

    let (status, body) = send(&app, "GET", "/api/auth/plans", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["basic"]["monthly"].as_i64().unwrap() > 0);
    assert!(body["data"]["enterprise"]["yearly"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_authentication_required() {
    let app = spawn_app().await;

    let (status, body) = send(&app, "GET", "/api/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, "GET", "/api/auth/profile", Some("wrong-key"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/api/auth/profile", Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["account"]["role"], "admin");
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/subscription-status")
                .header(header::AUTHORIZATION, format!("Bearer {ADMIN_KEY}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_registration_then_approval_opens_clinical_routes() {
    let app = spawn_app().await;
    let (account_id, api_key, _) = register(&app, "alice").await;

    let (status, body) = send(&app, "GET", "/api/patients", Some(&api_key), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["data"]["reason"], "no_active_subscription");
    assert_eq!(body["data"]["subscription_status"], "pending_approval");

    let (status, body) = send(
        &app,
        "GET",
        "/api/admin/pending-approvals",
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["accounts"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["payments"].as_array().unwrap().len(), 1);

    let (status, body) = approve(&app, account_id).await;
    assert_eq!(status, StatusCode::OK, "approve failed: {body}");
    assert_eq!(body["data"]["account"]["subscription_status"], "active");
    assert_eq!(body["data"]["account"]["approval_status"], "approved");
    assert_eq!(body["data"]["payment"]["payment_status"], "completed");
    assert!(
        body["data"]["payment"]["receipt_number"]
            .as_str()
            .unwrap()
            .starts_with("RCP")
    );

    let (status, _) = send(&app, "GET", "/api/patients", Some(&api_key), None).await;
    assert_eq!(status, StatusCode::OK);

    // Nothing left to approve.
    let (status, _) = approve(&app, account_id).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let app = spawn_app().await;
    let (account_id, api_key, _) = register(&app, "bob").await;
    let uri = format!("/api/admin/reject-membership/{account_id}");

    let (status, _) = send(&app, "PUT", &uri, Some(ADMIN_KEY), Some(json!({ "reason": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(ADMIN_KEY),
        Some(json!({ "reason": "Payment slip unreadable" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["account"]["approval_status"], "rejected");
    assert_eq!(body["data"]["payment"]["payment_status"], "failed");

    let (status, _) = send(&app, "GET", "/api/visits", Some(&api_key), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = spawn_app().await;
    register(&app, "carol").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": "carol2",
            "email": "CAROL@clinic.test",
            "password": "secret123",
            "full_name": "Carol Again",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_role_cannot_be_self_registered() {
    let app = spawn_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": "mallory",
            "email": "mallory@clinic.test",
            "password": "secret123",
            "full_name": "Mallory",
            "role": "admin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_session_and_lockout() {
    let app = spawn_app().await;
    register(&app, "dave").await;

    let login = |password: &'static str| {
        let app = app.clone();
        async move {
            app.oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "email": "Dave@Clinic.test", "password": password }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap()
        }
    };

    let response = login("secret123").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/profile")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for _ in 0..5 {
        assert_eq!(login("wrong-password").await.status(), StatusCode::UNAUTHORIZED);
    }

    // Locked even with the right password.
    assert_eq!(login("secret123").await.status(), StatusCode::LOCKED);
}

#[tokio::test]
async fn test_admin_routes_reject_members() {
    let app = spawn_app().await;
    let (account_id, api_key, _) = register(&app, "erin").await;
    approve(&app, account_id).await;

    let (status, _) = send(&app, "GET", "/api/admin/users", Some(&api_key), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/api/metrics", Some(&api_key), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/admin/users?limit=10", Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total_items"], 2);

    let (status, _) = send(&app, "GET", "/api/admin/users?limit=500", Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_disabled_admin_loses_access() {
    let app = spawn_app().await;
    let (account_id, api_key, _) = register(&app, "hank").await;
    let uri = format!("/api/admin/users/{account_id}");

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(ADMIN_KEY),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "promotion failed: {body}");

    let (status, _) = send(&app, "GET", "/api/admin/users", Some(&api_key), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/api/patients", Some(&api_key), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(ADMIN_KEY),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (status, _) = send(&app, "GET", "/api/admin/users", Some(&api_key), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/patients", Some(&api_key), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["data"]["reason"], "account_disabled");
}

async fn pending_payment(app: &Router, api_key: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/create-payment",
        Some(api_key),
        Some(json!({ "plan": "basic", "months": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create-payment failed: {body}");
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_reused_gateway_transaction_id_conflicts() {
    let app = spawn_app().await;
    let (ivy_id, ivy_key, _) = register(&app, "ivy").await;
    let (jack_id, jack_key, _) = register(&app, "jack").await;
    approve(&app, ivy_id).await;
    approve(&app, jack_id).await;

    let ivy_payment = pending_payment(&app, &ivy_key).await;
    let jack_payment = pending_payment(&app, &jack_key).await;
    let details = json!({ "transaction_id": "GW-1" });

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/auth/confirm-payment/{ivy_payment}"),
        Some(&ivy_key),
        Some(details.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/auth/confirm-payment/{jack_payment}"),
        Some(&jack_key),
        Some(details),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("GW-1"));

    // Nothing was applied by the rejected confirmation.
    let (status, body) = send(&app, "GET", "/api/auth/payments", Some(&jack_key), None).await;
    assert_eq!(status, StatusCode::OK);
    let still_pending = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["id"] == jack_payment && p["payment_status"] == "pending");
    assert!(still_pending);
}

#[tokio::test]
async fn test_payment_confirmation_is_owner_only() {
    let app = spawn_app().await;
    let (alice_id, alice_key, registration_payment) = register(&app, "alice").await;
    let (_, bob_key, _) = register(&app, "bob").await;

    // The registration payment settles only through approval.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/auth/confirm-payment/{registration_payment}"),
        Some(&alice_key),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    approve(&app, alice_id).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/create-payment",
        Some(&alice_key),
        Some(json!({ "plan": "premium", "months": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["payment_status"], "pending");
    let payment_id = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/auth/confirm-payment/{payment_id}");

    let (status, _) = send(&app, "POST", &uri, Some(&bob_key), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(&alice_key),
        Some(json!({ "transaction_id": "GW-778" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_status"], "completed");
    assert_eq!(body["data"]["transaction_id"], "GW-778");

    // Terminal payments cannot be confirmed again.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/admin/payments/{payment_id}/confirm"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "GET", "/api/auth/subscription-status", Some(&alice_key), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscription_plan"], "premium");
    assert!(body["data"]["days_remaining"].as_i64().unwrap() > 100);
}

#[tokio::test]
async fn test_invalid_payment_requests() {
    let app = spawn_app().await;
    let (_, api_key, _) = register(&app, "frank").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/create-payment",
        Some(&api_key),
        Some(json!({ "plan": "platinum", "months": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/create-payment",
        Some(&api_key),
        Some(json!({ "plan": "basic", "months": 37 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_account_removes_payments() {
    let app = spawn_app().await;
    let (account_id, _, payment_id) = register(&app, "gina").await;

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/users/{account_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/admin/users/{account_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/admin/payments", Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_i64())
        .collect();
    assert!(!ids.contains(&payment_id));

    let (_, profile) = send(&app, "GET", "/api/auth/profile", Some(ADMIN_KEY), None).await;
    let admin_id = profile["data"]["account"]["id"].as_i64().unwrap();
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/users/{admin_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patient_and_visit_registry() {
    let app = spawn_app().await;

    let (status, body) = send(&app, "GET", "/api/patients/next-ln", Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    let expected_ln = body["data"]["ln"].as_str().unwrap().to_string();
    assert!(expected_ln.ends_with("0001"));

    let (status, body) = send(
        &app,
        "POST",
        "/api/patients",
        Some(ADMIN_KEY),
        Some(json!({
            "first_name": "Somchai",
            "last_name": "Jaidee",
            "id_card": "1101700000001",
            "birth_date": "1988-02-14",
            "age": 37,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create patient failed: {body}");
    assert_eq!(body["data"]["ln"], expected_ln.as_str());
    let patient_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/patients",
        Some(ADMIN_KEY),
        Some(json!({ "first_name": "Malee", "last_name": "Sukjai" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let second_ln = body["data"]["ln"].as_str().unwrap().to_string();
    assert!(second_ln.ends_with("0002"));
    assert_eq!(&second_ln[..4], &expected_ln[..4]);

    let (_, body) = send(&app, "GET", "/api/patients/last-ln", Some(ADMIN_KEY), None).await;
    assert_eq!(body["data"]["ln"], second_ln.as_str());

    let (status, _) = send(
        &app,
        "POST",
        "/api/patients",
        Some(ADMIN_KEY),
        Some(json!({ "first_name": "No surname" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "GET",
        "/api/patients/search?id_card=1101700000001",
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], patient_id);

    let (status, body) = send(&app, "GET", "/api/patients?search=malee", Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "POST",
        "/api/visits",
        Some(ADMIN_KEY),
        Some(json!({
            "patient_id": patient_id,
            "organization": "City Hospital",
            "weight": 70.5,
            "pulse": 72,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create visit failed: {body}");
    let reference = body["data"]["reference_number"].as_str().unwrap().to_string();
    let visit_id = body["data"]["id"].as_i64().unwrap();
    assert!(reference.ends_with("0001"));
    assert_eq!(body["data"]["patient"]["id"], patient_id);
    assert_eq!(body["data"]["status"], "pending");

    let (status, _) = send(
        &app,
        "POST",
        "/api/visits",
        Some(ADMIN_KEY),
        Some(json!({ "patient_id": 9999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/visits/id/{visit_id}"),
        Some(ADMIN_KEY),
        Some(json!({ "status": "completed", "doctor": "Dr. Wichai" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/visits?patient_id={patient_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/api/visits/organizations", Some(ADMIN_KEY), None).await;
    assert_eq!(body["data"], json!(["City Hospital"]));

    let (status, body) = send(&app, "GET", &format!("/api/visits/{reference}"), Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["doctor"], "Dr. Wichai");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/visits/id/{visit_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/api/visits/{reference}"), Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn create_patient_visit(app: &Router) -> (i64, i64) {
    let (status, body) = send(
        app,
        "POST",
        "/api/patients",
        Some(ADMIN_KEY),
        Some(json!({ "first_name": "Anong", "last_name": "Thongdee" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create patient failed: {body}");
    let patient_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        app,
        "POST",
        "/api/visits",
        Some(ADMIN_KEY),
        Some(json!({ "patient_id": patient_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create visit failed: {body}");
    (patient_id, body["data"]["id"].as_i64().unwrap())
}

async fn visit_status(app: &Router, patient_id: i64) -> Value {
    let (status, body) = send(
        app,
        "GET",
        &format!("/api/visits?patient_id={patient_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"][0]["status"].clone()
}

#[tokio::test]
async fn test_lab_catalogue() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/lab-items",
        Some(ADMIN_KEY),
        Some(json!({ "code": "GLU", "name": "Glucose", "category": "Chemistry", "price": 80 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create test failed: {body}");
    let glucose = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/lab-items",
        Some(ADMIN_KEY),
        Some(json!({ "code": "GLU", "name": "Glucose again", "price": 90 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("GLU"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/lab-items",
        Some(ADMIN_KEY),
        Some(json!({ "code": "HB", "name": "Hemoglobin", "price": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/lab-items",
        Some(ADMIN_KEY),
        Some(json!({ "code": "CHOL", "name": "Cholesterol", "price": 120 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let cholesterol = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/lab-groups",
        Some(ADMIN_KEY),
        Some(json!({
            "code": "CHECKUP",
            "name": "Annual checkup",
            "price": 350,
            "test_ids": [glucose, cholesterol, glucose],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create group failed: {body}");
    let group_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["tests"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        "POST",
        "/api/lab-groups",
        Some(ADMIN_KEY),
        Some(json!({ "code": "BAD", "name": "Unknown member", "price": 10, "test_ids": [999] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/lab-groups/{group_id}"),
        Some(ADMIN_KEY),
        Some(json!({ "price": 300, "test_ids": [cholesterol] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], 300);
    assert_eq!(body["data"]["tests"][0]["code"], "CHOL");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/lab-items/{glucose}"),
        Some(ADMIN_KEY),
        Some(json!({ "price": 85 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], 85);
    assert_eq!(body["data"]["name"], "Glucose");

    let (status, body) = send(&app, "GET", "/api/lab-items", Some(ADMIN_KEY), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/lab-groups/{group_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/lab-groups/{group_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lab_results_per_visit() {
    let app = spawn_app().await;
    let (_, visit_id) = create_patient_visit(&app).await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/lab-items",
        Some(ADMIN_KEY),
        Some(json!({ "code": "GLU", "name": "Glucose", "price": 80 })),
    )
    .await;
    let glucose = body["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/api/lab-results",
        Some(ADMIN_KEY),
        Some(json!({ "visit_id": 9999, "lab_test_id": glucose, "result_value": "95" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/api/lab-results",
        Some(ADMIN_KEY),
        Some(json!({
            "visit_id": visit_id,
            "lab_test_id": glucose,
            "result_value": "95",
            "unit": "mg/dL",
            "normal_range": "70-100",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "record result failed: {body}");
    let result_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["test"]["code"], "GLU");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/lab-results/{result_id}"),
        Some(ADMIN_KEY),
        Some(json!({ "result_value": "102", "note": "Fasting not confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result_value"], "102");
    assert_eq!(body["data"]["unit"], "mg/dL");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/lab-results/visit/{visit_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // A test with recorded results stays in the catalogue.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/lab-items/{glucose}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_orders_drive_visit_status() {
    let app = spawn_app().await;
    let (patient_id, visit_id) = create_patient_visit(&app).await;
    register(&app, "lena").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/lab-groups",
        Some(ADMIN_KEY),
        Some(json!({ "code": "CBC", "name": "Complete blood count", "price": 150 })),
    )
    .await;
    let cbc = body["data"]["id"].as_i64().unwrap();
    let (_, body) = send(
        &app,
        "POST",
        "/api/lab-groups",
        Some(ADMIN_KEY),
        Some(json!({ "code": "LIPID", "name": "Lipid profile", "price": 400 })),
    )
    .await;
    let lipid = body["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/api/orders",
        Some(ADMIN_KEY),
        Some(json!({ "visit_id": visit_id, "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(visit_status(&app, patient_id).await, "pending");

    let (status, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(ADMIN_KEY),
        Some(json!({
            "visit_id": visit_id,
            "items": [{ "lab_group_id": cbc, "qty": 2 }, { "lab_group_id": lipid }],
            "payment_method": "transfer",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create order failed: {body}");
    let order_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["total_amount"], 700);
    assert_eq!(body["data"]["patient_id"], patient_id);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["items"][1]["name"], "Lipid profile");
    assert_eq!(visit_status(&app, patient_id).await, "processing");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/orders?visit_id={visit_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let cancel = |password: &str, reason: &str| {
        json!({ "reason": reason, "username": "lena", "password": password })
    };
    let cancel_uri = format!("/api/orders/{order_id}/cancel");

    let (status, _) = send(
        &app,
        "PUT",
        &cancel_uri,
        Some(ADMIN_KEY),
        Some(cancel("wrong-password", "Duplicate order")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "PUT", &cancel_uri, Some(ADMIN_KEY), Some(cancel("secret123", "  "))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(visit_status(&app, patient_id).await, "processing");

    let (status, body) = send(
        &app,
        "PUT",
        &cancel_uri,
        Some(ADMIN_KEY),
        Some(cancel("secret123", "Duplicate order")),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "cancel failed: {body}");
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["cancelled_by"], "lena");
    assert_eq!(body["data"]["cancellation_reason"], "Duplicate order");
    assert_eq!(visit_status(&app, patient_id).await, "pending");

    let (status, _) = send(
        &app,
        "PUT",
        &cancel_uri,
        Some(ADMIN_KEY),
        Some(cancel("secret123", "Duplicate order")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(ADMIN_KEY),
        Some(json!({ "visit_id": visit_id, "items": [{ "lab_group_id": cbc }] })),
    )
    .await;
    let second = body["data"]["id"].as_i64().unwrap();
    assert_eq!(visit_status(&app, patient_id).await, "processing");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/orders/{second}/start"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "in_progress");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/orders/{second}/complete"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "done");
    assert_eq!(visit_status(&app, patient_id).await, "completed");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/orders?patient_id={patient_id}"),
        Some(ADMIN_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], second);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_order_rejects_foreign_patient() {
    let app = spawn_app().await;
    let (patient_id, visit_id) = create_patient_visit(&app).await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/lab-groups",
        Some(ADMIN_KEY),
        Some(json!({ "code": "UA", "name": "Urinalysis", "price": 60 })),
    )
    .await;
    let group = body["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/api/orders",
        Some(ADMIN_KEY),
        Some(json!({
            "patient_id": patient_id + 1,
            "visit_id": visit_id,
            "items": [{ "lab_group_id": group }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/orders",
        Some(ADMIN_KEY),
        Some(json!({ "visit_id": visit_id, "items": [{ "lab_group_id": 999 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(visit_status(&app, patient_id).await, "pending");
}
