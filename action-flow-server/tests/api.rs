use action_flow::{FlowConfig, FlowRunner, InMemorySessionStorage, ResultCode, SessionStorage};
use action_flow_server::{
    ActionResponse, AppState, SessionCreated, app,
    demo::{self, REGISTRATION_KEY, Registration},
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> (Router, Arc<InMemorySessionStorage>) {
    let storage = Arc::new(InMemorySessionStorage::new());
    let package = Arc::new(demo::registration_package(FlowConfig::default()).unwrap());
    let state = AppState::new(storage.clone()).with_runner(FlowRunner::new(package, storage.clone()));
    (app(state), storage)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn step(app: &Router, sid: &str, action: &str, params: Value) -> ActionResponse {
    let (status, body) = post_json(
        app,
        &format!("/flows/registration/{action}"),
        json!({ "session_id": sid, "params": params }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{action} failed: {body}");
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn health() {
    let (app, _) = test_app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn walks_the_registration_wizard() {
    let (app, storage) = test_app();

    let (status, body) = post_json(&app, "/sessions", json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let SessionCreated { session_id: sid } = serde_json::from_value(body).unwrap();

    let response = step(&app, &sid, "next", json!({ "name": "Ada" })).await;
    assert_eq!(response.dispatch.action, "saveName-1");
    assert_eq!(response.dispatch.view_action.as_deref(), Some("savePhone-2View"));

    let response = step(&app, &sid, "next", json!({ "phone": "call me" })).await;
    assert_eq!(response.dispatch.result, ResultCode::Input);
    assert_eq!(response.dispatch.field_errors.field("phone").len(), 1);

    let response = step(&app, &sid, "next", json!({ "phone": "+44 20 7946 0958" })).await;
    assert_eq!(response.dispatch.view_action.as_deref(), Some("saveEmail-3View"));

    let response = step(&app, &sid, "next", json!({ "email": "ada@example.com" })).await;
    assert!(response.dispatch.completed);

    let session = storage.get(&sid).await.unwrap().unwrap();
    let registration: Registration = session.context.get(REGISTRATION_KEY).await.unwrap();
    assert_eq!(registration.name, "Ada");
    assert_eq!(registration.phone.as_deref(), Some("+44 20 7946 0958"));

    let response = step(&app, &sid, "summary", json!({})).await;
    assert_eq!(response.dispatch.result, ResultCode::Success);
}

#[tokio::test]
async fn skip_phone_jumps_to_email() {
    let (app, _) = test_app();

    let (status, body) = post_json(
        &app,
        "/flows/registration/next",
        json!({ "params": { "name": "Grace", "skip_phone": "true" } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response: ActionResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.dispatch.view_action.as_deref(), Some("saveEmail-3View"));

    let sid = response.session_id;
    let response = step(&app, &sid, "prev", json!({})).await;
    assert_eq!(response.dispatch.result, ResultCode::FlowView);
    assert_eq!(response.dispatch.view_action.as_deref(), Some("savePhone-2View"));

    // the skipped phone form is passed over on the way back as well
    let response = step(&app, &sid, "savePhone-2View", json!({})).await;
    assert_eq!(response.dispatch.result, ResultCode::FlowView);
    assert_eq!(response.dispatch.view_action.as_deref(), Some("saveName-1View"));

    let response = step(&app, &sid, "saveName-1View", json!({})).await;
    assert_eq!(response.dispatch.result, ResultCode::Input);
}

#[tokio::test]
async fn prev_shows_phone_step_when_it_was_not_skipped() {
    let (app, _) = test_app();
    let (_, body) = post_json(&app, "/sessions", json!({})).await;
    let SessionCreated { session_id: sid } = serde_json::from_value(body).unwrap();

    step(&app, &sid, "next", json!({ "name": "Ada" })).await;
    step(&app, &sid, "next", json!({ "phone": "555" })).await;
    step(&app, &sid, "prev", json!({})).await;

    let response = step(&app, &sid, "savePhone-2View", json!({})).await;
    assert_eq!(response.dispatch.result, ResultCode::Input);
}

#[tokio::test]
async fn out_of_order_request_is_redirected() {
    let (app, _) = test_app();
    let (_, body) = post_json(&app, "/sessions", json!({})).await;
    let SessionCreated { session_id: sid } = serde_json::from_value(body).unwrap();

    let response = step(&app, &sid, "saveEmail-3", json!({ "email": "a@b.c" })).await;
    assert_eq!(response.dispatch.result, ResultCode::FlowView);
    assert_eq!(response.dispatch.view_action.as_deref(), Some("saveName-1View"));
}

#[tokio::test]
async fn unknown_package_session_and_action() {
    let (app, _) = test_app();

    let (status, _) = post_json(&app, "/flows/checkout/next", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing = uuid::Uuid::new_v4().to_string();
    let (status, _) = post_json(
        &app,
        "/flows/registration/next",
        json!({ "session_id": missing }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post_json(
        &app,
        "/flows/registration/next",
        json!({ "session_id": "not-a-uuid" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = post_json(&app, "/sessions", json!({})).await;
    let SessionCreated { session_id: sid } = serde_json::from_value(body).unwrap();
    let (status, _) = post_json(
        &app,
        "/flows/registration/deleteAccount",
        json!({ "session_id": sid }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn progress_can_be_read_and_reset() {
    let (app, _) = test_app();
    let (_, body) = post_json(&app, "/sessions", json!({})).await;
    let SessionCreated { session_id: sid } = serde_json::from_value(body).unwrap();
    step(&app, &sid, "next", json!({ "name": "Ada" })).await;

    let uri = format!("/flows/registration/sessions/{sid}");
    let response = app
        .clone()
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let progress: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(progress["previous_flow_action"], json!("saveName-1"));
    assert_eq!(progress["highest_current_action_index"], json!(1));

    let response = app
        .clone()
        .oneshot(Request::delete(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), Value::Null);
}
