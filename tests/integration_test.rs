use axum::body::Body;
use axum::http::{Request, StatusCode};
use dealroom::api::{self, upload::FILE_NAME_HEADER, AppState};
use dealroom::datasource::mock::{MockDealApi, MockOperation};
use dealroom::domain::Analysis;
use dealroom::{DealApiError, DealId, DealStatus, DealStore, RawDeal, StoreConfig, Uploader, UserId};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

fn raw(id: i64, company: &str, industry: &str, status: DealStatus) -> RawDeal {
    let analysis: Analysis = serde_json::from_value(json!({
        "company": {"name": company},
        "industry": industry,
    }))
    .unwrap();
    RawDeal {
        id: DealId(id),
        file_name: format!("{}.pdf", company),
        user_name: Some("Analyst".to_string()),
        status,
        analysis_data: Some(analysis),
        feedbacks: Some(Vec::new()),
    }
}

async fn setup_test_app(mock: Arc<MockDealApi>) -> (axum::Router, DealStore) {
    let store = DealStore::new(mock.clone(), StoreConfig::default());
    store.initialize(Some(UserId::new("u1"))).await;
    let uploader = Uploader::new(mock, store.clone());
    let state = AppState::new(store.clone(), uploader);
    (api::create_router(state), store)
}

fn seeded_mock() -> Arc<MockDealApi> {
    Arc::new(MockDealApi::new().with_deals(vec![
        raw(1, "Acme Corp", "Logistics", DealStatus::Complete),
        raw(2, "Birch Labs", "Healthcare", DealStatus::Complete),
        raw(3, "Cedar Freight", "Logistics", DealStatus::Failed),
    ]))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn deal_ids(body: &Value) -> Vec<i64> {
    body["deals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, store) = setup_test_app(seeded_mock()).await;

    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    store.dispose();
}

#[tokio::test]
async fn test_ready_endpoint_waits_for_first_load() {
    let mock = seeded_mock();
    let store = DealStore::new(mock.clone(), StoreConfig::default());
    let app = api::create_router(AppState::new(
        store.clone(),
        Uploader::new(mock, store.clone()),
    ));

    let (status, _) = get_json(app.clone(), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    store.initialize(Some(UserId::new("u1"))).await;
    let (status, body) = get_json(app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    store.dispose();
}

#[tokio::test]
async fn test_list_deals_with_filters() {
    let (app, store) = setup_test_app(seeded_mock()).await;

    let (status, body) = get_json(app.clone(), "/deals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deal_ids(&body), vec![1, 2, 3]);
    assert_eq!(body["isLoading"], false);
    assert_eq!(body["deals"][0]["title"], "Acme Corp");
    assert_eq!(body["deals"][0]["feedbackStage"], "feedback_needed");
    assert_eq!(body["deals"][2]["badge"]["text"], "Analysis Failed");

    let (_, body) = get_json(app.clone(), "/deals?industry=logistics").await;
    assert_eq!(deal_ids(&body), vec![1, 3]);

    let (_, body) = get_json(app.clone(), "/deals?industry=logistics&status=complete").await;
    assert_eq!(deal_ids(&body), vec![1]);

    let (_, body) = get_json(app.clone(), "/deals?search=birch&status=all").await;
    assert_eq!(deal_ids(&body), vec![2]);

    let (status, body) = get_json(app, "/deals?status=archived").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    store.dispose();
}

#[tokio::test]
async fn test_get_deal_and_missing_deal() {
    let (app, store) = setup_test_app(seeded_mock()).await;

    let (status, body) = get_json(app.clone(), "/deals/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Birch Labs");
    assert_eq!(body["tags"], json!(["Healthcare"]));

    let (status, _) = get_json(app, "/deals/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    store.dispose();
}

#[tokio::test]
async fn test_delete_deal_endpoint() {
    let mock = seeded_mock();
    let (app, store) = setup_test_app(mock.clone()).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/deals/2")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(store.get(DealId(2)).is_none());

    mock.fail(
        MockOperation::DeleteDeal,
        DealApiError::Http {
            status: 500,
            detail: None,
        },
    );
    let request = Request::builder()
        .method("DELETE")
        .uri("/deals/1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Could not delete deal. Please try again.");
    assert!(store.get(DealId(1)).is_some());
    store.dispose();
}

#[tokio::test]
async fn test_feedback_submit_and_delete() {
    let mock = seeded_mock();
    let (app, store) = setup_test_app(mock.clone()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/deals/1/feedback")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"comment": "Strong team", "ratings": {"risk": 2, "return": 4, "team": 5}})
                .to_string(),
        ))
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get_json(app.clone(), "/deals/1").await;
    assert_eq!(body["currentUserHasSubmitted"], true);
    assert_eq!(body["feedbackStage"], "in_progress");
    let feedback_id = body["feedback"][0]["id"].as_i64().unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/deals/1/feedback/{}", feedback_id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get_json(app, "/deals/1").await;
    assert_eq!(body["currentUserHasSubmitted"], false);
    assert_eq!(mock.calls(MockOperation::SubmitFeedback), 1);
    store.dispose();
}

#[tokio::test]
async fn test_feedback_rejects_out_of_range_rating() {
    let mock = seeded_mock();
    let (app, store) = setup_test_app(mock.clone()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/deals/1/feedback")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"comment": "", "ratings": {"risk": 9, "return": 1, "team": 1}}).to_string(),
        ))
        .unwrap();
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(mock.calls(MockOperation::SubmitFeedback), 0);
    store.dispose();
}

#[tokio::test]
async fn test_upload_endpoint() {
    let mock = seeded_mock();
    let (app, store) = setup_test_app(mock.clone()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/deals/upload")
        .header(FILE_NAME_HEADER, "notes.txt")
        .header("content-type", "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let (status, body) = send(app.clone(), request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please select a valid PDF file.");
    assert_eq!(mock.calls(MockOperation::Upload), 0);

    let request = Request::builder()
        .method("POST")
        .uri("/deals/upload")
        .header(FILE_NAME_HEADER, "Dune.pdf")
        .header("content-type", "application/pdf")
        .body(Body::from(&b"%PDF-1.4\nbody"[..]))
        .unwrap();
    let (status, body) = send(app.clone(), request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 4);
    assert_eq!(body["status"], "Analyzing");
    assert_eq!(body["badge"]["text"], "Analyzing...");

    let (_, body) = get_json(app, "/deals").await;
    assert_eq!(deal_ids(&body), vec![4, 1, 2, 3]);
    assert!(store.is_polling());
    store.dispose();
}

fn pdf_of_size(len: usize) -> Vec<u8> {
    let mut body = b"%PDF-1.4\n".to_vec();
    body.resize(len, b'0');
    body
}

#[tokio::test]
async fn test_upload_accepts_documents_over_two_megabytes() {
    let mock = seeded_mock();
    let (app, store) = setup_test_app(mock.clone()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/deals/upload")
        .header(FILE_NAME_HEADER, "Large CIM.pdf")
        .header("content-type", "application/pdf")
        .body(Body::from(pdf_of_size(3 * 1024 * 1024)))
        .unwrap();
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(mock.calls(MockOperation::Upload), 1);
    store.dispose();
}

#[tokio::test]
async fn test_upload_over_configured_limit_is_rejected() {
    let mock = seeded_mock();
    let store = DealStore::new(mock.clone(), StoreConfig::default());
    store.initialize(Some(UserId::new("u1"))).await;
    let state = AppState::new(store.clone(), Uploader::new(mock.clone(), store.clone()))
        .with_max_upload_bytes(1024);
    let app = api::create_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/deals/upload")
        .header(FILE_NAME_HEADER, "Big.pdf")
        .header("content-type", "application/pdf")
        .body(Body::from(pdf_of_size(4096)))
        .unwrap();
    let (status, _) = send(app, request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(mock.calls(MockOperation::Upload), 0);
    store.dispose();
}

#[tokio::test]
async fn test_view_pdf_endpoint() {
    let mock = Arc::new(
        MockDealApi::new()
            .with_deal(raw(1, "Acme Corp", "Logistics", DealStatus::Complete))
            .with_pdf(b"%PDF-1.7 deck".to_vec()),
    );
    let (app, store) = setup_test_app(mock).await;

    let request = Request::builder()
        .method("GET")
        .uri("/deals/1/pdf")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"%PDF-1.7 deck");

    let (status, body) = get_json(app, "/deals/7/pdf").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Deal not found");
    store.dispose();
}
