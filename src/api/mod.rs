pub mod deals;
pub mod feedback;
pub mod health;
pub mod upload;

use crate::store::DealStore;
use crate::upload::{Uploader, DEFAULT_MAX_UPLOAD_BYTES};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: DealStore,
    pub uploader: Uploader,
    /// Body limit for `POST /deals/upload`.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(store: DealStore, uploader: Uploader) -> Self {
        Self {
            store,
            uploader,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/deals", get(deals::list_deals))
        .route(
            "/deals/upload",
            post(upload::upload_deal).layer(upload_limit),
        )
        .route(
            "/deals/:id",
            get(deals::get_deal).delete(deals::delete_deal),
        )
        .route("/deals/:id/pdf", get(deals::view_pdf))
        .route("/deals/:id/feedback", post(feedback::submit_feedback))
        .route(
            "/deals/:id/feedback/:feedback_id",
            delete(feedback::delete_feedback),
        )
        .layer(cors)
        .with_state(state)
}
