pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod error;
pub mod store;
pub mod upload;

pub use config::Config;
pub use datasource::{DealApi, DealApiError, HttpDealApi, MockDealApi, StaticToken, TokenProvider};
pub use domain::{
    Deal, DealFilter, DealId, DealStatus, Feedback, FeedbackId, FeedbackStage, FeedbackSubmission,
    RawDeal, Ratings, UserId,
};
pub use error::AppError;
pub use store::{DealSnapshot, DealStore, StoreConfig, StoreError};
pub use upload::{PdfDocument, UploadError, Uploader};
