//! HTTP front end for the athlete fatigue and injury-risk contracts.

pub mod config;
pub mod model;
pub mod routes;
pub mod types;

pub use config::{ArtifactPaths, ServiceConfig};
pub use model::InferenceContext;
pub use routes::{router, ApiError, AppState};
