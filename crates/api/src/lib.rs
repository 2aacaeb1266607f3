pub mod cache;
pub mod config;
pub mod metrics;
pub mod retry;
pub mod routes;
pub mod service;
pub mod telemetry;

pub use cache::AnswerCache;
pub use config::AppConfig;
pub use metrics::{Metrics, MetricsSnapshot};
pub use retry::RetryPolicy;
pub use routes::router;
pub use service::QueryService;
