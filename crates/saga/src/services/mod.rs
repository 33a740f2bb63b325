//! Limit service trait, in-memory implementation and HTTP client.

pub mod http;
pub mod limit;

pub use http::HttpLimitServiceClient;
pub use limit::{InMemoryLimitService, LimitService, LimitServiceError};
