//! HTTP client for a remote limit-management service.

use std::time::Duration;

use async_trait::async_trait;
use common::{Amount, ConsumerId, Tenor};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::limit::{LimitService, LimitServiceError};

#[derive(Debug, Deserialize)]
struct LimitResponse {
    available_limit: u64,
}

#[derive(Debug, Serialize)]
struct DecrementRequest {
    amount: u64,
}

/// [`LimitService`] backed by the limit service's REST API.
///
/// - `GET {base}/consumer-limits/{consumer_id}/tenors/{tenor}`
/// - `POST {base}/consumer-limits/{consumer_id}/tenors/{tenor}/decrement`
///
/// Both answer `{"available_limit": u64}`. The client holds no deadline of
/// its own beyond the connect timeout; callers cancel through the saga.
#[derive(Debug, Clone)]
pub struct HttpLimitServiceClient {
    client: Client,
    base_url: String,
}

impl HttpLimitServiceClient {
    /// Creates a client with the given connect timeout.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, LimitServiceError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| LimitServiceError::Unavailable(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a client around an existing `reqwest::Client`.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn limit_url(&self, consumer_id: ConsumerId, tenor: Tenor) -> String {
        format!(
            "{}/consumer-limits/{}/tenors/{}",
            self.base_url, consumer_id, tenor
        )
    }

    async fn read_limit(
        response: Response,
        consumer_id: ConsumerId,
        tenor: Tenor,
    ) -> Result<Amount, LimitServiceError> {
        let status = response.status();
        match status {
            s if s.is_success() => {
                let body = response
                    .json::<LimitResponse>()
                    .await
                    .map_err(|e| LimitServiceError::InvalidResponse(e.to_string()))?;
                Ok(Amount::new(body.available_limit))
            }
            StatusCode::NOT_FOUND => {
                Err(LimitServiceError::ConsumerLimitNotFound { consumer_id, tenor })
            }
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                let detail = response.text().await.unwrap_or_default();
                Err(LimitServiceError::Rejected(if detail.is_empty() {
                    status.to_string()
                } else {
                    detail
                }))
            }
            other => Err(LimitServiceError::Unavailable(format!(
                "unexpected status {other}"
            ))),
        }
    }
}

fn transport_error(err: reqwest::Error) -> LimitServiceError {
    LimitServiceError::Unavailable(err.to_string())
}

#[async_trait]
impl LimitService for HttpLimitServiceClient {
    #[tracing::instrument(skip(self), fields(%consumer_id, %tenor))]
    async fn get_available_limit(
        &self,
        consumer_id: ConsumerId,
        tenor: Tenor,
    ) -> Result<Amount, LimitServiceError> {
        let response = self
            .client
            .get(self.limit_url(consumer_id, tenor))
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_limit(response, consumer_id, tenor).await
    }

    #[tracing::instrument(skip(self), fields(%consumer_id, %tenor, %amount))]
    async fn decrement_available_limit(
        &self,
        consumer_id: ConsumerId,
        tenor: Tenor,
        amount: Amount,
    ) -> Result<Amount, LimitServiceError> {
        let response = self
            .client
            .post(format!("{}/decrement", self.limit_url(consumer_id, tenor)))
            .json(&DecrementRequest {
                amount: amount.value(),
            })
            .send()
            .await
            .map_err(transport_error)?;

        Self::read_limit(response, consumer_id, tenor).await
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    fn client(server: &mockito::Server) -> HttpLimitServiceClient {
        HttpLimitServiceClient::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client =
            HttpLimitServiceClient::with_client(Client::new(), "http://limits.local/");
        assert_eq!(client.base_url(), "http://limits.local");
    }

    #[tokio::test]
    async fn get_available_limit_parses_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/consumer-limits/1/tenors/6")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"available_limit": 100000}"#)
            .create_async()
            .await;

        let available = client(&server)
            .get_available_limit(ConsumerId::new(1), Tenor::new(6))
            .await
            .unwrap();

        assert_eq!(available, Amount::new(100_000));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_maps_to_consumer_limit_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/consumer-limits/9/tenors/6")
            .with_status(404)
            .create_async()
            .await;

        let result = client(&server)
            .get_available_limit(ConsumerId::new(9), Tenor::new(6))
            .await;

        assert_eq!(
            result,
            Err(LimitServiceError::ConsumerLimitNotFound {
                consumer_id: ConsumerId::new(9),
                tenor: Tenor::new(6),
            })
        );
    }

    #[tokio::test]
    async fn server_error_maps_to_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/consumer-limits/1/tenors/6")
            .with_status(503)
            .create_async()
            .await;

        let result = client(&server)
            .get_available_limit(ConsumerId::new(1), Tenor::new(6))
            .await;

        assert!(matches!(result, Err(LimitServiceError::Unavailable(_))));
    }

    #[tokio::test]
    async fn malformed_body_maps_to_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/consumer-limits/1/tenors/6")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"limit": "lots"}"#)
            .create_async()
            .await;

        let result = client(&server)
            .get_available_limit(ConsumerId::new(1), Tenor::new(6))
            .await;

        assert!(matches!(result, Err(LimitServiceError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn decrement_posts_amount() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/consumer-limits/1/tenors/6/decrement")
            .match_body(Matcher::Json(serde_json::json!({ "amount": 50000 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"available_limit": 50000}"#)
            .create_async()
            .await;

        let remaining = client(&server)
            .decrement_available_limit(ConsumerId::new(1), Tenor::new(6), Amount::new(50_000))
            .await
            .unwrap();

        assert_eq!(remaining, Amount::new(50_000));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn conflict_on_decrement_maps_to_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/consumer-limits/1/tenors/6/decrement")
            .with_status(409)
            .with_body("limit exceeded")
            .create_async()
            .await;

        let result = client(&server)
            .decrement_available_limit(ConsumerId::new(1), Tenor::new(6), Amount::new(50_000))
            .await;

        assert_eq!(
            result,
            Err(LimitServiceError::Rejected("limit exceeded".to_string()))
        );
    }

    #[tokio::test]
    async fn unreachable_server_maps_to_unavailable() {
        let client = HttpLimitServiceClient::new("http://127.0.0.1:1", Duration::from_secs(1))
            .unwrap();

        let result = client
            .get_available_limit(ConsumerId::new(1), Tenor::new(6))
            .await;

        assert!(matches!(result, Err(LimitServiceError::Unavailable(_))));
    }
}
