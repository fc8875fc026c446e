use std::{future::Future, time::Duration};

use crate::{error::DirectionsError, ors_api::DirectionsRequestBody};

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The single outbound operation the directions client needs. Split out so
/// the client can be driven without a network in tests.
pub trait DirectionsTransport: Send + Sync + 'static {
    fn post_json(
        &self,
        url: &str,
        credential: &str,
        body: &DirectionsRequestBody,
    ) -> impl Future<Output = Result<TransportResponse, DirectionsError>> + Send;
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, DirectionsError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DirectionsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client })
    }
}

impl DirectionsTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        credential: &str,
        body: &DirectionsRequestBody,
    ) -> Result<TransportResponse, DirectionsError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, credential)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}
