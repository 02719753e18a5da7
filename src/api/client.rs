use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use thiserror::Error;

const USER_AGENT: &str = concat!("panorama-display/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Server responded with status {0}")]
    Status(u16),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Thin wrapper over a shared reqwest client used for image fetches.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
}

impl ApiClient {
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http }
    }

    /// Opens a streaming GET for `url`.
    /// Returns (content_length, stream); the length is `None` when the server
    /// does not report one.
    pub async fn download_file_stream(
        &self,
        url: &str,
    ) -> Result<(Option<u64>, BoxStream<'static, Result<bytes::Bytes>>)> {
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let total_size = response.content_length();
        let stream = response
            .bytes_stream()
            .map_err(ApiError::RequestError)
            .boxed();

        Ok((total_size, stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_reports_length_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pano1.jpg")
            .with_status(200)
            .with_body(vec![7u8; 300])
            .create_async()
            .await;

        let client = ApiClient::new();
        let (total, stream) = client
            .download_file_stream(&format!("{}/pano1.jpg", server.url()))
            .await
            .unwrap();
        assert_eq!(total, Some(300));

        let chunks: Vec<_> = stream.collect().await;
        let received: usize = chunks.into_iter().map(|c| c.unwrap().len()).sum();
        assert_eq!(received, 300);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .create_async()
            .await;

        let client = ApiClient::new();
        let result = client
            .download_file_stream(&format!("{}/missing.jpg", server.url()))
            .await;
        assert!(matches!(result, Err(ApiError::Status(404))));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let client = ApiClient::new();
        let result = client.download_file_stream("http://127.0.0.1:1/pano.jpg").await;
        assert!(matches!(result, Err(ApiError::RequestError(_))));
    }
}
