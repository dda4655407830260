use anyhow::{Error, anyhow};
use url::Url;

/// Read-only HTTP access to the legend and feature services.
///
/// The manager is generic over this trait so tests can substitute canned
/// responses for the network.
pub trait Transport: Send + Sync {
    /// Fetches the URL and returns the response body as text.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the request fails or the server answers with a
    /// non-success status.
    fn get_text(&self, url: &Url) -> impl Future<Output = Result<String, Error>> + Send;
}

/// `reqwest`-backed transport used in production.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for HttpTransport {
    async fn get_text(&self, url: &Url) -> Result<String, Error> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| anyhow!("failed to fetch {url}: {err}"))?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "failed to fetch {url} (status: {})",
                response.status()
            ));
        }
        Ok(response.text().await?)
    }
}
