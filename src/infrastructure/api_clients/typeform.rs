use super::ResponseSource;
use crate::domain::error::{EtlError, Result};
use crate::domain::survey::ResponsePage;
use async_trait::async_trait;
use tracing::{info, warn};

pub struct TypeformClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl TypeformClient {
    pub fn new(api_token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            api_token: api_token.to_string(),
        }
    }

    /// `{base}/forms/{form_id}/responses` with `form_id` as one encoded segment.
    fn responses_url(&self, form_id: &str) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url).map_err(|e| {
            EtlError::Config(format!("Invalid Typeform base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                EtlError::Config(format!("Typeform base URL {} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(["forms", form_id, "responses"]);
        Ok(url)
    }
}

#[async_trait]
impl ResponseSource for TypeformClient {
    /// Fetches the first page of responses. Later pages are not requested.
    async fn fetch_responses(&self, form_id: &str, page_size: u32) -> Result<ResponsePage> {
        let url = self.responses_url(form_id)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .query(&[("page_size", page_size)])
            .send()
            .await
            .map_err(|e| EtlError::Fetch(format!("Typeform request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EtlError::Fetch(format!(
                "Typeform API error ({}) for form {}: {}",
                status, form_id, text
            )));
        }

        let page: ResponsePage = response
            .json()
            .await
            .map_err(|e| EtlError::Fetch(format!("Failed to parse Typeform responses: {}", e)))?;

        if let Some(total) = page.total_items {
            if total > page.items.len() as u64 {
                warn!(
                    form_id,
                    received = page.items.len(),
                    total,
                    "More responses exist than were returned; only the first page will be loaded"
                );
            }
        }

        info!(form_id, responses = page.items.len(), "Fetched form responses");
        Ok(page)
    }
}
