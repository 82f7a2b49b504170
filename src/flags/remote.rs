use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Where remote flag configuration comes from.
#[async_trait]
pub trait FlagSource: Send + Sync {
    async fn fetch(&self) -> Result<Value>;
}

/// `GET`s a JSON flag set from a fixed URL.
pub struct HttpFlagSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFlagSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl FlagSource for HttpFlagSource {
    async fn fetch(&self) -> Result<Value> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(body)
    }
}
