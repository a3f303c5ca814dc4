use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, Url};
use tracing::debug;

use ferry_core::config::ResourceServiceConfig;
use ferry_core::error::{FerryError, Result};
use ferry_core::traits::ResourceService;
use ferry_core::types::ResourceState;

use crate::{endpoint, parse_base_url};

/// Reads resource fill state from the lab resource service.
pub struct HttpResourceClient {
    http: Client,
    base_url: Url,
}

impl HttpResourceClient {
    pub fn new(config: &ResourceServiceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FerryError::Config(format!("resource client: {}", e)))?;
        Ok(Self {
            http,
            base_url: parse_base_url(&config.url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }
}

impl ResourceService for HttpResourceClient {
    fn get_resource(&self, resource_id: &str) -> BoxFuture<'_, Result<ResourceState>> {
        let url = endpoint(&self.base_url, &["resource", resource_id]);
        let resource_id = resource_id.to_string();

        Box::pin(async move {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| FerryError::ResourceQuery(format!("{}: {}", resource_id, e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(FerryError::ResourceQuery(format!(
                    "{}: HTTP {} {}",
                    resource_id,
                    status.as_u16(),
                    body.trim()
                )));
            }

            let state: ResourceState = response.json().await.map_err(|e| {
                FerryError::ResourceQuery(format!("{}: invalid resource body: {}", resource_id, e))
            })?;
            debug!(
                resource_id = %resource_id,
                quantity = state.quantity,
                capacity = ?state.capacity,
                "Fetched resource"
            );
            Ok(state)
        })
    }
}
