//! Site application removal.
//!
//! A hub site owns one or more domain registrations besides its item. Online
//! organizations keep those in the hub domain service, which has to be
//! cleaned up before the item goes; Enterprise portals have no hub api and
//! the item is removed directly.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use solution_deployer_core::contract::{
    HubRequestOptions, Portal, PortalError, SiteRemover, SuccessResponse,
};

pub struct HubSiteRemover {
    client: reqwest::Client,
    portal: Arc<dyn Portal>,
    /// Used instead of the hub api url derived from the portal, when set.
    hub_api_url_override: Option<String>,
}

impl HubSiteRemover {
    pub fn new(portal: Arc<dyn Portal>, hub_api_url_override: Option<String>) -> Self {
        HubSiteRemover {
            client: reqwest::Client::new(),
            portal,
            hub_api_url_override,
        }
    }

    fn hub_api_url(&self, options: &HubRequestOptions) -> Option<String> {
        self.hub_api_url_override
            .clone()
            .or_else(|| options.hub_api_url.clone())
            .map(|url| url.trim_end_matches('/').to_string())
    }

    async fn domain_ids(&self, hub_api_url: &str, site_id: &str, token: &str) -> Result<Vec<String>, PortalError> {
        let response = self
            .client
            .get(format!("{hub_api_url}/api/v3/domains"))
            .query(&[("siteId", site_id)])
            .header("Authorization", token)
            .send()
            .await
            .map_err(|e| PortalError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PortalError::Api {
                code: response.status().as_u16() as i64,
                message: format!("Domain lookup failed for site {site_id}"),
            });
        }
        let domains: Value = response
            .json()
            .await
            .map_err(|e| PortalError::Decode(e.to_string()))?;
        Ok(domains
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| match entry.get("id") {
                        Some(Value::String(id)) => Some(id.clone()),
                        Some(Value::Number(id)) => Some(id.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn remove_domain(&self, hub_api_url: &str, domain_id: &str, token: &str) -> Result<(), PortalError> {
        let response = self
            .client
            .delete(format!("{hub_api_url}/api/v3/domains/{domain_id}"))
            .header("Authorization", token)
            .send()
            .await
            .map_err(|e| PortalError::Transport(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(PortalError::Api {
                code: response.status().as_u16() as i64,
                message: format!("Failed to remove domain {domain_id}"),
            })
        }
    }
}

#[async_trait]
impl SiteRemover for HubSiteRemover {
    async fn remove_site(
        &self,
        id: &str,
        options: HubRequestOptions,
    ) -> Result<SuccessResponse, PortalError> {
        match self.hub_api_url(&options) {
            Some(hub_api_url) if !options.is_portal => {
                let token = options.authentication.token.as_str();
                let domains = self.domain_ids(&hub_api_url, id, token).await?;
                tracing::info!(site_id = id, domains = domains.len(), "[DELETE] Removing site domains");
                let removals = domains
                    .iter()
                    .map(|domain_id| self.remove_domain(&hub_api_url, domain_id, token));
                for result in join_all(removals).await {
                    if let Err(e) = result {
                        tracing::warn!(site_id = id, error = %e, "[DELETE] Could not remove site domain");
                    }
                }
            }
            _ => tracing::debug!(site_id = id, "[DELETE] No hub api for this portal, removing site item only"),
        }

        // The deletion pipeline has already unprotected the item.
        self.portal.remove_item(id).await
    }
}
