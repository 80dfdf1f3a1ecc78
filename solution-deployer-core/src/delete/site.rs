//! Site applications: identification and hub request options.

use tracing::debug;

use crate::contract::{HubRequestOptions, Portal, PortalError};
use crate::model::SolutionItemPrecis;

/// Item types removed through [`crate::contract::SiteRemover`] instead of a generic delete.
pub const SITE_APPLICATION_TYPES: &[&str] = &["Hub Site Application", "Site Application"];

pub fn is_site_application(item_type: &str) -> bool {
    SITE_APPLICATION_TYPES.contains(&item_type)
}

/// Ids of the site applications among `items`.
pub fn site_item_ids(items: &[SolutionItemPrecis]) -> Vec<String> {
    items
        .iter()
        .filter(|item| is_site_application(&item.item_type))
        .map(|item| item.id.clone())
        .collect()
}

/// Hub API base url for an online organization's portal host.
pub fn hub_api_url_for(portal_hostname: &str) -> String {
    if portal_hostname.contains("mapsqa") {
        "https://hubqa.arcgis.com".to_string()
    } else if portal_hostname.contains("mapsdev") {
        "https://hubdev.arcgis.com".to_string()
    } else {
        "https://hub.arcgis.com".to_string()
    }
}

/// Options for site removal calls made with the portal's session.
pub async fn create_hub_request_options(
    portal: &dyn Portal,
) -> Result<HubRequestOptions, PortalError> {
    let portal_self = portal.portal_self().await?;
    let hub_api_url =
        (!portal_self.is_portal).then(|| hub_api_url_for(&portal_self.portal_hostname));
    debug!(
        is_portal = portal_self.is_portal,
        hub_api_url = ?hub_api_url,
        "[DELETE] Created hub request options"
    );
    Ok(HubRequestOptions {
        authentication: portal.session(),
        hub_api_url,
        is_portal: portal_self.is_portal,
    })
}
