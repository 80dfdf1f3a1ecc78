#![allow(unused)]

//! # contract: the platform's REST surface as seen by the pipelines
//!
//! This module defines the [`Portal`] trait (items, groups, folders, search,
//! relationships and feature queries) and the [`SiteRemover`] trait (the
//! dedicated removal path for site applications), plus the plain data types
//! they exchange.
//!
//! ## Interface & Extensibility
//! - Implement [`Portal`] for a real HTTP client, a recording fake, or use the
//!   generated `MockPortal` in tests.
//! - All calls are async and return [`PortalError`] on rejection. A call that
//!   reaches the platform but is refused without an error body reports
//!   `SuccessResponse { success: false, .. }` instead.
//! - Not-found rejections must be reported as [`PortalError::NotFound`] (or an
//!   API error carrying the platform's not-found message) so the deletion
//!   pipeline can classify them as already gone.
//!
//! ## Mocking & Testing
//! - The traits are annotated for `mockall`; the mocks are exported while the
//!   `test-export-mocks` feature is on (the default) so integration tests can
//!   use them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use mockall::{automock, predicate::*};

pub use crate::error::PortalError;

/// Credentials and location of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub portal_url: String,
    pub username: String,
    pub token: String,
}

/// Item metadata as returned by the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBase {
    pub id: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub owner_folder: Option<String>,
    #[serde(default)]
    pub modified: i64,
    #[serde(default)]
    pub type_keywords: Vec<String>,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub properties: Option<Value>,
    /// Every other field the platform returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemBase {
    pub fn has_type_keyword(&self, keyword: &str) -> bool {
        self.type_keywords.iter().any(|k| k == keyword)
    }
}

/// Group metadata as returned by the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub access: Option<String>,
}

/// A bare item reference as found in listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
}

/// One page of a group's content listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPage {
    pub total: u32,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub num: u32,
    /// Start of the next page; zero or negative when this is the last page.
    #[serde(default)]
    pub next_start: i64,
    #[serde(default)]
    pub items: Vec<ItemRef>,
}

/// An item search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub q: String,
    pub start: i64,
    pub num: u32,
}

impl SearchQuery {
    /// All of `owner`'s items in `folder_id`, first page.
    pub fn folder_contents(owner: &str, folder_id: &str) -> Self {
        SearchQuery {
            q: format!("owner:\"{owner}\" AND ownerfolder:{folder_id}"),
            start: 1,
            num: 100,
        }
    }
}

/// One page of item search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub total: u32,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub num: u32,
    #[serde(default)]
    pub next_start: i64,
    #[serde(default)]
    pub results: Vec<ItemRef>,
}

/// `{success: bool}` response of a mutating call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(default, alias = "itemId", alias = "folderId")]
    pub id: Option<String>,
}

impl SuccessResponse {
    pub fn ok(id: impl Into<String>) -> Self {
        SuccessResponse {
            success: true,
            id: Some(id.into()),
        }
    }

    pub fn failed(id: impl Into<String>) -> Self {
        SuccessResponse {
            success: false,
            id: Some(id.into()),
        }
    }
}

/// The signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub org_id: String,
}

/// The subset of `portals/self` the pipelines need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSelf {
    #[serde(default)]
    pub is_portal: bool,
    #[serde(default)]
    pub portal_hostname: String,
}

/// Options for the hub site removal call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HubRequestOptions {
    pub authentication: UserSession,
    /// Hub API base url; `None` on Enterprise portals.
    pub hub_api_url: Option<String>,
    pub is_portal: bool,
}

/// Request to create an item in a folder.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub item: Value,
    pub data: Value,
    pub folder_id: Option<String>,
}

/// Request to update an item's metadata and/or data.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    pub id: String,
    pub item: Option<Value>,
    pub data: Option<Value>,
}

/// Request to create a group.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGroup {
    pub title: String,
    pub description: Option<String>,
    pub snippet: Option<String>,
    pub tags: Vec<String>,
    pub access: String,
}

/// A feature as exchanged with a feature service layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Result of a feature query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Result of adding features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFeaturesResult {
    #[serde(default)]
    pub add_results: Vec<SuccessResponse>,
}

/// Everything the pipelines ask of the platform.
///
/// The implementor owns authentication; every call acts as the user returned
/// by [`Portal::session`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Portal: Send + Sync {
    /// The session requests are made with.
    fn session(&self) -> UserSession;

    async fn portal_self(&self) -> Result<PortalSelf, PortalError>;

    async fn current_user(&self) -> Result<User, PortalError>;

    async fn get_item_base(&self, id: &str) -> Result<ItemBase, PortalError>;

    /// The item's data as JSON; `Value::Null` when the item has none.
    async fn get_item_data(&self, id: &str) -> Result<Value, PortalError>;

    async fn get_group(&self, id: &str) -> Result<GroupInfo, PortalError>;

    /// One page of a group's content, starting at the 1-based `start`.
    async fn get_group_content(
        &self,
        id: &str,
        start: i64,
        num: u32,
    ) -> Result<ContentPage, PortalError>;

    async fn search_items(&self, query: SearchQuery) -> Result<SearchPage, PortalError>;

    /// Ids of the Solutions that list `id` as one of their items.
    async fn get_solutions_related_to_item(&self, id: &str) -> Result<Vec<String>, PortalError>;

    /// Items listed by the Solution `solution_id`.
    async fn get_items_related_to_solution(
        &self,
        solution_id: &str,
    ) -> Result<Vec<ItemBase>, PortalError>;

    async fn create_item(&self, item: NewItem) -> Result<SuccessResponse, PortalError>;

    async fn update_item(&self, update: ItemUpdate) -> Result<SuccessResponse, PortalError>;

    async fn unprotect_item(&self, id: &str) -> Result<SuccessResponse, PortalError>;

    async fn remove_item(&self, id: &str) -> Result<SuccessResponse, PortalError>;

    async fn create_group(&self, group: NewGroup) -> Result<SuccessResponse, PortalError>;

    async fn share_item_with_group(
        &self,
        item_id: &str,
        group_id: &str,
    ) -> Result<SuccessResponse, PortalError>;

    async fn unprotect_group(&self, id: &str) -> Result<SuccessResponse, PortalError>;

    async fn remove_group(&self, id: &str) -> Result<SuccessResponse, PortalError>;

    /// Removes one of the session user's folders.
    async fn remove_folder(&self, folder_id: &str) -> Result<SuccessResponse, PortalError>;

    async fn query_features(&self, url: &str, where_clause: &str) -> Result<FeatureSet, PortalError>;

    async fn add_features(
        &self,
        url: &str,
        features: Vec<Feature>,
    ) -> Result<AddFeaturesResult, PortalError>;

    /// Fetches arbitrary platform JSON (`f=json`), e.g. a service description.
    async fn request_json(&self, url: &str) -> Result<Value, PortalError>;
}

/// Removal path for site applications, which need more than a generic item delete.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SiteRemover: Send + Sync {
    async fn remove_site(
        &self,
        id: &str,
        options: HubRequestOptions,
    ) -> Result<SuccessResponse, PortalError>;
}

/// True when `id` names an item visible to the session.
pub async fn is_item(portal: &dyn Portal, id: &str) -> bool {
    portal.get_item_base(id).await.is_ok()
}

/// True when `id` names a group visible to the session.
pub async fn is_group(portal: &dyn Portal, id: &str) -> bool {
    portal.get_group(id).await.is_ok()
}
