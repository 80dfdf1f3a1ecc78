//! # Portal client (CLI <-> Core)
//!
//! [`ArcGisPortal`] implements the core [`Portal`] contract against the
//! platform's sharing REST API (`<portal>/sharing/rest/...`) with `reqwest`.
//! Every request carries `f=json` and the session token.
//!
//! The platform reports many failures inside a `200 OK` body
//! (`{"error": {"code", "messageCode", "message"}}`), so every response body is
//! passed through [`classify_error_body`] before it is decoded.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use solution_deployer_core::contract::{
    AddFeaturesResult, ContentPage, Feature, FeatureSet, GroupInfo, ItemBase, ItemUpdate,
    NewGroup, NewItem, Portal, PortalError, PortalSelf, SearchPage, SearchQuery,
    SuccessResponse, User, UserSession,
};
use solution_deployer_core::error::ITEM_NOT_FOUND_MESSAGE;

use crate::load_config::CliConfig;

const NOT_FOUND_MESSAGE_CODE: &str = "CONT_0001";
const SOLUTION_RELATIONSHIP: &str = "Solution2Item";

type Params = Vec<(String, String)>;

/// Maps a platform error body to a [`PortalError`].
///
/// Returns `None` when the body carries no error and the status is a success.
pub fn classify_error_body(status: u16, body: &Value) -> Option<PortalError> {
    if let Some(error) = body.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(status as i64);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        let message_code = error.get("messageCode").and_then(Value::as_str);
        if code == 404
            || message_code == Some(NOT_FOUND_MESSAGE_CODE)
            || message.contains(ITEM_NOT_FOUND_MESSAGE)
        {
            return Some(PortalError::NotFound(message));
        }
        return Some(PortalError::Api { code, message });
    }
    match status {
        200..=299 => None,
        404 => Some(PortalError::NotFound(body.to_string())),
        _ => Some(PortalError::Api {
            code: status as i64,
            message: body.to_string(),
        }),
    }
}

/// Flattens an item JSON object into `addItem`/`update` form fields.
///
/// String lists (tags, typeKeywords) become comma-separated values; objects
/// and other arrays are sent as JSON text.
pub fn item_form_fields(item: &Value) -> Params {
    let Some(map) = item.as_object() else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let field = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Array(values) if values.iter().all(Value::is_string) => values
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                Value::Bool(_) | Value::Number(_) => value.to_string(),
                other => other.to_string(),
            };
            Some((key.clone(), field))
        })
        .collect()
}

pub struct ArcGisPortal {
    client: reqwest::Client,
    session: UserSession,
}

impl ArcGisPortal {
    pub fn new(portal_url: &str, username: &str, token: &str) -> Self {
        let trimmed = portal_url.trim_end_matches('/');
        let rest_url = if trimmed.ends_with("/sharing/rest") {
            trimmed.to_string()
        } else {
            format!("{trimmed}/sharing/rest")
        };
        tracing::info!(rest_url = %rest_url, username, "Initialized portal client");
        ArcGisPortal {
            client: reqwest::Client::new(),
            session: UserSession {
                portal_url: rest_url,
                username: username.to_string(),
                token: token.to_string(),
            },
        }
    }

    pub fn from_config(config: &CliConfig) -> Self {
        Self::new(
            &config.portal_url,
            &config.credentials.username,
            &config.credentials.token,
        )
    }

    fn rest(&self, path: &str) -> String {
        format!("{}/{}", self.session.portal_url, path)
    }

    fn user_content(&self, path: &str) -> String {
        self.rest(&format!("content/users/{}/{}", self.session.username, path))
    }

    fn with_auth(&self, mut params: Params) -> Params {
        params.push(("f".to_string(), "json".to_string()));
        params.push(("token".to_string(), self.session.token.clone()));
        params
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Value, PortalError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| PortalError::Transport(e.to_string()))?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| PortalError::Decode(e.to_string()))?
        };
        match classify_error_body(status, &body) {
            Some(error) => Err(error),
            None => Ok(body),
        }
    }

    /// Sends one request and logs its outcome. Missing resources are routine
    /// during deletion and are not logged as errors.
    async fn execute(
        &self,
        method: &str,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, PortalError> {
        let result = match request.send().await {
            Ok(response) => self.read_body(response).await,
            Err(e) => Err(PortalError::Transport(e.to_string())),
        };
        match &result {
            Ok(_) => tracing::info!(method, url, "Portal request succeeded"),
            Err(e) if e.is_not_found() => {
                tracing::info!(method, url, error = %e, "Portal resource not found")
            }
            Err(e) => tracing::error!(method, url, error = %e, "Portal request failed"),
        }
        result
    }

    async fn get_json(&self, url: &str, params: Params) -> Result<Value, PortalError> {
        let request = self.client.get(url).query(&self.with_auth(params));
        self.execute("GET", url, request).await
    }

    async fn post_form(&self, url: &str, params: Params) -> Result<Value, PortalError> {
        let request = self.client.post(url).form(&self.with_auth(params));
        self.execute("POST", url, request).await
    }

    async fn post_success(&self, url: &str, params: Params) -> Result<SuccessResponse, PortalError> {
        decode(self.post_form(url, params).await?)
    }

    async fn related_items(&self, id: &str, direction: &str) -> Result<Vec<ItemBase>, PortalError> {
        let body = self
            .get_json(
                &self.rest(&format!("content/items/{id}/relatedItems")),
                vec![
                    ("relationshipType".to_string(), SOLUTION_RELATIONSHIP.to_string()),
                    ("direction".to_string(), direction.to_string()),
                ],
            )
            .await?;
        decode(body.get("relatedItems").cloned().unwrap_or_else(|| json!([])))
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, PortalError> {
    serde_json::from_value(value).map_err(|e| PortalError::Decode(e.to_string()))
}

fn data_field(data: &Value) -> Option<(String, String)> {
    match data {
        Value::Null => None,
        other => Some(("text".to_string(), other.to_string())),
    }
}

#[async_trait]
impl Portal for ArcGisPortal {
    fn session(&self) -> UserSession {
        self.session.clone()
    }

    async fn portal_self(&self) -> Result<PortalSelf, PortalError> {
        decode(self.get_json(&self.rest("portals/self"), Vec::new()).await?)
    }

    async fn current_user(&self) -> Result<User, PortalError> {
        decode(self.get_json(&self.rest("community/self"), Vec::new()).await?)
    }

    async fn get_item_base(&self, id: &str) -> Result<ItemBase, PortalError> {
        decode(
            self.get_json(&self.rest(&format!("content/items/{id}")), Vec::new())
                .await?,
        )
    }

    async fn get_item_data(&self, id: &str) -> Result<Value, PortalError> {
        self.get_json(&self.rest(&format!("content/items/{id}/data")), Vec::new())
            .await
    }

    async fn get_group(&self, id: &str) -> Result<GroupInfo, PortalError> {
        decode(
            self.get_json(&self.rest(&format!("community/groups/{id}")), Vec::new())
                .await?,
        )
    }

    async fn get_group_content(
        &self,
        id: &str,
        start: i64,
        num: u32,
    ) -> Result<ContentPage, PortalError> {
        decode(
            self.get_json(
                &self.rest(&format!("content/groups/{id}")),
                vec![
                    ("start".to_string(), start.to_string()),
                    ("num".to_string(), num.to_string()),
                ],
            )
            .await?,
        )
    }

    async fn search_items(&self, query: SearchQuery) -> Result<SearchPage, PortalError> {
        decode(
            self.get_json(
                &self.rest("search"),
                vec![
                    ("q".to_string(), query.q),
                    ("start".to_string(), query.start.to_string()),
                    ("num".to_string(), query.num.to_string()),
                ],
            )
            .await?,
        )
    }

    async fn get_solutions_related_to_item(&self, id: &str) -> Result<Vec<String>, PortalError> {
        Ok(self
            .related_items(id, "reverse")
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect())
    }

    async fn get_items_related_to_solution(
        &self,
        solution_id: &str,
    ) -> Result<Vec<ItemBase>, PortalError> {
        self.related_items(solution_id, "forward").await
    }

    async fn create_item(&self, item: NewItem) -> Result<SuccessResponse, PortalError> {
        let path = match item.folder_id.as_deref().filter(|f| !f.is_empty()) {
            Some(folder) => format!("{folder}/addItem"),
            None => "addItem".to_string(),
        };
        let mut params = item_form_fields(&item.item);
        params.extend(data_field(&item.data));
        self.post_success(&self.user_content(&path), params).await
    }

    async fn update_item(&self, update: ItemUpdate) -> Result<SuccessResponse, PortalError> {
        let mut params = update
            .item
            .as_ref()
            .map(item_form_fields)
            .unwrap_or_default();
        if let Some(data) = &update.data {
            params.extend(data_field(data));
        }
        self.post_success(
            &self.user_content(&format!("items/{}/update", update.id)),
            params,
        )
        .await
    }

    async fn unprotect_item(&self, id: &str) -> Result<SuccessResponse, PortalError> {
        self.post_success(&self.user_content(&format!("items/{id}/unprotect")), Vec::new())
            .await
    }

    async fn remove_item(&self, id: &str) -> Result<SuccessResponse, PortalError> {
        self.post_success(&self.user_content(&format!("items/{id}/delete")), Vec::new())
            .await
    }

    async fn create_group(&self, group: NewGroup) -> Result<SuccessResponse, PortalError> {
        let mut params = vec![
            ("title".to_string(), group.title),
            ("tags".to_string(), group.tags.join(",")),
            ("access".to_string(), group.access),
        ];
        params.extend(group.description.map(|d| ("description".to_string(), d)));
        params.extend(group.snippet.map(|s| ("snippet".to_string(), s)));

        let body = self.post_form(&self.rest("community/createGroup"), params).await?;
        Ok(SuccessResponse {
            success: body.get("success").and_then(Value::as_bool).unwrap_or(false),
            id: body
                .get("group")
                .and_then(|group| group.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    async fn share_item_with_group(
        &self,
        item_id: &str,
        group_id: &str,
    ) -> Result<SuccessResponse, PortalError> {
        let body = self
            .post_form(
                &self.user_content(&format!("items/{item_id}/share")),
                vec![("groups".to_string(), group_id.to_string())],
            )
            .await?;
        let not_shared = body
            .get("notSharedWith")
            .and_then(Value::as_array)
            .map_or(false, |groups| !groups.is_empty());
        Ok(SuccessResponse {
            success: !not_shared,
            id: Some(item_id.to_string()),
        })
    }

    async fn unprotect_group(&self, id: &str) -> Result<SuccessResponse, PortalError> {
        self.post_success(&self.rest(&format!("community/groups/{id}/unprotect")), Vec::new())
            .await
    }

    async fn remove_group(&self, id: &str) -> Result<SuccessResponse, PortalError> {
        self.post_success(&self.rest(&format!("community/groups/{id}/delete")), Vec::new())
            .await
    }

    async fn remove_folder(&self, folder_id: &str) -> Result<SuccessResponse, PortalError> {
        let body = self
            .post_form(&self.user_content(&format!("{folder_id}/delete")), Vec::new())
            .await?;
        Ok(SuccessResponse {
            success: body.get("success").and_then(Value::as_bool).unwrap_or(false),
            id: Some(folder_id.to_string()),
        })
    }

    async fn query_features(&self, url: &str, where_clause: &str) -> Result<FeatureSet, PortalError> {
        decode(
            self.get_json(
                &format!("{}/query", url.trim_end_matches('/')),
                vec![
                    ("where".to_string(), where_clause.to_string()),
                    ("outFields".to_string(), "*".to_string()),
                ],
            )
            .await?,
        )
    }

    async fn add_features(
        &self,
        url: &str,
        features: Vec<Feature>,
    ) -> Result<AddFeaturesResult, PortalError> {
        let features =
            serde_json::to_string(&features).map_err(|e| PortalError::Decode(e.to_string()))?;
        decode(
            self.post_form(
                &format!("{}/addFeatures", url.trim_end_matches('/')),
                vec![("features".to_string(), features)],
            )
            .await?,
        )
    }

    async fn request_json(&self, url: &str) -> Result<Value, PortalError> {
        self.get_json(url, Vec::new()).await
    }
}
