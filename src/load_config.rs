/// `load_config` module: loads the static YAML config and injects the platform credentials from the environment.
///
/// The YAML file carries no secrets. It names the portal to talk to and how
/// progress should be reported; the username and token are read from
/// `ARCGIS_USERNAME` and `ARCGIS_TOKEN` (a `.env` file is honoured).
///
/// # Accepted YAML
/// ```yaml
/// portal_url: https://myorg.maps.arcgis.com
/// job_id: cleanup-2024-05   # optional; a random id is generated otherwise
/// console_progress: true    # optional; defaults to true
/// hub_api_url: https://hub.arcgis.com   # optional override
/// ```
///
/// # Errors
/// All errors use `anyhow::Error` with the config path in the message, and are
/// surfaced at the CLI boundary.
use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const USERNAME_ENV: &str = "ARCGIS_USERNAME";
pub const TOKEN_ENV: &str = "ARCGIS_TOKEN";

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub portal_url: String,
    pub job_id: String,
    pub console_progress: bool,
    pub hub_api_url: Option<String>,
    pub credentials: Credentials,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    portal_url: String,
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default = "default_console_progress")]
    console_progress: bool,
    #[serde(default)]
    hub_api_url: Option<String>,
}

fn default_console_progress() -> bool {
    true
}

fn required_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) | Err(_) => {
            error!(variable = name, "Required variable missing in environment");
            Err(anyhow::anyhow!("{name} missing in environment"))
        }
    }
}

/// Loads a static YAML config file (no secrets) and injects the credentials from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let raw: RawConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML {:?}: {e}", path_ref)
    })?;
    let portal_url = raw.portal_url.trim_end_matches('/').to_string();
    if portal_url.is_empty() {
        return Err(anyhow::anyhow!(
            "Config {:?} has an empty portal_url",
            path_ref
        ));
    }

    dotenvy::dotenv().ok();
    let credentials = Credentials {
        username: required_env(USERNAME_ENV)?,
        token: required_env(TOKEN_ENV)?,
    };

    let job_id = raw
        .job_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    info!(config_path = ?path_ref, portal_url = %portal_url, job_id = %job_id, "Parsed config YAML successfully");

    Ok(CliConfig {
        portal_url,
        job_id,
        console_progress: raw.console_progress,
        hub_api_url: raw.hub_api_url,
        credentials,
    })
}
