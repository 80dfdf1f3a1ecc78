//! # id_scanner: finding item ids and service urls in serialized JSON
//!
//! Platform ids are 32 hexadecimal characters. Serialized item data is full of
//! strings that merely look like ids, so every scan in the crate goes through
//! this module and its explicit rules:
//!
//! - A candidate is a maximal run of hex characters of exactly 32 characters.
//!   Runs that are longer (hashes, GUIDs without dashes plus suffixes) never match.
//! - [`scan_ids_excluding_service_names`] additionally drops candidates inside
//!   a `/services/<name>/FeatureServer` style path, where hosted service names
//!   often embed an id that is not a reference.
//! - [`scan_query_ids`] keeps only candidates written as a query-string value
//!   (`...=<id>`), the form used by app url templates.
//!
//! Results are deduplicated and keep first-seen order.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

const ID_LENGTH: usize = 32;

static HEX_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9A-Fa-f]+").expect("hex run pattern is valid"));

static SERVICE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)/services/([^\s"'?&]+?)/(?:FeatureServer|MapServer|ImageServer|VectorTileServer|SceneServer)"#,
    )
    .expect("service name pattern is valid")
});

static FEATURE_SERVICE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)=(http[^&\s"]*?FeatureServer[^&\s"]*)"#)
        .expect("feature service url pattern is valid")
});

/// Every id-shaped token in `text`.
pub fn scan_ids(text: &str) -> Vec<String> {
    collect_ids(text, |_| true)
}

/// Id-shaped tokens that are not part of a hosted service name.
pub fn scan_ids_excluding_service_names(text: &str) -> Vec<String> {
    let service_names: Vec<Range<usize>> = SERVICE_NAME
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.range()))
        .collect();
    collect_ids(text, |run| {
        !service_names
            .iter()
            .any(|name| name.start <= run.start && run.end <= name.end)
    })
}

/// Ids written as query-string values (`=<id>`), without the `=`.
pub fn scan_query_ids(text: &str) -> Vec<String> {
    collect_ids(text, |run| run.start > 0 && text.as_bytes()[run.start - 1] == b'=')
}

/// Feature service urls written as query-string values (`=http...FeatureServer...`),
/// each ending at the next `&` or the end of the text.
pub fn scan_feature_service_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for caps in FEATURE_SERVICE_URL.captures_iter(text) {
        let url = caps[1].to_string();
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// Layer index of a `.../FeatureServer/<n>` url.
pub fn layer_id(url: &str) -> Option<u32> {
    if !url.contains("FeatureServer/") {
        return None;
    }
    url.rsplit('/').next().and_then(|last| last.parse().ok())
}

/// Placeholder suffix for a reference to a service or one of its layers.
pub fn replace_value(layer_id: Option<u32>, suffix: &str) -> String {
    match layer_id {
        Some(layer) => format!(".layer{layer}{suffix}"),
        None => suffix.to_string(),
    }
}

fn collect_ids<F>(text: &str, keep: F) -> Vec<String>
where
    F: Fn(&Range<usize>) -> bool,
{
    let mut ids: Vec<String> = Vec::new();
    for run in HEX_RUN.find_iter(text) {
        if run.len() != ID_LENGTH || !keep(&run.range()) {
            continue;
        }
        let id = run.as_str().to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}
