//! Placeholder handling: turning concrete ids into `{{...}}` tokens and back.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::contract::{ItemUpdate, Portal};
use crate::error::SolutionResult;
use crate::model::TemplateDictionary;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Reads a dotted path (`a.b.c`) out of a JSON value.
pub fn get_prop<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(list) => segment.parse::<usize>().ok().and_then(|i| list.get(i)),
            _ => None,
        })
}

/// Mutable variant of [`get_prop`].
pub fn get_prop_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(list) => segment
                .parse::<usize>()
                .ok()
                .and_then(move |i| list.get_mut(i)),
            _ => None,
        })
}

/// Removes the property at a dotted path; missing paths are ignored.
pub fn delete_prop(value: &mut Value, path: &str) {
    let (parent, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (get_prop_mut(value, parent), leaf),
        None => (Some(value), path),
    };
    if let Some(Value::Object(map)) = parent {
        map.remove(leaf);
    }
}

pub fn delete_props(value: &mut Value, paths: &[&str]) {
    for path in paths {
        delete_prop(value, path);
    }
}

/// Replaces every occurrence of `term` in `context` with `{{term<suffix>}}`.
pub fn templatize_term(context: &str, term: &str, suffix: &str) -> String {
    if context.is_empty() || term.is_empty() {
        return context.to_string();
    }
    context.replace(term, &format!("{{{{{term}{suffix}}}}}"))
}

/// Rewrites every occurrence of each id inside `value` as `{{id.itemId}}`.
pub fn templatize_ids(value: &Value, ids: &[String]) -> SolutionResult<Value> {
    if ids.is_empty() || value.is_null() {
        return Ok(value.clone());
    }
    let mut serialized = serde_json::to_string(value)?;
    for id in ids {
        serialized = templatize_term(&serialized, id, ".itemId");
    }
    Ok(serde_json::from_str(&serialized)?)
}

/// True when a JSON value still carries unresolved `{{...}}` tokens.
pub fn has_placeholders(value: &Value) -> bool {
    match value {
        Value::String(s) => PLACEHOLDER.is_match(s),
        Value::Array(list) => list.iter().any(has_placeholders),
        Value::Object(map) => map.values().any(has_placeholders),
        _ => false,
    }
}

/// Resolves `{{dotted.path}}` placeholders from the dictionary, in place.
///
/// A string consisting of exactly one placeholder takes the looked-up JSON
/// value as is; embedded placeholders are rendered as text. Placeholders with
/// no dictionary entry stay untouched.
pub fn replace_in_template(value: &mut Value, dictionary: &TemplateDictionary) {
    match value {
        Value::String(s) => {
            if let Some(replacement) = resolve_string(s, dictionary) {
                *value = replacement;
            }
        }
        Value::Array(list) => {
            for entry in list.iter_mut() {
                replace_in_template(entry, dictionary);
            }
        }
        Value::Object(map) => {
            for entry in map.values_mut() {
                replace_in_template(entry, dictionary);
            }
        }
        _ => {}
    }
}

fn resolve_string(s: &str, dictionary: &TemplateDictionary) -> Option<Value> {
    if !PLACEHOLDER.is_match(s) {
        return None;
    }

    if let Some(caps) = PLACEHOLDER.captures(s) {
        if caps.get(0).map(|m| m.as_str().len()) == Some(s.len()) {
            return dictionary.get(&caps[1]).cloned();
        }
    }

    let rendered = PLACEHOLDER.replace_all(s, |caps: &regex::Captures<'_>| {
        match dictionary.get(&caps[1]) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => caps[0].to_string(),
            Some(other) => other.to_string(),
        }
    });
    Some(Value::String(rendered.into_owned()))
}

/// Resolves placeholders still present in a deployed item's data and saves it.
///
/// Used after all items exist, when ids created later in the run are known.
pub async fn update_item_template_from_dictionary(
    item_id: &str,
    dictionary: &TemplateDictionary,
    portal: &dyn Portal,
) -> SolutionResult<bool> {
    let mut data = portal.get_item_data(item_id).await?;
    if !has_placeholders(&data) {
        debug!(item_id, "[TEMPLATE] No placeholders left in item data");
        return Ok(true);
    }

    replace_in_template(&mut data, dictionary);
    let response = portal
        .update_item(ItemUpdate {
            id: item_id.to_string(),
            item: None,
            data: Some(data),
        })
        .await?;
    info!(item_id, success = response.success, "[TEMPLATE] Updated item data from dictionary");
    Ok(response.success)
}
