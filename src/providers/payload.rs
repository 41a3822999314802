/*!
 * JSON payload handling shared by the generative backends.
 *
 * Units travel as a single JSON object mapping caption ids to text. Models
 * answer with the same shape; anything missing from the answer is treated as
 * an omission, never as an error.
 */

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::errors::ProviderError;
use crate::language_utils;
use crate::subtitle_processor::TranslationUnit;

/// Prompt used when the configuration does not provide one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional subtitle translator. Translate the values of the JSON object you receive from {source_language} to {target_language}. Answer with a single JSON object that uses exactly the same keys, each mapped to its translated text. Never add, rename or drop keys. Keep line breaks and formatting tags.";

/// Fill `{source_language}` and `{target_language}` with readable language names
pub fn render_system_prompt(template: &str, source_language: &str, target_language: &str) -> String {
    template
        .replace("{source_language}", &display_language(source_language))
        .replace("{target_language}", &display_language(target_language))
}

// Unknown codes are passed through so custom tags still reach the model.
fn display_language(code: &str) -> String {
    language_utils::get_language_name(code).unwrap_or_else(|_| code.to_string())
}

/// Serialize units as a `{ "<id>": "<text>" }` object
pub fn build_user_message(units: &[TranslationUnit]) -> Result<String, ProviderError> {
    let object: Map<String, Value> = units
        .iter()
        .map(|unit| (unit.id.clone(), Value::String(unit.text.clone())))
        .collect();

    serde_json::to_string(&Value::Object(object))
        .map_err(|e| ProviderError::ParseError(format!("Failed to encode request payload: {}", e)))
}

/// Extract translations for the requested units from a model answer.
///
/// Only ids present in `requested` are returned, in request order. A top level
/// that is neither an object nor an array of `{id, text}` records is a hard error.
/// An object cut off mid-answer keeps the entries that were complete, so the
/// rest is treated as omitted.
pub fn parse_translations(content: &str, requested: &[TranslationUnit]) -> Result<Vec<TranslationUnit>, ProviderError> {
    let value = parse_lenient(content)?;

    let lookup: Map<String, Value> = match value {
        Value::Object(object) => object,
        Value::Array(records) => records
            .into_iter()
            .filter_map(|record| {
                let id = record.get("id")?.as_str()?.to_string();
                let text = record.get("text")?.clone();
                Some((id, text))
            })
            .collect(),
        other => {
            return Err(ProviderError::ParseError(format!(
                "Expected a JSON object of translations, got: {}",
                truncate(&other.to_string(), 200)
            )));
        }
    };

    let translated: Vec<TranslationUnit> = requested
        .iter()
        .filter_map(|unit| {
            lookup
                .get(&unit.id)
                .and_then(Value::as_str)
                .map(|text| TranslationUnit::new(unit.id.clone(), text))
        })
        .collect();

    if translated.len() < requested.len() {
        debug!("Model answer omitted {} of {} entries", requested.len() - translated.len(), requested.len());
    }

    Ok(translated)
}

fn parse_lenient(content: &str) -> Result<Value, ProviderError> {
    let stripped = strip_code_fence(content);
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        return Ok(value);
    }

    // Models sometimes wrap the object in prose
    if let (Some(start), Some(end)) = (stripped.find('{'), stripped.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&stripped[start..=end]) {
                return Ok(value);
            }
        }
    }

    if let Some(value) = recover_truncated(stripped) {
        warn!("Model answer was cut off, keeping the complete entries before the cut");
        return Ok(value);
    }

    Err(ProviderError::ParseError(format!(
        "Response is not valid JSON: {}",
        truncate(stripped, 200)
    )))
}

// Cut-off objects keep every complete `"id": "text"` pair before the cut
fn recover_truncated(content: &str) -> Option<Value> {
    if !content.starts_with('{') {
        return None;
    }

    let mut cut = content.len();
    while let Some(end) = content[..cut].rfind('"') {
        let rest = content[end + 1..].trim_start();
        if rest.is_empty() || rest.starts_with(',') {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&format!("{}}}", &content[..=end])) {
                return Some(value);
            }
        }
        cut = end;
    }
    Some(Value::Object(Map::new()))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "json") on the opening fence line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
