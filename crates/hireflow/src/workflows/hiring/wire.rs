//! Lenient decoders for agent payloads whose shape drifts between deployments.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::domain::JobId;

/// Accept a number, a numeric string, or null. Anything else decodes as `None`
/// so a single malformed field never fails the surrounding payload.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Job identifiers arrive as either integers or strings.
pub(crate) fn flexible_job_id<'de, D>(deserializer: D) -> Result<JobId, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(raw) => Ok(JobId(raw)),
        Value::Number(number) => Ok(JobId(number.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected job id, found {other}"
        ))),
    }
}

/// Accept a list of strings, a single string, or null.
pub(crate) fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
