//! Response normalization.
//!
//! Two backend dialects are in the wild: the Tencent shape (`Response`
//! envelope, PascalCase `JobId`/`Status`/`Result`/`Error.Message`) and an
//! OpenAI-like shape (`id`, `status`, `output`, `error.message`). Neither is
//! announced, so every lookup tries both spellings.

use hy3d_core::{ApiError, JobId, QueryResult, RemoteStatus, SubmitResult};
use serde_json::Value;

fn decode(body: &[u8]) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Unwraps a `Response` envelope if present.
fn payload(data: &Value) -> &Value {
    match data.get("Response") {
        Some(inner) if inner.is_object() => inner,
        _ => data,
    }
}

fn field<'a>(v: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|n| v.get(*n))
        .find(|x| !x.is_null())
}

fn string_field(v: &Value, names: &[&str]) -> Option<String> {
    let s = match field(v, names)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.trim().is_empty()).then_some(s)
}

/// An `Error`/`error` object on the payload or the outer document.
fn envelope_error(data: &Value) -> Option<ApiError> {
    [payload(data), data].into_iter().find_map(|v| {
        let err = field(v, &["Error", "error"])?;
        let message = match err {
            Value::String(s) if s.trim().is_empty() => return None,
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => {
                let message = string_field(err, &["Message", "message"]);
                // `{}` and other placeholders are not errors.
                if message.is_none() && string_field(err, &["Code", "code"]).is_none() {
                    return None;
                }
                message
            }
            Value::Bool(false) => return None,
            _ => None,
        };
        Some(ApiError::Backend {
            message: message.filter(|m| !m.trim().is_empty()),
        })
    })
}

/// Message from a non-2xx body, if it carries one of the known error envelopes.
pub fn extract_error_message(body: &[u8]) -> Option<String> {
    let data: Value = serde_json::from_slice(body).ok()?;
    let message = data
        .get("error")
        .and_then(|e| string_field(e, &["message"]))
        .or_else(|| {
            data.get("Response")
                .and_then(|r| r.get("Error"))
                .and_then(|e| string_field(e, &["Message"]))
        })?;
    Some(format!("API Error: {message}"))
}

pub fn parse_submit_response(body: &[u8]) -> Result<SubmitResult, ApiError> {
    let data = decode(body)?;
    if let Some(err) = envelope_error(&data) {
        return Err(err);
    }

    let job_id = string_field(payload(&data), &["JobId", "id"])
        .or_else(|| string_field(&data, &["JobId", "id"]))
        .ok_or_else(|| ApiError::Protocol("Invalid response: No JobId found".into()))?;

    Ok(SubmitResult {
        job_id: JobId::new(job_id),
    })
}

pub fn parse_query_response(body: &[u8]) -> Result<QueryResult, ApiError> {
    let data = decode(body)?;
    if let Some(err) = envelope_error(&data) {
        return Err(err);
    }

    let result = payload(&data);
    let status = string_field(result, &["Status", "status"])
        .map(|s| RemoteStatus::normalize(&s))
        .unwrap_or_else(|| RemoteStatus::Other(String::new()));

    let output = field(result, &["Result", "output"]).filter(|v| v.is_object());
    let from_output = |names: &[&str]| output.and_then(|o| string_field(o, names));

    Ok(QueryResult {
        job_id: string_field(result, &["JobId", "id"]).map(JobId::new),
        status,
        model_url: from_output(&["ModelUrl", "model_url"]),
        cover_url: from_output(&["CoverUrl", "cover_url", "thumbnail_url"]),
        error_message: string_field(result, &["ErrorMessage", "error_message"]),
    })
}
