//! Normalization of the provider's ad-hoc response shapes.
//!
//! The same logical field can come back as a sentinel string, a
//! colon-separated status line, or JSON with varying nesting. Everything
//! funnels into a closed enum; unrecognized shapes become `Unknown`.

use crate::types::*;
use serde_json::Value;
use tracing::debug;

/// Classify a raw response body.
pub fn parse_response(body: &str) -> ProviderResponse {
    let raw = body.trim();
    if raw.is_empty() {
        return ProviderResponse::Empty;
    }

    if raw.starts_with('{') || raw.starts_with('[') {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => return ProviderResponse::Json(value),
            Err(e) => debug!("Body looks like JSON but failed to parse: {}", e),
        }
    }

    match raw {
        "NO_NUMBERS" => return ProviderResponse::Sentinel(ProviderSentinel::NoNumbers),
        "NO_BALANCE" => return ProviderResponse::Sentinel(ProviderSentinel::NoBalance),
        "NO_ACTIVATIONS" => return ProviderResponse::Sentinel(ProviderSentinel::NoActivations),
        _ => {}
    }
    if raw.contains("BAD_KEY") {
        return ProviderResponse::Sentinel(ProviderSentinel::BadKey);
    }

    let mut parts = raw.split(':');
    let status = parts.next().unwrap_or_default().to_string();
    let value = parts.next().map(String::from);
    let rest: Vec<&str> = parts.collect();
    let extra = if rest.is_empty() {
        None
    } else {
        Some(rest.join(":"))
    };

    ProviderResponse::Status {
        status,
        value,
        extra,
    }
}

/// Map a `getStatus` response onto the activation status enum.
pub fn parse_status(response: &ProviderResponse) -> ActivationStatus {
    match response {
        ProviderResponse::Status {
            status,
            value,
            extra,
        } => match status.as_str() {
            "STATUS_OK" => match non_empty(value.as_deref()) {
                Some(code) => ActivationStatus::Ok {
                    code,
                    text: non_empty(extra.as_deref()),
                },
                None => ActivationStatus::Unknown,
            },
            "STATUS_WAIT_CODE" | "STATUS_WAIT_RETRY" | "STATUS_WAIT_RESEND" => {
                ActivationStatus::Wait
            }
            "STATUS_CANCEL" => ActivationStatus::Cancelled,
            _ => ActivationStatus::Unknown,
        },
        ProviderResponse::Json(value) => parse_status_json(value),
        ProviderResponse::Empty | ProviderResponse::Sentinel(_) => ActivationStatus::Unknown,
    }
}

fn parse_status_json(value: &Value) -> ActivationStatus {
    if let Some(sms) = value.get("sms") {
        if let Some(code) = sms.get("code").and_then(value_to_string) {
            return ActivationStatus::Ok {
                code,
                text: sms.get("text").and_then(value_to_string),
            };
        }
    }

    match value.get("status").and_then(Value::as_str) {
        Some(status) => parse_status(&parse_response(status)),
        None => ActivationStatus::Unknown,
    }
}

/// Extract activations from a `getActiveActivations` response.
///
/// The list may be a plain array, `{rows: [...]}`, or a single
/// `{row: {...}}`. Entries without an activation id are dropped.
pub fn parse_active_activations(response: &ProviderResponse) -> Vec<ActiveActivation> {
    let ProviderResponse::Json(value) = response else {
        return Vec::new();
    };

    let Some(list) = value.get("activeActivations") else {
        return Vec::new();
    };

    let items: Vec<&Value> = if let Some(array) = list.as_array() {
        array.iter().collect()
    } else if let Some(rows) = list.get("rows").and_then(Value::as_array) {
        rows.iter().collect()
    } else if let Some(row) = list.get("row").filter(|r| r.is_object()) {
        vec![row]
    } else {
        Vec::new()
    };

    items.into_iter().filter_map(parse_activation).collect()
}

fn parse_activation(item: &Value) -> Option<ActiveActivation> {
    let id = item.get("activationId").and_then(value_to_string)?;

    let code = match item.get("smsCode") {
        Some(Value::Array(codes)) => codes.first().and_then(value_to_string),
        Some(other) => value_to_string(other),
        None => None,
    };

    let text = item
        .get("smsText")
        .and_then(value_to_string)
        .or_else(|| item.get("text").and_then(value_to_string));

    Some(ActiveActivation {
        id,
        phone_number: item.get("phoneNumber").and_then(value_to_string),
        service_name: item
            .get("serviceCode")
            .and_then(value_to_string)
            .unwrap_or_else(|| "Unknown".into()),
        code,
        text,
    })
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(Some(s.as_str())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
