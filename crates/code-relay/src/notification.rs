//! Notification text for a received message.

use activation_store::{Message, Session, UNKNOWN_SERVICE};
use push_client::NotificationPayload;

/// Title used when neither phone number nor service is known.
const FALLBACK_TITLE: &str = "New SMS";

/// Build the push payload for one message of a session.
///
/// The body prefers the code over free text; the title prefers the
/// formatted phone number over the service name.
pub fn build_notification(
    session: &Session,
    message: &Message,
    icon: Option<&str>,
) -> NotificationPayload {
    let title = session
        .phone_number
        .as_deref()
        .and_then(format_phone_number)
        .or_else(|| {
            Some(session.service_name.trim())
                .filter(|s| !s.is_empty() && *s != UNKNOWN_SERVICE)
                .map(String::from)
        })
        .unwrap_or_else(|| FALLBACK_TITLE.into());

    let body = match message.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => format!("Code: {}", code),
        _ => message.text.clone(),
    };

    NotificationPayload::new(title, body).with_icon(icon.map(String::from))
}

/// Pretty-print a phone number.
///
/// Eleven-digit Russian numbers (`7…` or `8…`) become
/// `+7 (XXX) XXX-XX-XX`; anything else with digits becomes `+digits`.
pub fn format_phone_number(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    if digits.len() == 11 && (digits.starts_with('7') || digits.starts_with('8')) {
        return Some(format!(
            "+7 ({}) {}-{}-{}",
            &digits[1..4],
            &digits[4..7],
            &digits[7..9],
            &digits[9..11]
        ));
    }

    Some(format!("+{}", digits))
}
