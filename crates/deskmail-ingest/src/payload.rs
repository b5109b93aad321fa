// SPDX-FileCopyrightText: 2026 Deskmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON body posted by the mail-automation flow.

use chrono::{DateTime, Utc};
use deskmail_core::types::TIMESTAMP_FORMAT;
use deskmail_core::{IncomingMessage, now_timestamp};
use serde::{Deserialize, Serialize};

/// `{subject, body, from, messageId, conversationId, receivedDateTime}`.
///
/// Every field is optional; missing or `null` values read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InboundEmailPayload {
    pub subject: Option<String>,
    pub body: Option<String>,
    pub from: Option<String>,
    pub message_id: Option<String>,
    pub conversation_id: Option<String>,
    pub received_date_time: Option<String>,
}

impl InboundEmailPayload {
    pub fn into_message(self) -> IncomingMessage {
        let received_at = normalize_timestamp(self.received_date_time.as_deref());
        IncomingMessage::new(
            self.subject.unwrap_or_default(),
            self.body.unwrap_or_default(),
            self.from.unwrap_or_default(),
            self.message_id,
            self.conversation_id,
            received_at,
        )
    }
}

/// RFC 3339 input in the canonical UTC format; anything else becomes "now".
pub fn normalize_timestamp(raw: Option<&str>) -> String {
    raw.and_then(|value| DateTime::parse_from_rfc3339(value.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(now_timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_payload_is_read() {
        let payload: InboundEmailPayload = serde_json::from_str(
            r#"{
                "subject": "Jane Doe is requesting an account",
                "body": "name: Jane Doe",
                "from": "support@ilabsolutions.com",
                "messageId": "AAMk-1",
                "conversationId": "conv-1",
                "receivedDateTime": "2026-03-01T09:30:00+01:00"
            }"#,
        )
        .unwrap();
        let message = payload.into_message();
        assert_eq!(message.external_message_id.as_deref(), Some("AAMk-1"));
        assert_eq!(message.external_conversation_id.as_deref(), Some("conv-1"));
        assert_eq!(message.received_at, "2026-03-01T08:30:00.000Z");
    }

    #[test]
    fn nulls_and_blanks_read_as_absent() {
        let payload: InboundEmailPayload =
            serde_json::from_str(r#"{"subject": null, "messageId": "", "conversationId": " "}"#)
                .unwrap();
        let message = payload.into_message();
        assert_eq!(message.subject, "");
        assert_eq!(message.body, "");
        assert_eq!(message.external_message_id, None);
        assert_eq!(message.external_conversation_id, None);
    }

    #[test]
    fn unparseable_time_falls_back_to_now() {
        let ts = normalize_timestamp(Some("yesterday-ish"));
        assert!(ts.ends_with('Z'));
    }
}
