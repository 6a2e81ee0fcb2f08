//! # Notification model
//! One entry per lab sample that is waiting for a price quotation.
//!
//! The on-disk and on-wire form is a camelCase JSON object; the persisted
//! store is a JSON array of these.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of the underlying sample. Upstream records use either numeric
/// or string ids, so both are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationId {
    Number(i64),
    Text(String),
}

impl NotificationId {
    /// Parse an id coming from a URL path or a form field.
    /// Integers address numeric ids, anything else is a text id.
    pub fn parse_lenient(raw: &str) -> Self {
        let t = raw.trim();
        match t.parse::<i64>() {
            Ok(n) => NotificationId::Number(n),
            Err(_) => NotificationId::Text(t.to_string()),
        }
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationId::Number(n) => write!(f, "{n}"),
            NotificationId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for NotificationId {
    fn from(n: i64) -> Self {
        NotificationId::Number(n)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        NotificationId::Text(s.to_string())
    }
}

/// Notification category. Only one exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "quotation-pending")]
    QuotationPending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Full upstream sample record, passed through untouched.
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

const QUOTATION_TITLE: &str = "Muestra en cotización";
const CODE_FIELDS: [&str; 3] = ["codigo", "codigo_muestra", "code"];

impl Notification {
    /// New unread notification for a sample first observed at `now`.
    pub fn quotation_pending(id: NotificationId, record: Value, now: DateTime<Utc>) -> Self {
        let code = CODE_FIELDS
            .iter()
            .find_map(|k| match record.get(*k) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| id.to_string());

        Self {
            id,
            kind: NotificationKind::QuotationPending,
            title: QUOTATION_TITLE.to_string(),
            message: format!("La muestra {code} está pendiente de cotización"),
            payload: record,
            created_at: now,
            read: false,
        }
    }

    /// Age at `now`; negative ages (clock skew) count as zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.created_at).max(chrono::Duration::zero())
    }
}

/// Count of entries with `read == false`.
pub fn unread_count(items: &[Notification]) -> usize {
    items.iter().filter(|n| !n.read).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn lenient_id_parsing() {
        assert_eq!(NotificationId::parse_lenient("42"), NotificationId::Number(42));
        assert_eq!(
            NotificationId::parse_lenient(" M-17 "),
            NotificationId::Text("M-17".into())
        );
        assert_eq!(NotificationId::Number(7).to_string(), "7");
    }

    #[test]
    fn message_prefers_sample_code() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let n = Notification::quotation_pending(
            1.into(),
            json!({"id": 1, "codigo": "AG-0012"}),
            now,
        );
        assert_eq!(n.message, "La muestra AG-0012 está pendiente de cotización");
        assert!(!n.read);

        let n2 = Notification::quotation_pending("x9".into(), json!({"id": "x9"}), now);
        assert_eq!(n2.message, "La muestra x9 está pendiente de cotización");
    }

    #[test]
    fn wire_format_is_camel_case_with_kind_tag() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let n = Notification::quotation_pending(5.into(), json!({"id": 5}), now);
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["id"], json!(5));
        assert_eq!(v["kind"], json!("quotation-pending"));
        assert_eq!(v["read"], json!(false));
        assert!(v.get("createdAt").is_some());

        let back: Notification = serde_json::from_value(v).unwrap();
        assert_eq!(back, n);
    }
}
