//! Response normalization for the samples endpoint.
//!
//! The listing is not guaranteed to have a fixed shape: sometimes a bare
//! array, sometimes wrapped (`{ data: [...] }`, `{ data: { muestras: [...] } }`,
//! ...). Strategies are tried in order and the first one that finds an
//! array wins.
//!
//! Status matching is a deliberate normalization: the upstream status text
//! is lowercased and searched for "en cotización" or "en cotizacion", since
//! both spellings (and any casing) occur in real data.

use serde_json::Value;

use crate::notification::NotificationId;

type Strategy = fn(&Value) -> Option<&Vec<Value>>;

const STRATEGIES: [(&str, Strategy); 3] = [
    ("top-level", top_level_array),
    ("nested-path", nested_path_array),
    ("scan", scan_for_array),
];

const NESTED_PATHS: [&[&str]; 11] = [
    &["data"],
    &["muestras"],
    &["samples"],
    &["items"],
    &["results"],
    &["rows"],
    &["data", "data"],
    &["data", "muestras"],
    &["data", "items"],
    &["data", "results"],
    &["data", "rows"],
];

const STATUS_FIELDS: [&str; 5] = ["estado", "status", "estado_muestra", "estadoMuestra", "state"];
const STATUS_NAME_FIELDS: [&str; 3] = ["nombre", "name", "descripcion"];
const PENDING_MARKERS: [&str; 2] = ["en cotización", "en cotizacion"];

const ID_FIELDS: [&str; 8] = [
    "id",
    "_id",
    "id_muestra",
    "idMuestra",
    "muestra_id",
    "sample_id",
    "sampleId",
    "codigo",
];

/// One upstream record that is waiting for a quotation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSample {
    pub id: NotificationId,
    pub record: Value,
}

fn top_level_array(body: &Value) -> Option<&Vec<Value>> {
    body.as_array()
}

fn nested_path_array(body: &Value) -> Option<&Vec<Value>> {
    NESTED_PATHS.iter().find_map(|path| {
        path.iter()
            .try_fold(body, |cur, key| cur.get(*key))
            .and_then(Value::as_array)
    })
}

fn scan_for_array(body: &Value) -> Option<&Vec<Value>> {
    let obj = body.as_object()?;
    obj.values().find_map(Value::as_array).or_else(|| {
        obj.values()
            .filter_map(Value::as_object)
            .find_map(|inner| inner.values().find_map(Value::as_array))
    })
}

/// Find the records array in `body`, or `None` if there is none anywhere.
pub fn locate_records(body: &Value) -> Option<&[Value]> {
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let found = strategy(body)?;
        tracing::trace!(target: "notify::engine", strategy = *name, len = found.len(), "records located");
        Some(found.as_slice())
    })
}

/// Status text of a record, from the first status-like field that carries one.
pub fn record_status(record: &Value) -> Option<&str> {
    STATUS_FIELDS.iter().find_map(|k| match record.get(*k)? {
        Value::String(s) => Some(s.as_str()),
        Value::Object(o) => STATUS_NAME_FIELDS
            .iter()
            .find_map(|n| o.get(*n).and_then(Value::as_str)),
        _ => None,
    })
}

/// Case-insensitive substring match against both accepted spellings.
pub fn is_pending_status(status: &str) -> bool {
    let lowered = status.to_lowercase();
    PENDING_MARKERS.iter().any(|m| lowered.contains(m))
}

pub fn is_pending_quotation(record: &Value) -> bool {
    record_status(record).is_some_and(is_pending_status)
}

pub fn record_id(record: &Value) -> Option<NotificationId> {
    ID_FIELDS.iter().find_map(|k| match record.get(*k)? {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(NotificationId::Number(i)),
            None => Some(NotificationId::Text(n.to_string())),
        },
        Value::String(s) if !s.trim().is_empty() => Some(NotificationId::Text(s.trim().to_string())),
        _ => None,
    })
}

/// Records pending quotation, in upstream order.
/// `None` means the body held no array at all.
pub fn pending_samples(body: &Value) -> Option<Vec<PendingSample>> {
    let records = locate_records(body)?;
    let mut out = Vec::new();
    for record in records.iter().filter(|r| r.is_object()) {
        if !is_pending_quotation(record) {
            continue;
        }
        match record_id(record) {
            Some(id) => out.push(PendingSample {
                id,
                record: record.clone(),
            }),
            None => {
                tracing::debug!(target: "notify::engine", "pending sample without id skipped");
            }
        }
    }
    Some(out)
}
