//! Merge of freshly fetched pending samples into the local notification list.
//!
//! Rules:
//! - read entries are kept whatever upstream says;
//! - unread entries are kept only while upstream still lists their sample;
//! - kept entries that upstream still lists get the latest payload;
//! - samples not seen before are appended as unread, in upstream order.
//!
//! The result depends only on the inputs, and feeding the same upstream
//! listing twice leaves the list unchanged.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::extract::PendingSample;
use crate::notification::{Notification, NotificationId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub total: usize,
    pub added: usize,
    pub dropped: usize,
}

pub fn reconcile(
    existing: &[Notification],
    upstream: &[PendingSample],
    now: DateTime<Utc>,
) -> (Vec<Notification>, ReconcileReport) {
    // Last record wins when upstream repeats an id.
    let latest: HashMap<&NotificationId, &Value> =
        upstream.iter().map(|p| (&p.id, &p.record)).collect();

    let mut seen: HashSet<NotificationId> = HashSet::with_capacity(existing.len() + upstream.len());
    let mut out = Vec::with_capacity(existing.len() + upstream.len());

    for n in existing {
        let present = latest.get(&n.id);
        if !(n.read || present.is_some()) || !seen.insert(n.id.clone()) {
            continue;
        }
        let mut kept = n.clone();
        if let Some(record) = present {
            kept.payload = (*record).clone();
        }
        out.push(kept);
    }
    let retained = out.len();

    for p in upstream {
        if seen.insert(p.id.clone()) {
            let record = latest.get(&p.id).map_or(&p.record, |r| *r);
            out.push(Notification::quotation_pending(p.id.clone(), record.clone(), now));
        }
    }

    let report = ReconcileReport {
        total: out.len(),
        added: out.len() - retained,
        dropped: existing.len() - retained,
    };
    (out, report)
}

/// In-place form used against the live store.
pub fn reconcile_in_place(
    items: &mut Vec<Notification>,
    upstream: &[PendingSample],
    now: DateTime<Utc>,
) -> ReconcileReport {
    let (next, report) = reconcile(items, upstream, now);
    *items = next;
    report
}
