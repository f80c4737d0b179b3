//! Capture stamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record with its UTC capture instant prepended as `_ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    #[serde(rename = "_ts", default)]
    pub ts: String,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Stamped<T> {
    pub fn now(body: T) -> Self {
        Self {
            ts: utc_stamp(Utc::now()),
            body,
        }
    }

    pub fn into_inner(self) -> T {
        self.body
    }
}

/// RFC 3339, microsecond precision, explicit `+00:00` offset.
pub fn utc_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}
