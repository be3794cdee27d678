// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Wire format for entries stored in Redis.
//!
//! Each entry is one JSON object, `{"value": "...", "errorMessage": "..."}`. An empty
//! `errorMessage` marks a successful lookup; anything else is the cached error's text.

use std::time::Duration;

use linkcache_tier::{Entry, Error, StoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireRecord {
    value: String,
    error_message: String,
}

/// Serializes an entry into its JSON record.
///
/// # Errors
///
/// Returns a serialization error if JSON encoding fails.
pub fn encode_entry(entry: &Entry) -> Result<String, Error> {
    let record = match entry.as_result() {
        Ok(url) => WireRecord {
            value: url.to_owned(),
            error_message: String::new(),
        },
        Err(error) => WireRecord {
            value: String::new(),
            error_message: error.to_string(),
        },
    };

    serde_json::to_string(&record).map_err(Error::serialization)
}

/// Parses a JSON record back into an entry.
///
/// # Errors
///
/// Returns a serialization error if the payload is not a valid record.
pub fn decode_entry(payload: &str) -> Result<Entry, Error> {
    let record: WireRecord = serde_json::from_str(payload).map_err(Error::serialization)?;

    if record.error_message.is_empty() {
        Ok(Entry::found(record.value))
    } else {
        Ok(Entry::failed(StoreError::from_message(&record.error_message)))
    }
}

/// Converts a TTL into the whole seconds passed to `SET ... EX`.
///
/// Rounds to the nearest second and never returns less than one, since Redis rejects
/// an expiry of zero.
#[must_use]
pub fn ttl_seconds(ttl: Duration) -> u64 {
    let rounded = ttl.as_secs() + u64::from(ttl.subsec_millis() >= 500);
    rounded.max(1)
}
