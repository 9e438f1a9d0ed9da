//! Invocation payloads
//!
//! An invocation carries either an object-created notification (one or more
//! records naming a bucket and a URL-encoded key) or a scheduled trigger
//! (`"source": "aws.events"`). The payload's shape alone decides which path
//! runs. A `testmode` field marks a test invocation.

use crate::JanitorError;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::Value;

/// What triggered an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An archive was uploaded
    ObjectCreated {
        /// Bucket holding the new archive
        bucket: String,
        /// Decoded object key
        key: String,
    },
    /// Periodic reconciliation
    Scheduled,
}

/// A decoded invocation payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Events to process, in payload order
    pub events: Vec<Event>,
    /// Test execution: metrics are not posted
    pub test_mode: bool,
}

#[derive(Debug, Deserialize)]
struct RawInvocation {
    #[serde(rename = "Records", default)]
    records: Option<Vec<RawRecord>>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    s3: RawS3,
}

#[derive(Debug, Deserialize)]
struct RawS3 {
    bucket: RawBucket,
    object: RawObject,
}

#[derive(Debug, Deserialize)]
struct RawBucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    key: String,
}

const SCHEDULED_SOURCE: &str = "aws.events";

impl Invocation {
    /// Decode a JSON payload
    ///
    /// # Errors
    /// [`JanitorError::Event`] if the payload matches neither shape, or a
    /// notification is malformed.
    pub fn from_json(payload: &Value) -> Result<Self, JanitorError> {
        let raw: RawInvocation = serde_json::from_value(payload.clone())
            .map_err(|e| JanitorError::Event(format!("Malformed event: {}", e)))?;
        // Presence of the key marks a test run, whatever its value
        let test_mode = payload.get("testmode").is_some();

        if let Some(records) = raw.records {
            if records.is_empty() {
                return Err(JanitorError::Event("Notification has no records".to_string()));
            }
            let events = records
                .into_iter()
                .map(|record| {
                    Ok(Event::ObjectCreated {
                        bucket: record.s3.bucket.name,
                        key: unquote_plus(&record.s3.object.key)?,
                    })
                })
                .collect::<Result<Vec<_>, JanitorError>>()?;
            return Ok(Self { events, test_mode });
        }

        if raw.source.as_deref() == Some(SCHEDULED_SOURCE) {
            return Ok(Self {
                events: vec![Event::Scheduled],
                test_mode,
            });
        }

        Err(JanitorError::Event("Event type not recognized".to_string()))
    }

    /// Decode a JSON payload from text
    pub fn parse(payload: &str) -> Result<Self, JanitorError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| JanitorError::Event(format!("Invalid JSON: {}", e)))?;
        Self::from_json(&value)
    }

    /// Payload for a single upload notification
    pub fn object_created(bucket: &str, key: &str) -> Value {
        serde_json::json!({
            "Records": [{
                "s3": {
                    "bucket": { "name": bucket },
                    "object": { "key": key }
                }
            }]
        })
    }

    /// Payload for a scheduled trigger
    pub fn scheduled() -> Value {
        serde_json::json!({ "source": SCHEDULED_SOURCE })
    }
}

/// Decode a form-encoded key: `+` is a space, `%XX` an escaped byte
fn unquote_plus(key: &str) -> Result<String, JanitorError> {
    let spaced = key.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| JanitorError::Event(format!("Object key '{}' is not valid UTF-8: {}", key, e)))
}
