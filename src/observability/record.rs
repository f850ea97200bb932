//! Log record schema and event-to-JSON formatting.
//!
//! Every line has `timestamp`, `level`, `logger` and `message`, followed by
//! the call-site fields flattened at top level, and `exception` when one was
//! attached. A call-site field named like a base key is kept under a
//! `field_` prefix.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::Event;

/// Field name the formatter lifts into [`LogRecord::exception`].
pub const EXCEPTION_FIELD: &str = "exception";

const MESSAGE_FIELD: &str = "message";
const RESERVED_FIELDS: [&str; 3] = ["timestamp", "level", "logger"];

/// One structured log event, serialized and written immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: String,
    pub logger: String,
    pub message: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl LogRecord {
    /// Build a record from a `tracing` event, stamped with the current time.
    pub fn from_event(event: &Event<'_>) -> Self {
        let meta = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            level: meta.level().to_string(),
            logger: meta.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
            exception: visitor.exception,
        }
    }

    /// Serialize to a single JSON line (without the trailing newline).
    ///
    /// Never fails: if serialization errors, a minimal record carrying the
    /// base schema and the error is produced instead.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            serde_json::json!({
                "timestamp": self.timestamp,
                "level": self.level,
                "logger": self.logger,
                "message": self.message,
                "format_error": err.to_string(),
            })
            .to_string()
        })
    }
}

/// Collects event fields into JSON values.
///
/// Values JSON cannot carry (non-finite floats, integers beyond 64 bits)
/// are coerced to their string form rather than dropped.
#[derive(Debug, Default)]
pub struct FieldVisitor {
    pub fields: BTreeMap<String, Value>,
    pub message: Option<String>,
    pub exception: Option<String>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        match field.name() {
            MESSAGE_FIELD => self.message = Some(into_text(value)),
            EXCEPTION_FIELD => self.exception = Some(into_text(value)),
            name if RESERVED_FIELDS.contains(&name) => {
                self.fields.insert(format!("field_{name}"), value);
            }
            name => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

fn into_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.insert(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        let value = i64::try_from(value)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        self.insert(field, value);
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        let value = u64::try_from(value)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        self.insert(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }
}
