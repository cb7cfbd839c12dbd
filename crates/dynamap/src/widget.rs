//! `Widget`: the sample entity used by the `demo` and `describe` commands.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dynamap_core::{Entity, EntitySchema, Error, FieldDescriptor, Key, Record, Result, Value};

/// Global index on owner, ordered by status then version.
pub const BY_OWNER: &str = "ByOwner";
/// Local index on name, ordered by creation time.
pub const BY_CREATED: &str = "ByCreated";

static SCHEMA: LazyLock<Arc<EntitySchema>> = LazyLock::new(|| {
    let schema = EntitySchema::builder("Widget")
        .field(FieldDescriptor::string("name").required())
        .field(FieldDescriptor::unsigned("version"))
        .field(FieldDescriptor::string("owner").required())
        .field(FieldDescriptor::enumeration("status", WidgetStatus::LABELS))
        .field(FieldDescriptor::timestamp("created_at"))
        .field(FieldDescriptor::string("serial"))
        .field(FieldDescriptor::composite("status_version", ["status", "version"]))
        .hash_key("name")
        .range_key("version")
        .global_index(BY_OWNER, "owner", Some("status_version"))
        .local_index(BY_CREATED, "created_at")
        .build()
        .expect("widget schema is statically valid");
    Arc::new(schema)
});

/// Lifecycle state of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetStatus {
    Draft,
    Active,
    Retired,
}

impl WidgetStatus {
    pub const LABELS: [&'static str; 3] = ["draft", "active", "retired"];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetStatus::Draft => "draft",
            WidgetStatus::Active => "active",
            WidgetStatus::Retired => "retired",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "draft" => Some(WidgetStatus::Draft),
            "active" => Some(WidgetStatus::Active),
            "retired" => Some(WidgetStatus::Retired),
            _ => None,
        }
    }
}

impl From<WidgetStatus> for Value {
    fn from(status: WidgetStatus) -> Self {
        Value::Enum(status.as_str().to_string())
    }
}

/// A versioned widget owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub name: String,
    pub version: i64,
    pub owner: String,
    pub status: WidgetStatus,
    pub created_at: DateTime<Utc>,
    pub serial: Option<Uuid>,
}

impl Widget {
    /// A draft widget created now, with a fresh serial.
    pub fn new(name: impl Into<String>, version: i64, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version,
            owner: owner.into(),
            status: WidgetStatus::Draft,
            created_at: Utc::now(),
            serial: Some(Uuid::new_v4()),
        }
    }

    pub fn with_status(mut self, status: WidgetStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Primary key of the widget `name` at `version`.
    pub fn key_for(name: &str, version: i64) -> Key {
        Key::new(name).with_range(version)
    }
}

impl Entity for Widget {
    fn schema() -> Arc<EntitySchema> {
        Arc::clone(&SCHEMA)
    }

    fn to_record(&self) -> Record {
        let record = Record::new()
            .with("name", self.name.as_str())
            .with("version", self.version)
            .with("owner", self.owner.as_str())
            .with("status", self.status)
            .with("created_at", self.created_at);
        match self.serial {
            Some(serial) => record.with("serial", serial.to_string()),
            None => record,
        }
    }

    fn from_record(record: Record) -> Result<Self> {
        let status = record.require_string("status")?;
        let status = WidgetStatus::parse(&status).ok_or_else(|| Error::Decoding {
            field: "status".to_string(),
            reason: format!("unknown status '{status}'"),
        })?;

        let serial = record
            .optional_string("serial")?
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| Error::Decoding {
                field: "serial".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name: record.require_string("name")?,
            version: record.require_integer("version")?,
            owner: record.require_string("owner")?,
            status,
            created_at: record.require_timestamp("created_at")?,
            serial,
        })
    }
}
