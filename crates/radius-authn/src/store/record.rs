//! Local identity record

use crate::client::Attributes;
use crate::identity::IdentityKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The caller's user entity as seen by the resolver.
///
/// Apart from the identity key field the contents of `fields` are opaque.
/// `radius_attributes` is never persisted; it only carries the attributes of
/// the most recent successful RADIUS check.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Store-assigned id, `None` until first saved
    pub id: Option<i64>,
    pub fields: Map<String, Value>,
    #[serde(skip)]
    pub radius_attributes: Option<Attributes>,
}

impl IdentityRecord {
    /// New unsaved record holding only the identity key
    pub fn with_key(field: &str, key: &IdentityKey) -> Self {
        let mut fields = Map::new();
        fields.insert(field.to_string(), Value::from(key.as_str()));
        IdentityRecord {
            id: None,
            fields,
            radius_attributes: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Whether `field` holds exactly this identity key
    pub fn has_key(&self, field: &str, key: &IdentityKey) -> bool {
        self.get_str(field) == Some(key.as_str())
    }
}
