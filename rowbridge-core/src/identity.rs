//! Identity types for referenced entities

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// The category of entity a reference resolves against (analogous to a table).
///
/// Written as `"app_label.ModelName"` in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityKind {
    app_label: String,
    model_name: String,
}

impl EntityKind {
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            model_name: model_name.into(),
        }
    }

    pub fn app_label(&self) -> &str {
        &self.app_label
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Cache namespace for identifiers of this kind, e.g. `catalog_category_`.
    ///
    /// Not injective: `a_b.c` and `a.b_c` both map to `a_b_c_`.
    pub fn namespace(&self) -> String {
        format!("{}_{}_", self.app_label, self.model_name).to_lowercase()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model_name)
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('.') {
            Some((app, model))
                if !app.is_empty() && !model.is_empty() && !model.contains('.') =>
            {
                Ok(EntityKind::new(app, model))
            }
            _ => Err(format!(
                "Invalid EntityKind: {:?} (expected \"app_label.ModelName\")",
                s
            )),
        }
    }
}

impl TryFrom<String> for EntityKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        kind.to_string()
    }
}

/// Shape of an entity kind's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    Integer,
    Uuid,
    Text,
}

impl KeyType {
    /// Interpret a token as a key of this type.
    ///
    /// Returns `None` when the token cannot be a key of this shape at all,
    /// which storage reports as a malformed key rather than a miss.
    pub fn parse(&self, token: &str) -> Option<PrimaryKey> {
        match self {
            KeyType::Integer => token.parse::<i64>().ok().map(PrimaryKey::Integer),
            KeyType::Uuid => Uuid::parse_str(token).ok().map(PrimaryKey::Uuid),
            KeyType::Text if token.is_empty() => None,
            KeyType::Text => Some(PrimaryKey::Text(token.to_string())),
        }
    }
}

/// A primary key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Integer(i64),
    Uuid(Uuid),
    Text(String),
}

impl PrimaryKey {
    pub fn key_type(&self) -> KeyType {
        match self {
            PrimaryKey::Integer(_) => KeyType::Integer,
            PrimaryKey::Uuid(_) => KeyType::Uuid,
            PrimaryKey::Text(_) => KeyType::Text,
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Integer(value) => write!(f, "{}", value),
            PrimaryKey::Uuid(value) => write!(f, "{}", value),
            PrimaryKey::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(value: i64) -> Self {
        PrimaryKey::Integer(value)
    }
}

impl From<Uuid> for PrimaryKey {
    fn from(value: Uuid) -> Self {
        PrimaryKey::Uuid(value)
    }
}

impl From<&str> for PrimaryKey {
    fn from(value: &str) -> Self {
        PrimaryKey::Text(value.to_string())
    }
}

/// Storage-side description of an entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub key_type: KeyType,
    /// Attribute names entities of this kind carry (besides the key).
    pub attributes: Vec<String>,
}

impl EntitySchema {
    pub fn new(kind: EntityKind, key_type: KeyType) -> Self {
        Self {
            kind,
            key_type,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(name.into());
        self
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }
}

/// A stored entity as seen by the conversion layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub pk: PrimaryKey,
    pub attributes: BTreeMap<String, String>,
}

impl Entity {
    pub fn new(kind: EntityKind, pk: impl Into<PrimaryKey>) -> Self {
        Self {
            kind,
            pk: pk.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Shared handle to an entity. Converters hold these; the store owns the data.
pub type EntityRef = Arc<Entity>;
