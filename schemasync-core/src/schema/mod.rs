//! Declarative schema document model
//!
//! A [`Schema`] is the unit that gets hashed, diffed and merged. It is read
//! from storage (or received from the remote) once per command and treated as
//! immutable afterwards: merging always builds a new document.
//!
//! ```text
//! {
//!   "version": "1.0.0",
//!   "rootFolder": "src",
//!   "apiType": "rest",
//!   "entities": [ { "name": "User", "fields": [ ... ] } ],
//!   "relationships": [ { "from": "User", "to": "Post", "type": "OneToMany" } ],
//!   "auth": { ... }
//! }
//! ```

pub mod hash;
pub mod relations;
pub mod validate;

pub use hash::{hash, normalize, CanonicalSchema, HASH_PREFIX};
pub use relations::{RelationKind, Relationship};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default values used when a merged document lacks a root-level field
pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_ROOT_FOLDER: &str = "src";
pub const DEFAULT_API_TYPE: &str = "rest";

/// Schema error type
#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("Schema is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("Duplicate entity '{0}'")]
    DuplicateEntity(String),
    #[error("Duplicate field '{field}' in entity '{entity}'")]
    DuplicateField { entity: String, field: String },
    #[error("Unsupported field type '{field_type}' for {entity}.{field}")]
    UnsupportedFieldType { entity: String, field: String, field_type: String },
    #[error("Relationship {relationship} references unknown entity '{entity}'")]
    UnknownRelationshipEntity { relationship: String, entity: String },
    #[error("{kind} on entity '{entity}' references unknown field '{field}'")]
    UnknownConstraintField { entity: String, kind: &'static str, field: String },
    #[error("Scope of entity '{entity}' must name a field path")]
    EmptyScope { entity: String },
    #[error("Failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Root schema document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Target code root for generated sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<String>,
    /// API style tag (rest, graphql, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_type: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

/// A named entity (table/model) with its fields and constraints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    /// createdAt/updatedAt audit columns
    #[serde(default)]
    pub timestamps: bool,
    /// deletedAt audit column
    #[serde(default)]
    pub soft_delete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_type: Option<PrimaryKeyType>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uniques: Vec<UniqueConstraint>,
    /// Multi-tenancy scope used to auto-filter queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<EntityScope>,
    /// Free-form documentation, not part of the fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single field of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub index: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Allowed values for `enum` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    /// Free-form documentation, not part of the fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Field {
    /// Create a non-nullable field without modifiers
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            primary: false,
            unique: false,
            index: false,
            default: None,
            length: None,
            precision: None,
            scale: None,
            values: None,
            description: None,
        }
    }
}

/// Field type vocabulary
///
/// Stored as a plain string on the wire. Unknown tags are kept as
/// [`FieldType::Unsupported`] so that validation can point at the offending
/// field instead of failing the whole parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    String,
    Uuid,
    Boolean,
    Integer,
    BigInt,
    Float,
    Decimal,
    Numeric,
    Date,
    Timestamp,
    Json,
    Enum,
    Array,
    Unsupported(std::string::String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::String => "string",
            FieldType::Uuid => "uuid",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::BigInt => "bigint",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Numeric => "numeric",
            FieldType::Date => "date",
            FieldType::Timestamp => "timestamp",
            FieldType::Json => "json",
            FieldType::Enum => "enum",
            FieldType::Array => "array",
            FieldType::Unsupported(tag) => tag,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FieldType::Unsupported(_))
    }
}

impl From<std::string::String> for FieldType {
    fn from(tag: std::string::String) -> Self {
        match tag.as_str() {
            "text" => FieldType::Text,
            "string" => FieldType::String,
            "uuid" => FieldType::Uuid,
            "boolean" => FieldType::Boolean,
            "integer" => FieldType::Integer,
            "bigint" => FieldType::BigInt,
            "float" => FieldType::Float,
            "decimal" => FieldType::Decimal,
            "numeric" => FieldType::Numeric,
            "date" => FieldType::Date,
            "timestamp" => FieldType::Timestamp,
            "json" => FieldType::Json,
            "enum" => FieldType::Enum,
            "array" => FieldType::Array,
            _ => FieldType::Unsupported(tag),
        }
    }
}

impl From<FieldType> for std::string::String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary key generation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryKeyType {
    Uuid,
    Serial,
    Cuid,
    Manual,
}

/// Secondary index declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub fields: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Composite uniqueness constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Multi-tenancy scope: queries on the entity are filtered by `field`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityScope {
    /// Field path (e.g. `organizationId` or `project.organizationId`)
    pub field: String,
    /// Request parameter the scope value is read from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

/// Authentication settings attached to the generated API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Provider tag (jwt, session, apiKey, oauth, ...)
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_entity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl Entity {
    /// Create an empty entity
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Builder-style field append
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Schema {
    /// Parse a schema document from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a schema document, propagating read and parse errors
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Load a schema document, treating a missing or corrupt file as absent
    pub fn load_lenient(path: impl AsRef<Path>) -> Option<Self> {
        crate::persist::read_json_lenient(path.as_ref())
    }

    /// Write the document as pretty JSON (temp file + rename)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SchemaError> {
        crate::persist::write_json_atomic(path.as_ref(), self)?;
        log::debug!("Schema written to {}", path.as_ref().display());
        Ok(())
    }

    /// Builder-style entity append
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    /// Content fingerprint, see [`hash::hash`]
    pub fn fingerprint(&self) -> String {
        hash::hash(self)
    }

    /// Structural validation, see [`validate`]
    pub fn validate(&self) -> Result<(), SchemaError> {
        validate::validate(self)
    }
}
