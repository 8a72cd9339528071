//! Schema normalization and content fingerprinting
//!
//! Two schemas that differ only in the order of entities, fields, indexes,
//! uniques or relationships normalize to the same [`CanonicalSchema`] and
//! therefore hash identically. Attributes that are not listed in the canonical
//! types (descriptions, unknown keys) never reach the digest.

use super::{
    AuthConfig, Entity, EntityScope, Field, FieldType, IndexDef, PrimaryKeyType, Relationship,
    Schema, UniqueConstraint,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Algorithm tag prepended to every fingerprint
pub const HASH_PREFIX: &str = "sha256:";

/// Number of hex characters kept from the digest
pub const HASH_HEX_LEN: usize = 16;

/// Order-independent form of a schema, holding only hashed attributes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSchema {
    pub version: Option<String>,
    pub root_folder: Option<String>,
    pub api_type: Option<String>,
    pub entities: Vec<CanonicalEntity>,
    pub relationships: Vec<Relationship>,
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEntity {
    pub name: String,
    pub timestamps: bool,
    pub soft_delete: bool,
    pub primary_key_type: Option<PrimaryKeyType>,
    pub fields: Vec<CanonicalField>,
    pub indexes: Vec<IndexDef>,
    pub uniques: Vec<UniqueConstraint>,
    pub scope: Option<EntityScope>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub nullable: bool,
    pub primary: bool,
    pub unique: bool,
    pub index: bool,
    pub default: Option<serde_json::Value>,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub values: Option<Vec<String>>,
}

impl From<&Field> for CanonicalField {
    fn from(field: &Field) -> Self {
        Self {
            name: field.name.clone(),
            field_type: field.field_type.clone(),
            nullable: field.nullable,
            primary: field.primary,
            unique: field.unique,
            index: field.index,
            default: field.default.clone(),
            length: field.length,
            precision: field.precision,
            scale: field.scale,
            values: field.values.clone(),
        }
    }
}

/// Canonicalize a whole schema
pub fn normalize(schema: &Schema) -> CanonicalSchema {
    let mut entities: Vec<CanonicalEntity> = schema.entities.iter().map(normalize_entity).collect();
    entities.sort_by(|a, b| a.name.cmp(&b.name));

    let mut relationships = schema.relationships.clone();
    relationships.sort_by(|a, b| {
        (a.from.as_str(), a.to.as_str(), a.kind.as_str())
            .cmp(&(b.from.as_str(), b.to.as_str(), b.kind.as_str()))
    });

    CanonicalSchema {
        version: schema.version.clone(),
        root_folder: schema.root_folder.clone(),
        api_type: schema.api_type.clone(),
        entities,
        relationships,
        auth: schema.auth.clone(),
    }
}

/// Canonicalize one entity (fields by name, constraints by field list)
pub fn normalize_entity(entity: &Entity) -> CanonicalEntity {
    let mut fields: Vec<CanonicalField> = entity.fields.iter().map(CanonicalField::from).collect();
    fields.sort_by(|a, b| a.name.cmp(&b.name));

    let mut indexes = entity.indexes.clone();
    indexes.sort_by(|a, b| {
        (a.fields.join(","), a.unique, &a.name).cmp(&(b.fields.join(","), b.unique, &b.name))
    });

    // Unique constraints carry an implicit `unique = true`, so the tie-break is on name
    let mut uniques = entity.uniques.clone();
    uniques.sort_by(|a, b| (a.fields.join(","), &a.name).cmp(&(b.fields.join(","), &b.name)));

    CanonicalEntity {
        name: entity.name.clone(),
        timestamps: entity.timestamps,
        soft_delete: entity.soft_delete,
        primary_key_type: entity.primary_key_type,
        fields,
        indexes,
        uniques,
        scope: entity.scope.clone(),
    }
}

/// Deterministic content fingerprint: `sha256:<16 hex chars>`
pub fn hash(schema: &Schema) -> String {
    digest_canonical(&normalize(schema))
}

fn digest_canonical(canonical: &CanonicalSchema) -> String {
    // Going through `Value` sorts object keys (serde_json maps are BTreeMaps)
    let serialized = serde_json::to_value(canonical)
        .map(|value| value.to_string())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{}{}", HASH_PREFIX, &digest[..HASH_HEX_LEN])
}
