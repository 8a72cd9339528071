//! Structural validation of schema documents
//!
//! Validation reports the first problem found, naming the offending
//! entity/field/relationship. It never repairs the document.

use super::{Schema, SchemaError};
use std::collections::HashSet;

pub fn validate(schema: &Schema) -> Result<(), SchemaError> {
    if schema.version.is_none() {
        return Err(SchemaError::MissingField("version"));
    }
    if schema.root_folder.is_none() {
        return Err(SchemaError::MissingField("rootFolder"));
    }
    if schema.api_type.is_none() {
        return Err(SchemaError::MissingField("apiType"));
    }

    let mut entity_names = HashSet::new();
    for entity in &schema.entities {
        if !entity_names.insert(entity.name.as_str()) {
            return Err(SchemaError::DuplicateEntity(entity.name.clone()));
        }

        let mut field_names = HashSet::new();
        for field in &entity.fields {
            if !field_names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    entity: entity.name.clone(),
                    field: field.name.clone(),
                });
            }
            if !field.field_type.is_supported() {
                return Err(SchemaError::UnsupportedFieldType {
                    entity: entity.name.clone(),
                    field: field.name.clone(),
                    field_type: field.field_type.to_string(),
                });
            }
        }

        let constraint_fields = entity
            .indexes
            .iter()
            .flat_map(|i| i.fields.iter().map(|f| ("Index", f)))
            .chain(entity.uniques.iter().flat_map(|u| u.fields.iter().map(|f| ("Unique", f))));
        for (kind, field) in constraint_fields {
            if !field_names.contains(field.as_str()) {
                return Err(SchemaError::UnknownConstraintField {
                    entity: entity.name.clone(),
                    kind,
                    field: field.clone(),
                });
            }
        }

        if let Some(scope) = &entity.scope {
            if scope.field.trim().is_empty() {
                return Err(SchemaError::EmptyScope { entity: entity.name.clone() });
            }
        }
    }

    for rel in &schema.relationships {
        for endpoint in [&rel.from, &rel.to] {
            if !entity_names.contains(endpoint.as_str()) {
                return Err(SchemaError::UnknownRelationshipEntity {
                    relationship: rel.to_string(),
                    entity: endpoint.clone(),
                });
            }
        }
    }

    Ok(())
}
