//! Entity and field level conflict enumeration and merge
//!
//! [`ConflictResolver::detect_all_conflicts`] walks both documents and lists
//! every structural difference. [`ConflictResolver::resolve`] then asks a
//! [`DecisionProvider`] for a choice per conflict and assembles one schema.

use crate::schema::hash::normalize_entity;
use crate::schema::{
    Entity, Field, Schema, DEFAULT_API_TYPE, DEFAULT_ROOT_FOLDER, DEFAULT_VERSION,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while driving a resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Resolution aborted")]
    Aborted,

    #[error("{side} schema defines entity '{entity}' more than once")]
    DuplicateEntity { side: &'static str, entity: String },

    #[error("Prompt I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    /// Only on the local side
    Added,
    /// Only on the remote side
    Removed,
    /// On both sides with differences
    Changed,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ConflictKind::Added => "added",
            ConflictKind::Removed => "removed",
            ConflictKind::Changed => "changed",
        };
        f.write_str(tag)
    }
}

/// Field attribute compared between the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldAttribute {
    Type,
    Nullable,
    Default,
    Primary,
    Unique,
    Index,
    Length,
    Precision,
    Scale,
    Values,
}

impl FieldAttribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldAttribute::Type => "type",
            FieldAttribute::Nullable => "nullable",
            FieldAttribute::Default => "default",
            FieldAttribute::Primary => "primary",
            FieldAttribute::Unique => "unique",
            FieldAttribute::Index => "index",
            FieldAttribute::Length => "length",
            FieldAttribute::Precision => "precision",
            FieldAttribute::Scale => "scale",
            FieldAttribute::Values => "values",
        }
    }
}

/// One differing attribute of a field present on both sides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub attribute: FieldAttribute,
    pub local: String,
    pub remote: String,
}

impl FieldChange {
    pub fn description(&self) -> String {
        format!("{}: local {} vs remote {}", self.attribute.as_str(), self.local, self.remote)
    }
}

/// Entity-level attribute compared between the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityAttribute {
    Timestamps,
    SoftDelete,
    PrimaryKeyType,
    Indexes,
    Uniques,
    Scope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConflict {
    pub field: String,
    pub kind: ConflictKind,
    pub local: Option<Field>,
    pub remote: Option<Field>,
    pub changes: Vec<FieldChange>,
}

impl FieldConflict {
    pub fn summary(&self) -> String {
        match self.kind {
            ConflictKind::Added => format!("{} (only in local)", self.field),
            ConflictKind::Removed => format!("{} (only in remote)", self.field),
            ConflictKind::Changed => {
                let changes: Vec<String> = self.changes.iter().map(FieldChange::description).collect();
                format!("{} ({})", self.field, changes.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConflict {
    pub entity: String,
    pub kind: ConflictKind,
    pub local: Option<Entity>,
    pub remote: Option<Entity>,
    pub field_conflicts: Vec<FieldConflict>,
    pub metadata_changes: Vec<EntityAttribute>,
}

impl EntityConflict {
    pub fn summary(&self) -> String {
        match self.kind {
            ConflictKind::Added => format!("Entity {} exists only in local", self.entity),
            ConflictKind::Removed => format!("Entity {} exists only in remote", self.entity),
            ConflictKind::Changed => {
                let mut summary = format!(
                    "Entity {} differs: {} field conflict(s)",
                    self.entity,
                    self.field_conflicts.len()
                );
                if !self.metadata_changes.is_empty() {
                    summary.push_str(&format!(", metadata {:?}", self.metadata_changes));
                }
                summary
            }
        }
    }
}

/// Entity-level decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionChoice {
    Local,
    Remote,
    Merge,
    Skip,
}

/// Field-level decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldChoice {
    Local,
    Remote,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResolution {
    pub field: String,
    pub choice: FieldChoice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityResolution {
    pub entity: String,
    pub kind: ConflictKind,
    pub choice: ResolutionChoice,
    pub field_resolutions: Vec<FieldResolution>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub schema: Schema,
    pub resolutions: Vec<EntityResolution>,
}

impl ResolutionResult {
    pub fn resolution_for(&self, entity: &str) -> Option<&EntityResolution> {
        self.resolutions.iter().find(|r| r.entity == entity)
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.resolutions
            .iter()
            .filter(|r| r.choice == ResolutionChoice::Skip)
            .map(|r| r.entity.as_str())
            .collect()
    }
}

/// Source of decisions during [`ConflictResolver::resolve`]
///
/// Field decisions for a changed entity are requested first, then the entity
/// decision with those field resolutions in hand.
pub trait DecisionProvider: Send {
    fn choose_field(
        &mut self,
        entity: &str,
        conflict: &FieldConflict,
    ) -> Result<FieldChoice, ResolveError>;

    fn choose_entity(
        &mut self,
        conflict: &EntityConflict,
        field_resolutions: &[FieldResolution],
    ) -> Result<ResolutionChoice, ResolveError>;
}

/// Non-interactive strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    LocalWins,
    RemoteWins,
    Merge,
}

impl FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "local-wins" => Ok(ResolutionStrategy::LocalWins),
            "remote" | "remote-wins" => Ok(ResolutionStrategy::RemoteWins),
            "merge" => Ok(ResolutionStrategy::Merge),
            other => Err(format!("unknown resolution strategy: {}", other)),
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ResolutionStrategy::LocalWins => "local-wins",
            ResolutionStrategy::RemoteWins => "remote-wins",
            ResolutionStrategy::Merge => "merge",
        };
        f.write_str(tag)
    }
}

/// Answers every conflict from a fixed strategy
///
/// `Merge` keeps local on field conflicts and lets remote-only fields in.
#[derive(Debug, Clone, Copy)]
pub struct StrategyDecider {
    strategy: ResolutionStrategy,
}

impl StrategyDecider {
    pub fn new(strategy: ResolutionStrategy) -> Self {
        Self { strategy }
    }
}

impl DecisionProvider for StrategyDecider {
    fn choose_field(
        &mut self,
        _entity: &str,
        _conflict: &FieldConflict,
    ) -> Result<FieldChoice, ResolveError> {
        Ok(match self.strategy {
            ResolutionStrategy::LocalWins | ResolutionStrategy::Merge => FieldChoice::Local,
            ResolutionStrategy::RemoteWins => FieldChoice::Remote,
        })
    }

    fn choose_entity(
        &mut self,
        _conflict: &EntityConflict,
        _field_resolutions: &[FieldResolution],
    ) -> Result<ResolutionChoice, ResolveError> {
        Ok(match self.strategy {
            ResolutionStrategy::LocalWins => ResolutionChoice::Local,
            ResolutionStrategy::RemoteWins => ResolutionChoice::Remote,
            ResolutionStrategy::Merge => ResolutionChoice::Merge,
        })
    }
}

/// Structural diff and merge of two schema documents
pub struct ConflictResolver;

impl ConflictResolver {
    /// Every entity-level conflict, local order first then remote-only
    pub fn detect_all_conflicts(local: &Schema, remote: &Schema) -> Vec<EntityConflict> {
        let mut conflicts = Vec::new();

        for local_entity in &local.entities {
            match remote.entity(&local_entity.name) {
                None => conflicts.push(EntityConflict {
                    entity: local_entity.name.clone(),
                    kind: ConflictKind::Added,
                    local: Some(local_entity.clone()),
                    remote: None,
                    field_conflicts: Vec::new(),
                    metadata_changes: Vec::new(),
                }),
                Some(remote_entity) => {
                    if let Some(conflict) = Self::compare_entities(local_entity, remote_entity) {
                        conflicts.push(conflict);
                    }
                }
            }
        }

        for remote_entity in &remote.entities {
            if local.entity(&remote_entity.name).is_none() {
                conflicts.push(EntityConflict {
                    entity: remote_entity.name.clone(),
                    kind: ConflictKind::Removed,
                    local: None,
                    remote: Some(remote_entity.clone()),
                    field_conflicts: Vec::new(),
                    metadata_changes: Vec::new(),
                });
            }
        }

        conflicts
    }

    /// Drive the decider over every conflict and assemble the merged schema
    pub fn resolve(
        local: &Schema,
        remote: &Schema,
        decider: &mut dyn DecisionProvider,
    ) -> Result<ResolutionResult, ResolveError> {
        reject_duplicates("Local", local)?;
        reject_duplicates("Remote", remote)?;

        let conflicts = Self::detect_all_conflicts(local, remote);
        if conflicts.is_empty() {
            return Ok(ResolutionResult { schema: local.clone(), resolutions: Vec::new() });
        }

        let mut resolutions = Vec::with_capacity(conflicts.len());
        // None marks an entity resolved to be dropped
        let mut outcomes: HashMap<String, Option<Entity>> = HashMap::new();

        for conflict in &conflicts {
            let mut field_resolutions = Vec::new();
            if conflict.kind == ConflictKind::Changed {
                for field_conflict in &conflict.field_conflicts {
                    let choice = decider.choose_field(&conflict.entity, field_conflict)?;
                    field_resolutions
                        .push(FieldResolution { field: field_conflict.field.clone(), choice });
                }
            }

            let choice = decider.choose_entity(conflict, &field_resolutions)?;
            log::debug!("Resolved {} ({}) as {:?}", conflict.entity, conflict.kind, choice);

            outcomes.insert(
                conflict.entity.clone(),
                Self::apply_choice(conflict, choice, &field_resolutions),
            );
            resolutions.push(EntityResolution {
                entity: conflict.entity.clone(),
                kind: conflict.kind,
                choice,
                field_resolutions,
            });
        }

        let schema = Self::assemble(local, remote, &outcomes);
        Ok(ResolutionResult { schema, resolutions })
    }

    fn compare_entities(local: &Entity, remote: &Entity) -> Option<EntityConflict> {
        let mut field_conflicts = Vec::new();

        for local_field in &local.fields {
            match remote.field(&local_field.name) {
                None => field_conflicts.push(FieldConflict {
                    field: local_field.name.clone(),
                    kind: ConflictKind::Added,
                    local: Some(local_field.clone()),
                    remote: None,
                    changes: Vec::new(),
                }),
                Some(remote_field) => {
                    let changes = field_changes(local_field, remote_field);
                    if !changes.is_empty() {
                        field_conflicts.push(FieldConflict {
                            field: local_field.name.clone(),
                            kind: ConflictKind::Changed,
                            local: Some(local_field.clone()),
                            remote: Some(remote_field.clone()),
                            changes,
                        });
                    }
                }
            }
        }

        for remote_field in &remote.fields {
            if local.field(&remote_field.name).is_none() {
                field_conflicts.push(FieldConflict {
                    field: remote_field.name.clone(),
                    kind: ConflictKind::Removed,
                    local: None,
                    remote: Some(remote_field.clone()),
                    changes: Vec::new(),
                });
            }
        }

        let metadata_changes = metadata_changes(local, remote);
        if field_conflicts.is_empty() && metadata_changes.is_empty() {
            return None;
        }

        Some(EntityConflict {
            entity: local.name.clone(),
            kind: ConflictKind::Changed,
            local: Some(local.clone()),
            remote: Some(remote.clone()),
            field_conflicts,
            metadata_changes,
        })
    }

    fn apply_choice(
        conflict: &EntityConflict,
        choice: ResolutionChoice,
        field_resolutions: &[FieldResolution],
    ) -> Option<Entity> {
        if choice == ResolutionChoice::Skip {
            return None;
        }

        let (local, remote) = match (&conflict.local, &conflict.remote) {
            (Some(local), Some(remote)) => (local, remote),
            // Added/removed: only one side exists, merge keeps whichever that is
            (local, remote) => {
                return match choice {
                    ResolutionChoice::Local => local.clone(),
                    ResolutionChoice::Remote => remote.clone(),
                    _ => local.clone().or_else(|| remote.clone()),
                };
            }
        };

        Some(match choice {
            ResolutionChoice::Remote => overlay(remote, local, field_resolutions, FieldChoice::Local),
            ResolutionChoice::Merge => merge_fields(local, remote, field_resolutions),
            _ => overlay(local, remote, field_resolutions, FieldChoice::Remote),
        })
    }

    fn assemble(
        local: &Schema,
        remote: &Schema,
        outcomes: &HashMap<String, Option<Entity>>,
    ) -> Schema {
        let mut entities = Vec::new();
        let mut seen = HashSet::new();

        for name in local.entity_names().into_iter().chain(remote.entity_names()) {
            if !seen.insert(name) {
                continue;
            }
            match outcomes.get(name) {
                Some(Some(entity)) => entities.push(entity.clone()),
                Some(None) => {}
                None => {
                    if let Some(entity) = local.entity(name).or_else(|| remote.entity(name)) {
                        entities.push(entity.clone());
                    }
                }
            }
        }

        let mut relationships = local.relationships.clone();
        let local_keys: HashSet<_> = local.relationships.iter().map(|r| r.key()).collect();
        for relationship in &remote.relationships {
            if !local_keys.contains(&relationship.key()) {
                relationships.push(relationship.clone());
            }
        }

        Schema {
            version: local
                .version
                .clone()
                .or_else(|| remote.version.clone())
                .or_else(|| Some(DEFAULT_VERSION.to_string())),
            root_folder: local
                .root_folder
                .clone()
                .or_else(|| remote.root_folder.clone())
                .or_else(|| Some(DEFAULT_ROOT_FOLDER.to_string())),
            api_type: local
                .api_type
                .clone()
                .or_else(|| remote.api_type.clone())
                .or_else(|| Some(DEFAULT_API_TYPE.to_string())),
            entities,
            relationships,
            auth: local.auth.clone(),
        }
    }
}

/// Start from `base`, swap in `other`'s field where the resolution picked
/// `take_other`, drop skipped fields
fn overlay(
    base: &Entity,
    other: &Entity,
    field_resolutions: &[FieldResolution],
    take_other: FieldChoice,
) -> Entity {
    let mut entity = base.clone();

    for resolution in field_resolutions {
        if resolution.choice == FieldChoice::Skip {
            entity.fields.retain(|f| f.name != resolution.field);
        } else if resolution.choice == take_other {
            match other.field(&resolution.field) {
                Some(field) => replace_or_push(&mut entity.fields, field),
                None => entity.fields.retain(|f| f.name != resolution.field),
            }
        }
    }

    entity
}

/// Local field list with remote swaps and remote-only fields appended
///
/// Entity-level metadata (indexes, uniques, flags) stays local.
fn merge_fields(local: &Entity, remote: &Entity, field_resolutions: &[FieldResolution]) -> Entity {
    let choice_for = |name: &str| {
        field_resolutions.iter().find(|r| r.field == name).map(|r| r.choice)
    };

    let mut fields = Vec::with_capacity(local.fields.len());
    for local_field in &local.fields {
        match choice_for(&local_field.name) {
            Some(FieldChoice::Skip) => {}
            Some(FieldChoice::Remote) => {
                if let Some(remote_field) = remote.field(&local_field.name) {
                    fields.push(remote_field.clone());
                }
            }
            _ => fields.push(local_field.clone()),
        }
    }

    for remote_field in &remote.fields {
        if local.field(&remote_field.name).is_some() {
            continue;
        }
        if choice_for(&remote_field.name) == Some(FieldChoice::Skip) {
            continue;
        }
        fields.push(remote_field.clone());
    }

    Entity { fields, ..local.clone() }
}

fn replace_or_push(fields: &mut Vec<Field>, field: &Field) {
    match fields.iter_mut().find(|f| f.name == field.name) {
        Some(slot) => *slot = field.clone(),
        None => fields.push(field.clone()),
    }
}

fn field_changes(local: &Field, remote: &Field) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    let mut check = |attribute, l: String, r: String| {
        if l != r {
            changes.push(FieldChange { attribute, local: l, remote: r });
        }
    };

    check(
        FieldAttribute::Type,
        local.field_type.as_str().to_string(),
        remote.field_type.as_str().to_string(),
    );
    check(FieldAttribute::Nullable, local.nullable.to_string(), remote.nullable.to_string());
    check(FieldAttribute::Default, render_default(local), render_default(remote));
    check(FieldAttribute::Primary, local.primary.to_string(), remote.primary.to_string());
    check(FieldAttribute::Unique, local.unique.to_string(), remote.unique.to_string());
    check(FieldAttribute::Index, local.index.to_string(), remote.index.to_string());
    check(FieldAttribute::Length, render_opt(local.length), render_opt(remote.length));
    check(FieldAttribute::Precision, render_opt(local.precision), render_opt(remote.precision));
    check(FieldAttribute::Scale, render_opt(local.scale), render_opt(remote.scale));
    check(FieldAttribute::Values, render_values(local), render_values(remote));

    changes
}

fn render_default(field: &Field) -> String {
    field.default.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}

fn render_opt(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}

fn render_values(field: &Field) -> String {
    match &field.values {
        Some(values) => format!("[{}]", values.join(", ")),
        None => "none".to_string(),
    }
}

fn metadata_changes(local: &Entity, remote: &Entity) -> Vec<EntityAttribute> {
    let l = normalize_entity(local);
    let r = normalize_entity(remote);

    let mut changes = Vec::new();
    if l.timestamps != r.timestamps {
        changes.push(EntityAttribute::Timestamps);
    }
    if l.soft_delete != r.soft_delete {
        changes.push(EntityAttribute::SoftDelete);
    }
    if l.primary_key_type != r.primary_key_type {
        changes.push(EntityAttribute::PrimaryKeyType);
    }
    if l.indexes != r.indexes {
        changes.push(EntityAttribute::Indexes);
    }
    if l.uniques != r.uniques {
        changes.push(EntityAttribute::Uniques);
    }
    if l.scope != r.scope {
        changes.push(EntityAttribute::Scope);
    }
    changes
}

/// Entities are keyed by name, so a repeated name cannot be merged
fn reject_duplicates(side: &'static str, schema: &Schema) -> Result<(), ResolveError> {
    let mut names = HashSet::new();
    match schema.entities.iter().find(|e| !names.insert(e.name.as_str())) {
        Some(entity) => Err(ResolveError::DuplicateEntity { side, entity: entity.name.clone() }),
        None => Ok(()),
    }
}
