//! Fingerprint-based sync state classification
//!
//! The detector is a pure classifier: given the two fingerprints (and, when
//! available, the two documents) it returns one of four terminal states.
//!
//! | local hash | remote hash        | state          | severity        |
//! |------------|--------------------|----------------|-----------------|
//! | absent     | absent             | NO_CONFLICT    | none            |
//! | absent     | present            | REMOTE_CHANGED | medium          |
//! | present    | absent             | LOCAL_CHANGED  | medium          |
//! | present    | present, equal     | NO_CONFLICT    | none            |
//! | present    | present, differ    | DIVERGED       | high            |
//! | + both documents available       | DIVERGED       | low/medium/high |

use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Pairwise sync classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    NoConflict,
    LocalChanged,
    RemoteChanged,
    Diverged,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            SyncState::NoConflict => "NO_CONFLICT",
            SyncState::LocalChanged => "LOCAL_CHANGED",
            SyncState::RemoteChanged => "REMOTE_CHANGED",
            SyncState::Diverged => "DIVERGED",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(tag)
    }
}

/// Detector output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub state: SyncState,
    pub local_hash: Option<String>,
    pub remote_hash: Option<String>,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_entities: Option<Vec<String>>,
}

impl ConflictInfo {
    /// Anything other than NO_CONFLICT
    pub fn has_conflict(&self) -> bool {
        self.state != SyncState::NoConflict
    }

    /// Both sides moved: a merge is required
    pub fn needs_resolution(&self) -> bool {
        self.state == SyncState::Diverged
    }
}

impl fmt::Display for ConflictInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.state, self.severity, self.message)
    }
}

/// Pure sync-state classifier
pub struct ConflictDetector;

impl ConflictDetector {
    /// Classify the pair of fingerprints, refining with documents when given
    pub fn detect(
        local_hash: Option<&str>,
        remote_hash: Option<&str>,
        local_schema: Option<&Schema>,
        remote_schema: Option<&Schema>,
    ) -> ConflictInfo {
        let info = |state, severity, message: &str| ConflictInfo {
            state,
            local_hash: local_hash.map(str::to_string),
            remote_hash: remote_hash.map(str::to_string),
            message: message.to_string(),
            severity,
            affected_entities: None,
        };

        match (local_hash, remote_hash) {
            (None, None) => info(
                SyncState::NoConflict,
                Severity::None,
                "No sync history on either side; this is a fresh sync",
            ),
            (None, Some(_)) => info(
                SyncState::RemoteChanged,
                Severity::Medium,
                "Remote schema has changes that are not present locally",
            ),
            (Some(_), None) => info(
                SyncState::LocalChanged,
                Severity::Medium,
                "Local schema has changes that have not been pushed",
            ),
            (Some(l), Some(r)) if l == r => {
                info(SyncState::NoConflict, Severity::None, "Local and remote schemas are in sync")
            }
            (Some(_), Some(_)) => match (local_schema, remote_schema) {
                (Some(local), Some(remote)) => {
                    let mut refined = info(SyncState::Diverged, Severity::High, "");
                    Self::refine(&mut refined, local, remote);
                    refined
                }
                _ => info(
                    SyncState::Diverged,
                    Severity::High,
                    "Local and remote schemas have both changed since the last sync",
                ),
            },
        }
    }

    /// Entity-set comparison for the DIVERGED case
    fn refine(info: &mut ConflictInfo, local: &Schema, remote: &Schema) {
        let local_names: HashSet<&str> = local.entities.iter().map(|e| e.name.as_str()).collect();
        let remote_names: HashSet<&str> = remote.entities.iter().map(|e| e.name.as_str()).collect();

        // Keep document order for stable messages
        let only_local: Vec<&str> =
            local.entity_names().into_iter().filter(|n| !remote_names.contains(n)).collect();
        let only_remote: Vec<&str> =
            remote.entity_names().into_iter().filter(|n| !local_names.contains(n)).collect();
        let shared: Vec<&str> =
            local.entity_names().into_iter().filter(|n| remote_names.contains(n)).collect();

        info.severity = if !only_local.is_empty() || !only_remote.is_empty() {
            Severity::High
        } else if !shared.is_empty() {
            Severity::Medium
        } else {
            Severity::Low
        };

        let mut parts = Vec::new();
        if !only_local.is_empty() {
            parts.push(format!(
                "Local has {} additional {}: {}",
                only_local.len(),
                entity_noun(only_local.len()),
                only_local.join(", ")
            ));
        }
        if !only_remote.is_empty() {
            parts.push(format!(
                "Remote has {} additional {}: {}",
                only_remote.len(),
                entity_noun(only_remote.len()),
                only_remote.join(", ")
            ));
        }
        if !shared.is_empty() {
            parts.push(format!(
                "{} shared {} may have field-level differences: {}",
                shared.len(),
                entity_noun(shared.len()),
                shared.join(", ")
            ));
        }

        info.message = if parts.is_empty() {
            "Schemas differ in root-level settings only".to_string()
        } else {
            parts.join("; ")
        };

        let affected: Vec<String> = only_local
            .iter()
            .chain(only_remote.iter())
            .chain(shared.iter())
            .map(|n| n.to_string())
            .collect();
        info.affected_entities = Some(affected);
    }
}

fn entity_noun(count: usize) -> &'static str {
    if count == 1 {
        "entity"
    } else {
        "entities"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Entity, Field, FieldType};

    fn schema_with(names: &[&str]) -> Schema {
        Schema {
            entities: names
                .iter()
                .map(|n| Entity::new(*n).with_field(Field::new("id", FieldType::Uuid)))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn fresh_sync_is_not_a_conflict() {
        let info = ConflictDetector::detect(None, None, None, None);
        assert_eq!(info.state, SyncState::NoConflict);
        assert_eq!(info.severity, Severity::None);
        assert!(!info.has_conflict());
    }

    #[test]
    fn one_sided_changes() {
        let info = ConflictDetector::detect(None, Some("sha256:aa"), None, None);
        assert_eq!(info.state, SyncState::RemoteChanged);
        assert_eq!(info.severity, Severity::Medium);

        let info = ConflictDetector::detect(Some("sha256:aa"), None, None, None);
        assert_eq!(info.state, SyncState::LocalChanged);
        assert_eq!(info.severity, Severity::Medium);
        assert!(!info.needs_resolution());
    }

    #[test]
    fn equal_hashes_are_in_sync_even_with_documents() {
        let schema = schema_with(&["User"]);
        let h = schema.fingerprint();
        let info = ConflictDetector::detect(Some(&h), Some(&h), Some(&schema), Some(&schema));
        assert_eq!(info.state, SyncState::NoConflict);
        assert_eq!(info.affected_entities, None);
    }

    #[test]
    fn differing_hashes_without_documents_diverge_high() {
        let info = ConflictDetector::detect(Some("sha256:aa"), Some("sha256:bb"), None, None);
        assert_eq!(info.state, SyncState::Diverged);
        assert_eq!(info.severity, Severity::High);
        assert!(info.needs_resolution());
        assert!(info.affected_entities.is_none());
    }

    #[test]
    fn structural_divergence_lists_affected_entities() {
        let local = schema_with(&["User", "Post"]);
        let remote = schema_with(&["User", "Comment"]);
        let info = ConflictDetector::detect(
            Some(&local.fingerprint()),
            Some(&remote.fingerprint()),
            Some(&local),
            Some(&remote),
        );

        assert_eq!(info.state, SyncState::Diverged);
        assert_eq!(info.severity, Severity::High);
        let affected = info.affected_entities.clone().unwrap();
        assert!(affected.contains(&"Post".to_string()));
        assert!(affected.contains(&"Comment".to_string()));
        assert!(affected.contains(&"User".to_string()));
        assert!(info.message.contains("Local has 1 additional entity: Post"));
        assert!(info.message.contains("Remote has 1 additional entity: Comment"));
    }

    #[test]
    fn shared_only_divergence_is_medium() {
        let local = schema_with(&["User", "Post"]);
        let mut remote = schema_with(&["Post", "User"]);
        remote.entities[0].fields[0].nullable = true;

        let info = ConflictDetector::detect(
            Some(&local.fingerprint()),
            Some(&remote.fingerprint()),
            Some(&local),
            Some(&remote),
        );
        assert_eq!(info.severity, Severity::Medium);
        assert!(info.message.starts_with("2 shared entities"));
    }

    #[test]
    fn empty_documents_with_different_roots_are_low() {
        let local = Schema { version: Some("1".into()), ..Default::default() };
        let remote = Schema { version: Some("2".into()), ..Default::default() };
        let info = ConflictDetector::detect(
            Some(&local.fingerprint()),
            Some(&remote.fingerprint()),
            Some(&local),
            Some(&remote),
        );
        assert_eq!(info.state, SyncState::Diverged);
        assert_eq!(info.severity, Severity::Low);
        assert_eq!(info.affected_entities, Some(vec![]));
    }

    #[test]
    fn serializes_with_wire_tags() {
        let info = ConflictDetector::detect(Some("a"), Some("b"), None, None);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["state"], "DIVERGED");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["localHash"], "a");
    }
}
