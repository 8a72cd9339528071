//! Relationship definitions between schema entities
//!
//! A relationship is a directed edge `from -> to` between two entities of the
//! same schema. Identity for merging and hashing purposes is the triple
//! `(from, to, type)`; naming and nullability are attributes of that edge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported relationship cardinalities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// One-to-Many (the `from` side owns a collection of `to`)
    OneToMany,
    /// Many-to-One (foreign key on the `from` side)
    ManyToOne,
    /// Many-to-Many (through a join table)
    ManyToMany,
    /// One-to-One (unique foreign key)
    OneToOne,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::OneToMany => "OneToMany",
            RelationKind::ManyToOne => "ManyToOne",
            RelationKind::ManyToMany => "ManyToMany",
            RelationKind::OneToOne => "OneToOne",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed relationship between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Source entity name
    pub from: String,
    /// Target entity name
    pub to: String,
    /// Cardinality
    #[serde(rename = "type")]
    pub kind: RelationKind,
    /// Override for the generated relation name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidirectional: Option<bool>,
    /// Join table name (ManyToMany only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_table: Option<String>,
}

impl Relationship {
    /// Create a plain relationship with no overrides
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            name: None,
            nullable: None,
            bidirectional: None,
            join_table: None,
        }
    }

    /// Identity key used for de-duplication and ordering
    pub fn key(&self) -> (&str, &str, RelationKind) {
        (&self.from, &self.to, self.kind)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.from, self.to, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_uses_type_key_on_the_wire() {
        let rel = Relationship::new("User", "Post", RelationKind::OneToMany);
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "OneToMany");
        assert!(json.get("joinTable").is_none());

        let parsed: Relationship = serde_json::from_str(
            r#"{"from":"Post","to":"Tag","type":"ManyToMany","joinTable":"post_tags"}"#,
        )
        .unwrap();
        assert_eq!(parsed.kind, RelationKind::ManyToMany);
        assert_eq!(parsed.join_table.as_deref(), Some("post_tags"));
    }

    #[test]
    fn display_includes_kind() {
        let rel = Relationship::new("Post", "User", RelationKind::ManyToOne);
        assert_eq!(rel.to_string(), "Post -> User (ManyToOne)");
    }
}
