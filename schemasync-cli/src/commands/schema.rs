//! Offline commands over schema files

use anyhow::{Context, Result};
use schemasync_core::conflict::{
    ConflictKind, ConflictResolver, DecisionProvider, EntityConflict, PromptDecider,
    ResolutionResult, ResolutionStrategy, StrategyDecider,
};
use schemasync_core::schema::Schema;
use std::fmt::Write as _;
use std::io::{self, BufReader};
use std::path::Path;

fn load(path: &Path) -> Result<Schema> {
    Schema::load(path).with_context(|| format!("Failed to load schema {}", path.display()))
}

pub fn hash(file: &Path) -> Result<()> {
    println!("{}", load(file)?.fingerprint());
    Ok(())
}

pub fn diff(local: &Path, remote: &Path) -> Result<()> {
    let conflicts = ConflictResolver::detect_all_conflicts(&load(local)?, &load(remote)?);
    print!("{}", render_conflicts(&conflicts));
    Ok(())
}

/// Merge two files; prompts go to stderr so stdout can carry the document
pub fn resolve(
    local: &Path,
    remote: &Path,
    strategy: Option<ResolutionStrategy>,
    output: Option<&Path>,
) -> Result<()> {
    let result = match strategy {
        Some(strategy) => merge_files(local, remote, &mut StrategyDecider::new(strategy))?,
        None => {
            let mut decider = PromptDecider::new(BufReader::new(io::stdin()), io::stderr());
            merge_files(local, remote, &mut decider)?
        }
    };

    result.schema.validate().context("Merged schema is not valid; nothing was written")?;
    log::debug!(
        "Merged {} and {} into {}",
        local.display(),
        remote.display(),
        result.schema.fingerprint()
    );

    match output {
        Some(path) => {
            result
                .schema
                .save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Resolved {} conflict(s), wrote {} ({})",
                result.resolutions.len(),
                path.display(),
                result.schema.fingerprint()
            );
        }
        None => println!("{}", serde_json::to_string_pretty(&result.schema)?),
    }
    Ok(())
}

pub fn merge_files(
    local: &Path,
    remote: &Path,
    decider: &mut dyn DecisionProvider,
) -> Result<ResolutionResult> {
    let local = load(local)?;
    let remote = load(remote)?;
    Ok(ConflictResolver::resolve(&local, &remote, decider)?)
}

pub fn render_conflicts(conflicts: &[EntityConflict]) -> String {
    if conflicts.is_empty() {
        return "No differences\n".to_string();
    }

    let mut out = String::new();
    for conflict in conflicts {
        let marker = match conflict.kind {
            ConflictKind::Added => '+',
            ConflictKind::Removed => '-',
            ConflictKind::Changed => '~',
        };
        let _ = writeln!(out, "{} {} ({})", marker, conflict.entity, conflict.kind);
        for field in &conflict.field_conflicts {
            let _ = writeln!(out, "    {} {}", field.kind, field.summary());
        }
        for attribute in &conflict.metadata_changes {
            let _ = writeln!(out, "    metadata {:?}", attribute);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_core::schema::{Entity, Field, FieldType, RelationKind, Relationship};

    fn write(dir: &Path, name: &str, schema: &Schema) -> std::path::PathBuf {
        let path = dir.join(name);
        schema.save(&path).unwrap();
        path
    }

    fn pair(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let local = Schema::default()
            .with_entity(Entity::new("User").with_field(Field::new("email", FieldType::Text)))
            .with_entity(Entity::new("Post"));
        let remote = Schema::default()
            .with_entity(Entity::new("User").with_field(Field::new("email", FieldType::String)));
        (write(dir, "local.json", &local), write(dir, "remote.json", &remote))
    }

    #[test]
    fn renders_each_conflict_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let (local, remote) = pair(tmp.path());
        let conflicts = ConflictResolver::detect_all_conflicts(
            &Schema::load(&local).unwrap(),
            &Schema::load(&remote).unwrap(),
        );

        let text = render_conflicts(&conflicts);
        assert!(text.contains("~ User (changed)"));
        assert!(text.contains("changed email (type: local text vs remote string)"));
        assert!(text.contains("+ Post (added)"));
        assert_eq!(render_conflicts(&[]), "No differences\n");
    }

    #[test]
    fn strategy_resolve_writes_output() {
        let tmp = tempfile::tempdir().unwrap();
        let (local, remote) = pair(tmp.path());
        let out = tmp.path().join("merged.json");

        resolve(&local, &remote, Some(ResolutionStrategy::RemoteWins), Some(&out)).unwrap();

        let merged = Schema::load(&out).unwrap();
        assert_eq!(merged.entity_names(), vec!["User"]);
        assert_eq!(
            merged.entity("User").unwrap().field("email").unwrap().field_type,
            FieldType::String
        );
        assert_eq!(merged.root_folder.as_deref(), Some("src"));
    }

    #[test]
    fn invalid_merge_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let (local, remote) = pair(tmp.path());
        let mut dangling = Schema::load(&local).unwrap();
        dangling.relationships.push(Relationship::new("Post", "Ghost", RelationKind::ManyToOne));
        dangling.save(&local).unwrap();
        let out = tmp.path().join("merged.json");

        let err =
            resolve(&local, &remote, Some(ResolutionStrategy::Merge), Some(&out)).unwrap_err();
        assert!(format!("{:#}", err).contains("Ghost"));
        assert!(!out.exists());
    }

    #[test]
    fn duplicate_entities_are_not_merged() {
        let tmp = tempfile::tempdir().unwrap();
        let (local, remote) = pair(tmp.path());
        let doubled = Schema::load(&local).unwrap().with_entity(Entity::new("Post"));
        doubled.save(&local).unwrap();

        let err = merge_files(&local, &remote, &mut StrategyDecider::new(ResolutionStrategy::Merge))
            .unwrap_err();
        assert!(err.to_string().contains("'Post' more than once"));
    }

    #[test]
    fn missing_file_names_path() {
        let tmp = tempfile::tempdir().unwrap();
        let err = hash(&tmp.path().join("nope.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("nope.json"));
    }
}
