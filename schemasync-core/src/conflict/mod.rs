//! Conflict detection and resolution
//!
//! - [`detector`]: classify the sync state from two fingerprints
//! - [`resolver`]: enumerate structural differences and merge two documents
//! - [`prompt`]: interactive [`DecisionProvider`] over stdin/stdout

pub mod detector;
pub mod prompt;
pub mod resolver;

pub use detector::{ConflictDetector, ConflictInfo, Severity, SyncState};
pub use prompt::PromptDecider;
pub use resolver::{
    ConflictKind, ConflictResolver, DecisionProvider, EntityConflict, EntityResolution,
    FieldChange, FieldChoice, FieldConflict, FieldResolution, ResolutionChoice, ResolutionResult,
    ResolutionStrategy, ResolveError, StrategyDecider,
};
