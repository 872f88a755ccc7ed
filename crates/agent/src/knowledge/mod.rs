//! Knowledge selection: which slice of the static catalog goes into the
//! system prompt for this turn.
//!
//! The catalog is loaded once at startup and never mutated. Selection is a
//! pure function of the recent user text.

pub mod catalog;
pub mod selector;

pub use catalog::{CATALOG_VERSION, KnowledgeCatalog, KnowledgeError, KnowledgeFragment};
pub use selector::{KnowledgeSelector, MAX_SELECTED, ScoredFragment, Selection, keyword_weight};
