//! The slice of the native engine binding that outline code depends on.
//!
//! Implementations wrap a live session (or a fixture in tests). Every failure inside the binding is
//! reported as a [`NativeError`] carrying the engine's own message.

use crate::model::{Consolidation, DimensionInfo, ShareOption};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("native call failed: {message}")]
pub struct NativeError {
    pub message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type NativeResult<T> = Result<T, NativeError>;

/// One member as reported by a descendants-of-root traversal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberRecord {
    pub name: String,
    pub unique_name: Option<String>,
    /// Alias table name → alias.
    pub aliases: BTreeMap<String, String>,
    pub parent: Option<String>,
    pub share_option: ShareOption,
    pub consolidation: Consolidation,
    pub generation: u32,
    pub level: u32,
    pub formula: Option<String>,
    pub udas: Vec<String>,
}

impl MemberRecord {
    pub fn new(name: impl Into<String>, parent: Option<&str>, generation: u32, level: u32) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            generation,
            level,
            ..Self::default()
        }
    }

    pub fn shared(mut self) -> Self {
        self.share_option = ShareOption::Shared;
        self
    }

    pub fn with_share_option(mut self, share_option: ShareOption) -> Self {
        self.share_option = share_option;
        self
    }

    pub fn with_consolidation(mut self, consolidation: Consolidation) -> Self {
        self.consolidation = consolidation;
        self
    }

    pub fn with_alias(mut self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.aliases.insert(table.into(), alias.into());
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_uda(mut self, uda: impl Into<String>) -> Self {
        self.udas.push(uda.into());
        self
    }
}

/// One row returned by a native member-selection query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberQueryRow {
    pub name: String,
    pub parent: Option<String>,
    pub dimension: String,
}

/// Metadata capabilities of a native cube session.
pub trait MemberSource {
    /// Dimensions of the cube in outline order.
    fn dimensions(&self) -> NativeResult<Vec<DimensionInfo>>;

    /// Every member below (and including) `root`, in whatever order the engine yields them.
    fn traverse_descendants(&self, root: &str) -> NativeResult<Vec<MemberRecord>>;

    /// Run an engine-native member selection (e.g. `@IDESCENDANTS("Market")`).
    fn execute_member_query(&self, dimension: &str, spec: &str)
        -> NativeResult<Vec<MemberQueryRow>>;

    fn resolve_substitution_variable(&self, name: &str) -> NativeResult<String>;
}
