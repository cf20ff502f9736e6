//! Parser options.
//!
//! Every field has a default, so a JSON or YAML document only needs the keys it changes.

use serde::{Deserialize, Serialize};

use crate::diagnostics::QuillError;
use crate::err_msg;

/// Nesting limit for blocks and expressions when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Deepest allowed block nesting, and separately expression nesting. Exceeding either is
    /// a structural error.
    pub max_depth: usize,
    /// Whether `name = value` may declare `name` when it is not yet declared.
    pub implicit_declarations: bool,
    /// Default loop variable names by loop nesting depth.
    pub loop_variable_names: Vec<String>,
    /// Whether to run the single-token follow check after each statement's lead token.
    pub legacy_token_checks: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            implicit_declarations: true,
            loop_variable_names: ["i", "j", "k", "l"].map(String::from).to_vec(),
            legacy_token_checks: true,
        }
    }
}

impl ParserOptions {
    pub fn from_json(text: &str) -> Result<Self, QuillError> {
        serde_json::from_str(text).map_err(|e| err_msg!(Internal, "invalid parser options: {}", e))
    }

    pub fn from_yaml(text: &str) -> Result<Self, QuillError> {
        serde_yaml::from_str(text).map_err(|e| err_msg!(Internal, "invalid parser options: {}", e))
    }

    /// Default loop variable for a loop nested `depth` loops deep: the configured names
    /// first, then `i4`, `i5`, ... past the end of the list.
    pub fn loop_variable(&self, depth: usize) -> String {
        self.loop_variable_names
            .get(depth)
            .cloned()
            .unwrap_or_else(|| format!("i{}", depth))
    }
}
