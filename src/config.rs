use clap::ValueEnum;
use serde::Deserialize;

/// Default ceiling on composite nesting while expanding a type graph.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 64;

/// Hard ceiling on tree depth; larger requests are clamped to it.
///
/// Expansion, traversal and drop all recurse once per composite level.
pub const MAX_TREE_DEPTH: usize = 128;

/// Default nesting limit for the text entry point.
pub const DEFAULT_JSON_DEPTH: usize = 512;

/// Hard ceiling on decoded nesting; larger requests are clamped to it.
///
/// Parsing runs on a growable stack, but cloning, formatting and dropping a
/// `serde_json::Value` still recurse once per level.
pub const MAX_JSON_DEPTH: usize = 1024;

/// How union and intersection nodes pick their result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchPolicy {
    /// Evaluate every alternative against the same value and keep the first result.
    #[default]
    FirstBranch,
    /// Evaluate only the first alternative whose type matches the value.
    FirstMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_tree_depth: usize,
    pub branch_policy: BranchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            branch_policy: BranchPolicy::default(),
        }
    }
}
