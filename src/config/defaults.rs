//! Built-in tool defaults
//!
//! Hardcoded defaults for the tool's own `PreBuilder` section. They are
//! applied after layering and only fill gaps.

use prebuild_tree::ValueTree;
use serde::{Deserialize, Serialize};

use super::merge::fill_missing;

/// Top-level section holding the tool's own settings.
pub const TOOL_SECTION: &str = "PreBuilder";

/// A log destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTarget {
    /// File the log is written to
    pub path: String,

    /// Append to an existing file instead of truncating it
    pub append: bool,
}

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Info log (default: /tmp/PreBuilder-stdout.log, truncate)
    pub stdout_log: LogTarget,

    /// Error log (default: /tmp/PreBuilder-stderr.log, truncate)
    pub stderr_log: LogTarget,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            stdout_log: LogTarget {
                path: "/tmp/PreBuilder-stdout.log".to_string(),
                append: false,
            },
            stderr_log: LogTarget {
                path: "/tmp/PreBuilder-stderr.log".to_string(),
                append: false,
            },
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a tree for merging
    pub fn to_value(&self) -> ValueTree {
        ValueTree::from(serde_json::json!({
            TOOL_SECTION: {
                "logs": {
                    "stdout": {
                        "path": self.stdout_log.path,
                        "append": self.stdout_log.append
                    },
                    "stderr": {
                        "path": self.stderr_log.path,
                        "append": self.stderr_log.append
                    }
                }
            }
        }))
    }

    /// Fill the missing leaves of the tool section. Values already present
    /// are left alone.
    pub fn supply(&self, tree: ValueTree) -> ValueTree {
        fill_missing(tree, self.to_value())
    }
}
