//! Typed views over the `PreBuilder` section

use prebuild_tree::{Keypath, ValueTree};

use super::defaults::{LogTarget, TOOL_SECTION};

/// Key under the tool section holding per-target settings.
pub const TARGETS_KEY: &str = "Targets";

/// Key under each target holding per-configuration settings.
pub const CONFIGURATIONS_KEY: &str = "Configurations";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Required setting '{0}' is missing or not a string")]
    MissingSetting(String),
}

/// Where the tool writes its own logs.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub stdout: LogTarget,
    pub stderr: LogTarget,
}

impl LogSettings {
    /// Read `PreBuilder.logs.{stdout,stderr}` from a resolved tree.
    ///
    /// `path` is required. A missing or non-boolean `append` means truncate.
    pub fn from_config(tree: &ValueTree) -> Result<Self, SettingsError> {
        Ok(Self {
            stdout: log_target(tree, "stdout")?,
            stderr: log_target(tree, "stderr")?,
        })
    }
}

fn log_target(tree: &ValueTree, stream: &str) -> Result<LogTarget, SettingsError> {
    let base = Keypath::key(TOOL_SECTION).child("logs").child(stream);
    let path_key = base.clone().child("path");

    let path = tree
        .get(&path_key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| SettingsError::MissingSetting(path_key.to_string()))?;
    let append = tree
        .get(&base.child("append"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    Ok(LogTarget {
        path: path.to_string(),
        append,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Pre,
    Post,
}

impl HookStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::Pre => "Pre",
            HookStage::Post => "Post",
        }
    }
}

/// An external command configured to run around a build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCommand {
    pub path: String,
    pub arguments: Vec<String>,
}

impl HookCommand {
    /// Read `PreBuilder.<area>.<Pre|Post>-hook`.
    ///
    /// Both `path` (a string) and `arguments` (a sequence of strings) must
    /// be present, otherwise there is no hook.
    pub fn lookup(tree: &ValueTree, area: &str, stage: HookStage) -> Option<Self> {
        let base = Keypath::key(TOOL_SECTION)
            .child(area)
            .child(format!("{}-hook", stage.as_str()));

        let path = tree.get(&base.clone().child("path"))?.as_str()?;
        let arguments = tree
            .get(&base.child("arguments"))?
            .as_sequence()?
            .iter()
            .map(|arg| arg.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            path: path.to_string(),
            arguments,
        })
    }
}

/// `(target, configuration)` name pairs under
/// `PreBuilder.Targets.*.Configurations.*`, in document order.
///
/// Targets without a `Configurations` mapping contribute nothing.
pub fn targets(tree: &ValueTree) -> Vec<(String, String)> {
    let Some(targets) = tree
        .get(&Keypath::key(TOOL_SECTION).child(TARGETS_KEY))
        .and_then(|v| v.as_mapping())
    else {
        return Vec::new();
    };

    targets
        .iter()
        .filter_map(|(target, settings)| {
            let configurations = settings.as_mapping()?.get(CONFIGURATIONS_KEY)?.as_mapping()?;
            Some(
                configurations
                    .keys()
                    .map(move |configuration| (target.clone(), configuration.clone())),
            )
        })
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_settings_from_defaults() {
        let tree = crate::config::BuiltinDefaults::default().to_value();
        let settings = LogSettings::from_config(&tree).unwrap();
        assert_eq!(settings.stdout.path, "/tmp/PreBuilder-stdout.log");
        assert_eq!(settings.stderr.path, "/tmp/PreBuilder-stderr.log");
        assert!(!settings.stdout.append);
    }

    #[test]
    fn test_log_settings_append_flag() {
        let tree = ValueTree::from(json!({
            "PreBuilder": {"logs": {
                "stdout": {"path": "/var/log/out.log", "append": true},
                "stderr": {"path": "/var/log/err.log", "append": "yes"}
            }}
        }));
        let settings = LogSettings::from_config(&tree).unwrap();
        assert!(settings.stdout.append);
        // Only a real boolean turns appending on
        assert!(!settings.stderr.append);
    }

    #[test]
    fn test_log_settings_missing_path() {
        let tree = ValueTree::from(json!({
            "PreBuilder": {"logs": {"stdout": {"path": "/tmp/out.log"}, "stderr": {"append": true}}}
        }));
        assert_eq!(
            LogSettings::from_config(&tree),
            Err(SettingsError::MissingSetting(
                "PreBuilder.logs.stderr.path".to_string()
            ))
        );
    }

    #[test]
    fn test_hook_lookup() {
        let tree = ValueTree::from(json!({
            "PreBuilder": {"Assets": {
                "Pre-hook": {"path": "/usr/local/bin/fetch", "arguments": ["--all", "-q"]},
                "Post-hook": {"path": "/usr/local/bin/check"}
            }}
        }));

        assert_eq!(
            HookCommand::lookup(&tree, "Assets", HookStage::Pre),
            Some(HookCommand {
                path: "/usr/local/bin/fetch".to_string(),
                arguments: vec!["--all".to_string(), "-q".to_string()],
            })
        );
        assert_eq!(HookCommand::lookup(&tree, "Assets", HookStage::Post), None);
        assert_eq!(HookCommand::lookup(&tree, "Clean", HookStage::Pre), None);
    }

    #[test]
    fn test_hook_rejects_non_string_arguments() {
        let tree = ValueTree::from(json!({
            "PreBuilder": {"Clean": {"Pre-hook": {"path": "/bin/rm", "arguments": ["-rf", 3]}}}
        }));
        assert_eq!(HookCommand::lookup(&tree, "Clean", HookStage::Pre), None);
    }

    #[test]
    fn test_targets_in_document_order() {
        let tree = ValueTree::from(json!({
            "PreBuilder": {"Targets": {
                "App": {"Configurations": {"Release": {}, "Debug": {}}},
                "Widget": {"Configurations": {"Release": {}}},
                "Broken": {"Configurations": "none"},
                "Bare": {}
            }}
        }));

        assert_eq!(
            targets(&tree),
            vec![
                ("App".to_string(), "Release".to_string()),
                ("App".to_string(), "Debug".to_string()),
                ("Widget".to_string(), "Release".to_string()),
            ]
        );
    }

    #[test]
    fn test_targets_absent() {
        assert!(targets(&ValueTree::from(json!({"PreBuilder": {}}))).is_empty());
        assert!(targets(&ValueTree::from(json!({"PreBuilder": {"Targets": []}}))).is_empty());
    }
}
