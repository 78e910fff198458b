//! Rewriting profile paths into UUIDs

use std::path::Path;

use prebuild_tree::{Keypath, KeypathError, ValueTree};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::is_canonical_identifier;
use super::resolver::IdentifierResolver;
use crate::config::{targets, CONFIGURATIONS_KEY, TARGETS_KEY, TOOL_SECTION};

/// Field of a configuration record naming its provisioning profile.
pub const PROFILE_KEY: &str = "Provisioning_Profile";

/// What a normalization pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Records carrying a string profile field
    pub checked: usize,
    /// Fields replaced by a resolved UUID
    pub rewritten: usize,
    /// Fields left as they were because no UUID could be resolved
    pub unresolved: usize,
}

/// Validates and rewrites `PreBuilder.Targets.*.Configurations.*.Provisioning_Profile`.
#[derive(Debug, Clone)]
pub struct Normalizer<R> {
    resolver: R,
}

impl<R: IdentifierResolver> Normalizer<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// Return a copy of `tree` in which every profile field is a UUID where
    /// one could be resolved.
    ///
    /// Fields that already hold a UUID, or that are missing or not strings,
    /// are left alone. An unresolvable path is not an error here; callers
    /// decide from the report whether that is fatal.
    pub fn normalize(&self, tree: &ValueTree) -> Result<(ValueTree, NormalizeReport), KeypathError> {
        let mut output = tree.clone();
        let mut report = NormalizeReport::default();

        for (target, configuration) in targets(tree) {
            let keypath = Keypath::key(TOOL_SECTION)
                .child(TARGETS_KEY)
                .child(target.as_str())
                .child(CONFIGURATIONS_KEY)
                .child(configuration.as_str())
                .child(PROFILE_KEY);

            let Some(current) = tree.get(&keypath).and_then(|v| v.as_str()) else {
                continue;
            };
            report.checked += 1;

            if is_canonical_identifier(current) {
                continue;
            }

            match self.resolver.resolve(Path::new(current)) {
                Some(uuid) if is_canonical_identifier(&uuid) => {
                    debug!(%target, %configuration, profile = %current, %uuid, "resolved provisioning profile");
                    output = output.with(&keypath, ValueTree::String(uuid))?;
                    report.rewritten += 1;
                }
                Some(found) => {
                    warn!(%target, %configuration, profile = %current, %found, "provisioning profile carries a malformed UUID");
                    report.unresolved += 1;
                }
                None => {
                    warn!(%target, %configuration, profile = %current, "could not resolve provisioning profile");
                    report.unresolved += 1;
                }
            }
        }

        info!(
            checked = report.checked,
            rewritten = report.rewritten,
            unresolved = report.unresolved,
            "normalized provisioning profiles"
        );
        Ok((output, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::PathBuf;

    const UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[derive(Default)]
    struct TableResolver {
        table: HashMap<PathBuf, String>,
    }

    impl TableResolver {
        fn with(mut self, path: &str, uuid: &str) -> Self {
            self.table.insert(PathBuf::from(path), uuid.to_string());
            self
        }
    }

    impl IdentifierResolver for TableResolver {
        fn resolve(&self, path: &Path) -> Option<String> {
            self.table.get(path).cloned()
        }
    }

    fn profile_at(tree: &ValueTree, target: &str, configuration: &str) -> Option<String> {
        let keypath = Keypath::key("PreBuilder")
            .child("Targets")
            .child(target)
            .child("Configurations")
            .child(configuration)
            .child("Provisioning_Profile");
        tree.get(&keypath).and_then(|v| v.as_str()).map(str::to_string)
    }

    #[test]
    fn test_path_is_resolved() {
        let tree = ValueTree::from(json!({
            "PreBuilder": {"Targets": {"App": {"Configurations": {
                "Release": {"Provisioning_Profile": "profiles/App_Release.mobileprovision"}
            }}}}
        }));
        let normalizer =
            Normalizer::new(TableResolver::default().with("profiles/App_Release.mobileprovision", UUID));

        let (normalized, report) = normalizer.normalize(&tree).unwrap();

        let profile = profile_at(&normalized, "App", "Release").unwrap();
        assert!(is_canonical_identifier(&profile));
        assert_eq!(profile, UUID);
        assert_eq!(
            report,
            NormalizeReport {
                checked: 1,
                rewritten: 1,
                unresolved: 0
            }
        );
        // The input is untouched
        assert_eq!(
            profile_at(&tree, "App", "Release").as_deref(),
            Some("profiles/App_Release.mobileprovision")
        );
    }

    #[test]
    fn test_valid_tree_unchanged() {
        let tree = ValueTree::from(json!({
            "BRAND_NAME": "Acme",
            "PreBuilder": {"Targets": {
                "App": {"Configurations": {
                    "Debug": {"Provisioning_Profile": UUID, "Bundle_Identifier": "com.acme.app"},
                    "Release": {"Provisioning_Profile": UUID.to_uppercase()}
                }}
            }}
        }));
        // A resolver that would turn anything into something else
        let normalizer = Normalizer::new(TableResolver::default().with(UUID, "11111111-2222-3333-4444-555555555555"));

        let (normalized, report) = normalizer.normalize(&tree).unwrap();

        assert_eq!(normalized.to_string(), tree.to_string());
        assert_eq!(report.checked, 2);
        assert_eq!(report.rewritten, 0);
    }

    #[test]
    fn test_unresolvable_left_untouched() {
        let tree = ValueTree::from(json!({
            "PreBuilder": {"Targets": {"App": {"Configurations": {
                "Release": {"Provisioning_Profile": "missing.mobileprovision"},
                "Beta": {"Provisioning_Profile": "bad.mobileprovision"}
            }}}}
        }));
        let normalizer = Normalizer::new(TableResolver::default().with("bad.mobileprovision", "not-a-uuid"));

        let (normalized, report) = normalizer.normalize(&tree).unwrap();

        assert_eq!(normalized, tree);
        assert_eq!(report.unresolved, 2);
        assert_eq!(report.rewritten, 0);
    }

    #[test]
    fn test_skips_missing_and_non_string_fields() {
        let tree = ValueTree::from(json!({
            "PreBuilder": {"Targets": {"App": {"Configurations": {
                "Debug": {"Bundle_Identifier": "com.acme.app"},
                "Release": {"Provisioning_Profile": 42}
            }}}}
        }));
        let (normalized, report) = Normalizer::new(TableResolver::default()).normalize(&tree).unwrap();

        assert_eq!(normalized, tree);
        assert_eq!(report, NormalizeReport::default());
    }

    #[test]
    fn test_names_with_dots() {
        let tree = ValueTree::from(json!({
            "PreBuilder": {"Targets": {"com.acme.widget": {"Configurations": {
                "Release:Store": {"Provisioning_Profile": "widget.mobileprovision"}
            }}}}
        }));
        let normalizer = Normalizer::new(TableResolver::default().with("widget.mobileprovision", UUID));

        let (normalized, _) = normalizer.normalize(&tree).unwrap();

        assert_eq!(
            profile_at(&normalized, "com.acme.widget", "Release:Store").as_deref(),
            Some(UUID)
        );
        let targets = normalized
            .get(&Keypath::key("PreBuilder").child("Targets"))
            .and_then(|v| v.as_mapping())
            .unwrap();
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn test_no_targets() {
        let tree = ValueTree::from(json!({"PreBuilder": {"logs": {}}}));
        let (normalized, report) = Normalizer::new(TableResolver::default()).normalize(&tree).unwrap();
        assert_eq!(normalized, tree);
        assert_eq!(report.checked, 0);
    }
}
