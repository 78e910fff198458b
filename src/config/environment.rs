//! Process environment capture and export.
//!
//! The loader snapshots the environment into the tree under
//! [`ENVIRONMENT_KEY`]. [`export_environment`] goes the other way and
//! produces the variables handed to build hooks: the captured environment
//! plus every configuration value flattened into `SECTION_KEY_LEAF` names.

use std::collections::BTreeMap;

use prebuild_tree::{Mapping, ValueTree};

/// Top-level key holding the captured environment.
pub const ENVIRONMENT_KEY: &str = "environment";

/// Source of environment variables.
///
/// Lets the loader run against a fixed environment in tests.
pub trait EnvironmentProvider {
    /// All variables as name/value pairs.
    fn vars(&self) -> Box<dyn Iterator<Item = (String, String)> + '_>;
}

/// Reads the real process environment. Variables whose name or value is
/// not valid UTF-8 are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentProvider for ProcessEnvironment {
    fn vars(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(std::env::vars_os().filter_map(|(name, value)| {
            Some((name.into_string().ok()?, value.into_string().ok()?))
        }))
    }
}

/// Fixed environment backed by a map.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    vars: BTreeMap<String, String>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn vars(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

/// Snapshot an environment as a mapping of string leaves, sorted by name.
pub fn environment_tree(provider: &dyn EnvironmentProvider) -> ValueTree {
    let sorted: BTreeMap<String, String> = provider.vars().collect();
    ValueTree::Mapping(
        sorted
            .into_iter()
            .map(|(name, value)| (name, ValueTree::String(value)))
            .collect::<Mapping>(),
    )
}

/// Build the variable set for build hooks.
///
/// Starts from the captured environment, then adds every other top-level
/// value flattened with `_`-joined key prefixes. Configuration-derived
/// names win over inherited ones.
pub fn export_environment(tree: &ValueTree) -> BTreeMap<String, String> {
    let mut exported = BTreeMap::new();
    let Some(root) = tree.as_mapping() else {
        return exported;
    };

    if let Some(captured) = root.get(ENVIRONMENT_KEY).and_then(|v| v.as_mapping()) {
        for (name, value) in captured {
            exported.insert(name.clone(), scalar_text(value));
        }
    }

    for (key, value) in root {
        if key == ENVIRONMENT_KEY {
            continue;
        }
        flatten_into(key.clone(), value, &mut exported);
    }

    exported
}

fn flatten_into(name: String, value: &ValueTree, out: &mut BTreeMap<String, String>) {
    match value {
        ValueTree::Mapping(map) => {
            for (key, child) in map {
                flatten_into(format!("{}_{}", name, key), child, out);
            }
        }
        other => {
            out.insert(name, scalar_text(other));
        }
    }
}

/// Text form of a leaf. Sequences and mappings render as compact JSON.
fn scalar_text(value: &ValueTree) -> String {
    match value {
        ValueTree::Null => String::new(),
        ValueTree::Bool(b) => b.to_string(),
        ValueTree::Number(n) => n.to_string(),
        ValueTree::String(s) => s.clone(),
        other => other.to_string(),
    }
}
