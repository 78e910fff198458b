//! Configuration loading with provenance
//!
//! Reads the configuration sources, layers them, injects the process
//! environment and the fallback source, flattens the `config` namespace and
//! supplies built-in defaults. The resulting tree has no memory of which
//! layer contributed what; provenance is kept alongside it.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use prebuild_tree::{KeypathError, Mapping, ValueTree};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::defaults::{BuiltinDefaults, TOOL_SECTION};
use super::environment::{
    environment_tree, export_environment, EnvironmentProvider, ProcessEnvironment,
    ENVIRONMENT_KEY,
};
use super::merge::{fill_missing, merge_layers};
use crate::profile::{IdentifierResolver, NormalizeReport, Normalizer};

/// Namespace whose entries are promoted to the root after layering.
pub const CONFIG_NAMESPACE: &str = "config";

/// Role a source played in the layering
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    /// First of several sources; lowest precedence among them
    Default,
    /// Any source layered on top of the default (or the only source)
    Override,
    /// Merged underneath everything else
    Fallback,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Role of this source
    pub origin: ConfigOrigin,

    /// File path as given
    pub path: String,

    /// SHA-256 digest of raw file bytes
    pub digest: String,
}

/// Serialization of a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Toml,
}

impl SourceFormat {
    /// `.toml` files are TOML, everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => SourceFormat::Toml,
            _ => SourceFormat::Json,
        }
    }
}

/// Reads raw source bytes.
pub trait SourceReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads sources from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{} could not be read: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} could not be parsed: {reason}", .path.display())]
    SourceMalformed { path: PathBuf, reason: String },

    #[error("No configuration sources given")]
    NoSources,
}

/// Parse a source document into its top-level mapping.
pub fn parse_document(
    path: &Path,
    bytes: &[u8],
    format: SourceFormat,
) -> Result<Mapping, ConfigError> {
    let malformed = |reason: String| ConfigError::SourceMalformed {
        path: path.to_path_buf(),
        reason,
    };

    let contents =
        std::str::from_utf8(bytes).map_err(|e| malformed(format!("Invalid UTF-8: {}", e)))?;

    let tree = match format {
        SourceFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(contents)
                .map_err(|e| malformed(format!("JSON parse error: {}", e)))?;
            ValueTree::from(value)
        }
        SourceFormat::Toml => {
            let value: toml::Value = toml::from_str(contents)
                .map_err(|e| malformed(format!("TOML parse error: {}", e)))?;
            toml_to_tree(value)
        }
    };

    match tree {
        ValueTree::Mapping(map) => Ok(map),
        other => Err(malformed(format!(
            "top level must be a mapping, found {}",
            other.type_name()
        ))),
    }
}

/// Convert a TOML value to a tree
fn toml_to_tree(toml: toml::Value) -> ValueTree {
    match toml {
        toml::Value::String(s) => ValueTree::String(s),
        toml::Value::Integer(i) => ValueTree::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(ValueTree::Number)
            .unwrap_or(ValueTree::Null),
        toml::Value::Boolean(b) => ValueTree::Bool(b),
        toml::Value::Datetime(dt) => ValueTree::String(dt.to_string()),
        toml::Value::Array(arr) => ValueTree::Sequence(arr.into_iter().map(toml_to_tree).collect()),
        toml::Value::Table(table) => ValueTree::Mapping(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_tree(v)))
                .collect(),
        ),
    }
}

/// Layer parsed sources into the final tree.
///
/// 1. A single layer is the tree as is; several are folded left to right,
///    later layers winning.
/// 2. The environment snapshot is placed next to the layered config.
/// 3. The `config` namespace is promoted to the root.
/// 4. The fallback, if any, is merged underneath the whole tree, so it only
///    fills gaps, including gaps in the captured environment.
/// 5. Missing tool settings are filled from `defaults`.
pub fn resolve(
    layers: Vec<Mapping>,
    fallback: Option<Mapping>,
    environment: ValueTree,
    defaults: &BuiltinDefaults,
) -> Result<ValueTree, ConfigError> {
    let layer_count = layers.len();
    let accumulated =
        merge_layers(layers.into_iter().map(ValueTree::Mapping).collect()).ok_or(ConfigError::NoSources)?;
    debug!(layers = layer_count, "layered configuration sources");

    let mut staged = Mapping::new();
    staged.insert(CONFIG_NAMESPACE.to_string(), accumulated);
    staged.insert(ENVIRONMENT_KEY.to_string(), environment);

    let flattened = promote_namespace(staged, CONFIG_NAMESPACE);

    let layered = match fallback {
        Some(fallback) => {
            debug!(keys = fallback.len(), "merged fallback configuration underneath");
            fill_missing(flattened, ValueTree::Mapping(fallback))
        }
        None => flattened,
    };

    Ok(defaults.supply(layered))
}

/// Move every entry of `root[namespace]` up to `root` and drop the namespace.
fn promote_namespace(mut root: Mapping, namespace: &str) -> ValueTree {
    match root.shift_remove(namespace) {
        Some(ValueTree::Mapping(entries)) => {
            for (key, value) in entries {
                if root.contains_key(&key) {
                    warn!(key = %key, "configuration key replaces generated top-level entry");
                }
                root.insert(key, value);
            }
        }
        Some(other) => {
            warn!(
                found = other.type_name(),
                "configuration namespace is not a mapping, dropping it"
            );
        }
        None => {}
    }
    ValueTree::Mapping(root)
}

/// The resolved configuration tree plus where it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration
    pub tree: ValueTree,

    /// Contributing sources in precedence order (fallback last)
    pub sources: Vec<ConfigSource>,
}

impl ResolvedConfig {
    /// Get a value by keypath. A malformed keypath is an error; an absent
    /// value is `Ok(None)`.
    pub fn get(&self, path: &str) -> Result<Option<&ValueTree>, KeypathError> {
        self.tree.lookup(path)
    }

    /// Get a value as a string
    pub fn get_str(&self, path: &str) -> Result<Option<&str>, KeypathError> {
        Ok(self.get(path)?.and_then(|v| v.as_str()))
    }

    /// Get a value as a bool
    pub fn get_bool(&self, path: &str) -> Result<Option<bool>, KeypathError> {
        Ok(self.get(path)?.and_then(|v| v.as_bool()))
    }

    /// Pretty-printed JSON of the tree
    pub fn dump(&self) -> Result<String, serde_json::Error> {
        self.tree.to_pretty_json()
    }

    /// The application's own settings: everything except the captured
    /// environment and the tool section.
    pub fn application_settings(&self) -> ValueTree {
        match &self.tree {
            ValueTree::Mapping(map) => ValueTree::Mapping(
                map.iter()
                    .filter(|(key, _)| key.as_str() != ENVIRONMENT_KEY && key.as_str() != TOOL_SECTION)
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Variables for build hooks; see [`export_environment`].
    pub fn exported_environment(&self) -> BTreeMap<String, String> {
        export_environment(&self.tree)
    }

    /// Apply the normalizer, returning the rewritten config.
    pub fn normalize<R: IdentifierResolver>(
        self,
        normalizer: &Normalizer<R>,
    ) -> Result<(Self, NormalizeReport), KeypathError> {
        let (tree, report) = normalizer.normalize(&self.tree)?;
        Ok((Self { tree, ..self }, report))
    }
}

/// Loads configuration sources from a reader and an environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader<R = FsSourceReader, E = ProcessEnvironment> {
    reader: R,
    environment: E,
    defaults: BuiltinDefaults,
}

impl ConfigLoader {
    /// Loader over the file system and the process environment
    pub fn new() -> Self {
        Self::with_collaborators(FsSourceReader, ProcessEnvironment)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: SourceReader, E: EnvironmentProvider> ConfigLoader<R, E> {
    pub fn with_collaborators(reader: R, environment: E) -> Self {
        Self {
            reader,
            environment,
            defaults: BuiltinDefaults::default(),
        }
    }

    /// Replace the built-in defaults
    pub fn with_defaults(mut self, defaults: BuiltinDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Read, parse and resolve `sources` (in increasing precedence) and the
    /// optional `fallback`. Any unreadable or malformed source fails the
    /// whole load.
    pub fn load<P: AsRef<Path>>(
        &self,
        sources: &[P],
        fallback: Option<&Path>,
    ) -> Result<ResolvedConfig, ConfigError> {
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let mut layers = Vec::with_capacity(sources.len());
        let mut provenance = Vec::with_capacity(sources.len() + 1);

        for (position, path) in sources.iter().enumerate() {
            let origin = if position == 0 && sources.len() > 1 {
                ConfigOrigin::Default
            } else {
                ConfigOrigin::Override
            };
            let (layer, source) = self.read_source(path.as_ref(), origin)?;
            layers.push(layer);
            provenance.push(source);
        }

        let fallback = match fallback {
            Some(path) => {
                let (layer, source) = self.read_source(path, ConfigOrigin::Fallback)?;
                provenance.push(source);
                Some(layer)
            }
            None => None,
        };

        let environment = environment_tree(&self.environment);
        let tree = resolve(layers, fallback, environment, &self.defaults)?;

        info!(sources = provenance.len(), "configuration resolved");

        Ok(ResolvedConfig {
            created_at: Utc::now(),
            tree,
            sources: provenance,
        })
    }

    /// Read and parse one source, returning its mapping and provenance
    fn read_source(
        &self,
        path: &Path,
        origin: ConfigOrigin,
    ) -> Result<(Mapping, ConfigSource), ConfigError> {
        let bytes = self
            .reader
            .read(path)
            .map_err(|source| ConfigError::SourceUnreadable {
                path: path.to_path_buf(),
                source,
            })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let layer = parse_document(path, &bytes, SourceFormat::from_path(path))?;
        debug!(path = %path.display(), ?origin, digest = %digest, keys = layer.len(), "read configuration source");

        Ok((
            layer,
            ConfigSource {
                origin,
                path: path.to_string_lossy().to_string(),
                digest,
            },
        ))
    }
}
