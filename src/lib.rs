//! PreBuilder configuration resolver
//!
//! Resolves the layered configuration that drives iOS pre-build steps:
//! several JSON or TOML sources are deep-merged in order, the process
//! environment is captured next to them, a fallback source fills what they
//! leave out and the tool's own `PreBuilder` section gets built-in defaults.
//! Provisioning profiles given as file paths are then rewritten into the
//! UUIDs embedded in those files.

pub mod config;
pub mod logging;
pub mod profile;

pub use config::{ConfigError, ConfigLoader, ConfigOrigin, ConfigSource, ResolvedConfig};
pub use prebuild_tree::{Keypath, KeypathError, Mapping, Segment, ValueTree};
pub use profile::{
    is_canonical_identifier, IdentifierResolver, NormalizeReport, Normalizer,
    ProvisioningProfileResolver,
};
