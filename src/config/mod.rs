//! Configuration resolution
//!
//! Sources are layered in the order given:
//! 1. The first source (lowest precedence)
//! 2. Each further source, in order
//! 3. The fallback source, merged underneath all of them
//! 4. Built-in `PreBuilder` defaults, filling only what is still missing
//!
//! The process environment is captured under `environment` next to the
//! layered settings.

mod defaults;
pub mod environment;
mod loader;
mod merge;
mod settings;

pub use defaults::{BuiltinDefaults, LogTarget, TOOL_SECTION};
pub use environment::{
    export_environment, EnvironmentProvider, ProcessEnvironment, StaticEnvironment,
    ENVIRONMENT_KEY,
};
pub use loader::{
    parse_document, resolve, ConfigError, ConfigLoader, ConfigOrigin, ConfigSource,
    FsSourceReader, ResolvedConfig, SourceFormat, SourceReader, CONFIG_NAMESPACE,
};
pub use merge::{deep_merge, fill_missing, merge_layers};
pub use settings::{
    targets, HookCommand, HookStage, LogSettings, SettingsError, CONFIGURATIONS_KEY, TARGETS_KEY,
};
