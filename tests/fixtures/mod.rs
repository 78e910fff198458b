//! Shared fixtures: sample configuration sources and a provisioning profile.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::Value;

/// UUID embedded in `profiles/Acme_Release.mobileprovision`
pub const RELEASE_PROFILE_UUID: &str = "7D3F9A12-4B6C-4E8D-9F01-23456789ABCD";

/// UUID the default config already carries for the Debug configuration
pub const DEBUG_PROFILE_UUID: &str = "0A1B2C3D-4E5F-6A7B-8C9D-0E1F2A3B4C5D";

pub fn config_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/configs")
        .join(name)
}

pub fn profile_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/profiles")
        .join(name)
}

/// Write `value` as a JSON source into `dir`.
pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

/// An override source pointing the Release configuration at the fixture
/// profile file.
pub fn release_profile_override() -> Value {
    serde_json::json!({
        "PreBuilder": {"Targets": {"Acme": {"Configurations": {"Release": {
            "Provisioning_Profile": profile_path("Acme_Release.mobileprovision")
                .to_string_lossy()
                .to_string()
        }}}}}
    })
}
