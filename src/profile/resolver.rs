//! Reading the UUID out of a provisioning profile.
//!
//! A `.mobileprovision` file is a signed container with an XML property
//! list embedded in it. Only that plist is inspected.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::{debug, warn};

const PLIST_START: &str = "<?xml";
const PLIST_END: &str = "</plist>";

/// Maps a path to the identifier embedded in the file it points to.
pub trait IdentifierResolver {
    /// `None` when the file is missing, unreadable or carries no identifier.
    fn resolve(&self, path: &Path) -> Option<String>;
}

/// Resolves provisioning profile files, optionally installing them first.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningProfileResolver {
    install_dir: Option<PathBuf>,
}

impl ProvisioningProfileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every resolved profile into `dir` (for Xcode, usually
    /// `~/Library/MobileDevice/Provisioning Profiles`).
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(dir.into());
        self
    }

    fn install(&self, profile: &Path, dir: &Path) {
        let Some(file_name) = profile.file_name() else {
            warn!(profile = %profile.display(), "profile path has no file name, not installing");
            return;
        };
        let destination = dir.join(file_name);

        let copied = fs::create_dir_all(dir).and_then(|_| fs::copy(profile, &destination));
        match copied {
            Ok(bytes) => {
                debug!(profile = %profile.display(), destination = %destination.display(), bytes, "installed provisioning profile");
            }
            Err(e) => {
                warn!(profile = %profile.display(), destination = %destination.display(), error = %e, "failed to install provisioning profile");
            }
        }
    }
}

impl IdentifierResolver for ProvisioningProfileResolver {
    fn resolve(&self, path: &Path) -> Option<String> {
        if let Some(dir) = &self.install_dir {
            self.install(path, dir);
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(profile = %path.display(), error = %e, "cannot read provisioning profile");
                return None;
            }
        };

        // The signature wrapper is binary; only the plist needs to be text.
        let contents = String::from_utf8_lossy(&bytes);
        embedded_uuid(&contents)
    }
}

/// The `UUID` entry of the first XML plist found in `contents`.
pub(crate) fn embedded_uuid(contents: &str) -> Option<String> {
    static UUID_ENTRY: OnceLock<Option<Regex>> = OnceLock::new();

    let start = contents.find(PLIST_START)?;
    let end = start + contents[start..].find(PLIST_END)? + PLIST_END.len();
    let plist = &contents[start..end];

    let pattern = UUID_ENTRY
        .get_or_init(|| Regex::new(r"<key>UUID</key>\s*<string>\s*([^<]*?)\s*</string>").ok())
        .as_ref()?;
    let uuid = pattern.captures(plist)?.get(1)?.as_str();

    (!uuid.is_empty()).then(|| uuid.to_string())
}
