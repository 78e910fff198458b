//! Provisioning profile normalization
//!
//! Configurations may name their provisioning profile either by UUID or by
//! the path of a `.mobileprovision` file. After loading, every path is
//! replaced by the UUID embedded in the file it points to.

mod normalize;
mod resolver;

use std::sync::OnceLock;

use regex_lite::Regex;

pub use normalize::{NormalizeReport, Normalizer, PROFILE_KEY};
pub use resolver::{IdentifierResolver, ProvisioningProfileResolver};

/// True for the canonical UUID shape: 8-4-4-4-12 hex digits, either case.
pub fn is_canonical_identifier(candidate: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
                .ok()
        })
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(candidate))
}
