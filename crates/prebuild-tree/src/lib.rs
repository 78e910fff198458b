//! Configuration value tree with keypath addressing.
//!
//! A [`ValueTree`] is the parsed form of a configuration document: scalars,
//! ordered mappings and sequences. A [`Keypath`] addresses a location in the
//! tree using dotted segments, where `name:index` descends into the sequence
//! stored under `name`:
//!
//! ```text
//! PreBuilder.Targets.myApp.Configurations.Release.Provisioning_Profile
//! CFBundleURLTypes:0.CFBundleURLSchemes:0
//! ```
//!
//! Reads never fail on absent data ([`ValueTree::get`] returns `None`).
//! Writes ([`ValueTree::set`]) return a new tree and create missing
//! intermediate mappings, but never fabricate sequence elements.

mod error;
mod keypath;
mod value;

pub use error::KeypathError;
pub use keypath::{Keypath, Segment};
pub use value::{Mapping, ValueTree};
