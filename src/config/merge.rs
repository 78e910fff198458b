//! Configuration merge logic
//!
//! Implements layered merging with:
//! - Mappings: deep-merge by key
//! - Sequences: REPLACE (overlay wins)
//! - Scalars and type mismatches: overlay wins

use prebuild_tree::ValueTree;

/// Deep merge two trees.
///
/// Merge semantics:
/// - Mappings: deep-merge by key (recursive)
/// - Keys only in `base` are kept, keys only in `overlay` are appended
/// - Anything else: `overlay` replaces `base` entirely (including null)
pub fn deep_merge(base: ValueTree, overlay: ValueTree) -> ValueTree {
    match (base, overlay) {
        // Both mappings: deep merge
        (ValueTree::Mapping(mut base_map), ValueTree::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(std::mem::take(base_value), overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            ValueTree::Mapping(base_map)
        }

        // Sequences, scalars and mismatches: overlay wins
        (_, overlay) => overlay,
    }
}

/// Fold layers left to right (first is lowest precedence, last highest).
///
/// Returns `None` for an empty list.
pub fn merge_layers(layers: Vec<ValueTree>) -> Option<ValueTree> {
    layers.into_iter().reduce(deep_merge)
}

/// Fill in whatever `defaults` has that `existing` lacks. Existing values,
/// including existing non-mapping values, are never replaced.
///
/// Same result as `deep_merge(defaults, existing)`, but keys already in
/// `existing` keep their order and missing ones are appended.
pub fn fill_missing(existing: ValueTree, defaults: ValueTree) -> ValueTree {
    match (existing, defaults) {
        (ValueTree::Mapping(mut existing_map), ValueTree::Mapping(default_map)) => {
            for (key, default_value) in default_map {
                match existing_map.get_mut(&key) {
                    Some(current) => {
                        *current = fill_missing(std::mem::take(current), default_value);
                    }
                    None => {
                        existing_map.insert(key, default_value);
                    }
                }
            }
            ValueTree::Mapping(existing_map)
        }
        (existing, _) => existing,
    }
}
