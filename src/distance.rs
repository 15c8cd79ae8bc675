//! Grid-unit distances between tokens.

use std::collections::HashMap;

use crate::types::Token;

/// Distance in whole grid units from `reference` to every other cached
/// token: Euclidean pixel distance divided by `grid_size`, rounded to
/// nearest.
///
/// `grid_size` must be positive; callers substitute the configured
/// default for unset or non-positive map values before calling. The
/// result map follows cache iteration order and never contains the
/// reference token itself.
pub fn grid_distances(
    reference: &Token,
    cache: &HashMap<String, Token>,
    grid_size: f64,
) -> HashMap<String, u32> {
    let mut distances = HashMap::new();

    for (id, other) in cache {
        if *id == reference.id {
            continue;
        }
        let pixels = reference.position.distance_to(&other.position);
        distances.insert(id.clone(), (pixels / grid_size).round() as u32);
    }

    distances
}
