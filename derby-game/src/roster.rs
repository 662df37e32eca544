//! Roster generation from the fixed name and color catalogs.
use rand::Rng;
use thiserror::Error;

use crate::constants::{BASE_COLORS, CONDITION_MAX, CONDITION_MIN, HORSE_NAMES, catalog_capacity};
use crate::horse::Horse;

/// Errors raised when a roster cannot be drawn from the catalogs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RosterError {
    #[error("requested {requested} horses but the catalogs only hold {available}")]
    CatalogExhausted { requested: usize, available: usize },
}

/// First `count` catalog colors, clamped to the catalog size.
#[must_use]
pub fn generate_colors(count: usize) -> Vec<String> {
    BASE_COLORS
        .iter()
        .take(count)
        .map(ToString::to_string)
        .collect()
}

/// First `count` catalog names, clamped to the catalog size.
#[must_use]
pub fn generate_names(count: usize) -> Vec<String> {
    HORSE_NAMES
        .iter()
        .take(count)
        .map(ToString::to_string)
        .collect()
}

/// Roll a condition uniformly from `1..=100`.
pub fn random_condition<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(CONDITION_MIN..=CONDITION_MAX)
}

/// Generate `count` horses with ids `1..=count`, catalog names and colors
/// in order, and independently rolled conditions.
///
/// # Errors
///
/// Returns `RosterError::CatalogExhausted` when `count` exceeds the catalogs.
pub fn generate_horses<R: Rng + ?Sized>(
    count: usize,
    rng: &mut R,
) -> Result<Vec<Horse>, RosterError> {
    let available = catalog_capacity();
    if count > available {
        return Err(RosterError::CatalogExhausted {
            requested: count,
            available,
        });
    }

    let names = generate_names(count);
    let colors = generate_colors(count);
    let horses = names
        .into_iter()
        .zip(colors)
        .zip(1u32..)
        .map(|((name, color), id)| Horse {
            id,
            name,
            color,
            condition: random_condition(rng),
        })
        .collect();
    Ok(horses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ROSTER_SIZE;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::HashSet;

    #[test]
    fn full_roster_has_distinct_names_and_colors() {
        let mut rng = SmallRng::seed_from_u64(20);
        let horses = generate_horses(ROSTER_SIZE, &mut rng).unwrap();
        assert_eq!(horses.len(), 20);

        let names: HashSet<_> = horses.iter().map(|h| h.name.as_str()).collect();
        let colors: HashSet<_> = horses.iter().map(|h| h.color.as_str()).collect();
        assert_eq!(names.len(), 20);
        assert_eq!(colors.len(), 20);
        assert!(horses.iter().all(|h| (1..=100).contains(&h.condition)));
        assert_eq!(
            horses.iter().map(|h| h.id).collect::<Vec<_>>(),
            (1..=20).collect::<Vec<_>>()
        );
    }

    #[test]
    fn names_and_colors_follow_catalog_order() {
        let mut rng = SmallRng::seed_from_u64(1);
        let horses = generate_horses(3, &mut rng).unwrap();
        assert_eq!(horses[0].name, "Ada Lovelace");
        assert_eq!(horses[2].name, "Margaret Hamilton");
        assert_eq!(horses[1].color, "#3cb44b");
    }

    #[test]
    fn oversized_roster_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let err = generate_horses(21, &mut rng).unwrap_err();
        assert_eq!(
            err,
            RosterError::CatalogExhausted {
                requested: 21,
                available: 20
            }
        );
    }

    #[test]
    fn catalog_slices_clamp() {
        assert_eq!(generate_names(50).len(), 20);
        assert_eq!(generate_colors(0).len(), 0);
        assert!(generate_horses(0, &mut SmallRng::seed_from_u64(3)).unwrap().is_empty());
    }

    #[test]
    fn conditions_cover_bounds_over_many_rolls() {
        let mut rng = SmallRng::seed_from_u64(77);
        let rolls: Vec<u8> = (0..5_000).map(|_| random_condition(&mut rng)).collect();
        assert!(rolls.iter().all(|c| (1..=100).contains(c)));
        assert!(rolls.contains(&1));
        assert!(rolls.contains(&100));
    }
}
