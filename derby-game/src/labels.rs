//! Display labels shared by renderers.

/// Suffix used after a place or lap number: `.st`, `.nd`, `.rd`, `.th`.
#[must_use]
pub const fn ordinal_suffix(n: usize) -> &'static str {
    match n {
        1 => ".st",
        2 => ".nd",
        3 => ".rd",
        _ => ".th",
    }
}

/// Lap heading for a zero-based round index, e.g. `1.st Lap 1200m`.
#[must_use]
pub fn lap_label(round_index: usize, distance: u32) -> String {
    let lap = round_index + 1;
    format!("{lap}{} Lap {distance}m", ordinal_suffix(lap))
}
