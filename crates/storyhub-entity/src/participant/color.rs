//! Cursor colour assignment.

use rand::seq::IndexedRandom;

/// Colours handed out to participants, in preference order.
pub const CURSOR_PALETTE: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
    "#F8B4D9", "#A2D5AB",
];

/// Picks the first palette colour nobody in `taken` uses, falling back to
/// a random palette colour once all are in use.
pub fn pick_cursor_color<'a>(taken: impl IntoIterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = taken.into_iter().collect();
    CURSOR_PALETTE
        .iter()
        .find(|c| !taken.contains(*c))
        .or_else(|| CURSOR_PALETTE.choose(&mut rand::rng()))
        .unwrap_or(&CURSOR_PALETTE[0])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_free_colour() {
        assert_eq!(pick_cursor_color([]), CURSOR_PALETTE[0]);
        assert_eq!(
            pick_cursor_color([CURSOR_PALETTE[0], CURSOR_PALETTE[2]]),
            CURSOR_PALETTE[1]
        );
    }

    #[test]
    fn test_full_palette_still_yields_palette_colour() {
        let colour = pick_cursor_color(CURSOR_PALETTE);
        assert!(CURSOR_PALETTE.contains(&colour.as_str()));
    }
}
