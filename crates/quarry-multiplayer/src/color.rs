//! Deterministic per-player colours, shared by avatars and chat names.

const PALETTE: [&str; 10] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe",
];

/// Picks a palette colour from a stable hash of `name`. Every client derives
/// the same colour for the same player.
pub fn player_color(name: &str) -> &'static str {
    // FNV-1a.
    let hash = name.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    });
    PALETTE[(hash % PALETTE.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_is_stable() {
        assert_eq!(player_color("alice"), player_color("alice"));
        assert!(PALETTE.contains(&player_color("")));
    }

    #[test]
    fn test_names_spread_over_palette() {
        let distinct: std::collections::HashSet<_> =
            (0..50).map(|i| player_color(&format!("player{i}"))).collect();
        assert!(distinct.len() > 3);
    }
}
