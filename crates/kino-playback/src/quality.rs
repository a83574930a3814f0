//! Quality ladder derivation and level resolution
//!
//! Qualities are exposed to viewers as distinct video heights, tallest first.
//! Requests for a height are resolved against the engine's ladder ranked by
//! bitrate, so the richest rendition at that height wins.

use crate::{Level, LevelSelection};

/// Distinct video heights, descending, with height-less renditions dropped
pub fn derive_qualities(levels: &[Level]) -> Vec<u32> {
    let mut heights: Vec<u32> = levels.iter().filter_map(Level::video_height).collect();
    heights.sort_unstable_by(|a, b| b.cmp(a));
    heights.dedup();
    heights
}

/// Levels paired with their engine index, highest bitrate first.
///
/// The sort is stable, so equal bitrates keep the engine's order.
pub fn rank_by_bitrate(levels: &[Level]) -> Vec<(usize, Level)> {
    let mut ranked: Vec<(usize, Level)> = levels.iter().copied().enumerate().collect();
    ranked.sort_by(|(_, a), (_, b)| b.bitrate.cmp(&a.bitrate));
    ranked
}

/// Position of the first level at `height` in the bitrate-descending ranking
pub fn bitrate_rank_of(levels: &[Level], height: u32) -> Option<usize> {
    if height == 0 {
        return None;
    }
    rank_by_bitrate(levels)
        .iter()
        .position(|(_, level)| level.height == Some(height))
}

/// Engine level to activate for a requested height.
///
/// The index is the height's position in the bitrate-descending ranking.
/// Heights missing from the ladder resolve to [`LevelSelection::Auto`]
/// rather than an arbitrary index.
pub fn resolve_level(levels: &[Level], desired: Option<u32>) -> LevelSelection {
    desired
        .and_then(|height| bitrate_rank_of(levels, height))
        .map(LevelSelection::Index)
        .unwrap_or(LevelSelection::Auto)
}

/// Menu label for a height
pub fn quality_label(height: u32) -> String {
    match height {
        0 => "Auto".to_string(),
        h if h >= 2160 => "4K".to_string(),
        h if h >= 1440 => "1440p".to_string(),
        h => format!("{}p", h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> Vec<Level> {
        vec![
            Level::new(1080, 6_000_000),
            Level::new(720, 3_000_000),
            Level::new(720, 2_500_000),
            Level::new(480, 1_200_000),
            Level::new(0, 128_000),
        ]
    }

    #[test]
    fn test_derive_qualities() {
        assert_eq!(derive_qualities(&ladder()), vec![1080, 720, 480]);
    }

    #[test]
    fn test_derive_qualities_unsorted_input() {
        let levels = vec![
            Level::new(360, 800_000),
            Level::audio_only(96_000),
            Level::new(1080, 6_000_000),
            Level::new(360, 700_000),
            Level::new(720, 3_000_000),
        ];
        assert_eq!(derive_qualities(&levels), vec![1080, 720, 360]);
    }

    #[test]
    fn test_derive_qualities_audio_only() {
        let levels = vec![Level::audio_only(128_000), Level::new(0, 64_000)];
        assert!(derive_qualities(&levels).is_empty());
        assert!(derive_qualities(&[]).is_empty());
    }

    #[test]
    fn test_resolve_uses_bitrate_rank() {
        let levels = ladder();
        assert_eq!(resolve_level(&levels, Some(1080)), LevelSelection::Index(0));
        assert_eq!(resolve_level(&levels, Some(720)), LevelSelection::Index(1));
        assert_eq!(resolve_level(&levels, Some(480)), LevelSelection::Index(3));
    }

    #[test]
    fn test_resolve_ranks_ascending_ladder() {
        let levels = vec![
            Level::new(480, 1_200_000),
            Level::new(720, 2_500_000),
            Level::new(720, 3_000_000),
            Level::new(1080, 6_000_000),
        ];
        assert_eq!(resolve_level(&levels, Some(720)), LevelSelection::Index(1));
        assert_eq!(resolve_level(&levels, Some(480)), LevelSelection::Index(3));

        let ranked = rank_by_bitrate(&levels);
        assert_eq!(ranked[1], (2, Level::new(720, 3_000_000)));
    }

    #[test]
    fn test_resolve_unknown_height_is_auto() {
        assert_eq!(resolve_level(&ladder(), Some(2160)), LevelSelection::Auto);
        assert_eq!(resolve_level(&ladder(), Some(0)), LevelSelection::Auto);
        assert_eq!(resolve_level(&ladder(), None), LevelSelection::Auto);
        assert_eq!(bitrate_rank_of(&ladder(), 0), None);
    }

    #[test]
    fn test_quality_label() {
        assert_eq!(quality_label(480), "480p");
        assert_eq!(quality_label(1080), "1080p");
        assert_eq!(quality_label(1440), "1440p");
        assert_eq!(quality_label(2160), "4K");
    }
}
