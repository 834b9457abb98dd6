//! Cumulative experience required for each character level.

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 99;

/// How many levels a character's stored level may drift from the level
/// implied by its experience before the validator reports an error.
pub const LEVEL_DRIFT_TOLERANCE: u8 = 1;

/// `EXPERIENCE_BY_LEVEL[level - 1]` is the minimum cumulative experience
/// for `level`. Strictly non-decreasing.
#[rustfmt::skip]
pub const EXPERIENCE_BY_LEVEL: [u32; MAX_LEVEL as usize] = [
    0,        32,       96,       208,      400,      672,      1056,     1552,
    2184,     2976,     3936,     5080,     6432,     7992,     9784,     11840,
    14152,    16736,    19616,    22832,    26360,    30232,    34456,    39056,
    44072,    49464,    55288,    61568,    68304,    75496,    83184,    91384,
    100083,   108344,   119136,   129504,   140464,   152008,   164184,   176976,
    190416,   204520,   219320,   234808,   251000,   267936,   285600,   304040,
    323248,   343248,   364064,   385696,   408160,   431488,   455680,   480776,
    506760,   533680,   561528,   590320,   620096,   650840,   682600,   715368,
    749160,   784016,   819920,   856920,   895016,   934208,   974536,   1016000,
    1058640,  1102456,  1147456,  1193648,  1241080,  1289744,  1339672,  1390872,
    1443368,  1497160,  1553364,  1608712,  1666512,  1725688,  1786240,  1848184,
    1911552,  1976352,  2042608,  2110320,  2179504,  2250192,  2322392,  2396128,
    2471400,  2548224,  2637112,
];

/// Minimum cumulative experience for a level. Levels outside 1-99 clamp.
pub fn exp_for_level(level: u8) -> u32 {
    let level = level.clamp(MIN_LEVEL, MAX_LEVEL);
    EXPERIENCE_BY_LEVEL[(level - 1) as usize]
}

/// The level a given cumulative experience corresponds to.
pub fn level_for_exp(exp: u32) -> u8 {
    match EXPERIENCE_BY_LEVEL.binary_search(&exp) {
        Ok(index) => (index + 1) as u8,
        Err(insert) => insert.max(1) as u8,
    }
}

/// Whether a stored (level, exp) pair is consistent with the table,
/// within [`LEVEL_DRIFT_TOLERANCE`].
pub fn is_consistent(level: u8, exp: u32) -> bool {
    if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        return false;
    }
    let implied = level_for_exp(exp);
    implied.abs_diff(level) <= LEVEL_DRIFT_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_non_decreasing() {
        for pair in EXPERIENCE_BY_LEVEL.windows(2) {
            assert!(pair[0] <= pair[1], "table decreases at {} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn level_for_exp_matches_table_boundaries() {
        assert_eq!(level_for_exp(0), 1);
        assert_eq!(level_for_exp(31), 1);
        assert_eq!(level_for_exp(32), 2);
        assert_eq!(level_for_exp(2_637_112), 99);
        assert_eq!(level_for_exp(u32::MAX), 99);
    }

    #[test]
    fn consistency_allows_one_level_of_drift() {
        assert!(is_consistent(10, exp_for_level(10)));
        assert!(is_consistent(10, exp_for_level(11)));
        assert!(!is_consistent(10, exp_for_level(13)));
        assert!(!is_consistent(99, 0));
        assert!(!is_consistent(0, 0));
    }
}
