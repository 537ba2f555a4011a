//! Bounded Hamming-distance search over list entries.

use super::list::ListEntry;

/// Number of differing bits between two fingerprint values.
///
/// Width-agnostic: callers only compare values of the same width.
pub fn hamming_distance(a: u128, b: u128) -> u32 {
    (a ^ b).count_ones()
}

/// Closest list entry found by [`best_match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    pub distance: u32,
    pub entry: &'a ListEntry,
}

/// Find the entry closest to `query` among entries of width `query_bits`.
///
/// Entries of other widths are ignored. Returns `None` when no entry lies
/// within `max_distance` or when `max_distance` is negative. When several
/// entries share the minimum distance, the earliest one in `entries` wins.
pub fn best_match(
    query: u128,
    query_bits: u32,
    entries: &[ListEntry],
    max_distance: i64,
) -> Option<Match<'_>> {
    if max_distance < 0 {
        return None;
    }

    let mut best: Option<Match<'_>> = None;
    for entry in entries
        .iter()
        .filter(|e| e.fingerprint.bits() == query_bits)
    {
        let distance = hamming_distance(query, entry.fingerprint.value());
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(Match { distance, entry });
            if distance == 0 {
                break;
            }
        }
    }

    best.filter(|m| i64::from(m.distance) <= max_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phash::Fingerprint;

    fn entry(hex: &str, label: &str) -> ListEntry {
        ListEntry::new(Fingerprint::from_hex(hex).unwrap(), label)
    }

    #[test]
    fn test_hamming_distance_identical() {
        assert_eq!(hamming_distance(0x3f3f, 0x3f3f), 0);
    }

    #[test]
    fn test_hamming_distance_all_bits() {
        assert_eq!(hamming_distance(0, u64::MAX as u128), 64);
        assert_eq!(hamming_distance(0, u128::MAX), 128);
    }

    #[test]
    fn test_best_match_exact() {
        let entries = vec![entry("3f3f3f3f3f3f3f3f", "block")];
        let m = best_match(0x3f3f_3f3f_3f3f_3f3f, 64, &entries, 0).unwrap();
        assert_eq!(m.distance, 0);
        assert_eq!(m.entry.label, "block");
    }

    #[test]
    fn test_best_match_boundary() {
        let entries = vec![entry("0000000000000000", "block")];
        // 6 bits set
        assert_eq!(best_match(0b11_1111, 64, &entries, 6).map(|m| m.distance), Some(6));
        // 7 bits set
        assert!(best_match(0b111_1111, 64, &entries, 6).is_none());
    }

    #[test]
    fn test_best_match_negative_max_distance() {
        let entries = vec![entry("00", "block")];
        assert!(best_match(0, 8, &entries, -1).is_none());
    }

    #[test]
    fn test_best_match_ignores_other_widths() {
        let entries = vec![entry("00", "narrow"), entry("0001", "wide")];
        let m = best_match(0, 16, &entries, 4).unwrap();
        assert_eq!(m.entry.label, "wide");
        assert_eq!(m.distance, 1);

        assert!(best_match(0, 32, &entries, 64).is_none());
    }

    #[test]
    fn test_best_match_prefers_minimum_distance() {
        let entries = vec![entry("0f", "far"), entry("01", "near"), entry("03", "mid")];
        let m = best_match(0, 8, &entries, 8).unwrap();
        assert_eq!(m.entry.label, "near");
        assert_eq!(m.distance, 1);
    }

    #[test]
    fn test_best_match_tie_first_wins() {
        let entries = vec![entry("01", "L1"), entry("02", "L2")];
        for _ in 0..10 {
            let m = best_match(0, 8, &entries, 4).unwrap();
            assert_eq!(m.entry.label, "L1");
            assert_eq!(m.entry.fingerprint.to_hex(), "01");
        }
    }

    #[test]
    fn test_best_match_empty_entries() {
        assert!(best_match(0, 64, &[], 10).is_none());
    }
}
