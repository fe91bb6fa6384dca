//! Agreement thresholds for a round.
//!
//! With `n` reporting members the round tolerates `f = (n - 1) / 3` faulty
//! ones and needs `n - f` matching reports (at least `2f + 1`):
//! - 0 members → 0 required
//! - 4 members → 3 required
//! - 10 members → 7 required

/// Largest number of faulty members a round of `members` tolerates.
pub const fn max_faulty(members: usize) -> usize {
    if members == 0 {
        return 0;
    }
    (members - 1) / 3
}

/// Matching reports needed for a round of `members` to agree.
///
/// # Examples
///
/// ```
/// use census_stats::consensus_threshold;
///
/// assert_eq!(consensus_threshold(0), 0);
/// assert_eq!(consensus_threshold(1), 1);
/// assert_eq!(consensus_threshold(4), 3);
/// assert_eq!(consensus_threshold(10), 7);
/// ```
pub const fn consensus_threshold(members: usize) -> usize {
    members - max_faulty(members)
}

/// Check if a vote count meets the threshold.
pub const fn meets_threshold(votes: usize, members: usize) -> bool {
    votes >= consensus_threshold(members)
}

/// How many more votes are needed to meet the threshold.
pub const fn votes_needed(current: usize, members: usize) -> usize {
    let threshold = consensus_threshold(members);
    if current >= threshold {
        0
    } else {
        threshold - current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_table() {
        let cases = [
            (0, 0),
            (1, 1),
            (2, 2),
            (3, 3),
            (4, 3),
            (5, 4),
            (6, 5),
            (7, 5),
            (10, 7),
            (100, 67),
        ];
        for (members, expected) in cases {
            assert_eq!(
                consensus_threshold(members),
                expected,
                "threshold({}) should be {}",
                members,
                expected
            );
        }
    }

    #[test]
    fn threshold_is_two_f_plus_one_or_more() {
        for n in 1..=200 {
            let f = max_faulty(n);
            assert!(3 * f < n, "f={} too large for n={}", f, n);
            assert!(consensus_threshold(n) >= 2 * f + 1);
            assert!(consensus_threshold(n) <= n);
        }
    }

    #[test]
    fn threshold_monotonic() {
        let mut prev = 0;
        for n in 0..=200 {
            let t = consensus_threshold(n);
            assert!(t >= prev, "threshold should be monotonic");
            prev = t;
        }
    }

    #[test]
    fn two_quorums_share_an_honest_member() {
        for n in 1..=200 {
            let t = consensus_threshold(n);
            // any two quorums overlap in more than f members
            assert!(2 * t - n > max_faulty(n), "n={}", n);
        }
    }

    #[test]
    fn meets_and_needed() {
        assert!(meets_threshold(0, 0));
        assert!(!meets_threshold(2, 4));
        assert!(meets_threshold(3, 4));
        assert_eq!(votes_needed(0, 4), 3);
        assert_eq!(votes_needed(5, 10), 2);
        assert_eq!(votes_needed(9, 10), 0);
    }
}
