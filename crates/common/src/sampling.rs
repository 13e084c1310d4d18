//! Stratified, distribution-aware parent account sampling
//!
//! Parents are bucketed by connection count. High-volume buckets are always
//! covered; lower buckets are admitted in stable prefixes as the exhaustive
//! factor grows, so the long tail is only exercised at deeper coverage levels.
//!
//! ```text
//! bucket          range      admitted at   share
//! ExtremeVolume   >= 100     always        all
//! High            [30,100)   always        all
//! Medium          [15,30)    >= 10%        50%
//! Low             [7,15)     >= 25%        50%
//! Minimal         [3,7)      >= 50%        60%
//! LongTail        <= 2       >= 75%        70%
//! (every bucket)             100%          all
//! ```

use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::types::{Account, ExhaustiveFactor};

/// Connection-count band of a parent account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingBucket {
    ExtremeVolume,
    High,
    Medium,
    Low,
    Minimal,
    LongTail,
}

/// (minimum factor, bucket, percent of the bucket admitted)
const ADMISSION_STEPS: [(u32, SamplingBucket, usize); 4] = [
    (10, SamplingBucket::Medium, 50),
    (25, SamplingBucket::Low, 50),
    (50, SamplingBucket::Minimal, 60),
    (75, SamplingBucket::LongTail, 70),
];

impl SamplingBucket {
    /// Buckets from highest to lowest volume
    pub const ALL: [SamplingBucket; 6] = [
        SamplingBucket::ExtremeVolume,
        SamplingBucket::High,
        SamplingBucket::Medium,
        SamplingBucket::Low,
        SamplingBucket::Minimal,
        SamplingBucket::LongTail,
    ];

    pub fn for_count(connection_count: u64) -> Self {
        match connection_count {
            100.. => SamplingBucket::ExtremeVolume,
            30..=99 => SamplingBucket::High,
            15..=29 => SamplingBucket::Medium,
            7..=14 => SamplingBucket::Low,
            3..=6 => SamplingBucket::Minimal,
            _ => SamplingBucket::LongTail,
        }
    }

    /// Always sampled in full regardless of the factor
    pub fn is_mandatory(self) -> bool {
        matches!(self, SamplingBucket::ExtremeVolume | SamplingBucket::High)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Accounts partitioned into buckets, each keeping the input order
#[derive(Debug)]
pub struct Buckets<'a> {
    slots: [Vec<&'a Account>; 6],
}

impl<'a> Buckets<'a> {
    pub fn partition(accounts: &'a [Account]) -> Self {
        let mut slots: [Vec<&'a Account>; 6] = Default::default();
        for account in accounts {
            slots[SamplingBucket::for_count(account.connection_count).index()].push(account);
        }
        Self { slots }
    }

    pub fn get(&self, bucket: SamplingBucket) -> &[&'a Account] {
        &self.slots[bucket.index()]
    }

    /// Bucket sizes, highest volume first
    pub fn distribution(&self) -> Vec<(SamplingBucket, usize)> {
        SamplingBucket::ALL
            .iter()
            .map(|bucket| (*bucket, self.get(*bucket).len()))
            .collect()
    }
}

/// Select the parent accounts to validate at the given exhaustive factor.
///
/// Bucket prefixes follow the input order; callers pass the population sorted
/// by descending connection count. The result is sorted by descending
/// connection count and capped at `factor.percent_count(accounts.len())`.
pub fn select_accounts(accounts: &[Account], factor: ExhaustiveFactor) -> Vec<Account> {
    if accounts.is_empty() {
        return Vec::new();
    }

    let buckets = Buckets::partition(accounts);
    debug!("Bucket distribution: {:?}", buckets.distribution());

    let percent = factor.percent();
    let mut admitted: Vec<&Account> = Vec::new();

    if percent >= 100 {
        for bucket in SamplingBucket::ALL {
            admitted.extend(buckets.get(bucket));
        }
    } else {
        for bucket in SamplingBucket::ALL.into_iter().filter(|b| b.is_mandatory()) {
            admitted.extend(buckets.get(bucket));
        }
        for (threshold, bucket, share) in ADMISSION_STEPS {
            if percent >= threshold {
                let members = buckets.get(bucket);
                let take = (members.len() * share).div_ceil(100).min(members.len());
                admitted.extend(&members[..take]);
            }
        }
    }

    // Small populations can leave every admitted bucket empty
    if admitted.is_empty() {
        if let Some(first) = SamplingBucket::ALL
            .into_iter()
            .find_map(|bucket| buckets.get(bucket).first().copied())
        {
            admitted.push(first);
        }
    }

    let mut seen = HashSet::new();
    let mut unique: Vec<&Account> = admitted
        .into_iter()
        .filter(|account| seen.insert((*account).key()))
        .collect();

    unique.sort_by(|a, b| b.connection_count.cmp(&a.connection_count));
    unique.truncate(factor.percent_count(accounts.len()));

    debug!(
        "Selected {} of {} parents at {}",
        unique.len(),
        accounts.len(),
        factor
    );

    unique.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn population(counts: &[u64]) -> Vec<Account> {
        let mut accounts: Vec<Account> = counts
            .iter()
            .enumerate()
            .map(|(i, count)| Account::parent(1000 + i as u64, *count))
            .collect();
        accounts.sort_by(|a, b| b.connection_count.cmp(&a.connection_count));
        accounts
    }

    /// A skewed population touching every bucket
    fn skewed() -> Vec<Account> {
        population(&[
            480, 150, 101, 99, 45, 30, 29, 22, 18, 15, 14, 12, 9, 8, 7, 6, 5, 4, 3, 3, 2, 2, 2, 1,
            1, 1, 1, 0, 0, 0,
        ])
    }

    fn ids(accounts: &[Account]) -> HashSet<u64> {
        accounts.iter().filter_map(|a| a.account_id).collect()
    }

    #[test_case(100 => SamplingBucket::ExtremeVolume)]
    #[test_case(99 => SamplingBucket::High)]
    #[test_case(30 => SamplingBucket::High)]
    #[test_case(15 => SamplingBucket::Medium)]
    #[test_case(7 => SamplingBucket::Low)]
    #[test_case(3 => SamplingBucket::Minimal)]
    #[test_case(2 => SamplingBucket::LongTail)]
    #[test_case(0 => SamplingBucket::LongTail)]
    fn test_bucket_boundaries(count: u64) -> SamplingBucket {
        SamplingBucket::for_count(count)
    }

    #[test]
    fn test_full_factor_selects_everything() {
        let accounts = skewed();
        let selected = select_accounts(&accounts, ExhaustiveFactor::FULL);
        assert_eq!(selected.len(), accounts.len());
        assert_eq!(ids(&selected), ids(&accounts));
    }

    #[test]
    fn test_selection_sorted_descending() {
        let selected = select_accounts(&skewed(), ExhaustiveFactor::new(50).unwrap());
        assert!(selected
            .windows(2)
            .all(|pair| pair[0].connection_count >= pair[1].connection_count));
    }

    #[test]
    fn test_selection_is_never_empty() {
        for counts in [&[0u64][..], &[2, 1, 1], &[5, 4], &[14]] {
            let accounts = population(counts);
            for percent in 1..=100 {
                let factor = ExhaustiveFactor::new(percent).unwrap();
                assert!(
                    !select_accounts(&accounts, factor).is_empty(),
                    "empty selection for {:?} at {}",
                    counts,
                    factor
                );
            }
        }
    }

    #[test]
    fn test_empty_population() {
        assert!(select_accounts(&[], ExhaustiveFactor::FULL).is_empty());
    }

    #[test]
    fn test_low_factor_keeps_high_volume_first() {
        let accounts = skewed();
        // cap is ceil(5% of 30) = 2
        let selected = select_accounts(&accounts, ExhaustiveFactor::new(5).unwrap());
        let counts: Vec<u64> = selected.iter().map(|a| a.connection_count).collect();
        assert_eq!(counts, vec![480, 150]);
    }

    #[test]
    fn test_monotonic_below_cap() {
        // Admissions only add lower-volume accounts, so the top-N cap keeps earlier picks.
        let accounts = skewed();
        let mut previous: Option<HashSet<u64>> = None;
        for percent in ExhaustiveFactor::CANONICAL {
            let factor = ExhaustiveFactor::new(percent).unwrap();
            let current = ids(&select_accounts(&accounts, factor));
            if let Some(prev) = &previous {
                assert!(
                    prev.is_subset(&current),
                    "selection at {} dropped accounts",
                    factor
                );
            }
            previous = Some(current);
        }
    }

    #[test]
    fn test_duplicate_accounts_collapse() {
        let mut accounts = population(&[200, 40]);
        accounts.push(accounts[0].clone());
        let selected = select_accounts(&accounts, ExhaustiveFactor::FULL);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_partial_bucket_prefix_is_stable() {
        // Four Medium accounts: at 10% half of them are admitted, in input order.
        let accounts = population(&[
            120, 28, 25, 20, 16, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
        ]);
        let selected = select_accounts(&accounts, ExhaustiveFactor::new(10).unwrap());
        let counts: Vec<u64> = selected.iter().map(|a| a.connection_count).collect();
        // cap = ceil(10% of 20) = 2
        assert_eq!(counts, vec![120, 28]);

        let selected = select_accounts(&accounts, ExhaustiveFactor::new(25).unwrap());
        let counts: Vec<u64> = selected.iter().map(|a| a.connection_count).collect();
        assert_eq!(counts, vec![120, 28, 25]);
    }
}
