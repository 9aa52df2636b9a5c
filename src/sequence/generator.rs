use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{FocusCategory, FocusItem};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Highest number of items any single category may contribute.
pub fn category_cap(target_count: usize, category_count: usize) -> usize {
    if category_count == 0 {
        return 0;
    }
    target_count.div_ceil(category_count)
}

/// Builds randomized, category-balanced focus sequences.
pub struct SequenceGenerator<R: Rng = StdRng> {
    rng: R,
}

impl SequenceGenerator<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for SequenceGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SequenceGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Picks a target inside `range` and generates a sequence for it.
    pub fn generate_in_range(
        &mut self,
        pool: &[FocusItem],
        range: RangeInclusive<usize>,
    ) -> Vec<FocusItem> {
        let (low, high) = (*range.start(), *range.end());
        let target = if low >= high {
            low
        } else {
            self.rng.gen_range(low..=high)
        };
        self.generate(pool, target)
    }

    /// Shuffles `pool` and walks it greedily, keeping each category under
    /// `category_cap(target_count, categories)`. Returns fewer than
    /// `target_count` items when the caps or the pool run out first.
    pub fn generate(&mut self, pool: &[FocusItem], target_count: usize) -> Vec<FocusItem> {
        let categories: HashSet<FocusCategory> = pool.iter().map(|item| item.category).collect();
        let cap = category_cap(target_count, categories.len());

        // Fisher-Yates via `SliceRandom::shuffle`. A random-comparator sort is not
        // uniform and can panic on an inconsistent ordering, so it is not used here.
        let mut shuffled: Vec<&FocusItem> = pool.iter().collect();
        shuffled.shuffle(&mut self.rng);

        let mut seen: HashSet<&str> = HashSet::new();
        let mut counts: HashMap<FocusCategory, usize> = HashMap::new();
        let mut sequence = Vec::with_capacity(target_count);

        for item in shuffled {
            if sequence.len() >= target_count {
                break;
            }
            if !seen.insert(item.name.as_str()) {
                continue;
            }
            let count = counts.entry(item.category).or_insert(0);
            if *count < cap {
                *count += 1;
                sequence.push(item.clone());
            }
        }

        if sequence.len() < target_count {
            log_debug!(
                "sequence exhausted at {} of {} items (cap {} per category)",
                sequence.len(),
                target_count,
                cap
            );
        }

        sequence
    }
}
