//! 每轮重新扫描的工作序列。

use super::WorkingSet;
use crate::{
    merge::apply_merge,
    pair::{count_pairs, par_count_pairs, PARALLEL_THRESHOLD},
    utok, Pair,
};

pub(super) struct FlatSequence(Vec<utok>);

impl FlatSequence {
    #[inline]
    pub fn new(symbols: Vec<utok>) -> Self {
        Self(symbols)
    }
}

impl WorkingSet for FlatSequence {
    fn most_frequent(&mut self) -> Option<(Pair, usize)> {
        let counts = if self.0.len() >= PARALLEL_THRESHOLD {
            par_count_pairs(&self.0)
        } else {
            count_pairs(&self.0)
        };
        counts.most_frequent()
    }

    #[inline]
    fn merge(&mut self, pair: Pair, new_id: utok) {
        self.0 = apply_merge(&self.0, pair, new_id);
    }

    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    fn symbols(&self) -> Vec<utok> {
        self.0.clone()
    }
}
