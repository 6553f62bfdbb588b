//! 相邻符号对的频次表。

use crate::{utok, Pair};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;

/// 序列长度超过此值时才值得并行统计。
pub(crate) const PARALLEL_THRESHOLD: usize = 1 << 16;

/// 一个符号对的统计信息。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PairStat {
    /// 出现次数，重叠的出现也分别计数
    pub count: usize,
    /// 在扫描中首次出现的位置
    pub first: usize,
}

/// 符号对到出现次数的映射。
///
/// 除次数外还记录每个符号对首次出现的位置，
/// 以便在次数相同时选出扫描中最先见到的符号对。
#[derive(Clone, Default, Debug)]
pub struct PairCounts(FxHashMap<Pair, PairStat>);

impl PairCounts {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录 `pair` 在位置 `pos` 的一次出现。
    pub fn increment(&mut self, pair: Pair, pos: usize) {
        self.0
            .entry(pair)
            .and_modify(|stat| {
                stat.count += 1;
                stat.first = stat.first.min(pos);
            })
            .or_insert(PairStat {
                count: 1,
                first: pos,
            });
    }

    #[inline]
    pub fn get(&self, pair: Pair) -> usize {
        self.0.get(&pair).map_or(0, |stat| stat.count)
    }

    #[inline]
    pub fn stat(&self, pair: Pair) -> Option<PairStat> {
        self.0.get(&pair).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pair, PairStat)> + '_ {
        self.0.iter().map(|(&pair, &stat)| (pair, stat))
    }

    /// 出现次数最多的符号对及其次数。
    ///
    /// 次数相同时，首次出现位置最靠前者胜出，与表的内部顺序无关。
    pub fn most_frequent(&self) -> Option<(Pair, usize)> {
        self.0
            .iter()
            .max_by_key(|(_, stat)| (stat.count, Reverse(stat.first)))
            .map(|(&pair, stat)| (pair, stat.count))
    }

    /// 合并另一张分区统计表：次数相加，首次位置取小。
    fn absorb(mut self, other: Self) -> Self {
        let (mut big, small) = if self.0.len() >= other.0.len() {
            (std::mem::take(&mut self.0), other.0)
        } else {
            (other.0, std::mem::take(&mut self.0))
        };
        for (pair, stat) in small {
            big.entry(pair)
                .and_modify(|acc| {
                    acc.count += stat.count;
                    acc.first = acc.first.min(stat.first);
                })
                .or_insert(stat);
        }
        Self(big)
    }
}

/// 从左到右扫描，统计每个相邻符号对的出现次数。
pub fn count_pairs(symbols: &[utok]) -> PairCounts {
    let mut counts = PairCounts::new();
    for (i, w) in symbols.windows(2).enumerate() {
        counts.increment((w[0], w[1]), i);
    }
    counts
}

/// [`count_pairs`] 的并行版本，结果与顺序扫描完全相同。
pub fn par_count_pairs(symbols: &[utok]) -> PairCounts {
    symbols
        .par_windows(2)
        .enumerate()
        .fold(PairCounts::new, |mut counts, (i, w)| {
            counts.increment((w[0], w[1]), i);
            counts
        })
        .reduce(PairCounts::new, PairCounts::absorb)
}
