//! 增量维护符号对频次的工作序列。
//!
//! 序列保存为以 `Vec` 为存储的双向链表，节点下标即其在原始序列中的位置。
//! 合并时左侧节点保留并改写为新符号，右侧节点被删除，
//! 因此存活节点的下标顺序始终与序列顺序一致，
//! 符号对的“首次出现位置”可以直接用最小下标表示。

use super::WorkingSet;
use crate::{utok, Pair};
use rustc_hash::{FxHashMap, FxHashSet};
use std::{
    cmp::Reverse,
    collections::{BTreeSet, BinaryHeap},
};

#[derive(Clone, Copy, Debug)]
struct Node {
    token: utok,
    prev: Option<usize>,
    next: Option<usize>,
}

/// 最大堆中的候选项：次数多者优先，次数相同时首次出现靠前者优先。
///
/// 堆中允许存在过期项，出堆时与 `positions` 对照校验。
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
struct Candidate {
    count: usize,
    first: Reverse<usize>,
    pair: Pair,
}

impl Candidate {
    fn of(pair: Pair, positions: &BTreeSet<usize>) -> Option<Self> {
        positions.first().map(|&first| Self {
            count: positions.len(),
            first: Reverse(first),
            pair,
        })
    }
}

pub(super) struct LinkedSequence {
    /// 节点存储，`None` 表示已被合并删除
    nodes: Vec<Option<Node>>,
    /// 存活节点数
    len: usize,
    /// 每个符号对所有出现位置（左侧节点下标），是频次的唯一来源
    positions: FxHashMap<Pair, BTreeSet<usize>>,
    heap: BinaryHeap<Candidate>,
    /// 本轮合并中频次或首次位置发生变化的符号对
    touched: FxHashSet<Pair>,
}

impl LinkedSequence {
    pub fn new(symbols: &[utok]) -> Self {
        let n = symbols.len();
        let nodes = symbols
            .iter()
            .enumerate()
            .map(|(i, &token)| {
                Some(Node {
                    token,
                    prev: i.checked_sub(1),
                    next: Some(i + 1).filter(|&j| j < n),
                })
            })
            .collect();

        let mut positions = FxHashMap::<Pair, BTreeSet<usize>>::default();
        for (i, w) in symbols.windows(2).enumerate() {
            positions.entry((w[0], w[1])).or_default().insert(i);
        }
        let heap = positions
            .iter()
            .filter_map(|(&pair, set)| Candidate::of(pair, set))
            .collect();

        Self {
            nodes,
            len: n,
            positions,
            heap,
            touched: FxHashSet::default(),
        }
    }

    #[inline]
    fn token(&self, idx: usize) -> Option<utok> {
        self.nodes[idx].map(|node| node.token)
    }

    fn add_pair_at(&mut self, idx: usize, pair: Pair) {
        self.positions.entry(pair).or_default().insert(idx);
        self.touched.insert(pair);
    }

    fn remove_pair_at(&mut self, idx: usize, pair: Pair) {
        if let Some(set) = self.positions.get_mut(&pair) {
            set.remove(&idx);
            if set.is_empty() {
                self.positions.remove(&pair);
            }
            self.touched.insert(pair);
        }
    }
}

impl WorkingSet for LinkedSequence {
    fn most_frequent(&mut self) -> Option<(Pair, usize)> {
        while let Some(top) = self.heap.pop() {
            let current = self
                .positions
                .get(&top.pair)
                .and_then(|set| Candidate::of(top.pair, set));
            if current == Some(top) {
                return Some((top.pair, top.count));
            }
            // 过期项，丢弃
        }
        None
    }

    fn merge(&mut self, pair: Pair, new_id: utok) {
        let (a, b) = pair;
        let Some(positions) = self.positions.remove(&pair) else {
            return;
        };

        // 按序列顺序处理，已被左侧合并消费的出现会在校验时跳过
        for idx1 in positions {
            let Some(node) = self.nodes[idx1] else {
                continue;
            };
            let Some(idx2) = node.next else {
                continue;
            };
            let Some(right) = self.nodes[idx2] else {
                continue;
            };
            if node.token != a || right.token != b {
                continue;
            }

            let t0 = node.prev.and_then(|i| self.token(i));
            let t3 = right.next.and_then(|i| self.token(i));

            // 移除旧的相邻对
            if let (Some(i0), Some(t0)) = (node.prev, t0) {
                self.remove_pair_at(i0, (t0, a));
            }
            if let Some(t3) = t3 {
                self.remove_pair_at(idx2, (b, t3));
            }

            // 在链表中合并
            self.nodes[idx1] = Some(Node {
                token: new_id,
                prev: node.prev,
                next: right.next,
            });
            if let Some(next) = right.next {
                if let Some(after) = &mut self.nodes[next] {
                    after.prev = Some(idx1);
                }
            }
            self.nodes[idx2] = None;
            self.len -= 1;

            // 添加新的相邻对
            if let (Some(i0), Some(t0)) = (node.prev, t0) {
                self.add_pair_at(i0, (t0, new_id));
            }
            if let Some(t3) = t3 {
                self.add_pair_at(idx1, (new_id, t3));
            }
        }

        // 为变化过的符号对补充新的候选项
        for pair in self.touched.drain() {
            if let Some(candidate) = self
                .positions
                .get(&pair)
                .and_then(|set| Candidate::of(pair, set))
            {
                self.heap.push(candidate);
            }
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    fn symbols(&self) -> Vec<utok> {
        let mut ans = Vec::with_capacity(self.len);
        let mut cur = if self.nodes.is_empty() { None } else { Some(0) };
        while let Some(Some(node)) = cur.map(|i| self.nodes[i]) {
            ans.push(node.token);
            cur = node.next;
        }
        ans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(text: &[u8]) -> LinkedSequence {
        LinkedSequence::new(&text.iter().map(|&b| b as utok).collect::<Vec<_>>())
    }

    #[test]
    fn empty_and_single() {
        assert_eq!(sequence(b"").most_frequent(), None);
        assert_eq!(sequence(b"").symbols(), Vec::<utok>::new());
        assert_eq!(sequence(b"x").most_frequent(), None);
        assert_eq!(sequence(b"x").len(), 1);
    }

    #[test]
    fn run_of_identical_symbols() {
        let mut seq = sequence(b"aaaaa");
        assert_eq!(seq.most_frequent(), Some(((97, 97), 4)));
        seq.merge((97, 97), 256);
        assert_eq!(seq.symbols(), [256, 256, 97]);
        assert_eq!(seq.len(), 3);
        // (256, 256) 与 (256, 97) 各出现一次，(256, 256) 先出现
        assert_eq!(seq.most_frequent(), Some(((256, 256), 1)));
    }

    #[test]
    fn counts_drop_after_neighbour_merges() {
        // 合并 (b, c) 会破坏与之重叠的 (a, b) 和 (c, b)
        let mut seq = sequence(b"abcabcbc");
        assert_eq!(seq.most_frequent(), Some(((98, 99), 3)));
        seq.merge((98, 99), 256);
        assert_eq!(seq.symbols(), [97, 256, 97, 256, 256]);
        assert_eq!(seq.most_frequent(), Some(((97, 256), 2)));
        seq.merge((97, 256), 257);
        assert_eq!(seq.symbols(), [257, 257, 256]);
        assert_eq!(seq.most_frequent(), Some(((257, 257), 1)));
        seq.merge((257, 257), 258);
        assert_eq!(seq.most_frequent(), Some(((258, 256), 1)));
        seq.merge((258, 256), 259);
        assert_eq!(seq.symbols(), [259]);
        assert_eq!(seq.most_frequent(), None);
    }
}
