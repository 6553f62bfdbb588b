//! 从字节序列学习 BPE 词表与合词规则。

mod incremental;
mod recount;

use crate::{
    error::{Error, Result},
    utok,
    vocab::check_alphabet,
    Bpe, MergeRules, Pair, Vocabulary, BASE_ALPHABET_SIZE,
};
use incremental::LinkedSequence;
use log::{debug, info};
use recount::FlatSequence;
use std::ops::ControlFlow;

/// 每轮迭代统计符号对频次的方式。两种方式学到的模型完全相同。
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub enum Strategy {
    /// 在链表上增量维护频次，只更新合并位置两侧的符号对。
    #[default]
    Incremental,
    /// 每轮重新扫描整个工作序列。
    Recount,
}

/// 一次合并的观测记录。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MergeEvent {
    /// 从 0 开始的迭代序号
    pub iteration: usize,
    pub pair: Pair,
    pub new_id: utok,
    /// 合并前 `pair` 在工作序列中的出现次数
    pub count: usize,
    /// 合并后工作序列的长度
    pub remaining: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StopReason {
    /// 完成了要求的全部合并。
    TargetReached,
    /// 工作序列中已没有相邻对可以合并。
    Exhausted,
    /// 观测者要求提前结束。
    Cancelled,
}

/// 一次训练的结果。
#[must_use]
#[derive(Clone, Debug)]
pub struct Training {
    pub model: Bpe,
    /// 要求的合并次数
    pub requested: usize,
    pub stop: StopReason,
}

impl Training {
    /// 实际执行的合并次数。
    #[inline]
    pub fn performed(&self) -> usize {
        self.model.merge_rules().len()
    }

    /// 输入在达到目标词表之前就已无法继续合并。
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.stop == StopReason::Exhausted
    }
}

/// 训练中不断被压缩的工作序列。
trait WorkingSet {
    /// 出现次数最多的相邻对，次数相同时取最先出现者。
    fn most_frequent(&mut self) -> Option<(Pair, usize)>;
    /// 将 `pair` 的所有不重叠出现替换为 `new_id`。
    fn merge(&mut self, pair: Pair, new_id: utok);
    fn len(&self) -> usize;
    #[cfg(test)]
    fn symbols(&self) -> Vec<utok>;
}

/// BPE 训练配置。
#[derive(Clone, Debug)]
pub struct Trainer {
    target_vocab_size: usize,
    base_alphabet_size: usize,
    strategy: Strategy,
}

impl Trainer {
    pub fn new(target_vocab_size: usize) -> Self {
        Self {
            target_vocab_size,
            base_alphabet_size: BASE_ALPHABET_SIZE,
            strategy: Strategy::default(),
        }
    }

    pub fn base_alphabet_size(mut self, size: usize) -> Self {
        self.base_alphabet_size = size;
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[inline]
    pub fn target_vocab_size(&self) -> usize {
        self.target_vocab_size
    }

    /// 检查配置是否可用于训练。
    pub fn validate(&self) -> Result<()> {
        check_alphabet(self.base_alphabet_size)?;
        if self.target_vocab_size < self.base_alphabet_size {
            return Err(Error::InvalidConfiguration(format!(
                "target vocabulary size {} is smaller than the base alphabet size {}",
                self.target_vocab_size, self.base_alphabet_size,
            )));
        }
        if self.target_vocab_size > utok::MAX as usize {
            return Err(Error::InvalidConfiguration(format!(
                "target vocabulary size {} exceeds the symbol id space",
                self.target_vocab_size,
            )));
        }
        Ok(())
    }

    pub fn train(&self, text: &[u8]) -> Result<Training> {
        self.train_with(text, |_| ControlFlow::Continue(()))
    }

    /// 训练，并在每次合并后通知 `observer`。
    ///
    /// `observer` 返回 [`ControlFlow::Break`] 时训练立即结束，
    /// 已学到的部分模型照常返回。
    pub fn train_with<F>(&self, text: &[u8], observer: F) -> Result<Training>
    where
        F: FnMut(&MergeEvent) -> ControlFlow<()>,
    {
        self.validate()?;
        let symbols = self.symbols(text)?;
        match self.strategy {
            Strategy::Incremental => self.run(LinkedSequence::new(&symbols), observer),
            Strategy::Recount => self.run(FlatSequence::new(symbols), observer),
        }
    }

    fn symbols(&self, text: &[u8]) -> Result<Vec<utok>> {
        let alphabet = self.base_alphabet_size;
        text.iter()
            .map(|&b| {
                if (b as usize) < alphabet {
                    Ok(b as utok)
                } else {
                    Err(Error::OutOfRangeSymbol {
                        id: b as _,
                        vocab_size: alphabet,
                    })
                }
            })
            .collect()
    }

    fn run<W, F>(&self, mut seq: W, mut observer: F) -> Result<Training>
    where
        W: WorkingSet,
        F: FnMut(&MergeEvent) -> ControlFlow<()>,
    {
        let base = self.base_alphabet_size;
        let requested = self.target_vocab_size - base;
        let mut vocab = Vocabulary::base(base)?;
        let mut rules = MergeRules::new();
        let mut stop = StopReason::TargetReached;

        for iteration in 0..requested {
            let Some((pair, count)) = seq.most_frequent() else {
                stop = StopReason::Exhausted;
                break;
            };
            let new_id = (base + iteration) as utok;
            seq.merge(pair, new_id);
            vocab.extend(new_id, pair.0, pair.1)?;
            rules.record(pair, new_id);
            debug!(
                "merge {}/{requested}: ({}, {}) -> {new_id} had {count} occurrences",
                iteration + 1,
                pair.0,
                pair.1,
            );

            let event = MergeEvent {
                iteration,
                pair,
                new_id,
                count,
                remaining: seq.len(),
            };
            if observer(&event).is_break() && iteration + 1 < requested {
                stop = StopReason::Cancelled;
                break;
            }
        }

        vocab.compact();
        info!(
            "performed {} of {requested} merges ({stop:?}), vocabulary size {}",
            rules.len(),
            vocab.len(),
        );
        Ok(Training {
            model: Bpe::new(vocab, rules),
            requested,
            stop,
        })
    }
}
