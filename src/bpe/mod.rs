mod algorithm;

pub use algorithm::MergeState;

use crate::{
    error::{Error, Result},
    utok, MergeRules, Method, Pair, Vocabulary,
};
use rustc_hash::FxHashMap;

/// 训练得到的字节级 BPE 模型。
///
/// 词表与合词规则在构造后只读。
#[derive(Clone, Debug)]
pub struct Bpe {
    vocab: Vocabulary,
    rules: MergeRules,
    /// 合词规则的逆映射：pair -> 合并产生的符号
    pair_ids: FxHashMap<Pair, utok>,
}

impl Bpe {
    /// 由训练器调用，词表与规则已经一致。
    pub(crate) fn new(vocab: Vocabulary, rules: MergeRules) -> Self {
        let pair_ids = rules.iter().copied().collect();
        Self {
            vocab,
            rules,
            pair_ids,
        }
    }

    /// 从按学习顺序排列的合词规则重建模型。
    ///
    /// 第 `i` 条规则产生的符号必须是 `base_alphabet_size + i`，
    /// 其两个组成符号必须在此之前已经存在，且同一个符号对只能合并一次。
    pub fn from_merges(
        base_alphabet_size: usize,
        rules: impl IntoIterator<Item = (Pair, utok)>,
    ) -> Result<Self> {
        let mut vocab = Vocabulary::base(base_alphabet_size)?;
        let mut table = MergeRules::new();
        let mut pair_ids = FxHashMap::default();
        for (index, (pair @ (first, second), new_id)) in rules.into_iter().enumerate() {
            let invalid = |reason| Error::InvalidMergeRule { index, reason };

            let expected = base_alphabet_size + index;
            if new_id as usize != expected {
                return Err(invalid(format!("expected symbol {expected}, got {new_id}")));
            }
            if first >= new_id || second >= new_id {
                return Err(invalid(format!(
                    "pair ({first}, {second}) is not defined before symbol {new_id}"
                )));
            }
            if let Some(prev) = pair_ids.insert(pair, new_id) {
                return Err(invalid(format!(
                    "pair ({first}, {second}) is already merged into {prev}"
                )));
            }

            vocab.extend(new_id, first, second)?;
            table.record(pair, new_id);
        }
        vocab.compact();
        Ok(Self {
            vocab,
            rules: table,
            pair_ids,
        })
    }

    #[inline]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    #[inline]
    pub fn merge_rules(&self) -> &MergeRules {
        &self.rules
    }

    #[inline]
    pub fn alphabet_size(&self) -> usize {
        self.vocab.alphabet_size()
    }

    /// pair -> merged symbol
    #[inline]
    fn merged(&self, pair: Pair) -> Option<utok> {
        self.pair_ids.get(&pair).copied()
    }

    /// symbol -> expansion length
    #[inline(always)]
    fn token_len(&self, token: utok) -> usize {
        self.vocab.token_len(token)
    }
}

impl Method for Bpe {
    #[inline]
    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }
    #[inline]
    fn encode(&self, text: &[u8]) -> Result<Vec<utok>> {
        let mut state = self.begin_merge(text)?;
        while state.merge() {}
        Ok(state.into_iter().collect())
    }
    #[inline]
    fn decode(&self, token: utok) -> Result<&[u8]> {
        self.vocab.lookup(token)
    }
}
