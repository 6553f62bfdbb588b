#![deny(warnings)]

mod bpe;
mod error;
mod merge;
mod pair;
mod rules;
mod trainer;
mod vocab;

use rayon::prelude::*;

pub use bpe::{Bpe, MergeState};
pub use error::{Error, Result};
pub use merge::apply_merge;
pub use pair::{count_pairs, par_count_pairs, PairCounts, PairStat};
pub use rules::MergeRules;
pub use trainer::{MergeEvent, StopReason, Strategy, Trainer, Training};
pub use vocab::Vocabulary;

/// `utok` for token id.
#[allow(non_camel_case_types)]
pub type utok = u32;

/// 有序的相邻符号对，`(a, b)` 与 `(b, a)` 不同。
pub type Pair = (utok, utok);

/// 单字节能表示的全部取值。
pub const BASE_ALPHABET_SIZE: usize = 256;

pub trait Method {
    fn vocab_size(&self) -> usize;
    fn encode(&self, text: &[u8]) -> Result<Vec<utok>>;
    fn decode(&self, token: utok) -> Result<&[u8]>;
}

/// 以 256 个字节为基础字母表训练到 `target_vocab_size`。
pub fn train(text: &[u8], target_vocab_size: usize) -> Result<Training> {
    Trainer::new(target_vocab_size).train(text)
}

#[inline]
pub fn encode(text: &[u8], model: &impl Method) -> Result<Vec<utok>> {
    model.encode(text)
}

/// 依次展开每个符号并拼接，遇到词表外的符号立即失败。
pub fn decode(tokens: &[utok], model: &impl Method) -> Result<Vec<u8>> {
    let mut ans = Vec::new();
    for &t in tokens {
        ans.extend_from_slice(model.decode(t)?);
    }
    Ok(ans)
}

/// 并行编码多段互相独立的文本，结果与输入顺序一致。
pub fn encode_batch<M: Method + Sync>(texts: &[&[u8]], model: &M) -> Result<Vec<Vec<utok>>> {
    texts.par_iter().map(|text| model.encode(text)).collect()
}

/// 并行解码多个符号序列，结果与输入顺序一致。
pub fn decode_batch<M: Method + Sync>(seqs: &[&[utok]], model: &M) -> Result<Vec<Vec<u8>>> {
    seqs.par_iter()
        .map(|tokens| decode(tokens, model))
        .collect()
}
