use crate::utok;

/// 分词器训练、编码与解码中可能出现的错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// 训练参数不合法，例如目标词表小于基础字母表。
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// 词表中不存在的符号。
    #[error("symbol {id} is out of range [0, {}]", .vocab_size.saturating_sub(1))]
    OutOfRangeSymbol { id: utok, vocab_size: usize },
    /// 从外部数据重建模型时发现的非法合词规则。
    #[error("merge rule #{index} is invalid: {reason}")]
    InvalidMergeRule { index: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
