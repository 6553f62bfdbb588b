//! 词表：符号到其字节展开的映射。

use crate::{
    error::{Error, Result},
    utok, BASE_ALPHABET_SIZE,
};
use std::cmp::Reverse;

/// 按词序保存每个符号展开后的字节序列。
///
/// 所有内容连续存放在一块缓存中，每个符号只记录偏移和长度。
/// 基础字母表中的符号 `i` 展开为单字节 `i`，
/// 合并产生的符号展开为两个组成符号的展开之连接。
#[derive(Clone, Debug)]
pub struct Vocabulary {
    /// 词表字符内容缓存
    text: Vec<u8>,
    /// 按词序保存 (偏移, 长度)
    slices: Vec<(usize, usize)>,
    /// 基础字母表大小
    alphabet: usize,
}

impl Vocabulary {
    /// 构造只含基础字母表的词表。
    pub fn base(alphabet_size: usize) -> Result<Self> {
        check_alphabet(alphabet_size)?;
        Ok(Self {
            text: BYTES[..alphabet_size].to_vec(),
            slices: (0..alphabet_size).map(|i| (i, 1)).collect(),
            alphabet: alphabet_size,
        })
    }

    /// 追加合并符号 `new_id`，其展开为 `first` 与 `second` 的展开之连接。
    ///
    /// `new_id` 必须是下一个空闲的符号号，否则视为调用方的逻辑错误。
    pub fn extend(&mut self, new_id: utok, first: utok, second: utok) -> Result<()> {
        assert_eq!(
            new_id as usize,
            self.slices.len(),
            "symbol {new_id} is not the next free id"
        );
        let (off1, len1) = self.slice(first)?;
        let (off2, len2) = self.slice(second)?;
        let off = self.text.len();
        self.text.extend_from_within(off1..off1 + len1);
        self.text.extend_from_within(off2..off2 + len2);
        self.slices.push((off, len1 + len2));
        Ok(())
    }

    /// symbol -> bytes
    #[inline]
    pub fn lookup(&self, id: utok) -> Result<&[u8]> {
        self.slice(id).map(|(off, len)| &self.text[off..][..len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    #[inline]
    pub fn alphabet_size(&self) -> usize {
        self.alphabet
    }

    /// 缓存占用的字节数。
    #[inline]
    pub fn storage_len(&self) -> usize {
        self.text.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.slices
            .iter()
            .map(|&(off, len)| &self.text[off..][..len])
    }

    /// 利用词表中的重复部分压缩缓存。
    ///
    /// 合并符号的展开总是其他展开的连接，大量内容互为子串，
    /// 压缩后每段内容只存储一次。
    ///
    /// 多字节内容在已压缩的缓存中做子串查找，耗时约为 O(词表大小 × 缓存长度)，
    /// 单字节内容直接查表。
    pub fn compact(&mut self) {
        let before = self.text.len();
        let mut text_buf = Vec::<u8>::with_capacity(before);
        let mut slices = vec![(0usize, 0usize); self.slices.len()];
        let mut indices = (0..self.slices.len()).collect::<Vec<_>>();
        // 按内容长度从长到短排序，短的内容有可能是长内容的子串
        indices.sort_by_key(|&i| Reverse(self.slices[i].1));
        // 每个字节在缓存中首次出现的位置
        let mut byte_pos = [None::<usize>; 256];
        for i in indices {
            let (off, len) = self.slices[i];
            let piece = &self.text[off..][..len];
            // 查找子串，若存在则复用，否则将新的内容追加到缓存
            let found = match piece {
                [b] => byte_pos[*b as usize],
                _ => memchr::memmem::find(&text_buf, piece),
            };
            let off = match found {
                Some(off) => off,
                None => {
                    let off = text_buf.len();
                    text_buf.extend_from_slice(piece);
                    for (j, &b) in piece.iter().enumerate() {
                        byte_pos[b as usize].get_or_insert(off + j);
                    }
                    off
                }
            };
            slices[i] = (off, len);
        }
        text_buf.shrink_to_fit();
        log::debug!(
            "compacted vocabulary of {} symbols from {before} to {} bytes",
            slices.len(),
            text_buf.len(),
        );
        self.text = text_buf;
        self.slices = slices;
    }

    /// 仅供已校验过的符号使用。
    #[inline(always)]
    pub(crate) fn token_len(&self, id: utok) -> usize {
        self.slices[id as usize].1
    }

    #[inline]
    fn slice(&self, id: utok) -> Result<(usize, usize)> {
        self.slices
            .get(id as usize)
            .copied()
            .ok_or(Error::OutOfRangeSymbol {
                id,
                vocab_size: self.slices.len(),
            })
    }
}

/// 基础字母表必须能由单字节表示。
pub(crate) fn check_alphabet(size: usize) -> Result<()> {
    if (1..=BASE_ALPHABET_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "base alphabet size must be within 1..={BASE_ALPHABET_SIZE}, got {size}"
        )))
    }
}

const BYTES: [u8; 256] = {
    let mut bytes = [0u8; 256];
    let mut i = 0usize;
    while i < 256 {
        bytes[i] = i as _;
        i += 1;
    }
    bytes
};
