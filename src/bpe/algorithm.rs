use super::Bpe;
use crate::{
    error::{Error, Result},
    utok, Pair,
};
use std::{
    cmp::Ordering::{self, Equal},
    collections::BinaryHeap,
    fmt,
};

/// 已被合并进左侧符号的位置。
const CONSUMED: utok = utok::MAX;

pub struct MergeState<'v> {
    bpe: &'v Bpe,
    marks: Vec<Mark>,
    merges: BinaryHeap<Merge>,
}

pub struct IntoIter<'v> {
    bpe: &'v Bpe,
    marks: Vec<Mark>,
    i: usize,
}

pub struct Iter<'a> {
    bpe: &'a Bpe,
    marks: &'a [Mark],
}

impl Bpe {
    /// 将字节序列转换为基础符号，并登记所有可以合并的相邻对。
    pub fn begin_merge<'v>(&'v self, text: &[u8]) -> Result<MergeState<'v>> {
        let alphabet = self.alphabet_size();
        let mut marks = Vec::with_capacity(text.len());
        let mut merges = BinaryHeap::new();

        for (i, &b) in text.iter().enumerate() {
            let token = b as utok;
            if b as usize >= alphabet {
                return Err(Error::OutOfRangeSymbol {
                    id: token,
                    vocab_size: alphabet,
                });
            }
            let back_distance = if i == 0 { 0 } else { 1 };
            if let Some(&Mark { token: last, .. }) = marks.last() {
                if let Some(merge) = self.build_merge(i - 1, (last, token)) {
                    merges.push(merge);
                }
            }
            marks.push(Mark {
                token,
                back_distance,
            });
        }

        Ok(MergeState {
            bpe: self,
            marks,
            merges,
        })
    }

    fn build_merge(&self, pos: usize, pair: Pair) -> Option<Merge> {
        self.merged(pair).map(|merge| Merge { pos, pair, merge })
    }
}

#[derive(Clone, Copy, Debug)]
struct Mark {
    token: utok,
    back_distance: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Merge {
    pos: usize,
    pair: (utok, utok),
    merge: utok,
}
impl Ord for Merge {
    fn cmp(&self, other: &Self) -> Ordering {
        // 比较顺序：merge -> pos -> pair
        // 合并产生的符号号即规则的学习顺序，越早学到越先合并
        match self.merge.cmp(&other.merge) {
            Equal => match self.pos.cmp(&other.pos) {
                Equal => self.pair.cmp(&other.pair),
                other => other,
            },
            other => other,
        }
        .reverse()
    }
}
impl PartialOrd for Merge {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl MergeState<'_> {
    /// 尝试执行一次合并，返回是否成功执行了一次合并。
    ///
    /// 每条规则产生的符号号都大于其组成符号，
    /// 因此合并新产生的相邻对总是排在当前规则之后，
    /// 整个过程等价于按学习顺序逐条规则从左到右扫描全文。
    pub fn merge(&mut self) -> bool {
        // 一次合并将涉及至多 4 个 token：
        //
        // t0 t1 t2 t3
        // -- -- -- --
        //      ↓
        // t0 merge t3
        // -- ----- --
        //
        // 成功的合并将至少消费合并队列中的 1 个项，
        // 同时至多向合并队列添加 2 个项：
        //
        // t0 merge t3
        //    --------
        // --------

        while let Some(Merge {
            pos: p1,
            pair: (t1, t2),
            merge,
        }) = self.merges.pop()
        {
            // 确认合并项有效性
            if self.marks[p1].token != t1 {
                continue;
            }
            let l1 = self.bpe.token_len(t1);
            let p2 = p1 + l1;
            if self.marks.get(p2).is_none_or(|m| m.token != t2) {
                continue;
            }
            // 合并
            self.marks[p1].token = merge;
            self.marks[p2].token = CONSUMED;

            let l2 = self.bpe.token_len(t2);
            let p3 = p2 + l2;
            // 创建 merge + t3 合并项
            if let Some(Mark {
                token,
                back_distance,
            }) = self.marks.get_mut(p3)
            {
                *back_distance = (l1 + l2) as _;
                if let Some(next) = self.bpe.build_merge(p1, (merge, *token)) {
                    self.merges.push(next);
                }
            }
            // 创建 t0 + merge 合并项
            match self.marks[p1].back_distance as usize {
                0 => {}
                l0 => {
                    let p0 = p1 - l0;
                    let t0 = self.marks[p0].token;
                    if let Some(prev) = self.bpe.build_merge(p0, (t0, merge)) {
                        self.merges.push(prev);
                    }
                }
            }
            // 成功合并
            return true;
        }
        false
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            bpe: self.bpe,
            marks: &self.marks,
        }
    }
}

impl<'v> IntoIterator for MergeState<'v> {
    type Item = utok;
    type IntoIter = IntoIter<'v>;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        Self::IntoIter {
            bpe: self.bpe,
            marks: self.marks,
            i: 0,
        }
    }
}

impl Iterator for IntoIter<'_> {
    type Item = utok;

    fn next(&mut self) -> Option<Self::Item> {
        match &self.marks[self.i..] {
            &[Mark { token, .. }, ..] => {
                self.i += self.bpe.token_len(token);
                Some(token)
            }
            [] => None,
        }
    }
}

impl Iterator for Iter<'_> {
    type Item = utok;

    fn next(&mut self) -> Option<Self::Item> {
        match self.marks {
            &[Mark { token, .. }, ref tail @ ..] => {
                self.marks = &tail[self.bpe.token_len(token) - 1..];
                Some(token)
            }
            [] => None,
        }
    }
}

impl fmt::Display for MergeState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---------------------------")?;
        {
            writeln!(f, "tokens:")?;
            for token in self.iter() {
                write!(f, "  {token:>6}: ")?;
                match self.bpe.vocab.lookup(token) {
                    Ok(bytes) => writeln!(f, "{}", bytes.escape_ascii())?,
                    Err(_) => writeln!(f, "{token:?}")?,
                }
            }
        }
        writeln!(f, "---------------------------")?;
        {
            writeln!(f, "merges:")?;
            let mut merges = self.merges.clone();
            while let Some(Merge {
                pos,
                pair: (t1, t2),
                merge,
            }) = merges.pop()
            {
                writeln!(f, "  {merge:>6} <- ({t1}, {t2}) @ {pos}")?;
            }
        }
        writeln!(f, "---------------------------")
    }
}
