use crate::{utok, Pair};

/// 将序列中所有 `pair` 的出现替换为 `merged`。
///
/// 从左到右贪心匹配，匹配到的两个符号被消费，
/// 因此重叠的候选中只有靠左的一个会被替换。
pub fn apply_merge(symbols: &[utok], pair: Pair, merged: utok) -> Vec<utok> {
    let (a, b) = pair;
    let mut ans = Vec::with_capacity(symbols.len());
    let mut rest = symbols;
    loop {
        match *rest {
            [x, y, ref tail @ ..] if x == a && y == b => {
                ans.push(merged);
                rest = tail;
            }
            [x, ref tail @ ..] => {
                ans.push(x);
                rest = tail;
            }
            [] => break ans,
        }
    }
}
