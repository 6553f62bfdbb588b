use crate::{utok, Pair};

/// 按学习顺序保存的合词规则。
///
/// 编码时必须按此顺序应用规则，顺序是模型的一部分。
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct MergeRules(Vec<(Pair, utok)>);

impl MergeRules {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条规则，新符号号必须严格递增。
    pub fn record(&mut self, pair: Pair, new_id: utok) {
        if let Some(&(_, last)) = self.0.last() {
            assert!(
                new_id > last,
                "merge rule ids must increase: {new_id} after {last}"
            );
        }
        self.0.push((pair, new_id));
    }

    /// 按学习顺序遍历规则，可重复调用。
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, (Pair, utok)> {
        self.0.iter()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<(Pair, utok)> {
        self.0.get(index).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a MergeRules {
    type Item = &'a (Pair, utok);
    type IntoIter = std::slice::Iter<'a, (Pair, utok)>;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_learned_order() {
        let mut rules = MergeRules::new();
        rules.record((97, 97), 256);
        rules.record((256, 97), 257);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.get(1), Some(((256, 97), 257)));
        // 可重复遍历
        for _ in 0..2 {
            let ids = rules.iter().map(|&(_, id)| id).collect::<Vec<_>>();
            assert_eq!(ids, [256, 257]);
        }
    }

    #[test]
    #[should_panic(expected = "must increase")]
    fn rejects_non_increasing_ids() {
        let mut rules = MergeRules::new();
        rules.record((1, 2), 300);
        rules.record((3, 4), 300);
    }
}
