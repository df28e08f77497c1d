//! Apriori frequent itemset mining

use super::{FrequentItemset, OneHotTransactions};
use crate::column::BitMask;
use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use std::collections::HashSet;

/// Apriori frequent itemset miner
#[derive(Debug, Clone, PartialEq)]
pub struct Apriori {
    min_support: f64,
    max_len: Option<usize>,
}

impl Default for Apriori {
    fn default() -> Self {
        Self::new()
    }
}

impl Apriori {
    pub fn new() -> Self {
        Self {
            min_support: 0.01,
            max_len: None,
        }
    }

    pub fn with_min_support(mut self, min_support: f64) -> Self {
        self.min_support = min_support;
        self
    }

    /// Largest itemset size to mine
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// Mine all itemsets with support `>= min_support`, smallest first
    pub fn frequent_itemsets(
        &self,
        data: &OneHotTransactions,
        cancel: &CancellationToken,
    ) -> Result<Vec<FrequentItemset>> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "min_support must be in (0, 1], got {}",
                self.min_support
            )));
        }
        if data.n_transactions == 0 {
            return Err(Error::InsufficientData(
                "no transactions to mine".into(),
            ));
        }

        let max_len = self.max_len.unwrap_or(usize::MAX);
        let mut level: Vec<(Vec<usize>, BitMask)> = data
            .columns
            .iter()
            .enumerate()
            .filter(|(_, mask)| data.support_of(mask) >= self.min_support)
            .map(|(i, mask)| (vec![i], mask.clone()))
            .collect();

        let mut frequent = Vec::new();
        let mut size = 1;
        while !level.is_empty() && size <= max_len {
            cancel.check()?;
            frequent.extend(level.iter().map(|(items, mask)| FrequentItemset {
                items: items.clone(),
                support: data.support_of(mask),
            }));
            if size == max_len {
                break;
            }
            level = self.next_level(data, &level);
            size += 1;
        }

        log::debug!(itemsets = frequent.len(), largest = size; "apriori finished");
        Ok(frequent)
    }

    /// Join itemsets sharing all but their last item, prune candidates with an
    /// infrequent subset and keep those reaching the minimum support
    fn next_level(
        &self,
        data: &OneHotTransactions,
        level: &[(Vec<usize>, BitMask)],
    ) -> Vec<(Vec<usize>, BitMask)> {
        let known: HashSet<&[usize]> = level.iter().map(|(items, _)| items.as_slice()).collect();
        let mut next = Vec::new();

        for (i, (left, left_mask)) in level.iter().enumerate() {
            for (right, _) in &level[i + 1..] {
                let prefix = left.len() - 1;
                if left[..prefix] != right[..prefix] {
                    continue;
                }
                let (a, b) = (left[prefix], right[prefix]);
                let mut candidate = left[..prefix].to_vec();
                candidate.push(a.min(b));
                candidate.push(a.max(b));

                let all_subsets_frequent = (0..candidate.len()).all(|skip| {
                    let subset: Vec<usize> = candidate
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != skip)
                        .map(|(_, &item)| item)
                        .collect();
                    known.contains(subset.as_slice())
                });
                if !all_subsets_frequent {
                    continue;
                }

                let mask = left_mask.and(&data.columns[b]);
                if data.support_of(&mask) >= self.min_support {
                    next.push((candidate, mask));
                }
            }
        }

        next.sort_by(|x, y| x.0.cmp(&y.0));
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::association::association_rules;
    use crate::ml::association::tests::baskets;

    #[test]
    fn test_frequent_itemsets() {
        let data = OneHotTransactions::encode(&baskets());
        let itemsets = Apriori::new()
            .with_min_support(0.4)
            .frequent_itemsets(&data, &CancellationToken::new())
            .unwrap();

        let found: Vec<(Vec<usize>, f64)> =
            itemsets.iter().map(|s| (s.items.clone(), s.support)).collect();
        // eggs (index 2) appears once and is dropped
        assert_eq!(
            found,
            vec![
                (vec![0], 0.8),
                (vec![1], 0.6),
                (vec![3], 0.8),
                (vec![0, 1], 0.6),
                (vec![0, 3], 0.6),
                (vec![1, 3], 0.4),
                (vec![0, 1, 3], 0.4),
            ]
        );
    }

    #[test]
    fn test_max_len_limits_itemsets() {
        let data = OneHotTransactions::encode(&baskets());
        let itemsets = Apriori::new()
            .with_min_support(0.2)
            .with_max_len(1)
            .frequent_itemsets(&data, &CancellationToken::new())
            .unwrap();
        assert!(itemsets.iter().all(|s| s.items.len() == 1));
        assert_eq!(itemsets.len(), 4);
    }

    #[test]
    fn test_mined_rules_are_sorted_by_lift() {
        let data = OneHotTransactions::encode(&baskets());
        let itemsets = Apriori::new()
            .with_min_support(0.4)
            .frequent_itemsets(&data, &CancellationToken::new())
            .unwrap();
        let rules = association_rules(&data, &itemsets, 0.0);

        let butter_bread = rules
            .iter()
            .find(|r| r.antecedent == ["butter"] && r.consequent == ["bread"])
            .unwrap();
        assert!((butter_bread.support - 0.6).abs() < 1e-12);
        assert!((butter_bread.lift - 1.25).abs() < 1e-12);
        assert!(rules.windows(2).all(|w| w[0].lift >= w[1].lift));
    }

    #[test]
    fn test_invalid_support_and_empty_input() {
        let data = OneHotTransactions::encode(&baskets());
        let token = CancellationToken::new();
        assert!(matches!(
            Apriori::new().with_min_support(0.0).frequent_itemsets(&data, &token),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Apriori::new().with_min_support(1.5).frequent_itemsets(&data, &token),
            Err(Error::InvalidInput(_))
        ));
        let empty = OneHotTransactions::encode::<&str>(&[]);
        assert!(matches!(
            Apriori::new().frequent_itemsets(&empty, &token),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_cancelled_mining() {
        let data = OneHotTransactions::encode(&baskets());
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            Apriori::new().frequent_itemsets(&data, &token),
            Err(Error::Cancelled(_))
        ));
    }
}
