//! Association rule mining
//!
//! Transactions are one-hot encoded into one bitmask per item (bit `t` set
//! when transaction `t` contains the item), so the support of an itemset is
//! the population count of the AND of its item masks. Every frequent itemset
//! of two or more items yields one rule per non-empty proper subset.
//!
//! The frequent itemset miner lives in [`apriori`] and is only compiled with
//! the `association-rules` feature.

#[cfg(feature = "association-rules")]
pub mod apriori;

use crate::column::BitMask;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

#[cfg(feature = "association-rules")]
pub use apriori::Apriori;

/// One-hot encoded transactions over a sorted item universe
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotTransactions {
    items: Vec<String>,
    columns: Vec<BitMask>,
    n_transactions: usize,
}

impl OneHotTransactions {
    /// Encode transactions; repeated items within a transaction count once
    pub fn encode<S: AsRef<str>>(transactions: &[Vec<S>]) -> Self {
        let universe: BTreeSet<&str> = transactions
            .iter()
            .flatten()
            .map(|item| item.as_ref())
            .collect();
        let items: Vec<String> = universe.iter().map(|s| s.to_string()).collect();
        let position: HashMap<&str, usize> =
            universe.iter().enumerate().map(|(i, s)| (*s, i)).collect();

        let mut columns = vec![BitMask::zeros(transactions.len()); items.len()];
        for (t, transaction) in transactions.iter().enumerate() {
            for item in transaction {
                columns[position[item.as_ref()]].set(t);
            }
        }

        Self {
            items,
            columns,
            n_transactions: transactions.len(),
        }
    }

    /// Item names in encoding order
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn n_transactions(&self) -> usize {
        self.n_transactions
    }

    /// Whether transaction `t` contains item `item`
    pub fn contains(&self, t: usize, item: usize) -> bool {
        self.columns.get(item).is_some_and(|mask| mask.get(t))
    }

    fn support_of(&self, mask: &BitMask) -> f64 {
        mask.count_ones() as f64 / self.n_transactions as f64
    }
}

/// An itemset whose support reached the minimum, as sorted item positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentItemset {
    pub items: Vec<usize>,
    pub support: f64,
}

/// Association rule: antecedent => consequent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    /// Items in the antecedent (left side), sorted
    pub antecedent: Vec<String>,
    /// Items in the consequent (right side), sorted
    pub consequent: Vec<String>,
    /// Support: P(antecedent ∪ consequent)
    pub support: f64,
    /// Confidence: P(consequent | antecedent) = support / P(antecedent)
    pub confidence: f64,
    /// Lift: confidence / P(consequent)
    pub lift: f64,
}

/// Derive rules with `lift >= min_lift` from frequent itemsets, sorted by
/// descending lift (then descending support, then antecedent)
pub fn association_rules(
    data: &OneHotTransactions,
    itemsets: &[FrequentItemset],
    min_lift: f64,
) -> Vec<AssociationRule> {
    let support: HashMap<&[usize], f64> = itemsets
        .iter()
        .map(|set| (set.items.as_slice(), set.support))
        .collect();
    let names = |items: &[usize]| -> Vec<String> {
        items.iter().map(|&i| data.items[i].clone()).collect()
    };

    let mut rules = Vec::new();
    for itemset in itemsets.iter().filter(|s| s.items.len() >= 2) {
        let n = itemset.items.len();
        for subset in 1..(1u64 << n) - 1 {
            let mut antecedent = Vec::new();
            let mut consequent = Vec::new();
            for (j, &item) in itemset.items.iter().enumerate() {
                if subset & (1 << j) != 0 {
                    antecedent.push(item);
                } else {
                    consequent.push(item);
                }
            }

            // Subsets of a frequent itemset are frequent themselves
            let (Some(&antecedent_support), Some(&consequent_support)) = (
                support.get(antecedent.as_slice()),
                support.get(consequent.as_slice()),
            ) else {
                continue;
            };

            let confidence = itemset.support / antecedent_support;
            let lift = confidence / consequent_support;
            if lift >= min_lift {
                rules.push(AssociationRule {
                    antecedent: names(&antecedent),
                    consequent: names(&consequent),
                    support: itemset.support,
                    confidence,
                    lift,
                });
            }
        }
    }

    rules.sort_by(compare_rules);
    rules
}

fn compare_rules(a: &AssociationRule, b: &AssociationRule) -> Ordering {
    b.lift
        .total_cmp(&a.lift)
        .then_with(|| b.support.total_cmp(&a.support))
        .then_with(|| a.antecedent.cmp(&b.antecedent))
        .then_with(|| a.consequent.cmp(&b.consequent))
}
