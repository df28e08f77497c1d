//! Market basket analysis
//!
//! Transaction-level rows are grouped into baskets, mined for frequent
//! itemsets and turned into association rules.

use crate::config::BasketConfig;
use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::ml::association::AssociationRule;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Headline numbers of a rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketSummary {
    pub total_rules: usize,
    /// Mean lift over all rules, 0 when there are none
    pub avg_lift: f64,
    /// Strongest rules by lift
    pub top_associations: Vec<AssociationRule>,
}

impl BasketSummary {
    pub fn from_rules(rules: &[AssociationRule], top_n: usize) -> Self {
        let avg_lift = if rules.is_empty() {
            0.0
        } else {
            rules.iter().map(|r| r.lift).sum::<f64>() / rules.len() as f64
        };
        Self {
            total_rules: rules.len(),
            avg_lift,
            top_associations: rules.iter().take(top_n).cloned().collect(),
        }
    }
}

/// Rules sorted by descending lift plus their summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketAnalysis {
    pub rules: Vec<AssociationRule>,
    pub summary: BasketSummary,
    pub n_transactions: usize,
    pub n_items: usize,
}

/// Group item rows by transaction id, in order of first appearance.
///
/// Rows missing either value are skipped and an item bought twice in one
/// transaction is counted once.
pub fn group_transactions(
    df: &DataFrame,
    item_column: &str,
    transaction_column: &str,
) -> Result<Vec<Vec<String>>> {
    let items = df.string_values(item_column)?;
    let transactions = df.string_values(transaction_column)?;

    let mut position: HashMap<String, usize> = HashMap::new();
    let mut baskets: Vec<BTreeSet<String>> = Vec::new();
    let mut skipped = 0usize;
    for (item, transaction) in items.into_iter().zip(transactions) {
        let (Some(item), Some(transaction)) = (item, transaction) else {
            skipped += 1;
            continue;
        };
        let slot = *position.entry(transaction).or_insert_with(|| {
            baskets.push(BTreeSet::new());
            baskets.len() - 1
        });
        baskets[slot].insert(item);
    }

    if skipped > 0 {
        log::warn!(skipped = skipped; "rows without an item or transaction id were skipped");
    }
    Ok(baskets.into_iter().map(|b| b.into_iter().collect()).collect())
}

#[cfg(feature = "association-rules")]
pub(crate) fn mine(
    baskets: &[Vec<String>],
    min_support: f64,
    config: &BasketConfig,
    cancel: &CancellationToken,
) -> Result<BasketAnalysis> {
    use crate::ml::association::{association_rules, Apriori, OneHotTransactions};

    let data = OneHotTransactions::encode(baskets);
    let mut apriori = Apriori::new().with_min_support(min_support);
    if let Some(max_len) = config.max_len {
        apriori = apriori.with_max_len(max_len);
    }
    let itemsets = apriori.frequent_itemsets(&data, cancel)?;
    // Rules below lift 1.0 are never reported
    let rules = association_rules(&data, &itemsets, config.min_lift.max(1.0));

    Ok(BasketAnalysis {
        summary: BasketSummary::from_rules(&rules, config.top_n),
        rules,
        n_transactions: data.n_transactions(),
        n_items: data.items().len(),
    })
}

#[cfg(not(feature = "association-rules"))]
pub(crate) fn mine(
    _baskets: &[Vec<String>],
    _min_support: f64,
    _config: &BasketConfig,
    _cancel: &CancellationToken,
) -> Result<BasketAnalysis> {
    Err(Error::DependencyUnavailable(
        "frequent itemset mining requires the `association-rules` feature".into(),
    ))
}

pub(crate) fn check_min_support(min_support: f64) -> Result<()> {
    if !(min_support > 0.0 && min_support <= 1.0) {
        return Err(Error::InvalidInput(format!(
            "min_support must be in (0, 1], got {}",
            min_support
        )));
    }
    Ok(())
}
