//! Customer segmentation
//!
//! Rows are imputed with column means, standardized and clustered with
//! K-means. Each cluster is then summarised on the raw feature values and a
//! [`SegmentLabeler`] gives it a readable name. The labeler is a strategy:
//! [`RfmLabeler`] applies to recency/frequency/monetary data and
//! [`OrdinalLabeler`] names segments by size rank.

use crate::config::SegmentationConfig;
use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use crate::dataframe::DataFrame;
use crate::ml::clustering::KMeans;
use crate::ml::preprocessing::{MeanImputer, StandardScaler};
use crate::stats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Mean, median, minimum and maximum of one feature within a segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl FeatureStats {
    /// Summary of observed values, `None` when there are none
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mean = stats::mean(values).ok()?;
        let median = stats::median(values).ok()?;
        Some(Self {
            mean,
            median,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Aggregate view of one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    /// Cluster id as written to the `segment` column
    pub segment: usize,
    /// Position when segments are ordered by size, largest first (ties by id)
    pub rank: usize,
    pub name: String,
    pub size: usize,
    /// Share of all rows, in percent
    pub percentage: f64,
    /// Statistics per clustering feature, in feature order. `None` when the
    /// segment holds no observed value of that feature.
    pub features: Vec<(String, Option<FeatureStats>)>,
}

impl SegmentProfile {
    pub fn feature(&self, name: &str) -> Option<&FeatureStats> {
        self.features
            .iter()
            .find(|(feature, _)| feature == name)
            .and_then(|(_, stats)| stats.as_ref())
    }

    pub fn mean_of(&self, name: &str) -> Option<f64> {
        self.feature(name).map(|s| s.mean)
    }
}

/// Names a segment from its profile
pub trait SegmentLabeler: fmt::Debug + Send + Sync {
    /// Called once per profile after ranks have been assigned
    fn label(&self, profile: &SegmentProfile) -> String;
}

/// Decision rules over recency, frequency and monetary means
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmLabeler {
    pub vip_frequency: f64,
    pub vip_monetary: f64,
    pub regular_frequency: f64,
    pub regular_monetary: f64,
    /// Mean recency (days) below which a segment counts as recent
    pub recent_days: f64,
}

impl Default for RfmLabeler {
    fn default() -> Self {
        Self {
            vip_frequency: 10.0,
            vip_monetary: 1000.0,
            regular_frequency: 5.0,
            regular_monetary: 500.0,
            recent_days: 30.0,
        }
    }
}

impl RfmLabeler {
    pub const FEATURES: [&'static str; 3] = ["recency", "frequency", "monetary"];

    /// Whether the clustering features are exactly the RFM columns
    pub fn matches(features: &[String]) -> bool {
        let given: BTreeSet<&str> = features.iter().map(String::as_str).collect();
        features.len() == Self::FEATURES.len()
            && given == Self::FEATURES.iter().copied().collect::<BTreeSet<_>>()
    }
}

impl SegmentLabeler for RfmLabeler {
    fn label(&self, profile: &SegmentProfile) -> String {
        // An empty segment has no means; it falls through to "Occasional"
        let frequency = profile.mean_of("frequency").unwrap_or(0.0);
        let monetary = profile.mean_of("monetary").unwrap_or(0.0);
        let recency = profile.mean_of("recency").unwrap_or(f64::INFINITY);

        let name = if frequency > self.vip_frequency && monetary > self.vip_monetary {
            "VIP"
        } else if frequency > self.regular_frequency && monetary > self.regular_monetary {
            "Regular"
        } else if recency < self.recent_days {
            "Recent"
        } else {
            "Occasional"
        };
        name.to_string()
    }
}

/// "Segment 1", "Segment 2", ... by size rank
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrdinalLabeler;

impl SegmentLabeler for OrdinalLabeler {
    fn label(&self, profile: &SegmentProfile) -> String {
        format!("Segment {}", profile.rank + 1)
    }
}

/// Labeler used when the engine has none configured
pub fn default_labeler(features: &[String]) -> Box<dyn SegmentLabeler> {
    if RfmLabeler::matches(features) {
        Box::new(RfmLabeler::default())
    } else {
        Box::new(OrdinalLabeler)
    }
}

/// Output of a segmentation run
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationResult {
    /// Input rows plus `segment` (Int64) and `segment_name` (String)
    pub frame: DataFrame,
    /// One profile per cluster, ordered by cluster id
    pub profiles: Vec<SegmentProfile>,
    /// Within-cluster sum of squares in standardized space
    pub inertia: f64,
    pub n_iter: usize,
}

impl SegmentationResult {
    pub fn profile(&self, segment: usize) -> Option<&SegmentProfile> {
        self.profiles.get(segment)
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.profiles.iter().map(|p| p.size).collect()
    }
}

/// Cluster assignments plus unlabeled profiles
pub(crate) struct Clustering {
    pub labels: Vec<usize>,
    pub profiles: Vec<SegmentProfile>,
    pub inertia: f64,
    pub n_iter: usize,
}

/// Impute, standardize and cluster raw feature rows, then profile the clusters
pub(crate) fn cluster_rows(
    features: &[String],
    raw: &[Vec<Option<f64>>],
    k: usize,
    config: &SegmentationConfig,
    labeler: &dyn SegmentLabeler,
    cancel: &CancellationToken,
) -> Result<Clustering> {
    if features.is_empty() {
        return Err(Error::InvalidInput(
            "at least one feature is required for segmentation".into(),
        ));
    }
    if k == 0 {
        return Err(Error::InvalidInput("number of segments must be positive".into()));
    }
    if raw.len() < k {
        return Err(Error::InsufficientData(format!(
            "{} rows cannot form {} segments",
            raw.len(),
            k
        )));
    }

    let filled = MeanImputer::new().fit_transform(features, raw)?;
    let scaled = StandardScaler::new().fit_transform(&filled)?;

    let mut kmeans = KMeans::new(k)
        .max_iter(config.max_iter)
        .tol(config.tol)
        .random_seed(config.random_seed);
    kmeans.fit(&scaled, cancel)?;
    let labels = kmeans
        .labels
        .clone()
        .ok_or_else(|| Error::Analysis("K-means produced no assignments".into()))?;

    let mut profiles = build_profiles(features, raw, &labels, k);
    rank_profiles(&mut profiles);
    for profile in profiles.iter_mut() {
        profile.name = labeler.label(profile);
    }

    Ok(Clustering {
        labels,
        profiles,
        inertia: kmeans.inertia.unwrap_or(0.0),
        n_iter: kmeans.n_iter,
    })
}

/// Per-cluster statistics over the observed (unimputed) values
fn build_profiles(
    features: &[String],
    raw: &[Vec<Option<f64>>],
    labels: &[usize],
    k: usize,
) -> Vec<SegmentProfile> {
    let total = labels.len();
    (0..k)
        .map(|segment| {
            let members: Vec<&Vec<Option<f64>>> = raw
                .iter()
                .zip(labels)
                .filter(|(_, &label)| label == segment)
                .map(|(row, _)| row)
                .collect();

            let features = features
                .iter()
                .enumerate()
                .map(|(j, name)| {
                    let observed: Vec<f64> = members.iter().filter_map(|row| row[j]).collect();
                    (name.clone(), FeatureStats::from_values(&observed))
                })
                .collect();

            SegmentProfile {
                segment,
                rank: segment,
                name: String::new(),
                size: members.len(),
                percentage: if total == 0 {
                    0.0
                } else {
                    members.len() as f64 / total as f64 * 100.0
                },
                features,
            }
        })
        .collect()
}

fn rank_profiles(profiles: &mut [SegmentProfile]) {
    let mut order: Vec<usize> = (0..profiles.len()).collect();
    order.sort_by(|&a, &b| {
        profiles[b]
            .size
            .cmp(&profiles[a].size)
            .then(profiles[a].segment.cmp(&profiles[b].segment))
    });
    for (rank, index) in order.into_iter().enumerate() {
        profiles[index].rank = rank;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn profile(means: &[(&str, f64)], rank: usize) -> SegmentProfile {
        SegmentProfile {
            segment: 0,
            rank,
            name: String::new(),
            size: 1,
            percentage: 100.0,
            features: means
                .iter()
                .map(|(name, mean)| (name.to_string(), FeatureStats::from_values(&[*mean])))
                .collect(),
        }
    }

    #[test]
    fn test_rfm_schema_detection() {
        assert!(RfmLabeler::matches(&names(&["monetary", "recency", "frequency"])));
        assert!(!RfmLabeler::matches(&names(&["recency", "frequency"])));
        assert!(!RfmLabeler::matches(&names(&["recency", "frequency", "monetary", "age"])));
        assert!(!RfmLabeler::matches(&names(&["recency", "recency", "frequency"])));
    }

    #[test]
    fn test_rfm_rules() {
        let labeler = RfmLabeler::default();
        let vip = profile(&[("recency", 90.0), ("frequency", 12.0), ("monetary", 1500.0)], 0);
        let regular = profile(&[("recency", 90.0), ("frequency", 7.0), ("monetary", 600.0)], 0);
        let recent = profile(&[("recency", 10.0), ("frequency", 2.0), ("monetary", 50.0)], 0);
        let occasional = profile(&[("recency", 60.0), ("frequency", 2.0), ("monetary", 50.0)], 0);
        assert_eq!(labeler.label(&vip), "VIP");
        assert_eq!(labeler.label(&regular), "Regular");
        assert_eq!(labeler.label(&recent), "Recent");
        assert_eq!(labeler.label(&occasional), "Occasional");

        // Frequency alone is not enough for VIP
        let heavy_but_cheap =
            profile(&[("recency", 90.0), ("frequency", 20.0), ("monetary", 800.0)], 0);
        assert_eq!(labeler.label(&heavy_but_cheap), "Regular");
    }

    #[test]
    fn test_ordinal_names_follow_rank() {
        assert_eq!(OrdinalLabeler.label(&profile(&[], 0)), "Segment 1");
        assert_eq!(OrdinalLabeler.label(&profile(&[], 2)), "Segment 3");
    }

    #[test]
    fn test_feature_stats() {
        let stats = FeatureStats::from_values(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!(FeatureStats::from_values(&[]).is_none());
    }

    #[test]
    fn test_ranks_by_size_then_id() {
        let features = names(&["x"]);
        let raw: Vec<Vec<Option<f64>>> = (0..6).map(|i| vec![Some(i as f64)]).collect();
        let labels = vec![2, 2, 0, 1, 1, 2];
        let mut profiles = build_profiles(&features, &raw, &labels, 3);
        rank_profiles(&mut profiles);

        assert_eq!(profiles.iter().map(|p| p.size).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(profiles.iter().map(|p| p.rank).collect::<Vec<_>>(), vec![2, 1, 0]);
        assert_eq!(profiles[2].feature("x").unwrap().max, 5.0);
        assert!((profiles[2].percentage - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_names_attach_to_their_cluster() {
        let features = names(&["recency", "frequency", "monetary"]);
        let mut raw = Vec::new();
        for _ in 0..6 {
            raw.push(vec![Some(80.0), Some(1.0), Some(40.0)]);
        }
        for _ in 0..3 {
            raw.push(vec![Some(5.0), Some(20.0), Some(5000.0)]);
        }
        let clustering = cluster_rows(
            &features,
            &raw,
            2,
            &SegmentationConfig::default(),
            &RfmLabeler::default(),
            &CancellationToken::new(),
        )
        .unwrap();

        let vip_cluster = clustering.labels[6];
        let other_cluster = clustering.labels[0];
        assert_ne!(vip_cluster, other_cluster);
        assert_eq!(clustering.profiles[vip_cluster].name, "VIP");
        assert_eq!(clustering.profiles[vip_cluster].size, 3);
        assert_eq!(clustering.profiles[other_cluster].name, "Occasional");
        assert_eq!(clustering.profiles[other_cluster].rank, 0);
    }

    #[test]
    fn test_rejects_degenerate_requests() {
        let config = SegmentationConfig::default();
        let token = CancellationToken::new();
        let raw = vec![vec![Some(1.0)], vec![Some(2.0)]];
        let features = names(&["x"]);
        assert!(matches!(
            cluster_rows(&features, &raw, 0, &config, &OrdinalLabeler, &token),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            cluster_rows(&features, &raw, 3, &config, &OrdinalLabeler, &token),
            Err(Error::InsufficientData(_))
        ));
        assert!(matches!(
            cluster_rows(&[], &raw, 1, &config, &OrdinalLabeler, &token),
            Err(Error::InvalidInput(_))
        ));
    }
}
