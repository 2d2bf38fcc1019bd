use serde::Serialize;
use std::collections::HashSet;
use std::hash::{BuildHasher, Hash};

use similaritem::SimilarityReport;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricResult {
    pub precision: f64,
    pub recall: f64,
    pub fscore: f64,
}

fn fscore(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 / (1.0 / precision + 1.0 / recall)
}

/// Precision and recall of `found` against `reference`.
/// Returns `None` when both sets are empty.
pub fn evaluate<T: Eq + Hash, S: BuildHasher>(
    found: &HashSet<T, S>,
    reference: &HashSet<T, S>,
) -> Option<MetricResult> {
    if found.is_empty() && reference.is_empty() {
        return None;
    }
    let intersection = reference.iter().filter(|i| found.contains(*i)).count() as f64;
    let precision = if found.is_empty() { 0.0 } else { intersection / found.len() as f64 };
    let recall = if reference.is_empty() { 1.0 } else { intersection / reference.len() as f64 };
    Some(MetricResult {
        precision,
        recall,
        fscore: fscore(precision, recall),
    })
}

/// Quality of the LSH result against the pairs whose exact jaccard
/// similarity reaches the threshold.
pub fn lsh_quality(report: &SimilarityReport) -> Option<MetricResult> {
    let found: HashSet<(&str, &str)> = report
        .similar
        .iter()
        .map(|s| (s.a.as_str(), s.b.as_str()))
        .collect();
    let reference: HashSet<(&str, &str)> = report
        .jaccard
        .iter()
        .filter(|s| s.score >= report.config.threshold)
        .map(|s| (s.a.as_str(), s.b.as_str()))
        .collect();
    evaluate(&found, &reference)
}
