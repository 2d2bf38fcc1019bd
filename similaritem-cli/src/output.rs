use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use std::time::Duration;

use similaritem::{ResultClass, ResultSink, SimilarityReport, SimilarityScore, StageTimings};

use crate::metrics::MetricResult;

/// Renders a report as plain text, one tab separated line per pair.
pub struct TextSink<'a> {
    report: &'a SimilarityReport,
    out: String,
}

impl<'a> TextSink<'a> {
    pub fn new(report: &'a SimilarityReport) -> Self {
        TextSink {
            report,
            out: String::new(),
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn header(&self, class: ResultClass) -> String {
        let config = &self.report.config;
        let timings = &self.report.timings;
        match class {
            ResultClass::Jaccard => format!(
                "Jaccard similarities of the k={} shingles of all pairs of documents, found in {} seconds:",
                config.shingle_size,
                seconds(timings.jaccard)
            ),
            ResultClass::Signature => format!(
                "Signature similarities of the n={} sized signatures of all pairs of documents, found in {} seconds:",
                config.signature_size,
                seconds(timings.signature_comparison)
            ),
            ResultClass::Lsh => format!(
                "Document pairs found similar using LSH with a threshold of {} in {} seconds:",
                config.threshold,
                seconds(timings.lsh)
            ),
        }
    }
}

impl<'a> ResultSink for TextSink<'a> {
    fn begin_class(&mut self, class: ResultClass, len: usize) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        let header = self.header(class);
        self.out.push_str(&header);
        self.out.push('\n');
        if len == 0 && class == ResultClass::Lsh {
            self.out.push_str("None\n");
        }
    }

    fn accept(&mut self, _class: ResultClass, score: &SimilarityScore<String>) {
        let _ = writeln!(self.out, "{} \t - {}: \t {}", score.a, score.b, score.score);
    }
}

fn seconds(duration: Duration) -> String {
    format!("{:.6}", duration.as_secs_f64())
}

/// The per-stage timing table.
pub fn timing_summary(timings: &StageTimings) -> String {
    let mut out = String::from("Summary for times:\n");
    for (stage, duration) in timings.stages() {
        let _ = writeln!(out, "{:<22}{}", format!("{}:", stage), seconds(duration));
    }
    out.push_str("-------------------------------------\n");
    let _ = writeln!(out, "{:<22}{}", "Total:", seconds(timings.total()));
    out
}

/// Banding parameters, candidate count and LSH quality.
pub fn lsh_summary(report: &SimilarityReport, quality: Option<MetricResult>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "LSH: {} (threshold estimate {:.4}), {} candidate pairs, {} similar",
        report.lsh_params,
        report.lsh_params.threshold_estimate(),
        report.num_candidates,
        report.similar.len()
    );
    match quality {
        Some(q) => {
            let _ = writeln!(
                out,
                "LSH quality against exact jaccard: precision = {:.4}, recall = {:.4}, fscore = {:.4}",
                q.precision, q.recall, q.fscore
            );
        }
        None => out.push_str("LSH quality against exact jaccard: no similar pairs either way\n"),
    }
    out
}

pub fn render_text(report: &SimilarityReport, quality: Option<MetricResult>) -> String {
    let mut sink = TextSink::new(report);
    report.emit(&mut sink);
    let mut out = sink.into_string();
    out.push('\n');
    out.push_str(&timing_summary(&report.timings));
    out.push('\n');
    out.push_str(&lsh_summary(report, quality));
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a SimilarityReport,
    lsh_quality: Option<MetricResult>,
}

pub fn write_json<W: Write>(writer: W, report: &SimilarityReport, quality: Option<MetricResult>) -> Result<()> {
    serde_json::to_writer_pretty(writer, &JsonReport { report, lsh_quality: quality })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::lsh_quality;
    use similaritem::{Document, SimilarityConfig, SimilarityPipeline};

    fn report(documents: &[Document]) -> SimilarityReport {
        SimilarityPipeline::new(SimilarityConfig::default())
            .unwrap()
            .run(documents)
            .unwrap()
    }

    #[test]
    fn test_text_lists_every_class() {
        let text = "abcdefghijklmnopqrstuvwxyz0123456789";
        let report = report(&[
            Document::from_text("doc1", text),
            Document::from_text("doc2", text),
        ]);
        let out = render_text(&report, lsh_quality(&report));

        assert!(out.contains("k=9 shingles"));
        assert!(out.contains("n=100 sized signatures"));
        assert!(out.contains("threshold of 0.8"));
        assert_eq!(out.matches("doc1 \t - doc2: \t 1\n").count(), 3);
        assert!(!out.contains("None"));
        assert!(out.contains("Summary for times:"));
        assert!(out.contains("signature comparison:"));
        assert!(out.contains("bands = 10, rows_per_band = 10"));
        assert!(out.contains("precision = 1.0000"));
    }

    #[test]
    fn test_empty_lsh_class_prints_none() {
        let report = report(&[
            Document::from_text("doc1", &"x".repeat(20)),
            Document::from_text("doc2", &"y".repeat(20)),
        ]);
        let out = render_text(&report, lsh_quality(&report));
        let lsh_section = out.split("using LSH").nth(1).unwrap();
        assert!(lsh_section.lines().nth(1) == Some("None"));
        assert!(out.contains("no similar pairs either way"));
    }

    #[test]
    fn test_json() {
        let report = report(&[Document::from_text("a", "hello world"), Document::from_text("b", "hello world")]);
        let mut buffer = Vec::new();
        write_json(&mut buffer, &report, lsh_quality(&report)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["similar"][0]["a"], "a");
        assert_eq!(value["similar"][0]["score"], 1.0);
        assert_eq!(value["lsh_quality"]["recall"], 1.0);
        assert_eq!(value["config"]["hasher"], "sea");
    }
}
