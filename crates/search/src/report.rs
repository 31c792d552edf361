//! Rendering of clustered results for the command line

use crate::clustering::Cluster;
use paperrank_common::errors::Result;
use serde::Serialize;
use std::fmt::Write;

/// Abstracts longer than this are cut and suffixed with "..."
pub const ABSTRACT_PREVIEW_CHARS: usize = 200;

/// Output format of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    /// Parse a configured format name; anything but "json" is text
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            ReportFormat::Json
        } else {
            ReportFormat::Text
        }
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(ABSTRACT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Human-readable report
pub fn render_text(clusters: &[Cluster]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "===== Clustered Search Results =====");

    for (i, cluster) in clusters.iter().enumerate() {
        let _ = writeln!(out, "\n--- Cluster #{} ---", i + 1);

        for (j, candidate) in cluster.papers.iter().enumerate() {
            let paper = &candidate.paper;
            let _ = writeln!(out, "\n[Cluster {} - Paper #{}]", i + 1, j + 1);
            let _ = writeln!(out, "Title: {}", paper.title);
            let _ = writeln!(out, "Authors: {}", paper.authors);
            let _ = writeln!(out, "Year: {}", paper.year);
            let _ = writeln!(out, "Venue: {}", paper.venue);
            let _ = writeln!(out, "Abstract: {}", preview(paper.abstract_or_empty()));
            let _ = writeln!(out, "PageRank Score: {}", paper.authority_score);
        }
    }

    let _ = writeln!(out, "\nTotal Clusters: {}", clusters.len());
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    total_clusters: usize,
    clusters: Vec<JsonCluster<'a>>,
}

#[derive(Serialize)]
struct JsonCluster<'a> {
    index: usize,
    papers: Vec<JsonPaper<'a>>,
}

#[derive(Serialize)]
struct JsonPaper<'a> {
    id: Option<&'a str>,
    title: &'a str,
    authors: &'a str,
    year: &'a str,
    venue: &'a str,
    #[serde(rename = "abstract")]
    abstract_text: &'a str,
    authority_score: f64,
    lexical_score: f64,
    semantic_score: f64,
    combined_score: f64,
}

/// Machine-readable report. Semantic vectors are left out.
pub fn render_json(clusters: &[Cluster]) -> Result<String> {
    let report = JsonReport {
        total_clusters: clusters.len(),
        clusters: clusters
            .iter()
            .map(|cluster| JsonCluster {
                index: cluster.index,
                papers: cluster
                    .papers
                    .iter()
                    .map(|candidate| JsonPaper {
                        id: candidate.paper.id(),
                        title: &candidate.paper.title,
                        authors: &candidate.paper.authors,
                        year: &candidate.paper.year,
                        venue: &candidate.paper.venue,
                        abstract_text: candidate.paper.abstract_or_empty(),
                        authority_score: candidate.authority_score,
                        lexical_score: candidate.lexical_score,
                        semantic_score: candidate.semantic_score,
                        combined_score: candidate.combined_score,
                    })
                    .collect(),
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

/// Render in the requested format
pub fn render(clusters: &[Cluster], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(clusters)),
        ReportFormat::Json => render_json(clusters).map(|json| json + "\n"),
    }
}
