//! Text rendering and on-disk artefacts for an [`AnalysisReport`].

use std::{
    fmt::Write as _,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use tracing::info;

use super::{AnalysisReport, Polarity};
use crate::{
    data::{comments::write_csv, corpus::file_stem},
    error::Result,
};

/// Shown when a polarity has no supporting comments at all.
pub const NOT_ENOUGH_DATA: &str = "not enough data";

fn headline(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::Negative => "MOST OPPOSED: ",
        Polarity::Positive => "MOST SUPPORTED:",
    }
}

/// Plain-text impact report.
pub fn render_text(report: &AnalysisReport) -> String {
    let agg = &report.aggregation;
    let mut out = String::new();
    let _ = writeln!(out, "LAW IMPACT REPORT: {}", report.law_name);
    let _ = writeln!(
        out,
        "Comments: {} total, {} linked to a clause, {} classified",
        report.records.len(),
        report.relevant_count(),
        agg.clean_count()
    );
    let _ = writeln!(out);

    for polarity in Polarity::ALL {
        match agg.selection(polarity) {
            Some(selection) => {
                let _ = writeln!(
                    out,
                    "{} {} ({} {} comments)",
                    headline(polarity),
                    selection.clause_id,
                    selection.count,
                    polarity.label()
                );
                if let Some(insight) = report.insights.get(polarity) {
                    let _ = writeln!(out, "  Insight: {}", insight.narrative_text);
                }
            }
            None => {
                let _ = writeln!(out, "{} {NOT_ENOUGH_DATA}", headline(polarity));
            }
        }
    }

    if !agg.summary.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Clause breakdown:");
        out.push_str(&render_breakdown(report));
    }
    out
}

fn render_breakdown(report: &AnalysisReport) -> String {
    let summary = &report.aggregation.summary;
    let labels = summary.labels();
    let clause_width = summary
        .clauses()
        .map(|c| c.chars().count())
        .chain(std::iter::once("clause".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = write!(out, "{:<clause_width$}", "clause");
    for label in &labels {
        let _ = write!(out, "  {label:>8}");
    }
    out.push('\n');
    for row in summary.breakdown() {
        let _ = write!(out, "{:<clause_width$}", row.clause_id);
        for label in &labels {
            let count = row.counts.get(label).copied().unwrap_or(0);
            let _ = write!(out, "  {count:>8}");
        }
        out.push('\n');
    }
    out
}

/// Files written for one run.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub table: PathBuf,
    pub insights: PathBuf,
    pub report: PathBuf,
}

/// Write the analysed table (clean rows unless `all_rows`), the insight side
/// channel and the text report under `dir`.
pub fn write_outputs(report: &AnalysisReport, dir: &Path, all_rows: bool) -> Result<OutputPaths> {
    std::fs::create_dir_all(dir)?;
    let stem = file_stem(&report.law_name);
    let paths = OutputPaths {
        table: dir.join(format!("{stem}_analysis.csv")),
        insights: dir.join(format!("{stem}_insights.json")),
        report: dir.join(format!("{stem}_report.txt")),
    };

    let file = BufWriter::new(File::create(&paths.table)?);
    let rows = if all_rows {
        write_csv(&report.headers, report.records.iter(), file)?
    } else {
        write_csv(&report.headers, report.clean_records(), file)?
    };

    let insights = BufWriter::new(File::create(&paths.insights)?);
    serde_json::to_writer_pretty(insights, &report.insights)?;

    std::fs::write(&paths.report, render_text(report))?;
    info!(table = %paths.table.display(), rows, "wrote analysis outputs");
    Ok(paths)
}
