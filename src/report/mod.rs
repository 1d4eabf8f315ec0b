/// Report layer: summary facts, statistics and the sample preview.
///
/// ```text
///   LoadedArray ──┬──▶ summary::summarize   ─┐
///                 ├──▶ summary::statistics  ─┼──▶ write_report ──▶ text
///                 └──▶ preview::preview     ─┘
/// ```
///
/// Each section is computed independently; a failure in one section is
/// printed in its place and the others are still written.

pub mod format;
pub mod preview;
pub mod summary;

use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use crate::data::model::{DType, LoadedArray};

use format::{fixed6, scalar_text, sequence};
use preview::{DEFAULT_MAX_ELEMENTS, preview};
use summary::{Stats, Summary, statistics, summarize};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("cannot display elements of type {dtype}")]
    UnsupportedElementDisplay { dtype: String },
}

impl ReportError {
    pub fn unsupported(dtype: &DType) -> Self {
        ReportError::UnsupportedElementDisplay {
            dtype: dtype.name(),
        }
    }
}

/// Which sections to print and how large the sample may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub max_elements: usize,
    pub show_stats: bool,
    pub show_sample: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            max_elements: DEFAULT_MAX_ELEMENTS,
            show_stats: true,
            show_sample: true,
        }
    }
}

const RULE: usize = 50;
const SUB_RULE: usize = 30;

/// Write the full text report for one loaded array.
pub fn write_report<W: Write>(
    out: &mut W,
    path: &Path,
    array: &LoadedArray,
    options: &ReportOptions,
) -> io::Result<()> {
    let summary = summarize(array);
    writeln!(out, "File: {}", path.display())?;
    writeln!(out, "{}", "=".repeat(RULE))?;
    write_summary(out, &summary)?;

    if options.show_stats {
        match statistics(array) {
            Ok(Some(stats)) => write_stats(out, &stats)?,
            Ok(None) => {}
            Err(err) => {
                log::error!("statistics failed: {err}");
                writeln!(out, "\nError computing statistics: {err}")?;
            }
        }
    }

    if options.show_sample {
        writeln!(
            out,
            "\nSample Data (showing up to {} elements):",
            options.max_elements
        )?;
        writeln!(out, "{}", "-".repeat(SUB_RULE))?;
        match preview(array, options.max_elements) {
            Ok(sample) => writeln!(out, "{sample}")?,
            Err(err) => {
                log::error!("preview failed: {err}");
                writeln!(out, "Error rendering sample: {err}")?;
            }
        }
    }

    if !summary.fields.is_empty() {
        writeln!(out, "\nStructured Array Field Names:")?;
        writeln!(out, "{}", "-".repeat(SUB_RULE))?;
        for field in &summary.fields {
            writeln!(out, "  {}: {}", field.name, field.dtype)?;
        }
    }
    Ok(())
}

fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    writeln!(out, "Data type: {}", summary.dtype)?;
    writeln!(out, "Shape: {}", summary.shape_text())?;
    writeln!(out, "Number of dimensions: {}", summary.ndim)?;
    writeln!(out, "Total elements: {}", summary.len)?;
    writeln!(
        out,
        "Memory usage: {} bytes ({:.2} KB, {:.2} MB)",
        summary.nbytes,
        summary.kib(),
        summary.mib()
    )
}

fn write_stats<W: Write>(out: &mut W, stats: &Stats) -> io::Result<()> {
    writeln!(out, "\nStatistical Information:")?;
    writeln!(out, "{}", "-".repeat(SUB_RULE))?;
    writeln!(out, "Min value: {}", scalar_text(&stats.min))?;
    writeln!(out, "Max value: {}", scalar_text(&stats.max))?;
    writeln!(out, "Mean: {}", fixed6(stats.mean))?;
    writeln!(out, "Standard deviation: {}", fixed6(stats.std))?;
    if let Some(distinct) = &stats.distinct {
        writeln!(
            out,
            "Unique values ({}): {}",
            distinct.len(),
            sequence(distinct)
        )?;
    }
    Ok(())
}
