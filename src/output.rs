//! CLI output formatting.
//!
//! Output is item-centric: each photo leads with its position and id, with
//! the source path as an indented context line.
//!
//! ## Check
//!
//! ```text
//! shirts (2 photos)
//!     001 shirts-img-7053
//!         Source: Shirts/IMG_7053.HEIC
//!     002 favorite-blue-shirt
//!         Source: Shirts/IMG_7055.jpg
//! ```
//!
//! ## Build progress
//!
//! ```text
//! Processing 2 photos
//!     001 shirts-img-7053: cached
//!     002 shirts-broken: skipped (cannot decode Shirts/broken.jpg: ...)
//! ```
//!
//! ## Build summary
//!
//! ```text
//! Catalog: 12 items in 3 categories
//! Images: 3 cached, 9 encoded (12 total)
//! Overrides: json:photos/wardrobe_data.json
//! ```
//!
//! Each section has a `format_*` function returning lines and a `print_*`
//! wrapper. Format functions do no I/O.

use crate::catalog::{PlannedPhoto, RunReport};
use crate::process::{ProcessEvent, RenderStatus};
use crate::types::Artifact;

/// 1-based position, zero-padded to three digits.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Four spaces per level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn count(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

// ============================================================================
// Check
// ============================================================================

/// Photos grouped by category, in catalog order.
pub fn format_check_output(planned: &[PlannedPhoto]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    while start < planned.len() {
        let category = &planned[start].photo.category;
        let end = planned[start..]
            .iter()
            .position(|p| &p.photo.category != category)
            .map_or(planned.len(), |n| start + n);

        lines.push(format!("{} ({})", category, count(end - start, "photo", "photos")));
        for (i, p) in planned[start..end].iter().enumerate() {
            lines.push(format!("{}{} {}", indent(1), format_index(i + 1), p.id));
            lines.push(format!("{}Source: {}", indent(2), p.photo.rel_path));
        }
        start = end;
    }
    if lines.is_empty() {
        lines.push("No photos found".to_string());
    }
    lines
}

pub fn print_check_output(planned: &[PlannedPhoto]) {
    for line in format_check_output(planned) {
        println!("{}", line);
    }
}

// ============================================================================
// Build progress
// ============================================================================

/// Format a single progress event.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { total } => {
            vec![format!("Processing {}", count(*total, "photo", "photos"))]
        }
        ProcessEvent::ImageProcessed {
            index, id, status, ..
        } => {
            let status = match status {
                RenderStatus::Cached => "cached",
                RenderStatus::Encoded => "encoded",
            };
            vec![format!("{}{} {}: {}", indent(1), format_index(*index), id, status)]
        }
        ProcessEvent::ImageFailed {
            index, id, reason, ..
        } => vec![format!(
            "{}{} {}: skipped ({})",
            indent(1),
            format_index(*index),
            id,
            reason
        )],
    }
}

// ============================================================================
// Build summary
// ============================================================================

/// Summary printed after the artifact is written.
pub fn format_build_summary(artifact: &Artifact, report: &RunReport) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Catalog: {} in {}",
            count(artifact.metadata.total_items, "item", "items"),
            count(artifact.categories.len(), "category", "categories")
        ),
        format!("Images: {}", report.cache_stats),
    ];

    match (&report.override_source, report.degraded) {
        (Some(source), _) => lines.push(format!("Overrides: {source}")),
        (None, true) => lines.push("Overrides: none reachable (degraded)".to_string()),
        (None, false) => lines.push("Overrides: none configured".to_string()),
    }

    if !report.missing.is_empty() {
        lines.push(format!("Missing sources ({}):", report.missing.len()));
        for id in &report.missing {
            lines.push(format!("{}{}", indent(1), id));
        }
    }
    if !report.failures.is_empty() {
        lines.push(format!("Skipped ({}):", report.failures.len()));
        for failure in &report.failures {
            lines.push(format!("{}{}: {}", indent(1), failure.source_rel, failure.error));
        }
    }
    if !report.warnings.is_empty() {
        lines.push(format!("Warnings ({}):", report.warnings.len()));
        for warning in &report.warnings {
            lines.push(format!("{}{}", indent(1), warning));
        }
    }
    lines
}

pub fn print_build_summary(artifact: &Artifact, report: &RunReport) {
    for line in format_build_summary(artifact, report) {
        println!("{}", line);
    }
}
