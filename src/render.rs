//! Text rendering for CLI output.
//!
//! Every view is built as pre-formatted lines so the CLI and the TUI can share
//! the same wording.

use crate::model::{CatalogImage, CatalogSource, WorkloadInstance};
use crate::reconcile::ReconcileReport;

/// Pre-formatted lines for text output.
pub(crate) struct TextView {
    pub lines: Vec<String>,
}

impl TextView {
    pub fn print(&self) {
        for line in &self.lines {
            println!("{line}");
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

pub(crate) fn workload_line(w: &WorkloadInstance) -> String {
    format!(
        "{:<12}  {:<8}  {:>7}  {:<24}  {}",
        w.short_id(),
        w.status.label(),
        w.pid,
        truncate(&w.remote_name, 24),
        truncate(&w.remote_description, 48)
    )
}

pub(crate) fn workloads(title: &str, rows: &[WorkloadInstance]) -> TextView {
    let mut lines = vec![format!("{title} ({})", rows.len())];
    if rows.is_empty() {
        lines.push("  (none)".into());
        return TextView { lines };
    }
    lines.push(format!(
        "{:<12}  {:<8}  {:>7}  {:<24}  {}",
        "CONTAINER", "STATUS", "PID", "NAME", "DESCRIPTION"
    ));
    lines.extend(rows.iter().map(workload_line));
    TextView { lines }
}

pub(crate) fn reconciled(report: &ReconcileReport) -> TextView {
    let mut view = workloads("Running workloads", &report.running);
    if !report.healed.is_empty() {
        view.lines.push(format!(
            "Marked {} stale workload(s) stopped: {}",
            report.healed.len(),
            report.healed.join(", ")
        ));
    }
    view
}

pub(crate) fn catalog_image_line(img: &CatalogImage) -> String {
    format!(
        "{:<24}  {:<36}  {:<10}  {}",
        truncate(&img.remote_name, 24),
        truncate(&img.image_name, 36),
        img.remote_version.as_deref().unwrap_or("-"),
        truncate(&img.remote_description, 48)
    )
}

pub(crate) fn catalog_images(images: &[CatalogImage]) -> TextView {
    let mut lines = vec![format!("Catalog images ({})", images.len())];
    lines.extend(images.iter().map(catalog_image_line));
    TextView { lines }
}

pub(crate) fn catalog_source_line(src: &CatalogSource) -> String {
    format!(
        "{:<6}  {:<24}  {}",
        src.id.as_deref().unwrap_or("-"),
        truncate(&src.remote_name, 24),
        src.source_url
    )
}

pub(crate) fn catalog_sources(sources: &[CatalogSource]) -> TextView {
    let mut lines = vec![format!("Catalog sources ({})", sources.len())];
    lines.extend(sources.iter().map(catalog_source_line));
    TextView { lines }
}

pub(crate) fn local_images(images: &[String]) -> TextView {
    let mut lines = vec![format!("Local images ({})", images.len())];
    lines.extend(images.iter().map(|i| format!("  {i}")));
    TextView { lines }
}
