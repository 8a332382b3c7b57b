//! Ledger export to JSON and CSV files.

use crate::model::WorkloadInstance;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;

pub const CSV_HEADER: &str =
    "id,pid,container_id,remote_name,remote_description,associated_token,status";

pub fn export_json(path: &Path, rows: &[WorkloadInstance]) -> Result<()> {
    let body = serde_json::to_string_pretty(rows).context("serialize ledger")?;
    write_file(path, body.as_bytes())
}

pub fn export_csv(path: &Path, rows: &[WorkloadInstance]) -> Result<()> {
    write_file(path, ledger_csv(rows).as_bytes())
}

pub fn ledger_csv(rows: &[WorkloadInstance]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for w in rows {
        let fields = [
            w.id.to_string(),
            w.pid.to_string(),
            csv_field(&w.container_id),
            csv_field(&w.remote_name),
            csv_field(&w.remote_description),
            csv_field(w.associated_token.as_deref().unwrap_or("")),
            w.status.label().to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// RFC 4180: quote when the value holds a comma, quote or line break.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}

/// `runes-ledger-YYYY-MM-DD_HH-MM-SS.<ext>` in the current directory.
pub fn default_export_path(ext: &str) -> Result<PathBuf> {
    let fmt = format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = OffsetDateTime::now_utc()
        .format(&fmt)
        .context("format timestamp")?;
    let dir = std::env::current_dir().context("get current directory")?;
    Ok(dir.join(format!("runes-ledger-{stamp}.{ext}")))
}
