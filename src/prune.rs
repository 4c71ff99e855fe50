use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::batch::resolve_input_dir;
use crate::workbook::{self, Workbook};

/// Workbooks with fewer data rows than this are removed by default.
pub const DEFAULT_MIN_ROWS: usize = 7;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneSummary {
    pub deleted: Vec<PathBuf>,
    pub kept: usize,
    pub failed: usize,
}

/// Delete workbooks whose first sheet has fewer than `min_rows` data rows.
/// With `dry_run` the decisions are logged but nothing is removed.
pub fn prune(dir: &Path, min_rows: usize, dry_run: bool) -> Result<PruneSummary> {
    let dir = resolve_input_dir(dir)?;
    let mut summary = PruneSummary::default();

    for path in workbook::list_workbooks(&dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let rows = match Workbook::open(&path).and_then(|mut book| book.first_sheet_row_count()) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(file = %name, "[prune] error processing workbook, keeping it: {:#}", e);
                summary.failed += 1;
                continue;
            }
        };

        if rows >= min_rows {
            info!("[prune] Keeping {} - {} rows", name, rows);
            summary.kept += 1;
            continue;
        }

        if dry_run {
            info!("[prune] Would delete {} - {} rows", name, rows);
        } else {
            info!("[prune] Deleting {} - {} rows", name, rows);
            std::fs::remove_file(&path).with_context(|| format!("deleting {}", path.display()))?;
        }
        summary.deleted.push(path);
    }

    info!(
        deleted = summary.deleted.len(),
        kept = summary.kept,
        failed = summary.failed,
        dry_run,
        "[prune] Total files deleted: {}",
        summary.deleted.len()
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_workbook_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"garbage").unwrap();

        let summary = prune(dir.path(), DEFAULT_MIN_ROWS, false).unwrap();
        assert!(summary.deleted.is_empty());
        assert_eq!(summary.failed, 1);
        assert!(path.exists());
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let summary = prune(dir.path(), DEFAULT_MIN_ROWS, true).unwrap();
        assert_eq!(summary, PruneSummary::default());
    }
}
