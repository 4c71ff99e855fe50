use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::columns;
use crate::converters::SheetConverter;
use crate::workbook::{self, Workbook};

/// Outcome of a conversion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub files: usize,
    pub sheets: usize,
    pub skipped_sheets: usize,
    pub records: usize,
}

/// Resolve the input directory, falling back to `../<dir>` when the given
/// path does not exist but its parent-relative twin does.
pub fn resolve_input_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_dir() {
        return Ok(dir.to_path_buf());
    }

    let parent = Path::new("..").join(dir);
    if dir.is_relative() && parent.is_dir() {
        info!(dir = %parent.display(), "input directory found in parent directory");
        return Ok(parent);
    }

    bail!("input directory '{}' not found", dir.display());
}

/// Convert every sheet of every workbook in `input_dir` and write the
/// accumulated records to `output` as one JSON array.
pub fn run<C: SheetConverter>(converter: &C, input_dir: &Path, output: &Path) -> Result<BatchSummary> {
    let input_dir = resolve_input_dir(input_dir)?;
    let mut summary = BatchSummary::default();

    let mut records: Vec<C::Record> = Vec::new();
    for path in workbook::list_workbooks(&input_dir)? {
        summary.files += 1;
        let before = records.len();
        convert_workbook(converter, &path, &mut records, &mut summary);
        info!(
            file = %path.display(),
            records = records.len() - before,
            "[{}] processed workbook",
            converter.label()
        );
    }

    summary.records = records.len();
    write_json(output, &records)?;

    info!(
        records = summary.records,
        files = summary.files,
        sheets = summary.sheets,
        skipped_sheets = summary.skipped_sheets,
        output = %output.display(),
        "[{}] successfully converted {} entries",
        converter.label(),
        summary.records
    );

    Ok(summary)
}

/// Convert all sheets of one workbook. Failures are logged and the
/// offending file or sheet is skipped.
fn convert_workbook<C: SheetConverter>(
    converter: &C,
    path: &Path,
    records: &mut Vec<C::Record>,
    summary: &mut BatchSummary,
) {
    let mut book = match Workbook::open(path) {
        Ok(book) => book,
        Err(e) => {
            warn!(file = %path.display(), "skipping unreadable workbook: {:#}", e);
            return;
        }
    };

    for sheet_name in book.sheet_names() {
        summary.sheets += 1;

        let source = match book.read_sheet(&sheet_name) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %path.display(), sheet = %sheet_name, "skipping unparseable sheet: {:#}", e);
                summary.skipped_sheets += 1;
                continue;
            }
        };

        let columns = match columns::resolve_source(&source) {
            Ok(columns) => columns,
            Err(e) => {
                warn!(
                    file = %path.display(),
                    sheet = %sheet_name,
                    headers = ?source.headers,
                    "skipping sheet, speaker/content columns not found: {}",
                    e
                );
                summary.skipped_sheets += 1;
                continue;
            }
        };

        records.extend(converter.convert(&source, columns));
    }
}

/// Write a serializable value as pretty-printed UTF-8 JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data).context("serializing to JSON")?;
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
