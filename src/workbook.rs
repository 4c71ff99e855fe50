use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::ConversationSource;

/// Spreadsheet extensions calamine can open.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// Prefix of the lock files Office leaves next to open workbooks.
const LOCK_FILE_PREFIX: &str = "~$";

/// List workbook files directly inside `dir`, sorted by file name.
pub fn list_workbooks(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if entry.file_type().is_file() && is_workbook(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    Ok(paths)
}

fn is_workbook(path: &Path) -> bool {
    let locked = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with(LOCK_FILE_PREFIX));

    !locked
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| {
                WORKBOOK_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
}

/// An open workbook. Sheets are read one at a time on demand.
pub struct Workbook {
    path: PathBuf,
    file_stem: String,
    sheets: Sheets<BufReader<File>>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self> {
        let sheets = open_workbook_auto(path)
            .with_context(|| format!("opening workbook {}", path.display()))?;
        let file_stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            file_stem,
            sheets,
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    /// Read one sheet: first row is the header, the rest are data rows.
    pub fn read_sheet(&mut self, name: &str) -> Result<ConversationSource> {
        let range = self
            .sheets
            .worksheet_range(name)
            .with_context(|| format!("reading sheet {} of {}", name, self.path.display()))?;

        Ok(source_from_range(&self.file_stem, name, &range))
    }

    /// Number of data rows in the first sheet, or zero for an empty workbook.
    pub fn first_sheet_row_count(&mut self) -> Result<usize> {
        let Some(name) = self.sheet_names().into_iter().next() else {
            return Ok(0);
        };
        Ok(self.read_sheet(&name)?.rows.len())
    }
}

fn source_from_range(file_stem: &str, sheet_name: &str, range: &Range<Data>) -> ConversationSource {
    // calamine starts the range at the first used cell; pad leading empty
    // columns back in so indices match sheet positions.
    let lead = range.start().map_or(0, |(_, col)| col as usize);
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header_row) => std::iter::repeat(None)
            .take(lead)
            .chain(header_row.iter().map(cell_text))
            .enumerate()
            .map(|(i, cell)| cell.unwrap_or_else(|| format!("Unnamed: {}", i)))
            .collect(),
        None => Vec::new(),
    };

    let width = headers.len();
    let data_rows = rows
        .map(|row| {
            let mut cells: Vec<Option<String>> = std::iter::repeat(None)
                .take(lead)
                .chain(row.iter().map(cell_text))
                .collect();
            cells.resize(width.max(cells.len()), None);
            cells
        })
        .collect();

    ConversationSource {
        file_stem: file_stem.to_string(),
        sheet_name: sheet_name.to_string(),
        headers,
        rows: data_rows,
    }
}

/// Render a cell as text. Empty cells and empty strings are absent.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            Some(format!("{}", *f as i64))
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String(String::new())), None);
        assert_eq!(cell_text(&Data::String("你好".into())), Some("你好".into()));
        assert_eq!(cell_text(&Data::Float(42.0)), Some("42".into()));
        assert_eq!(cell_text(&Data::Float(1.5)), Some("1.5".into()));
        assert_eq!(cell_text(&Data::Int(7)), Some("7".into()));
    }

    #[test]
    fn test_source_from_range() {
        let mut range = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), Data::String("时间".into()));
        range.set_value((0, 1), Data::String("发送人".into()));
        range.set_value((0, 2), Data::String("内容".into()));
        range.set_value((1, 1), Data::String("小明".into()));
        range.set_value((1, 2), Data::String("在吗".into()));
        range.set_value((2, 2), Data::String("在".into()));

        let source = source_from_range("小明", "Sheet1", &range);
        assert_eq!(source.headers, vec!["时间", "发送人", "内容"]);
        assert_eq!(source.rows.len(), 2);
        assert_eq!(source.rows[0], vec![None, Some("小明".into()), Some("在吗".into())]);
        assert_eq!(source.rows[1], vec![None, None, Some("在".into())]);
        assert_eq!(source.sheet_id(), "小明/Sheet1");
    }

    #[test]
    fn test_unnamed_header() {
        let mut range = Range::new((0, 0), (0, 1));
        range.set_value((0, 1), Data::String("内容".into()));
        let source = source_from_range("f", "s", &range);
        assert_eq!(source.headers, vec!["Unnamed: 0", "内容"]);
        assert!(source.rows.is_empty());
    }

    #[test]
    fn test_leading_empty_column_keeps_positions() {
        let mut range = Range::new((0, 1), (2, 3));
        range.set_value((0, 1), Data::String("x".into()));
        range.set_value((0, 2), Data::String("spk".into()));
        range.set_value((0, 3), Data::String("msg".into()));
        range.set_value((1, 1), Data::String("t".into()));
        range.set_value((1, 2), Data::String("u".into()));
        range.set_value((1, 3), Data::String("Q".into()));
        range.set_value((2, 1), Data::String("t".into()));
        range.set_value((2, 3), Data::String("R".into()));

        let source = source_from_range("f", "emptycolA", &range);
        assert_eq!(source.headers, vec!["Unnamed: 0", "x", "spk", "msg"]);
        assert_eq!(
            source.rows[0],
            vec![None, Some("t".into()), Some("u".into()), Some("Q".into())]
        );
        assert_eq!(source.rows[1], vec![None, Some("t".into()), None, Some("R".into())]);
        assert!(source.column_is_empty(0));
        assert!(!source.column_is_empty(1));
    }

    #[test]
    fn test_list_workbooks_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.XLSX", "notes.txt", "~$a.xlsx", "c.ods"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("d.xlsx"), b"").unwrap();

        let names: Vec<String> = list_workbooks(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.XLSX", "b.xlsx", "c.ods"]);
    }

    #[test]
    fn test_open_rejects_non_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        assert!(Workbook::open(&path).is_err());
    }
}
