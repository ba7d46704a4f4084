//! Corpus loading from markdown directories and warehouse tables.

use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Separator placed between `column: value` pairs of a row document.
pub const ROW_SEPARATOR: &str = " | ";

/// Extensions picked up by [`load_directory`] when the caller has no preference.
pub const DEFAULT_EXTENSIONS: &[&str] = &["md"];

/// One table row as ordered `(column, value)` pairs.
pub type Row = Vec<(String, String)>;

/// The row-fetch capability behind [`load_table`].
///
/// Implementations return rows with their columns in declaration order and
/// fail with [`RagError::SourceUnavailable`] when the table does not exist.
pub trait TableSource: Send + Sync {
    /// Fetch every row of `table`.
    fn fetch_rows(&self, table: &str) -> Result<Vec<Row>>;
}

/// Load one [`Document`] per file under `root` whose extension matches one of
/// `extensions` (case-insensitive). Files are returned sorted by path.
///
/// # Errors
///
/// Returns [`RagError::SourceUnavailable`] if `root` is not a readable
/// directory or a matching file cannot be read.
pub fn load_directory(root: impl AsRef<Path>, extensions: &[&str]) -> Result<Vec<Document>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(RagError::SourceUnavailable {
            source_name: root.display().to_string(),
            message: "directory does not exist".to_string(),
        });
    }

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry.path().extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
                extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
        })
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();
    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(&path).map_err(|e| RagError::SourceUnavailable {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let id = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        debug!(document.id = %id, bytes = bytes.len(), "loaded file");
        documents.push(Document::new(id, content, path.display().to_string()));
    }

    info!(root = %root.display(), document_count = documents.len(), "loaded directory");
    Ok(documents)
}

/// Render a row as `col: val | col: val ...` in column order.
pub fn format_row(row: &[(String, String)]) -> String {
    row.iter()
        .map(|(column, value)| format!("{column}: {value}"))
        .collect::<Vec<_>>()
        .join(ROW_SEPARATOR)
}

/// Load one [`Document`] per row of `table`.
///
/// Row documents are identified as `<table>:<row-number>` (1-based) and carry
/// the table name as their source.
pub fn load_table(source: &dyn TableSource, table: &str) -> Result<Vec<Document>> {
    let rows = source.fetch_rows(table)?;
    let documents = rows
        .iter()
        .enumerate()
        .map(|(i, row)| Document::new(format!("{table}:{}", i + 1), format_row(row), table))
        .collect::<Vec<_>>();
    info!(table, document_count = documents.len(), "loaded table");
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    struct FakeTables(HashMap<String, Vec<Row>>);

    impl TableSource for FakeTables {
        fn fetch_rows(&self, table: &str) -> Result<Vec<Row>> {
            self.0.get(table).cloned().ok_or_else(|| RagError::SourceUnavailable {
                source_name: table.to_string(),
                message: "no such table".to_string(),
            })
        }
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(c, v)| (c.to_string(), v.to_string())).collect()
    }

    #[test]
    fn loads_only_matching_files_sorted() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.md"), "# B").unwrap();
        fs::write(root.join("nested/a.MD"), "# A").unwrap();
        fs::write(root.join("notes.txt"), "ignore").unwrap();

        let docs = load_directory(root, DEFAULT_EXTENSIONS).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b.md", "nested/a.MD"]);
        assert_eq!(docs[0].content, "# B");
    }

    #[test]
    fn empty_directory_is_not_an_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(load_directory(temp.path(), DEFAULT_EXTENSIONS).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let temp = tempfile::tempdir().unwrap();
        let err = load_directory(temp.path().join("missing"), DEFAULT_EXTENSIONS).unwrap_err();
        assert!(matches!(err, RagError::SourceUnavailable { .. }));
    }

    #[test]
    fn rows_become_pipe_separated_documents() {
        let mut tables = HashMap::new();
        tables.insert(
            "billing".to_string(),
            vec![row(&[("a", "1"), ("b", "x")]), row(&[("a", "2"), ("b", "")])],
        );
        tables.insert("empty".to_string(), Vec::new());
        let source = FakeTables(tables);

        let docs = load_table(&source, "billing").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "a: 1 | b: x");
        assert_eq!(docs[0].id, "billing:1");
        assert_eq!(docs[0].source, "billing");
        assert_eq!(docs[1].content, "a: 2 | b: ");

        assert!(load_table(&source, "empty").unwrap().is_empty());
        assert!(matches!(
            load_table(&source, "missing"),
            Err(RagError::SourceUnavailable { .. })
        ));
    }
}
