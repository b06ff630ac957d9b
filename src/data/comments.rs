//! Comment table ingestion and output.

use std::{io, sync::Arc};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info};

use super::records::{AnalyzedComment, DERIVED_COLUMNS};
use crate::error::{PipelineError, Result};

/// Name of the required free-text column.
pub const COMMENT_COLUMN: &str = "Comment";

/// One row of the uploaded table. Columns other than `Comment` are passed
/// through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRow {
    headers: Arc<Vec<String>>,
    values: Vec<String>,
    comment_idx: usize,
}

impl CommentRow {
    pub fn comment(&self) -> &str {
        &self.values[self.comment_idx]
    }

    /// Number of original columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(column, value)` pairs in original column order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Validated comment table: carries a `Comment` column and keeps the original
/// column order.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentTable {
    headers: Arc<Vec<String>>,
    rows: Vec<CommentRow>,
}

impl CommentTable {
    /// Parse CSV bytes, failing with an input schema error if `Comment` is absent.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(bytes)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let comment_idx = comment_index(&headers)?;
        let headers = Arc::new(headers);

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(PipelineError::InputSchema(format!(
                    "row {} has {} fields but the header has {}",
                    idx + 1,
                    record.len(),
                    headers.len()
                )));
            }
            let mut values: Vec<String> = record.iter().map(|v| v.to_string()).collect();
            // short rows are padded so every row lines up with the header
            values.resize(headers.len(), String::new());
            rows.push(CommentRow {
                headers: Arc::clone(&headers),
                values,
                comment_idx,
            });
        }
        info!(rows = rows.len(), columns = headers.len(), "parsed comment table");
        Ok(Self { headers, rows })
    }

    /// Build a table holding only a `Comment` column.
    pub fn from_comments<I, S>(comments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers = Arc::new(vec![COMMENT_COLUMN.to_string()]);
        let rows = comments
            .into_iter()
            .map(|c| CommentRow {
                headers: Arc::clone(&headers),
                values: vec![c.into()],
                comment_idx: 0,
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[CommentRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn comments(&self) -> Vec<&str> {
        self.rows.iter().map(CommentRow::comment).collect()
    }

    pub fn into_rows(self) -> Vec<CommentRow> {
        self.rows
    }
}

fn comment_index(headers: &[String]) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == COMMENT_COLUMN)
        .ok_or_else(|| {
            PipelineError::InputSchema(format!(
                "table must have a column named '{COMMENT_COLUMN}' (found: {})",
                headers.join(", ")
            ))
        })
}

/// Write analyzed rows: original columns followed by the derived ones.
pub fn write_csv<'a, W, I>(headers: &[String], rows: I, writer: W) -> Result<usize>
where
    W: io::Write,
    I: IntoIterator<Item = &'a AnalyzedComment>,
{
    let mut out = WriterBuilder::new().has_headers(false).from_writer(writer);
    out.write_record(
        headers
            .iter()
            .map(String::as_str)
            .chain(DERIVED_COLUMNS.iter().copied()),
    )?;
    let mut written = 0usize;
    for row in rows {
        let derived = row.derived_fields();
        out.write_record(
            row.row
                .values()
                .iter()
                .map(String::as_str)
                .chain(derived.iter().map(String::as_str)),
        )?;
        written += 1;
    }
    out.flush()?;
    debug!(rows = written, "wrote analyzed rows");
    Ok(written)
}
