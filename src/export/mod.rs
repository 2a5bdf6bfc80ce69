//! Completed-product export: document model, file naming and PDF output.

pub mod pdf;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::aggregate;
use crate::model::{Record, RecordId};

pub use pdf::{FontSource, PdfRenderer};

pub const DOCUMENT_TITLE: &str = "Productos Completados";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("record {id} ({product}) is not complete, {remainder} remaining")]
    NotComplete {
        id: RecordId,
        product: String,
        remainder: i64,
    },

    #[error("failed to load font family '{family}' from {dir}: {message}")]
    Fonts {
        dir: String,
        family: String,
        message: String,
    },

    #[error("failed to render PDF: {message}")]
    Render { message: String },

    #[error("failed to write export file: {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    pub product: String,
    pub required: Option<i64>,
    pub done: Option<i64>,
    pub remainder: i64,
    pub date: Option<NaiveDate>,
    pub complete: bool,
}

impl From<&Record> for ExportEntry {
    fn from(record: &Record) -> Self {
        Self {
            product: record.product.clone(),
            required: record.required,
            done: record.done,
            remainder: record.remainder(),
            date: record.date,
            complete: record.is_complete(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportDocument {
    pub title: String,
    pub generated_on: NaiveDate,
    pub file_name: String,
    pub entries: Vec<ExportEntry>,
}

impl ExportDocument {
    /// One complete record; anything with a non-zero remainder is refused.
    pub fn single(record: &Record, today: NaiveDate) -> Result<Self, ExportError> {
        if !record.is_complete() {
            return Err(ExportError::NotComplete {
                id: record.id.clone(),
                product: record.product.clone(),
                remainder: record.remainder(),
            });
        }
        Ok(Self {
            title: DOCUMENT_TITLE.to_string(),
            generated_on: today,
            file_name: single_file_name(&record.product, today),
            entries: vec![ExportEntry::from(record)],
        })
    }

    /// Exactly the completed subset of `records`, in snapshot order.
    pub fn completed(records: &[Record], today: NaiveDate) -> Self {
        Self {
            title: DOCUMENT_TITLE.to_string(),
            generated_on: today,
            file_name: all_completed_file_name(today),
            entries: aggregate::completed(records)
                .into_iter()
                .map(ExportEntry::from)
                .collect(),
        }
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file_name)
    }
}

pub fn single_file_name(product: &str, date: NaiveDate) -> String {
    format!(
        "{}-completado-{}.pdf",
        sanitize_file_component(product),
        date.format("%Y-%m-%d")
    )
}

pub fn all_completed_file_name(date: NaiveDate) -> String {
    format!("todos-completados-{}.pdf", date.format("%Y-%m-%d"))
}

fn sanitize_file_component(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "producto".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, product: &str, required: i64, done: i64) -> Record {
        Record {
            id: RecordId::Int(id),
            product: product.to_string(),
            required: Some(required),
            done: Some(done),
            date: NaiveDate::from_ymd_opt(2024, 4, 2),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 30).unwrap()
    }

    #[test]
    fn file_names_follow_convention() {
        assert_eq!(
            single_file_name("Tornillo", today()),
            "Tornillo-completado-2024-04-30.pdf"
        );
        assert_eq!(
            all_completed_file_name(today()),
            "todos-completados-2024-04-30.pdf"
        );
    }

    #[test]
    fn file_name_strips_path_separators() {
        assert_eq!(
            single_file_name("caja 3/4\" ", today()),
            "caja 3_4_-completado-2024-04-30.pdf"
        );
        assert_eq!(
            single_file_name("   ", today()),
            "producto-completado-2024-04-30.pdf"
        );
    }

    #[test]
    fn single_export_requires_completion() {
        let open = rec(1, "Tuerca", 5, 2);
        match ExportDocument::single(&open, today()).unwrap_err() {
            ExportError::NotComplete { remainder, .. } => assert_eq!(remainder, 3),
            other => panic!("unexpected error: {other}"),
        }

        let done = rec(2, "Tornillo", 10, 10);
        let doc = ExportDocument::single(&done, today()).unwrap();
        assert_eq!(doc.entries.len(), 1);
        assert!(doc.entries[0].complete);
        assert_eq!(doc.entries[0].remainder, 0);
        assert_eq!(doc.file_name, "Tornillo-completado-2024-04-30.pdf");
    }

    #[test]
    fn aggregate_export_covers_exactly_completed_subset() {
        let set = vec![
            rec(1, "Tornillo", 10, 10),
            rec(2, "Tuerca", 5, 2),
            rec(3, "Perno", 0, 0),
            rec(4, "Clavo", 3, 4),
        ];
        let doc = ExportDocument::completed(&set, today());
        let names: Vec<_> = doc.entries.iter().map(|e| e.product.as_str()).collect();
        assert_eq!(names, vec!["Tornillo", "Perno"]);
        assert_eq!(doc.generated_on, today());
        assert_eq!(
            doc.path_in(Path::new("/tmp/out")),
            PathBuf::from("/tmp/out/todos-completados-2024-04-30.pdf")
        );
    }

    #[test]
    fn aggregate_export_of_nothing_is_empty() {
        let set = vec![rec(1, "Tuerca", 5, 2)];
        let doc = ExportDocument::completed(&set, today());
        assert!(doc.entries.is_empty());
    }
}
