//! Entry exports: row selection and the four output formats.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::entry::FormEntry;
use crate::models::form::Form;
use crate::models::table::{CellStyle, SectionOptions};

pub mod color;
pub mod csv;
pub mod html;
pub mod xlsx;

/// Export request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub row_ids: Vec<i64>,
    pub select_all: bool,
    pub random_order: bool,
    pub include_colors: bool,
    pub columns: Vec<String>,
    pub category_columns: HashMap<String, Vec<String>>,
}

impl ExportOptions {
    /// Rows to export: the listed ids if any, else everything when `selectAll`.
    /// Entry order is kept unless `randomOrder` asks for a shuffle.
    pub fn select_targets(&self, entries: Vec<FormEntry>) -> Result<Vec<FormEntry>, AppError> {
        let mut targets: Vec<FormEntry> = if !self.row_ids.is_empty() {
            let wanted: HashSet<i64> = self.row_ids.iter().copied().collect();
            entries.into_iter().filter(|e| wanted.contains(&e.id)).collect()
        } else if self.select_all {
            entries
        } else {
            Vec::new()
        };
        if targets.is_empty() {
            return Err(AppError::BadRequest("No rows selected for export".to_string()));
        }
        if self.random_order {
            targets.shuffle(&mut rand::rng());
        }
        Ok(targets)
    }

    pub fn section_options(&self, style: CellStyle) -> SectionOptions {
        SectionOptions {
            columns: self.columns.clone(),
            category_columns: self.category_columns.clone(),
            include_colors: self.include_colors,
            style,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Html,
    Pdf,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Some(ExportFormat::Xlsx),
            "csv" => Some(ExportFormat::Csv),
            "html" => Some(ExportFormat::Html),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// Extension of the downloaded file. The print layout is HTML.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "html",
            other => other.as_str(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Html | ExportFormat::Pdf => "text/html; charset=utf-8",
        }
    }
}

pub fn file_name(form_name: &str, format: ExportFormat) -> String {
    let base: String = form_name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '"' | ':' | '*' | '?' | '<' | '>' | '|') || c.is_control() { '_' } else { c })
        .collect();
    let base = if base.is_empty() { "form".to_string() } else { base };
    format!("{base}-entries.{}", format.extension())
}

pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Render already-selected rows in the requested format.
pub fn render(
    form: &Form,
    targets: &[FormEntry],
    opts: &ExportOptions,
    format: ExportFormat,
    assets_dir: &Path,
) -> Result<ExportFile, AppError> {
    let body = match format {
        ExportFormat::Xlsx => xlsx::build_workbook(form, targets, opts)?,
        ExportFormat::Csv => csv::build_csv(form, targets, opts).into_bytes(),
        ExportFormat::Html => html::render_snapshot(form, targets, opts)?.into_bytes(),
        ExportFormat::Pdf => html::render_print(form, targets, opts, assets_dir)?.into_bytes(),
    };
    Ok(ExportFile {
        file_name: file_name(&form.name, format),
        content_type: format.content_type(),
        body,
    })
}
