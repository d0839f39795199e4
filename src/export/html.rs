use std::path::Path;

use askama::Template;
use chrono::Utc;

use crate::errors::AppError;
use crate::models::entry::FormEntry;
use crate::models::form::Form;
use crate::models::table::{CellStyle, build_sections};
use crate::templates_structs::export::{PrintTemplate, SectionView, SnapshotTemplate};

use super::ExportOptions;

/// Asset served at the top of every print layout, when present.
pub const HEADER_IMAGE: &str = "logo.png";

/// Public URL of a file in the assets directory, if it exists there.
/// Only bare file names are accepted.
pub fn asset_url(assets_dir: &Path, name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return None;
    }
    assets_dir
        .join(name)
        .is_file()
        .then(|| format!("/static/{name}"))
}

pub fn render_snapshot(form: &Form, targets: &[FormEntry], opts: &ExportOptions) -> Result<String, AppError> {
    let sections = build_sections(form, targets, &opts.section_options(CellStyle::Display));
    let tmpl = SnapshotTemplate {
        form_name: form.name.clone(),
        generated_at: Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        sections: sections.into_iter().map(SectionView::from).collect(),
    };
    Ok(tmpl.render()?)
}

/// Print layout. Sections without rows are left out; nothing to print is an error.
pub fn render_print(
    form: &Form,
    targets: &[FormEntry],
    opts: &ExportOptions,
    assets_dir: &Path,
) -> Result<String, AppError> {
    let sections: Vec<SectionView> = build_sections(form, targets, &opts.section_options(CellStyle::Export))
        .into_iter()
        .filter(|s| !s.is_empty() && !s.labels.is_empty())
        .map(SectionView::from)
        .collect();
    if sections.is_empty() {
        return Err(AppError::BadRequest("Selected rows have no values to print".to_string()));
    }
    let tmpl = PrintTemplate {
        form_name: form.name.clone(),
        header_image: asset_url(assets_dir, HEADER_IMAGE),
        description: form.pdf_description.clone().filter(|d| !d.trim().is_empty()),
        content_image: form.pdf_image.as_deref().and_then(|img| asset_url(assets_dir, img)),
        sections,
    };
    Ok(tmpl.render()?)
}
