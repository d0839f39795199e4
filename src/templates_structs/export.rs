use askama::Template;

use crate::export::color::css_hex;
use crate::models::table::Section;

pub struct RowView {
    pub cells: Vec<String>,
    pub background: Option<String>,
}

pub struct SectionView {
    pub title: String,
    pub labels: Vec<String>,
    pub rows: Vec<RowView>,
}

impl From<Section> for SectionView {
    fn from(s: Section) -> Self {
        SectionView {
            title: s.title,
            labels: s.labels,
            rows: s
                .rows
                .into_iter()
                .map(|r| RowView {
                    background: r.color.as_deref().and_then(css_hex),
                    cells: r.cells,
                })
                .collect(),
        }
    }
}

/// Standalone RTL page with one table per section.
#[derive(Template)]
#[template(path = "export/snapshot.html")]
pub struct SnapshotTemplate {
    pub form_name: String,
    pub generated_at: String,
    pub sections: Vec<SectionView>,
}

/// Print layout for browser print-to-PDF.
#[derive(Template)]
#[template(path = "export/print.html")]
pub struct PrintTemplate {
    pub form_name: String,
    pub header_image: Option<String>,
    pub description: Option<String>,
    pub content_image: Option<String>,
    pub sections: Vec<SectionView>,
}
