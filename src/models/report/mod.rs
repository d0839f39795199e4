//! Filtered entry reports with grouped counts for charts.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::entry::values::string_form;
use crate::models::entry::{EntryData, FormEntry};
use crate::models::form::Form;

pub mod filter;

pub use filter::{Condition, FilterTree, Group, Logic, Op};

pub const EMPTY_GROUP: &str = "(empty)";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// One form, or every permitted form when absent.
    #[serde(default)]
    pub form_id: Option<i64>,
    #[serde(default)]
    pub filter: FilterTree,
    #[serde(default)]
    pub group_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub form_id: i64,
    pub form_name: String,
    pub entry_id: i64,
    pub data: EntryData,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResult {
    pub total: usize,
    pub rows: Vec<ReportRow>,
    pub group_by: Option<String>,
    pub counts: Vec<GroupCount>,
}

/// Count rows per `group_by` value, largest groups first.
pub fn group_counts(rows: &[ReportRow], group_by: &str) -> Vec<GroupCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let key = row
            .data
            .get(group_by)
            .map(string_form)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| EMPTY_GROUP.to_string());
        *counts.entry(key).or_default() += 1;
    }
    let mut out: Vec<GroupCount> = counts.into_iter().map(|(key, count)| GroupCount { key, count }).collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    out
}

/// Apply the filter to entries of `forms`. Entries of forms not in the list are ignored.
pub fn build_report(forms: &[Form], entries: Vec<FormEntry>, req: &ReportRequest, today: NaiveDate) -> ReportResult {
    let names: HashMap<i64, &str> = forms.iter().map(|f| (f.id, f.name.as_str())).collect();
    let rows: Vec<ReportRow> = entries
        .into_iter()
        .filter(|e| req.filter.matches(e, today))
        .filter_map(|e| {
            let form_name = names.get(&e.form_id)?.to_string();
            Some(ReportRow {
                form_id: e.form_id,
                form_name,
                entry_id: e.id,
                data: e.data,
                created_at: e.created_at,
            })
        })
        .collect();

    let group_by = req.group_by.clone().filter(|g| !g.trim().is_empty());
    let counts = group_by.as_deref().map(|g| group_counts(&rows, g)).unwrap_or_default();
    ReportResult { total: rows.len(), rows, group_by, counts }
}
