use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::entry::FormEntry;
use crate::models::entry::values::{normalize_date, string_form};

/// Pseudo-field matching the entry's creation date.
pub const CREATED_AT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Logic {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Lt,
    Gt,
    Eq,
    Includes,
    WithinPast,
    WithinFuture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: Op,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Group {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Top-level conditions and nested groups, combined with `logic`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilterTree {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn as_date(v: &Value) -> Option<NaiveDate> {
    match v {
        Value::String(s) => normalize_date(s).and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        _ => None,
    }
}

fn combine(logic: &Logic, mut results: impl Iterator<Item = bool>) -> bool {
    match logic {
        Logic::And => results.all(|r| r),
        Logic::Or => results.any(|r| r),
    }
}

impl Condition {
    pub fn validate(&self) -> Option<String> {
        if self.field.trim().is_empty() {
            return Some("Every condition needs a field".to_string());
        }
        match self.op {
            Op::Lt | Op::Gt | Op::WithinPast | Op::WithinFuture if as_number(&self.value).is_none() => {
                Some(format!("Condition on '{}' needs a numeric value", self.field))
            }
            _ => None,
        }
    }

    pub fn matches(&self, entry: &FormEntry, today: NaiveDate) -> bool {
        let created = Value::String(entry.created_at.format("%Y-%m-%d").to_string());
        let actual = if self.field == CREATED_AT_FIELD { Some(&created) } else { entry.value(&self.field) };
        let Some(actual) = actual.filter(|v| !v.is_null()) else { return false };

        match self.op {
            Op::Lt => matches!((as_number(actual), as_number(&self.value)), (Some(a), Some(b)) if a < b),
            Op::Gt => matches!((as_number(actual), as_number(&self.value)), (Some(a), Some(b)) if a > b),
            Op::Eq => match (as_number(actual), as_number(&self.value)) {
                (Some(a), Some(b)) => a == b,
                _ => string_form(actual).trim() == string_form(&self.value).trim(),
            },
            Op::Includes => string_form(actual)
                .to_lowercase()
                .contains(&string_form(&self.value).trim().to_lowercase()),
            Op::WithinPast | Op::WithinFuture => {
                let (Some(date), Some(days)) = (as_date(actual), as_number(&self.value)) else {
                    return false;
                };
                if days < 0.0 {
                    return false;
                }
                let span = Days::new(days as u64);
                if self.op == Op::WithinPast {
                    today.checked_sub_days(span).is_some_and(|from| date >= from && date <= today)
                } else {
                    today.checked_add_days(span).is_some_and(|to| date >= today && date <= to)
                }
            }
        }
    }
}

impl FilterTree {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.groups.iter().all(|g| g.conditions.is_empty())
    }

    /// Every problem in the tree, empty when usable.
    pub fn validate(&self) -> Vec<String> {
        self.conditions
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.conditions.iter()))
            .filter_map(Condition::validate)
            .collect()
    }

    /// An empty tree matches everything; empty groups are ignored.
    pub fn matches(&self, entry: &FormEntry, today: NaiveDate) -> bool {
        if self.is_empty() {
            return true;
        }
        let conditions = self.conditions.iter().map(|c| c.matches(entry, today));
        let groups = self
            .groups
            .iter()
            .filter(|g| !g.conditions.is_empty())
            .map(|g| combine(&g.logic, g.conditions.iter().map(|c| c.matches(entry, today))));
        combine(&self.logic, conditions.chain(groups))
    }
}
