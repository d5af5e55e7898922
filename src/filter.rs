//! Interactive filter state: one optional value per dimension plus an
//! inclusive date range, combined with AND.

use crate::types::{Dimension, MetricRecord};
use crate::util::parse_any_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Both bounds may be given as `DD/MM/YYYY` or `YYYY-MM-DD`. `None` if
    /// either bound does not parse.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Some(Self::new(parse_any_date(start)?, parse_any_date(end)?))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    selected: BTreeMap<Dimension, String>,
    pub date_range: Option<DateRange>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Filters::set`].
    pub fn with(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        self.set(dimension, value);
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// An empty value clears the criterion. Date is filtered through
    /// [`Filters::date_range`] instead and is ignored here.
    pub fn set(&mut self, dimension: Dimension, value: impl Into<String>) {
        let value = value.into();
        if dimension == Dimension::Date || value.is_empty() {
            self.selected.remove(&dimension);
        } else {
            self.selected.insert(dimension, value);
        }
    }

    pub fn clear(&mut self, dimension: Dimension) {
        self.selected.remove(&dimension);
    }

    /// Selecting the active value again clears it; anything else replaces it.
    pub fn toggle(&mut self, dimension: Dimension, value: &str) {
        if self.selected(dimension) == Some(value) {
            self.clear(dimension);
        } else {
            self.set(dimension, value);
        }
    }

    pub fn selected(&self, dimension: Dimension) -> Option<&str> {
        self.selected.get(&dimension).map(String::as_str)
    }

    pub fn active_count(&self) -> usize {
        self.selected.len() + usize::from(self.date_range.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn matches(&self, record: &MetricRecord) -> bool {
        if let Some(range) = &self.date_range {
            match record.date {
                Some(d) if range.contains(d) => {}
                _ => return false,
            }
        }
        self.selected
            .iter()
            .all(|(dimension, wanted)| record.label(*dimension) == Some(wanted.as_str()))
    }

    pub fn apply<'a>(&self, records: &'a [MetricRecord]) -> Vec<&'a MetricRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Sorted distinct non-empty values of `dimension`, for filter option lists.
pub fn distinct_values<'a, I>(records: I, dimension: Dimension) -> Vec<String>
where
    I: IntoIterator<Item = &'a MetricRecord>,
{
    let set: BTreeSet<String> = records
        .into_iter()
        .map(|r| r.key_part(dimension))
        .filter(|v| !v.is_empty())
        .collect();
    set.into_iter().collect()
}
