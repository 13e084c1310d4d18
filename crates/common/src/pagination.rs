//! Pagination summary parsing, page arithmetic and sort-order checks

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::types::SortField;

static SUMMARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)showing\s+([\d,]+)\s+to\s+([\d,]+)\s+of\s+([\d,]+)\s+entr")
        .expect("summary pattern is valid")
});

/// Parsed "Showing {start} to {end} of {total} entries"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSummary {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

fn grouped_number(raw: &str, text: &str) -> Result<u64> {
    raw.replace(',', "")
        .parse()
        .map_err(|_| Error::SummaryFormat(text.to_string()))
}

impl PaginationSummary {
    pub fn parse(text: &str) -> Result<Self> {
        let caps = SUMMARY_RE
            .captures(text)
            .ok_or_else(|| Error::SummaryFormat(text.trim().to_string()))?;

        let summary = Self {
            start: grouped_number(&caps[1], text)?,
            end: grouped_number(&caps[2], text)?,
            total: grouped_number(&caps[3], text)?,
        };

        if summary.total > 0 && summary.end < summary.start {
            return Err(Error::SummaryFormat(text.trim().to_string()));
        }
        Ok(summary)
    }

    /// Rows the current page should render
    pub fn expected_visible_rows(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn total_pages(&self, page_size: u64) -> Result<u64> {
        total_pages(self.total, page_size)
    }
}

/// `max(1, ceil(total / page_size))`
pub fn total_pages(total: u64, page_size: u64) -> Result<u64> {
    if page_size == 0 {
        return Err(Error::InvalidPageSize(page_size));
    }
    Ok(total.div_ceil(page_size).max(1))
}

/// First, third and last page; every page when there are at most two
pub fn pages_to_validate(total_pages: u64) -> Vec<u64> {
    if total_pages <= 2 {
        return (1..=total_pages.max(1)).collect();
    }
    let mut pages = vec![1, 3, total_pages];
    pages.sort_unstable();
    pages.dedup();
    pages
}

/// Rows expected on `page`: a full page, or the remainder on the last one
pub fn expected_rows_on_page(total: u64, page_size: u64, page: u64) -> u64 {
    let before = page.saturating_sub(1).saturating_mul(page_size);
    total.saturating_sub(before).min(page_size)
}

/// Column heading of a validated page in the sort/paging table
pub fn page_label(page: u64, total_pages: u64) -> String {
    match page {
        1 => "1st".to_string(),
        p if p == total_pages => "Last".to_string(),
        2 => "2nd".to_string(),
        3 => "3rd".to_string(),
        p => p.to_string(),
    }
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;
    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        match in_digits {
            Some(d) if d != digit => {
                out.push(if d { Chunk::Digits(&s[start..i]) } else { Chunk::Text(&s[start..i]) });
                start = i;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }
    if let Some(d) = in_digits {
        out.push(if d { Chunk::Digits(&s[start..]) } else { Chunk::Text(&s[start..]) });
    }
    out
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    let fold = |s: &str| -> Vec<char> {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    };
    fold(a).cmp(&fold(b))
}

/// Case-insensitive comparison where digit runs compare by numeric value,
/// so "Item 9" sorts before "Item 10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);
    for (x, y) in left.iter().zip(right.iter()) {
        let ord = match (x, y) {
            (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => cmp_text(x, y),
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len())
}

const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Parse a rendered "Last Updated" cell
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    ["%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Compare two cells of the sort column
pub fn compare_sort_values(field: SortField, a: &str, b: &str) -> Ordering {
    if field == SortField::LastUpdated {
        if let (Some(x), Some(y)) = (parse_timestamp(a), parse_timestamp(b)) {
            return x.cmp(&y);
        }
    }
    natural_cmp(a, b)
}

/// Result of checking one page's sort column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCheck {
    pub in_order: bool,
    /// Index of the first value that breaks the order
    pub first_violation: Option<usize>,
}

impl SortCheck {
    /// Blank cells are ignored. Equal neighbours never break the order.
    pub fn evaluate<S: AsRef<str>>(field: SortField, ascending: bool, values: &[S]) -> Self {
        let cells: Vec<&str> = values
            .iter()
            .map(|v| v.as_ref().trim())
            .filter(|v| !v.is_empty())
            .collect();

        let first_violation = cells.windows(2).position(|pair| {
            let ord = compare_sort_values(field, pair[0], pair[1]);
            if ascending {
                ord == Ordering::Greater
            } else {
                ord == Ordering::Less
            }
        });

        Self {
            in_order: first_violation.is_none(),
            first_violation: first_violation.map(|i| i + 1),
        }
    }
}
