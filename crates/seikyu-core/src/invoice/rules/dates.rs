//! Date parsing for Japanese invoices, including imperial era dates.

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use super::cascade::{Cascade, Rule};
use super::normalize::fold_width;
use super::patterns::{DATE_TOKEN, DUE_DATE, ISSUE_DATE, TRANSACTION_DATE};
use super::{ExtractionMatch, FieldExtractor};

lazy_static! {
    static ref ISO: Regex = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap();
    static ref SLASH: Regex = Regex::new(r"(\d{4})\s*[/\-]\s*(\d{1,2})\s*[/\-]\s*(\d{1,2})").unwrap();
    static ref DOT: Regex = Regex::new(r"(\d{4})\s*\.\s*(\d{1,2})\s*\.\s*(\d{1,2})").unwrap();
    static ref KANJI: Regex = Regex::new(r"(\d{4})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日").unwrap();
    static ref ERA: Regex = Regex::new(
        r"(令和|平成|昭和|大正)\s*(\d{1,2}|元)\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日"
    ).unwrap();
}

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// First western year of each supported era.
fn era_start_year(era: &str) -> Option<i32> {
    match era {
        "令和" => Some(2019),
        "平成" => Some(1989),
        "昭和" => Some(1926),
        "大正" => Some(1912),
        _ => None,
    }
}

/// Parse a date token into a calendar date.
///
/// Recognized, in order: ISO `YYYY-MM-DD`, `YYYY/MM/DD` (or dashes),
/// `YYYY.MM.DD`, `YYYY年MM月DD日` and era dates such as `令和6年11月24日`.
/// Returns `None` for anything unparseable, impossible (Feb 30) or outside
/// 1900 - 2100.
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    let token = fold_width(token.trim());

    let parsed = if let Some(caps) = ISO.captures(&token) {
        ymd(&caps[1], &caps[2], &caps[3])
    } else if let Some(caps) = SLASH.captures(&token) {
        ymd(&caps[1], &caps[2], &caps[3])
    } else if let Some(caps) = DOT.captures(&token) {
        ymd(&caps[1], &caps[2], &caps[3])
    } else if let Some(caps) = KANJI.captures(&token) {
        ymd(&caps[1], &caps[2], &caps[3])
    } else if let Some(caps) = ERA.captures(&token) {
        let start = era_start_year(&caps[1])?;
        let era_year: i32 = match &caps[2] {
            "元" => 1,
            n => n.parse().ok()?,
        };
        if era_year == 0 {
            return None;
        }
        let month: u32 = caps[3].parse().ok()?;
        let day: u32 = caps[4].parse().ok()?;
        NaiveDate::from_ymd_opt(start + era_year - 1, month, day)
    } else {
        None
    };

    let date = parsed?;
    (MIN_YEAR..=MAX_YEAR).contains(&date.year()).then_some(date)
}

/// Parse a date token into an ISO `YYYY-MM-DD` string.
pub fn normalize_date(token: &str) -> Option<String> {
    parse_date(token).map(|d| d.format("%Y-%m-%d").to_string())
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Find and parse the first date token inside a longer string.
fn parse_date_in(text: &str) -> Option<NaiveDate> {
    DATE_TOKEN
        .find_iter(text)
        .find_map(|m| parse_date(m.as_str()))
}

/// Unlabeled date extractor: every date token in the text.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        DATE_TOKEN
            .find_iter(text)
            .filter_map(|m| {
                parse_date(m.as_str()).map(|date| {
                    ExtractionMatch::new(date, 0.5, m.as_str()).with_position(m.start(), m.end())
                })
            })
            .collect()
    }
}

/// Labeled dates found on an invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceDates {
    /// Issue date (発行日).
    pub issue_date: Option<ExtractionMatch<NaiveDate>>,
    /// Transaction/delivery date (取引日).
    pub transaction_date: Option<ExtractionMatch<NaiveDate>>,
    /// Payment due date (支払期限).
    pub due_date: Option<ExtractionMatch<NaiveDate>>,
}

/// Cascades for the three labeled invoice dates.
#[derive(Debug)]
pub struct DateCascades {
    issue: Cascade<NaiveDate>,
    transaction: Cascade<NaiveDate>,
    due: Cascade<NaiveDate>,
}

impl DateCascades {
    pub fn new() -> Self {
        Self {
            issue: Cascade::new("issue_date")
                .rule(Rule::pattern(&ISSUE_DATE, 0.95, parse_date_in))
                .rule(Rule::pattern_group(&DATE_TOKEN, 0, 0.5, parse_date)),
            transaction: Cascade::new("transaction_date")
                .rule(Rule::pattern(&TRANSACTION_DATE, 0.9, parse_date_in)),
            due: Cascade::new("due_date")
                .rule(Rule::pattern(&DUE_DATE, 0.9, parse_date_in)),
        }
    }

    /// Extract all labeled dates.
    ///
    /// Only the issue date falls back to the first date in the document.
    pub fn extract(&self, text: &str) -> InvoiceDates {
        InvoiceDates {
            issue_date: self.issue.extract(text),
            transaction_date: self.transaction.extract(text),
            due_date: self.due.extract(text),
        }
    }
}

impl Default for DateCascades {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract all labeled dates from invoice text.
pub fn extract_dates(text: &str) -> InvoiceDates {
    DateCascades::new().extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_formats() {
        assert_eq!(normalize_date("2024-11-24"), Some("2024-11-24".to_string()));
        assert_eq!(normalize_date("2024/11/24"), Some("2024-11-24".to_string()));
        assert_eq!(normalize_date("2024-1-5"), Some("2024-01-05".to_string()));
        assert_eq!(normalize_date("2024.11.24"), Some("2024-11-24".to_string()));
        assert_eq!(normalize_date("2024年11月24日"), Some("2024-11-24".to_string()));
        assert_eq!(normalize_date("２０２４年１１月２４日"), Some("2024-11-24".to_string()));
    }

    #[test]
    fn test_era_dates() {
        assert_eq!(normalize_date("令和6年11月24日"), Some("2024-11-24".to_string()));
        assert_eq!(normalize_date("平成31年4月30日"), Some("2019-04-30".to_string()));
        assert_eq!(normalize_date("昭和64年1月7日"), Some("1989-01-07".to_string()));
        assert_eq!(normalize_date("大正2年3月1日"), Some("1913-03-01".to_string()));
        assert_eq!(normalize_date("令和元年5月1日"), Some("2019-05-01".to_string()));
    }

    #[test]
    fn test_rejects_impossible_dates() {
        assert_eq!(normalize_date("2024/02/30"), None);
        assert_eq!(normalize_date("2023年2月29日"), None);
        assert_eq!(normalize_date("2024-13-01"), None);
        assert_eq!(normalize_date("令和0年1月1日"), None);
    }

    #[test]
    fn test_rejects_out_of_range_years() {
        assert_eq!(normalize_date("1899/12/31"), None);
        assert_eq!(normalize_date("2101-01-01"), None);
        assert_eq!(normalize_date("1900/01/01"), Some("1900-01-01".to_string()));
    }

    #[test]
    fn test_unparseable_is_absent() {
        assert_eq!(normalize_date("来月末"), None);
        assert_eq!(normalize_date(""), None);
    }

    #[test]
    fn test_extract_labeled_dates() {
        let text = "請求書\n発行日: 令和6年11月24日\n取引日：2024/11/20\nお支払期限 2024年12月31日\n";
        let dates = extract_dates(text);

        let issue = dates.issue_date.unwrap();
        assert_eq!(issue.value, date(2024, 11, 24));
        assert_eq!(issue.confidence, 0.95);
        assert_eq!(dates.transaction_date.unwrap().value, date(2024, 11, 20));
        assert_eq!(dates.due_date.unwrap().value, date(2024, 12, 31));
    }

    #[test]
    fn test_issue_date_falls_back_to_first_date() {
        let dates = extract_dates("請求書\n2024/10/01\n");
        let issue = dates.issue_date.unwrap();
        assert_eq!(issue.value, date(2024, 10, 1));
        assert_eq!(issue.confidence, 0.5);
        assert!(dates.due_date.is_none());
    }

    #[test]
    fn test_date_extractor_finds_all() {
        let all = DateExtractor::new().extract_all("2024/01/31 と 令和6年2月1日");
        let values: Vec<NaiveDate> = all.into_iter().map(|m| m.value).collect();
        assert_eq!(values, vec![date(2024, 1, 31), date(2024, 2, 1)]);
    }
}
