//! Line-item table extraction.
//!
//! OCR output carries no table structure, so the table is reconstructed
//! from text lines: find a header row, then read rows until a totals line.
//! Descriptions wrapped over several lines are merged into the row that
//! finally carries the prices.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::invoice::LineItem;

use super::rules::amounts::{parse_amount, tax_for};
use super::rules::normalize::{fold_width, split_lines};

lazy_static! {
    static ref PRICE_TOKEN: Regex = Regex::new(
        r"^(?:[¥￥\\]\s*\d[\d,]*|\d{1,3}(?:,\d{3})+|\d{3,})(?:\.\d+)?円?-?$"
    ).unwrap();

    static ref QUANTITY_TOKEN: Regex = Regex::new(r"^\d{1,2}(?:\.\d+)?$").unwrap();

    static ref UNIT_QUANTITY: Regex = Regex::new(
        r"^(\d+(?:\.\d+)?)(人月|人日|時間|ヶ月|か月|ヵ月|ライセンス|セット|ページ|個|本|枚|台|式|件|回|日|月|人|名|箱|袋|点|組|冊|部|kg|h|H)$"
    ).unwrap();

    static ref UNIT_WORD: Regex = Regex::new(
        r"^(人月|人日|時間|ヶ月|か月|ヵ月|ライセンス|セット|ページ|個|本|枚|台|式|件|回|日|月|人|名|箱|袋|点|組|冊|部|kg|h|H)$"
    ).unwrap();

    static ref RATE_TOKEN: Regex = Regex::new(r"^(\d{1,2})[%％]$").unwrap();

    static ref ORDINAL_TOKEN: Regex = Regex::new(r"^\d{1,3}\.?$").unwrap();
}

/// Header keyword groups, including common OCR misreadings.
const DESCRIPTION_KEYWORDS: [&str; 11] = [
    "品名", "晶名", "品目", "商品", "摘要", "内容", "項目", "明細", "名称", "DESCRIPTION", "ITEM",
];
const QUANTITY_KEYWORDS: [&str; 6] = ["数量", "數量", "数呈", "個数", "QTY", "QUANTITY"];
const UNIT_PRICE_KEYWORDS: [&str; 5] = ["単価", "單価", "単佃", "UNITPRICE", "PRICE"];
const AMOUNT_KEYWORDS: [&str; 5] = ["金額", "金頷", "全額", "価格", "AMOUNT"];
const UNIT_KEYWORDS: [&str; 1] = ["単位"];

/// Lines ending the table. A header never contains these.
const TOTALS_KEYWORDS: [&str; 5] = ["合計", "小計", "消費税", "総額", "請求金額"];

/// Longest description kept; wrapped fragments stop merging past it.
const MAX_DESCRIPTION_CHARS: usize = 100;

/// Lines inside the table region that are never items.
const NOISE_KEYWORDS: [&str; 13] = [
    "振込", "銀行", "口座", "支店", "〒", "住所", "TEL", "電話", "FAX", "メール", "@", "登録番号",
    "支払期限",
];

/// One parsed table row before it becomes a [`LineItem`].
#[derive(Debug, Default, PartialEq)]
struct Row {
    description: String,
    prices: Vec<Decimal>,
    quantity: Option<Decimal>,
    unit: Option<String>,
    tax_rate: Option<Decimal>,
    remarks: Option<String>,
}

/// Reconstructs the line-item table from OCR text.
#[derive(Debug, Clone)]
pub struct LineItemTableExtractor {
    max_items: usize,
}

impl LineItemTableExtractor {
    /// Create an extractor keeping at most `max_items` rows.
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }

    /// Extract line items.
    ///
    /// When a description is found but no row ever carries a price, a
    /// single item is synthesized from `fallback_amount` (the document
    /// subtotal or total) with quantity 1. Without a header row the result
    /// is empty.
    pub fn extract(&self, text: &str, fallback_amount: Option<Decimal>) -> Vec<LineItem> {
        let lines = split_lines(text);

        let Some(header) = lines.iter().position(|line| is_header(line)) else {
            debug!("no line-item header found");
            return Vec::new();
        };
        debug!(line = header, "line-item header found");

        let mut items = Vec::new();
        let mut pending: Option<String> = None;

        for line in &lines[header + 1..] {
            if items.len() >= self.max_items {
                break;
            }
            if line.is_empty() {
                continue;
            }
            if is_totals_line(line) {
                break;
            }
            if is_noise(line) {
                continue;
            }

            let has_letters = line.chars().any(char::is_alphabetic);
            let row = parse_row(line, pending.is_some());

            if !has_letters && (pending.is_none() || row.prices.is_empty()) {
                continue;
            }

            if row.prices.is_empty() {
                if !row.description.is_empty() {
                    pending = Some(merge_pending(pending.take(), &row.description));
                }
                continue;
            }

            let description = merge_pending(pending.take(), &row.description);

            if let Some(item) = build_item(description, row) {
                items.push(item);
            }
        }

        if items.is_empty() {
            if let (Some(description), Some(amount)) = (pending, fallback_amount) {
                debug!("synthesizing single line item from document amount");
                if let Some(item) = single_item(description, amount) {
                    items.push(item);
                }
            }
        }

        debug!(count = items.len(), "line items extracted");
        items
    }
}

impl Default for LineItemTableExtractor {
    fn default() -> Self {
        Self::new(20)
    }
}

fn contains_any(line: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| line.contains(k))
}

/// `税込` ends the table only as a row label, e.g. "税込金額 ¥110,000";
/// "金額（税込）" in a header or row does not.
fn is_totals_line(line: &str) -> bool {
    contains_any(line, &TOTALS_KEYWORDS) || line.trim_start().starts_with("税込")
}

fn is_noise(line: &str) -> bool {
    let upper = fold_width(line).to_ascii_uppercase();
    contains_any(&upper, &NOISE_KEYWORDS)
}

fn has_price_token(line: &str) -> bool {
    fold_width(line)
        .split_whitespace()
        .any(|t| PRICE_TOKEN.is_match(t))
}

fn column_separators(line: &str) -> usize {
    line.chars().filter(|c| matches!(c, '|' | '｜' | '\t')).count()
}

/// Decide whether a line is the table header.
fn is_header(line: &str) -> bool {
    if line.is_empty() || contains_any(line, &TOTALS_KEYWORDS) || line.contains("件名") {
        return false;
    }

    let compact: String = fold_width(line)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    let groups = [
        &DESCRIPTION_KEYWORDS[..],
        &QUANTITY_KEYWORDS[..],
        &UNIT_PRICE_KEYWORDS[..],
        &AMOUNT_KEYWORDS[..],
        &UNIT_KEYWORDS[..],
    ]
    .iter()
    .filter(|group| contains_any(&compact, group))
    .count();

    if groups >= 2 {
        return true;
    }

    if has_price_token(line) {
        return false;
    }

    column_separators(line) >= 3
        || (contains_any(&compact, &DESCRIPTION_KEYWORDS) && line.split_whitespace().count() >= 3)
}

/// Join two description fragments: no space between Japanese text,
/// a single space between ASCII words.
fn join_description(prev: &str, next: &str) -> String {
    let ascii_boundary = prev.chars().last().is_some_and(|c| c.is_ascii_alphanumeric())
        && next.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    if ascii_boundary {
        format!("{prev} {next}")
    } else {
        format!("{prev}{next}")
    }
}

/// Append a fragment to the pending description.
fn merge_pending(pending: Option<String>, next: &str) -> String {
    match pending {
        None => next.to_string(),
        Some(prev) if next.is_empty() || prev.chars().count() > MAX_DESCRIPTION_CHARS => prev,
        Some(prev) => join_description(&prev, next),
    }
}

fn parse_decimal(token: &str) -> Option<Decimal> {
    Decimal::from_str(token).ok()
}

/// Split a row into description and numeric columns.
///
/// With `continues_description` set, the row completes a wrapped
/// description, so a bare leading number is still its quantity.
fn parse_row(line: &str, continues_description: bool) -> Row {
    let folded = fold_width(line);
    let (body, remarks) = match folded.split_once('※') {
        Some((body, note)) => (body.to_string(), Some(note.trim().to_string())),
        None => (folded.clone(), None),
    };

    let cleaned: String = body
        .chars()
        .map(|c| if matches!(c, '|' | '｜' | '\t') { ' ' } else { c })
        .collect();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();

    // Leading row number, e.g. "1 Web制作 ...".
    if tokens.len() > 1
        && ORDINAL_TOKEN.is_match(tokens[0])
        && tokens[1].chars().any(char::is_alphabetic)
    {
        tokens.remove(0);
    }

    let mut row = Row {
        remarks: remarks.filter(|r| !r.is_empty()),
        ..Row::default()
    };
    let mut description: Vec<&str> = Vec::new();
    let mut numbers_started = false;

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        let next = tokens.get(i + 1).copied();

        if let Some(caps) = RATE_TOKEN.captures(token) {
            numbers_started = true;
            row.tax_rate = parse_decimal(&caps[1]);
            // "10% 2": the rate column is followed by the quantity.
            if let Some(next) = next.filter(|n| QUANTITY_TOKEN.is_match(n)) {
                if row.quantity.is_none() {
                    row.quantity = parse_decimal(next);
                    i += 1;
                }
            }
        } else if let Some(caps) = UNIT_QUANTITY.captures(token) {
            numbers_started = true;
            if row.quantity.is_none() {
                row.quantity = parse_decimal(&caps[1]);
                row.unit = Some(caps[2].to_string());
            }
        } else if next.is_some_and(|n| UNIT_WORD.is_match(n))
            && token.chars().all(|c| c.is_ascii_digit() || c == '.')
            && row.quantity.is_none()
        {
            // "100 個"
            numbers_started = true;
            row.quantity = parse_decimal(token);
            row.unit = next.map(str::to_string);
            i += 1;
        } else if PRICE_TOKEN.is_match(token) {
            numbers_started = true;
            if let Some(price) = parse_amount(token) {
                row.prices.push(price);
            }
        } else if QUANTITY_TOKEN.is_match(token) {
            numbers_started = true;
            if row.quantity.is_none() && (continues_description || !description.is_empty()) {
                row.quantity = parse_decimal(token);
            }
        } else if UNIT_WORD.is_match(token) && row.quantity.is_some() && row.unit.is_none() {
            row.unit = Some(token.to_string());
        } else if !numbers_started {
            description.push(token);
        }

        i += 1;
    }

    row.description = description.join(" ");
    row
}

fn valid_description(description: &str) -> bool {
    (2..=MAX_DESCRIPTION_CHARS).contains(&description.chars().count())
}

fn build_item(description: String, row: Row) -> Option<LineItem> {
    if !valid_description(&description) {
        return None;
    }

    let amount = *row.prices.last()?;
    let unit_price = if row.prices.len() >= 2 {
        row.prices.first().copied()
    } else {
        row.quantity
            .filter(|q| !q.is_zero())
            .map(|q| (amount / q).round_dp(2).normalize())
    };

    Some(LineItem {
        description,
        quantity: row.quantity,
        unit: row.unit,
        unit_price,
        amount,
        tax_rate: row.tax_rate,
        tax_amount: row.tax_rate.map(|rate| tax_for(amount, rate)),
        remarks: row.remarks,
    })
}

fn single_item(description: String, amount: Decimal) -> Option<LineItem> {
    if !valid_description(&description) || amount <= Decimal::ZERO {
        return None;
    }

    Some(LineItem {
        description,
        quantity: Some(Decimal::ONE),
        unit: None,
        unit_price: Some(amount),
        amount,
        tax_rate: None,
        tax_amount: None,
        remarks: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn extract(text: &str) -> Vec<LineItem> {
        LineItemTableExtractor::default().extract(text, None)
    }

    #[test]
    fn test_pipe_table_single_row() {
        let items = extract("品名|数量|単価|金額\nWeb制作|1|100,000|100,000\n");

        assert_eq!(
            items,
            vec![LineItem {
                description: "Web制作".to_string(),
                quantity: Some(dec(1)),
                unit: None,
                unit_price: Some(dec(100_000)),
                amount: dec(100_000),
                tax_rate: None,
                tax_amount: None,
                remarks: None,
            }]
        );
    }

    #[test]
    fn test_whitespace_table_stops_at_totals() {
        let text = "\
品名 数量 単価 金額
1 サーバー保守 1式 30,000 30,000
2 ドメイン更新 2 1,500 3,000
小計 33,000
消費税 3,300
";
        let items = extract(text);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description, "サーバー保守");
        assert_eq!(items[0].unit.as_deref(), Some("式"));
        assert_eq!(items[1].description, "ドメイン更新");
        assert_eq!(items[1].quantity, Some(dec(2)));
        assert_eq!(items[1].unit_price, Some(dec(1_500)));
        assert_eq!(items[1].amount, dec(3_000));
    }

    #[test]
    fn test_wrapped_description_is_merged() {
        let text = "\
品名 数量 単価 金額
システム
保守費用
2 25,000 50,000
合計 55,000
";
        let items = extract(text);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "システム保守費用");
        assert_eq!(items[0].quantity, Some(dec(2)));
        assert_eq!(items[0].unit_price, Some(dec(25_000)));
        assert_eq!(items[0].amount, dec(50_000));
    }

    #[test]
    fn test_pending_description_stops_growing() {
        let long = "長".repeat(MAX_DESCRIPTION_CHARS + 1);
        assert_eq!(merge_pending(Some(long.clone()), "追加"), long);
        assert_eq!(merge_pending(Some("保守".to_string()), "費用"), "保守費用");
        assert_eq!(merge_pending(None, "費用"), "費用");

        let mut text = String::from("品名 数量 単価 金額\n");
        for _ in 0..200 {
            text.push_str("説明文の続き\n");
        }
        text.push_str("1 10,000 10,000\n");
        assert!(extract(&text).is_empty());
    }

    #[test]
    fn test_tax_inclusive_amount_header() {
        let items = extract("品名 数量 単価 金額（税込）\nWeb制作 1 110,000 110,000\n");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "Web制作");
        assert_eq!(items[0].amount, dec(110_000));
    }

    #[test]
    fn test_tax_inclusive_label_ends_table() {
        let text = "品名 数量 金額\nデザイン費 1 80,000\n税込金額 ¥88,000\n";
        let items = extract(text);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "デザイン費");
    }

    #[test]
    fn test_item_keyword_with_whitespace_columns_is_header() {
        assert!(is_header("品名 規格 備考"));
        assert!(!is_header("品名 規格"));
    }

    #[test]
    fn test_garbled_header_keywords() {
        assert!(is_header("晶名 数呈 単佃 金頷"));

        let items = extract("晶名 数量 単佃 金頷\n名刺印刷 2 3,000 6,000\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, Some(dec(2)));
        assert_eq!(items[0].unit_price, Some(dec(3_000)));
    }

    #[test]
    fn test_ascii_fragments_joined_with_space() {
        assert_eq!(join_description("Cloud", "Hosting"), "Cloud Hosting");
        assert_eq!(join_description("クラウド", "Hosting"), "クラウドHosting");
    }

    #[test]
    fn test_rate_column_and_remarks() {
        let text = "品名 税率 数量 金額\nお弁当 8% 3 1,620 ※軽減税率対象\n";
        let items = extract(text);

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.description, "お弁当");
        assert_eq!(item.tax_rate, Some(dec(8)));
        assert_eq!(item.quantity, Some(dec(3)));
        assert_eq!(item.unit_price, Some(dec(540)));
        assert_eq!(item.tax_amount, Some(dec(129)));
        assert_eq!(item.remarks.as_deref(), Some("軽減税率対象"));
    }

    #[test]
    fn test_noise_lines_skipped() {
        let text = "品名 数量 金額\n振込先 みずほ銀行 1234567\nデザイン費 1 80,000\n";
        let items = extract(text);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "デザイン費");
    }

    #[test]
    fn test_no_header_no_items() {
        assert!(extract("Web制作 1 100,000 100,000\n").is_empty());
    }

    #[test]
    fn test_totals_line_is_not_header() {
        assert!(!is_header("合計金額 単価"));
        assert!(!is_header("件名 品名 数量"));
        assert!(is_header("摘要 | 数量 | 単価"));
    }

    #[test]
    fn test_fallback_single_item() {
        let text = "品名 金額\nコンサルティング一式\n合計 ¥110,000\n";
        let items = LineItemTableExtractor::default().extract(text, Some(dec(100_000)));

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description, "コンサルティング一式");
        assert_eq!(items[0].quantity, Some(Decimal::ONE));
        assert_eq!(items[0].amount, dec(100_000));
    }

    #[test]
    fn test_max_items_cap() {
        let mut text = String::from("品名 数量 金額\n");
        for i in 0..30 {
            text.push_str(&format!("作業{i} 1 1,000\n"));
        }
        let items = LineItemTableExtractor::new(20).extract(&text, None);
        assert_eq!(items.len(), 20);
    }
}
