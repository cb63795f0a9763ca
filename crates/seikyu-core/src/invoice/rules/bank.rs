//! Bank transfer details (振込先).

use super::cascade::{Cascade, Rule};
use super::normalize::fold_width;
use super::patterns::{
    ACCOUNT_HOLDER_KANA, ACCOUNT_HOLDER_LABELED, ACCOUNT_NUMBER_AFTER_TYPE, ACCOUNT_NUMBER_LABELED,
    ACCOUNT_TYPE_LABELED, ACCOUNT_TYPE_STANDALONE, BANK_LABELED, BANK_STANDALONE, BRANCH_LABELED,
    BRANCH_STANDALONE,
};
use super::{ExtractionMatch, FieldExtractor};

const BANK_SUFFIXES: [&str; 5] = ["銀行", "信用金庫", "信用組合", "労働金庫", "農業協同組合"];
const BANK_LABELS: [&str; 6] = ["お振込先", "振込先", "お振込口座", "振込口座", "金融機関", "銀行名"];

/// Bank account fields found on an invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankDetails {
    pub bank_name: Option<ExtractionMatch<String>>,
    pub branch_name: Option<ExtractionMatch<String>>,
    /// 普通, 当座 or 貯蓄.
    pub account_type: Option<ExtractionMatch<String>>,
    pub account_number: Option<ExtractionMatch<String>>,
    pub account_holder: Option<ExtractionMatch<String>>,
}

/// Extractor for the bank transfer block.
#[derive(Debug)]
pub struct BankExtractor {
    bank_name: Cascade<String>,
    branch_name: Cascade<String>,
    account_type: Cascade<String>,
    account_number: Cascade<String>,
    account_holder: Cascade<String>,
}

impl BankExtractor {
    pub fn new() -> Self {
        Self {
            bank_name: Cascade::new("bank_name")
                .rule(Rule::pattern(&BANK_LABELED, 0.9, validate_bank_name))
                .rule(Rule::pattern(&BANK_STANDALONE, 0.7, validate_bank_name)),
            branch_name: Cascade::new("branch_name")
                .rule(Rule::pattern(&BRANCH_LABELED, 0.9, validate_branch_name))
                .rule(Rule::pattern(&BRANCH_STANDALONE, 0.7, validate_branch_name)),
            account_type: Cascade::new("account_type")
                .rule(Rule::pattern(&ACCOUNT_TYPE_LABELED, 0.95, validate_account_type))
                .rule(Rule::pattern(&ACCOUNT_TYPE_STANDALONE, 0.7, validate_account_type)),
            account_number: Cascade::new("account_number")
                .rule(Rule::pattern(&ACCOUNT_NUMBER_LABELED, 0.95, validate_account_number))
                .rule(Rule::pattern(&ACCOUNT_NUMBER_AFTER_TYPE, 0.8, validate_account_number)),
            account_holder: Cascade::new("account_holder")
                .rule(Rule::pattern(&ACCOUNT_HOLDER_LABELED, 0.9, validate_account_holder))
                .rule(Rule::pattern(&ACCOUNT_HOLDER_KANA, 0.5, validate_account_holder)),
        }
    }

    pub fn extract(&self, text: &str) -> BankDetails {
        BankDetails {
            bank_name: self.bank_name.extract(text),
            branch_name: self.branch_name.extract(text),
            account_type: self.account_type.extract(text),
            account_number: self.account_number.extract(text),
            account_holder: self.account_holder.extract(text),
        }
    }
}

impl Default for BankExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract bank details from text.
pub fn extract_bank_details(text: &str) -> BankDetails {
    BankExtractor::new().extract(text)
}

fn validate_bank_name(candidate: &str) -> Option<String> {
    let mut name = candidate.trim();
    for label in BANK_LABELS {
        name = name.strip_prefix(label).unwrap_or(name);
    }
    let name = name.trim_start_matches([':', '：', ' ']);

    let len = name.chars().count();
    let has_suffix = BANK_SUFFIXES.iter().any(|s| name.ends_with(s) && name != *s);

    (has_suffix && (2..=25).contains(&len)).then(|| name.to_string())
}

fn validate_branch_name(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();

    // "みずほ銀行渋谷支店" read as one token: keep what follows the bank.
    let branch = BANK_SUFFIXES
        .iter()
        .filter_map(|s| candidate.rfind(s).map(|i| &candidate[i + s.len()..]))
        .min_by_key(|rest| rest.len())
        .unwrap_or(candidate)
        .trim();

    let is_bare_suffix = matches!(branch, "支店" | "出張所" | "支所" | "営業部" | "名");
    (!branch.is_empty() && !is_bare_suffix && branch.chars().count() <= 30)
        .then(|| branch.to_string())
}

fn validate_account_type(candidate: &str) -> Option<String> {
    let kind = match candidate.trim() {
        "普通" | "(普)" | "（普）" => "普通",
        "当座" | "(当)" | "（当）" => "当座",
        "貯蓄" => "貯蓄",
        _ => return None,
    };
    Some(kind.to_string())
}

fn validate_account_number(candidate: &str) -> Option<String> {
    let digits = fold_width(candidate.trim());
    let valid = (6..=8).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    valid.then_some(digits)
}

fn validate_account_holder(candidate: &str) -> Option<String> {
    let holder = candidate.trim().trim_end_matches('様').trim();
    (2..=60).contains(&holder.chars().count()).then(|| holder.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value(m: &Option<ExtractionMatch<String>>) -> Option<&str> {
        m.as_ref().map(|m| m.value.as_str())
    }

    #[test]
    fn test_labeled_block() {
        let text = "\
お振込先: みずほ銀行
支店名: 渋谷支店
口座種別: 普通
口座番号: 1234567
口座名義: カ）サンプルシステム
";
        let details = extract_bank_details(text);

        assert_eq!(value(&details.bank_name), Some("みずほ銀行"));
        assert_eq!(value(&details.branch_name), Some("渋谷支店"));
        assert_eq!(value(&details.account_type), Some("普通"));
        assert_eq!(value(&details.account_number), Some("1234567"));
        assert_eq!(value(&details.account_holder), Some("カ）サンプルシステム"));
        assert_eq!(details.account_number.unwrap().confidence, 0.95);
    }

    #[test]
    fn test_single_line_bank_block() {
        let details = extract_bank_details("三井住友銀行 新宿支店 (普) 7654321");

        assert_eq!(value(&details.bank_name), Some("三井住友銀行"));
        assert_eq!(value(&details.branch_name), Some("新宿支店"));
        assert_eq!(value(&details.account_type), Some("普通"));
        assert_eq!(value(&details.account_number), Some("7654321"));
    }

    #[test]
    fn test_branch_glued_to_bank() {
        assert_eq!(validate_branch_name("みずほ銀行渋谷支店"), Some("渋谷支店".to_string()));
        assert_eq!(validate_branch_name("支店"), None);
    }

    #[test]
    fn test_account_number_length() {
        assert_eq!(validate_account_number("12345"), None);
        assert_eq!(validate_account_number("１２３４５６７"), Some("1234567".to_string()));
        assert_eq!(validate_account_number("123456789"), None);
    }

    #[test]
    fn test_no_bank_block() {
        assert_eq!(extract_bank_details("請求書\n合計 ¥1,000"), BankDetails::default());
    }
}
