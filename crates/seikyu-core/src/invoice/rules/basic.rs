//! Header fields: invoice number, subject, order number, currency and the
//! free-text payment condition.

use crate::models::invoice::FeeBearer;

use super::cascade::{Cascade, Rule};
use super::normalize::fold_width;
use super::patterns::{
    BILLING_PERIOD, CURRENCY, FEE_BEARER, INVOICE_NUMBER, INVOICE_NUMBER_NO,
    INVOICE_NUMBER_STANDALONE, ORDER_NUMBER, PAYMENT_CONDITION_LABELED,
    PAYMENT_CONDITION_STANDALONE, PROJECT_NAME, SUBJECT,
};
use super::{ExtractionMatch, FieldExtractor};

/// Header fields found on an invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedBasicInfo {
    pub invoice_number: Option<ExtractionMatch<String>>,
    /// 件名.
    pub subject: Option<ExtractionMatch<String>>,
    pub order_number: Option<ExtractionMatch<String>>,
    /// ISO 4217 code from a `通貨:` label.
    pub currency: Option<ExtractionMatch<String>>,
    pub billing_period: Option<ExtractionMatch<String>>,
    pub project_name: Option<ExtractionMatch<String>>,
    /// e.g. 月末締め翌月末払い.
    pub payment_condition: Option<ExtractionMatch<String>>,
    pub fee_bearer: Option<ExtractionMatch<FeeBearer>>,
}

/// Extractor for invoice header fields.
#[derive(Debug)]
pub struct BasicInfoExtractor {
    invoice_number: Cascade<String>,
    subject: Cascade<String>,
    order_number: Cascade<String>,
    currency: Cascade<String>,
    billing_period: Cascade<String>,
    project_name: Cascade<String>,
    payment_condition: Cascade<String>,
    fee_bearer: Cascade<FeeBearer>,
}

impl BasicInfoExtractor {
    pub fn new() -> Self {
        Self {
            invoice_number: Cascade::new("invoice_number")
                .rule(Rule::pattern(&INVOICE_NUMBER, 0.95, validate_identifier))
                .rule(Rule::pattern(&INVOICE_NUMBER_NO, 0.7, validate_identifier))
                .rule(Rule::pattern(&INVOICE_NUMBER_STANDALONE, 0.45, validate_identifier)),
            subject: Cascade::new("subject").rule(Rule::pattern(&SUBJECT, 0.9, validate_label_value)),
            order_number: Cascade::new("order_number")
                .rule(Rule::pattern(&ORDER_NUMBER, 0.9, validate_identifier)),
            currency: Cascade::new("currency").rule(Rule::pattern(&CURRENCY, 0.9, validate_currency)),
            billing_period: Cascade::new("billing_period")
                .rule(Rule::pattern(&BILLING_PERIOD, 0.85, validate_label_value)),
            project_name: Cascade::new("project_name")
                .rule(Rule::pattern(&PROJECT_NAME, 0.85, validate_label_value)),
            payment_condition: Cascade::new("payment_condition")
                .rule(Rule::pattern(&PAYMENT_CONDITION_LABELED, 0.9, validate_label_value))
                .rule(Rule::pattern(&PAYMENT_CONDITION_STANDALONE, 0.6, validate_label_value)),
            fee_bearer: Cascade::new("fee_bearer")
                .rule(Rule::pattern(&FEE_BEARER, 0.8, parse_fee_bearer)),
        }
    }

    pub fn extract(&self, text: &str) -> ExtractedBasicInfo {
        ExtractedBasicInfo {
            invoice_number: self.invoice_number.extract(text),
            subject: self.subject.extract(text),
            order_number: self.order_number.extract(text),
            currency: self.currency.extract(text),
            billing_period: self.billing_period.extract(text),
            project_name: self.project_name.extract(text),
            payment_condition: self.payment_condition.extract(text),
            fee_bearer: self.fee_bearer.extract(text),
        }
    }
}

impl Default for BasicInfoExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract header fields from text.
pub fn extract_basic_info(text: &str) -> ExtractedBasicInfo {
    BasicInfoExtractor::new().extract(text)
}

/// Document identifiers: 3 - 30 characters with at least one digit.
fn validate_identifier(candidate: &str) -> Option<String> {
    let id = fold_width(candidate.trim()).replace(['－'], "-");
    let id = id.trim_end_matches(['.', '-', '/']);

    let len = id.chars().count();
    let has_digit = id.chars().any(|c| c.is_ascii_digit());

    ((3..=30).contains(&len) && has_digit).then(|| id.to_string())
}

/// Free text following a label, e.g. `件名: Webサイト制作`.
fn validate_label_value(candidate: &str) -> Option<String> {
    let value = candidate
        .trim()
        .trim_start_matches([':', '：'])
        .trim();
    (1..=100).contains(&value.chars().count()).then(|| value.to_string())
}

fn validate_currency(candidate: &str) -> Option<String> {
    let code = candidate.trim();
    (code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())).then(|| code.to_string())
}

fn parse_fee_bearer(candidate: &str) -> Option<FeeBearer> {
    match candidate {
        "貴社" | "御社" | "お客様" | "ご依頼人" | "ご依頼主" | "ご負担" => Some(FeeBearer::Payer),
        "当社" | "弊社" => Some(FeeBearer::Payee),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value<T: Clone>(m: &Option<ExtractionMatch<T>>) -> Option<T> {
        m.as_ref().map(|m| m.value.clone())
    }

    #[test]
    fn test_labeled_invoice_number() {
        let info = extract_basic_info("請求書番号: INV-2024-001\n");
        let number = info.invoice_number.unwrap();
        assert_eq!(number.value, "INV-2024-001");
        assert_eq!(number.confidence, 0.95);
    }

    #[test]
    fn test_invoice_number_fallbacks() {
        let info = extract_basic_info("請求書\nNo. 20241124-01\n");
        let number = info.invoice_number.unwrap();
        assert_eq!(number.value, "20241124-01");
        assert_eq!(number.confidence, 0.7);

        let info = extract_basic_info("請求書 INV-00123\n");
        let number = info.invoice_number.unwrap();
        assert_eq!(number.value, "INV-00123");
        assert_eq!(number.confidence, 0.45);
    }

    #[test]
    fn test_invoice_number_requires_digit() {
        assert_eq!(extract_basic_info("請求書番号: ABCDEF").invoice_number, None);
    }

    #[test]
    fn test_header_fields() {
        let text = "\
件名：Webサイトリニューアル
注文番号: PO-7788
通貨: USD
対象期間: 2024年10月1日～2024年10月31日
案件名: コーポレートサイト
";
        let info = extract_basic_info(text);

        assert_eq!(value(&info.subject), Some("Webサイトリニューアル".to_string()));
        assert_eq!(value(&info.order_number), Some("PO-7788".to_string()));
        assert_eq!(value(&info.currency), Some("USD".to_string()));
        assert_eq!(
            value(&info.billing_period),
            Some("2024年10月1日～2024年10月31日".to_string())
        );
        assert_eq!(value(&info.project_name), Some("コーポレートサイト".to_string()));
    }

    #[test]
    fn test_payment_condition() {
        let info = extract_basic_info("お支払条件: 月末締め翌月末払い");
        assert_eq!(value(&info.payment_condition), Some("月末締め翌月末払い".to_string()));

        let info = extract_basic_info("※ 月末締め 翌月末払い でお願いします");
        let condition = info.payment_condition.unwrap();
        assert_eq!(condition.value, "月末締め 翌月末払い");
        assert_eq!(condition.confidence, 0.6);
    }

    #[test]
    fn test_fee_bearer() {
        let info = extract_basic_info("振込手数料は貴社にてご負担ください");
        assert_eq!(value(&info.fee_bearer), Some(FeeBearer::Payer));

        let info = extract_basic_info("振込手数料は弊社負担");
        assert_eq!(value(&info.fee_bearer), Some(FeeBearer::Payee));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(extract_basic_info(""), ExtractedBasicInfo::default());
    }
}
