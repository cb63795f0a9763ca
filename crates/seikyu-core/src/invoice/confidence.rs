//! Completeness scoring.
//!
//! The score is a coarse completeness proxy: the share of a fixed 17-item
//! field checklist that was populated. It says nothing about whether any
//! individual value is correct; per-field confidence lives in
//! [`InvoiceMetadata::field_confidence`](crate::models::invoice::InvoiceMetadata).

use rust_decimal::Decimal;

use crate::models::invoice::{
    AmountInfo, BillingTo, InvoiceBasicInfo, IssuerInfo, LineItem, PaymentTerms,
    UNEXTRACTED_COMPANY_NAME,
};

/// Number of checklist items.
pub const CHECKLIST_SIZE: usize = 17;

/// The record parts the checklist looks at.
#[derive(Debug, Clone, Copy)]
pub struct ScoredFields<'a> {
    pub basic_info: &'a InvoiceBasicInfo,
    pub billing_to: &'a BillingTo,
    pub issuer: Option<&'a IssuerInfo>,
    pub amounts: &'a AmountInfo,
    pub line_items: &'a [LineItem],
    pub payment_terms: &'a PaymentTerms,
}

/// Computes the completeness score of an assembled record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every checklist item.
    ///
    /// Order: basic info (invoice number, issue date, transaction date,
    /// subject), billing (company, department, contact), issuer (name,
    /// address, phone, email, registration number), amounts (subtotal, tax,
    /// total), line items, payment terms.
    pub fn checklist(&self, fields: &ScoredFields<'_>) -> [bool; CHECKLIST_SIZE] {
        let basic = fields.basic_info;
        let billing = fields.billing_to;
        let issuer = fields.issuer;
        let amounts = fields.amounts;

        [
            is_populated(basic.invoice_number.as_deref()),
            basic.issue_date.is_some(),
            basic.transaction_date.is_some(),
            is_populated(basic.subject.as_deref()),
            is_populated(Some(&billing.company_name)),
            is_populated(billing.department.as_deref()),
            is_populated(billing.contact_person.as_deref()),
            is_populated(issuer.map(|i| i.name.as_str())),
            is_populated(issuer.and_then(|i| i.address.as_deref())),
            is_populated(issuer.and_then(|i| i.phone.as_deref())),
            is_populated(issuer.and_then(|i| i.email.as_deref())),
            is_populated(issuer.and_then(|i| i.registration_number.as_deref())),
            amounts.subtotal > Decimal::ZERO,
            amounts.tax_amount > Decimal::ZERO,
            amounts.total_amount > Decimal::ZERO,
            !fields.line_items.is_empty(),
            !fields.payment_terms.is_empty(),
        ]
    }

    /// Populated share of the checklist, rounded to two decimals.
    pub fn score(&self, fields: &ScoredFields<'_>) -> f32 {
        let populated = self.checklist(fields).iter().filter(|&&ok| ok).count();
        let ratio = populated as f32 / CHECKLIST_SIZE as f32;
        ((ratio * 100.0).round() / 100.0).clamp(0.0, 1.0)
    }
}

/// A text field counts only when it holds a real value, not a placeholder.
pub fn is_populated(value: Option<&str>) -> bool {
    let Some(value) = value.map(str::trim) else {
        return false;
    };

    !value.is_empty()
        && value != UNEXTRACTED_COMPANY_NAME
        && value != "不明"
        && !value.eq_ignore_ascii_case("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    struct Parts {
        basic_info: InvoiceBasicInfo,
        billing_to: BillingTo,
        issuer: Option<IssuerInfo>,
        amounts: AmountInfo,
        line_items: Vec<LineItem>,
        payment_terms: PaymentTerms,
    }

    impl Parts {
        fn empty() -> Self {
            Self {
                basic_info: InvoiceBasicInfo::default(),
                billing_to: BillingTo::default(),
                issuer: None,
                amounts: AmountInfo::default(),
                line_items: Vec::new(),
                payment_terms: PaymentTerms::default(),
            }
        }

        fn score(&self) -> f32 {
            ConfidenceScorer::new().score(&ScoredFields {
                basic_info: &self.basic_info,
                billing_to: &self.billing_to,
                issuer: self.issuer.as_ref(),
                amounts: &self.amounts,
                line_items: &self.line_items,
                payment_terms: &self.payment_terms,
            })
        }
    }

    #[test]
    fn test_empty_record_scores_zero() {
        assert_eq!(Parts::empty().score(), 0.0);
    }

    #[test]
    fn test_sentinels_do_not_count() {
        let mut parts = Parts::empty();
        parts.billing_to.company_name = "unknown".to_string();
        parts.basic_info.subject = Some("不明".to_string());
        parts.issuer = Some(IssuerInfo {
            name: UNEXTRACTED_COMPANY_NAME.to_string(),
            address: None,
            phone: None,
            email: None,
            registration_number: None,
        });
        assert_eq!(parts.score(), 0.0);
    }

    #[test]
    fn test_partial_record_rounds_to_two_decimals() {
        let mut parts = Parts::empty();
        parts.basic_info.invoice_number = Some("INV-001".to_string());
        parts.basic_info.issue_date = NaiveDate::from_ymd_opt(2024, 11, 24);
        parts.amounts.total_amount = Decimal::from(110_000);

        // 3 / 17 = 0.1764...
        assert_eq!(parts.score(), 0.18);
    }

    #[test]
    fn test_full_record_scores_one() {
        let mut parts = Parts::empty();
        parts.basic_info = InvoiceBasicInfo {
            invoice_number: Some("INV-001".to_string()),
            issue_date: NaiveDate::from_ymd_opt(2024, 11, 24),
            transaction_date: NaiveDate::from_ymd_opt(2024, 11, 20),
            subject: Some("Web制作".to_string()),
            ..Default::default()
        };
        parts.billing_to = BillingTo {
            company_name: "株式会社サンプル".to_string(),
            department: Some("営業部".to_string()),
            contact_person: Some("山田 太郎".to_string()),
        };
        parts.issuer = Some(IssuerInfo {
            name: "株式会社発行商事".to_string(),
            address: Some("東京都渋谷区".to_string()),
            phone: Some("03-1234-5678".to_string()),
            email: Some("a@example.jp".to_string()),
            registration_number: Some("T1234567890123".to_string()),
        });
        parts.amounts.subtotal = Decimal::from(100_000);
        parts.amounts.tax_amount = Decimal::from(10_000);
        parts.amounts.total_amount = Decimal::from(110_000);
        parts.line_items.push(LineItem {
            description: "Web制作".to_string(),
            quantity: None,
            unit: None,
            unit_price: None,
            amount: Decimal::from(100_000),
            tax_rate: None,
            tax_amount: None,
            remarks: None,
        });
        parts.payment_terms.bank_name = Some("みずほ銀行".to_string());

        assert_eq!(parts.score(), 1.0);
    }

    #[test]
    fn test_is_populated() {
        assert!(is_populated(Some("株式会社X")));
        assert!(!is_populated(Some("  ")));
        assert!(!is_populated(Some("UNKNOWN")));
        assert!(!is_populated(None));
    }
}
