//! Structured invoice record produced from Japanese invoice OCR text.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Company name stored when the billing-to company could not be extracted.
///
/// Counted as "not populated" by the confidence scorer.
pub const UNEXTRACTED_COMPANY_NAME: &str = "(extraction failed)";

/// A single extracted value with its extraction confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl<T> ExtractedField<T> {
    /// Create a new field, clamping confidence into `[0, 1]`.
    pub fn new(value: T, confidence: f32) -> Self {
        Self {
            value,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Transform the value, keeping the confidence.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractedField<U> {
        ExtractedField {
            value: f(self.value),
            confidence: self.confidence,
        }
    }
}

/// The complete extraction result for one uploaded document.
///
/// Created once per document and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceExtractionResult {
    /// Generated identifier (stable for identical file name and hash).
    pub id: Uuid,

    /// Invoice header information.
    pub basic_info: InvoiceBasicInfo,

    /// Issuer information, present when any issuer field was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<IssuerInfo>,

    /// Billing-to (client) information.
    pub billing_to: BillingTo,

    /// Reconciled amounts.
    pub amounts: AmountInfo,

    /// Billed line items.
    pub line_items: Vec<LineItem>,

    /// Payment terms and bank details.
    pub payment_terms: PaymentTerms,

    /// Keys used to match the invoice against orders and payments.
    pub reconciliation_keys: ReconciliationKeys,

    /// Extraction metadata.
    pub metadata: InvoiceMetadata,
}

/// Invoice header with basic information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceBasicInfo {
    /// Invoice number (請求書番号).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    /// Issue date (発行日).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,

    /// Transaction/delivery date (取引日).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<NaiveDate>,

    /// Currency code (default: JPY).
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Subject line (件名).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Purchase order number (注文番号).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
}

fn default_currency() -> String {
    "JPY".to_string()
}

impl Default for InvoiceBasicInfo {
    fn default() -> Self {
        Self {
            invoice_number: None,
            issue_date: None,
            transaction_date: None,
            currency: default_currency(),
            subject: None,
            order_number: None,
        }
    }
}

/// The party that issued the invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuerInfo {
    /// Company name.
    pub name: String,

    /// Postal address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Phone number, hyphenated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Qualified-invoice registration number (`T` + 13 digits).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
}

/// The party being billed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingTo {
    /// Company name, or [`UNEXTRACTED_COMPANY_NAME`].
    pub company_name: String,

    /// Department (部署).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    /// Contact person (ご担当者).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,
}

impl Default for BillingTo {
    fn default() -> Self {
        Self {
            company_name: UNEXTRACTED_COMPANY_NAME.to_string(),
            department: None,
            contact_person: None,
        }
    }
}

/// Invoice totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountInfo {
    /// Amount before tax (小計).
    pub subtotal: Decimal,

    /// Consumption tax (消費税).
    pub tax_amount: Decimal,

    /// Amount including tax (ご請求金額).
    pub total_amount: Decimal,

    /// Tax broken down by rate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tax_breakdown: Vec<TaxBreakdown>,

    /// Whether the invoice declares itself tax exempt.
    pub tax_exempt: bool,
}

/// Tax for one rate (e.g. the 10% and 8% portions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Tax rate in percent.
    pub rate: Decimal,

    /// Tax amount at this rate.
    pub amount: Decimal,

    /// Amount subject to this rate.
    pub taxable_amount: Decimal,
}

/// A single billed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item description (2 - 100 characters).
    pub description: String,

    /// Quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,

    /// Unit of measure (個, 式, 時間, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Unit price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,

    /// Row amount.
    pub amount: Decimal,

    /// Tax rate in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Decimal>,

    /// Tax for this row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Decimal>,

    /// Free-form remarks (※ notes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Who pays the bank transfer fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeBearer {
    /// The billed party (貴社負担).
    Payer,
    /// The issuer (当社負担).
    Payee,
}

/// Payment terms and transfer destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentTerms {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// e.g. 月末締め翌月末払い.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_condition: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,

    /// 普通, 当座 or 貯蓄.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_holder: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_bearer: Option<FeeBearer>,
}

impl PaymentTerms {
    /// Check if any payment field has data.
    pub fn is_empty(&self) -> bool {
        self.due_date.is_none()
            && self.payment_condition.is_none()
            && self.bank_name.is_none()
            && self.branch_name.is_none()
            && self.account_type.is_none()
            && self.account_number.is_none()
            && self.account_holder.is_none()
            && self.fee_bearer.is_none()
    }
}

/// Keys used to match the invoice against purchase orders and payments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationKeys {
    /// Issuer name without entity markers, whitespace or width variants.
    pub normalized_issuer_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,

    pub total_amount: Decimal,
}

/// How the document entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    /// Rasterized from a PDF.
    PdfImport,
    /// Uploaded as an image.
    ImageImport,
}

impl DocumentSource {
    /// Classify by the original file's extension.
    pub fn from_file_name(file_name: &str) -> Self {
        let is_pdf = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            Self::PdfImport
        } else {
            Self::ImageImport
        }
    }
}

/// Review status of an extraction result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Extracted, awaiting confirmation.
    #[default]
    Draft,
    /// Completeness score is below the review threshold.
    NeedsReview,
}

/// Metadata about the extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceMetadata {
    pub source: DocumentSource,

    pub file_name: String,

    pub file_hash: String,

    /// Completeness score (0.0 - 1.0), see [`crate::invoice::ConfidenceScorer`].
    pub ocr_confidence: f32,

    pub status: InvoiceStatus,

    pub version: u32,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub read_only: bool,

    /// Field-level confidence scores.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_confidence: BTreeMap<String, f32>,

    /// Key fields that could not be extracted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
