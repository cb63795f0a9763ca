//! Orchestrates the extractors into one [`InvoiceExtractionResult`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::models::config::ExtractionConfig;
use crate::models::invoice::{
    AmountInfo, BillingTo, DocumentSource, InvoiceBasicInfo, InvoiceExtractionResult,
    InvoiceMetadata, InvoiceStatus, IssuerInfo, LineItem, PaymentTerms, ReconciliationKeys,
    TaxBreakdown, UNEXTRACTED_COMPANY_NAME,
};
use crate::ocr::TextRecognizer;

use super::confidence::{ConfidenceScorer, ScoredFields};
use super::line_items::LineItemTableExtractor;
use super::rules::{
    normalize, normalize_company_name, reconcile, AmountExtractor, BankExtractor,
    BasicInfoExtractor, DateCascades, EmailExtractor, ExtractionMatch, FieldExtractor,
    PartyExtractor, PhoneExtractor, RegistrationNumberExtractor,
};
use super::InvoiceExtractor;

/// Schema version stamped on every result.
pub const RESULT_VERSION: u32 = 1;

/// Totals read by a labeled rule are trusted over subtotal + tax.
const LABELED_TOTAL_CONFIDENCE: f32 = 0.85;

/// One recognized document handed to the assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInput {
    /// Recognized text, as produced by OCR.
    pub raw_text: String,
    /// Name of the original uploaded file.
    pub file_name: String,
    /// Content hash of the original uploaded file.
    pub file_hash: String,
    /// Timestamp stamped on the result.
    pub received_at: DateTime<Utc>,
}

impl DocumentInput {
    pub fn new(
        raw_text: impl Into<String>,
        file_name: impl Into<String>,
        file_hash: impl Into<String>,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            file_name: file_name.into(),
            file_hash: file_hash.into(),
            received_at: Utc::now(),
        }
    }

    /// Use a fixed timestamp instead of the current time.
    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }
}

/// Stateless extraction pipeline.
///
/// normalize → scalar extractors → line items → amount reconciliation →
/// record assembly → completeness score → metadata. Holds only immutable
/// configuration and compiled rules, so one instance can serve any number
/// of documents concurrently.
#[derive(Debug)]
pub struct InvoiceDataAssembler {
    config: ExtractionConfig,
    basic: BasicInfoExtractor,
    dates: DateCascades,
    parties: PartyExtractor,
    registration: RegistrationNumberExtractor,
    phone: PhoneExtractor,
    email: EmailExtractor,
    bank: BankExtractor,
    amounts: AmountExtractor,
    line_items: LineItemTableExtractor,
    scorer: ConfidenceScorer,
}

impl InvoiceDataAssembler {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            basic: BasicInfoExtractor::new(),
            dates: DateCascades::new(),
            parties: PartyExtractor::new(config.anchor_lookahead),
            registration: RegistrationNumberExtractor::new(),
            phone: PhoneExtractor::new(),
            email: EmailExtractor::new(),
            bank: BankExtractor::new(),
            amounts: AmountExtractor::new(),
            line_items: LineItemTableExtractor::new(config.max_line_items),
            scorer: ConfidenceScorer::new(),
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Recognize `bytes` with `recognizer`, then assemble the result.
    pub fn assemble_document<R: TextRecognizer + ?Sized>(
        &self,
        recognizer: &R,
        bytes: &[u8],
        file_name: &str,
        file_hash: &str,
    ) -> Result<InvoiceExtractionResult> {
        let recognized = recognizer.recognize(bytes)?;
        debug!(
            confidence = recognized.confidence,
            "text recognized"
        );
        Ok(self.assemble(&DocumentInput::new(recognized.text, file_name, file_hash)))
    }

    /// Assemble the structured record for one document.
    pub fn assemble(&self, input: &DocumentInput) -> InvoiceExtractionResult {
        info!(
            file = %input.file_name,
            chars = input.raw_text.chars().count(),
            "extracting invoice"
        );

        let text = normalize(&input.raw_text);
        let mut fields = FieldConfidence::default();

        // Scalar fields.
        let basic = self.basic.extract(&text);
        let dates = self.dates.extract(&text);
        let parties = self.parties.extract(&text);
        let bank = self.bank.extract(&text);
        let amounts = self.amounts.extract(&text);

        let phone = self
            .phone
            .extract(&parties.issuer_region)
            .or_else(|| self.phone.extract(&text));
        let email = self
            .email
            .extract(&parties.issuer_region)
            .or_else(|| self.email.extract(&text));
        let registration = self.registration.extract(&text);

        let basic_info = InvoiceBasicInfo {
            invoice_number: fields.take("basic_info.invoice_number", basic.invoice_number),
            issue_date: fields.take("basic_info.issue_date", dates.issue_date),
            transaction_date: fields.take("basic_info.transaction_date", dates.transaction_date),
            currency: fields
                .take("basic_info.currency", basic.currency)
                .unwrap_or_else(|| self.config.default_currency.clone()),
            subject: fields.take("basic_info.subject", basic.subject),
            order_number: fields.take("basic_info.order_number", basic.order_number),
        };

        let billing_to = BillingTo {
            company_name: fields
                .take("billing_to.company_name", parties.client_name)
                .unwrap_or_else(|| UNEXTRACTED_COMPANY_NAME.to_string()),
            department: fields.take("billing_to.department", parties.department),
            contact_person: fields.take("billing_to.contact_person", parties.contact_person),
        };

        let issuer_name = fields.take("issuer.name", parties.issuer_name);
        let issuer_address = fields.take("issuer.address", parties.issuer_address);
        let issuer_phone = fields.take("issuer.phone", phone);
        let issuer_email = fields.take("issuer.email", email);
        let registration_number = fields.take("issuer.registration_number", registration);

        let any_issuer_field = issuer_name.is_some()
            || issuer_address.is_some()
            || issuer_phone.is_some()
            || issuer_email.is_some()
            || registration_number.is_some();
        let issuer = any_issuer_field.then(|| IssuerInfo {
            name: issuer_name
                .clone()
                .unwrap_or_else(|| UNEXTRACTED_COMPANY_NAME.to_string()),
            address: issuer_address,
            phone: issuer_phone,
            email: issuer_email,
            registration_number,
        });

        // Amounts and line items.
        let subtotal = fields.take("amounts.subtotal", amounts.subtotal);
        let tax = fields.take("amounts.tax_amount", amounts.tax);
        let extracted_total = amounts.total;

        let fallback_amount = subtotal.or_else(|| extracted_total.as_ref().map(|m| m.value));
        let line_items = self.line_items.extract(&text, fallback_amount);

        let total = self.resolve_total(&mut fields, extracted_total, subtotal, tax, &line_items);
        let reconciled = reconcile(
            total,
            subtotal,
            tax,
            amounts.tax_rate,
            self.config.default_tax_rate,
        );
        debug!(
            tier = ?reconciled.tier,
            subtotal = %reconciled.subtotal,
            tax = %reconciled.tax,
            total = %reconciled.total,
            rate = %reconciled.rate,
            "amounts reconciled"
        );

        let mut tax_breakdown = amounts.breakdown;
        if tax_breakdown.is_empty() && reconciled.subtotal > Decimal::ZERO && !reconciled.rate.is_zero() {
            tax_breakdown.push(TaxBreakdown {
                rate: reconciled.rate,
                amount: reconciled.tax,
                taxable_amount: reconciled.subtotal,
            });
        }

        let amount_info = AmountInfo {
            subtotal: reconciled.subtotal,
            tax_amount: reconciled.tax,
            total_amount: reconciled.total,
            tax_breakdown,
            tax_exempt: amounts.tax_exempt,
        };

        let payment_terms = PaymentTerms {
            due_date: fields.take("payment_terms.due_date", dates.due_date),
            payment_condition: fields.take("payment_terms.payment_condition", basic.payment_condition),
            bank_name: fields.take("payment_terms.bank_name", bank.bank_name),
            branch_name: fields.take("payment_terms.branch_name", bank.branch_name),
            account_type: fields.take("payment_terms.account_type", bank.account_type),
            account_number: fields.take("payment_terms.account_number", bank.account_number),
            account_holder: fields.take("payment_terms.account_holder", bank.account_holder),
            fee_bearer: fields.take("payment_terms.fee_bearer", basic.fee_bearer),
        };

        let billing_period = fields.take("reconciliation_keys.billing_period", basic.billing_period);
        let project_name = fields
            .take("reconciliation_keys.project_name", basic.project_name)
            .or_else(|| basic_info.subject.clone());

        let reconciliation_keys = ReconciliationKeys {
            normalized_issuer_name: issuer_name
                .as_deref()
                .map(normalize_company_name)
                .unwrap_or_default(),
            order_number: basic_info.order_number.clone(),
            billing_period,
            project_name,
            contact_person: billing_to.contact_person.clone(),
            total_amount: amount_info.total_amount,
        };

        // Score and metadata.
        let score = self.scorer.score(&ScoredFields {
            basic_info: &basic_info,
            billing_to: &billing_to,
            issuer: issuer.as_ref(),
            amounts: &amount_info,
            line_items: &line_items,
            payment_terms: &payment_terms,
        });

        let status = if score < self.config.review_threshold {
            InvoiceStatus::NeedsReview
        } else {
            InvoiceStatus::Draft
        };

        let warnings = missing_field_warnings(&basic_info, &billing_to, issuer.as_ref(), &amount_info, &line_items);

        info!(
            file = %input.file_name,
            score,
            ?status,
            line_items = line_items.len(),
            "invoice assembled"
        );

        InvoiceExtractionResult {
            id: result_id(&input.file_hash, &input.file_name),
            basic_info,
            issuer,
            billing_to,
            amounts: amount_info,
            line_items,
            payment_terms,
            reconciliation_keys,
            metadata: InvoiceMetadata {
                source: DocumentSource::from_file_name(&input.file_name),
                file_name: input.file_name.clone(),
                file_hash: input.file_hash.clone(),
                ocr_confidence: score,
                status,
                version: RESULT_VERSION,
                created_at: input.received_at,
                updated_at: input.received_at,
                read_only: false,
                field_confidence: fields.into_inner(),
                warnings,
            },
        }
    }

    /// Pick the document total.
    ///
    /// A labeled total wins; otherwise subtotal + tax, then a heuristic
    /// total, then the line-item sum, then the subtotal alone.
    fn resolve_total(
        &self,
        fields: &mut FieldConfidence,
        extracted: Option<ExtractionMatch<Decimal>>,
        subtotal: Option<Decimal>,
        tax: Option<Decimal>,
        line_items: &[LineItem],
    ) -> Decimal {
        let labeled = extracted
            .as_ref()
            .is_some_and(|m| m.confidence >= LABELED_TOTAL_CONFIDENCE);

        if !labeled {
            if let (Some(subtotal), Some(tax)) = (subtotal, tax) {
                debug!("total derived from subtotal and tax");
                return subtotal + tax;
            }
        }

        if let Some(total) = fields.take("amounts.total_amount", extracted) {
            return total;
        }

        if !line_items.is_empty() {
            debug!("total derived from line items");
            return line_items.iter().map(|item| item.amount).sum();
        }

        subtotal.unwrap_or(Decimal::ZERO)
    }
}

impl Default for InvoiceDataAssembler {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl InvoiceExtractor for InvoiceDataAssembler {
    fn extract(&self, input: &DocumentInput) -> InvoiceExtractionResult {
        self.assemble(input)
    }
}

/// Per-field confidence collected while assembling.
#[derive(Debug, Default)]
struct FieldConfidence(BTreeMap<String, f32>);

impl FieldConfidence {
    /// Record the confidence of a found field and return its value.
    fn take<T>(&mut self, field: &str, found: Option<ExtractionMatch<T>>) -> Option<T> {
        let field_value = found?.into_field();
        self.0.insert(field.to_string(), field_value.confidence);
        Some(field_value.value)
    }

    fn into_inner(self) -> BTreeMap<String, f32> {
        self.0
    }
}

/// Deterministic identifier for a document.
pub fn result_id(file_hash: &str, file_name: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{file_hash}:{file_name}").as_bytes(),
    )
}

fn missing_field_warnings(
    basic_info: &InvoiceBasicInfo,
    billing_to: &BillingTo,
    issuer: Option<&IssuerInfo>,
    amounts: &AmountInfo,
    line_items: &[LineItem],
) -> Vec<String> {
    let mut warnings = Vec::new();

    if basic_info.invoice_number.is_none() {
        warnings.push("Could not extract invoice number".to_string());
    }
    if basic_info.issue_date.is_none() {
        warnings.push("Could not extract issue date".to_string());
    }
    if billing_to.company_name == UNEXTRACTED_COMPANY_NAME {
        warnings.push("Could not extract billing company name".to_string());
    }
    if issuer.is_none_or(|i| i.name == UNEXTRACTED_COMPANY_NAME) {
        warnings.push("Could not extract issuer name".to_string());
    }
    if amounts.total_amount.is_zero() {
        warnings.push("Could not extract total amount".to_string());
    }
    if line_items.is_empty() {
        warnings.push("Could not extract line items".to_string());
    }

    warnings
}
