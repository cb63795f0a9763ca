//! Core library for Japanese invoice OCR extraction.
//!
//! This crate provides:
//! - OCR text normalization (misread thousands separators, full-width forms)
//! - Date parsing including Japanese era dates (令和, 平成, 昭和, 大正)
//! - Cascaded field extraction with per-field confidence
//! - Line-item table reconstruction from layout-free text
//! - Amount reconciliation and a completeness score
//!
//! The OCR engine is not part of this crate; text enters through the
//! [`TextRecognizer`] seam or directly as a [`DocumentInput`].

pub mod error;
pub mod invoice;
pub mod models;
pub mod ocr;

pub use error::{RecognitionError, Result, SeikyuError};
pub use invoice::{
    ConfidenceScorer, DocumentInput, InvoiceDataAssembler, InvoiceExtractor,
    LineItemTableExtractor,
};
pub use models::config::{BatchConfig, ExtractionConfig, SeikyuConfig};
pub use models::invoice::{
    AmountInfo, BillingTo, ExtractedField, InvoiceBasicInfo, InvoiceExtractionResult,
    InvoiceMetadata, InvoiceStatus, IssuerInfo, LineItem, PaymentTerms, ReconciliationKeys,
    UNEXTRACTED_COMPANY_NAME,
};
pub use ocr::{RecognizedText, SidecarTextRecognizer, TextRecognizer};
