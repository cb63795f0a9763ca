//! Boundary with the upstream text recognizer.
//!
//! The OCR engine itself lives outside this crate. Extraction only ever
//! consumes the text it produces, through the [`TextRecognizer`] seam.

mod sidecar;

pub use sidecar::SidecarTextRecognizer;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Text recognized from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    /// Full recognized text, lines separated by newlines.
    pub text: String,

    /// Engine-reported recognition confidence (0.0 - 1.0).
    pub confidence: f32,
}

/// Anything that turns document bytes into recognized text.
pub trait TextRecognizer {
    /// Recognize the text in a rasterized page or a text sidecar.
    fn recognize(&self, bytes: &[u8]) -> Result<RecognizedText>;
}
