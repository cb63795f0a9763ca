//! Recognizer for text that was already produced by an OCR run.

use tracing::debug;

use crate::error::{RecognitionError, Result};

use super::{RecognizedText, TextRecognizer};

const UTF8_BOM: &str = "\u{feff}";

/// Reads pre-recognized UTF-8 text (e.g. an `invoice.pdf.txt` sidecar).
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarTextRecognizer;

impl SidecarTextRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl TextRecognizer for SidecarTextRecognizer {
    fn recognize(&self, bytes: &[u8]) -> Result<RecognizedText> {
        let text = String::from_utf8(bytes.to_vec()).map_err(RecognitionError::from)?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(&text);

        if text.trim().is_empty() {
            return Err(RecognitionError::Empty.into());
        }

        debug!("Read {} characters of recognized text", text.chars().count());

        Ok(RecognizedText {
            text: text.to_string(),
            confidence: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeikyuError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_recognize_plain_text() {
        let result = SidecarTextRecognizer::new().recognize("請求書\n".as_bytes()).unwrap();
        assert_eq!(result.text, "請求書\n");
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_strips_bom() {
        let bytes = "\u{feff}請求書".as_bytes();
        let result = SidecarTextRecognizer::new().recognize(bytes).unwrap();
        assert_eq!(result.text, "請求書");
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let err = SidecarTextRecognizer::new().recognize(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            SeikyuError::Recognition(RecognitionError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_rejects_blank_text() {
        let err = SidecarTextRecognizer::new().recognize(b"  \n\t").unwrap_err();
        assert!(matches!(err, SeikyuError::Recognition(RecognitionError::Empty)));
    }
}
