//! Captured image payloads.
//!
//! Images travel as `data:<mime>;base64,<payload>` URLs (what a canvas or file
//! reader produces) or as bare base64 text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::AnalysisError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// MIME type from the data URL header; `None` for bare base64.
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Extract the MIME type and raw bytes of an image payload.
pub fn decode_image_data(payload: &str) -> Result<DecodedImage, AnalysisError> {
    let payload = payload.trim();
    let (mime_type, encoded) = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| AnalysisError::InvalidImage("data URL has no payload".into()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| AnalysisError::InvalidImage("data URL is not base64-encoded".into()))?;
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            (mime, data)
        }
        None => (None, payload),
    };

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| AnalysisError::InvalidImage(e.to_string()))?;
    if bytes.is_empty() {
        return Err(AnalysisError::EmptyImage);
    }
    Ok(DecodedImage { mime_type, bytes })
}
