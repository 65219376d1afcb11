//! Reader for detection dumps produced by running EasyOCR outside this tool.
//!
//! Two shapes are accepted, matching EasyOCR's `readtext` output:
//! the default list of `[polygon, text, confidence]` triples, and the
//! `output_format="json"` objects `{"boxes": polygon, "text": .., "confident": ..}`.

use std::path::Path;

use meisai_core::{Point, TextBox};
use serde::Deserialize;

use crate::recognizer::{OcrBackend, OcrError};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDetection {
    Triple(Vec<[f64; 2]>, String, f64),
    Pair(Vec<[f64; 2]>, String),
    Object {
        boxes: Vec<[f64; 2]>,
        text: String,
        #[serde(default, alias = "confidence")]
        confident: Option<f64>,
    },
}

impl RawDetection {
    fn into_parts(self) -> (Vec<[f64; 2]>, String, Option<f64>) {
        match self {
            RawDetection::Triple(points, text, conf) => (points, text, Some(conf)),
            RawDetection::Pair(points, text) => (points, text, None),
            RawDetection::Object { boxes, text, confident } => (boxes, text, confident),
        }
    }
}

/// Parse a dump into boxes, keeping the dump's order.
pub fn parse_dump(json: &str) -> Result<Vec<TextBox>, OcrError> {
    let raw: Vec<RawDetection> =
        serde_json::from_str(json).map_err(|e| OcrError::Dump(e.to_string()))?;

    let mut confidences = Vec::new();
    let mut boxes = Vec::with_capacity(raw.len());
    for (idx, detection) in raw.into_iter().enumerate() {
        let (points, text, conf) = detection.into_parts();
        let points = points.into_iter().map(|[x, y]| Point::new(x, y)).collect();
        let tb = TextBox::new(text, points)
            .map_err(|e| OcrError::Dump(format!("entry {idx}: {e}")))?;
        confidences.extend(conf);
        boxes.push(tb);
    }

    if !confidences.is_empty() {
        let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
        tracing::debug!(boxes = boxes.len(), mean_confidence = mean, "Parsed detection dump");
    }
    Ok(boxes)
}

/// Treats the given path as a JSON detection dump instead of an image.
pub struct JsonDumpRecognizer;

impl OcrBackend for JsonDumpRecognizer {
    fn recognize(&self, path: &Path) -> Result<Vec<TextBox>, OcrError> {
        let json = std::fs::read_to_string(path).map_err(|source| OcrError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_dump(&json)
    }
}
