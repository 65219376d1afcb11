use std::path::{Path, PathBuf};

use meisai_core::TextBox;
use serde::Deserialize;
use thiserror::Error;

use crate::dump::JsonDumpRecognizer;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Malformed detection dump: {0}")]
    Dump(String),
    #[error("No OCR engine available for {0}; build with the `tesseract` feature or pass a .json detection dump")]
    NotAvailable(PathBuf),
}

/// Abstraction over a text detector.
/// Implementations take an image path and return every text region they found,
/// in the engine's own output order.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, path: &Path) -> Result<Vec<TextBox>, OcrError>;
}

/// Engine settings read from the `[ocr]` config table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrSettings {
    /// Tesseract language string, e.g. `jpn+eng`.
    pub lang: String,
    /// Directory holding `*.traineddata`; `None` uses the system default.
    pub data_path: Option<String>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self { lang: "jpn+eng".to_string(), data_path: None }
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a preset list of boxes for any path.
pub struct MockRecognizer {
    pub boxes: Vec<TextBox>,
}

impl MockRecognizer {
    pub fn new(boxes: Vec<TextBox>) -> Self {
        Self { boxes }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _path: &Path) -> Result<Vec<TextBox>, OcrError> {
        Ok(self.boxes.clone())
    }
}

// ── Default dispatch ──────────────────────────────────────────────────────────

/// Routes `.json` detection dumps to [`JsonDumpRecognizer`] and everything else to
/// Tesseract when it is compiled in.
pub struct DefaultRecognizer {
    dump: JsonDumpRecognizer,
    #[cfg(feature = "tesseract")]
    tesseract: tesseract_backend::TesseractRecognizer,
}

impl DefaultRecognizer {
    /// Builds the engine once; it is reused for every image afterwards.
    pub fn new(settings: &OcrSettings) -> Result<Self, OcrError> {
        #[cfg(not(feature = "tesseract"))]
        tracing::debug!(lang = %settings.lang, "Built without tesseract; only .json dumps are readable");

        Ok(Self {
            dump: JsonDumpRecognizer,
            #[cfg(feature = "tesseract")]
            tesseract: tesseract_backend::TesseractRecognizer::new(
                settings.data_path.as_deref(),
                &settings.lang,
            )?,
        })
    }

    #[cfg(feature = "tesseract")]
    fn recognize_image(&self, path: &Path) -> Result<Vec<TextBox>, OcrError> {
        self.tesseract.recognize(path)
    }

    #[cfg(not(feature = "tesseract"))]
    fn recognize_image(&self, path: &Path) -> Result<Vec<TextBox>, OcrError> {
        Err(OcrError::NotAvailable(path.to_path_buf()))
    }
}

fn is_json_dump(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

impl OcrBackend for DefaultRecognizer {
    fn recognize(&self, path: &Path) -> Result<Vec<TextBox>, OcrError> {
        if is_json_dump(path) {
            return self.dump.recognize(path);
        }
        self.recognize_image(path)
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::Mutex;

    use leptess::{capi, LepTess};
    use meisai_core::TextBox;

    use super::{OcrBackend, OcrError};

    /// One text box per recognized line.
    pub struct TesseractRecognizer {
        engine: Mutex<LepTess>,
    }

    impl TesseractRecognizer {
        pub fn new(data_path: Option<&str>, lang: &str) -> Result<Self, OcrError> {
            let engine = LepTess::new(data_path, lang).map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(Self { engine: Mutex::new(engine) })
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, path: &Path) -> Result<Vec<TextBox>, OcrError> {
            let img = image::open(path).map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            let mut png = Vec::new();
            img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;

            let mut lt = self
                .engine
                .lock()
                .map_err(|_| OcrError::Engine("tesseract engine lock poisoned".to_string()))?;
            lt.set_image_from_mem(&png)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;

            let Some(lines) = lt.get_component_boxes(capi::TessPageIteratorLevel_RIL_TEXTLINE, true)
            else {
                return Ok(Vec::new());
            };

            let mut boxes = Vec::new();
            for line in &lines {
                let g = line.get_geometry();
                lt.set_rectangle(g.x, g.y, g.w, g.h);
                let text = lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))?;
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                boxes.push(TextBox::from_rect(
                    text,
                    f64::from(g.x),
                    f64::from(g.y),
                    f64::from(g.w),
                    f64::from(g.h),
                ));
            }
            Ok(boxes)
        }
    }
}
