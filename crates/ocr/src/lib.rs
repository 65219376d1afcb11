pub mod convert;
pub mod dump;
pub mod pipeline;
pub mod reader;
pub mod recognizer;

pub use convert::{ConvertError, ConverterConfig, PageConverter};
pub use dump::{parse_dump, JsonDumpRecognizer};
pub use pipeline::{PipelineError, StatementPipeline};
pub use reader::OcrReader;
pub use recognizer::{DefaultRecognizer, MockRecognizer, OcrBackend, OcrError, OcrSettings};
