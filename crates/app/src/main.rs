use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use meisai_export::{export, ExportSink, WriterSink};
use meisai_ocr::{DefaultRecognizer, OcrReader, PageConverter, StatementPipeline};
use tracing_subscriber::EnvFilter;

mod config;

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "meisai")]
#[command(about = "Extract (date, title, amount) rows from photographed card statements")]
#[command(version)]
struct Cli {
    /// Statement images, or EasyOCR `.json` detection dumps, processed in order
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// TOML config with `[converter]` and `[ocr]` tables
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the TSV table to stdout instead of the clipboard
    #[arg(long)]
    stdout: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let converter = PageConverter::new(config.converter).context("Invalid [converter] config")?;
    // Built once, reused for every image.
    let recognizer = DefaultRecognizer::new(&config.ocr).context("Failed to start OCR engine")?;
    let pipeline = StatementPipeline::new(OcrReader::new(recognizer), converter);

    tracing::info!("Applying OCR to {} image(s)", cli.images.len());
    let transactions = pipeline.process_all(&cli.images)?;

    match clipboard_sink(cli.stdout)? {
        Some(mut sink) => {
            for tx in &transactions {
                println!("{tx}");
            }
            export(&transactions, sink.as_mut())?;
            println!("{}", done_message(transactions.len(), true));
        }
        None => {
            export(&transactions, &mut WriterSink::new(std::io::stdout().lock()))?;
            // stdout carries only the table
            eprintln!("{}", done_message(transactions.len(), false));
        }
    }
    Ok(())
}

fn done_message(rows: usize, clipboard: bool) -> String {
    if clipboard {
        format!("Data copied to clipboard ({rows} rows)")
    } else {
        format!("Wrote {rows} rows to stdout")
    }
}

#[cfg(feature = "clipboard")]
fn clipboard_sink(to_stdout: bool) -> anyhow::Result<Option<Box<dyn ExportSink>>> {
    if to_stdout {
        return Ok(None);
    }
    let sink = meisai_export::ClipboardSink::new()
        .context("System clipboard unavailable; rerun with --stdout")?;
    Ok(Some(Box::new(sink)))
}

#[cfg(not(feature = "clipboard"))]
fn clipboard_sink(_to_stdout: bool) -> anyhow::Result<Option<Box<dyn ExportSink>>> {
    Ok(None)
}
