use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::structure::{DocumentType, QaSource};

#[derive(Parser, Debug)]
#[command(
    name = "statute-chunker",
    version,
    about = "Statute structure recovery, chunking and cross-validation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Process(ProcessArgs),
    Chunk(ChunkArgs),
    Qa(QaArgs),
    Status(StatusArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DocTypeArg {
    Statute,
    Generic,
}

impl From<DocTypeArg> for DocumentType {
    fn from(value: DocTypeArg) -> Self {
        match value {
            DocTypeArg::Statute => DocumentType::Statute,
            DocTypeArg::Generic => DocumentType::Generic,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum QaSourceArg {
    Vlm,
    StructuralParse,
}

impl From<QaSourceArg> for QaSource {
    fn from(value: QaSourceArg) -> Self {
        match value {
            QaSourceArg::Vlm => QaSource::Vlm,
            QaSourceArg::StructuralParse => QaSource::StructuralParse,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    #[arg(long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Overrides the title detected from the preamble.
    #[arg(long)]
    pub title: Option<String>,

    /// Independently extracted text to cross-check against. Single input only.
    #[arg(long)]
    pub reference: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = QaSourceArg::StructuralParse)]
    pub qa_source: QaSourceArg,

    #[arg(long, value_enum, default_value_t = DocTypeArg::Statute)]
    pub doc_type: DocTypeArg,

    #[arg(long, default_value = ".cache/statute-chunker")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub target_chars: Option<usize>,

    /// Emit annex sub-chunks even when decomposition exceeds the loss bound.
    #[arg(long, default_value_t = false)]
    pub keep_lossy_annex: bool,

    /// Documents processed concurrently.
    #[arg(long, default_value_t = 4)]
    pub max_concurrency: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t = DocTypeArg::Generic)]
    pub doc_type: DocTypeArg,

    #[arg(long)]
    pub target_chars: Option<usize>,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct QaArgs {
    #[arg(long)]
    pub reference: PathBuf,

    #[arg(long)]
    pub processed: PathBuf,

    #[arg(long, value_enum, default_value_t = QaSourceArg::Vlm)]
    pub source: QaSourceArg,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/statute-chunker/statute_chunks.sqlite")]
    pub db_path: PathBuf,
}
