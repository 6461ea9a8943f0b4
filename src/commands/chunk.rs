use anyhow::Result;
use tracing::info;

use crate::cli::ChunkArgs;
use crate::config::load_pipeline_config;
use crate::structure::{DocumentType, PatternRules, chunk_text, normalize_text};
use crate::util::{read_text_file, write_json_stdout};

pub fn run(args: ChunkArgs) -> Result<()> {
    let mut config = load_pipeline_config(args.config.as_deref())?;
    if let Some(target_chars) = args.target_chars {
        config.chunker.target_chars = target_chars;
    }

    let rules = PatternRules::new()?;
    let raw_text = read_text_file(&args.input)?;
    let normalized = normalize_text(&rules, &raw_text);
    let doc_type = DocumentType::from(args.doc_type);

    let chunks = chunk_text(&rules, &normalized.text, doc_type, &config.chunker);
    info!(
        input = %args.input.display(),
        ?doc_type,
        target_chars = config.chunker.target_chars,
        chunks = chunks.len(),
        "chunked input text"
    );

    write_json_stdout(&chunks)
}
