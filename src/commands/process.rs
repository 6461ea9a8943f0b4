use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::ValueEnum;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ProcessArgs;
use crate::commands::store::{StoredDocument, doc_id_for, open_store, upsert_document};
use crate::config::{AnnexFallback, PipelineConfig, load_pipeline_config};
use crate::model::{DocumentRunEntry, ProcessRunManifest};
use crate::structure::{
    DocumentType, HierarchyReport, NormalizationStats, PatternRules, ProcessedDocument, QaReport,
    QaSource, QualityReport, ReferenceText, process_document, render_markdown,
};
use crate::util::{
    ensure_directory, now_utc_string, read_text_file, sha256_text, utc_compact_string,
    write_json_pretty, write_text_file,
};

const MANIFEST_VERSION: u32 = 1;

struct ProcessedInput {
    input_path: PathBuf,
    doc_id: String,
    sha256: String,
    processed: ProcessedDocument,
}

#[derive(Debug, Serialize)]
struct DocumentReport<'a> {
    doc_id: &'a str,
    input_path: String,
    generated_at: String,
    normalization: &'a NormalizationStats,
    hierarchy: &'a HierarchyReport,
    quality: &'a QualityReport,
    qa: Option<&'a QaReport>,
}

struct ProcessJob<'a> {
    rules: &'a PatternRules,
    config: &'a PipelineConfig,
    title: Option<&'a str>,
    doc_type: DocumentType,
    reference: Option<ReferenceText<'a>>,
    output_dir: &'a Path,
}

pub fn run(args: ProcessArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    if args.reference.is_some() && args.inputs.len() > 1 {
        bail!(
            "--reference applies to a single input, got {} inputs",
            args.inputs.len()
        );
    }

    check_unique_stems(&args.inputs)?;

    let mut config = load_pipeline_config(args.config.as_deref())?;
    if let Some(target_chars) = args.target_chars {
        config.chunker.target_chars = target_chars;
    }
    if args.keep_lossy_annex {
        config.annex.fallback = AnnexFallback::KeepSubChunks;
    }

    ensure_directory(&args.output_dir)?;
    let rules = PatternRules::new()?;
    let reference_text = args
        .reference
        .as_deref()
        .map(read_text_file)
        .transpose()?;

    info!(
        run_id = %run_id,
        inputs = args.inputs.len(),
        output_dir = %args.output_dir.display(),
        "process run started"
    );

    let job = ProcessJob {
        rules: &rules,
        config: &config,
        title: args.title.as_deref(),
        doc_type: DocumentType::from(args.doc_type),
        reference: reference_text.as_deref().map(|text| ReferenceText {
            text,
            source: QaSource::from(args.qa_source),
        }),
        output_dir: &args.output_dir,
    };

    let max_workers = args.max_concurrency.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .build()
        .context("failed to build document worker pool")?;
    let processed_inputs = pool.install(|| -> Result<Vec<ProcessedInput>> {
        args.inputs
            .par_iter()
            .map(|input| process_input(&job, input))
            .collect()
    })?;

    let mut notes = Vec::new();
    if let Some(db_path) = args.db_path.as_deref() {
        let mut connection = open_store(db_path)?;
        for input in &processed_inputs {
            let input_path = input.input_path.display().to_string();
            let document = &input.processed.document;
            let stored = StoredDocument {
                doc_id: &input.doc_id,
                source_path: &input_path,
                sha256: &input.sha256,
                title: &document.title,
                structured: document.structured,
                article_count: document.articles.len(),
                quality_pass: input.processed.quality.is_pass,
                chunks: &input.processed.chunks,
            };
            let written = upsert_document(&mut connection, &stored)?;
            info!(doc_id = %input.doc_id, chunks = written, "stored document chunks");
        }
        notes.push(format!("stored {} documents", processed_inputs.len()));
    }

    let documents = processed_inputs
        .iter()
        .map(run_entry)
        .collect::<Vec<DocumentRunEntry>>();
    let failing = documents
        .iter()
        .filter(|entry| !entry.quality_pass || entry.qa_pass == Some(false))
        .count();
    if failing > 0 {
        warn!(documents = failing, "documents flagged by quality or QA gates");
        notes.push(format!("{} documents flagged by quality or QA gates", failing));
    }

    let manifest = ProcessRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_process_command(&args),
        output_dir: args.output_dir.display().to_string(),
        db_path: args.db_path.as_ref().map(|path| path.display().to_string()),
        documents,
        notes,
    };
    let manifest_path = args
        .output_dir
        .join(format!("process_run_{}.json", utc_compact_string(started_ts)));
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        run_id = %run_id,
        documents = manifest.documents.len(),
        manifest = %manifest_path.display(),
        "process run completed"
    );

    Ok(())
}

fn process_input(job: &ProcessJob<'_>, input: &Path) -> Result<ProcessedInput> {
    let raw_text = read_text_file(input)?;
    let sha256 = sha256_text(&raw_text);
    let doc_id = doc_id_for(&sha256);

    let processed = process_document(
        job.rules,
        &raw_text,
        job.title,
        job.doc_type,
        job.reference,
        job.config,
    );

    let stem = output_stem(input)?;

    write_json_pretty(
        &job.output_dir.join(format!("{}.document.json", stem)),
        &processed.document,
    )?;
    write_json_pretty(
        &job.output_dir.join(format!("{}.chunks.json", stem)),
        &processed.chunks,
    )?;
    write_json_pretty(
        &job.output_dir.join(format!("{}.report.json", stem)),
        &DocumentReport {
            doc_id: &doc_id,
            input_path: input.display().to_string(),
            generated_at: now_utc_string(),
            normalization: &processed.normalization,
            hierarchy: &processed.hierarchy,
            quality: &processed.quality,
            qa: processed.qa.as_ref(),
        },
    )?;
    write_text_file(
        &job.output_dir.join(format!("{}.md", stem)),
        &render_markdown(&processed.document),
    )?;

    info!(
        input = %input.display(),
        doc_id = %doc_id,
        chunks = processed.chunks.len(),
        "wrote document outputs"
    );

    Ok(ProcessedInput {
        input_path: input.to_path_buf(),
        doc_id,
        sha256,
        processed,
    })
}

fn output_stem(input: &Path) -> Result<&str> {
    input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("input has no usable file name: {}", input.display()))
}

/// Output files are named by input stem, so two inputs sharing a stem would
/// overwrite each other.
fn check_unique_stems(inputs: &[PathBuf]) -> Result<()> {
    let mut seen = HashMap::<&str, &Path>::new();
    for input in inputs {
        let stem = output_stem(input)?;
        if let Some(previous) = seen.insert(stem, input) {
            bail!(
                "inputs {} and {} share the output name '{}'",
                previous.display(),
                input.display(),
                stem
            );
        }
    }
    Ok(())
}

fn run_entry(input: &ProcessedInput) -> DocumentRunEntry {
    let document = &input.processed.document;
    DocumentRunEntry {
        input_path: input.input_path.display().to_string(),
        doc_id: input.doc_id.clone(),
        sha256: input.sha256.clone(),
        structured: document.structured,
        article_count: document.articles.len(),
        chapter_count: document.chapters.len(),
        annex_count: document.annexes.len(),
        chunk_count: input.processed.chunks.len(),
        quality_pass: input.processed.quality.is_pass,
        qa_pass: input.processed.qa.as_ref().map(|report| report.is_pass),
        regressions: input.processed.quality.regressions.clone(),
    }
}

fn render_process_command(args: &ProcessArgs) -> String {
    let mut command = vec!["statute-chunker".to_string(), "process".to_string()];

    for input in &args.inputs {
        command.push("--input".to_string());
        command.push(input.display().to_string());
    }
    if let Some(title) = &args.title {
        command.push("--title".to_string());
        command.push(title.clone());
    }
    if let Some(path) = &args.reference {
        command.push("--reference".to_string());
        command.push(path.display().to_string());
        push_value_enum(&mut command, "--qa-source", args.qa_source);
    }
    push_value_enum(&mut command, "--doc-type", args.doc_type);
    command.push("--output-dir".to_string());
    command.push(args.output_dir.display().to_string());
    if let Some(path) = &args.config {
        command.push("--config".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(target_chars) = args.target_chars {
        command.push("--target-chars".to_string());
        command.push(target_chars.to_string());
    }
    if args.keep_lossy_annex {
        command.push("--keep-lossy-annex".to_string());
    }
    command.push("--max-concurrency".to_string());
    command.push(args.max_concurrency.to_string());

    command.join(" ")
}

fn push_value_enum<T: ValueEnum>(command: &mut Vec<String>, flag: &str, value: T) {
    if let Some(possible) = value.to_possible_value() {
        command.push(flag.to_string());
        command.push(possible.get_name().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{DocTypeArg, QaSourceArg};

    fn process_args(inputs: &[&str]) -> ProcessArgs {
        ProcessArgs {
            inputs: inputs.iter().map(PathBuf::from).collect(),
            title: None,
            reference: None,
            qa_source: QaSourceArg::StructuralParse,
            doc_type: DocTypeArg::Statute,
            output_dir: PathBuf::from("out"),
            config: None,
            db_path: None,
            target_chars: None,
            keep_lossy_annex: false,
            max_concurrency: 4,
        }
    }

    #[test]
    fn inputs_sharing_a_stem_are_rejected() {
        let inputs = [PathBuf::from("a/law.txt"), PathBuf::from("b/law.txt")];
        let error = check_unique_stems(&inputs).expect_err("duplicate stems should fail");
        assert!(error.to_string().contains("'law'"));

        let distinct = [PathBuf::from("a/law.txt"), PathBuf::from("a/decree.txt")];
        assert!(check_unique_stems(&distinct).is_ok());
    }

    #[test]
    fn run_with_duplicate_stems_fails_before_writing_outputs() {
        let mut args = process_args(&["a/law.txt", "b/law.txt"]);
        args.output_dir = std::env::temp_dir().join("statute-chunker-duplicate-stems-never-created");
        let output_dir = args.output_dir.clone();

        assert!(run(args).is_err());
        assert!(!output_dir.exists());
    }

    #[test]
    fn recorded_command_reproduces_document_type_and_qa_source() {
        let mut args = process_args(&["law.txt"]);
        args.doc_type = DocTypeArg::Generic;
        args.reference = Some(PathBuf::from("law.vlm.txt"));
        args.qa_source = QaSourceArg::Vlm;

        let command = render_process_command(&args);
        assert_eq!(
            command,
            "statute-chunker process --input law.txt --reference law.vlm.txt --qa-source vlm \
             --doc-type generic --output-dir out --max-concurrency 4"
        );

        let command = render_process_command(&process_args(&["law.txt"]));
        assert!(command.contains("--doc-type statute"));
        assert!(!command.contains("--qa-source"));
    }
}
