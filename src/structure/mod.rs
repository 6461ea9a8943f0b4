//! Statute structure recovery: normalization, tree building, validation,
//! annex decomposition, fallback chunking, cross-validation and DoD metrics.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{AnnexConfig, AnnexFallback, ChunkerConfig, PipelineConfig, QaConfig};
use crate::model::{
    Addenda, AmendmentRecord, Annex, AnnexDecomposition, AnnexHeader, Article, ArticleId,
    ArticleNumber, Boundary, Chapter, Chunk, ChunkKind, Clause, ClauseId, Document, Item, ItemId,
    Node, SectionType, SubChunk, SubChunkMetadata,
};

mod annex;
mod assemble;
mod hierarchy;
mod markdown;
mod metrics;
mod normalize;
mod qa;
mod rules;
mod semantic;
#[cfg(test)]
mod tests;
mod tree;

pub use self::annex::*;
pub use self::assemble::*;
pub use self::hierarchy::*;
pub use self::markdown::*;
pub use self::metrics::*;
pub use self::normalize::*;
pub use self::qa::*;
pub use self::rules::*;
pub use self::semantic::*;
pub use self::tree::*;

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocument {
    pub document: Document,
    pub chunks: Vec<Chunk>,
    pub normalization: NormalizationStats,
    pub hierarchy: HierarchyReport,
    pub quality: QualityReport,
    pub qa: Option<QaReport>,
}

/// Reference text used to cross-check the recovered structure.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceText<'a> {
    pub text: &'a str,
    pub source: QaSource,
}

/// Runs the full pipeline over one document.
///
/// Never fails: structural problems surface as report fields so that the
/// caller always receives a best-effort document plus an honest report.
pub fn process_document(
    rules: &PatternRules,
    raw_text: &str,
    title: Option<&str>,
    doc_type: DocumentType,
    reference: Option<ReferenceText<'_>>,
    config: &PipelineConfig,
) -> ProcessedDocument {
    let normalized = normalize_text(rules, raw_text);
    debug!(
        page_markers = normalized.stats.page_markers_removed,
        edge_lines = normalized.stats.edge_lines_removed,
        blank_runs = normalized.stats.blank_runs_collapsed,
        "normalized input text"
    );

    let mut document = match doc_type {
        DocumentType::Statute => build_tree(rules, &normalized.text, title),
        DocumentType::Generic => unstructured_document(&normalized.text, title),
    };
    decompose_annexes(rules, &mut document, &config.annex);

    let hierarchy = analyze_hierarchy(rules, &document);
    if !hierarchy.integrity_errors.is_empty() {
        warn!(
            errors = hierarchy.integrity_errors.len(),
            "tree integrity violations detected"
        );
    }
    if !hierarchy.cross_bleeds.is_empty() {
        warn!(
            articles = hierarchy.cross_bleeds.len(),
            rate = hierarchy.boundary_cross_bleed_rate,
            "article boundary cross-bleed detected"
        );
    }

    let chunks = if document.structured {
        assemble_chunks(&document)
    } else {
        fallback_chunks(rules, &document, &normalized.text, doc_type, &config.chunker)
    };

    let qa = reference.map(|reference| {
        let processed = processed_text(&chunks);
        run_dual_qa(rules, reference.text, &processed, reference.source, &config.qa)
    });

    let evidence = QualityEvidence::collect(
        rules,
        &normalized.text,
        reference.map(|reference| reference.text),
        &document,
        &chunks,
        &hierarchy,
    );
    let quality = evaluate_quality(&evidence);

    info!(
        title = %document.title,
        structured = document.structured,
        chapters = document.chapters.len(),
        articles = document.articles.len(),
        annexes = document.annexes.len(),
        chunks = chunks.len(),
        quality_pass = quality.is_pass,
        qa_pass = ?qa.as_ref().map(|report| report.is_pass),
        "processed document"
    );

    ProcessedDocument {
        document,
        chunks,
        normalization: normalized.stats,
        hierarchy,
        quality,
        qa,
    }
}

fn unstructured_document(text: &str, title: Option<&str>) -> Document {
    Document {
        title: title.map(str::trim).unwrap_or_default().to_string(),
        structured: false,
        basic_spirit: lead_in_excerpt(text),
        ..Document::default()
    }
}

fn fallback_chunks(
    rules: &PatternRules,
    document: &Document,
    text: &str,
    doc_type: DocumentType,
    config: &ChunkerConfig,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    if !document.title.is_empty() {
        chunks.push(Chunk::new(
            ChunkKind::Title {
                title: document.title.clone(),
            },
            Boundary::Preamble,
            document.title.clone(),
        ));
    }

    chunks.extend(chunk_text(rules, text, doc_type, config));
    renumber_section_order(&mut chunks);
    chunks
}

/// The core's own rendition of the document text, as compared by the QA gate.
pub fn processed_text(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<&str>>()
        .join("\n\n")
}

pub fn renumber_section_order(chunks: &mut [Chunk]) {
    for (index, chunk) in chunks.iter_mut().enumerate() {
        chunk.metadata.section_order = index;
    }
}
