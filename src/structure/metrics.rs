use super::*;

pub const ARTICLE_BOUNDARY_F1_MIN: f64 = 0.97;
pub const LIST_BINDING_FIX_RATE_MIN: f64 = 0.98;
pub const TABLE_FALSE_POSITIVE_MAX: usize = 0;
pub const AMENDMENT_CAPTURE_RATE_MIN: f64 = 1.0;
pub const EMPTY_ARTICLE_RATE_MAX: f64 = 0.0;
pub const HIERARCHY_PRESERVATION_RATE_MIN: f64 = 0.95;
pub const BOUNDARY_CROSS_BLEED_RATE_MAX: f64 = 0.0;

/// Raw counts behind the quality axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityEvidence {
    pub expected_articles: usize,
    pub detected_articles: usize,
    pub matched_articles: usize,
    pub list_items_detected: usize,
    pub list_items_bound: usize,
    pub table_sections: usize,
    pub table_false_positives: usize,
    pub amendment_tags_in_source: usize,
    pub amendment_tags_in_chunks: usize,
    pub article_count: usize,
    pub empty_articles: usize,
    pub empty_article_rate: f64,
    pub hierarchy_preservation_rate: f64,
    pub articles_with_cross_bleed: usize,
    pub boundary_cross_bleed_rate: f64,
}

impl QualityEvidence {
    pub fn collect(
        rules: &PatternRules,
        normalized_text: &str,
        reference_text: Option<&str>,
        document: &Document,
        chunks: &[Chunk],
        hierarchy: &HierarchyReport,
    ) -> Self {
        // Without a reference, expected headers come from the same rules the
        // tree uses, restricted to the main article body.
        let expected = match reference_text {
            Some(reference) => extract_article_set(&rules.qa_strict, reference)
                .into_iter()
                .collect::<HashSet<String>>(),
            None => body_article_headers(rules, normalized_text)
                .iter()
                .map(|header| header.ordinal.to_string())
                .collect::<HashSet<String>>(),
        };
        let detected = document
            .articles
            .iter()
            .map(|article| article.number.clone())
            .collect::<HashSet<String>>();
        let matched_articles = expected.intersection(&detected).count();

        let list_items_detected = document
            .articles
            .iter()
            .flat_map(|article| article.body.lines())
            .map(|line| {
                usize::from(rules.item_marker.is_match(line))
                    + rules.glued_item_marker.find_iter(line).count()
            })
            .sum::<usize>();
        let list_items_bound = document
            .items
            .iter()
            .filter(|item| document.clause(item.clause).is_some())
            .count();

        let table_sections = document
            .annexes
            .iter()
            .filter_map(|annex| annex.decomposition.as_ref())
            .flat_map(|decomposition| decomposition.sub_chunks.iter())
            .filter(|sub_chunk| sub_chunk.section_type == SectionType::TableRows)
            .collect::<Vec<&SubChunk>>();
        let table_false_positives = table_sections
            .iter()
            .filter(|sub_chunk| !has_row_shape(rules, &sub_chunk.content))
            .count();

        let amendment_tags_in_source = rules.amendment_tag.find_iter(normalized_text).count();
        let amendment_tags_in_chunks = chunks
            .iter()
            .map(|chunk| rules.amendment_tag.find_iter(&chunk.content).count())
            .sum::<usize>();

        let articles_with_cross_bleed = hierarchy
            .cross_bleeds
            .iter()
            .map(|bleed| bleed.article_number.as_str())
            .collect::<HashSet<&str>>()
            .len();

        Self {
            expected_articles: expected.len(),
            detected_articles: detected.len(),
            matched_articles,
            list_items_detected,
            list_items_bound,
            table_sections: table_sections.len(),
            table_false_positives,
            amendment_tags_in_source,
            amendment_tags_in_chunks,
            article_count: hierarchy.article_count,
            empty_articles: hierarchy.empty_articles.len(),
            empty_article_rate: hierarchy.empty_article_rate,
            hierarchy_preservation_rate: hierarchy.hierarchy_preservation_rate,
            articles_with_cross_bleed,
            boundary_cross_bleed_rate: hierarchy.boundary_cross_bleed_rate,
        }
    }
}

fn is_row_like(rules: &PatternRules, line: &str) -> bool {
    rules.numeric_leading.is_match(line)
        || rules.section_separator.is_match(line)
        || line.contains('|')
        || line.contains('\t')
}

/// At least half of the section's lines below its separator heading must
/// look like table rows.
pub fn has_row_shape(rules: &PatternRules, content: &str) -> bool {
    let lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>();
    let rows = match lines.split_first() {
        Some((first, rest)) if !rest.is_empty() && rules.section_separator.is_match(first) => {
            rest
        }
        _ => &lines[..],
    };
    if rows.is_empty() {
        return false;
    }

    let row_like = rows.iter().filter(|line| is_row_like(rules, line)).count();
    row_like * 2 >= rows.len()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub article_boundary_f1: f64,
    pub list_binding_fix_rate: f64,
    pub table_false_positive_count: usize,
    pub amendment_capture_rate: f64,
    pub empty_article_rate: f64,
    pub hierarchy_preservation_rate: f64,
    pub boundary_cross_bleed_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub check_id: String,
    pub name: String,
    pub value: f64,
    pub threshold: f64,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub metrics: QualityMetrics,
    pub evidence: QualityEvidence,
    pub checks: Vec<QualityCheck>,
    pub is_pass: bool,
    pub regressions: Vec<String>,
}

pub fn article_boundary_f1(expected: usize, detected: usize, matched: usize) -> f64 {
    if expected == 0 && detected == 0 {
        return 1.0;
    }
    if expected == 0 || detected == 0 || matched == 0 {
        return 0.0;
    }

    let precision = matched as f64 / detected as f64;
    let recall = matched as f64 / expected as f64;
    2.0 * precision * recall / (precision + recall)
}

fn capped_rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        1.0
    } else {
        (numerator as f64 / denominator as f64).min(1.0)
    }
}

pub fn evaluate_quality(evidence: &QualityEvidence) -> QualityReport {
    let metrics = QualityMetrics {
        article_boundary_f1: article_boundary_f1(
            evidence.expected_articles,
            evidence.detected_articles,
            evidence.matched_articles,
        ),
        list_binding_fix_rate: capped_rate(evidence.list_items_bound, evidence.list_items_detected),
        table_false_positive_count: evidence.table_false_positives,
        amendment_capture_rate: capped_rate(
            evidence.amendment_tags_in_chunks,
            evidence.amendment_tags_in_source,
        ),
        empty_article_rate: evidence.empty_article_rate,
        hierarchy_preservation_rate: evidence.hierarchy_preservation_rate,
        boundary_cross_bleed_rate: evidence.boundary_cross_bleed_rate,
    };

    let mut checks = Vec::new();
    let mut regressions = Vec::new();

    let mut record =
        |check_id: &str, name: &str, value: f64, threshold: f64, pass: bool, detail: String| {
            checks.push(QualityCheck {
                check_id: check_id.to_string(),
                name: name.to_string(),
                value,
                threshold,
                result: if pass { "passed" } else { "failed" }.to_string(),
            });
            if !pass {
                regressions.push(format!("{} {}: {}", check_id, name, detail));
            }
        };

    record(
        "Q-001",
        "article_boundary_f1",
        metrics.article_boundary_f1,
        ARTICLE_BOUNDARY_F1_MIN,
        metrics.article_boundary_f1 >= ARTICLE_BOUNDARY_F1_MIN,
        format!(
            "f1={:.4} < {:.2} (expected={}, detected={}, matched={})",
            metrics.article_boundary_f1,
            ARTICLE_BOUNDARY_F1_MIN,
            evidence.expected_articles,
            evidence.detected_articles,
            evidence.matched_articles
        ),
    );
    record(
        "Q-002",
        "list_binding_fix_rate",
        metrics.list_binding_fix_rate,
        LIST_BINDING_FIX_RATE_MIN,
        metrics.list_binding_fix_rate >= LIST_BINDING_FIX_RATE_MIN,
        format!(
            "rate={:.4} < {:.2} (bound={}, detected={})",
            metrics.list_binding_fix_rate,
            LIST_BINDING_FIX_RATE_MIN,
            evidence.list_items_bound,
            evidence.list_items_detected
        ),
    );
    record(
        "Q-003",
        "table_false_positive_count",
        metrics.table_false_positive_count as f64,
        TABLE_FALSE_POSITIVE_MAX as f64,
        metrics.table_false_positive_count <= TABLE_FALSE_POSITIVE_MAX,
        format!(
            "{} of {} table_rows sections are not row-shaped",
            evidence.table_false_positives, evidence.table_sections
        ),
    );
    record(
        "Q-004",
        "amendment_capture_rate",
        metrics.amendment_capture_rate,
        AMENDMENT_CAPTURE_RATE_MIN,
        metrics.amendment_capture_rate >= AMENDMENT_CAPTURE_RATE_MIN,
        format!(
            "captured {} of {} amendment tags",
            evidence.amendment_tags_in_chunks, evidence.amendment_tags_in_source
        ),
    );
    record(
        "Q-005",
        "empty_article_rate",
        metrics.empty_article_rate,
        EMPTY_ARTICLE_RATE_MAX,
        metrics.empty_article_rate <= EMPTY_ARTICLE_RATE_MAX,
        format!(
            "{} of {} articles have no substantive body",
            evidence.empty_articles, evidence.article_count
        ),
    );
    record(
        "Q-006",
        "hierarchy_preservation_rate",
        metrics.hierarchy_preservation_rate,
        HIERARCHY_PRESERVATION_RATE_MIN,
        metrics.hierarchy_preservation_rate >= HIERARCHY_PRESERVATION_RATE_MIN,
        format!(
            "rate={:.4} < {:.2} ({} of {} expected layers detected)",
            metrics.hierarchy_preservation_rate,
            HIERARCHY_PRESERVATION_RATE_MIN,
            (metrics.hierarchy_preservation_rate * EXPECTED_LAYERS.len() as f64).round() as usize,
            EXPECTED_LAYERS.len()
        ),
    );
    record(
        "Q-007",
        "boundary_cross_bleed_rate",
        metrics.boundary_cross_bleed_rate,
        BOUNDARY_CROSS_BLEED_RATE_MAX,
        metrics.boundary_cross_bleed_rate <= BOUNDARY_CROSS_BLEED_RATE_MAX,
        format!(
            "{} of {} articles carry another article's header",
            evidence.articles_with_cross_bleed, evidence.article_count
        ),
    );

    let is_pass = regressions.is_empty();
    if !is_pass {
        debug!(regressions = regressions.len(), "quality thresholds missed");
    }

    QualityReport {
        metrics,
        evidence: evidence.clone(),
        checks,
        is_pass,
        regressions,
    }
}
