use super::*;

/// Where the reference text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaSource {
    Vlm,
    StructuralParse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaMode {
    Articles,
    Annex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReport {
    pub source: QaSource,
    pub mode: QaMode,
    pub reference_count: usize,
    pub processed_count: usize,
    pub matched: Vec<String>,
    pub missing_in_processed: Vec<String>,
    pub extra_in_processed: Vec<String>,
    pub match_rate: f64,
    pub loose_reference_count: usize,
    pub loose_processed_count: usize,
    pub loose_missing_in_processed: Vec<String>,
    pub reference_chars: usize,
    pub processed_chars: usize,
    pub text_coverage: Option<f64>,
    pub threshold: f64,
    pub is_pass: bool,
}

/// Distinct article numbers in `text`, in natural article order.
pub fn extract_article_set(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .captures_iter(text)
        .filter_map(|captures| {
            parse_article_number(
                captures.get(1).map(|value| value.as_str()),
                captures.get(2).map(|value| value.as_str()),
            )
        })
        .collect::<BTreeSet<ArticleNumber>>()
        .into_iter()
        .map(|ordinal| ordinal.to_string())
        .collect()
}

/// Compares article headers found in an independent reference text with
/// those in the processed output.
///
/// Only headers followed by an opening delimiter count; bare `제N조` mentions
/// are reported as loose diagnostics. A reference with no such headers but
/// more than `annex_mode_min_reference_chars` characters is judged on
/// character coverage instead.
pub fn run_dual_qa(
    rules: &PatternRules,
    reference: &str,
    processed: &str,
    source: QaSource,
    config: &QaConfig,
) -> QaReport {
    let reference_set = extract_article_set(&rules.qa_strict, reference);
    let processed_set = extract_article_set(&rules.qa_strict, processed);
    let loose_reference = extract_article_set(&rules.qa_loose, reference);
    let loose_processed = extract_article_set(&rules.qa_loose, processed);

    let matched = intersect(&reference_set, &processed_set);
    let missing_in_processed = difference(&reference_set, &processed_set);
    let extra_in_processed = difference(&processed_set, &reference_set);
    let loose_missing_in_processed = difference(&loose_reference, &loose_processed);

    let reference_chars = reference.chars().count();
    let processed_chars = processed.chars().count();

    let match_rate = if reference_set.is_empty() {
        0.0
    } else {
        matched.len() as f64 / reference_set.len() as f64
    };

    let annex_mode =
        reference_set.is_empty() && reference_chars > config.annex_mode_min_reference_chars;
    let (mode, text_coverage, threshold, is_pass) = if annex_mode {
        let coverage = processed_chars as f64 / reference_chars as f64;
        (
            QaMode::Annex,
            Some(coverage),
            config.coverage_threshold,
            coverage >= config.coverage_threshold,
        )
    } else {
        let is_pass = !reference_set.is_empty()
            && match_rate >= config.match_threshold
            && missing_in_processed.is_empty()
            && extra_in_processed.is_empty();
        (QaMode::Articles, None, config.match_threshold, is_pass)
    };

    if is_pass {
        debug!(?source, ?mode, match_rate, ?text_coverage, "dual QA passed");
    } else {
        warn!(
            ?source,
            ?mode,
            match_rate,
            ?text_coverage,
            missing = missing_in_processed.len(),
            extra = extra_in_processed.len(),
            "dual QA failed"
        );
    }

    QaReport {
        source,
        mode,
        reference_count: reference_set.len(),
        processed_count: processed_set.len(),
        matched,
        missing_in_processed,
        extra_in_processed,
        match_rate,
        loose_reference_count: loose_reference.len(),
        loose_processed_count: loose_processed.len(),
        loose_missing_in_processed,
        reference_chars,
        processed_chars,
        text_coverage,
        threshold,
        is_pass,
    }
}

fn intersect(left: &[String], right: &[String]) -> Vec<String> {
    let right = right.iter().collect::<HashSet<&String>>();
    left.iter()
        .filter(|value| right.contains(value))
        .cloned()
        .collect()
}

fn difference(left: &[String], right: &[String]) -> Vec<String> {
    let right = right.iter().collect::<HashSet<&String>>();
    left.iter()
        .filter(|value| !right.contains(value))
        .cloned()
        .collect()
}
