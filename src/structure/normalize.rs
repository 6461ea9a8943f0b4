use super::*;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationStats {
    pub page_markers_removed: usize,
    pub edge_lines_removed: usize,
    pub blank_runs_collapsed: usize,
}

#[derive(Debug, Clone)]
pub struct NormalizedText {
    pub text: String,
    pub stats: NormalizationStats,
}

/// Running headers/footers must repeat on at least this many pages.
const EDGE_LINE_MIN_PAGES: usize = 3;
const EDGE_LINE_MAX_LEN: usize = 120;

pub fn normalize_text(rules: &PatternRules, raw: &str) -> NormalizedText {
    let mut stats = NormalizationStats::default();
    let mut pages: Vec<Vec<String>> = vec![Vec::new()];

    for raw_line in raw.lines() {
        for (segment_index, segment) in raw_line.split('\u{c}').enumerate() {
            if segment_index > 0 {
                start_new_page(&mut pages);
            }

            let line = segment.trim_end();
            if rules.page_marker.is_match(line) || rules.portal_footer.is_match(line) {
                stats.page_markers_removed += 1;
                start_new_page(&mut pages);
                continue;
            }

            if let Some(page) = pages.last_mut() {
                page.push(line.to_string());
            }
        }
    }

    if pages.len() >= EDGE_LINE_MIN_PAGES {
        let headers = detect_repeated_edge_lines(&pages, true);
        let footers = detect_repeated_edge_lines(&pages, false);
        for page in &mut pages {
            stats.edge_lines_removed += strip_edge_lines(page, &headers, &footers);
        }
    }

    let mut lines = Vec::<&str>::new();
    let mut blank_run = 0usize;
    for line in pages.iter().flatten() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run == 2 {
                stats.blank_runs_collapsed += 1;
            }
            if blank_run > 1 {
                continue;
            }
            lines.push("");
            continue;
        }

        blank_run = 0;
        lines.push(line.as_str());
    }

    NormalizedText {
        text: lines.join("\n").trim().to_string(),
        stats,
    }
}

fn start_new_page(pages: &mut Vec<Vec<String>>) {
    let current_has_text = pages
        .last()
        .map(|page| page.iter().any(|line| !line.trim().is_empty()))
        .unwrap_or(false);
    if current_has_text {
        pages.push(Vec::new());
    }
}

fn detect_repeated_edge_lines(pages: &[Vec<String>], header: bool) -> HashSet<String> {
    let mut counts = HashMap::<String, usize>::new();
    for page in pages {
        let candidate = if header {
            page.iter().find(|line| !line.trim().is_empty())
        } else {
            page.iter().rev().find(|line| !line.trim().is_empty())
        };

        let Some(candidate) = candidate else {
            continue;
        };

        let normalized = normalize_edge_line(candidate);
        if normalized.is_empty() || normalized.chars().count() > EDGE_LINE_MAX_LEN {
            continue;
        }
        *counts.entry(normalized).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter_map(|(candidate, count)| (count >= EDGE_LINE_MIN_PAGES).then_some(candidate))
        .collect()
}

fn strip_edge_lines(
    page: &mut Vec<String>,
    headers: &HashSet<String>,
    footers: &HashSet<String>,
) -> usize {
    let mut removed = 0usize;

    if let Some(index) = page.iter().position(|line| !line.trim().is_empty()) {
        if headers.contains(&normalize_edge_line(&page[index])) {
            page.remove(index);
            removed += 1;
        }
    }

    if let Some(index) = page.iter().rposition(|line| !line.trim().is_empty()) {
        if footers.contains(&normalize_edge_line(&page[index])) {
            page.remove(index);
            removed += 1;
        }
    }

    removed
}

fn normalize_edge_line(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}
