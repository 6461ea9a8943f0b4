use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Statute,
    Generic,
}

#[derive(Debug, Clone)]
struct ChunkDraft {
    content: String,
    article: Option<(ArticleNumber, String)>,
    boundary: Boundary,
    merged_from: usize,
}

impl ChunkDraft {
    fn absorb(mut self, next: ChunkDraft) -> ChunkDraft {
        let separator = if self.boundary == Boundary::ArticleMarker {
            "\n"
        } else {
            " "
        };
        self.content.push_str(separator);
        self.content.push_str(&next.content);
        self.article = self.article.or(next.article);
        self.merged_from += next.merged_from;
        self
    }
}

/// Generic chunker used when no statute tree can be built.
///
/// Statute text is cut at article headers; everything else at sentence
/// boundaries, accumulating up to `target_chars`. Chunks that end on a known
/// incomplete ending are merged forward, then chunks are re-sorted by article
/// ordinal with unattributed chunks last.
pub fn chunk_text(
    rules: &PatternRules,
    text: &str,
    doc_type: DocumentType,
    config: &ChunkerConfig,
) -> Vec<Chunk> {
    let drafts = match doc_type {
        DocumentType::Statute => {
            let drafts = split_on_article_headers(rules, text);
            if drafts.iter().any(|draft| draft.article.is_some()) {
                drafts
            } else {
                split_on_sentences(rules, text, config.target_chars)
            }
        }
        DocumentType::Generic => split_on_sentences(rules, text, config.target_chars),
    };

    let before_merge = drafts.len();
    let merged = merge_incomplete_boundaries(rules, drafts, config.tail_window_chars);
    if merged.len() < before_merge {
        debug!(
            before = before_merge,
            after = merged.len(),
            "merged chunks ending mid-sentence"
        );
    }

    sort_by_article_ordinal(merged)
        .into_iter()
        .enumerate()
        .map(|(index, draft)| {
            let (article_number, article_title) = match draft.article {
                Some((ordinal, title)) => (Some(ordinal.to_string()), Some(title)),
                None => (None, None),
            };
            let mut chunk = Chunk::new(
                ChunkKind::Text {
                    chunk_index: index,
                    article_number,
                    article_title,
                    merged_from: draft.merged_from,
                },
                draft.boundary,
                draft.content,
            );
            chunk.metadata.section_order = index;
            chunk
        })
        .collect()
}

fn split_on_article_headers(rules: &PatternRules, text: &str) -> Vec<ChunkDraft> {
    let headers = rules
        .article_titled
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let ordinal = parse_article_number(
                captures.get(1).map(|value| value.as_str()),
                captures.get(2).map(|value| value.as_str()),
            )?;
            let title = captures
                .get(3)
                .map(|value| value.as_str().trim().to_string())
                .unwrap_or_default();
            Some((heading_prefix_start(text, whole.start()), ordinal, title))
        })
        .collect::<Vec<(usize, ArticleNumber, String)>>();

    let mut drafts = Vec::new();
    let first_start = headers.first().map(|(start, _, _)| *start).unwrap_or(text.len());
    push_draft(&mut drafts, &text[..first_start], None, Boundary::ArticleMarker);

    for (index, (start, ordinal, title)) in headers.iter().enumerate() {
        let end = headers
            .get(index + 1)
            .map(|(next, _, _)| *next)
            .unwrap_or(text.len());
        push_draft(
            &mut drafts,
            &text[*start..end],
            Some((*ordinal, title.clone())),
            Boundary::ArticleMarker,
        );
    }

    drafts
}

fn split_on_sentences(rules: &PatternRules, text: &str, target_chars: usize) -> Vec<ChunkDraft> {
    let mut drafts = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for sentence in split_sentences(rules, text) {
        let sentence_chars = sentence.chars().count();
        if current_chars > 0 && current_chars + sentence_chars > target_chars {
            push_draft(&mut drafts, &current, None, Boundary::Sentence);
            current.clear();
            current_chars = 0;
        }
        current.push_str(sentence);
        current_chars += sentence_chars;
    }
    push_draft(&mut drafts, &current, None, Boundary::Sentence);

    drafts
}

/// Cuts `text` after each sentence-closing pattern. The pieces cover the
/// whole input, whitespace included.
pub fn split_sentences<'a>(rules: &PatternRules, text: &'a str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0usize;

    for found in rules.sentence_end.find_iter(text) {
        if is_enumerator_period(text, found.start()) {
            continue;
        }
        if found.end() > start {
            pieces.push(&text[start..found.end()]);
            start = found.end();
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

/// `1.` list markers and `2020. 1. 1.` dates are not sentence ends.
fn is_enumerator_period(text: &str, position: usize) -> bool {
    text[position..].starts_with('.')
        && text[..position]
            .chars()
            .next_back()
            .map(|ch| ch.is_ascii_digit())
            .unwrap_or(false)
}

fn push_draft(
    drafts: &mut Vec<ChunkDraft>,
    text: &str,
    article: Option<(ArticleNumber, String)>,
    boundary: Boundary,
) {
    let content = text.trim();
    if content.is_empty() {
        return;
    }

    drafts.push(ChunkDraft {
        content: content.to_string(),
        article,
        boundary,
        merged_from: 1,
    });
}

pub fn ends_incomplete(rules: &PatternRules, content: &str, tail_window_chars: usize) -> bool {
    let trimmed = content.trim_end();
    let char_count = trimmed.chars().count();
    let tail = match trimmed
        .char_indices()
        .nth(char_count.saturating_sub(tail_window_chars))
    {
        Some((index, _)) => &trimmed[index..],
        None => trimmed,
    };

    rules.incomplete_ending.is_match(tail)
}

fn merge_incomplete_boundaries(
    rules: &PatternRules,
    drafts: Vec<ChunkDraft>,
    tail_window_chars: usize,
) -> Vec<ChunkDraft> {
    let mut merged = Vec::with_capacity(drafts.len());
    let mut pending: Option<ChunkDraft> = None;

    for draft in drafts {
        let current = match pending.take() {
            Some(previous) => previous.absorb(draft),
            None => draft,
        };

        if ends_incomplete(rules, &current.content, tail_window_chars) {
            pending = Some(current);
        } else {
            merged.push(current);
        }
    }

    // The final chunk is allowed to end incomplete.
    if let Some(last) = pending {
        merged.push(last);
    }

    merged
}

fn sort_by_article_ordinal(mut drafts: Vec<ChunkDraft>) -> Vec<ChunkDraft> {
    drafts.sort_by_key(|draft| match &draft.article {
        Some((ordinal, _)) => (false, *ordinal),
        None => (true, ArticleNumber::new(0, None)),
    });
    drafts
}
