use super::*;

const LEAD_IN_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleHeaderMatch {
    pub start: usize,
    pub end: usize,
    pub ordinal: ArticleNumber,
    pub title: String,
    pub titled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ChapterMatch {
    start: usize,
    number: String,
    title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AnnexMark {
    start: usize,
    annex_no: String,
    title: String,
}

/// Every article header position in `text`, in position order.
///
/// Titled headers (`제5조(목적)`) are matched anywhere; untitled ones only at
/// line start. When both rules cover the same span the titled match wins.
/// Repeated numbers are kept here; see [`dedupe_article_headers`].
pub fn find_article_headers(rules: &PatternRules, text: &str) -> Vec<ArticleHeaderMatch> {
    let mut matches = Vec::<ArticleHeaderMatch>::new();

    for captures in rules.article_titled.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let Some(ordinal) = parse_article_number(
            captures.get(1).map(|value| value.as_str()),
            captures.get(2).map(|value| value.as_str()),
        ) else {
            continue;
        };
        let title = captures
            .get(3)
            .map(|value| value.as_str().trim().to_string())
            .unwrap_or_default();

        matches.push(ArticleHeaderMatch {
            start: whole.start(),
            end: whole.end(),
            ordinal,
            title,
            titled: true,
        });
    }

    for captures in rules.article_untitled.captures_iter(text) {
        let Some(number) = captures.get(1) else {
            continue;
        };
        let overlaps_titled = matches
            .iter()
            .any(|titled| number.start() < titled.end && titled.start < number.end());
        if overlaps_titled {
            continue;
        }
        let Some(ordinal) = parse_article_number(
            captures.get(2).map(|value| value.as_str()),
            captures.get(3).map(|value| value.as_str()),
        ) else {
            continue;
        };

        matches.push(ArticleHeaderMatch {
            start: number.start(),
            end: number.end(),
            ordinal,
            title: String::new(),
            titled: false,
        });
    }

    matches.sort_by_key(|header| header.start);
    matches
}

/// Keeps the first occurrence of every article number; later repeats are
/// upstream artifacts and are ignored rather than merged.
pub fn dedupe_article_headers(headers: Vec<ArticleHeaderMatch>) -> Vec<ArticleHeaderMatch> {
    let mut seen = HashSet::<ArticleNumber>::new();
    headers
        .into_iter()
        .filter(|header| seen.insert(header.ordinal))
        .collect()
}

/// The main article body of a statute: everything before the first addenda
/// or annex marker that follows the first article header.
struct ArticleRegion {
    headers: Vec<ArticleHeaderMatch>,
    annex_marks: Vec<AnnexMark>,
    addenda_start: Option<usize>,
    main_end: usize,
}

fn locate_article_region(rules: &PatternRules, text: &str) -> ArticleRegion {
    let all_headers = find_article_headers(rules, text);
    let scan_floor = all_headers.first().map(|header| header.start).unwrap_or(0);

    let annex_marks = find_annex_marks(rules, text, scan_floor);
    let addenda_start = rules
        .addenda_marker
        .find_iter(text)
        .map(|found| found.start())
        .find(|start| *start >= scan_floor);

    let main_end = annex_marks
        .first()
        .map(|mark| mark.start)
        .into_iter()
        .chain(addenda_start)
        .min()
        .unwrap_or(text.len());

    let raw_header_count = all_headers.len();
    let headers = dedupe_article_headers(
        all_headers
            .into_iter()
            .filter(|header| header.start < main_end)
            .collect(),
    );
    if headers.len() < raw_header_count {
        debug!(
            found = raw_header_count,
            kept = headers.len(),
            "dropped repeated or out-of-body article headers"
        );
    }

    ArticleRegion {
        headers,
        annex_marks,
        addenda_start,
        main_end,
    }
}

/// Distinct article headers of the main body, first occurrence first.
/// Addenda and annex articles are excluded.
pub fn body_article_headers(rules: &PatternRules, text: &str) -> Vec<ArticleHeaderMatch> {
    locate_article_region(rules, text).headers
}

pub fn build_tree(rules: &PatternRules, text: &str, title: Option<&str>) -> Document {
    let ArticleRegion {
        headers,
        annex_marks,
        addenda_start,
        main_end,
    } = locate_article_region(rules, text);

    if headers.is_empty() && annex_marks.is_empty() {
        warn!("no article or annex markers found; emitting unstructured document");
        let preamble_title = title
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| detect_title(rules, text));
        return Document {
            title: preamble_title,
            structured: false,
            basic_spirit: lead_in_excerpt(text),
            ..Document::default()
        };
    }

    let chapter_matches = find_chapters(rules, &text[..main_end]);

    let preamble_end = chapter_matches
        .first()
        .map(|chapter| chapter.start)
        .into_iter()
        .chain(
            headers
                .first()
                .map(|header| heading_prefix_start(text, header.start)),
        )
        .chain(std::iter::once(main_end))
        .min()
        .unwrap_or(main_end);
    let preamble = &text[..preamble_end];

    let document_title = title
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| detect_title(rules, preamble));

    let mut articles = Vec::<Article>::with_capacity(headers.len());
    let mut clauses = Vec::<Clause>::new();
    let mut items = Vec::<Item>::new();

    for (index, header) in headers.iter().enumerate() {
        let next_chapter = chapter_matches
            .iter()
            .map(|chapter| chapter.start)
            .find(|start| *start >= header.end);
        let body_end = headers
            .get(index + 1)
            .map(|next| heading_prefix_start(text, next.start))
            .into_iter()
            .chain(next_chapter)
            .min()
            .unwrap_or(main_end)
            .max(header.end);
        let body = text[header.end..body_end].trim().to_string();

        let chapter_number = chapter_matches
            .iter()
            .take_while(|chapter| chapter.start < header.start)
            .last()
            .map(|chapter| chapter.number.clone());

        let id = ArticleId(index);
        let number = header.ordinal.to_string();
        let clause_ids = parse_clauses(rules, id, &number, &body, &mut clauses, &mut items);

        articles.push(Article {
            id,
            number,
            ordinal: header.ordinal,
            title: header.title.clone(),
            body,
            chapter_number,
            order: index,
            position: header.start,
            clauses: clause_ids,
        });
    }

    let chapters = place_chapters(&chapter_matches, &articles);

    let addenda = addenda_start.map(|start| {
        let end = annex_marks
            .iter()
            .map(|mark| mark.start)
            .find(|mark_start| *mark_start > start)
            .unwrap_or(text.len());
        Addenda {
            position: start,
            body: text[start..end].trim().to_string(),
        }
    });

    let annexes = annex_marks
        .iter()
        .enumerate()
        .map(|(index, mark)| {
            let end = annex_marks
                .get(index + 1)
                .map(|next| next.start)
                .into_iter()
                .chain(addenda_start.filter(|start| *start > mark.start))
                .min()
                .unwrap_or(text.len());
            Annex {
                annex_no: mark.annex_no.clone(),
                title: mark.title.clone(),
                position: mark.start,
                body: text[mark.start..end].trim().to_string(),
                decomposition: None,
                fallback_applied: false,
            }
        })
        .collect::<Vec<Annex>>();

    info!(
        articles = articles.len(),
        chapters = chapters.len(),
        clauses = clauses.len(),
        items = items.len(),
        annexes = annexes.len(),
        "built document tree"
    );

    Document {
        title: document_title,
        structured: true,
        chapters,
        articles,
        clauses,
        items,
        annexes,
        addenda,
        amendment_history: extract_amendment_history(rules, preamble),
        basic_spirit: extract_basic_spirit(rules, preamble),
    }
}

pub fn lead_in_excerpt(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(truncate_chars(trimmed, LEAD_IN_EXCERPT_CHARS).trim_end().to_string())
}

/// Backs a header position up over Markdown heading markers on the same line.
pub fn heading_prefix_start(text: &str, position: usize) -> usize {
    text[..position].trim_end_matches([' ', '\t', '#']).len()
}

fn find_annex_marks(rules: &PatternRules, text: &str, floor: usize) -> Vec<AnnexMark> {
    rules
        .annex_marker
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            if whole.start() < floor {
                return None;
            }

            let kind = captures.get(1)?.as_str();
            let number = captures.get(2)?.as_str();
            let annex_no = match captures.get(3) {
                Some(sub) => format!("{}{}의{}", kind, number, sub.as_str()),
                None => format!("{}{}", kind, number),
            };
            let line_end = text[whole.end()..]
                .find('\n')
                .map(|offset| whole.end() + offset)
                .unwrap_or(text.len());
            let title = annex_line_title(&text[whole.end()..line_end]);

            Some(AnnexMark {
                start: whole.start(),
                annex_no,
                title,
            })
        })
        .collect()
}

/// Title text following an annex marker, without trailing `<...>` tags or
/// `(제N조 관련)` notes.
pub fn annex_line_title(rest: &str) -> String {
    let mut title = rest.trim().trim_matches('*').trim();
    for stop in ['<', '〈', '('] {
        if let Some(index) = title.find(stop) {
            title = title[..index].trim_end();
        }
    }
    title.to_string()
}

fn find_chapters(rules: &PatternRules, text: &str) -> Vec<ChapterMatch> {
    rules
        .chapter_heading
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let main = captures.get(2)?.as_str();
            let number = match captures.get(3) {
                Some(sub) => format!("제{}장의{}", main, sub.as_str()),
                None => format!("제{}장", main),
            };
            let title = captures
                .get(4)
                .map(|value| value.as_str().trim().to_string())
                .unwrap_or_default();

            Some(ChapterMatch {
                start: whole.start(),
                number,
                title,
            })
        })
        .collect()
}

/// Deduplicates chapter matches by number and records, as `order`, the
/// position of the first article that belongs to each chapter. Chapters
/// without articles take the index of the first article after them.
fn place_chapters(matches: &[ChapterMatch], articles: &[Article]) -> Vec<Chapter> {
    let mut seen = HashSet::<&str>::new();
    let mut chapters = Vec::new();

    for chapter in matches {
        if !seen.insert(chapter.number.as_str()) {
            continue;
        }

        let order = articles
            .iter()
            .find(|article| article.chapter_number.as_deref() == Some(chapter.number.as_str()))
            .map(|article| article.order)
            .unwrap_or_else(|| {
                articles
                    .iter()
                    .filter(|article| article.position < chapter.start)
                    .count()
            });

        chapters.push(Chapter {
            number: chapter.number.clone(),
            title: chapter.title.clone(),
            order,
            position: chapter.start,
        });
    }

    chapters
}

fn parse_clauses(
    rules: &PatternRules,
    article_id: ArticleId,
    article_no: &str,
    body: &str,
    clauses: &mut Vec<Clause>,
    items: &mut Vec<Item>,
) -> Vec<ClauseId> {
    let mut clause_ids = Vec::new();
    let mut pending_lead = Vec::<&str>::new();
    let mut current_clause: Option<ClauseId> = None;
    let mut current_item: Option<ItemId> = None;

    for line in body.lines() {
        if let Some(captures) = rules.clause_marker.captures(line) {
            let (Some(whole), Some(marker)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let label = marker.as_str().to_string();
            let number = label
                .chars()
                .next()
                .and_then(circled_numeral_value)
                .map(|value| value.to_string())
                .unwrap_or_else(|| label.clone());

            let id = ClauseId(clauses.len());
            clauses.push(Clause {
                id,
                article: article_id,
                parent_article_no: article_no.to_string(),
                number,
                label,
                body: line[whole.end()..].trim().to_string(),
                implicit: false,
                items: Vec::new(),
            });
            clause_ids.push(id);
            current_clause = Some(id);
            current_item = None;
            continue;
        }

        if let Some(captures) = rules.item_marker.captures(line) {
            let (Some(whole), Some(main)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let number = match captures.get(2) {
                Some(sub) => format!("{}의{}", main.as_str(), sub.as_str()),
                None => main.as_str().to_string(),
            };

            let clause_id = match current_clause {
                Some(id) => id,
                None => {
                    let id = ClauseId(clauses.len());
                    clauses.push(Clause {
                        id,
                        article: article_id,
                        parent_article_no: article_no.to_string(),
                        number: "1".to_string(),
                        label: String::new(),
                        body: pending_lead.join("\n"),
                        implicit: true,
                        items: Vec::new(),
                    });
                    pending_lead.clear();
                    clause_ids.push(id);
                    current_clause = Some(id);
                    id
                }
            };

            let Some(clause) = clauses.get_mut(clause_id.0) else {
                continue;
            };
            let id = ItemId(items.len());
            items.push(Item {
                id,
                clause: clause_id,
                parent_article_no: article_no.to_string(),
                parent_clause_no: clause.number.clone(),
                number,
                label: whole.as_str().trim().to_string(),
                body: line[whole.end()..].trim().to_string(),
            });
            clause.items.push(id);
            current_item = Some(id);
            continue;
        }

        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(item) = current_item.and_then(|id| items.get_mut(id.0)) {
            append_line(&mut item.body, text);
        } else if let Some(clause) = current_clause.and_then(|id| clauses.get_mut(id.0)) {
            append_line(&mut clause.body, text);
        } else {
            pending_lead.push(text);
        }
    }

    clause_ids
}

fn append_line(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(line);
}

fn detect_title(rules: &PatternRules, preamble: &str) -> String {
    for line in preamble.lines() {
        let trimmed = line.trim();
        if let Some(captures) = rules.markdown_heading.captures(trimmed) {
            if let Some(heading) = captures.get(1) {
                return heading.as_str().trim().trim_end_matches('#').trim().to_string();
            }
        }
    }

    preamble
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| truncate_chars(line, 200).to_string())
        .unwrap_or_default()
}

fn extract_amendment_history(rules: &PatternRules, preamble: &str) -> Vec<AmendmentRecord> {
    preamble
        .lines()
        .map(str::trim)
        .filter(|line| rules.amendment_line.is_match(line))
        .filter_map(|line| {
            let dates = collect_dates(rules, line);
            if dates.is_empty() {
                return None;
            }
            Some(AmendmentRecord {
                raw: line.to_string(),
                dates,
            })
        })
        .collect()
}

fn extract_basic_spirit(rules: &PatternRules, preamble: &str) -> Option<String> {
    let start = rules.basic_spirit.find(preamble)?.start();
    let line_start = preamble[..start].rfind('\n').map(|index| index + 1).unwrap_or(0);
    let spirit = preamble[line_start..].trim();
    if spirit.is_empty() {
        return None;
    }

    Some(spirit.to_string())
}
