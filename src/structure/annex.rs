use super::*;

/// Removes rendering noise from an annex body: private-use glyphs, box-drawing
/// characters, zero-width characters, runs of spaces and runs of blank lines.
pub fn clean_annex_text(text: &str) -> String {
    let mut lines = Vec::<String>::new();
    let mut previous_blank = false;

    for raw_line in text.lines() {
        let mut line = String::with_capacity(raw_line.len());
        let mut previous_space = false;
        for ch in raw_line.chars() {
            if is_rendering_noise(ch) {
                continue;
            }
            if ch == ' ' || ch == '\t' || ch == '\u{a0}' {
                if !previous_space {
                    line.push(' ');
                }
                previous_space = true;
                continue;
            }
            previous_space = false;
            line.push(ch);
        }

        let line = line.trim().to_string();
        if line.is_empty() {
            if !previous_blank && !lines.is_empty() {
                lines.push(String::new());
            }
            previous_blank = true;
            continue;
        }

        previous_blank = false;
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}

fn is_rendering_noise(ch: char) -> bool {
    matches!(ch,
        '\u{e000}'..='\u{f8ff}'
        | '\u{f0000}'..='\u{ffffd}'
        | '\u{100000}'..='\u{10fffd}'
        | '\u{2500}'..='\u{257f}'
        | '\u{200b}'..='\u{200d}'
        | '\u{2060}'
        | '\u{feff}'
    )
}

/// Parses the first annex header found in `text`.
pub fn extract_annex_header(rules: &PatternRules, text: &str) -> Option<(AnnexHeader, usize)> {
    let captures = rules.annex_header.captures(text)?;
    let whole = captures.get(0)?;
    let kind = captures.get(1)?.as_str();
    let number = captures.get(2)?.as_str();
    let annex_no = match captures.get(3) {
        Some(sub) => format!("{}{}의{}", kind, number, sub.as_str()),
        None => format!("{}{}", kind, number),
    };

    let line_index = text[..whole.start()].matches('\n').count();
    let lines = text.lines().collect::<Vec<&str>>();
    let header_line = lines.get(line_index).copied().unwrap_or_default();
    let next_line = lines.get(line_index + 1).copied().unwrap_or_default();

    let mut title = captures
        .get(4)
        .map(|value| annex_line_title(value.as_str()))
        .unwrap_or_default();
    if title.is_empty() && !looks_like_table_line(rules, next_line) {
        title = annex_line_title(next_line);
    }

    let related_article = rules
        .related_article
        .captures(header_line)
        .or_else(|| rules.related_article.captures(next_line))
        .and_then(|related| related.get(1))
        .map(|value| value.as_str().split_whitespace().collect::<String>());

    let amendment_dates = captures
        .get(5)
        .map(|tag| collect_dates(rules, tag.as_str()))
        .unwrap_or_default();

    Some((
        AnnexHeader {
            annex_no,
            title,
            related_article,
            amendment_dates,
        },
        line_index,
    ))
}

fn looks_like_table_line(rules: &PatternRules, line: &str) -> bool {
    rules.numeric_leading.is_match(line)
        || rules.section_separator.is_match(line)
        || rules.note_line.is_match(line)
        || line.contains('|')
}

/// Splits one annex body into header, table-section and note sub-chunks and
/// measures how much of the cleaned text the sub-chunks preserve.
pub fn split_annex(
    rules: &PatternRules,
    annex_id: &str,
    body: &str,
    config: &AnnexConfig,
) -> AnnexDecomposition {
    let cleaned = clean_annex_text(body);
    let cleaned_chars = cleaned.chars().count();
    let lines = cleaned.lines().collect::<Vec<&str>>();

    let parsed_header = extract_annex_header(rules, &cleaned);
    let header_line_index = parsed_header.as_ref().map(|(_, index)| *index);
    let header = parsed_header.map(|(header, _)| header);

    let annex_no = header
        .as_ref()
        .map(|header| header.annex_no.clone())
        .unwrap_or_else(|| annex_id.to_string());
    let metadata_for = |line_count: usize| SubChunkMetadata {
        annex_no: annex_no.clone(),
        annex_title: header
            .as_ref()
            .map(|header| header.title.clone())
            .unwrap_or_default(),
        related_article: header
            .as_ref()
            .and_then(|header| header.related_article.clone()),
        amendment_dates: header
            .as_ref()
            .map(|header| header.amendment_dates.clone())
            .unwrap_or_default(),
        line_count,
    };

    let is_note = |index: usize, line: &str| {
        Some(index) != header_line_index && rules.note_line.is_match(line)
    };
    let body_floor = header_line_index.map(|index| index + 1).unwrap_or(0);
    let table_start = lines
        .iter()
        .enumerate()
        .skip(body_floor)
        .find(|(_, line)| {
            rules.numeric_leading.is_match(line) || rules.section_separator.is_match(line)
        })
        .map(|(index, _)| index)
        .or_else(|| {
            lines
                .iter()
                .enumerate()
                .skip(body_floor)
                .find(|(index, line)| is_note(*index, line))
                .map(|(index, _)| index)
        })
        .unwrap_or(lines.len());

    let mut sub_chunks = Vec::<SubChunk>::new();

    let header_lines = lines[..table_start]
        .iter()
        .enumerate()
        .filter(|(index, line)| !is_note(*index, line) && !line.is_empty())
        .map(|(_, line)| *line)
        .collect::<Vec<&str>>();
    if !header_lines.is_empty() {
        let joined = header_lines.join("\n");
        let excerpt = truncate_chars(&joined, config.header_excerpt_chars);
        push_sub_chunk(
            &mut sub_chunks,
            format!("{}_header", annex_id),
            SectionType::Header,
            excerpt.to_string(),
            metadata_for(header_lines.len()),
        );
    }

    let region = &lines[table_start..];
    let has_separators = region
        .iter()
        .any(|line| rules.section_separator.is_match(line));

    let sections: Vec<Vec<&str>> = if has_separators {
        let mut sections = Vec::<Vec<&str>>::new();
        for (offset, line) in region.iter().enumerate() {
            if is_note(table_start + offset, line) {
                continue;
            }
            if rules.section_separator.is_match(line) || sections.is_empty() {
                sections.push(Vec::new());
            }
            if let Some(section) = sections.last_mut() {
                section.push(*line);
            }
        }
        sections
    } else {
        let section = region
            .iter()
            .enumerate()
            .take_while(|(offset, line)| !is_note(table_start + offset, line))
            .map(|(_, line)| *line)
            .collect::<Vec<&str>>();
        vec![section]
    };

    let mut table_index = 0usize;
    for section in sections {
        let content = section.join("\n").trim().to_string();
        if content.is_empty() {
            continue;
        }
        table_index += 1;
        let line_count = section.iter().filter(|line| !line.is_empty()).count();
        push_sub_chunk(
            &mut sub_chunks,
            format!("{}_table_{:02}", annex_id, table_index),
            SectionType::TableRows,
            content,
            metadata_for(line_count),
        );
    }

    let note_lines = lines
        .iter()
        .enumerate()
        .filter(|(index, line)| is_note(*index, line))
        .map(|(_, line)| *line)
        .collect::<Vec<&str>>();
    if !note_lines.is_empty() {
        push_sub_chunk(
            &mut sub_chunks,
            format!("{}_note", annex_id),
            SectionType::Note,
            note_lines.join("\n"),
            metadata_for(note_lines.len()),
        );
    }

    let preserved = sub_chunks
        .iter()
        .map(|sub_chunk| sub_chunk.char_count)
        .sum::<usize>();
    let loss_ratio = content_loss_ratio(cleaned_chars, preserved);
    let within_bound = loss_ratio <= config.max_loss_ratio;
    if !within_bound {
        error!(
            annex = annex_id,
            cleaned_chars,
            preserved_chars = preserved,
            loss_ratio,
            max_loss_ratio = config.max_loss_ratio,
            "annex decomposition lost more content than allowed"
        );
    }

    AnnexDecomposition {
        header,
        cleaned_chars,
        cleaned_text: cleaned,
        sub_chunks,
        loss_ratio,
        within_bound,
    }
}

fn push_sub_chunk(
    sub_chunks: &mut Vec<SubChunk>,
    section_id: String,
    section_type: SectionType,
    content: String,
    metadata: SubChunkMetadata,
) {
    let char_count = content.chars().count();
    let order = sub_chunks.len();
    sub_chunks.push(SubChunk {
        section_id,
        section_type,
        content,
        char_count,
        order,
        metadata,
    });
}

pub fn content_loss_ratio(source_chars: usize, preserved_chars: usize) -> f64 {
    if source_chars == 0 {
        return 0.0;
    }

    source_chars.abs_diff(preserved_chars) as f64 / source_chars as f64
}

/// Decomposes every annex of `document` and decides, per annex, whether the
/// assembler falls back to one undivided chunk.
pub fn decompose_annexes(rules: &PatternRules, document: &mut Document, config: &AnnexConfig) {
    for annex in &mut document.annexes {
        let decomposition = split_annex(rules, &annex.annex_no, &annex.body, config);

        if let Some(header) = decomposition.header.as_ref() {
            if !header.title.is_empty() {
                annex.title = header.title.clone();
            }
        }

        let lossy = !decomposition.within_bound;
        annex.fallback_applied = decomposition.sub_chunks.is_empty()
            || (lossy && config.fallback == AnnexFallback::SingleChunk);
        if lossy {
            warn!(
                annex = %annex.annex_no,
                loss_ratio = decomposition.loss_ratio,
                fallback = annex.fallback_applied,
                "annex content loss bound exceeded"
            );
        }

        debug!(
            annex = %annex.annex_no,
            sub_chunks = decomposition.sub_chunks.len(),
            loss_ratio = decomposition.loss_ratio,
            "decomposed annex"
        );
        annex.decomposition = Some(decomposition);
    }
}
