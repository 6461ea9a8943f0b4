use super::*;

/// Orders a built tree into retrieval chunks.
///
/// The first pass indexes chapters by the arena index of the article they
/// are displayed before; the second walks the article arena once and emits
/// anchored chapters ahead of each article. Trailing regions (addenda and
/// annexes) follow in source position order.
pub fn assemble_chunks(document: &Document) -> Vec<Chunk> {
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

    if !document.amendment_history.is_empty() {
        let dates = document
            .amendment_history
            .iter()
            .flat_map(|record| record.dates.iter().cloned())
            .collect::<Vec<String>>();
        let content = document
            .amendment_history
            .iter()
            .map(|record| record.raw.as_str())
            .collect::<Vec<&str>>()
            .join("\n");
        chunks.push(Chunk::new(
            ChunkKind::AmendmentHistory {
                entries: document.amendment_history.len(),
                dates,
            },
            Boundary::Preamble,
            content,
        ));
    }

    if let Some(spirit) = document.basic_spirit.as_deref() {
        chunks.push(Chunk::new(
            ChunkKind::BasicSpirit,
            Boundary::Preamble,
            spirit.to_string(),
        ));
    }

    let anchors = chapter_anchors(document);
    for article in &document.articles {
        if let Some(chapters) = anchors.get(&article.order) {
            chunks.extend(chapters.iter().map(|chapter| chapter_chunk(chapter)));
        }
        chunks.push(article_chunk(document, article));
    }
    if let Some(trailing) = anchors.get(&document.articles.len()) {
        chunks.extend(trailing.iter().map(|chapter| chapter_chunk(chapter)));
    }

    let mut trailing = Vec::<(usize, Vec<Chunk>)>::new();
    if let Some(addenda) = document.addenda.as_ref() {
        trailing.push((
            addenda.position,
            vec![Chunk::new(ChunkKind::Addenda, Boundary::Addenda, addenda.body.clone())],
        ));
    }
    for annex in &document.annexes {
        trailing.push((annex.position, annex_chunks(annex)));
    }
    trailing.sort_by_key(|(position, _)| *position);
    chunks.extend(trailing.into_iter().flat_map(|(_, group)| group));

    renumber_section_order(&mut chunks);
    chunks
}

/// `article arena index -> chapters displayed right before it`. Index
/// `articles.len()` collects chapters that precede no article at all.
fn chapter_anchors(document: &Document) -> BTreeMap<usize, Vec<&Chapter>> {
    let first_article_of = document
        .articles
        .iter()
        .rev()
        .filter_map(|article| {
            article
                .chapter_number
                .as_deref()
                .map(|number| (number, article.order))
        })
        .collect::<HashMap<&str, usize>>();

    let mut anchors = BTreeMap::<usize, Vec<&Chapter>>::new();
    for chapter in &document.chapters {
        let anchor = first_article_of
            .get(chapter.number.as_str())
            .copied()
            .unwrap_or(chapter.order)
            .min(document.articles.len());
        anchors.entry(anchor).or_default().push(chapter);
    }
    for chapters in anchors.values_mut() {
        chapters.sort_by_key(|chapter| chapter.position);
    }

    anchors
}

fn chapter_chunk(chapter: &Chapter) -> Chunk {
    let content = if chapter.title.is_empty() {
        chapter.number.clone()
    } else {
        format!("{} {}", chapter.number, chapter.title)
    };

    Chunk::new(
        ChunkKind::Chapter {
            chapter_number: chapter.number.clone(),
            chapter_title: chapter.title.clone(),
        },
        Boundary::Chapter,
        content,
    )
}

fn article_chunk(document: &Document, article: &Article) -> Chunk {
    let content = if article.body.is_empty() {
        article.header()
    } else {
        format!("{}\n{}", article.header(), article.body)
    };

    Chunk::new(
        ChunkKind::Article {
            article_number: article.number.clone(),
            article_title: article.title.clone(),
            chapter_number: article.chapter_number.clone(),
            clause_count: article.clauses.len(),
            item_count: document.items_of(article),
        },
        Boundary::Article,
        content,
    )
}

fn annex_chunks(annex: &Annex) -> Vec<Chunk> {
    let Some(decomposition) = annex.decomposition.as_ref() else {
        return vec![single_annex_chunk(annex, None, annex.body.clone())];
    };

    if annex.fallback_applied {
        let content = if decomposition.cleaned_text.is_empty() {
            annex.body.clone()
        } else {
            decomposition.cleaned_text.clone()
        };
        return vec![single_annex_chunk(
            annex,
            Some(decomposition.loss_ratio),
            content,
        )];
    }

    decomposition
        .sub_chunks
        .iter()
        .map(|sub_chunk| {
            let metadata = &sub_chunk.metadata;
            let kind = match sub_chunk.section_type {
                SectionType::Header => ChunkKind::AnnexHeader {
                    annex_no: metadata.annex_no.clone(),
                    annex_title: metadata.annex_title.clone(),
                    section_id: sub_chunk.section_id.clone(),
                    related_article: metadata.related_article.clone(),
                    amendment_dates: metadata.amendment_dates.clone(),
                },
                SectionType::TableRows => ChunkKind::AnnexTableRows {
                    annex_no: metadata.annex_no.clone(),
                    section_id: sub_chunk.section_id.clone(),
                    line_count: metadata.line_count,
                },
                SectionType::Note => ChunkKind::AnnexNote {
                    annex_no: metadata.annex_no.clone(),
                    section_id: sub_chunk.section_id.clone(),
                    line_count: metadata.line_count,
                },
            };
            Chunk::new(kind, Boundary::AnnexSection, sub_chunk.content.clone())
        })
        .collect()
}

fn single_annex_chunk(annex: &Annex, loss_ratio: Option<f64>, content: String) -> Chunk {
    Chunk::new(
        ChunkKind::Annex {
            annex_no: annex.annex_no.clone(),
            annex_title: annex.title.clone(),
            loss_ratio,
        },
        Boundary::Annex,
        content,
    )
}
