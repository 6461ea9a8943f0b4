use super::*;
use crate::model::ChunkMetadata;

const SAMPLE_STATUTE: &str = "# 테스트법
[시행 2024. 1. 1.] [법률 제100호, 2023. 12. 31., 일부개정]

제1장 총칙
제1조(목적) 이 법은 테스트를 목적으로 한다.
제2조(정의) 이 법에서 사용하는 용어의 뜻은 다음과 같다.
1. \"가\"란 첫째를 말한다.
2. \"나\"란 둘째를 말한다.
제2장 운영
제3조(운영) ① 운영은 다음 각 호에 따른다. <개정 2020. 1. 1.>
1. 첫째 사항
2. 둘째 사항
② 제1항에도 불구하고 예외를 둘 수 있다.
제3조의2(특례) 특례를 둔다.
부칙 <제100호, 2023. 12. 31.>
이 법은 공포한 날부터 시행한다.
[별표 1] 수수료 기준(제3조 관련)
1. 기본 수수료 1,000원
2. 추가 수수료 500원
비고: 수수료는 부가세를 포함한다.";

fn rules() -> PatternRules {
    PatternRules::new().expect("pattern rules should compile")
}

fn article_numbers(document: &Document) -> Vec<String> {
    document
        .articles
        .iter()
        .map(|article| article.number.clone())
        .collect()
}

fn sample_document(rules: &PatternRules) -> Document {
    let normalized = normalize_text(rules, SAMPLE_STATUTE);
    let mut document = build_tree(rules, &normalized.text, None);
    decompose_annexes(rules, &mut document, &AnnexConfig::default());
    document
}

#[test]
fn markdown_headed_articles_build_two_articles_without_chapters() {
    let rules = rules();
    let document = build_tree(
        &rules,
        "### 제1조(목적)\n내용1\n### 제2조(적용범위)\n내용2",
        None,
    );

    assert_eq!(article_numbers(&document), vec!["제1조", "제2조"]);
    assert_eq!(document.articles[0].title, "목적");
    assert_eq!(document.articles[0].body, "내용1");
    assert_eq!(document.articles[1].body, "내용2");
    assert!(document.chapters.is_empty());

    let report = analyze_hierarchy(&rules, &document);
    assert_eq!(report.boundary_cross_bleed_rate, 0.0);
    assert!(report.cross_bleeds.is_empty());
}

#[test]
fn tax_rate_annex_splits_into_header_table_and_note() {
    let rules = rules();
    let mut body = String::from("[별표1] 부가세율표 <제3조 관련>\n");
    for index in 1..=150 {
        body.push_str(&format!("{}. 품목{} 세율 {}%\n", index, index, index % 10));
    }
    body.push_str("* 비고: 세율은 매년 조정될 수 있다.");

    let decomposition = split_annex(&rules, "별표1", &body, &AnnexConfig::default());

    let count = |section_type: SectionType| {
        decomposition
            .sub_chunks
            .iter()
            .filter(|sub_chunk| sub_chunk.section_type == section_type)
            .count()
    };
    assert_eq!(count(SectionType::Header), 1);
    assert!(count(SectionType::TableRows) >= 1);
    assert_eq!(count(SectionType::Note), 1);
    assert!(decomposition.loss_ratio < 0.05);
    assert!(decomposition.within_bound);

    let header = decomposition.header.expect("annex header should parse");
    assert_eq!(header.annex_no, "별표1");
    assert_eq!(header.title, "부가세율표");
    assert_eq!(header.related_article.as_deref(), Some("제3조"));
    assert_eq!(decomposition.sub_chunks[0].section_id, "별표1_header");
    assert_eq!(decomposition.sub_chunks[1].section_id, "별표1_table_01");
    assert_eq!(
        decomposition
            .sub_chunks
            .last()
            .map(|sub_chunk| sub_chunk.section_id.as_str()),
        Some("별표1_note")
    );
}

#[test]
fn repeated_article_header_keeps_first_occurrence_only() {
    let rules = rules();
    let document = build_tree(&rules, "제1조(목적) 첫 번째 본문\n제1조(목적) 중복 본문", None);

    assert_eq!(document.articles.len(), 1);
    assert_eq!(document.articles[0].number, "제1조");
    assert!(document.articles[0].body.starts_with("첫 번째 본문"));
}

#[test]
fn dropped_article_fails_dual_qa_with_missing_number() {
    let rules = rules();
    let reference = (1..=10)
        .map(|number| format!("제{}조(조문{}) 내용이다.", number, number))
        .collect::<Vec<String>>()
        .join("\n");
    let processed = (1..=10)
        .filter(|number| *number != 7)
        .map(|number| format!("제{}조(조문{}) 내용이다.", number, number))
        .collect::<Vec<String>>()
        .join("\n");

    let report = run_dual_qa(
        &rules,
        &reference,
        &processed,
        QaSource::Vlm,
        &QaConfig::default(),
    );

    assert_eq!(report.mode, QaMode::Articles);
    assert_eq!(report.reference_count, 10);
    assert_eq!(report.processed_count, 9);
    assert!((report.match_rate - 0.9).abs() < 1e-9);
    assert_eq!(report.missing_in_processed, vec!["제7조"]);
    assert!(report.extra_in_processed.is_empty());
    assert!(!report.is_pass);
}

#[test]
fn headerless_long_reference_switches_to_annex_coverage() {
    let rules = rules();
    let reference = "가".repeat(2_000);
    let processed = "가".repeat(1_950);

    let report = run_dual_qa(
        &rules,
        &reference,
        &processed,
        QaSource::StructuralParse,
        &QaConfig::default(),
    );

    assert_eq!(report.mode, QaMode::Annex);
    let coverage = report.text_coverage.expect("annex mode reports coverage");
    assert!((coverage - 0.975).abs() < 1e-9);
    assert!(report.is_pass);
}

#[test]
fn short_headerless_reference_stays_in_article_mode_and_fails() {
    let rules = rules();
    let report = run_dual_qa(
        &rules,
        "짧은 참조",
        "짧은 참조",
        QaSource::Vlm,
        &QaConfig::default(),
    );

    assert_eq!(report.mode, QaMode::Articles);
    assert_eq!(report.text_coverage, None);
    assert!(!report.is_pass);
}

#[test]
fn qa_sets_are_in_natural_article_order_and_loose_mentions_are_diagnostic() {
    let rules = rules();
    let reference = "제10조(열) 제2조에 따른다.\n제2조(둘) 내용\n제2조의2(둘의둘) 내용";
    let processed = "제2조(둘) 내용\n제2조의2(둘의둘) 내용\n제10조(열) 내용";

    let report = run_dual_qa(
        &rules,
        reference,
        processed,
        QaSource::Vlm,
        &QaConfig::default(),
    );

    assert_eq!(report.matched, vec!["제2조", "제2조의2", "제10조"]);
    assert_eq!(report.loose_reference_count, 3);
    assert!(report.is_pass);
}

#[test]
fn sample_statute_recovers_chapters_clauses_items_and_trailing_regions() {
    let rules = rules();
    let document = sample_document(&rules);

    assert_eq!(document.title, "테스트법");
    assert_eq!(
        article_numbers(&document),
        vec!["제1조", "제2조", "제3조", "제3조의2"]
    );
    assert_eq!(document.chapters.len(), 2);
    assert_eq!(document.articles[1].chapter_number.as_deref(), Some("제1장"));
    assert_eq!(document.articles[2].chapter_number.as_deref(), Some("제2장"));
    assert!(!document.articles[1].body.contains("제2장"));

    let article_three = &document.articles[2];
    assert_eq!(article_three.clauses.len(), 2);
    let first_clause = document
        .clause(article_three.clauses[0])
        .expect("first clause should exist");
    assert_eq!(first_clause.number, "1");
    assert_eq!(first_clause.items.len(), 2);

    let definitions = &document.articles[1];
    let implicit = document
        .clause(definitions.clauses[0])
        .expect("implicit clause should exist");
    assert!(implicit.implicit);
    assert_eq!(implicit.body, "이 법에서 사용하는 용어의 뜻은 다음과 같다.");
    assert_eq!(document.items_of(definitions), 2);

    assert_eq!(document.amendment_history.len(), 1);
    assert_eq!(
        document.amendment_history[0].dates,
        vec!["2024.01.01", "2023.12.31"]
    );

    let addenda = document.addenda.as_ref().expect("addenda should be found");
    assert!(addenda.body.starts_with("부칙"));
    assert_eq!(document.annexes.len(), 1);
    assert_eq!(document.annexes[0].annex_no, "별표1");
    assert_eq!(document.annexes[0].title, "수수료 기준");
    assert!(!document.annexes[0].fallback_applied);

    let report = analyze_hierarchy(&rules, &document);
    assert_eq!(report.hierarchy_preservation_rate, 1.0);
    assert_eq!(report.empty_article_rate, 0.0);
    assert!(report.integrity_errors.is_empty());
}

#[test]
fn chapter_chunk_precedes_its_first_article() {
    let rules = rules();
    let document = sample_document(&rules);
    let chunks = assemble_chunks(&document);

    let types = chunks
        .iter()
        .map(|chunk| chunk.chunk_type())
        .collect::<Vec<&str>>();
    assert_eq!(
        types,
        vec![
            "title",
            "amendment_history",
            "chapter",
            "article",
            "article",
            "chapter",
            "article",
            "article",
            "addenda",
            "annex_header",
            "annex_table_rows",
            "annex_note",
        ]
    );

    let position_of = |reference: &str| {
        chunks
            .iter()
            .position(|chunk| chunk.metadata.kind.reference() == Some(reference))
            .expect("reference should be present")
    };
    assert_eq!(position_of("제2장") + 1, position_of("제3조"));
    assert_eq!(position_of("제1장") + 1, position_of("제1조"));

    for (index, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.metadata.section_order, index);
    }
}

#[test]
fn chapter_without_articles_anchors_before_next_article() {
    let rules = rules();
    let document = build_tree(
        &rules,
        "제1장 총칙\n제1조(목적) 내용이다.\n제2장 빈 장\n제3장 운영\n제2조(운영) 운영한다.\n제4장 끝",
        None,
    );
    let chunks = assemble_chunks(&document);

    let references = chunks
        .iter()
        .filter_map(|chunk| chunk.metadata.kind.reference())
        .collect::<Vec<&str>>();
    assert_eq!(
        references,
        vec!["제1장", "제1조", "제2장", "제3장", "제2조", "제4장"]
    );
    assert_eq!(document.articles[0].body, "내용이다.");
}

#[test]
fn article_numbers_are_unique_after_assembly() {
    let rules = rules();
    let document = build_tree(
        &rules,
        "제1조(목적) 본문\n제2조(정의) 본문\n제1조(목적) 반복\n제3조(기타) 본문",
        None,
    );
    let chunks = assemble_chunks(&document);

    let mut seen = HashSet::new();
    for chunk in &chunks {
        if let ChunkKind::Article { article_number, .. } = &chunk.metadata.kind {
            assert!(seen.insert(article_number.clone()), "duplicate {}", article_number);
        }
    }
    assert_eq!(seen.len(), 3);
}

#[test]
fn markdown_rendition_rebuilds_the_same_articles() {
    let rules = rules();
    let document = sample_document(&rules);

    let markdown = render_markdown(&document);
    let rebuilt = build_tree(&rules, &normalize_text(&rules, &markdown).text, None);

    assert!(markdown.starts_with("# 테스트법\n"));
    assert!(markdown.contains("### 제3조의2(특례)"));
    assert_eq!(article_numbers(&rebuilt), article_numbers(&document));
    assert_eq!(rebuilt.chapters.len(), document.chapters.len());
    assert_eq!(rebuilt.annexes.len(), document.annexes.len());
}

#[test]
fn integrity_validator_reports_every_broken_parent_link() {
    let rules = rules();
    let mut document = sample_document(&rules);
    assert!(validate_integrity(&document).is_empty());

    document.items[0].parent_clause_no = "99".to_string();
    document.clauses[0].parent_article_no = "제42조".to_string();

    let errors = validate_integrity(&document);
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|error| error.contains("parent_clause_no 99")));
    assert!(errors.iter().any(|error| error.contains("parent_article_no 제42조")));
}

#[test]
fn foreign_header_inside_body_counts_as_cross_bleed() {
    let rules = rules();
    let mut document = build_tree(&rules, "제1조(목적) 본문\n제2조(정의) 본문", None);
    document.articles[0].body.push_str(" 제9조(혼입) 잘못 붙은 본문");

    let report = analyze_hierarchy(&rules, &document);
    assert_eq!(report.cross_bleeds.len(), 1);
    assert_eq!(report.cross_bleeds[0].leaked_article_number, "제9조");
    assert_eq!(report.boundary_cross_bleed_rate, 0.5);
}

#[test]
fn amendment_tag_only_body_counts_as_empty() {
    let rules = rules();
    let document = build_tree(
        &rules,
        "제1조(목적) 본문이다.\n제2조(삭제) <개정 2020. 1. 1.>",
        None,
    );

    let report = analyze_hierarchy(&rules, &document);
    assert_eq!(report.empty_articles, vec!["제2조"]);
    assert_eq!(report.empty_article_rate, 0.5);
}

#[test]
fn annex_decomposition_preserves_content_within_bound() {
    let rules = rules();
    let document = sample_document(&rules);
    let decomposition = document.annexes[0]
        .decomposition
        .as_ref()
        .expect("annex should be decomposed");

    assert!(decomposition.loss_ratio <= 0.05);
    let preserved = decomposition
        .sub_chunks
        .iter()
        .map(|sub_chunk| sub_chunk.char_count)
        .sum::<usize>();
    assert!(preserved <= decomposition.cleaned_chars);
}

#[test]
fn lossy_annex_falls_back_to_single_chunk_by_default() {
    let rules = rules();
    let text = format!(
        "제1조(목적) 본문이다.\n[별표 2] 서식\n{}",
        "신청인이 작성하는 설명 문장 ".repeat(40)
    );

    let mut document = build_tree(&rules, &text, None);
    decompose_annexes(&rules, &mut document, &AnnexConfig::default());
    assert!(document.annexes[0].fallback_applied);

    let chunks = assemble_chunks(&document);
    let annex_chunks = chunks
        .iter()
        .filter(|chunk| chunk.metadata.boundary == Boundary::Annex)
        .collect::<Vec<&Chunk>>();
    assert_eq!(annex_chunks.len(), 1);
    assert!(annex_chunks[0].content.starts_with("[별표 2] 서식"));
    match &annex_chunks[0].metadata.kind {
        ChunkKind::Annex { loss_ratio, .. } => {
            assert!(loss_ratio.expect("loss ratio recorded") > 0.05)
        }
        other => panic!("unexpected chunk kind {:?}", other),
    }

    let keep = AnnexConfig {
        fallback: AnnexFallback::KeepSubChunks,
        ..AnnexConfig::default()
    };
    let mut document = build_tree(&rules, &text, None);
    decompose_annexes(&rules, &mut document, &keep);
    assert!(!document.annexes[0].fallback_applied);
}

#[test]
fn annex_cleaning_strips_private_use_and_box_drawing_glyphs() {
    let cleaned = clean_annex_text("\u{f0b7} 항목   하나\n\n\n\u{2502}둘\u{200b}\n");
    assert_eq!(cleaned, "항목 하나\n\n둘");
}

#[test]
fn normalization_removes_page_markers_and_running_headers() {
    let rules = rules();
    let raw = (1..=3)
        .map(|page| format!("테스트법 시행규칙\n본문{} 내용\n- {} -", page, page))
        .collect::<Vec<String>>()
        .join("\n");

    let normalized = normalize_text(&rules, &raw);
    assert_eq!(normalized.text, "본문1 내용\n본문2 내용\n본문3 내용");
    assert_eq!(normalized.stats.page_markers_removed, 3);
    assert_eq!(normalized.stats.edge_lines_removed, 3);
}

#[test]
fn normalization_collapses_blank_runs() {
    let rules = rules();
    let normalized = normalize_text(&rules, "가   \n\n\n\n나\n");
    assert_eq!(normalized.text, "가\n\n나");
    assert_eq!(normalized.stats.blank_runs_collapsed, 1);
}

#[test]
fn sentence_split_ignores_enumerator_and_date_periods() {
    let rules = rules();
    let pieces = split_sentences(&rules, "2020. 1. 1. 시행 1. 첫째이다. 둘째이다.");
    assert_eq!(pieces, vec!["2020. 1. 1. 시행 1. 첫째이다. ", "둘째이다."]);
}

#[test]
fn generic_chunks_respect_sentence_boundaries_and_keep_all_content() {
    let rules = rules();
    let text = "첫 번째 문장입니다. 두 번째 문장입니다. 세 번째 문장입니다. 네 번째 문장입니다.";
    let config = ChunkerConfig {
        target_chars: 25,
        ..ChunkerConfig::default()
    };

    let chunks = chunk_text(&rules, text, DocumentType::Generic, &config);
    assert_eq!(chunks.len(), 2);
    for chunk in &chunks {
        assert!(chunk.content.ends_with('.'), "chunk split mid-sentence: {}", chunk.content);
        assert_eq!(chunk.metadata.boundary, Boundary::Sentence);
    }

    let squash = |value: &str| value.chars().filter(|ch| !ch.is_whitespace()).collect::<String>();
    let joined = chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<String>();
    assert_eq!(squash(&joined), squash(text));
}

#[test]
fn statute_chunks_merge_incomplete_endings_and_sort_by_article() {
    let rules = rules();
    let text = "머리말 문장이다.\n제3조(셋) 셋째 내용이다.\n제1조(하나) 다음 각 호의\n제2조의2(둘) 내용이다.";

    let chunks = chunk_text(&rules, text, DocumentType::Statute, &ChunkerConfig::default());

    let attributed = chunks
        .iter()
        .map(|chunk| match &chunk.metadata.kind {
            ChunkKind::Text {
                article_number,
                merged_from,
                ..
            } => (article_number.clone(), *merged_from),
            other => panic!("unexpected chunk kind {:?}", other),
        })
        .collect::<Vec<(Option<String>, usize)>>();
    assert_eq!(
        attributed,
        vec![
            (Some("제1조".to_string()), 2),
            (Some("제3조".to_string()), 1),
            (None, 1),
        ]
    );
    assert!(chunks[0].content.contains("제2조의2(둘)"));
    for (index, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.metadata.section_order, index);
    }
}

#[test]
fn incomplete_ending_check_only_looks_at_tail_window() {
    let rules = rules();
    assert!(ends_incomplete(&rules, "다음 각 호의 사항 및", 100));
    assert!(ends_incomplete(&rules, "항목 (", 100));
    assert!(!ends_incomplete(&rules, "시행한다.", 100));
}

#[test]
fn processed_sample_passes_quality_and_self_reference_qa() {
    let rules = rules();
    let processed = process_document(
        &rules,
        SAMPLE_STATUTE,
        None,
        DocumentType::Statute,
        Some(ReferenceText {
            text: SAMPLE_STATUTE,
            source: QaSource::StructuralParse,
        }),
        &PipelineConfig::default(),
    );

    assert!(processed.quality.is_pass, "{:?}", processed.quality.regressions);
    assert_eq!(processed.quality.checks.len(), 7);
    assert_eq!(processed.quality.metrics.amendment_capture_rate, 1.0);
    assert_eq!(processed.quality.metrics.article_boundary_f1, 1.0);

    let qa = processed.qa.expect("qa report requested");
    assert!(qa.is_pass);
    assert_eq!(qa.matched.len(), 4);
}

#[test]
fn missed_thresholds_produce_regressions_with_counts() {
    let evidence = QualityEvidence {
        expected_articles: 10,
        detected_articles: 8,
        matched_articles: 8,
        list_items_detected: 4,
        list_items_bound: 4,
        amendment_tags_in_source: 3,
        amendment_tags_in_chunks: 2,
        article_count: 8,
        hierarchy_preservation_rate: 1.0,
        ..QualityEvidence::default()
    };

    let report = evaluate_quality(&evidence);
    assert!(!report.is_pass);
    assert_eq!(report.regressions.len(), 2);
    assert!(report.regressions[0].starts_with("Q-001"));
    assert!(report.regressions[0].contains("expected=10"));
    assert!(report.regressions[1].contains("captured 2 of 3"));
    assert_eq!(
        report
            .checks
            .iter()
            .filter(|check| check.result == "failed")
            .count(),
        2
    );
}

#[test]
fn unstructured_generic_input_falls_back_to_text_chunks() {
    let rules = rules();
    let processed = process_document(
        &rules,
        "공지 사항입니다. 내일은 휴무입니다.",
        Some("안내문"),
        DocumentType::Generic,
        None,
        &PipelineConfig::default(),
    );

    assert!(!processed.document.structured);
    assert_eq!(processed.chunks[0].chunk_type(), "title");
    assert!(processed.chunks[1..]
        .iter()
        .all(|chunk| chunk.chunk_type() == "text"));
    assert!(processed.qa.is_none());
}

#[test]
fn chunk_serializes_with_flat_type_tag_and_round_trips() {
    let chunk = Chunk {
        content: "제1조(목적) 본문".to_string(),
        metadata: ChunkMetadata {
            kind: ChunkKind::Article {
                article_number: "제1조".to_string(),
                article_title: "목적".to_string(),
                chapter_number: None,
                clause_count: 0,
                item_count: 0,
            },
            boundary: Boundary::Article,
            section_order: 3,
        },
    };

    let value = serde_json::to_value(&chunk).expect("chunk should serialize");
    assert_eq!(
        value,
        serde_json::json!({
            "content": "제1조(목적) 본문",
            "metadata": {
                "type": "article",
                "article_number": "제1조",
                "article_title": "목적",
                "chapter_number": null,
                "clause_count": 0,
                "item_count": 0,
                "boundary": "article",
                "section_order": 3
            }
        })
    );

    let decoded: Chunk = serde_json::from_value(value).expect("chunk should deserialize");
    assert_eq!(decoded, chunk);
}

#[test]
fn untitled_headers_need_a_bare_line_or_deletion_marker() {
    let rules = rules();
    let document = build_tree(
        &rules,
        "제1조(목적) 본문이다.\n제2조 삭제 <2020. 1. 1.>\n제1조 관련 설명이 이어진다.\n제3조\n본문이다.",
        None,
    );

    assert_eq!(article_numbers(&document), vec!["제1조", "제2조", "제3조"]);
    assert_eq!(document.articles[1].title, "");
    assert!(document.articles[1].body.starts_with("삭제"));
    assert!(document.articles[1].body.contains("제1조 관련 설명"));
    assert_eq!(document.articles[2].body, "본문이다.");
}

#[test]
fn deleted_articles_count_as_expected_boundaries() {
    let rules = rules();
    let text = "제1조(목적) 이 법은 목적을 정한다.\n제2조 삭제 <2020. 1. 1.>\n제3조 삭제 <2020. 1. 1.>\n제4조(정의) 용어의 뜻은 법령에 따른다.\n부칙\n제5조(경과조치) 종전 규정에 따른다.";
    let processed = process_document(
        &rules,
        text,
        None,
        DocumentType::Statute,
        None,
        &PipelineConfig::default(),
    );

    assert_eq!(
        article_numbers(&processed.document),
        vec!["제1조", "제2조", "제3조", "제4조"]
    );
    let evidence = &processed.quality.evidence;
    assert_eq!(evidence.expected_articles, 4);
    assert_eq!(evidence.detected_articles, 4);
    assert_eq!(evidence.matched_articles, 4);
    assert_eq!(processed.quality.metrics.article_boundary_f1, 1.0);
    assert!(
        !processed
            .quality
            .regressions
            .iter()
            .any(|regression| regression.starts_with("Q-001"))
    );
}

#[test]
fn list_items_glued_into_clause_line_fail_list_binding() {
    let rules = rules();
    let processed = process_document(
        &rules,
        "제1조(정의) ① 용어는 다음과 같다. 1. 가를 말한다. 2. 나를 말한다.\n② 둘째 항.",
        None,
        DocumentType::Statute,
        None,
        &PipelineConfig::default(),
    );

    let evidence = &processed.quality.evidence;
    assert_eq!(evidence.list_items_detected, 2);
    assert_eq!(evidence.list_items_bound, 0);
    assert_eq!(processed.quality.metrics.list_binding_fix_rate, 0.0);
    assert!(
        processed
            .quality
            .regressions
            .iter()
            .any(|regression| regression.starts_with("Q-002") && regression.contains("detected=2"))
    );
}

#[test]
fn prose_section_under_a_separator_is_a_table_false_positive() {
    let rules = rules();
    assert!(!has_row_shape(
        &rules,
        "가. 일반 원칙\n이 표는 다음 원칙에 따라 적용한다.\n세부 사항은 장관이 정한다."
    ));
    assert!(has_row_shape(&rules, "나. 요율\n1. 기본 1,000원\n2. 추가 500원"));

    let processed = process_document(
        &rules,
        "제1조(목적) 본문이다.\n[별표 3] 적용 기준\n가. 일반 원칙\n이 표는 다음 원칙에 따라 적용한다.\n세부 사항은 장관이 정한다.\n나. 요율\n1. 기본 1,000원",
        None,
        DocumentType::Statute,
        None,
        &PipelineConfig::default(),
    );

    let evidence = &processed.quality.evidence;
    assert_eq!(evidence.table_sections, 2);
    assert_eq!(evidence.table_false_positives, 1);
    assert!(
        processed
            .quality
            .regressions
            .iter()
            .any(|regression| regression.starts_with("Q-003"))
    );
}

#[test]
fn bare_header_does_not_take_the_next_line_as_title() {
    let rules = rules();
    let text = "제1조(목적) 본문이다.\n제2조\n[별표 1] 수수료\n1. 기본 1,000원";
    let document = build_tree(&rules, text, None);

    assert_eq!(article_numbers(&document), vec!["제1조", "제2조"]);
    assert_eq!(document.articles[1].title, "");
    assert_eq!(document.articles[1].body, "");
    assert_eq!(document.annexes.len(), 1);
    assert_eq!(document.annexes[0].annex_no, "별표1");
    assert_eq!(extract_article_set(&rules.qa_strict, text), vec!["제1조"]);
}

#[test]
fn section_types_serialize_in_snake_case() {
    assert_eq!(
        serde_json::to_value(SectionType::TableRows).expect("section type serializes"),
        serde_json::json!("table_rows")
    );
    assert_eq!(
        serde_json::to_value(SectionType::Header).expect("section type serializes"),
        serde_json::json!("header")
    );
}
