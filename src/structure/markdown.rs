use super::*;

/// Reconstructs a Markdown rendition of the tree. Building a tree from the
/// output yields the same article numbers in the same order.
pub fn render_markdown(document: &Document) -> String {
    let mut blocks = Vec::<String>::new();

    if !document.title.is_empty() {
        blocks.push(format!("# {}", document.title));
    }
    if !document.amendment_history.is_empty() {
        blocks.push(
            document
                .amendment_history
                .iter()
                .map(|record| record.raw.as_str())
                .collect::<Vec<&str>>()
                .join("\n"),
        );
    }
    if let Some(spirit) = document.basic_spirit.as_deref() {
        blocks.push(spirit.to_string());
    }

    for node in document.walk() {
        match node {
            Node::Chapter(chapter) => {
                let heading = if chapter.title.is_empty() {
                    format!("## {}", chapter.number)
                } else {
                    format!("## {} {}", chapter.number, chapter.title)
                };
                blocks.push(heading);
            }
            Node::Article(article) => {
                let mut block = format!("### {}", article.header());
                if !article.body.is_empty() {
                    block.push('\n');
                    block.push_str(&article.body);
                }
                blocks.push(block);
            }
            Node::Clause(_) | Node::Item(_) => {}
        }
    }

    // Chapters that hold no article are not reached by the walk.
    let orphan_chapters = document
        .chapters
        .iter()
        .filter(|chapter| {
            !document
                .articles
                .iter()
                .any(|article| article.chapter_number.as_deref() == Some(chapter.number.as_str()))
        })
        .count();
    if orphan_chapters > 0 {
        debug!(
            chapters = orphan_chapters,
            "skipped chapters without articles in markdown rendition"
        );
    }

    let mut trailing = Vec::<(usize, String)>::new();
    if let Some(addenda) = document.addenda.as_ref() {
        trailing.push((addenda.position, addenda.body.clone()));
    }
    for annex in &document.annexes {
        trailing.push((annex.position, format!("## {}", annex.body)));
    }
    trailing.sort_by_key(|(position, _)| *position);
    blocks.extend(trailing.into_iter().map(|(_, block)| block));

    let mut rendered = blocks.join("\n\n");
    rendered.push('\n');
    rendered
}
