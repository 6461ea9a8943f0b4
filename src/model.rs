use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClauseId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub usize);

/// Ordinal of an article header: `제5조` is `(5, None)`, `제5조의2` is `(5, Some(2))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArticleNumber {
    pub main: u32,
    pub sub: Option<u32>,
}

impl ArticleNumber {
    pub fn new(main: u32, sub: Option<u32>) -> Self {
        Self { main, sub }
    }
}

impl fmt::Display for ArticleNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub {
            Some(sub) => write!(f, "제{}조의{}", self.main, sub),
            None => write!(f, "제{}조", self.main),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub number: String,
    pub title: String,
    pub order: usize,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub number: String,
    pub ordinal: ArticleNumber,
    pub title: String,
    pub body: String,
    pub chapter_number: Option<String>,
    pub order: usize,
    pub position: usize,
    pub clauses: Vec<ClauseId>,
}

impl Article {
    /// Header line as it appears in reconstructed text, e.g. `제5조(목적)`.
    pub fn header(&self) -> String {
        if self.title.is_empty() {
            self.number.clone()
        } else {
            format!("{}({})", self.number, self.title)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub id: ClauseId,
    pub article: ArticleId,
    pub parent_article_no: String,
    pub number: String,
    pub label: String,
    pub body: String,
    /// Created to hold items that appear before any circled-numeral marker.
    pub implicit: bool,
    pub items: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub clause: ClauseId,
    pub parent_article_no: String,
    pub parent_clause_no: String,
    pub number: String,
    pub label: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendmentRecord {
    pub raw: String,
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Header,
    TableRows,
    Note,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnexHeader {
    pub annex_no: String,
    pub title: String,
    pub related_article: Option<String>,
    pub amendment_dates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubChunkMetadata {
    pub annex_no: String,
    pub annex_title: String,
    pub related_article: Option<String>,
    pub amendment_dates: Vec<String>,
    pub line_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubChunk {
    pub section_id: String,
    pub section_type: SectionType,
    pub content: String,
    pub char_count: usize,
    pub order: usize,
    pub metadata: SubChunkMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnexDecomposition {
    pub header: Option<AnnexHeader>,
    pub cleaned_text: String,
    pub cleaned_chars: usize,
    pub sub_chunks: Vec<SubChunk>,
    pub loss_ratio: f64,
    pub within_bound: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annex {
    pub annex_no: String,
    pub title: String,
    pub position: usize,
    pub body: String,
    pub decomposition: Option<AnnexDecomposition>,
    pub fallback_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Addenda {
    pub position: usize,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    /// False when no article or annex marker was found at all.
    pub structured: bool,
    pub chapters: Vec<Chapter>,
    pub articles: Vec<Article>,
    pub clauses: Vec<Clause>,
    pub items: Vec<Item>,
    pub annexes: Vec<Annex>,
    pub addenda: Option<Addenda>,
    pub amendment_history: Vec<AmendmentRecord>,
    pub basic_spirit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    Chapter(&'a Chapter),
    Article(&'a Article),
    Clause(&'a Clause),
    Item(&'a Item),
}

impl Document {
    pub fn article(&self, id: ArticleId) -> Option<&Article> {
        self.articles.get(id.0)
    }

    pub fn clause(&self, id: ClauseId) -> Option<&Clause> {
        self.clauses.get(id.0)
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.0)
    }

    pub fn items_of(&self, article: &Article) -> usize {
        article
            .clauses
            .iter()
            .filter_map(|id| self.clause(*id))
            .map(|clause| clause.items.len())
            .sum()
    }

    /// Depth-first walk in reading order; chapters are emitted before the
    /// first article they contain.
    pub fn walk(&self) -> Vec<Node<'_>> {
        let mut nodes = Vec::new();
        let mut emitted_chapters = Vec::<&str>::new();

        for article in &self.articles {
            if let Some(chapter_number) = article.chapter_number.as_deref() {
                if !emitted_chapters.contains(&chapter_number) {
                    if let Some(chapter) = self
                        .chapters
                        .iter()
                        .find(|chapter| chapter.number == chapter_number)
                    {
                        nodes.push(Node::Chapter(chapter));
                    }
                    emitted_chapters.push(chapter_number);
                }
            }

            nodes.push(Node::Article(article));
            for clause in article.clauses.iter().filter_map(|id| self.clause(*id)) {
                nodes.push(Node::Clause(clause));
                for item in clause.items.iter().filter_map(|id| self.item(*id)) {
                    nodes.push(Node::Item(item));
                }
            }
        }

        nodes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    Preamble,
    Chapter,
    Article,
    Addenda,
    AnnexSection,
    Annex,
    ArticleMarker,
    Sentence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChunkKind {
    Title {
        title: String,
    },
    AmendmentHistory {
        entries: usize,
        dates: Vec<String>,
    },
    BasicSpirit,
    Chapter {
        chapter_number: String,
        chapter_title: String,
    },
    Article {
        article_number: String,
        article_title: String,
        chapter_number: Option<String>,
        clause_count: usize,
        item_count: usize,
    },
    Addenda,
    AnnexHeader {
        annex_no: String,
        annex_title: String,
        section_id: String,
        related_article: Option<String>,
        amendment_dates: Vec<String>,
    },
    AnnexTableRows {
        annex_no: String,
        section_id: String,
        line_count: usize,
    },
    AnnexNote {
        annex_no: String,
        section_id: String,
        line_count: usize,
    },
    Annex {
        annex_no: String,
        annex_title: String,
        loss_ratio: Option<f64>,
    },
    Text {
        chunk_index: usize,
        article_number: Option<String>,
        article_title: Option<String>,
        merged_from: usize,
    },
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Title { .. } => "title",
            ChunkKind::AmendmentHistory { .. } => "amendment_history",
            ChunkKind::BasicSpirit => "basic_spirit",
            ChunkKind::Chapter { .. } => "chapter",
            ChunkKind::Article { .. } => "article",
            ChunkKind::Addenda => "addenda",
            ChunkKind::AnnexHeader { .. } => "annex_header",
            ChunkKind::AnnexTableRows { .. } => "annex_table_rows",
            ChunkKind::AnnexNote { .. } => "annex_note",
            ChunkKind::Annex { .. } => "annex",
            ChunkKind::Text { .. } => "text",
        }
    }

    /// Stable reference label used for storage keys and log fields.
    pub fn reference(&self) -> Option<&str> {
        match self {
            ChunkKind::Chapter { chapter_number, .. } => Some(chapter_number),
            ChunkKind::Article { article_number, .. } => Some(article_number),
            ChunkKind::AnnexHeader { section_id, .. }
            | ChunkKind::AnnexTableRows { section_id, .. }
            | ChunkKind::AnnexNote { section_id, .. } => Some(section_id),
            ChunkKind::Annex { annex_no, .. } => Some(annex_no),
            ChunkKind::Text { article_number, .. } => article_number.as_deref(),
            ChunkKind::Title { .. }
            | ChunkKind::AmendmentHistory { .. }
            | ChunkKind::BasicSpirit
            | ChunkKind::Addenda => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(flatten)]
    pub kind: ChunkKind,
    pub boundary: Boundary,
    pub section_order: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(kind: ChunkKind, boundary: Boundary, content: String) -> Self {
        Self {
            content,
            metadata: ChunkMetadata {
                kind,
                boundary,
                section_order: 0,
            },
        }
    }

    pub fn chunk_type(&self) -> &'static str {
        self.metadata.kind.as_str()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentRunEntry {
    pub input_path: String,
    pub doc_id: String,
    pub sha256: String,
    pub structured: bool,
    pub article_count: usize,
    pub chapter_count: usize,
    pub annex_count: usize,
    pub chunk_count: usize,
    pub quality_pass: bool,
    pub qa_pass: Option<bool>,
    pub regressions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub output_dir: String,
    pub db_path: Option<String>,
    pub documents: Vec<DocumentRunEntry>,
    pub notes: Vec<String>,
}
