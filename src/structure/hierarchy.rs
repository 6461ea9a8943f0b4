use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Article,
    Clause,
    Item,
}

pub const EXPECTED_LAYERS: [Layer; 3] = [Layer::Article, Layer::Clause, Layer::Item];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossBleed {
    pub article_number: String,
    pub leaked_article_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchyReport {
    pub article_count: usize,
    pub clause_count: usize,
    pub item_count: usize,
    pub detected_layers: Vec<Layer>,
    pub hierarchy_preservation_rate: f64,
    pub boundary_cross_bleed_rate: f64,
    pub cross_bleeds: Vec<CrossBleed>,
    pub empty_article_rate: f64,
    pub empty_articles: Vec<String>,
    pub integrity_errors: Vec<String>,
}

/// Computes structural health metrics over a built tree. Never fails; a
/// malformed tree simply produces a worse report.
pub fn analyze_hierarchy(rules: &PatternRules, document: &Document) -> HierarchyReport {
    let detected = document
        .walk()
        .iter()
        .filter_map(|node| match node {
            Node::Article(_) => Some(Layer::Article),
            Node::Clause(_) => Some(Layer::Clause),
            Node::Item(_) => Some(Layer::Item),
            Node::Chapter(_) => None,
        })
        .collect::<HashSet<Layer>>();

    let preserved = EXPECTED_LAYERS
        .iter()
        .filter(|layer| detected.contains(*layer))
        .count();
    let hierarchy_preservation_rate = preserved as f64 / EXPECTED_LAYERS.len() as f64;

    let mut detected_layers = detected.into_iter().collect::<Vec<Layer>>();
    detected_layers.sort();

    let cross_bleeds = find_cross_bleeds(rules, document);
    let bleeding_articles = cross_bleeds
        .iter()
        .map(|bleed| bleed.article_number.as_str())
        .collect::<HashSet<&str>>()
        .len();

    let empty_articles = document
        .articles
        .iter()
        .filter(|article| !has_substantive_body(rules, &article.body))
        .map(|article| article.number.clone())
        .collect::<Vec<String>>();

    let article_count = document.articles.len();

    HierarchyReport {
        article_count,
        clause_count: document.clauses.len(),
        item_count: document.items.len(),
        detected_layers,
        hierarchy_preservation_rate,
        boundary_cross_bleed_rate: ratio(bleeding_articles, article_count),
        cross_bleeds,
        empty_article_rate: ratio(empty_articles.len(), article_count),
        empty_articles,
        integrity_errors: validate_integrity(document),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Articles whose body carries a titled header for another article number.
pub fn find_cross_bleeds(rules: &PatternRules, document: &Document) -> Vec<CrossBleed> {
    let mut bleeds = Vec::new();

    for article in &document.articles {
        let mut reported = HashSet::<ArticleNumber>::new();
        for captures in rules.article_titled.captures_iter(&article.body) {
            let Some(ordinal) = parse_article_number(
                captures.get(1).map(|value| value.as_str()),
                captures.get(2).map(|value| value.as_str()),
            ) else {
                continue;
            };
            if ordinal == article.ordinal || !reported.insert(ordinal) {
                continue;
            }

            bleeds.push(CrossBleed {
                article_number: article.number.clone(),
                leaked_article_number: ordinal.to_string(),
            });
        }
    }

    bleeds
}

pub fn has_substantive_body(rules: &PatternRules, body: &str) -> bool {
    rules
        .amendment_tag
        .replace_all(body, "")
        .chars()
        .any(char::is_alphanumeric)
}

/// Checks every clause and item parent reference, reporting each mismatch.
pub fn validate_integrity(document: &Document) -> Vec<String> {
    let mut errors = Vec::new();

    for article in &document.articles {
        for clause_id in &article.clauses {
            match document.clause(*clause_id) {
                Some(clause) if clause.article != article.id => errors.push(format!(
                    "article {} lists clause {} owned by article id {}",
                    article.number, clause.number, clause.article.0
                )),
                Some(_) => {}
                None => errors.push(format!(
                    "article {} references missing clause id {}",
                    article.number, clause_id.0
                )),
            }
        }
    }

    for clause in &document.clauses {
        let Some(article) = document.article(clause.article) else {
            errors.push(format!(
                "clause {} (id {}) references missing article id {}",
                clause.number, clause.id.0, clause.article.0
            ));
            continue;
        };

        if clause.parent_article_no != article.number {
            errors.push(format!(
                "clause {} (id {}) parent_article_no {} does not match enclosing article {}",
                clause.number, clause.id.0, clause.parent_article_no, article.number
            ));
        }
    }

    for item in &document.items {
        let Some(clause) = document.clause(item.clause) else {
            errors.push(format!(
                "item {} (id {}) references missing clause id {}",
                item.number, item.id.0, item.clause.0
            ));
            continue;
        };

        if item.parent_clause_no != clause.number {
            errors.push(format!(
                "item {} (id {}) parent_clause_no {} does not match enclosing clause {}",
                item.number, item.id.0, item.parent_clause_no, clause.number
            ));
        }

        let article_number = document
            .article(clause.article)
            .map(|article| article.number.as_str())
            .unwrap_or(clause.parent_article_no.as_str());
        if item.parent_article_no != article_number {
            errors.push(format!(
                "item {} (id {}) parent_article_no {} does not match enclosing article {}",
                item.number, item.id.0, item.parent_article_no, article_number
            ));
        }
    }

    errors
}
