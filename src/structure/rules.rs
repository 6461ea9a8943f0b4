use super::*;

/// Compiled pattern rules shared read-only by every stage.
///
/// Built once per process and passed by reference; nothing mutates it after
/// construction, so one instance can serve many documents on many threads.
#[derive(Debug)]
pub struct PatternRules {
    pub article_titled: Regex,
    pub article_untitled: Regex,
    pub chapter_heading: Regex,
    pub annex_marker: Regex,
    pub addenda_marker: Regex,
    pub annex_header: Regex,
    pub related_article: Regex,
    pub clause_marker: Regex,
    pub item_marker: Regex,
    pub glued_item_marker: Regex,
    pub amendment_tag: Regex,
    pub amendment_line: Regex,
    pub date: Regex,
    pub page_marker: Regex,
    pub portal_footer: Regex,
    pub section_separator: Regex,
    pub numeric_leading: Regex,
    pub note_line: Regex,
    pub qa_strict: Regex,
    pub qa_loose: Regex,
    pub sentence_end: Regex,
    pub incomplete_ending: Regex,
    pub basic_spirit: Regex,
    pub markdown_heading: Regex,
}

impl PatternRules {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // No line-start anchor: upstream extraction routinely glues headers
            // onto the previous line.
            article_titled: Regex::new(
                r"제[ \t]*(\d+)[ \t]*조(?:[ \t]*의[ \t]*(\d+))?[ \t]*[(（\[][ \t]*([^()（）\[\]\n]{1,80}?)[ \t]*[)）\]]",
            )
            .context("failed to compile titled article header regex")?,
            article_untitled: Regex::new(
                r"(?m)^[ \t#]*(제[ \t]*(\d+)[ \t]*조(?:[ \t]*의[ \t]*(\d+))?)[ \t]*(?:$|삭제|[<\[])",
            )
            .context("failed to compile untitled article header regex")?,
            chapter_heading: Regex::new(
                r"(?m)^[ \t#]*(제[ \t]*(\d+)[ \t]*장(?:[ \t]*의[ \t]*(\d+))?)(?:[ \t]+([^\n]*))?[ \t]*$",
            )
            .context("failed to compile chapter heading regex")?,
            annex_marker: Regex::new(
                r"(?m)^[ \t#*]*\[\s*(별표|별지)\s*(?:제\s*)?(\d+)(?:\s*의\s*(\d+))?\s*(?:호\s*)?(?:서식\s*)?\]",
            )
            .context("failed to compile annex marker regex")?,
            addenda_marker: Regex::new(r"(?m)^[ \t#]*부\s*칙(?:[ \t]*<[^>\n]*>)?[ \t]*$")
                .context("failed to compile addenda marker regex")?,
            annex_header: Regex::new(
                r"\[\s*(별표|별지)\s*(?:제\s*)?(\d+)(?:\s*의\s*(\d+))?\s*(?:호\s*)?(?:서식\s*)?\]\s*([^\n<〈]*)(?:[<〈]\s*([^>〉\n]*)[>〉])?",
            )
            .context("failed to compile annex header regex")?,
            related_article: Regex::new(
                r"(제\s*\d+\s*조(?:\s*의\s*\d+)?)(?:\s*제\s*\d+\s*항)?[^\n()<>〈〉（）]{0,20}?관련",
            )
            .context("failed to compile related article regex")?,
            clause_marker: Regex::new(r"^[ \t]*([\x{2460}-\x{2473}])[ \t]*")
                .context("failed to compile clause marker regex")?,
            item_marker: Regex::new(r"^[ \t]*(\d{1,2})(?:의(\d{1,2}))?\.[ \t]+")
                .context("failed to compile item marker regex")?,
            // An item marker left on the previous sentence's line.
            glued_item_marker: Regex::new(r"(?:다\.|[:：])[ \t]+\d{1,2}(?:의\d{1,2})?\.[ \t]+")
                .context("failed to compile glued item marker regex")?,
            amendment_tag: Regex::new(
                r"<\s*(?:개정|신설|전문개정|본조신설|삭제)[^>\n]*>|\[\s*(?:본조신설|전문개정|제목개정|본조개정|종전)[^\]\n]*\]",
            )
            .context("failed to compile amendment tag regex")?,
            amendment_line: Regex::new(r"시행|제정|개정|일부개정|전부개정|타법개정")
                .context("failed to compile amendment line regex")?,
            date: Regex::new(r"(\d{4})\s*\.\s*(\d{1,2})\s*\.\s*(\d{1,2})\s*\.?")
                .context("failed to compile date regex")?,
            page_marker: Regex::new(
                r"(?i)^\s*(?:-{2,}\s*page\s*\d+\s*-{2,}|<!--\s*page[^>]*-->|-\s*\d+\s*-|page\s+\d+(?:\s*(?:/|of)\s*\d+)?|\d+\s*/\s*\d+)\s*$",
            )
            .context("failed to compile page marker regex")?,
            portal_footer: Regex::new(r"^\s*법제처\s+\d+\s+국가법령정보센터\s*$")
                .context("failed to compile portal footer regex")?,
            section_separator: Regex::new(
                r"^\s*(?:[ⅠⅡⅢⅣⅤⅥⅦⅧⅨⅩ]+\s*[.．]|[가나다라마바사아자차카타파하]\s*[.．]|■|【[^】\n]+】)",
            )
            .context("failed to compile annex section separator regex")?,
            numeric_leading: Regex::new(r"^\s*\d").context("failed to compile numeric line regex")?,
            note_line: Regex::new(r"^\s*(?:\*(?:[ \t]|$)|※|비고|주\s*\d*\s*[)）:])")
                .context("failed to compile note line regex")?,
            qa_strict: Regex::new(r"제[ \t]*(\d+)[ \t]*조(?:[ \t]*의[ \t]*(\d+))?[ \t]*[(（\[]")
                .context("failed to compile strict qa header regex")?,
            qa_loose: Regex::new(r"제[ \t]*(\d+)[ \t]*조(?:[ \t]*의[ \t]*(\d+))?")
                .context("failed to compile loose qa header regex")?,
            sentence_end: Regex::new(r"[.!?。][\x22'”’)\]]*(?:\s+|$)|[다요][ \t]*\n+")
                .context("failed to compile sentence boundary regex")?,
            incomplete_ending: Regex::new(
                r"(?:,|및|또는|그리고|하며|하고|이며|으며|에 따라|의|\(|:|·|ㆍ)\s*$",
            )
            .context("failed to compile incomplete ending regex")?,
            basic_spirit: Regex::new(r"기본\s*정신|기본\s*이념")
                .context("failed to compile basic spirit regex")?,
            markdown_heading: Regex::new(r"^#{1,6}\s+(.+)$")
                .context("failed to compile markdown heading regex")?,
        })
    }
}

pub fn parse_article_number(main: Option<&str>, sub: Option<&str>) -> Option<ArticleNumber> {
    let main = main?.parse::<u32>().ok()?;
    let sub = match sub {
        Some(value) => Some(value.parse::<u32>().ok()?),
        None => None,
    };

    Some(ArticleNumber::new(main, sub))
}

/// Normalizes a captured `yyyy. m. d.` date into `yyyy.mm.dd`.
pub fn normalize_date(captures: &regex::Captures<'_>) -> Option<String> {
    let year = captures.get(1)?.as_str().parse::<u32>().ok()?;
    let month = captures.get(2)?.as_str().parse::<u32>().ok()?;
    let day = captures.get(3)?.as_str().parse::<u32>().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    Some(format!("{year:04}.{month:02}.{day:02}"))
}

pub fn collect_dates(rules: &PatternRules, text: &str) -> Vec<String> {
    let mut dates = Vec::new();
    for captures in rules.date.captures_iter(text) {
        if let Some(date) = normalize_date(&captures) {
            if !dates.contains(&date) {
                dates.push(date);
            }
        }
    }
    dates
}

pub fn circled_numeral_value(ch: char) -> Option<u32> {
    let code = ch as u32;
    if (0x2460..=0x2473).contains(&code) {
        Some(code - 0x2460 + 1)
    } else {
        None
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
