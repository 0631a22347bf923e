//! Pure text helpers shared by the chunker, the artifact builder and retrieval.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::types::SourceType;

/// Keywords kept per chunk.
pub const MAX_KEYWORDS: usize = 30;

const STOP_WORDS: &[&str] = &[
    "about", "after", "again", "against", "because", "before", "being", "between", "could",
    "doing", "every", "first", "from", "have", "just", "more", "should", "their", "there",
    "these", "they", "this", "through", "what", "when", "where", "with", "would", "your", "that",
    "than", "then", "them", "also", "been", "were", "will", "into", "only", "other", "some",
    "such", "each", "which", "does", "most", "very",
];

/// Book name, chapter, optional verse and optional range.
static SCRIPTURE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:1|2|3|I|II|III)\s+)?(?:Gen(?:esis)?|Exod(?:us)?|Lev(?:iticus)?|Num(?:bers)?|Deut(?:eronomy)?|Josh(?:ua)?|Judg(?:es)?|Ruth|(?:1|2)\s*Sam(?:uel)?|(?:1|2)\s*Kgs?|(?:1|2)\s*Chr(?:on)?|Ezra|Neh(?:emiah)?|Esth(?:er)?|Job|Ps(?:alm)?s?|Prov(?:erbs)?|Eccl(?:es)?|Song|Isa(?:iah)?|Jer(?:emiah)?|Lam(?:entations)?|Ezek(?:iel)?|Dan(?:iel)?|Hos(?:ea)?|Joel|Amos|Obad(?:iah)?|Jon(?:ah)?|Mic(?:ah)?|Nah(?:um)?|Hab(?:akkuk)?|Zeph(?:aniah)?|Hag(?:gai)?|Zech(?:ariah)?|Mal(?:achi)?|Matt(?:hew)?|Mark|Luke|John|Acts|Rom(?:ans)?|(?:1|2)\s*Cor(?:inthians)?|Gal(?:atians)?|Eph(?:esians)?|Phil(?:ippians)?|Col(?:ossians)?|(?:1|2)\s*Thess(?:alonians)?|(?:1|2)\s*Tim(?:othy)?|Tit(?:us)?|Phlm|Philemon|Heb(?:rews)?|Jas|James|(?:1|2)\s*Pet(?:er)?|(?:1|2|3)\s*Jn|Jude|Rev(?:elation)?)\s+\d+(?:[:.]\d+)?(?:\s*[-–]\s*\d+)?",
    )
    .expect("citation pattern compiles")
});

static MARKDOWN_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,4}\s").expect("heading pattern compiles"));

static CAPS_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z\s]{4,}$").expect("caps pattern compiles"));

struct MetadataRules {
    version_table: Regex,
    document_control: Regex,
    expansion_protocol: Regex,
    placeholder: Regex,
    usage_note: Regex,
    verified_only: Regex,
    source_verified: Regex,
    citation_format: Regex,
    project_header: Regex,
    gutenberg: Regex,
    underline_rule: Regex,
    title_field: Regex,
    creator_field: Regex,
    bullet_line: Regex,
    attribution_needed: Regex,
    attribution_disputed: Regex,
    verification_part: Regex,
}

static METADATA: Lazy<MetadataRules> = Lazy::new(|| {
    let re = |pattern: &str| Regex::new(pattern).expect("metadata pattern compiles");
    MetadataRules {
        version_table: re(r"(?i)\|\s*version\s*\|\s*date\s*\|"),
        document_control: re(r"(?i)document control"),
        expansion_protocol: re(r"(?i)expansion protocol"),
        placeholder: re(r"(?i)to be expanded as content is created"),
        usage_note: re(r"(?i)how to use this document"),
        verified_only: re(r"(?i)quality over quantity.*only verified"),
        source_verified: re(r"(?i)source-verified"),
        citation_format: re(r"(?i)citation format"),
        project_header: re(r"(?im)^#\s+euongelion"),
        gutenberg: re(r"(?i)project gutenberg e?book"),
        underline_rule: re(r"(?m)^\s*_{3,}"),
        title_field: re(r"(?i)title:"),
        creator_field: re(r"(?i)creator"),
        bullet_line: re(r"^\s*[-*]\s"),
        attribution_needed: re(r"quotes requiring attribution"),
        attribution_disputed: re(r"attribution.*disputed"),
        verification_part: re(r"(?i)## PART \d+:\s*VE"),
    }
});

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Truncate to at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Extract up to [`MAX_KEYWORDS`] distinct keywords in first-seen order.
///
/// # Example
/// ```
/// use lectern_corpus::text::extract_keywords;
///
/// let keywords = extract_keywords("Grace, and GRACE again: the shepherd's staff");
/// assert_eq!(keywords, vec!["grace", "and", "the", "shepherd", "staff"]);
/// ```
pub fn extract_keywords(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for word in cleaned.split_whitespace() {
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
        if word.len() < 3 || STOP_WORDS.contains(&word) {
            continue;
        }
        if !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }
    keywords
}

/// Find distinct citation references, trimmed, in first-seen order.
pub fn extract_scripture_refs(text: &str) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    for found in SCRIPTURE_REF.find_iter(text) {
        let value = found.as_str().trim().to_string();
        if !refs.contains(&value) {
            refs.push(value);
        }
    }
    refs
}

/// Whether `text` contains at least one citation reference.
pub fn has_scripture_ref(text: &str) -> bool {
    SCRIPTURE_REF.is_match(text)
}

/// Markdown heading (levels 1-4) or an all-caps line of five or more characters.
pub fn is_heading_line(line: &str) -> bool {
    MARKDOWN_HEADING.is_match(line) || CAPS_HEADING.is_match(line.trim())
}

/// Classify a file by the directory it sits in.
pub fn detect_source_type(path: &Path) -> SourceType {
    let lower = path.to_string_lossy().to_lowercase().replace('\\', "/");
    if lower.contains("/commentaries/") {
        SourceType::Commentary
    } else if lower.contains("/bibles/") {
        SourceType::Bible
    } else if lower.contains("/lexicons/") {
        SourceType::Lexicon
    } else if lower.contains("/dictionaries/") {
        SourceType::Dictionary
    } else {
        SourceType::Theology
    }
}

/// Detect document scaffolding that should never be served as reference
/// material: version tables, placeholders, boilerplate headers, bare
/// bullet indexes and verification notes.
pub fn is_metadata_chunk(content: &str) -> bool {
    let rules = &*METADATA;
    let words = word_count(content);

    if rules.version_table.is_match(content) {
        return true;
    }
    if rules.document_control.is_match(content) && words < 150 {
        return true;
    }
    if rules.expansion_protocol.is_match(content)
        || rules.placeholder.is_match(content)
        || rules.usage_note.is_match(content)
        || rules.verified_only.is_match(content)
    {
        return true;
    }
    if rules.source_verified.is_match(content) && rules.citation_format.is_match(content) {
        return true;
    }
    if rules.project_header.is_match(content) && words < 100 {
        return true;
    }
    if rules.gutenberg.is_match(content) && words < 150 {
        return true;
    }
    if rules.underline_rule.is_match(content)
        && rules.title_field.is_match(content)
        && rules.creator_field.is_match(content)
        && words < 150
    {
        return true;
    }

    if words < 100 {
        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let bullets = lines
            .iter()
            .filter(|l| rules.bullet_line.is_match(l))
            .count();
        if bullets as f64 > lines.len() as f64 * 0.6 {
            return true;
        }
    }

    let lower = content.to_lowercase();
    if rules.attribution_needed.is_match(&lower) && rules.attribution_disputed.is_match(&lower) {
        return true;
    }

    rules.verification_part.is_match(content)
}
