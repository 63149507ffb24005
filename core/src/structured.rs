use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const MAX_MAIN_POINTS: usize = 5;
const MAX_SUGGESTIONS: usize = 4;
const SUMMARY_FALLBACK_CHARS: usize = 200;

const INTENT_KEYWORDS: &[&str] = &[
    "summarize",
    "summary",
    "analyze",
    "analysis",
    "compare",
    "comparison",
    "list",
    "points",
    "steps",
    "recommendations",
    "suggestions",
    "findings",
    "key points",
    "main points",
    "overview",
    "breakdown",
    "explain",
];

const MAIN_POINT_HEADERS: &[&str] = &["key points", "main points", "summary"];
const SUGGESTION_HEADERS: &[&str] = &["suggestions", "recommendations", "advice"];

static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+\.|[*\-•])\s*(.*)$").expect("bullet pattern is valid"));

static FIRST_SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^.!?]*[.!?]").expect("sentence pattern is valid"));

/// Does the user's message ask for something list-shaped?
pub fn wants_structured(message: &str) -> bool {
    let lower = message.to_lowercase();
    INTENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    MainPoints,
    Suggestions,
}

/// How a single trimmed reply line is read by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Header(Section),
    Bullet(&'a str),
    Plain,
}

/// Headers win over bullets, so "1. Summary" opens a section instead of becoming a point.
pub fn classify_line(line: &str) -> LineKind<'_> {
    let lower = line.to_lowercase();
    if MAIN_POINT_HEADERS.iter().any(|k| lower.contains(k)) {
        return LineKind::Header(Section::MainPoints);
    }
    if SUGGESTION_HEADERS.iter().any(|k| lower.contains(k)) {
        return LineKind::Header(Section::Suggestions);
    }
    match BULLET_RE.captures(line).and_then(|c| c.get(1)) {
        Some(rest) => LineKind::Bullet(rest.as_str().trim()),
        None => LineKind::Plain,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredDetails {
    pub suggestions: Vec<String>,
    pub key_findings: Vec<String>,
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredResponse {
    pub main_points: Vec<String>,
    pub details: StructuredDetails,
    pub summary: String,
}

/// The `response` payload of a successful chat call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseEnvelope {
    Natural { content: String },
    Structured(StructuredResponse),
}

impl ResponseEnvelope {
    pub fn natural(reply: &str) -> Self {
        ResponseEnvelope::Natural {
            content: reply.trim().to_string(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ResponseEnvelope::Structured(_))
    }
}

/// Best-effort repackaging of a free-text reply into points and suggestions.
/// `None` when the reply has no bullet lines at all.
pub fn extract_structured(reply: &str) -> Option<StructuredResponse> {
    let mut main_points = Vec::new();
    let mut suggestions = Vec::new();
    let mut current: Option<Section> = None;

    for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match classify_line(line) {
            LineKind::Header(section) => current = Some(section),
            LineKind::Bullet("") | LineKind::Plain => {}
            LineKind::Bullet(item) => {
                if current == Some(Section::Suggestions) {
                    suggestions.push(item.to_string());
                } else {
                    main_points.push(item.to_string());
                }
            }
        }
    }

    if main_points.is_empty() && suggestions.is_empty() {
        return None;
    }

    main_points.truncate(MAX_MAIN_POINTS);
    suggestions.truncate(MAX_SUGGESTIONS);

    Some(StructuredResponse {
        main_points,
        details: StructuredDetails {
            suggestions,
            ..Default::default()
        },
        summary: first_sentence(reply),
    })
}

/// First run up to `.`, `!` or `?` with newlines flattened; otherwise a 200-char preview.
pub fn first_sentence(text: &str) -> String {
    let flat = text.replace('\n', " ");
    match FIRST_SENTENCE_RE.find(&flat) {
        Some(m) => m.as_str().trim().to_string(),
        None => {
            let preview: String = text.chars().take(SUMMARY_FALLBACK_CHARS).collect();
            format!("{preview}...").trim().to_string()
        }
    }
}
