use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Seeded once at the top of every conversation.
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that provides clear, conversational responses. \n
Guidelines:
- Be natural and conversational in your responses
- Provide helpful, accurate information
- When asked for summaries or analysis, organize your thoughts clearly
- Use proper paragraphs and formatting for readability
- Be concise but thorough
- If the user is viewing web tabs, you can reference them in context

Keep your responses engaging and human-like while being informative.";

pub const NO_TABS_CONTEXT: &str = "No specific tabs are currently selected.";

const MAX_CONTEXT_TABS: usize = 5;

static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://([^/]+)").expect("domain pattern is valid"));

/// A browser tab as the extension sends it. Extra fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TabDescriptor {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl TabDescriptor {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            url: Some(url.into()),
        }
    }

    /// Host part of the url, or the raw url when it has no `http(s)://host`.
    pub fn domain(&self) -> &str {
        let url = self.url.as_deref().unwrap_or("");
        DOMAIN_RE
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(url)
    }

    fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => "Untitled",
        }
    }
}

/// Decodes the `tabs` query parameter. Anything that is not a JSON array of
/// tab objects counts as "no tabs".
pub fn parse_tabs(raw: Option<&str>) -> Vec<TabDescriptor> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<TabDescriptor>>(raw) {
        Ok(tabs) => tabs,
        Err(e) => {
            tracing::debug!("Ignoring malformed tabs payload: {}", e);
            Vec::new()
        }
    }
}

pub fn summarize_tabs(tabs: &[TabDescriptor]) -> String {
    if tabs.is_empty() {
        return NO_TABS_CONTEXT.to_string();
    }

    let lines: Vec<String> = tabs
        .iter()
        .take(MAX_CONTEXT_TABS)
        .enumerate()
        .map(|(i, tab)| format!("Tab {}: '{}' from {}", i + 1, tab.display_title(), tab.domain()))
        .collect();

    format!("Currently viewing:\n{}", lines.join("\n"))
}

/// The text actually sent as the user turn. Without tabs the message goes out untouched.
pub fn build_prompt(message: &str, tabs: &[TabDescriptor]) -> String {
    if tabs.is_empty() {
        return message.to_string();
    }

    format!(
        "Context: {}\n\nUser question: {}\n\nPlease provide a helpful response based on the context of the tabs the user is currently viewing.",
        summarize_tabs(tabs),
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_keeps_exact_layout() {
        assert!(SYSTEM_PROMPT.starts_with(
            "You are a helpful AI assistant that provides clear, conversational responses. \n\nGuidelines:\n- Be natural"
        ));
        assert!(SYSTEM_PROMPT.ends_with("in context\n\nKeep your responses engaging and human-like while being informative."));
    }

    #[test]
    fn empty_tabs_use_fallback_sentence() {
        assert_eq!(summarize_tabs(&[]), "No specific tabs are currently selected.");
    }

    #[test]
    fn only_first_five_tabs_are_listed() {
        let tabs: Vec<TabDescriptor> = (1..=7)
            .map(|i| TabDescriptor::new(format!("Page {i}"), format!("https://site{i}.com/path")))
            .collect();

        let summary = summarize_tabs(&tabs);
        let lines: Vec<&str> = summary.lines().collect();

        assert_eq!(lines[0], "Currently viewing:");
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], "Tab 1: 'Page 1' from site1.com");
        assert_eq!(lines[5], "Tab 5: 'Page 5' from site5.com");
        assert!(!summary.contains("Tab 6"));
    }

    #[test]
    fn domain_falls_back_to_raw_url() {
        assert_eq!(TabDescriptor::new("x", "http://example.org:8080/a/b").domain(), "example.org:8080");
        assert_eq!(TabDescriptor::new("x", "chrome://extensions").domain(), "chrome://extensions");
        assert_eq!(TabDescriptor::default().domain(), "");
    }

    #[test]
    fn missing_title_renders_untitled() {
        let tabs = parse_tabs(Some(r#"[{"url":"https://docs.rs/regex","favIconUrl":"x","id":4}]"#));
        assert_eq!(summarize_tabs(&tabs), "Currently viewing:\nTab 1: 'Untitled' from docs.rs");
    }

    #[test]
    fn malformed_tabs_become_empty() {
        assert!(parse_tabs(Some("not-json")).is_empty());
        assert!(parse_tabs(Some(r#"{"title":"object, not array"}"#)).is_empty());
        assert!(parse_tabs(None).is_empty());
        assert_eq!(parse_tabs(Some("[]")), Vec::<TabDescriptor>::new());
    }

    #[test]
    fn prompt_wraps_message_only_when_tabs_present() {
        assert_eq!(build_prompt("hi there", &[]), "hi there");

        let prompt = build_prompt("what is this?", &[TabDescriptor::new("Rust", "https://rust-lang.org/")]);
        assert!(prompt.starts_with("Context: Currently viewing:\nTab 1: 'Rust' from rust-lang.org\n\n"));
        assert!(prompt.contains("User question: what is this?"));
        assert!(prompt.ends_with("tabs the user is currently viewing."));
    }
}
