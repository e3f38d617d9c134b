//! Markdown to HTML rendering for streamed answers.

/// Error from markdown rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MarkdownError(pub String);

/// Renderer abstraction: convert markdown to HTML.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Result<String, MarkdownError>;
}

/// Default implementation using pulldown-cmark.
///
/// Raw HTML passes through; with `hard_breaks` every single newline becomes a
/// `<br />`, matching how chat models format multi-line answers.
#[derive(Clone, Debug)]
pub struct PulldownMarkdownRenderer {
    hard_breaks: bool,
}

impl Default for PulldownMarkdownRenderer {
    fn default() -> Self {
        Self { hard_breaks: true }
    }
}

impl PulldownMarkdownRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hard_breaks(mut self, enabled: bool) -> Self {
        self.hard_breaks = enabled;
        self
    }
}

impl MarkdownRenderer for PulldownMarkdownRenderer {
    fn render(&self, markdown: &str) -> Result<String, MarkdownError> {
        use pulldown_cmark::{Event, Options, Parser, html};

        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;
        let hard_breaks = self.hard_breaks;
        let parser = Parser::new_ext(markdown, options).map(|event| match event {
            Event::SoftBreak if hard_breaks => Event::HardBreak,
            other => other,
        });
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}
