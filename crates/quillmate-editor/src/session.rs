//! Applies a streamed answer to a live document.

use std::sync::Arc;

use quillmate_harness::{Delta, StopReason, StreamListener};
use tracing::{debug, warn};

use crate::document::{Document, DocumentError, Position, SharedDocument, TextRange, lock};
use crate::markdown::MarkdownRenderer;

/// Write cursor and anchor of one streamed insertion.
///
/// `insertion_start` is captured from the selection when the session is
/// created and never moves; the content between it and `cursor` is exactly
/// what this session has inserted.
pub struct DocumentSession<D: Document> {
    document: SharedDocument<D>,
    renderer: Arc<dyn MarkdownRenderer>,
    parse_markdown: bool,
    insertion_start: Position,
    cursor: Position,
    rendered: bool,
    stopped: Option<StopReason>,
}

impl<D: Document> DocumentSession<D> {
    /// Anchors a session at the start of the document's current selection.
    pub fn new(
        document: SharedDocument<D>,
        renderer: Arc<dyn MarkdownRenderer>,
        parse_markdown: bool,
    ) -> Self {
        let start = lock(&document).selection().from;
        Self::at(document, renderer, parse_markdown, start)
    }

    /// Anchors a session at an explicit position.
    pub fn at(
        document: SharedDocument<D>,
        renderer: Arc<dyn MarkdownRenderer>,
        parse_markdown: bool,
        insertion_start: Position,
    ) -> Self {
        Self {
            document,
            renderer,
            parse_markdown,
            insertion_start,
            cursor: insertion_start,
            rendered: false,
            stopped: None,
        }
    }

    pub fn insertion_start(&self) -> Position {
        self.insertion_start
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    /// Range occupied by the content inserted so far.
    pub fn inserted_range(&self) -> TextRange {
        TextRange::new(self.insertion_start, self.cursor)
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    // Reserved for a loading indicator.
    pub fn begin(&mut self) {
        debug!(at = self.insertion_start, "document session started");
    }

    /// Inserts the delta at the cursor; the `Done` delta additionally
    /// replaces the inserted text with its rendered HTML, once.
    pub fn apply_delta(&mut self, delta: &Delta) -> Result<(), DocumentError> {
        if self.stopped.is_some() {
            return Ok(());
        }
        let mut document = lock(&self.document);
        if !delta.content.is_empty() {
            let inserted = document.insert_text(self.cursor, &delta.content)?;
            self.cursor += inserted;
        }
        if delta.is_done() && self.parse_markdown && !self.rendered {
            self.rendered = true;
            let raw = document.text_between(self.insertion_start, self.cursor)?;
            let html = match self.renderer.render(&raw) {
                Ok(html) => html,
                Err(e) => {
                    warn!(error = %e, "markdown render failed, keeping raw text");
                    return Ok(());
                }
            };
            document.delete_range(self.insertion_start, self.cursor)?;
            self.cursor = self.insertion_start;
            let inserted = match document.insert_html(self.insertion_start, &html) {
                Ok(inserted) => inserted,
                Err(e) => {
                    warn!(error = %e, "html insert failed, restoring raw text");
                    let restored = document.insert_text(self.insertion_start, &raw)?;
                    self.cursor += restored;
                    return Err(e);
                }
            };
            self.cursor += inserted;
            debug!(from = self.insertion_start, to = self.cursor, "replaced streamed markdown with html");
        }
        Ok(())
    }

    // Reserved for hiding a loading indicator.
    pub fn finish(&mut self, reason: StopReason) {
        if self.stopped.is_none() {
            debug!(?reason, inserted = self.cursor - self.insertion_start, "document session stopped");
            self.stopped = Some(reason);
        }
    }
}

impl<D: Document> StreamListener for DocumentSession<D> {
    fn on_start(&mut self) {
        self.begin();
    }

    fn on_message(&mut self, delta: Delta) {
        if let Err(e) = self.apply_delta(&delta) {
            warn!(error = %e, cursor = self.cursor, "failed to apply delta to document");
        }
    }

    fn on_stop(&mut self, reason: StopReason) {
        self.finish(reason);
    }
}
