//! Editor actions backed by the selected model.

use std::sync::Arc;

use quillmate_harness::{AiError, ChatRequest, Harness, StreamSummary};
use tracing::{error, info, warn};

use crate::document::{
    Document, DocumentError, MarkState, RegionMark, SharedDocument, TextRange, lock,
};
use crate::markdown::MarkdownRenderer;
use crate::region::{RegionClaim, RegionGuard};
use crate::session::DocumentSession;

/// User-invokable editor actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditorCommand {
    ImproveWriting,
    Summarize,
    Translate { target_language: String },
    FixGrammar,
}

impl EditorCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ImproveWriting => "improve_writing",
            Self::Summarize => "summarize",
            Self::Translate { .. } => "translate",
            Self::FixGrammar => "fix_grammar",
        }
    }

    /// Instruction placed before the selected text.
    pub fn prompt(&self) -> String {
        match self {
            Self::ImproveWriting => "Polish the following text:".to_string(),
            Self::Summarize => "Summarize the following text:".to_string(),
            Self::Translate { target_language } => format!(
                "Translate the following text into {}:",
                language_name(target_language)
            ),
            Self::FixGrammar => {
                "Fix the grammar and spelling errors in the following text:".to_string()
            }
        }
    }

    fn placement(&self) -> Placement {
        match self {
            Self::Summarize => Placement::AppendSummary,
            _ => Placement::ReplaceSelection,
        }
    }

    fn request(&self, selected_text: String) -> ChatRequest {
        let request = ChatRequest::new(self.prompt()).selected_text(selected_text);
        match self {
            Self::Translate { target_language } => request.target_language(target_language.clone()),
            _ => request,
        }
    }
}

fn language_name(code: &str) -> &str {
    match code.trim().to_ascii_lowercase().as_str() {
        "en" => "English",
        "zh" | "zh-cn" => "Chinese",
        _ => code,
    }
}

enum Placement {
    ReplaceSelection,
    AppendSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("the text changed while the command was running")]
    RegionChanged,
}

/// Result of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Nothing selected; no request was made and the document is unchanged.
    NotHandled,
    /// Another command is running over an overlapping region.
    Busy,
    /// The answer was written to `range`.
    Applied { range: TextRange },
    /// The region carries an error mark with this failure.
    Failed(CommandError),
}

/// Maps editor actions to model calls and writes the answers back.
pub struct CommandDispatcher<D: Document> {
    harness: Harness,
    document: SharedDocument<D>,
    renderer: Arc<dyn MarkdownRenderer>,
    regions: RegionGuard,
}

impl<D: Document> CommandDispatcher<D> {
    pub fn new(
        harness: Harness,
        document: SharedDocument<D>,
        renderer: Arc<dyn MarkdownRenderer>,
    ) -> Self {
        Self {
            harness,
            document,
            renderer,
            regions: RegionGuard::new(),
        }
    }

    pub fn document(&self) -> &SharedDocument<D> {
        &self.document
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    /// Runs `command` over the current selection.
    ///
    /// Failures never escape: they are logged, put on the region as an error
    /// mark and returned as [`CommandOutcome::Failed`].
    pub async fn run(&self, command: EditorCommand) -> CommandOutcome {
        let (selection, text) = {
            let document = lock(&self.document);
            let selection = document.selection();
            match document.text_between(selection.from, selection.to) {
                Ok(text) => (selection, text),
                Err(e) => return CommandOutcome::Failed(e.into()),
            }
        };
        if text.is_empty() {
            return CommandOutcome::NotHandled;
        }
        let Some(claim) = self.regions.claim(selection) else {
            warn!(command = command.name(), ?selection, "region busy, command rejected");
            return CommandOutcome::Busy;
        };
        info!(command = command.name(), chars = text.chars().count(), "running editor command");
        self.mark(selection, Some(MarkState::Loading));

        let result = match self.harness.complete(command.request(text.clone())).await {
            Ok(answer) if answer.trim().is_empty() => Err(CommandError::EmptyResponse),
            Ok(answer) => self.place(&command, &claim, &text, &answer),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(range) => {
                self.mark(range, None);
                CommandOutcome::Applied { range }
            }
            Err(e) => {
                error!(command = command.name(), error = %e, "editor command failed");
                self.mark(
                    claim.range(),
                    Some(MarkState::Error {
                        message: e.to_string(),
                    }),
                );
                CommandOutcome::Failed(e)
            }
        }
    }

    /// Streams the answer to a free-form prompt into the document at the
    /// selection start, optionally re-rendering it as HTML once complete.
    /// A non-empty selection is sent along as context and left in place.
    pub async fn stream_at_selection(
        &self,
        prompt: &str,
        parse_markdown: bool,
    ) -> Result<StreamSummary, CommandError> {
        let (selection, context) = {
            let document = lock(&self.document);
            let selection = document.selection();
            (selection, document.text_between(selection.from, selection.to)?)
        };
        let anchor = TextRange::collapsed(selection.from);
        // The session writes at fixed positions, so nothing else may edit
        // the document while it streams.
        let Some(_claim) = self.regions.claim_document() else {
            return Err(AiError::Validation("document is busy".into()).into());
        };
        let mut session = DocumentSession::at(
            self.document.clone(),
            self.renderer.clone(),
            parse_markdown,
            selection.from,
        );
        self.mark(anchor, Some(MarkState::Loading));
        let request = ChatRequest::new(prompt).selected_text(context);
        match self.harness.stream_chat(request, &mut session).await {
            Ok(summary) => {
                self.mark(session.inserted_range(), None);
                Ok(summary)
            }
            Err(e) => {
                self.mark(
                    session.inserted_range(),
                    Some(MarkState::Error {
                        message: e.to_string(),
                    }),
                );
                Err(e.into())
            }
        }
    }

    /// Writes `answer` for the claimed region, provided it still holds the
    /// text the command was run on. Other claims are remapped through the edit.
    fn place(
        &self,
        command: &EditorCommand,
        claim: &RegionClaim,
        original: &str,
        answer: &str,
    ) -> Result<TextRange, CommandError> {
        let mut document = lock(&self.document);
        let selection = claim.range();
        if document.text_between(selection.from, selection.to).ok().as_deref() != Some(original) {
            return Err(CommandError::RegionChanged);
        }
        match command.placement() {
            Placement::ReplaceSelection => {
                document.delete_range(selection.from, selection.to)?;
                let inserted = match document.insert_text(selection.from, answer) {
                    Ok(inserted) => inserted,
                    Err(e) => {
                        self.regions.record_replace(selection.from, selection.to, 0);
                        return Err(e.into());
                    }
                };
                self.regions.record_replace(selection.from, selection.to, inserted);
                Ok(TextRange::new(selection.from, selection.from + inserted))
            }
            Placement::AppendSummary => {
                let html = format!(
                    "<p><strong>Summary:</strong> {}</p>",
                    escape_html(answer.trim())
                );
                let inserted = document.insert_html(selection.to, &html)?;
                self.regions.record_replace(selection.to, selection.to, inserted);
                Ok(TextRange::new(selection.to, selection.to + inserted))
            }
        }
    }

    fn mark(&self, range: TextRange, state: Option<MarkState>) {
        let mark = state.map(|state| RegionMark { range, state });
        lock(&self.document).set_mark(mark);
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
