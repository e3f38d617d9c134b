//! Contract for the live document plus an in-memory implementation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Position in a document, counted in characters.
pub type Position = usize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TextRange {
    pub from: Position,
    pub to: Position,
}

impl TextRange {
    pub fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }

    pub fn collapsed(at: Position) -> Self {
        Self { from: at, to: at }
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    /// Inclusive overlap: touching ranges and shared insertion points overlap.
    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    /// Where this range lies after `from..to` is replaced by `inserted`
    /// positions of new content.
    pub fn map_replace(&self, from: Position, to: Position, inserted: usize) -> TextRange {
        TextRange::new(
            map_position(self.from, from, to, inserted),
            map_position(self.to, from, to, inserted),
        )
    }
}

/// Positions at or after the replaced span move with its end; positions
/// inside it collapse onto its start.
fn map_position(p: Position, from: Position, to: Position, inserted: usize) -> Position {
    if p >= to {
        (p - (to - from)).saturating_add(inserted)
    } else if p > from {
        from
    } else {
        p
    }
}

/// Visual state attached to a region while a command runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkState {
    Loading,
    Error { message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionMark {
    pub range: TextRange,
    pub state: MarkState,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("position {position} is outside the document (length {len})")]
    OutOfBounds { position: Position, len: usize },
    #[error("invalid range {from}..{to}")]
    InvalidRange { from: Position, to: Position },
}

/// Mutation API of the host document engine.
///
/// Insert operations return how many positions the inserted content
/// occupies, which is what a write cursor advances by.
pub trait Document: Send {
    fn selection(&self) -> TextRange;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn text_between(&self, from: Position, to: Position) -> Result<String, DocumentError>;
    fn insert_text(&mut self, at: Position, text: &str) -> Result<usize, DocumentError>;
    fn insert_html(&mut self, at: Position, html: &str) -> Result<usize, DocumentError>;
    fn delete_range(&mut self, from: Position, to: Position) -> Result<(), DocumentError>;
    /// Loading/error decoration hook; `None` clears it.
    fn set_mark(&mut self, _mark: Option<RegionMark>) {}
}

/// A document shared between a command and its stream session.
pub type SharedDocument<D> = Arc<Mutex<D>>;

pub fn shared<D: Document>(document: D) -> SharedDocument<D> {
    Arc::new(Mutex::new(document))
}

pub(crate) fn lock<D>(document: &SharedDocument<D>) -> MutexGuard<'_, D> {
    document.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Plain-text document; HTML is stored verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextDocument {
    text: String,
    selection: TextRange,
    marks: Vec<Option<RegionMark>>,
}

impl TextDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_selection(mut self, from: Position, to: Position) -> Self {
        self.selection = TextRange::new(from, to);
        self
    }

    /// Selects every character.
    pub fn select_all(mut self) -> Self {
        let len = self.len();
        self.selection = TextRange::new(0, len);
        self
    }

    pub fn set_selection(&mut self, from: Position, to: Position) {
        self.selection = TextRange::new(from, to);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current mark, if any.
    pub fn mark(&self) -> Option<&RegionMark> {
        self.marks.last().and_then(Option::as_ref)
    }

    /// Every `set_mark` call in order.
    pub fn mark_log(&self) -> &[Option<RegionMark>] {
        &self.marks
    }

    fn byte_index(&self, position: Position) -> Result<usize, DocumentError> {
        if position == 0 {
            return Ok(0);
        }
        match self.text.char_indices().nth(position) {
            Some((index, _)) => Ok(index),
            None if position == self.len() => Ok(self.text.len()),
            None => Err(DocumentError::OutOfBounds {
                position,
                len: self.len(),
            }),
        }
    }

    fn insert(&mut self, at: Position, content: &str) -> Result<usize, DocumentError> {
        let index = self.byte_index(at)?;
        self.text.insert_str(index, content);
        let inserted = content.chars().count();
        self.selection = self.selection.map_replace(at, at, inserted);
        Ok(inserted)
    }
}

impl Document for TextDocument {
    fn selection(&self) -> TextRange {
        self.selection
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn text_between(&self, from: Position, to: Position) -> Result<String, DocumentError> {
        if from > to {
            return Err(DocumentError::InvalidRange { from, to });
        }
        let start = self.byte_index(from)?;
        let end = self.byte_index(to)?;
        Ok(self.text[start..end].to_string())
    }

    fn insert_text(&mut self, at: Position, text: &str) -> Result<usize, DocumentError> {
        self.insert(at, text)
    }

    fn insert_html(&mut self, at: Position, html: &str) -> Result<usize, DocumentError> {
        self.insert(at, html)
    }

    fn delete_range(&mut self, from: Position, to: Position) -> Result<(), DocumentError> {
        if from > to {
            return Err(DocumentError::InvalidRange { from, to });
        }
        let start = self.byte_index(from)?;
        let end = self.byte_index(to)?;
        self.text.replace_range(start..end, "");
        self.selection = self.selection.map_replace(from, to, 0);
        Ok(())
    }

    fn set_mark(&mut self, mark: Option<RegionMark>) {
        self.marks.push(mark);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_delete_use_character_positions() {
        let mut doc = TextDocument::new("héllo");
        assert_eq!(doc.insert_text(2, "XY").unwrap(), 2);
        assert_eq!(doc.text(), "héXYllo");
        doc.delete_range(1, 4).unwrap();
        assert_eq!(doc.text(), "hllo");
        assert_eq!(doc.text_between(1, 4).unwrap(), "llo");
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut doc = TextDocument::new("abc");
        assert_eq!(
            doc.insert_text(4, "x"),
            Err(DocumentError::OutOfBounds { position: 4, len: 3 })
        );
        assert!(matches!(
            doc.text_between(2, 1),
            Err(DocumentError::InvalidRange { .. })
        ));
        assert_eq!(doc.insert_text(3, "!").unwrap(), 1);
        assert_eq!(doc.text(), "abc!");
    }

    #[test]
    fn selection_follows_edits_before_it() {
        let mut doc = TextDocument::new("hello world").with_selection(6, 11);
        doc.insert_text(0, ">> ").unwrap();
        assert_eq!(doc.selection(), TextRange::new(9, 14));
        doc.delete_range(0, 3).unwrap();
        assert_eq!(doc.selection(), TextRange::new(6, 11));
        doc.delete_range(5, 8).unwrap();
        assert_eq!(doc.selection(), TextRange::new(5, 8));
    }

    #[test]
    fn ranges_map_through_replacements() {
        let range = TextRange::new(6, 11);
        assert_eq!(range.map_replace(0, 5, 9), TextRange::new(10, 15));
        assert_eq!(range.map_replace(11, 11, 4), TextRange::new(6, 15));
        assert_eq!(range.map_replace(12, 20, 0), range);
        assert_eq!(range.map_replace(4, 8, 1), TextRange::new(4, 8));
        assert_eq!(
            TextRange::new(0, Position::MAX).map_replace(2, 2, 3),
            TextRange::new(0, Position::MAX)
        );
    }

    #[test]
    fn ranges_overlap_inclusively() {
        let a = TextRange::new(0, 5);
        assert!(a.overlaps(&TextRange::new(5, 9)));
        assert!(a.overlaps(&TextRange::collapsed(3)));
        assert!(!a.overlaps(&TextRange::new(6, 9)));
    }
}
