//! Ordered exhibit list with undoable reordering.
//!
//! The [`Sequencer`] owns both the item list and its history. Every undoable
//! operation snapshots the list and mutates it inside the same `&mut self`
//! call, so the two can never drift apart.
//!
//! ```
//! use exhibit_assembler::models::{ExhibitItem, NumberingStyle};
//! use exhibit_assembler::sequencer::Sequencer;
//!
//! let mut seq = Sequencer::new(50);
//! seq.append(ExhibitItem::url("https://example.com/a", "Award")).unwrap();
//! seq.append(ExhibitItem::url("https://example.com/b", "Article")).unwrap();
//! seq.reverse();
//! assert_eq!(seq.items()[0].label, "Article");
//! assert!(seq.undo());
//! assert_eq!(seq.exhibit_index(NumberingStyle::Letters)[0].0, "Exhibit A");
//! ```

pub mod numbering;

pub use numbering::number_at;

use std::collections::VecDeque;

use crate::models::{ExhibitItem, NumberingStyle};

/// Errors raised by sequencer operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("exhibit {0} is already in the package")]
    DuplicateId(String),

    #[error("index {index} is out of range for {len} exhibits")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("exhibit {0} not found")]
    NotFound(String),
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    items: Vec<ExhibitItem>,
    history: VecDeque<Vec<ExhibitItem>>,
    max_undo_depth: usize,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Sequencer {
    pub fn new(max_undo_depth: usize) -> Self {
        Self {
            items: Vec::new(),
            history: VecDeque::new(),
            max_undo_depth,
        }
    }

    /// Start from an existing list, with empty history
    pub fn with_items(items: Vec<ExhibitItem>, max_undo_depth: usize) -> Self {
        Self {
            items,
            history: VecDeque::new(),
            max_undo_depth,
        }
    }

    pub fn items(&self) -> &[ExhibitItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Hand the ordered list over, dropping the history
    pub fn into_items(self) -> Vec<ExhibitItem> {
        self.items
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn append(&mut self, item: ExhibitItem) -> Result<(), SequenceError> {
        if self.position(&item.id).is_some() {
            return Err(SequenceError::DuplicateId(item.id));
        }
        self.items.push(item);
        Ok(())
    }

    /// Append several items, stopping at the first duplicate
    pub fn extend<I>(&mut self, items: I) -> Result<(), SequenceError>
    where
        I: IntoIterator<Item = ExhibitItem>,
    {
        for item in items {
            self.append(item)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<ExhibitItem, SequenceError> {
        let index = self
            .position(id)
            .ok_or_else(|| SequenceError::NotFound(id.to_string()))?;
        self.snapshot();
        Ok(self.items.remove(index))
    }

    pub fn relabel(&mut self, id: &str, label: impl Into<String>) -> Result<(), SequenceError> {
        let index = self
            .position(id)
            .ok_or_else(|| SequenceError::NotFound(id.to_string()))?;
        self.snapshot();
        self.items[index].label = label.into();
        Ok(())
    }

    /// Move the item at `from` so it ends up at `to`
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), SequenceError> {
        let len = self.items.len();
        for index in [from, to] {
            if index >= len {
                return Err(SequenceError::IndexOutOfRange { index, len });
            }
        }

        self.snapshot();
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    /// Case-insensitive, stable
    pub fn sort_by_label(&mut self) {
        self.snapshot();
        self.items.sort_by_key(|item| item.label.to_lowercase());
    }

    /// PDFs, then images, then URLs; stable within each kind
    pub fn sort_by_kind(&mut self) {
        self.snapshot();
        self.items.sort_by_key(|item| item.kind.sort_rank());
    }

    pub fn reverse(&mut self) {
        self.snapshot();
        self.items.reverse();
    }

    /// Restore the list as it was before the last undoable operation.
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop_back() {
            Some(previous) => {
                self.items = previous;
                true
            }
            None => false,
        }
    }

    /// `("Exhibit A", item)` pairs in list order
    pub fn exhibit_index(&self, style: NumberingStyle) -> Vec<(String, &ExhibitItem)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (format!("Exhibit {}", number_at(i, style)), item))
            .collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    fn snapshot(&mut self) {
        if self.max_undo_depth == 0 {
            return;
        }
        if self.history.len() == self.max_undo_depth {
            self.history.pop_front();
        }
        self.history.push_back(self.items.clone());
    }
}
