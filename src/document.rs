//! Slot-to-text document store.
//!
//! The store is an append-only table: the document recorded at slot `n` is
//! the `n`-th document ever recorded. It performs no ranking; it only maps
//! slots returned by a vector index back to the original text.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SemsearchError};
use crate::vector::Slot;

/// A slot paired with the text submitted at insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub slot: Slot,
    pub text: String,
}

/// Append-only mapping from slot to original text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStore {
    texts: Vec<String>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot the next recorded document must use.
    pub fn next_slot(&self) -> Slot {
        self.texts.len() as Slot
    }

    /// Store `text` at `slot`.
    ///
    /// `slot` must equal [`next_slot`](Self::next_slot); anything else means the
    /// store and its vector index have diverged.
    pub fn record(&mut self, slot: Slot, text: impl Into<String>) -> Result<()> {
        let expected = self.next_slot();
        if slot != expected {
            return Err(SemsearchError::slot_out_of_order(expected, slot));
        }
        self.texts.push(text.into());
        Ok(())
    }

    /// Text for each slot, `None` where nothing was recorded.
    pub fn resolve(&self, slots: &[Slot]) -> Vec<Option<String>> {
        slots
            .iter()
            .map(|&slot| self.get(slot).map(str::to_string))
            .collect()
    }

    /// Borrow the text recorded at `slot`.
    pub fn get(&self, slot: Slot) -> Option<&str> {
        let index = usize::try_from(slot).ok()?;
        self.texts.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Iterate over every record in slot order.
    pub fn records(&self) -> impl Iterator<Item = DocumentRecord> + '_ {
        self.texts
            .iter()
            .enumerate()
            .map(|(slot, text)| DocumentRecord {
                slot: slot as Slot,
                text: text.clone(),
            })
    }

    /// Every stored text in slot order.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }
}
