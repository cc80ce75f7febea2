//! Write instructions and batches
//!
//! A [`WriteInstruction`] is the idempotent upsert derived from one leaf
//! document. Filter and update carry the same field set: matching a document
//! by its own content and `$set`-ing that same content is a fixed point, so
//! replaying an instruction never changes store state a second time.

use crate::value::{Document, StructuredValue};
use serde::{Deserialize, Serialize};

/// `$set` update operator payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Update {
    /// Fields to set on the matched (or inserted) document
    #[serde(rename = "$set")]
    pub set: Document,
}

/// Idempotent upsert of one leaf document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteInstruction {
    /// Match condition: every field must equal
    pub filter: Document,
    /// Update applied to the match
    pub update: Update,
    /// Insert when nothing matches
    pub upsert: bool,
}

impl WriteInstruction {
    /// Build the self-filtering upsert for `doc`
    pub fn upsert(doc: Document) -> Self {
        WriteInstruction {
            filter: doc.clone(),
            update: Update { set: doc },
            upsert: true,
        }
    }

    /// The update in wire form: `{"$set": {...}}`
    pub fn update_document(&self) -> StructuredValue {
        let mut update = Document::new();
        update.insert(
            "$set".to_string(),
            StructuredValue::Object(self.update.set.clone()),
        );
        StructuredValue::Object(update)
    }
}

/// Convert one leaf document into its write instruction
pub fn build_write_model(doc: Document) -> WriteInstruction {
    WriteInstruction::upsert(doc)
}

/// Write instructions submitted together in one bulk call
///
/// Instructions are independent upserts, so correctness never depends on
/// their order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    instructions: Vec<WriteInstruction>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one instruction
    pub fn push(&mut self, instruction: WriteInstruction) {
        self.instructions.push(instruction);
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True when there is nothing to write
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Borrow the instructions
    pub fn instructions(&self) -> &[WriteInstruction] {
        &self.instructions
    }

    /// Iterate over the instructions
    pub fn iter(&self) -> std::slice::Iter<'_, WriteInstruction> {
        self.instructions.iter()
    }
}

impl From<Vec<WriteInstruction>> for Batch {
    fn from(instructions: Vec<WriteInstruction>) -> Self {
        Batch { instructions }
    }
}

impl Extend<WriteInstruction> for Batch {
    fn extend<I: IntoIterator<Item = WriteInstruction>>(&mut self, iter: I) {
        self.instructions.extend(iter);
    }
}

impl IntoIterator for Batch {
    type Item = WriteInstruction;
    type IntoIter = std::vec::IntoIter<WriteInstruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.into_iter()
    }
}
