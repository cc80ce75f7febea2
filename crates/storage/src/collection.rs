//! Collection: upsert-by-filter document container
//!
//! Documents are kept in insertion order. An upsert matches the first
//! document whose fields contain every filter field with an equal value,
//! `$set`s the update fields on it, and inserts a new document when nothing
//! matches.
//!
//! # Identity
//!
//! Every stored document has an `_id`. When the update carries its own
//! `_id` it is kept, otherwise the store assigns a UUID string.

use docsink_core::{Document, StructuredValue, WriteInstruction};
use uuid::Uuid;

/// Field name of the store-assigned document identifier
pub const ID_FIELD: &str = "_id";

/// Outcome of applying one write instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Filter matched; `modified` is true if any field changed
    Matched {
        /// Whether the update changed the document
        modified: bool,
    },
    /// Nothing matched; a new document was inserted
    Upserted,
    /// Nothing matched and upsert was off
    Unmatched,
}

/// Reject instructions the store cannot interpret
///
/// Top-level field names starting with `$` would be read as operators in a
/// filter and are invalid in a `$set`.
pub fn validate_instruction(instruction: &WriteInstruction) -> Result<(), String> {
    let operator_field = instruction
        .filter
        .keys()
        .chain(instruction.update.set.keys())
        .find(|k| k.starts_with('$'));
    match operator_field {
        Some(field) => Err(format!("invalid field name '{}': operators are not allowed", field)),
        None => Ok(()),
    }
}

/// True if `doc` contains every filter field with an equal value
pub fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(k, v)| doc.get(k) == Some(v))
}

/// In-memory collection
#[derive(Debug, Clone, Default)]
pub struct Collection {
    docs: Vec<Document>,
}

impl Collection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// True if the collection holds no documents
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// All documents, in insertion order
    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    /// Documents matching `filter`
    pub fn find(&self, filter: &Document) -> Vec<Document> {
        self.docs
            .iter()
            .filter(|d| matches(d, filter))
            .cloned()
            .collect()
    }

    /// Apply one instruction
    ///
    /// The instruction must already have passed [`validate_instruction`].
    pub fn apply(&mut self, instruction: &WriteInstruction) -> ApplyOutcome {
        if let Some(doc) = self
            .docs
            .iter_mut()
            .find(|d| matches(d, &instruction.filter))
        {
            let mut modified = false;
            for (field, value) in &instruction.update.set {
                if doc.get(field) != Some(value) {
                    doc.insert(field.clone(), value.clone());
                    modified = true;
                }
            }
            return ApplyOutcome::Matched { modified };
        }

        if !instruction.upsert {
            return ApplyOutcome::Unmatched;
        }

        // Upserted document: filter equality fields, then the $set fields
        let mut doc = instruction.filter.clone();
        doc.extend(
            instruction
                .update
                .set
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        doc.entry(ID_FIELD.to_string())
            .or_insert_with(|| StructuredValue::String(Uuid::new_v4().to_string()));
        self.docs.push(doc);
        ApplyOutcome::Upserted
    }
}
