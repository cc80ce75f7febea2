//! Value tree walker
//!
//! Decomposes a structured value into the Object-shaped leaves that become
//! documents. Objects are leaves as a whole: lists nested *inside* an object
//! are field values, not further write targets. Lists are expanded
//! recursively. Scalars found while expanding a list cannot become filter or
//! update documents and are skipped.
//!
//! The walk is lazy and uses an explicit stack of list iterators, so list
//! nesting depth is bounded only by memory.

use crate::value::{Document, StructuredValue};
use tracing::trace;

/// Lazy iterator over the Object-shaped leaves of a value
///
/// # Example
///
/// ```
/// use docsink_core::{Leaves, StructuredValue};
///
/// let root = StructuredValue::from(serde_json::json!([{"a": 1}, "skip-me", [{"b": 2}]]));
/// let mut leaves = Leaves::new(root);
/// assert_eq!(leaves.by_ref().count(), 2);
/// assert_eq!(leaves.skipped(), 1);
/// ```
#[derive(Debug)]
pub struct Leaves {
    root: Option<StructuredValue>,
    stack: Vec<std::vec::IntoIter<StructuredValue>>,
    skipped: usize,
}

impl Leaves {
    /// Start walking `root`
    pub fn new(root: StructuredValue) -> Self {
        Leaves {
            root: Some(root),
            stack: Vec::new(),
            skipped: 0,
        }
    }

    /// Number of scalars skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Leaves {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        loop {
            let value = match self.root.take() {
                Some(root) => root,
                None => {
                    let top = self.stack.last_mut()?;
                    match top.next() {
                        Some(value) => value,
                        None => {
                            self.stack.pop();
                            continue;
                        }
                    }
                }
            };

            match value {
                StructuredValue::Object(doc) => return Some(doc),
                StructuredValue::List(items) => self.stack.push(items.into_iter()),
                scalar @ (StructuredValue::Null
                | StructuredValue::Bool(_)
                | StructuredValue::Number(_)
                | StructuredValue::String(_)) => {
                    self.skipped += 1;
                    trace!(
                        target: "docsink::convert",
                        kind = scalar.type_name(),
                        depth = self.stack.len(),
                        "Skipping scalar list element"
                    );
                }
            }
        }
    }
}

/// Walk `root` into its leaf documents; see [`Leaves`]
pub fn leaves(root: StructuredValue) -> Leaves {
    Leaves::new(root)
}
