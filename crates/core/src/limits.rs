//! Document limits
//!
//! Leaf documents are checked against these limits before they become write
//! instructions. They bound resource use; they are not schema validation, so
//! field names and value types are never inspected.

use crate::value::Document;
use crate::StructuredValue;
use thiserror::Error;

/// Maximum nesting depth of a leaf document (100 levels)
pub const MAX_NESTING_DEPTH: usize = 100;

/// Maximum serialized document size in bytes (16 MB)
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Error type for document limit violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LimitError {
    /// Document nesting exceeds maximum depth
    #[error("document nesting depth {depth} exceeds maximum of {max} levels")]
    NestingTooDeep {
        /// Actual nesting depth
        depth: usize,
        /// Maximum allowed depth
        max: usize,
    },

    /// Document exceeds maximum size
    #[error("document size {size} exceeds maximum of {max} bytes")]
    DocumentTooLarge {
        /// Actual document size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },
}

/// Limits applied to leaf documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth (default: 100)
    pub max_nesting_depth: usize,
    /// Maximum serialized size in bytes (default: 16MB)
    pub max_document_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_nesting_depth: MAX_NESTING_DEPTH,
            max_document_bytes: MAX_DOCUMENT_SIZE,
        }
    }
}

impl Limits {
    /// Create limits with small values for testing
    pub fn with_small_limits() -> Self {
        Limits {
            max_nesting_depth: 4,
            max_document_bytes: 256,
        }
    }

    /// Validate one leaf document
    ///
    /// Depth is checked first because it is cheap; size requires
    /// serializing the document.
    pub fn validate(&self, doc: &Document) -> Result<(), LimitError> {
        // The document itself is one level
        let depth = 1 + doc
            .values()
            .map(StructuredValue::nesting_depth)
            .max()
            .unwrap_or(0);
        if depth > self.max_nesting_depth {
            return Err(LimitError::NestingTooDeep {
                depth,
                max: self.max_nesting_depth,
            });
        }

        let size = serde_json::to_vec(doc).map(|b| b.len()).unwrap_or(0);
        if size > self.max_document_bytes {
            return Err(LimitError::DocumentTooLarge {
                size,
                max: self.max_document_bytes,
            });
        }

        Ok(())
    }
}
