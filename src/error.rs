//! Error types for the Nodal analysis engine.
//!
//! This module provides a unified error type [`NodalError`] that covers
//! the error conditions that can occur while loading a schematic snapshot,
//! configuring the engine, and solving the MNA system.
//!
//! Only [`NodalError::SingularMatrix`] can come out of a solve. Everything
//! else is raised before the engine ever sees the snapshot.

use thiserror::Error;

/// Result type alias using [`NodalError`].
pub type Result<T> = std::result::Result<T, NodalError>;

/// Unified error type for all Nodal operations.
#[derive(Error, Debug)]
pub enum NodalError {
    // ============ Input Model Errors ============
    /// Element lists the wrong number of terminals for its kind
    #[error("Invalid element '{element}': {message}")]
    InvalidElement { element: String, message: String },

    /// Engine configuration value is out of range
    #[error("Invalid engine configuration: {message}")]
    InvalidConfig { message: String },

    // ============ Solve Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix - circuit has contradictory voltage constraints or no unique solution")]
    SingularMatrix,

    // ============ I/O Errors ============
    /// Error reading schematic file
    #[error("Failed to read schematic file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Schematic or result JSON could not be (de)serialized
    #[error("Schematic format error: {source}")]
    SchematicFormat {
        #[from]
        source: serde_json::Error,
    },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl NodalError {
    /// Create an invalid element error
    pub fn invalid_element(element: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidElement {
            element: element.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error is the singular-system outcome of a solve.
    pub fn is_singular(&self) -> bool {
        matches!(self, Self::SingularMatrix)
    }
}
