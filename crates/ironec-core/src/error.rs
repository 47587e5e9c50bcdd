//! Core error types for ironec-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! the failure modes of the core data model.

use crate::id::{NodeId, PouId, TypeId};
use thiserror::Error;

/// Core errors produced by the ironec-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Attempting to register a type name that already exists in the table.
    #[error("duplicate type name: '{name}'")]
    DuplicateTypeName { name: String },

    /// A TypeId was not found in the type table.
    #[error("type not found: {id}")]
    TypeNotFound { id: TypeId },

    /// A node index was not found in the AST arena.
    #[error("node not found: NodeId({id})")]
    NodeNotFound { id: NodeId },

    /// A POU declaration id was not found in the library.
    #[error("POU not found: PouId({id})")]
    PouNotFound { id: PouId },
}
