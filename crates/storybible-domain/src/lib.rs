//! Story Bible Domain Layer
//!
//! This crate holds the domain model shared by every other Story Bible crate:
//! the entity kinds a manuscript can contain, the generic entity record, the
//! per-kind descriptor table that drives creation and validation, and the
//! trait boundaries to LLM providers and key-value storage.
//!
//! ## Key Concepts
//!
//! - **Entity**: any trackable story element (character, location, ...)
//!   carrying provenance and a confidence score
//! - **Descriptor**: the per-kind table of label key, required fields and
//!   default sub-structure
//! - **Mention**: a located occurrence of an entity's name in source text
//! - **Source**: whether an entity was authored by hand, extracted by an LLM,
//!   or matched by the keyword fallback
//!
//! ## Architecture
//!
//! - No I/O, no network, no storage engine
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod entity;
pub mod id;
pub mod kind;
pub mod provenance;
pub mod traits;

// Re-exports for convenience
pub use descriptor::{
    build_record, deep_merge, descriptor, validate, KindDescriptor, ValidationError, ALLOWED_PRONOUNS,
};
pub use entity::{Entity, EntityError};
pub use id::EntityId;
pub use kind::EntityKind;
pub use provenance::{Mention, Source};
