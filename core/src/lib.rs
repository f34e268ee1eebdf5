//! Tessera Core Types
//!
//! This crate provides the foundational types used throughout Tessera:
//! - Identity types (ElementId, EntityId, TempId, EntityRef, Identity)
//! - Transaction time (TxTime)
//! - Attribute names and the reserved graph meta model
//! - Value types (the Value enum stored in facts)
//! - Facts and the statements submitted to a fact store
//! - Common error types

mod attribute;
mod error;
mod fact;
mod id;
mod value;

pub use attribute::*;
pub use error::*;
pub use fact::*;
pub use id::*;
pub use value::*;
