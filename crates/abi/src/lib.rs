//! ABI type descriptors and advisory input validation for zkplay.
//!
//! The engine describes a compiled program's inputs as an ordered list of
//! named type descriptors. This crate turns that ABI into per-input
//! validation rules ([`SchemaBuilder`]), turns free-text user input into
//! candidate argument values ([`coerce`]), and checks those values against
//! the rules ([`ValidationRule::validate`]). Verdicts are advisory: the
//! engine performs the authoritative check when the program runs.

pub mod binding;
pub mod coerce;
pub mod descriptor;
mod error;
pub mod schema;
pub mod validate;

pub use binding::{InputBinding, InputSet};
pub use coerce::{coerce, CandidateValue};
pub use descriptor::{Abi, AbiInput, StructMember, TypeDescriptor, UintWidth};
pub use error::SchemaError;
pub use schema::{SchemaBuilder, ValidationRule};
pub use validate::Verdict;
