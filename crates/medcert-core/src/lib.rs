//! medcert-core
//!
//! Domain types, field names and validators for the homologation
//! declaration workflow. Storage and rendering crates build on these.

pub mod error;
pub mod fields;
pub mod models;
pub mod validate;
