//! Versioned JSON Schemas for LLM I/O documents, plus the structural
//! "repair" pass that tolerates LLMs omitting empty sections rather than
//! failing the whole extraction (spec §4.2).

mod registry;
mod repair;

pub use registry::SchemaRegistry;
pub use repair::repair_object;
