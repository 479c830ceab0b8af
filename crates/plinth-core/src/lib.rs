//! Core model and intrinsic function engine for the plinth blueprint compiler

pub mod document;
pub mod error;
pub mod functions;
pub mod plan;
pub mod scan;

pub use document::{Document, Mapping};
pub use error::{BlueprintError, ErrorCode};
pub use functions::Function;
pub use plan::{NodeMatch, NodeTemplate, Plan};
pub use scan::{scan_properties, Context, Provenance, Scope};
