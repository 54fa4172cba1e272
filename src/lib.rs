pub mod core;
pub mod statements;
pub mod xbrl;

// Re-exports
pub use crate::core::config::ExtractorConfig;
pub use crate::core::error::{LookupError, StructuralError};
pub use statements::{Financials, Root, Statement};
pub use xbrl::document::{FilingDocuments, TaxonomySource};
