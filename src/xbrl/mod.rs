pub mod document;
pub mod filing;
pub mod parser;
pub mod types;

pub use document::{FilingDocuments, TaxonomySource};
pub use types::{CalculationArc, Concept, Context, Fact, Period, RoleType};
