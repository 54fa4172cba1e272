pub mod xml;

pub use self::xml::{
    parse_calculation_linkbase, parse_instance, parse_presentation_linkbase, parse_schema_roles,
    Instance,
};
