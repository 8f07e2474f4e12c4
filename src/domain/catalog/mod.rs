pub mod attributes;
pub mod value_objects;
pub mod errors;

pub use attributes::*;
pub use value_objects::*;
pub use errors::*;
