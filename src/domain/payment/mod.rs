pub mod value_objects;
pub mod errors;
pub mod aggregate;
pub mod webhook;

pub use value_objects::*;
pub use errors::*;
pub use aggregate::*;
pub use webhook::*;
