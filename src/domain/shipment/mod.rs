pub mod value_objects;
pub mod status_mapping;
pub mod tracking;

pub use value_objects::*;
pub use status_mapping::*;
pub use tracking::*;
