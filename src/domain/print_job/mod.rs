pub mod options;
pub mod job;

pub use options::*;
pub use job::*;
