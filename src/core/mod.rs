pub mod bounds;
pub mod parameters;

pub use bounds::{Bounds, project, project1};
pub use parameters::{Parameter, ParameterId, ParameterSet};
