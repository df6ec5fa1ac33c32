//! Interfaces for defining transforms

mod errors;
pub use errors::*;

mod transform;
pub use transform::*;

mod dispatcher;
pub use dispatcher::*;
