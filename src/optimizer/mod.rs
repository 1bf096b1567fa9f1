pub mod builder;
pub mod model;
pub mod strategies;
pub mod types;

pub use builder::*;
pub use model::*;
pub use strategies::*;
pub use types::*;
