pub mod problem;
pub mod sprint;
pub mod story;

pub use problem::*;
pub use sprint::*;
pub use story::*;
