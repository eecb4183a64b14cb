pub mod drag;
pub mod picking;

pub use drag::*;
pub use picking::*;
