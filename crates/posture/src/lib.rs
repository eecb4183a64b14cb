pub mod anchor;
pub mod solver;
pub mod topology;

pub use anchor::*;
pub use solver::*;
pub use topology::*;
