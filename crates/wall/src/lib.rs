pub mod cache;
pub mod mapper;
pub mod mesh;
pub mod model;
pub mod placement;
pub mod spine;

pub use cache::*;
pub use mapper::*;
pub use mesh::*;
pub use model::*;
pub use placement::*;
pub use spine::*;
