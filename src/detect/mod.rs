mod backend;
mod backends;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::ScriptedBackend;
pub use registry::BackendRegistry;
pub use result::{BoundingBox, Detection};
