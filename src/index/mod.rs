pub mod handle;
pub mod registry;
pub mod schema;

pub use handle::{IndexHandle, IndexState};
pub use registry::IndexRegistry;
pub use schema::IndexSchema;
