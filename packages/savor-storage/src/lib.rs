pub mod payload;
pub mod qdrant;

mod error;

pub use error::{Error, Result};
pub use qdrant::{QdrantStore, VectorNamespace, point_id_for};
