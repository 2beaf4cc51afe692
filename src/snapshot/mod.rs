pub mod schema;
pub mod source;

pub use schema::extract_listings;
pub use source::{HttpSnapshotSource, SnapshotSource};
