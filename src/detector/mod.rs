pub mod diff;

pub use diff::new_listings;
