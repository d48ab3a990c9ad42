pub mod analysis;
pub mod paper;
pub mod summary;
