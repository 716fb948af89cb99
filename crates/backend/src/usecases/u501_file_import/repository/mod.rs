pub mod rows;
pub mod sessions;
