pub mod backup;
pub mod core;
pub mod courses;
pub mod stats;
pub mod students;
