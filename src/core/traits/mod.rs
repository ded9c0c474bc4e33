pub mod executor;
pub mod probe;
