//! Native module contains implementations of core traits that drive host
//! toolchains directly as child processes, without any sandbox.

pub mod executor;
pub mod platform;
pub mod probe;
pub mod workspace;
