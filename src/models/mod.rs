//! Domain model module declarations.

pub mod envelope;
pub mod session;
pub mod task;
