//! Storage backends for the menu tables (SQL, Memory).

pub mod traits;
pub mod memory;
pub mod sql;
