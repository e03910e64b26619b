//! MCP tools for gydnc: a read verb (list/get) and a write verb
//! (create/update), each with an `operation` discriminator.

pub mod read;
pub mod write;

pub use read::{ReadOutput, ReadParams, handle_read};
pub use write::{WriteOutput, WriteParams, handle_write};
