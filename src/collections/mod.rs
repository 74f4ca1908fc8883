//! Domain collections layered on the record store core.
//!
//! One module per collection. Each owns its record schema, validation, and
//! operations, plus a clap subcommand surface and a `schema()` descriptor
//! for discovery.

pub mod audit;
pub mod issues;
pub mod knowledge;
pub mod objectives;
pub mod roles;
pub mod tasks;
pub mod users;
