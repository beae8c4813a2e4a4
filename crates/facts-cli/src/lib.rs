//! Game and modpack fact resolution.
//!
//! - `name_resolver`: best-effort expansion of abbreviated queries.
//! - `providers`: Steam Store, Modrinth, and CurseForge search adapters.
//! - `normalize`: raw provider payloads into `Fact` records, NotFound payloads.
//! - `resolver`: the fixed-priority fallback waterfall.

pub mod config;
pub mod error;
pub mod gemini;
pub mod model;
pub mod name_resolver;
pub mod normalize;
pub mod providers;
pub mod resolver;
