//! Domain values shared by the engine, the parsers and the data sources.
//!
//! All values are immutable snapshots built fresh for every query.

pub mod glucose;
pub mod profile;
pub mod treatment;
pub mod window;

pub use glucose::*;
pub use profile::*;
pub use treatment::*;
pub use window::*;
