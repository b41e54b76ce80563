//! Ingestion boundary
//!
//! Recording tables arrive as wide CSV exports whose channel families are
//! recognised by naming convention only. This module owns that convention and
//! the table type every computation reads from.

mod channels;
mod table;

pub use channels::*;
pub use table::*;
