//! Text rendering of snapshots.

pub mod table;

pub use table::render_table;
