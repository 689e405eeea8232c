//! Output formatting for reconciliation results.
//!
//! - [`terminal`] - Human readable, coloured summaries

mod terminal;

pub use terminal::{
    color_state, format_peering, format_route, format_route_table, print_peering_outcome,
};
