//! Diagnostics for the Notion side of the relay: token and page-id sanity
//! checks plus a handful of direct API calls.

pub mod checks;
pub mod commands;
