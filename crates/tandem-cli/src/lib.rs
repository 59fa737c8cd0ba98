//! Command-line front end for Tandem.
//!
//! `tandem watch` follows a markdown vault and keeps `Status` and `Done` in
//! step as files change; `tandem check` and `tandem reconcile` work on the
//! vault as it is now.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
