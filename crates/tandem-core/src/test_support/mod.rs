//! Test doubles shared by this crate's tests and downstream crates
//! (enable the `test-utils` feature).

mod handlers;

pub use handlers::{Journal, RecordingHandler};
