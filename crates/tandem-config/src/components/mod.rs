//! Component-specific configuration sections

pub mod bus;
pub mod fields;
pub mod locations;
pub mod status;
pub mod sync;

pub use bus::*;
pub use fields::*;
pub use locations::*;
pub use status::*;
pub use sync::*;
