//! Core data types shared by the location and event crates.
//!
//! Everything here is plain data: positions, addresses, upload bodies,
//! session identity and the small status enums the components branch on.

pub mod enums;
pub mod location;
pub mod session;

pub use enums::*;
pub use location::*;
pub use session::*;
