//! Domain models for the lab-flags system.

mod classification;
mod exam;
mod patient;

pub use classification::*;
pub use exam::*;
pub use patient::*;
