//! superzap - Control-card byte patcher
//!
//! This library provides the card interpreter used by the `szap` binary:
//! hex operand decoding, target switching, and the verify/replace gate.

pub mod app;
pub mod buffer;
pub mod encoding;
pub mod ui;
