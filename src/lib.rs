//! A translation layer between a BLE link-layer controller and a direction-finding application.
//!
//! Controllers that support Constant Tone Extension (CTE) IQ sampling deliver their sample
//! reports as fixed-size HCI event records. A single sample buffer frequently does not fit one
//! transport frame, so the controller splits it across several "extended" report records that
//! carry a fragment index instead of a byte offset. This crate consumes those raw records,
//! reassembles the fragmented IQ reports, resolves the antenna-pattern length that the wire
//! events do not repeat, and hands complete, self-contained events to a single registered
//! application handler.
//!
//! # Using the crate
//!
//! The crate is runtime and hardware-agnostic: it does not know how HCI packets reach the
//! process. You provide two seams:
//! * A [`CommandTransport`] that submits encoded HCI command packets to the controller.
//! * An [`EventHandler`] that receives the translated [`DfEvent`]s.
//!
//! All entry points are synchronous and run to completion; see [`DfHost`] for the event entry
//! points and the direction-finding command wrappers.
//!
//! [`CommandTransport`]: hci/command/trait.CommandTransport.html
//! [`EventHandler`]: df/trait.EventHandler.html
//! [`DfEvent`]: df/enum.DfEvent.html
//! [`DfHost`]: df/struct.DfHost.html

// We're `#[no_std]`, except when we're testing
#![cfg_attr(not(test), no_std)]
// Deny a few warnings in doctests, since rustdoc `allow`s many warnings by default
#![doc(test(attr(deny(unused_imports, unused_must_use))))]
#![warn(rust_2018_idioms)]

#[macro_use]
mod log;
#[macro_use]
mod utils;
pub mod bytes;
pub mod df;
mod error;
pub mod hci;

pub use self::error::Error;
pub use self::utils::Hex;
