//! # pair-core
//!
//! Pure logic for beampair (no I/O, instant tests).
//!
//! This crate implements beacon-to-peer matching and the pairing state
//! machine without any radio, network or clock access, enabling fast unit
//! tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`matcher::select`] maps an observation snapshot to a match or an error
//! - [`PairingMachine::apply`] maps one event to a list of [`Action`]s
//!
//! The actual I/O (ranging, discovery, sending profiles) is performed by
//! `pair-client`, which feeds events in one at a time and interprets the
//! actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod machine;
pub mod matcher;
pub mod observations;
pub mod state;

pub use machine::{
    Action, Event, Feed, PairingMachine, SessionEvent, SessionSnapshot, TriggerError,
};
pub use matcher::{closest_in_range, compare, select, Match, Preference};
pub use observations::Observations;
pub use state::{EnvironmentReading, Offer, Phase, SessionState};
