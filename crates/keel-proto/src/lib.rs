// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! keel-proto: wire schema for Keel sessions.
//!
//! Three small layers, none of which touch the simulation kernel:
//! - [`value`] — a self-describing tagged binary codec for JSON-shaped
//!   values, used for player inputs and small envelopes.
//! - [`wire`] — `[1-byte type][payload]` session messages (tick streams,
//!   snapshots, room bookkeeping).
//! - [`client`] — FNV-1a abbreviation of string client ids plus the reverse
//!   lookup table peers keep.
//!
//! Everything is little-endian on the wire. Decoding is strict: truncated
//! payloads are errors, and an unknown value tag decodes as null rather than
//! guessing a width.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

pub mod client;
pub mod value;
pub mod wire;

pub use client::{client_hash, ClientHashRegistry};
pub use value::{DecodeError, Value};
pub use wire::{
    HistoryFrame, InitialStateMessage, Message, SendSnapshotMessage, TickInput, TickMessage,
};
