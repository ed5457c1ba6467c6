// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `coldsync-core`: the wire-protocol stack and sync engine for talking to
//! a PalmOS PDA over a point-to-point serial line.
//!
//! This crate implements exactly one PDA<->desktop session, from the
//! moment a serial file descriptor is handed to it until that session
//! ends: the four nested framing protocols (SLP/PADP/CMP/DLP), the PDB/PRC
//! on-disk database format, and the record-level synchronization engine
//! (backup, slow-sync, fast-sync). Device discovery, serial port
//! enumeration, conduit/plugin dispatch, configuration file parsing, and
//! any GUI are left to an external collaborator; this crate is reached
//! only through the entry points re-exported below.

pub mod atomic_write;
pub mod cmp;
pub mod connection;
pub mod dlp;
pub mod error;
pub mod logging;
pub mod octet;
pub mod padp;
pub mod pdb;
pub mod slp;
pub mod sync;
pub mod time;

pub use connection::{ConnectionConfig, PConnection};
pub use error::{Error, Result};
pub use pdb::{PdbDatabase, PdbRecord, PdbResource};
pub use sync::{CancellationToken, SessionLog, SyncMode};

/// Crate version, exposed so a collaborator can log it alongside the
/// device's `ReadSysInfo` response without reaching into `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
