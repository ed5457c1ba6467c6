// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the ColdSync protocol stack and sync engine.

use crate::dlp::status::DlpStatus;

/// Every layer in the stack funnels its failures into one flat enum so the
/// sync engine can decide "retry/skip this database/abort the session" in
/// one place instead of threading per-layer error types up the call stack.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // I/O errors
    // ========================================================================
    /// Underlying serial I/O failed; fatal for the session.
    System(std::io::Error),
    /// No response arrived within the expected window.
    Timeout,
    /// Peer closed the connection.
    Eof,
    /// Peer sent ABORT, or we hit an unrecoverable framing error.
    Abort,
    /// Allocation failed while assembling a multi-fragment message.
    NoMem,

    // ========================================================================
    // Framing / wire-shape errors
    // ========================================================================
    /// An SLP or PADP identifier did not match what the protocol requires.
    BadId,
    /// A DLP argument id was malformed or out of the expected range.
    BadArgId,
    /// A PADP ACK carried an xid that did not match the outstanding request.
    AckXid,

    // ========================================================================
    // Protocol-level status
    // ========================================================================
    /// The device answered a DLP request with a non-`NoErr` status.
    DlpStatus(DlpStatus),

    // ========================================================================
    // Engine-level
    // ========================================================================
    /// The caller asked to stop between databases.
    Cancelled,
    /// A PDB file was truncated or had an inconsistent index.
    Corrupt(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::System(e) => write!(f, "I/O error: {e}"),
            Error::Timeout => write!(f, "timed out waiting for a response"),
            Error::Eof => write!(f, "peer closed the connection"),
            Error::Abort => write!(f, "peer aborted the transfer"),
            Error::NoMem => write!(f, "out of memory assembling a fragmented message"),
            Error::BadId => write!(f, "frame identifier out of protocol"),
            Error::BadArgId => write!(f, "malformed DLP argument id"),
            Error::AckXid => write!(f, "ACK xid did not match the outstanding request"),
            Error::DlpStatus(status) => write!(f, "device reported {status}: {}", status.describe()),
            Error::Cancelled => write!(f, "session cancelled"),
            Error::Corrupt(reason) => write!(f, "corrupt database: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::System(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Error::Timeout,
            std::io::ErrorKind::UnexpectedEof => Error::Eof,
            _ => Error::System(e),
        }
    }
}

/// Alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
