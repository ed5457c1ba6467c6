// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `PConnection`: owns the serial descriptor and every layer's state, and
//! enforces construct/teardown order (§3). Construction order is
//! octet -> SLP -> PADP; teardown is the reverse (DLP has no persistent
//! state of its own, so there is nothing to tear down above PADP).

use std::time::Duration;

use crate::cmp;
use crate::dlp::DlpSession;
use crate::error::Result;
use crate::octet::PortIo;
use crate::padp::PadpLayer;
use crate::slp::{protocol, SlpAddress, SlpLayer};

/// The handful of knobs the core itself needs; the on-disk config file
/// format stays with the external collaborator (spec.md §1).
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// Force a specific line speed instead of negotiating the fastest one
    /// the speed table and the platform agree on.
    pub override_bps: Option<u32>,
    /// Per-fragment PADP ACK timeout.
    pub ack_timeout: Duration,
    /// Multi-fragment assembly idle timeout.
    pub assembly_timeout: Duration,
    /// PADP retransmit attempts before giving up.
    pub max_retries: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            override_bps: None,
            ack_timeout: crate::padp::ACK_TIMEOUT,
            assembly_timeout: crate::padp::ASSEMBLY_TIMEOUT,
            max_retries: crate::padp::MAX_RETRIES,
        }
    }
}

/// Owns the serial fd (through a [`PortIo`]) plus SLP and PADP state for
/// one sync session. DLP has no state of its own beyond a borrow of this
/// connection's `io`/`slp`/`padp` for the duration of each call.
pub struct PConnection {
    io: Box<dyn PortIo>,
    slp: SlpLayer,
    padp: PadpLayer,
}

impl PConnection {
    /// Build a connection bound to `local`/`remote` SLP addresses over an
    /// already-open `io`. Device discovery and fd opening are the external
    /// collaborator's job (spec.md §1); this just takes ownership of the
    /// byte stream.
    #[must_use]
    pub fn new(io: Box<dyn PortIo>, local: SlpAddress, remote: SlpAddress) -> Self {
        Self::with_config(io, local, remote, &ConnectionConfig::default())
    }

    /// As [`Self::new`], but with PADP's ACK/assembly timeouts and retry
    /// budget overridden from `config` instead of the protocol's typical
    /// defaults.
    #[must_use]
    pub fn with_config(io: Box<dyn PortIo>, local: SlpAddress, remote: SlpAddress, config: &ConnectionConfig) -> Self {
        PConnection {
            io,
            slp: SlpLayer::new(local),
            padp: PadpLayer::with_timing(remote, config.ack_timeout, config.assembly_timeout, config.max_retries),
        }
    }

    /// Convenience constructor binding the conventional PADP port on both
    /// ends, which is all a single coldsync session ever needs.
    #[must_use]
    pub fn new_padp(io: Box<dyn PortIo>, local_port: u8, remote_port: u8) -> Self {
        Self::new(
            io,
            SlpAddress { protocol: protocol::PADP, port: local_port },
            SlpAddress { protocol: protocol::PADP, port: remote_port },
        )
    }

    /// As [`Self::new_padp`], but applying `config`'s PADP timing overrides.
    #[must_use]
    pub fn new_padp_with_config(io: Box<dyn PortIo>, local_port: u8, remote_port: u8, config: &ConnectionConfig) -> Self {
        Self::with_config(
            io,
            SlpAddress { protocol: protocol::PADP, port: local_port },
            SlpAddress { protocol: protocol::PADP, port: remote_port },
            config,
        )
    }

    /// Run the CMP handshake: wait for WAKEUP, negotiate a speed, switch
    /// the line. Must be the first thing done on a fresh connection.
    pub fn handshake(&mut self, config: &ConnectionConfig) -> Result<u32> {
        cmp::handshake(&mut *self.io, &mut self.slp, &mut self.padp, config.override_bps)
    }

    /// Borrow a [`DlpSession`] over this connection's layers for one or
    /// more DLP calls. There is exactly one in-flight transaction at a
    /// time (§5), so this takes `&mut self`.
    pub fn dlp(&mut self) -> DlpSession<'_> {
        DlpSession::new(&mut *self.io, &mut self.slp, &mut self.padp)
    }

    /// Tear down in reverse layer order: DLP has already gone out of
    /// scope by the time this runs (it only ever borrowed), so this is
    /// PADP/SLP state drop followed by closing the fd.
    pub fn close(self) {
        // `io`'s Drop (if any) runs here; SLP/PADP hold no OS resources of
        // their own, only buffers, so there is nothing else to release.
    }
}
