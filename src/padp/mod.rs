// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PADP — Packet Assembly/Disassembly Protocol.
//!
//! Reliable, fragmented messages over SLP. PADP owns the xid counter for
//! the connection (SLP and PADP share one xid space — SLP only remembers
//! the xid of the last frame it handed back so PADP's ACK can echo it).

use std::time::Duration;

use crate::error::{Error, Result};
use crate::octet::PortIo;
use crate::slp::{SlpAddress, SlpLayer};

/// Per-fragment ACK wait. Typical value from the original protocol.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(2);
/// How long a partially-assembled multi-fragment message may sit idle.
pub const ASSEMBLY_TIMEOUT: Duration = Duration::from_secs(30);
/// Retransmit attempts before giving up on a fragment.
pub const MAX_RETRIES: u32 = 10;
/// Largest single fragment body; longer messages must be split.
pub const MAX_FRAGMENT: usize = 1024;
/// Largest message PADP will assemble.
pub const MAX_MESSAGE: usize = 64 * 1024;

mod frag_type {
    pub const DATA: u8 = 1;
    pub const ACK: u8 = 2;
    #[allow(dead_code)]
    pub const NAK: u8 = 3; // obsolete, never emitted
    pub const TICKLE: u8 = 4;
    pub const ABORT: u8 = 8;
}

mod flag {
    pub const FIRST: u8 = 0x80;
    pub const LAST: u8 = 0x40;
    pub const ERR_NO_MEM: u8 = 0x20;
    #[allow(dead_code)]
    pub const LONG_HEADER: u8 = 0x10;
}

struct FragHeader {
    kind: u8,
    flags: u8,
    size_or_offset: u16,
}

const FRAG_HEADER_LEN: usize = 4;

impl FragHeader {
    fn encode(&self) -> [u8; FRAG_HEADER_LEN] {
        let [hi, lo] = self.size_or_offset.to_be_bytes();
        [self.kind, self.flags, hi, lo]
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FRAG_HEADER_LEN {
            return Err(Error::BadId);
        }
        Ok(FragHeader {
            kind: bytes[0],
            flags: bytes[1],
            size_or_offset: u16::from_be_bytes([bytes[2], bytes[3]]),
        })
    }
}

/// The PADP layer: owns the xid counter and drives SLP underneath.
pub struct PadpLayer {
    remote: SlpAddress,
    xid: u8,
    ack_timeout: Duration,
    assembly_timeout: Duration,
    max_retries: u32,
}

impl PadpLayer {
    #[must_use]
    pub fn new(remote: SlpAddress) -> Self {
        // 0 and 0xff are reserved; start just past 0 so the first
        // increment lands on a usable value.
        Self {
            remote,
            xid: 0,
            ack_timeout: ACK_TIMEOUT,
            assembly_timeout: ASSEMBLY_TIMEOUT,
            max_retries: MAX_RETRIES,
        }
    }

    /// Build a layer whose per-fragment timeouts and retry budget are
    /// overridden from the connection's config instead of the protocol's
    /// typical defaults (spec.md §5's timeouts are "typical", not fixed).
    #[must_use]
    pub fn with_timing(remote: SlpAddress, ack_timeout: Duration, assembly_timeout: Duration, max_retries: u32) -> Self {
        Self { remote, xid: 0, ack_timeout, assembly_timeout, max_retries }
    }

    fn next_xid(&mut self) -> u8 {
        loop {
            self.xid = self.xid.wrapping_add(1);
            if self.xid != 0x00 && self.xid != 0xff {
                return self.xid;
            }
        }
    }

    /// Send one logical message, fragmenting if it exceeds `MAX_FRAGMENT`.
    pub fn write(&mut self, io: &mut dyn PortIo, slp: &mut SlpLayer, body: &[u8]) -> Result<()> {
        if body.is_empty() {
            return self.write_fragment(io, slp, body, true, true, 0);
        }
        let mut offset = 0;
        while offset < body.len() {
            let end = (offset + MAX_FRAGMENT).min(body.len());
            let is_first = offset == 0;
            let is_last = end == body.len();
            let chunk = &body[offset..end];
            let size_or_offset = if is_first { body.len() as u16 } else { offset as u16 };
            self.write_fragment(io, slp, chunk, is_first, is_last, size_or_offset)?;
            offset = end;
        }
        Ok(())
    }

    fn write_fragment(
        &mut self,
        io: &mut dyn PortIo,
        slp: &mut SlpLayer,
        chunk: &[u8],
        is_first: bool,
        is_last: bool,
        size_or_offset: u16,
    ) -> Result<()> {
        let xid = self.next_xid();
        let mut flags = 0u8;
        if is_first {
            flags |= flag::FIRST;
        }
        if is_last {
            flags |= flag::LAST;
        }
        let header = FragHeader {
            kind: frag_type::DATA,
            flags,
            size_or_offset,
        };

        let mut frame = Vec::with_capacity(FRAG_HEADER_LEN + chunk.len());
        frame.extend_from_slice(&header.encode());
        frame.extend_from_slice(chunk);

        let mut retries = 0;
        loop {
            slp.write(io, self.remote, xid, &frame)?;
            match self.await_ack(io, slp, xid) {
                Ok(()) => return Ok(()),
                Err(Error::Timeout) => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(Error::Timeout);
                    }
                    crate::warn!("PADP: ack timeout, retry {retries}/{}", self.max_retries);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait for an ACK matching `xid`. TICKLEs reset the timeout without
    /// consuming a retry; ABORT surfaces as `Error::Abort`.
    fn await_ack(&mut self, io: &mut dyn PortIo, slp: &mut SlpLayer, xid: u8) -> Result<()> {
        loop {
            let (recv_xid, body) = slp.read(io, self.ack_timeout)?;
            let header = FragHeader::decode(body)?;
            match header.kind {
                frag_type::TICKLE => continue,
                frag_type::ABORT => return Err(Error::Abort),
                frag_type::ACK if recv_xid == xid => return Ok(()),
                frag_type::ACK => return Err(Error::AckXid),
                _ => return Err(Error::BadId),
            }
        }
    }

    /// Receive one logical message, reassembling fragments as needed.
    pub fn read(&mut self, io: &mut dyn PortIo, slp: &mut SlpLayer) -> Result<Vec<u8>> {
        let mut assembly: Option<Vec<u8>> = None;
        let mut total_len = 0usize;

        loop {
            let timeout = if assembly.is_some() { self.assembly_timeout } else { self.ack_timeout };
            let (xid, frame) = slp.read(io, timeout)?;
            let header = FragHeader::decode(frame)?;
            let payload = &frame[FRAG_HEADER_LEN..];

            match header.kind {
                frag_type::TICKLE => continue,
                frag_type::ABORT => return Err(Error::Abort),
                frag_type::ACK => return Err(Error::BadId),
                frag_type::DATA => {}
                _ => return Err(Error::BadId),
            }

            let first = header.flags & flag::FIRST != 0;
            let last = header.flags & flag::LAST != 0;

            if first && last {
                self.send_ack(io, slp, xid, header.flags, header.size_or_offset)?;
                return Ok(payload.to_vec());
            }

            if first {
                total_len = header.size_or_offset as usize;
                if total_len > MAX_MESSAGE {
                    self.send_ack_no_mem(io, slp, xid)?;
                    return Err(Error::NoMem);
                }
                let mut buf = Vec::with_capacity(total_len);
                buf.extend_from_slice(payload);
                assembly = Some(buf);
                self.send_ack(io, slp, xid, header.flags, header.size_or_offset)?;
                continue;
            }

            // Continuation fragment: size_or_offset is the cumulative
            // offset this fragment starts at.
            match assembly.as_mut() {
                Some(buf) => {
                    if header.size_or_offset as usize != buf.len() {
                        return Err(Error::BadId);
                    }
                    buf.extend_from_slice(payload);
                    self.send_ack(io, slp, xid, header.flags, header.size_or_offset)?;
                    if last {
                        let _ = total_len;
                        return Ok(assembly.take().unwrap());
                    }
                }
                None => return Err(Error::BadId),
            }
        }
    }

    fn send_ack(
        &self,
        io: &mut dyn PortIo,
        slp: &mut SlpLayer,
        xid: u8,
        flags: u8,
        size_or_offset: u16,
    ) -> Result<()> {
        let header = FragHeader {
            kind: frag_type::ACK,
            flags,
            size_or_offset,
        };
        slp.write(io, self.remote, xid, &header.encode())
    }

    fn send_ack_no_mem(&self, io: &mut dyn PortIo, slp: &mut SlpLayer, xid: u8) -> Result<()> {
        let header = FragHeader {
            kind: frag_type::ACK,
            flags: flag::ERR_NO_MEM,
            size_or_offset: 0,
        };
        slp.write(io, self.remote, xid, &header.encode())
    }
}
