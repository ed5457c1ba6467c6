// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SLP — Serial Link Protocol.
//!
//! Frames one datagram per call: 3-byte preamble, 7-byte header tail,
//! body, 2-byte trailing CRC. Bad frames (out-of-sync preamble, bad header
//! checksum, bad CRC, or a body addressed to a port/protocol we're not
//! bound to) are dropped silently and framing resumes from the next byte;
//! none of that surfaces as an error, only an overall timeout does.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::octet::crc;
use crate::octet::PortIo;

const PREAMBLE: [u8; 3] = [0xBE, 0xEF, 0xED];
const HEADER_LEN: usize = 10;
const CRC_LEN: usize = 2;

/// A symmetric SLP endpoint: protocol tag plus port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlpAddress {
    pub protocol: u8,
    pub port: u8,
}

/// Well-known protocol tags used on the wire.
pub mod protocol {
    pub const PADP: u8 = 2;
    pub const LOOPBACK: u8 = 3;
    pub const CMP: u8 = 1;
}

/// Per-connection SLP state: the bound local address, the last xid seen
/// (shared with PADP so ACKs echo the data frame's xid), and a demand-grown
/// input buffer for the body.
pub struct SlpLayer {
    local: SlpAddress,
    last_xid: u8,
    inbuf: Vec<u8>,
}

impl SlpLayer {
    #[must_use]
    pub fn new(local: SlpAddress) -> Self {
        Self {
            local,
            last_xid: 0,
            inbuf: Vec::new(),
        }
    }

    /// The xid of the most recently received frame, consumed by PADP to
    /// build a matching ACK.
    #[must_use]
    pub fn last_xid(&self) -> u8 {
        self.last_xid
    }

    /// Read one SLP frame addressed to our bound local address, retrying
    /// past malformed or misaddressed frames until `overall_timeout`
    /// elapses with nothing usable received.
    pub fn read<'a>(
        &'a mut self,
        io: &mut dyn PortIo,
        overall_timeout: Duration,
    ) -> Result<(u8, &'a [u8])> {
        let deadline = Instant::now() + overall_timeout;
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or(Error::Timeout)?;
            match self.try_read_one(io, remaining) {
                Ok(xid) => {
                    self.last_xid = xid;
                    return Ok((xid, &self.inbuf[..]));
                }
                Err(FrameDrop::Resync) => continue,
                Err(FrameDrop::Hard(e)) => return Err(e),
            }
        }
    }

    fn try_read_one(&mut self, io: &mut dyn PortIo, timeout: Duration) -> std::result::Result<u8, FrameDrop> {
        let header = read_header(io, timeout)?;

        let dest = header[3];
        let src = header[4];
        let proto = header[5];
        let size = u16::from_be_bytes([header[6], header[7]]) as usize;
        let xid = header[8];
        let checksum = header[9];

        let computed: u8 = header[..9].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        if computed != checksum {
            crate::warn!("SLP: bad header checksum, resyncing");
            return Err(FrameDrop::Resync);
        }

        self.inbuf.resize(size, 0);
        read_exact_timeout(io, &mut self.inbuf, timeout)?;

        let mut crc_buf = [0u8; CRC_LEN];
        read_exact_timeout(io, &mut crc_buf, timeout)?;

        let mut running = crc::crc16(&header);
        running = crc::crc16_update(running, &self.inbuf);
        running = crc::crc16_update(running, &crc_buf);
        if running != 0 {
            crate::warn!("SLP: bad CRC, resyncing");
            return Err(FrameDrop::Resync);
        }

        if dest != self.local.port || proto != self.local.protocol {
            crate::debug!("SLP: dropping frame for {src}/{proto}->{dest}, not our address");
            return Err(FrameDrop::Resync);
        }

        Ok(xid)
    }

    /// Write one SLP frame. `dest`/`proto` address the frame; `xid` must be
    /// the PADP xid this frame carries (PADP, not SLP, owns xid allocation).
    pub fn write(
        &self,
        io: &mut dyn PortIo,
        dest: SlpAddress,
        xid: u8,
        body: &[u8],
    ) -> Result<()> {
        let mut header = [0u8; HEADER_LEN];
        header[..3].copy_from_slice(&PREAMBLE);
        header[3] = dest.port;
        header[4] = self.local.port;
        header[5] = dest.protocol;
        header[6..8].copy_from_slice(&(body.len() as u16).to_be_bytes());
        header[8] = xid;
        header[9] = header[..9].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));

        let mut running = crc::crc16(&header);
        running = crc::crc16_update(running, body);

        io.write_all(&header)?;
        io.write_all(body)?;
        io.write_all(&running.to_be_bytes())?;
        Ok(())
    }
}

enum FrameDrop {
    /// Keep scanning for the next frame; doesn't consume the overall budget
    /// beyond the time already spent.
    Resync,
    Hard(Error),
}

impl From<Error> for FrameDrop {
    fn from(e: Error) -> Self {
        FrameDrop::Hard(e)
    }
}

/// Scan for the 3-byte preamble then read the remaining 7 header bytes,
/// sliding the window one byte at a time on a mismatch.
fn read_header(io: &mut dyn PortIo, timeout: Duration) -> std::result::Result<[u8; HEADER_LEN], FrameDrop> {
    let deadline = Instant::now() + timeout;
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0usize;
    loop {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .ok_or(Error::Timeout)?;
        let mut byte = [0u8; 1];
        let n = io.read_timeout(&mut byte, remaining)?;
        if n == 0 {
            continue;
        }
        let b = byte[0];
        if filled < 3 {
            if b == PREAMBLE[filled] {
                header[filled] = b;
                filled += 1;
            } else if b == PREAMBLE[0] {
                header[0] = b;
                filled = 1;
            } else {
                filled = 0;
            }
        } else {
            header[filled] = b;
            filled += 1;
            if filled == HEADER_LEN {
                return Ok(header);
            }
        }
    }
}

fn read_exact_timeout(io: &mut dyn PortIo, buf: &mut [u8], timeout: Duration) -> std::result::Result<(), FrameDrop> {
    let deadline = Instant::now() + timeout;
    let mut filled = 0;
    while filled < buf.len() {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .ok_or(Error::Timeout)?;
        let n = io.read_timeout(&mut buf[filled..], remaining)?;
        filled += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct FakePort {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
    }

    impl FakePort {
        fn new(bytes: &[u8]) -> Self {
            Self {
                inbound: bytes.iter().copied().collect(),
                outbound: Vec::new(),
            }
        }
    }

    impl PortIo for FakePort {
        fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
            if self.inbound.is_empty() {
                return Err(Error::Timeout);
            }
            let mut n = 0;
            while n < buf.len() {
                if let Some(b) = self.inbound.pop_front() {
                    buf[n] = b;
                    n += 1;
                } else {
                    break;
                }
            }
            Ok(n)
        }

        fn write_all(&mut self, buf: &[u8]) -> Result<()> {
            self.outbound.extend_from_slice(buf);
            Ok(())
        }

        fn set_speed(&mut self, _bps: u32) -> Result<()> {
            Ok(())
        }
    }

    fn frame_bytes(dest: u8, src: u8, proto: u8, xid: u8, body: &[u8]) -> Vec<u8> {
        let mut header = [0u8; HEADER_LEN];
        header[..3].copy_from_slice(&PREAMBLE);
        header[3] = dest;
        header[4] = src;
        header[5] = proto;
        header[6..8].copy_from_slice(&(body.len() as u16).to_be_bytes());
        header[8] = xid;
        header[9] = header[..9].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        let mut crc = crc::crc16(&header);
        crc = crc::crc16_update(crc, body);

        let mut out = header.to_vec();
        out.extend_from_slice(body);
        out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    #[test]
    fn read_valid_frame() {
        let local = SlpAddress { protocol: protocol::PADP, port: 3 };
        let bytes = frame_bytes(3, 1, protocol::PADP, 7, b"hello");
        let mut port = FakePort::new(&bytes);
        let mut slp = SlpLayer::new(local);

        let (xid, body) = slp.read(&mut port, Duration::from_millis(100)).unwrap();
        assert_eq!(xid, 7);
        assert_eq!(body, b"hello");
        assert_eq!(slp.last_xid(), 7);
    }

    #[test]
    fn garbage_only_stream_times_out() {
        let local = SlpAddress { protocol: protocol::PADP, port: 3 };
        let mut port = FakePort::new(&[0x00, 0x11, 0x22, 0x33, 0x44]);
        let mut slp = SlpLayer::new(local);
        let result = slp.read(&mut port, Duration::from_millis(5));
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[test]
    fn garbage_then_valid_frame_recovers() {
        let local = SlpAddress { protocol: protocol::PADP, port: 3 };
        let mut bytes = vec![0x00, 0xBE, 0x11, 0xBE, 0xEF, 0x00];
        bytes.extend(frame_bytes(3, 1, protocol::PADP, 9, b"abc"));
        let mut port = FakePort::new(&bytes);
        let mut slp = SlpLayer::new(local);

        let (xid, body) = slp.read(&mut port, Duration::from_millis(200)).unwrap();
        assert_eq!(xid, 9);
        assert_eq!(body, b"abc");
    }

    #[test]
    fn misaddressed_frame_is_dropped() {
        let local = SlpAddress { protocol: protocol::PADP, port: 3 };
        // Addressed to port 9, not our bound port 3 -- should be silently
        // discarded (this is how the device's loopback probe gets ignored).
        let mut bytes = frame_bytes(9, 1, protocol::PADP, 1, b"probe");
        bytes.extend(frame_bytes(3, 1, protocol::PADP, 2, b"real"));
        let mut port = FakePort::new(&bytes);
        let mut slp = SlpLayer::new(local);

        let (xid, body) = slp.read(&mut port, Duration::from_millis(200)).unwrap();
        assert_eq!(xid, 2);
        assert_eq!(body, b"real");
    }

    #[test]
    fn write_then_read_roundtrip() {
        let local_a = SlpAddress { protocol: protocol::PADP, port: 3 };
        let slp_writer = SlpLayer::new(local_a);
        let mut port = FakePort::new(&[]);
        slp_writer
            .write(&mut port, SlpAddress { protocol: protocol::PADP, port: 5 }, 42, b"payload")
            .unwrap();

        let written = port.outbound.clone();
        let mut reader_port = FakePort::new(&written);
        let mut slp_reader = SlpLayer::new(SlpAddress { protocol: protocol::PADP, port: 5 });
        let (xid, body) = slp_reader.read(&mut reader_port, Duration::from_millis(100)).unwrap();
        assert_eq!(xid, 42);
        assert_eq!(body, b"payload");
    }
}
