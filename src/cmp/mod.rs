// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CMP — Connection Management Protocol.
//!
//! The one-shot speed-negotiation handshake that runs once per session,
//! directly over PADP: wait for the device's WAKEUP, reply with an INIT
//! naming the rate we want, then reconfigure the line to match.

use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::octet::{negotiate_speed, PortIo};
use crate::padp::PadpLayer;
use crate::slp::SlpLayer;

const PACKET_LEN: usize = 10;

/// Grace period between sending INIT and switching the line speed, so the
/// device has time to see the reply before we start talking at a new rate.
const SPEED_SWITCH_DELAY: Duration = Duration::from_millis(300);

mod packet_type {
    pub const WAKEUP: u8 = 1;
    pub const INIT: u8 = 2;
    pub const ABORT: u8 = 3;
    pub const EXTENDED: u8 = 4;
}

/// `INIT`'s flag requesting the peer switch to the carried rate.
pub const CHANGE_RATE: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmpPacket {
    pub kind: u8,
    pub flags: u8,
    pub v_major: u8,
    pub v_minor: u8,
    pub rate: u32,
}

impl CmpPacket {
    fn encode(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        out[0] = self.kind;
        out[1] = self.flags;
        out[2] = self.v_major;
        out[3] = self.v_minor;
        // bytes 4..6 reserved, left zero
        out[6..10].copy_from_slice(&self.rate.to_be_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PACKET_LEN {
            return Err(Error::BadId);
        }
        Ok(CmpPacket {
            kind: bytes[0],
            flags: bytes[1],
            v_major: bytes[2],
            v_minor: bytes[3],
            rate: u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
        })
    }
}

/// Run the handshake: wait for WAKEUP, reply INIT at `override_bps` (or the
/// fastest rate our speed table supports), switch the line, and return the
/// rate now in effect.
pub fn handshake(
    io: &mut dyn PortIo,
    slp: &mut SlpLayer,
    padp: &mut PadpLayer,
    override_bps: Option<u32>,
) -> Result<u32> {
    loop {
        let body = padp.read(io, slp)?;
        let packet = CmpPacket::decode(&body)?;
        match packet.kind {
            packet_type::WAKEUP => {
                let rate = negotiate_speed(override_bps);
                let reply = CmpPacket {
                    kind: packet_type::INIT,
                    flags: CHANGE_RATE,
                    v_major: packet.v_major,
                    v_minor: packet.v_minor,
                    rate,
                };
                padp.write(io, slp, &reply.encode())?;
                thread::sleep(SPEED_SWITCH_DELAY);
                io.set_speed(rate)?;
                crate::info!("CMP: handshake complete at {rate} bps");
                return Ok(rate);
            }
            packet_type::ABORT => return Err(Error::Abort),
            packet_type::EXTENDED => continue,
            _ => continue,
        }
    }
}
