// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared fixtures for driving the protocol stack end to end without a real
//! serial line: an in-memory duplex byte pipe, and a scripted "device"
//! thread that answers a fixed sequence of DLP requests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use coldsync_core::dlp::status::DlpStatus;
use coldsync_core::error::{Error, Result};
use coldsync_core::octet::crc::{crc16, crc16_update};
use coldsync_core::octet::PortIo;
use coldsync_core::padp::PadpLayer;
use coldsync_core::slp::{protocol, SlpAddress, SlpLayer};

#[derive(Default)]
struct Pipe {
    buf: Mutex<VecDeque<u8>>,
    cv: Condvar,
}

impl Pipe {
    fn push(&self, bytes: &[u8]) {
        let mut buf = self.buf.lock().unwrap();
        buf.extend(bytes.iter().copied());
        self.cv.notify_all();
    }

    fn pull(&self, out: &mut [u8], timeout: Duration) -> Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut buf = self.buf.lock().unwrap();
        loop {
            if !buf.is_empty() {
                let n = out.len().min(buf.len());
                for slot in out.iter_mut().take(n) {
                    *slot = buf.pop_front().unwrap();
                }
                return Ok(n);
            }
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(d) => d,
                None => return Err(Error::Timeout),
            };
            let (guard, timed_out) = self.cv.wait_timeout(buf, remaining).unwrap();
            buf = guard;
            if timed_out.timed_out() && buf.is_empty() {
                return Err(Error::Timeout);
            }
        }
    }
}

/// One end of an in-memory duplex pipe standing in for an open serial fd.
pub struct PipePort {
    outgoing: Arc<Pipe>,
    incoming: Arc<Pipe>,
}

impl PortIo for PipePort {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.incoming.pull(buf, timeout)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.outgoing.push(buf);
        Ok(())
    }

    fn set_speed(&mut self, _bps: u32) -> Result<()> {
        Ok(())
    }
}

/// A pair of connected `PipePort`s: whatever one writes, the other reads.
pub fn duplex_pair() -> (PipePort, PipePort) {
    let a_to_b = Arc::new(Pipe::default());
    let b_to_a = Arc::new(Pipe::default());
    let client = PipePort { outgoing: Arc::clone(&a_to_b), incoming: Arc::clone(&b_to_a) };
    let device = PipePort { outgoing: b_to_a, incoming: a_to_b };
    (client, device)
}

/// One request/response pair the scripted device answers, in the order the
/// client is expected to issue them.
pub struct Exchange {
    pub opcode: u8,
    pub status: DlpStatus,
    pub args: Vec<(u8, Vec<u8>)>,
}

impl Exchange {
    #[must_use]
    pub fn ok(opcode: u8, args: Vec<(u8, Vec<u8>)>) -> Self {
        Exchange { opcode, status: DlpStatus::NoErr, args }
    }

    #[must_use]
    pub fn status(opcode: u8, status: DlpStatus) -> Self {
        Exchange { opcode, status, args: Vec::new() }
    }
}

fn encode_response(opcode: u8, status: DlpStatus, args: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut body = vec![opcode | 0x80, args.len() as u8];
    body.extend_from_slice(&status.to_wire().to_be_bytes());
    for (id, data) in args {
        // Tiny argument form only: every canned response here is well
        // under the 255-byte/0x3F-id threshold that would require the
        // long form.
        body.push(*id);
        body.push(data.len() as u8);
        body.extend_from_slice(data);
    }
    body
}

/// Run the device side of a scripted DLP exchange on a background thread:
/// read one request per `Exchange`, assert its opcode matches, and answer
/// with the canned response. Panics (on the device thread) on any mismatch
/// or transport error, which fails the test via the `join()` in
/// [`run_scripted_session`].
pub fn spawn_device(io: PipePort, local: SlpAddress, remote: SlpAddress, script: Vec<Exchange>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut io = io;
        let mut slp = SlpLayer::new(local);
        let mut padp = PadpLayer::new(remote);
        for exchange in script {
            let req = padp.read(&mut io, &mut slp).expect("device: read request");
            assert_eq!(req[0], exchange.opcode, "device received unexpected opcode");
            let resp = encode_response(exchange.opcode, exchange.status, &exchange.args);
            padp.write(&mut io, &mut slp, &resp).expect("device: write response");
        }
    })
}

/// Conventional addresses for a single coldsync session: both ends bind the
/// PADP protocol tag, ports 3 (client) and 5 (device), mirroring
/// `PConnection::new_padp`'s own convenience constructor.
#[must_use]
pub fn client_address() -> SlpAddress {
    SlpAddress { protocol: protocol::PADP, port: 3 }
}

#[must_use]
pub fn device_address() -> SlpAddress {
    SlpAddress { protocol: protocol::PADP, port: 5 }
}

/// Build a raw SLP frame, reimplementing the wire layout directly (rather
/// than going through [`SlpLayer`]) since tests need to hand-construct
/// frames the production code only ever decodes, never encodes, on this
/// side of the wire (CMP's WAKEUP, PADP's bare ACKs).
#[must_use]
pub fn encode_slp_frame(dest: SlpAddress, src_port: u8, xid: u8, body: &[u8]) -> Vec<u8> {
    let mut header = [0u8; 10];
    header[0..3].copy_from_slice(&[0xBE, 0xEF, 0xED]);
    header[3] = dest.port;
    header[4] = src_port;
    header[5] = dest.protocol;
    header[6..8].copy_from_slice(&(body.len() as u16).to_be_bytes());
    header[8] = xid;
    header[9] = header[..9].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));

    let mut running = crc16(&header);
    running = crc16_update(running, body);

    let mut out = Vec::with_capacity(header.len() + body.len() + 2);
    out.extend_from_slice(&header);
    out.extend_from_slice(body);
    out.extend_from_slice(&running.to_be_bytes());
    out
}

/// A bare PADP fragment header: `kind, flags, size_or_offset (BE u16)`.
#[must_use]
pub fn encode_padp_data(payload: &[u8]) -> Vec<u8> {
    const FRAG_DATA: u8 = 1;
    const FLAG_FIRST: u8 = 0x80;
    const FLAG_LAST: u8 = 0x40;
    let mut out = vec![FRAG_DATA, FLAG_FIRST | FLAG_LAST, 0, 0];
    out[2..4].copy_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

#[must_use]
pub fn encode_padp_ack() -> Vec<u8> {
    const FRAG_ACK: u8 = 2;
    vec![FRAG_ACK, 0, 0, 0]
}

/// The wire shape `ReadRecordByID`/`ReadRecordByIndex`/
/// `ReadNextModifiedRec` all share: `id(4) | index_or_size(2) | attrs(1) |
/// category(1) | payload`.
#[must_use]
pub fn wire_record(id: u32, attrs: u8, category: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.push(attrs);
    out.push(category);
    out.extend_from_slice(payload);
    out
}

/// The wire shape `ReadRecordIDList` returns: a count followed by that
/// many big-endian uniqueIDs.
#[must_use]
pub fn wire_id_list(ids: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + ids.len() * 4);
    out.extend_from_slice(&(ids.len() as u16).to_be_bytes());
    for id in ids {
        out.extend_from_slice(&id.to_be_bytes());
    }
    out
}
