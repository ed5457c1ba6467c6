// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DLP — Desktop Link Protocol.
//!
//! Request/response RPC over PADP: one opcode byte, an argument list, and
//! (on the response) a status code. Opcode IDs start at 0x10; a response's
//! opcode is always the request's opcode with the high bit set.

pub mod commands;
pub mod status;

use crate::error::{Error, Result};
use crate::octet::{Cursor, CursorMut};
use crate::padp::PadpLayer;
use crate::slp::SlpLayer;
use status::DlpStatus;

/// First argument id used by the command surface; ids below this are
/// reserved for future extension, matching the original wire convention.
pub const FIRST_ARG_ID: u8 = 0x20;

/// One `{id, bytes}` argument, in either its tiny or long wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub id: u8,
    pub data: Vec<u8>,
}

impl Argument {
    #[must_use]
    pub fn new(id: u8, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    fn is_long(&self) -> bool {
        self.data.len() > 0xFF || self.id > 0x3F
    }

    fn encoded_len(&self) -> usize {
        if self.is_long() {
            let body = 2 + self.data.len();
            body + (body & 1) // 2-byte pad
        } else {
            2 + self.data.len()
        }
    }

    fn encode(&self, w: &mut CursorMut) -> Result<()> {
        if self.is_long() {
            w.write_u8(0xC0 | (self.id & 0x3F))?;
            w.write_u16(self.data.len() as u16)?;
            w.write_bytes(&self.data)?;
            if self.data.len() % 2 == 1 {
                w.write_u8(0)?;
            }
        } else {
            w.write_u8(self.id)?;
            w.write_u8(self.data.len() as u8)?;
            w.write_bytes(&self.data)?;
        }
        Ok(())
    }

    fn decode(r: &mut Cursor) -> Result<Self> {
        let id_byte = r.read_u8()?;
        if id_byte & 0xC0 == 0xC0 {
            let id = id_byte & 0x3F;
            let size = r.read_u16()? as usize;
            let data = r.read_bytes(size)?.to_vec();
            if size % 2 == 1 {
                r.read_u8()?;
            }
            Ok(Argument { id, data })
        } else {
            let size = r.read_u8()? as usize;
            let data = r.read_bytes(size)?.to_vec();
            Ok(Argument { id: id_byte, data })
        }
    }
}

/// A DLP request: an opcode plus its argument list.
#[derive(Debug, Clone)]
pub struct DlpRequest {
    pub opcode: u8,
    pub args: Vec<Argument>,
}

impl DlpRequest {
    #[must_use]
    pub fn new(opcode: u8, args: Vec<Argument>) -> Self {
        Self { opcode, args }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let body_len: usize = self.args.iter().map(Argument::encoded_len).sum();
        let mut buf = vec![0u8; 2 + body_len];
        let mut w = CursorMut::new(&mut buf);
        w.write_u8(self.opcode)?;
        w.write_u8(self.args.len() as u8)?;
        for arg in &self.args {
            arg.encode(&mut w)?;
        }
        Ok(buf)
    }
}

/// A DLP response: echoes the request opcode with the high bit set, a
/// status, and (when `status` is `NoErr`) an argument list.
#[derive(Debug, Clone)]
pub struct DlpResponse {
    pub opcode: u8,
    pub status: DlpStatus,
    pub args: Vec<Argument>,
}

impl DlpResponse {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(bytes);
        let opcode = r.read_u8()?;
        let argc = r.read_u8()?;
        let status = DlpStatus::from_wire(r.read_u16()?);
        let mut args = Vec::with_capacity(argc as usize);
        for _ in 0..argc {
            args.push(Argument::decode(&mut r)?);
        }
        Ok(DlpResponse { opcode, status, args })
    }
}

/// Request opcode -> expected response opcode.
#[must_use]
pub fn response_opcode(request_opcode: u8) -> u8 {
    request_opcode | 0x80
}

/// Drives one DLP request/response exchange over an established PADP/SLP
/// session. There is exactly one in-flight transaction at a time (§5).
pub struct DlpSession<'a> {
    pub io: &'a mut dyn crate::octet::PortIo,
    pub slp: &'a mut SlpLayer,
    pub padp: &'a mut PadpLayer,
}

impl<'a> DlpSession<'a> {
    pub fn new(
        io: &'a mut dyn crate::octet::PortIo,
        slp: &'a mut SlpLayer,
        padp: &'a mut PadpLayer,
    ) -> Self {
        Self { io, slp, padp }
    }

    /// Issue one request and return its arguments, or `Error::DlpStatus` if
    /// the device reported anything other than `NoErr`.
    pub fn call(&mut self, opcode: u8, args: Vec<Argument>) -> Result<Vec<Argument>> {
        let request = DlpRequest::new(opcode, args);
        let encoded = request.encode()?;
        self.padp.write(self.io, self.slp, &encoded)?;

        let raw = self.padp.read(self.io, self.slp)?;
        let response = DlpResponse::decode(&raw)?;

        if response.opcode != response_opcode(opcode) {
            return Err(Error::BadId);
        }
        if !response.status.is_ok() {
            return Err(Error::DlpStatus(response.status));
        }
        Ok(response.args)
    }

    /// Like [`call`](Self::call), but treats `NotFound` as a normal empty
    /// result instead of an error — used by the many enumerators and
    /// optional-block readers where absence is routine (§4.5, §7).
    pub fn call_tolerate_not_found(&mut self, opcode: u8, args: Vec<Argument>) -> Result<Option<Vec<Argument>>> {
        match self.call(opcode, args) {
            Ok(args) => Ok(Some(args)),
            Err(Error::DlpStatus(DlpStatus::NotFound)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
