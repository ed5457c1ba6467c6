// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte-level I/O over the serial file descriptor: read with a timeout,
//! and the line-speed table CMP negotiates against.

use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

use crate::error::{Error, Result};

/// Candidate bit rates, highest first — the order CMP tries them in when
/// picking the fastest rate the line will accept.
pub const SPEED_TABLE: &[u32] = &[
    230_400, 115_200, 76_800, 57_600, 38_400, 28_800, 19_200, 14_400, 9_600, 7_200, 4_800, 2_400,
    1_200,
];

/// Default rate used before CMP negotiates: the most common HotSync speed.
pub const DEFAULT_SPEED: u32 = 38_400;

/// Read/write access to the serial line with a per-call read timeout.
///
/// Framing layers poll this rather than the raw fd so that SLP's
/// "block until timeout with no valid frame" test property and PADP's
/// ack-timeout retransmission both share one place that understands
/// "no bytes arrived in time" vs. "the peer closed the line".
pub trait PortIo {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
    fn set_speed(&mut self, bps: u32) -> Result<()>;
}

/// `PortIo` backed directly by an open serial file descriptor via termios.
pub struct SerialPort {
    fd: RawFd,
}

impl SerialPort {
    /// Take ownership of an already-open serial file descriptor.
    ///
    /// The descriptor is expected to already be in raw mode; this type only
    /// manages the speed and the timeout-aware read/write path.
    #[must_use]
    pub fn from_raw_fd(fd: RawFd) -> Self {
        Self { fd }
    }

    fn poll_readable(&self, timeout: Duration) -> Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        // SAFETY: `pfd` is a single, validly initialized pollfd on the stack
        // and `1` matches the array length passed to poll(2).
        let ret = unsafe { libc::poll(&mut pfd, 1, millis) };
        if ret < 0 {
            return Err(Error::System(io::Error::last_os_error()));
        }
        Ok(ret > 0 && pfd.revents & libc::POLLIN != 0)
    }
}

impl PortIo for SerialPort {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.poll_readable(timeout)? {
            return Err(Error::Timeout);
        }
        // SAFETY: `buf` is a valid, writable slice of at least `buf.len()`
        // bytes and `self.fd` is an open descriptor owned by this struct.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(Error::System(io::Error::last_os_error()));
        }
        if n == 0 {
            return Err(Error::Eof);
        }
        Ok(n as usize)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < buf.len() {
            // SAFETY: the pointer offset stays within `buf`'s allocation and
            // `self.fd` is an open descriptor owned by this struct.
            let n = unsafe {
                libc::write(
                    self.fd,
                    buf[written..].as_ptr() as *const libc::c_void,
                    buf.len() - written,
                )
            };
            if n < 0 {
                return Err(Error::System(io::Error::last_os_error()));
            }
            written += n as usize;
        }
        Ok(())
    }

    fn set_speed(&mut self, bps: u32) -> Result<()> {
        let speed = bps_to_termios_speed(bps).ok_or(Error::BadId)?;
        // SAFETY: `termios` is zero-initialized then filled in by tcgetattr
        // before any field is read; `self.fd` is owned by this struct.
        unsafe {
            let mut term: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(self.fd, &mut term) != 0 {
                return Err(Error::System(io::Error::last_os_error()));
            }
            libc::cfsetispeed(&mut term, speed);
            libc::cfsetospeed(&mut term, speed);
            if libc::tcsetattr(self.fd, libc::TCSANOW, &term) != 0 {
                return Err(Error::System(io::Error::last_os_error()));
            }
        }
        Ok(())
    }
}

fn bps_to_termios_speed(bps: u32) -> Option<libc::speed_t> {
    Some(match bps {
        230_400 => libc::B230400,
        115_200 => libc::B115200,
        57_600 => libc::B57600,
        38_400 => libc::B38400,
        19_200 => libc::B19200,
        9_600 => libc::B9600,
        4_800 => libc::B4800,
        2_400 => libc::B2400,
        1_200 => libc::B1200,
        _ => return None,
    })
}

/// Pick the rate CMP should offer in its `INIT` reply, honoring an
/// explicit override from configuration if one is given.
///
/// Without an override this is `DEFAULT_SPEED` (38400 bps), not the
/// fastest entry in `SPEED_TABLE`: 38400 is the conventional HotSync
/// handshake rate a real device expects in the initial `INIT`, and the
/// higher rates in `SPEED_TABLE` exist for a caller that explicitly asks
/// to negotiate up, not for the default reply.
#[must_use]
pub fn negotiate_speed(override_bps: Option<u32>) -> u32 {
    if let Some(bps) = override_bps {
        if bps_to_termios_speed(bps).is_none() {
            crate::warn!("configured speed {bps} has no platform speed constant; using it anyway");
        }
        return bps;
    }
    DEFAULT_SPEED
}
