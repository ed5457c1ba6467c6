// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Octet-level I/O: big-endian cursors, the CCITT CRC-16, timeouts and
//! line speed negotiation. Everything above SLP builds on this module
//! instead of touching the fd or endianness directly.

pub mod crc;
pub mod cursor;
pub mod io;

pub use cursor::{Cursor, CursorMut};
pub use io::{negotiate_speed, PortIo, SerialPort, DEFAULT_SPEED, SPEED_TABLE};
