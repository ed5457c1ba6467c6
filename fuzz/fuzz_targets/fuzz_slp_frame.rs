#![no_main]

use std::collections::VecDeque;
use std::time::Duration;

use coldsync_core::octet::PortIo;
use coldsync_core::slp::{protocol, SlpAddress, SlpLayer};
use coldsync_core::{Error, Result};
use libfuzzer_sys::fuzz_target;

/// Feeds fuzz input as the bytes a serial line would have delivered, with
/// no write side and no artificial speed changes.
struct ReplayPort {
    inbound: VecDeque<u8>,
}

impl PortIo for ReplayPort {
    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if self.inbound.is_empty() {
            return Err(Error::Timeout);
        }
        let mut n = 0;
        while n < buf.len() {
            match self.inbound.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write_all(&mut self, _buf: &[u8]) -> Result<()> {
        Ok(())
    }

    fn set_speed(&mut self, _bps: u32) -> Result<()> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let mut port = ReplayPort { inbound: data.iter().copied().collect() };
    let mut slp = SlpLayer::new(SlpAddress { protocol: protocol::PADP, port: 3 });
    let _ = slp.read(&mut port, Duration::from_millis(1));
});
