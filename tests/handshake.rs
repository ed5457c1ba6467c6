// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end test of the CMP handshake (spec.md §8 scenario 1): feed a
//! WAKEUP over PADP+SLP and expect an INIT reply carrying the configured
//! rate with the `CHANGE_RATE` flag set.

mod support;

use std::thread;

use coldsync_core::connection::{ConnectionConfig, PConnection};
use coldsync_core::octet::DEFAULT_SPEED;
use coldsync_core::padp::PadpLayer;
use coldsync_core::slp::SlpLayer;

use support::{client_address, device_address, duplex_pair};

#[test]
fn wakeup_is_answered_with_init_at_default_rate() {
    let (client_io, mut device_io) = duplex_pair();

    let client = thread::spawn(move || {
        let mut conn = PConnection::new_padp(Box::new(client_io), client_address().port, device_address().port);
        conn.handshake(&ConnectionConfig::default()).unwrap()
    });

    let mut device_slp = SlpLayer::new(device_address());
    let mut device_padp = PadpLayer::new(client_address());

    // WAKEUP: kind=1, flags=0, v_major=1, v_minor=1, reserved(2)=0, rate(4)=0.
    let wakeup = [1u8, 0, 1, 1, 0, 0, 0, 0, 0, 0];
    device_padp.write(&mut device_io, &mut device_slp, &wakeup).unwrap();

    let reply = device_padp.read(&mut device_io, &mut device_slp).unwrap();
    assert_eq!(reply.len(), 10);
    assert_eq!(reply[0], 2, "reply packet kind must be INIT");
    assert_eq!(reply[1] & 0x80, 0x80, "CHANGE_RATE flag must be set");
    assert_eq!(&reply[6..10], &[0x00, 0x00, 0x96, 0x00], "default rate 38400 = 0x9600");

    let bps = client.join().unwrap();
    assert_eq!(bps, DEFAULT_SPEED);
}

#[test]
fn override_bps_is_honored_even_off_the_speed_table() {
    let (client_io, mut device_io) = duplex_pair();

    let client = thread::spawn(move || {
        let mut conn = PConnection::new_padp(Box::new(client_io), client_address().port, device_address().port);
        let config = ConnectionConfig { override_bps: Some(57_600), ..ConnectionConfig::default() };
        conn.handshake(&config).unwrap()
    });

    let mut device_slp = SlpLayer::new(device_address());
    let mut device_padp = PadpLayer::new(client_address());

    let wakeup = [1u8, 0, 1, 1, 0, 0, 0, 0, 0, 0];
    device_padp.write(&mut device_io, &mut device_slp, &wakeup).unwrap();

    let reply = device_padp.read(&mut device_io, &mut device_slp).unwrap();
    assert_eq!(&reply[6..10], &57_600u32.to_be_bytes());

    let bps = client.join().unwrap();
    assert_eq!(bps, 57_600);
}
