//! Integration tests: command exchanges against the mock device.

use std::time::Duration;

use crow_host::config::{LinkConfig, SerialSettings};
use crow_host::error::{HostError, STALE_TOKEN_DETAIL};
use crow_host::parser::{BAD_CHECKSUM_MESSAGE, DecodeResult};
use crow_host::remote_error::RemoteErrorKind;
use crow_host::transaction::{Exchange, TokenSequence};

use super::mock_device::{MockPort, drive};

fn link() -> LinkConfig {
    LinkConfig {
        baudrate: 115_200,
        transaction_timeout_ms: 50,
        ..LinkConfig::default()
    }
}

#[test]
fn response_read_in_hinted_sizes() {
    let config = link();
    let mut port = MockPort::new(&config);
    port.queue_response(false, 0, &[0xAB; 200]);

    let mut tokens = TokenSequence::new();
    let mut ex = Exchange::new(&config, 1, 32, tokens.next_token());
    drive(&mut port, &mut ex);

    assert_eq!(port.reads, vec![5, 204]);
    assert_eq!(ex.finish().unwrap(), vec![0xAB; 200]);
}

#[test]
fn noise_before_response_is_skipped() {
    let config = link();
    let mut port = MockPort::new(&config);
    port.queue(&[0x00, 0xFF, 0x13]).queue_response(false, 3, b"ok");

    let mut ex = Exchange::new(&config, 1, 32, 3);
    drive(&mut port, &mut ex);

    assert!(ex.is_complete());
    // Resynchronising reads one byte at a time, so the noise may span
    // several extra runs.
    let noise: Vec<u8> = ex
        .results()
        .iter()
        .filter_map(|r| match r {
            DecodeResult::Extra { data } => Some(data.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(noise, vec![0x00, 0xFF, 0x13]);
    assert_eq!(ex.finish().unwrap(), b"ok");
}

#[test]
fn stale_response_then_expected() {
    let config = link();
    let mut port = MockPort::new(&config);
    port.queue_response(false, 6, b"stale")
        .queue_response(false, 7, b"fresh");

    let mut ex = Exchange::new(&config, 1, 32, 7);
    drive(&mut port, &mut ex);
    assert_eq!(ex.finish().unwrap(), b"fresh");
}

#[test]
fn only_stale_response_times_out() {
    let config = link();
    let mut port = MockPort::new(&config);
    port.queue_response(false, 6, b"stale");

    let mut ex = Exchange::new(&config, 1, 32, 7);
    drive(&mut port, &mut ex);

    assert!(!ex.is_complete());
    assert!(port.elapsed() >= Duration::from_millis(50));
    match ex.finish() {
        Err(HostError::NoResponse {
            detail, byte_count, ..
        }) => {
            assert_eq!(detail.as_deref(), Some(STALE_TOKEN_DETAIL));
            assert_eq!(byte_count, 5 + 5 + 2);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn silent_device() {
    let config = link();
    let mut port = MockPort::new(&config);
    let mut ex = Exchange::new(&config, 4, 40, 0);
    drive(&mut port, &mut ex);

    assert_eq!(
        ex.finish(),
        Err(HostError::NoResponse {
            address: 4,
            port: 40,
            byte_count: 0,
            detail: None
        })
    );
}

#[test]
fn latency_beyond_timeout() {
    let config = link();
    let mut port = MockPort::new(&config);
    port.latency = Duration::from_millis(80);
    port.queue_response(false, 0, b"late");

    let mut ex = Exchange::new(&config, 1, 32, 0);
    drive(&mut port, &mut ex);

    assert_eq!(port.pending(), 11);
    assert!(matches!(
        ex.finish(),
        Err(HostError::NoResponse { byte_count: 0, .. })
    ));
}

#[test]
fn corrupted_response_reports_checksum() {
    let config = link();
    let mut port = MockPort::new(&config);
    let mut packet = crow_host::codec::encode_response(false, 2, b"abcdef").unwrap();
    packet[7] ^= 0x04;
    port.queue(&packet);

    let mut ex = Exchange::new(&config, 1, 32, 2);
    drive(&mut port, &mut ex);

    match ex.finish() {
        Err(HostError::NoResponse { detail, .. }) => {
            assert_eq!(detail.as_deref(), Some(BAD_CHECKSUM_MESSAGE));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn error_response_classified() {
    let config = link();
    let mut port = MockPort::new(&config);
    // OversizedCommand with max_command_size = 256
    port.queue_response(true, 1, &[6, 0x04, 0x01, 0x00]);

    let mut ex = Exchange::new(&config, 2, 32, 1);
    drive(&mut port, &mut ex);

    match ex.finish() {
        Err(HostError::Remote(e)) => {
            assert_eq!(e.kind, RemoteErrorKind::OversizedCommand);
            assert_eq!(e.details.max_command_size, Some(256));
            assert_eq!(e.address, 2);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn per_address_settings_drive_window() {
    let mut settings = SerialSettings::new(link());
    settings.set_transaction_timeout(9, 5);
    let config = settings.for_address(9);

    let mut port = MockPort::new(&config);
    port.latency = Duration::from_millis(10);
    port.queue_response(false, 0, b"x");

    let mut ex = Exchange::new(&config, 9, 32, 0);
    drive(&mut port, &mut ex);
    assert!(ex.finish().is_err());

    // Same device, default timeout: the response makes it.
    let config = settings.for_address(1);
    let mut port = MockPort::new(&config);
    port.latency = Duration::from_millis(10);
    port.queue_response(false, 0, b"x");

    let mut ex = Exchange::new(&config, 1, 32, 0);
    drive(&mut port, &mut ex);
    assert_eq!(ex.finish().unwrap(), b"x");
}
