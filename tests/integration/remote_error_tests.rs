//! Integration tests: decoding error responses end to end.

use crow_host::error::HostError;
use crow_host::parser::{DecodeResult, PacketParser};
use crow_host::remote_error::{DetailError, RemoteError, RemoteErrorKind};
use crow_host::transaction::Exchange;

use super::mock_device::{MockPort, drive};

/// Error payload carrying every detail field.
fn full_error_payload() -> Vec<u8> {
    let mut p = vec![
        71,   // CommandNotAllowed
        0x7F, // all detail bits
        0, 17, 0, 6, // message descriptor
        2,    // crow_version
        0x01, 0x00, // max_command_size
        0x02, 0x00, // max_response_size
        5,    // address
        33,   // port
        0, 23, 4, // service identifier descriptor
    ];
    p.push(0); // padding before the text area
    p.extend_from_slice(b"locked");
    p.extend_from_slice(b"SVC1");
    p
}

#[test]
fn all_details_decoded() {
    let e = RemoteError::from_payload(5, 33, &full_error_payload()).unwrap();
    assert_eq!(e.kind, RemoteErrorKind::CommandNotAllowed);
    assert_eq!(e.details.message.as_deref(), Some("locked"));
    assert_eq!(e.details.crow_version, Some(2));
    assert_eq!(e.details.max_command_size, Some(256));
    assert_eq!(e.details.max_response_size, Some(512));
    assert_eq!(e.details.address, Some(5));
    assert_eq!(e.details.port, Some(33));
    assert_eq!(e.details.service_identifier.as_deref(), Some("SVC1"));
}

#[test]
fn error_response_through_parser() {
    let payload = full_error_payload();
    let packet = crow_host::codec::encode_response(true, 42, &payload).unwrap();

    let mut parser = PacketParser::new();
    let results = parser.parse(&packet, None);
    assert_eq!(
        results,
        vec![DecodeResult::Response {
            is_error: true,
            token: 42,
            payload
        }]
    );
}

#[test]
fn custom_service_error_through_exchange() {
    let config = crow_host::config::LinkConfig::default();
    let mut port = MockPort::new(&config);
    port.queue_response(true, 8, &[200]);

    let mut ex = Exchange::new(&config, 1, 64, 8);
    drive(&mut port, &mut ex);

    match ex.finish() {
        Err(HostError::Remote(e)) => {
            assert!(e.is_custom());
            assert_eq!(e.kind, RemoteErrorKind::Service);
            assert_eq!(e.number, 200);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn empty_error_payload_is_generic_remote_error() {
    let config = crow_host::config::LinkConfig::default();
    let mut port = MockPort::new(&config);
    port.queue_response(true, 0, &[]);

    let mut ex = Exchange::new(&config, 1, 32, 0);
    drive(&mut port, &mut ex);

    match ex.finish() {
        Err(HostError::Remote(e)) => {
            assert_eq!(e.number, 0);
            assert_eq!(e.kind, RemoteErrorKind::Remote);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn truncated_details_become_malformed() {
    let config = crow_host::config::LinkConfig::default();
    let mut port = MockPort::new(&config);
    // message bit set but no descriptor
    port.queue_response(true, 0, &[1, 0x01, 0x00]);

    let mut ex = Exchange::new(&config, 3, 32, 0);
    drive(&mut port, &mut ex);

    assert_eq!(
        ex.finish(),
        Err(HostError::MalformedErrorResponse {
            address: 3,
            port: 32,
            reason: DetailError::Truncated("message"),
        })
    );
}
