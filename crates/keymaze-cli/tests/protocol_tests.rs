//! Protocol client tests against a scripted in-memory watch

use std::collections::VecDeque;
use std::time::Duration;

use chrono::NaiveDate;
use keymaze_cli::device::codec::{self, CatalogRecord};
use keymaze_cli::device::frame::{encode_response, ResponseHeader};
use keymaze_cli::device::{CommandSet, DeviceSource, ProtocolClient, Transport};
use keymaze_cli::error::{KeymazeError, ProtocolError};
use keymaze_cli::models::{DeviceIdentity, Gender, TrackPoint, TrackTotals};

/// Transport replaying one canned reply per write
#[derive(Default)]
struct ScriptedTransport {
    replies: VecDeque<Vec<u8>>,
    pending: VecDeque<u8>,
    written: Vec<Vec<u8>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Vec<u8>>) -> Self {
        Self {
            replies: replies.into(),
            ..Default::default()
        }
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, data: &[u8]) -> keymaze_cli::Result<()> {
        self.written.push(data.to_vec());
        if let Some(reply) = self.replies.pop_front() {
            self.pending.extend(reply);
        }
        Ok(())
    }

    fn read(&mut self, len: usize) -> keymaze_cli::Result<Vec<u8>> {
        let n = len.min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }

    fn bytes_waiting(&mut self) -> keymaze_cli::Result<usize> {
        Ok(self.pending.len())
    }

    fn set_timeout(&mut self, _timeout: Duration) -> keymaze_cli::Result<()> {
        Ok(())
    }
}

const CMD: CommandSet = CommandSet {
    prefix: 0x02,
    directory: 0x78,
    get_header: 0x80,
    get_next: 0x81,
    get_info: 0x85,
    no_more_data: 0x8a,
};

fn client(replies: Vec<Vec<u8>>) -> ProtocolClient<ScriptedTransport> {
    ProtocolClient::with_commands(ScriptedTransport::new(replies), CMD)
}

fn identity() -> DeviceIdentity {
    DeviceIdentity {
        serial_number: "KM7-0042".to_string(),
        name: "KEYMAZE 700".to_string(),
        user: "CLAIRE".to_string(),
        gender: Gender::Female,
        age: 33,
        weight: 61,
        height: 170,
        birthday: NaiveDate::from_ymd_opt(1976, 4, 18),
    }
}

fn record(track: u16, index: u16, laps: u8) -> CatalogRecord {
    CatalogRecord {
        started: NaiveDate::from_ymd_opt(2009, 6, 14)
            .unwrap()
            .and_hms_opt(9, 30, u32::from(index))
            .unwrap(),
        laps,
        elapsed: 36_000,
        distance: 10_500,
        kcal: 650,
        max_speed: 320,
        max_heart: 178,
        avg_heart: 149,
        cumul_plus: 12,
        cumul_minus: -3,
        reserved: 0,
        track,
        index,
    }
}

fn point(i: i32) -> TrackPoint {
    TrackPoint {
        lat: 45_000_000 + i,
        lon: 5_000_000 - i,
        alt: 200 + i as i16,
        speed: 25,
        heart: 140,
        delta: 10,
    }
}

fn points_batch(track: u16, points: &[TrackPoint], tail: &[u8]) -> Vec<u8> {
    let mut body = record(track, 0, 1).encode();
    for p in points {
        body.extend(codec::encode_point(p));
    }
    body.extend_from_slice(tail);
    encode_response(CMD.get_next, &body)
}

#[test]
fn test_knock_succeeds_on_fourth_attempt() {
    let body = codec::encode_device_info(&identity());
    let mut client = client(vec![
        vec![],
        vec![0x85, 0x00],
        vec![0x11, 0x00, 0x00, 0xde, 0xad],
        encode_response(0x85, &body),
    ]);

    let info = client.get_information().unwrap();
    assert_eq!(info, identity());
    assert_eq!(client.transport().written.len(), 4);
    assert!(client
        .transport()
        .written
        .iter()
        .all(|w| w == &[0x02, 0x00, 0x01, 0x85, 0x84]));
}

#[test]
fn test_knock_gives_up_after_four_attempts() {
    let mut client = client(vec![
        vec![0xff],
        vec![0x12, 0x00, 0x00],
        vec![],
        vec![0x00, 0x01],
        encode_response(0x85, &codec::encode_device_info(&identity())),
    ]);

    let err = client.request(0x85, &[], &[]).unwrap_err();
    assert!(matches!(
        err,
        KeymazeError::Protocol(ProtocolError::NoAnswer)
    ));
    assert!(err.is_retryable());
    assert_eq!(client.transport().written.len(), 4);
}

#[test]
fn test_checksum_mismatch_reports_both_values() {
    let body = [0x10, 0x20, 0x30];
    let mut frame = encode_response(0x78, &body);
    let good = *frame.last().unwrap();
    *frame.last_mut().unwrap() = good ^ 0xff;

    let err = client(vec![frame]).request(0x78, &[], &[]).unwrap_err();
    match err {
        KeymazeError::Protocol(ProtocolError::Checksum { received, computed }) => {
            assert_eq!(received, good ^ 0xff);
            assert_eq!(computed, good);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_short_body_is_communication_error() {
    let header = ResponseHeader {
        command: 0x78,
        length: 40,
    };
    let mut frame = header.to_bytes().to_vec();
    frame.extend_from_slice(&[0u8; 10]);

    let err = client(vec![frame]).request(0x78, &[], &[]).unwrap_err();
    assert!(matches!(
        err,
        KeymazeError::Protocol(ProtocolError::Communication(_))
    ));
    assert!(!err.is_retryable());
}

#[test]
fn test_alternate_code_is_reported() {
    let mut client = client(vec![encode_response(0x8a, &[])]);
    let resp = client.request(0x81, &[], &[0x8a, 0x80]).unwrap();
    assert_eq!(resp.command, 0x8a);
    assert!(resp.body.is_empty());
}

#[test]
fn test_catalog_decodes_every_entry() {
    let mut body = record(3, 0, 1).encode();
    body.extend(record(4, 1, 0).encode());
    body.extend(record(7, 2, 1).encode());

    let mut client = client(vec![encode_response(0x78, &body)]);
    let catalog = client.get_catalog().unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(
        catalog.iter().map(|e| e.track).collect::<Vec<_>>(),
        vec![3, 4, 7]
    );
    assert_eq!(catalog[0].time, 3600);
    assert_eq!(catalog[0].cumul_minus, -3);
    assert_eq!(catalog[1].start, catalog[0].start + 1);
    assert_eq!(client.transport().written[0], vec![0x02, 0x00, 0x01, 0x78, 0x79]);
}

#[test]
fn test_catalog_rejects_trailing_fragment() {
    let mut body = record(3, 0, 1).encode();
    body.extend_from_slice(&[0u8; 12]);

    let err = client(vec![encode_response(0x78, &body)])
        .get_catalog()
        .unwrap_err();
    assert!(matches!(
        err,
        KeymazeError::Protocol(ProtocolError::MissingData { .. })
    ));
}

#[test]
fn test_catalog_rejects_multi_lap() {
    let body = record(3, 0, 2).encode();
    let err = client(vec![encode_response(0x78, &body)])
        .get_catalog()
        .unwrap_err();
    assert!(matches!(
        err,
        KeymazeError::Protocol(ProtocolError::UnsupportedRecord(_))
    ));
}

fn header_reply(track: u16, point_count: u32) -> Vec<u8> {
    let totals = TrackTotals {
        stop: 36_000,
        time: 36_000,
        distance: 10_500,
        kcal: 650,
        max_speed: 320,
        max_heart: 178,
        avg_heart: 149,
        point_count,
    };
    let mut body = record(track, 0, 1).encode();
    body.extend(codec::encode_totals(&totals));
    encode_response(CMD.get_header, &body)
}

#[test]
fn test_track_transfer_stops_at_point_count() {
    let all: Vec<TrackPoint> = (0..5).map(point).collect();
    let mut client = client(vec![
        header_reply(9, 5),
        points_batch(9, &all[..3], &[]),
        // Short remainder is dropped with a warning
        points_batch(9, &all[3..], &[0xaa, 0xbb, 0xcc]),
    ]);

    let download = client.get_track(9).unwrap();
    assert_eq!(download.totals.point_count, 5);
    assert_eq!(download.entry.track, 9);
    assert_eq!(download.points, all);

    let written = &client.transport().written;
    assert_eq!(written.len(), 3);
    // Header request carries (1, track)
    assert_eq!(&written[0][..8], &[0x02, 0x00, 0x05, 0x80, 0x00, 0x01, 0x00, 0x09]);
    assert_eq!(&written[1][..4], &[0x02, 0x00, 0x01, 0x81]);
}

#[test]
fn test_track_transfer_stops_on_no_more_data() {
    let all: Vec<TrackPoint> = (0..4).map(point).collect();
    let mut client = client(vec![
        header_reply(2, 10),
        points_batch(2, &all, &[]),
        encode_response(CMD.no_more_data, &[]),
    ]);

    let download = DeviceSource::get_track(&mut client, 2).unwrap();
    assert_eq!(download.points, all);
    assert_eq!(client.transport().written.len(), 3);
}

#[test]
fn test_track_transfer_ignores_oversized_point_count() {
    let two: Vec<TrackPoint> = (0..2).map(point).collect();
    let mut client = client(vec![
        header_reply(2, u32::MAX),
        points_batch(2, &two, &[]),
        encode_response(CMD.no_more_data, &[]),
    ]);

    let download = client.get_track(2).unwrap();
    assert_eq!(download.points, two);
    assert_eq!(download.totals.point_count, u32::MAX);
    assert_eq!(client.transport().written.len(), 3);
}

#[test]
fn test_track_transfer_stops_on_empty_batch() {
    let mut client = client(vec![header_reply(2, 10), points_batch(2, &[], &[])]);

    let download = client.get_track(2).unwrap();
    assert!(download.points.is_empty());
    assert_eq!(client.transport().written.len(), 2);
}

#[test]
fn test_track_header_too_short() {
    let body = record(2, 0, 1).encode();
    let err = client(vec![encode_response(CMD.get_header, &body)])
        .get_track(2)
        .unwrap_err();
    assert!(matches!(
        err,
        KeymazeError::Protocol(ProtocolError::MissingData { expected: 53, actual: 31 })
    ));
}
