//! Cache reconciliation tests against a stub watch

use std::collections::HashMap;

use keymaze_cli::device::DeviceSource;
use keymaze_cli::error::{KeymazeError, ProtocolError};
use keymaze_cli::models::{
    CatalogEntry, DeviceIdentity, Gender, TrackDownload, TrackPoint, TrackTotals,
};
use keymaze_cli::storage::{CacheDb, KeymazeCache};

/// In-memory watch counting how often it is asked for data
#[derive(Default)]
struct StubWatch {
    identity: Option<DeviceIdentity>,
    catalog: Vec<CatalogEntry>,
    tracks: HashMap<u16, Vec<TrackPoint>>,
    catalog_calls: usize,
    track_calls: Vec<u16>,
}

impl DeviceSource for StubWatch {
    fn get_information(&mut self) -> keymaze_cli::Result<DeviceIdentity> {
        self.identity
            .clone()
            .ok_or(KeymazeError::Protocol(ProtocolError::NoAnswer))
    }

    fn get_catalog(&mut self) -> keymaze_cli::Result<Vec<CatalogEntry>> {
        self.catalog_calls += 1;
        Ok(self.catalog.clone())
    }

    fn get_track(&mut self, track: u16) -> keymaze_cli::Result<TrackDownload> {
        self.track_calls.push(track);
        let entry = self
            .catalog
            .iter()
            .find(|e| e.track == track)
            .cloned()
            .ok_or_else(|| KeymazeError::TrackNotFound(track.to_string()))?;
        let points = self.tracks.get(&track).cloned().unwrap_or_default();
        Ok(TrackDownload {
            totals: TrackTotals {
                stop: 0,
                time: entry.time * 10,
                distance: entry.distance,
                kcal: entry.kcal,
                max_speed: entry.max_speed,
                max_heart: entry.max_heart,
                avg_heart: entry.avg_heart,
                point_count: points.len() as u32,
            },
            entry,
            points,
        })
    }
}

fn identity(serial: &str) -> DeviceIdentity {
    DeviceIdentity {
        serial_number: serial.to_string(),
        name: "KEYMAZE 500".to_string(),
        user: "MARC".to_string(),
        gender: Gender::Male,
        age: 45,
        weight: 80,
        height: 182,
        birthday: None,
    }
}

fn entry(n: u16) -> CatalogEntry {
    CatalogEntry {
        start: 1_240_000_000 + i64::from(n) * 86_400,
        time: 1800,
        distance: 5_000 + u32::from(n),
        kcal: 300,
        max_speed: 200,
        max_heart: 170,
        avg_heart: 140,
        cumul_plus: 0,
        cumul_minus: 0,
        track: 100 + n,
        index: n,
    }
}

fn track_points(count: i32) -> Vec<TrackPoint> {
    (0..count)
        .map(|i| TrackPoint {
            lat: 48_850_000 + i * 10,
            lon: 2_350_000 + i * 10,
            alt: 35 + (i % 7) as i16,
            speed: 30,
            heart: 135,
            delta: 20,
        })
        .collect()
}

fn watch(entries: u16) -> StubWatch {
    let catalog: Vec<CatalogEntry> = (0..entries).map(entry).collect();
    let tracks = catalog
        .iter()
        .map(|e| (e.track, track_points(i32::from(e.index) + 3)))
        .collect();
    StubWatch {
        identity: Some(identity("KM5-1234")),
        catalog,
        tracks,
        ..Default::default()
    }
}

fn online(watch: StubWatch) -> KeymazeCache<StubWatch> {
    KeymazeCache::new(CacheDb::open_in_memory().unwrap(), Some(watch))
}

#[test]
fn test_identity_recorded_once() {
    let mut cache = online(watch(0));
    let first = cache.get_information().unwrap();
    let second = cache.get_information().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.identity, identity("KM5-1234"));
    assert_eq!(cache.cache_status().unwrap().devices, 1);
    assert_eq!(cache.get_device("KM5-1234").unwrap(), first.device);
}

#[test]
fn test_unanswered_identity_query_fails() {
    let stub = StubWatch::default();
    let mut cache = online(stub);
    assert!(matches!(
        cache.get_information(),
        Err(KeymazeError::Protocol(ProtocolError::NoAnswer))
    ));
}

#[test]
fn test_catalog_retrieval_is_idempotent() {
    let mut cache = online(watch(4));
    let device = cache.get_information().unwrap().device;

    let first = cache.get_catalog(device).unwrap();
    let rows = cache.cache_status().unwrap().catalog_entries;
    let second = cache.get_catalog(device).unwrap();

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    assert_eq!(cache.cache_status().unwrap().catalog_entries, rows);
    assert_eq!(cache.device_mut().unwrap().catalog_calls, 2);
}

#[test]
fn test_catalog_gap_fill() {
    let mut cache = online(watch(3));
    let device = cache.get_information().unwrap().device;
    let before = cache.get_catalog(device).unwrap();
    assert_eq!(before.len(), 3);

    // The watch records a new activity, and reports a changed copy of an old one
    let stub = cache.device_mut().unwrap();
    stub.catalog.push(entry(3));
    stub.catalog[0].distance = 99_999;

    let after = cache.get_catalog(device).unwrap();
    assert_eq!(after.len(), 4);
    assert_eq!(&after[..3], &before[..]);
    assert_eq!(after[0].entry.distance, 5_000);
    assert_eq!(after[3].entry, entry(3));
}

#[test]
fn test_points_fetched_once_then_cached() {
    let mut cache = online(watch(2));
    let device = cache.get_information().unwrap().device;
    cache.get_catalog(device).unwrap();

    let fetched = cache.get_trackpoints(device, 101).unwrap();
    let cached = cache.get_trackpoints(device, 101).unwrap();

    assert_eq!(fetched, track_points(4));
    assert_eq!(cached, fetched);
    assert_eq!(cache.device_mut().unwrap().track_calls, vec![101]);
}

#[test]
fn test_derived_statistics_follow_points() {
    let mut cache = online(watch(2));
    let device = cache.get_information().unwrap().device;

    let catalog = cache.get_catalog(device).unwrap();
    assert!(catalog.iter().all(|s| !s.is_cached()));
    assert!(catalog.iter().all(|s| s.duration.is_none()));

    cache.get_trackpoints(device, 100).unwrap();
    let catalog = cache.get_catalog(device).unwrap();
    let first = &catalog[0];
    assert!(first.is_cached());
    assert_eq!(first.alt_min, Some(35));
    assert_eq!(first.alt_max, Some(37));
    // 3 points of 2 s each
    assert_eq!(first.duration, Some(6));
    assert!(!catalog[1].is_cached());
}

#[test]
fn test_sync_fetches_only_missing_tracks() {
    let mut cache = online(watch(3));
    let device = cache.get_information().unwrap().device;
    cache.get_trackpoints(device, 101).unwrap();
    let listed = cache.get_catalog(device).unwrap();

    let catalog = cache.sync_tracks(device, &listed).unwrap();

    assert!(catalog.iter().all(|s| s.is_cached()));
    assert_eq!(cache.device_mut().unwrap().catalog_calls, 1);
    assert_eq!(cache.device_mut().unwrap().track_calls, vec![101, 100, 102]);
    assert_eq!(cache.cache_status().unwrap().points, 3 + 4 + 5);
}

#[test]
fn test_offline_serves_cache_and_refuses_gaps() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("keymaze.sqlite");

    let device = {
        let mut cache = KeymazeCache::new(CacheDb::open(&path).unwrap(), Some(watch(2)));
        let device = cache.get_information().unwrap().device;
        cache.get_catalog(device).unwrap();
        cache.get_trackpoints(device, 100).unwrap();
        device
    };

    let mut cache: KeymazeCache<StubWatch> = KeymazeCache::new(CacheDb::open(&path).unwrap(), None);
    assert!(!cache.is_online());
    assert_eq!(cache.get_information().unwrap().device, device);
    assert_eq!(cache.get_catalog(device).unwrap().len(), 2);
    assert_eq!(cache.get_trackpoints(device, 100).unwrap(), track_points(3));
    assert!(matches!(
        cache.get_trackpoints(device, 101),
        Err(KeymazeError::DeviceUnavailable)
    ));
}

#[test]
fn test_offline_empty_store() {
    let mut cache: KeymazeCache<StubWatch> =
        KeymazeCache::new(CacheDb::open_in_memory().unwrap(), None);
    assert!(matches!(
        cache.get_information(),
        Err(KeymazeError::NoDeviceDiscovered)
    ));
}
