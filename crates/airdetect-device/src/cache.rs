use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use airdetect_frame::DeviceId;
use tracing::{debug, info};

use crate::record::ReadingRecord;
use crate::stream::ReadingSubscription;

/// Latest reading per device.
///
/// Writers take the lock exclusively for a single upsert; snapshots take it
/// shared and copy the entries out. Neither path holds the lock across an
/// `.await`. Entries are never evicted: staleness is judged from
/// [`ReadingRecord::timestamp_ms`].
#[derive(Debug, Default)]
pub struct AggregationCache {
    entries: RwLock<HashMap<DeviceId, ReadingRecord>>,
}

impl AggregationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `record` as the latest for its device, replacing any previous
    /// record for that device. Returns the replaced record.
    pub fn record(&self, record: ReadingRecord) -> Option<ReadingRecord> {
        let device = record.device;
        let previous = self.write().insert(device, record);
        if previous.is_none() {
            debug!(%device, "first reading cached for device");
        }
        previous
    }

    /// Point-in-time copy of every entry, in no particular order.
    pub fn snapshot(&self) -> Vec<(DeviceId, ReadingRecord)> {
        self.read()
            .iter()
            .map(|(device, record)| (*device, record.clone()))
            .collect()
    }

    /// Latest record for one device.
    pub fn get(&self, device: &DeviceId) -> Option<ReadingRecord> {
        self.read().get(device).cloned()
    }

    /// Number of devices seen.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if no device has reported yet.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Write every record from `subscription` into the cache until the
    /// reading stream ends.
    pub async fn feed(&self, mut subscription: ReadingSubscription) {
        while let Some(record) = subscription.recv().await {
            self.record(record);
        }
        info!(subscriber = subscription.id(), "reading stream closed; cache feed stopped");
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<DeviceId, ReadingRecord>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<DeviceId, ReadingRecord>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use airdetect_frame::Reading;

    use super::*;
    use crate::stream::ReadingStream;

    fn record(device: DeviceId, pm25: i64, timestamp_ms: u64) -> ReadingRecord {
        ReadingRecord {
            reading: Reading {
                humidity: 40.0,
                temperature: 21.0,
                hcho: 0.02,
                pm25,
            },
            device,
            timestamp_ms,
            remote_addr: "192.168.1.20:40000".parse().unwrap(),
        }
    }

    fn device(n: u8) -> DeviceId {
        DeviceId::new([0x02, 0, 0, 0, 0, n])
    }

    #[test]
    fn upsert_overwrites_previous_record() {
        let cache = AggregationCache::new();
        assert!(cache.is_empty());

        assert!(cache.record(record(device(1), 10, 1)).is_none());
        let previous = cache.record(record(device(1), 20, 2)).unwrap();

        assert_eq!(previous.reading.pm25, 10);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&device(1)).unwrap().reading.pm25, 20);
        assert!(cache.get(&device(2)).is_none());
    }

    #[test]
    fn snapshot_is_a_copy() {
        let cache = AggregationCache::new();
        cache.record(record(device(1), 1, 1));
        let snapshot = cache.snapshot();

        cache.record(record(device(2), 2, 2));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(cache.snapshot().len(), 2);
    }

    #[test]
    fn concurrent_writers_keep_latest_per_device() {
        const DEVICES: u8 = 16;
        const WRITES: u64 = 50;

        let cache = Arc::new(AggregationCache::new());
        let writers: Vec<_> = (0..DEVICES)
            .map(|n| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..WRITES {
                        cache.record(record(device(n), i as i64, i));
                    }
                })
            })
            .collect();

        let reader = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    assert!(cache.snapshot().len() <= DEVICES as usize);
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), DEVICES as usize);
        for (device, record) in snapshot {
            assert_eq!(record.device, device);
            assert_eq!(record.timestamp_ms, WRITES - 1);
            assert_eq!(record.reading.pm25, (WRITES - 1) as i64);
        }
    }

    #[tokio::test]
    async fn feed_drains_subscription() {
        let cache = Arc::new(AggregationCache::new());
        let stream = ReadingStream::new();
        let feeder = {
            let cache = Arc::clone(&cache);
            let subscription = stream.subscribe();
            tokio::spawn(async move { cache.feed(subscription).await })
        };

        stream.publish(record(device(1), 5, 1)).await;
        stream.publish(record(device(2), 6, 2)).await;
        stream.publish(record(device(1), 7, 3)).await;
        drop(stream);
        feeder.await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&device(1)).unwrap().reading.pm25, 7);
        assert_eq!(cache.get(&device(2)).unwrap().reading.pm25, 6);
    }
}
