//! Sensor store — the live device model.
//!
//! The engine task is the only writer. Collaborators read through a
//! [`SharedSensorStore`] and get cloned records.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use domintell_domain::device::{Device, DeviceKind, DeviceValue, Timestamp};
use domintell_domain::frame::Frame;
use domintell_domain::id::DeviceId;

/// Mapping from device id to device record.
#[derive(Debug, Default)]
pub struct SensorStore {
    devices: BTreeMap<DeviceId, Device>,
}

impl SensorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a persisted device set.
    #[must_use]
    pub fn from_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let devices = devices
            .into_iter()
            .map(|device| (device.id.clone(), device))
            .collect();
        Self { devices }
    }

    #[must_use]
    pub fn get(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    /// Create the record if it does not exist yet.
    ///
    /// Returns `true` when a record was created. An existing record is left
    /// untouched, its kind included.
    pub fn upsert(&mut self, id: &DeviceId, kind: DeviceKind, description: &str) -> bool {
        if self.devices.contains_key(id) {
            return false;
        }
        tracing::debug!(device_id = %id, %kind, "new device");
        self.devices
            .insert(id.clone(), Device::new(id.clone(), kind, description));
        true
    }

    /// Returns `true` when the value of an existing record changed.
    pub fn set_value(&mut self, id: &DeviceId, value: DeviceValue, ts: Timestamp) -> bool {
        self.devices
            .get_mut(id)
            .is_some_and(|device| device.update_value(value, ts))
    }

    /// Returns `true` when the description of an existing record changed.
    pub fn set_description(&mut self, id: &DeviceId, description: &str) -> bool {
        self.devices
            .get_mut(id)
            .is_some_and(|device| device.update_description(description))
    }

    /// Apply a decoded frame, returning the ids whose value changed, in
    /// frame order.
    pub fn apply(&mut self, frame: &Frame, ts: Timestamp) -> Vec<DeviceId> {
        match frame {
            Frame::Status(updates) => updates
                .iter()
                .filter_map(|update| {
                    self.upsert(&update.id, update.kind, "");
                    self.set_value(&update.id, update.value.clone(), ts)
                        .then(|| update.id.clone())
                })
                .collect(),
            Frame::Inventory(entry) => {
                if !self.upsert(&entry.id, entry.kind, &entry.description) {
                    self.set_description(&entry.id, &entry.description);
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// All records, sorted by id.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// A [`SensorStore`] shared between the engine and its collaborators.
///
/// A poisoned lock is recovered: every mutation is a whole-record
/// replacement, so the store is consistent even if a holder panicked.
#[derive(Debug, Clone, Default)]
pub struct SharedSensorStore(Arc<RwLock<SensorStore>>);

impl SharedSensorStore {
    #[must_use]
    pub fn new(store: SensorStore) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SensorStore> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SensorStore> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone of one record.
    #[must_use]
    pub fn device(&self, id: &DeviceId) -> Option<Device> {
        self.read().get(id).cloned()
    }

    /// Clone of every record, sorted by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Device> {
        self.read().devices().cloned().collect()
    }
}
