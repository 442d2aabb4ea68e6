//! The ROI registry: the single source of truth for the tracked region set.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Instant;

use image::RgbImage;

use deskwatch_models::{BoundingBox, RegionId, RegionSnapshot};

use crate::dwell::DwellClock;
use crate::error::{EngineError, EngineResult};

/// Mutable per-region state, guarded by the cell's mutex.
#[derive(Debug)]
pub struct RegionState {
    /// Committed dwell time. Monotonically non-decreasing.
    pub dwell_seconds: f64,
    /// Accumulation state for the current process.
    pub clock: DwellClock,
    /// Most recent annotated crop; absent until the first refresh.
    pub last_crop: Option<RgbImage>,
}

/// One tracked region.
///
/// Identity (`id`, `bbox`) is immutable; everything mutable lives behind the
/// state mutex so one region's accumulation cycle is atomic with respect to
/// concurrent readers of the same region.
#[derive(Debug)]
pub struct RegionCell {
    pub id: RegionId,
    pub bbox: BoundingBox,
    state: Mutex<RegionState>,
}

impl RegionCell {
    fn new(id: RegionId, bbox: BoundingBox, dwell_seconds: f64) -> Self {
        Self {
            id,
            bbox,
            state: Mutex::new(RegionState {
                dwell_seconds,
                clock: DwellClock::new(Instant::now()),
                last_crop: None,
            }),
        }
    }

    /// Lock the mutable state, recovering from a poisoned lock (the state
    /// stays internally consistent across a panicking reader).
    pub fn state(&self) -> MutexGuard<'_, RegionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Point-in-time snapshot for the control surface.
    pub fn snapshot(&self) -> RegionSnapshot {
        RegionSnapshot {
            id: self.id,
            bbox: self.bbox,
            dwell_seconds: self.state().dwell_seconds,
        }
    }
}

/// The mutable, shared list of tracked regions.
///
/// A single `RwLock` over the slot vector is the synchronization boundary
/// for the whole region set: add/remove take the write lock, readers take a
/// copy-on-read snapshot of the `Arc` handles and can never observe a
/// partially-constructed entry or hold a dangling index across a removal.
/// Iteration order is insertion order.
pub struct RegionRegistry {
    slots: RwLock<Vec<Arc<RegionCell>>>,
    next_id: AtomicU64,
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<RegionCell>>> {
        self.slots.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<RegionCell>>> {
        self.slots.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a region, appending it to the list.
    ///
    /// Rejects degenerate boxes with `InvalidRegion`. Duplicate and
    /// overlapping boxes are deliberately allowed. Returns the new cell and
    /// its position.
    pub fn add(&self, bbox: BoundingBox, dwell_seconds: f64) -> EngineResult<(Arc<RegionCell>, usize)> {
        if !bbox.is_valid() {
            return Err(EngineError::invalid_region(bbox.to_string()));
        }

        let id = RegionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cell = Arc::new(RegionCell::new(id, bbox, dwell_seconds));

        let mut slots = self.write();
        slots.push(Arc::clone(&cell));
        Ok((cell, slots.len() - 1))
    }

    /// Remove the first region whose bbox matches exactly.
    ///
    /// Releases the slot and all derived state (the cell's `last_crop` dies
    /// with the last `Arc`). Returns the removed cell, or `None` when no
    /// exact match exists.
    pub fn remove(&self, bbox: &BoundingBox) -> Option<Arc<RegionCell>> {
        let mut slots = self.write();
        let position = slots.iter().position(|cell| cell.bbox == *bbox)?;
        Some(slots.remove(position))
    }

    /// Consistent snapshot of the region list, in insertion order.
    pub fn snapshot(&self) -> Vec<Arc<RegionCell>> {
        self.read().clone()
    }

    /// Look up by stable handle.
    pub fn get(&self, id: RegionId) -> Option<Arc<RegionCell>> {
        self.read().iter().find(|cell| cell.id == id).cloned()
    }

    /// Whether any region with this exact bbox exists.
    pub fn contains(&self, bbox: &BoundingBox) -> bool {
        self.read().iter().any(|cell| cell.bbox == *bbox)
    }

    /// Look up by insertion-order position.
    pub fn get_by_index(&self, index: usize) -> EngineResult<Arc<RegionCell>> {
        self.read()
            .get(index)
            .cloned()
            .ok_or(EngineError::InvalidIndex(index))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Control-surface listing, in insertion order.
    pub fn list(&self) -> Vec<RegionSnapshot> {
        self.read().iter().map(|cell| cell.snapshot()).collect()
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
