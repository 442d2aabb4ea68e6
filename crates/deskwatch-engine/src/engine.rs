//! The tracking engine: frames in, dwell time and annotated views out.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::RgbImage;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use deskwatch_models::{BoundingBox, RegionId, RegionSnapshot};
use deskwatch_store::RegionStore;
use deskwatch_vision::annotate::{annotate_detections, outline_regions};
use deskwatch_vision::{Detector, Frame, FrameSource};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::mux::GridComposer;
use crate::registry::{RegionCell, RegionRegistry};

/// Owns the ROI registry and coordinates frames, detection, accumulation,
/// and persistence.
///
/// Construction does not spawn anything; `spawn_tick_loop` starts the
/// timer-driven accumulation loop. In-memory dwell state is authoritative
/// for the running process; the store is a best-effort durable mirror.
pub struct Engine {
    registry: RegionRegistry,
    store: RegionStore,
    frames: FrameSource,
    detector: Arc<dyn Detector>,
    config: EngineConfig,
    composer: Mutex<GridComposer>,
}

impl Engine {
    pub fn new(
        store: RegionStore,
        frames: FrameSource,
        detector: Arc<dyn Detector>,
        config: EngineConfig,
    ) -> Self {
        info!(detector = detector.name(), "Engine created");
        let composer = Mutex::new(GridComposer::new(config.grid_columns));
        Self {
            registry: RegionRegistry::new(),
            store,
            frames,
            detector,
            config,
            composer,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &RegionStore {
        &self.store
    }

    /// Generation counter of the newest captured frame.
    pub fn frame_generation(&self) -> u64 {
        self.frames.generation()
    }

    /// Repopulate the registry from the store's full-table scan.
    ///
    /// Persisted dwell totals are restored; transient accumulation state
    /// starts fresh (sub-second remainder across a restart is accepted
    /// precision loss).
    pub async fn rehydrate(&self) -> EngineResult<usize> {
        let records = self.store.load_all().await?;
        let count = records.len();
        for record in records {
            if let Err(e) = self.registry.add(record.bbox, record.dwell_seconds) {
                warn!(bbox = %record.bbox, "Skipping persisted region: {}", e);
            }
        }
        info!(count, "Rehydrated regions from store");
        Ok(count)
    }

    /// Create a tracked region: validate, persist with zero dwell, then
    /// register in memory.
    pub async fn add_region(&self, bbox: BoundingBox) -> EngineResult<(RegionId, usize)> {
        let bbox = bbox
            .validated()
            .map_err(|e| EngineError::invalid_region(e.to_string()))?;

        self.store.insert(&bbox, 0.0).await?;
        let (cell, index) = self.registry.add(bbox, 0.0)?;
        info!(bbox = %bbox, id = %cell.id, "Region added");
        Ok((cell.id, index))
    }

    /// Destroy a tracked region.
    ///
    /// The persisted record is deleted first; the in-memory slot (and its
    /// derived state) is released only once the delete succeeded, so a store
    /// failure can never leave a half-removed region.
    pub async fn remove_region(&self, bbox: &BoundingBox) -> EngineResult<()> {
        if !self.registry.contains(bbox) {
            return Err(EngineError::not_found(bbox.to_string()));
        }

        let had_record = self.store.delete(bbox).await?;
        if !had_record {
            warn!(bbox = %bbox, "Removed region had no persisted record");
        }
        // The slot removal is the authority: a concurrent removal of the same
        // bbox may have won between the contains check and here, and exactly
        // one caller gets the success.
        match self.registry.remove(bbox) {
            Some(_) => {
                info!(bbox = %bbox, "Region removed");
                Ok(())
            }
            None => Err(EngineError::not_found(bbox.to_string())),
        }
    }

    /// All tracked regions, in insertion order.
    pub fn list_regions(&self) -> Vec<RegionSnapshot> {
        self.registry.list()
    }

    /// Committed dwell time for one region.
    pub fn region_timer(&self, id: RegionId) -> EngineResult<f64> {
        self.registry
            .get(id)
            .map(|cell| cell.state().dwell_seconds)
            .ok_or_else(|| EngineError::not_found(format!("region {id}")))
    }

    pub fn region_exists(&self, id: RegionId) -> bool {
        self.registry.get(id).is_some()
    }

    /// The region's latest annotated crop, if it has been refreshed yet.
    ///
    /// `NotFound` once the region is removed; stream consumers use that to
    /// end their output loop.
    pub fn region_crop(&self, id: RegionId) -> EngineResult<Option<RgbImage>> {
        let cell = self
            .registry
            .get(id)
            .ok_or_else(|| EngineError::not_found(format!("region {id}")))?;
        let crop = cell.state().last_crop.clone();
        Ok(crop)
    }

    /// The latest frame with every registered region outlined.
    pub fn annotated_frame(&self) -> Option<RgbImage> {
        let frame = self.frames.latest()?;
        let boxes: Vec<BoundingBox> = self
            .registry
            .snapshot()
            .iter()
            .map(|cell| cell.bbox)
            .collect();
        Some(outline_regions(frame.image(), &boxes))
    }

    /// The combined grid of all refreshed region crops, or `None` when no
    /// region has a crop yet.
    pub fn grid_frame(&self) -> Option<RgbImage> {
        let crops: Vec<RgbImage> = self
            .registry
            .snapshot()
            .iter()
            .filter_map(|cell| cell.state().last_crop.clone())
            .collect();
        self.composer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .compose(&crops)
    }

    /// One accumulation cycle over a single frame snapshot.
    ///
    /// Every region sees the same frame; regions are processed sequentially
    /// and independently (no cross-region ordering is guaranteed).
    pub async fn run_cycle(&self) {
        let Some(frame) = self.frames.latest() else {
            return;
        };
        for cell in self.registry.snapshot() {
            self.process_region(&frame, &cell).await;
        }
    }

    async fn process_region(&self, frame: &Frame, cell: &RegionCell) {
        let now = Instant::now();

        let Some(crop) = frame.crop(&cell.bbox) else {
            // Out of frame this cycle: no accumulation, no persistence, but
            // the clock still advances so the next active cycle sees a sane dt.
            cell.state().clock.skip(now);
            return;
        };

        let detection = match self.detector.detect(&crop) {
            Ok(detection) => detection,
            Err(e) => {
                warn!(bbox = %cell.bbox, "Detection failed, skipping cycle: {}", e);
                cell.state().clock.skip(now);
                return;
            }
        };

        let annotated = annotate_detections(&crop, &detection);

        let (committed, total) = {
            let mut state = cell.state();
            let committed = state.clock.tick(now, detection.present());
            if committed > 0.0 {
                state.dwell_seconds += committed;
            }
            state.last_crop = Some(annotated);
            (committed, state.dwell_seconds)
        };

        if committed > 0.0 {
            // Best-effort mirror: in-memory dwell already advanced, so a
            // failed write is reported and retried implicitly by the next
            // commit, which carries the full total.
            if let Err(e) = self.store.update_dwell(&cell.bbox, total).await {
                warn!(bbox = %cell.bbox, total, "Dwell persistence failed: {}", e);
            }
        }
    }

    /// Start the timer-driven accumulation loop.
    pub fn spawn_tick_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.config.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                engine.run_cycle().await;
            }
        })
    }

    /// Stop capture and release the device. Idempotent.
    pub fn shutdown(&self) {
        self.frames.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use deskwatch_vision::{
        Detection, StaticDetector, SyntheticGrabber, VisionError, VisionResult,
    };

    async fn test_engine(detector: Arc<dyn Detector>) -> (Arc<Engine>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RegionStore::open(dir.path().join("regions.db"))
            .await
            .unwrap();
        let frames = FrameSource::start(
            Box::new(SyntheticGrabber::new(64, 48)),
            Duration::from_millis(10),
        )
        .unwrap();
        let engine = Arc::new(Engine::new(
            store,
            frames,
            detector,
            EngineConfig::default(),
        ));
        (engine, dir)
    }

    #[tokio::test]
    async fn test_add_then_list_includes_new_region_last() {
        let (engine, _dir) = test_engine(Arc::new(StaticDetector::always_empty())).await;
        let first = BoundingBox::new(0, 0, 16, 16);
        let second = BoundingBox::new(16, 0, 32, 16);

        engine.add_region(first).await.unwrap();
        let (id, index) = engine.add_region(second).await.unwrap();

        assert_eq!(index, 1);
        let listed = engine.list_regions();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].bbox, second);
        assert_eq!(listed[1].id, id);
    }

    #[tokio::test]
    async fn test_add_degenerate_region_is_rejected_without_persisting() {
        let (engine, _dir) = test_engine(Arc::new(StaticDetector::always_empty())).await;
        let degenerate = BoundingBox::new(10, 10, 10, 110);

        assert!(matches!(
            engine.add_region(degenerate).await,
            Err(EngineError::InvalidRegion(_))
        ));
        assert!(engine.list_regions().is_empty());
        assert_eq!(engine.rehydrate().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_region_then_remove_again_is_not_found() {
        let (engine, _dir) = test_engine(Arc::new(StaticDetector::always_empty())).await;
        let bbox = BoundingBox::new(0, 0, 16, 16);

        engine.add_region(bbox).await.unwrap();
        engine.remove_region(&bbox).await.unwrap();
        assert!(engine.list_regions().is_empty());

        assert!(matches!(
            engine.remove_region(&bbox).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_removal_succeeds_exactly_once() {
        let (engine, _dir) = test_engine(Arc::new(StaticDetector::always_empty())).await;
        let bbox = BoundingBox::new(0, 0, 16, 16);
        engine.add_region(bbox).await.unwrap();

        let (a, b) = tokio::join!(engine.remove_region(&bbox), engine.remove_region(&bbox));

        // Whatever the interleaving, only one caller wins the slot.
        assert!(a.is_ok() ^ b.is_ok());
        assert!(matches!(
            if a.is_err() { a } else { b },
            Err(EngineError::NotFound(_))
        ));
        assert!(engine.list_regions().is_empty());
    }

    #[tokio::test]
    async fn test_timer_on_unknown_id_is_not_found() {
        let (engine, _dir) = test_engine(Arc::new(StaticDetector::always_empty())).await;
        assert!(matches!(
            engine.region_timer(RegionId(999)),
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rehydrate_restores_persisted_regions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.db");
        let bbox = BoundingBox::new(0, 0, 16, 16);

        {
            let store = RegionStore::open(&path).await.unwrap();
            store.insert(&bbox, 9.0).await.unwrap();
        }

        let store = RegionStore::open(&path).await.unwrap();
        let frames = FrameSource::start(
            Box::new(SyntheticGrabber::new(64, 48)),
            Duration::from_millis(10),
        )
        .unwrap();
        let engine = Engine::new(
            store,
            frames,
            Arc::new(StaticDetector::always_empty()),
            EngineConfig::default(),
        );

        assert_eq!(engine.rehydrate().await.unwrap(), 1);
        let listed = engine.list_regions();
        assert_eq!(listed[0].bbox, bbox);
        assert_eq!(listed[0].dwell_seconds, 9.0);
    }

    #[tokio::test]
    async fn test_cycle_refreshes_crop_and_accumulates_presence() {
        let (engine, _dir) = test_engine(Arc::new(StaticDetector::always_present())).await;
        let bbox = BoundingBox::new(0, 0, 32, 24);
        let (id, _) = engine.add_region(bbox).await.unwrap();

        engine.run_cycle().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.run_cycle().await;

        let crop = engine.region_crop(id).unwrap().expect("crop refreshed");
        assert_eq!(crop.dimensions(), (32, 24));

        let cell = &engine.registry.snapshot()[0];
        assert!(cell.state().clock.fractional() > 0.0);
    }

    #[tokio::test]
    async fn test_cycle_skips_out_of_frame_region() {
        let (engine, _dir) = test_engine(Arc::new(StaticDetector::always_present())).await;
        // Synthetic frames are 64x48; this region lies entirely outside.
        let bbox = BoundingBox::new(100, 100, 200, 200);
        let (id, _) = engine.add_region(bbox).await.unwrap();

        engine.run_cycle().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.run_cycle().await;

        assert!(engine.region_crop(id).unwrap().is_none());
        let cell = &engine.registry.snapshot()[0];
        assert_eq!(cell.state().clock.fractional(), 0.0);
        assert_eq!(cell.state().dwell_seconds, 0.0);
    }

    #[tokio::test]
    async fn test_whole_second_commit_writes_the_committed_total() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegionStore::open(dir.path().join("regions.db"))
            .await
            .unwrap();
        let reader = store.clone();
        let frames = FrameSource::start(
            Box::new(SyntheticGrabber::new(64, 48)),
            Duration::from_millis(10),
        )
        .unwrap();
        let engine = Engine::new(
            store,
            frames,
            Arc::new(StaticDetector::always_present()),
            EngineConfig::default(),
        );

        let bbox = BoundingBox::new(0, 0, 32, 24);
        let (id, _) = engine.add_region(bbox).await.unwrap();

        engine.run_cycle().await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        engine.run_cycle().await;

        // One whole second committed and persisted; the sub-second remainder
        // stays queued in memory and never reaches the store.
        assert_eq!(engine.region_timer(id).unwrap(), 1.0);
        let records = reader.load_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dwell_seconds, 1.0);

        let cell = &engine.registry.snapshot()[0];
        let fractional = cell.state().clock.fractional();
        assert!(fractional > 0.0 && fractional < 1.0);
    }

    #[tokio::test]
    async fn test_failed_persistence_keeps_the_in_memory_total() {
        let (engine, _dir) = test_engine(Arc::new(StaticDetector::always_present())).await;
        let bbox = BoundingBox::new(0, 0, 32, 24);
        let (id, _) = engine.add_region(bbox).await.unwrap();

        engine.run_cycle().await;
        // Kill the store so the commit's write fails.
        engine.store().close().await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        engine.run_cycle().await;

        // The in-memory total is authoritative; a failed write never rolls
        // back the committed second.
        assert_eq!(engine.region_timer(id).unwrap(), 1.0);
    }

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn detect(&self, _crop: &RgbImage) -> VisionResult<Detection> {
            Err(VisionError::detection("model exploded"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_detection_failure_skips_cycle_without_state_change() {
        let (engine, _dir) = test_engine(Arc::new(FailingDetector)).await;
        let bbox = BoundingBox::new(0, 0, 32, 24);
        let (id, _) = engine.add_region(bbox).await.unwrap();

        engine.run_cycle().await;

        assert!(engine.region_crop(id).unwrap().is_none());
        let cell = &engine.registry.snapshot()[0];
        assert_eq!(cell.state().clock.fractional(), 0.0);
    }

    #[tokio::test]
    async fn test_annotated_frame_and_grid() {
        let (engine, _dir) = test_engine(Arc::new(StaticDetector::always_present())).await;

        // Grid with no refreshed crops yields nothing.
        assert!(engine.grid_frame().is_none());

        engine.add_region(BoundingBox::new(0, 0, 32, 24)).await.unwrap();
        engine.run_cycle().await;

        let full = engine.annotated_frame().expect("capture is running");
        assert_eq!(full.dimensions(), (64, 48));
        let grid = engine.grid_frame().expect("one populated cell");
        // One cell padded out to the fixed two-column row.
        assert_eq!(grid.dimensions(), (64, 24));
    }
}
