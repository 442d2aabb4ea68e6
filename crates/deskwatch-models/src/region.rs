//! Region identity and control-surface snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// Stable opaque handle for a tracked region.
///
/// Assigned monotonically at creation and never reused for the life of the
/// process. External consumers address an existing region by this handle
/// rather than by its position in the region list, so a concurrent removal
/// cannot shift the meaning of a reference they hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u64);

impl RegionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time view of a tracked region, as reported by list operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub id: RegionId,
    pub bbox: BoundingBox,
    /// Committed dwell time in whole-second granularity.
    pub dwell_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_id_serializes_transparently() {
        let id = RegionId(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: RegionId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_region_id_display() {
        assert_eq!(RegionId(7).to_string(), "7");
    }
}
