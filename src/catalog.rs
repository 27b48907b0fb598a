use thiserror::Error;

/// Version counter for one backend-owned collection. Bumped only after the
/// backend confirms a mutation; there is no optimistic bump. Cached
/// snapshots remember the version they were fetched at and go stale when
/// the counter moves past them, at which point the consumer re-fetches the
/// whole collection. No in-place patching.
#[derive(Debug, Default)]
pub struct CollectionVersion {
    current: u64,
}

impl CollectionVersion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.current
    }

    pub fn bump(&mut self) {
        self.current += 1;
    }
}

/// A wholesale read of a collection, tagged with the version it was taken
/// at. Read-only: the backend stays the source of truth.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    version: u64,
    pub items: Vec<T>,
}

impl<T> Snapshot<T> {
    pub fn capture(version: &CollectionVersion, items: Vec<T>) -> Self {
        Self {
            version: version.get(),
            items,
        }
    }

    pub fn is_stale(&self, version: &CollectionVersion) -> bool {
        self.version != version.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a submission is already in flight")]
pub struct SubmissionInFlight;

/// Serializes mutations: while one create/update/delete is pending, further
/// submissions are refused instead of queued, which is what keeps the
/// displayed list from diverging from backend truth.
#[derive(Debug, Default)]
pub struct SubmissionGate {
    in_flight: bool,
}

impl SubmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> Result<(), SubmissionInFlight> {
        if self.in_flight {
            return Err(SubmissionInFlight);
        }
        self.in_flight = true;
        Ok(())
    }

    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    pub fn is_open(&self) -> bool {
        !self.in_flight
    }
}

#[cfg(test)]
mod test {
    use super::{CollectionVersion, Snapshot, SubmissionGate, SubmissionInFlight};

    #[test]
    pub fn test_snapshot_goes_stale_on_bump() {
        let mut version = CollectionVersion::new();
        let snapshot = Snapshot::capture(&version, vec!["a", "b"]);
        assert!(!snapshot.is_stale(&version));

        version.bump();
        assert!(snapshot.is_stale(&version));

        let refreshed = Snapshot::capture(&version, vec!["a", "b", "c"]);
        assert!(!refreshed.is_stale(&version));
        assert_eq!(refreshed.items.len(), 3);
    }

    #[test]
    pub fn test_gate_refuses_overlapping_submissions() {
        let mut gate = SubmissionGate::new();
        assert!(gate.is_open());

        gate.begin().unwrap();
        assert_eq!(gate.begin(), Err(SubmissionInFlight));
        assert!(!gate.is_open());

        gate.finish();
        gate.begin().unwrap();
    }
}
