//! Event-identifier compaction.
//!
//! Event identifiers can be sparse: the maximum identifier may exceed
//! the record count by orders of magnitude, so identifiers cannot be
//! used directly as array indices. The map here is the sorted set of
//! distinct identifiers observed (possibly across two streams), giving
//! every identifier a dense offset in `[0, E)`. Construction is sort +
//! merge, not hashing, so the ordering is deterministic and lookup cost
//! is predictable: `O((N + M) log E)` over two streams of N and M
//! records.

/// Sparse heuristic from the production analysis: identifiers are worth
/// compacting when the maximum exceeds ten times the record count.
pub const SPARSE_THRESHOLD: u64 = 10;

/// Returns true when identifiers are sparse relative to the record count.
#[must_use]
pub fn is_sparse(max_id: u32, total_records: u64) -> bool {
    u64::from(max_id) > SPARSE_THRESHOLD.saturating_mul(total_records)
}

/// Incremental builder: feed each batch's identifiers, then build.
///
/// Memory is O(E) for E distinct identifiers; per batch the new
/// identifiers are sorted, deduplicated, and union-merged into the
/// running sorted set.
#[derive(Debug, Default)]
pub struct EventIndexBuilder {
    ids: Vec<u32>,
    scratch: Vec<u32>,
}

impl EventIndexBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes one batch of event identifiers (any order, duplicates fine).
    pub fn observe(&mut self, ids: &[u32]) {
        if ids.is_empty() {
            return;
        }
        self.scratch.clear();
        self.scratch.extend_from_slice(ids);
        self.scratch.sort_unstable();
        self.scratch.dedup();

        if self.ids.is_empty() {
            std::mem::swap(&mut self.ids, &mut self.scratch);
            return;
        }

        // Two-pointer union of the running set and the batch set.
        let mut merged = Vec::with_capacity(self.ids.len() + self.scratch.len());
        let (mut i, mut j) = (0, 0);
        while i < self.ids.len() && j < self.scratch.len() {
            match self.ids[i].cmp(&self.scratch[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(self.ids[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(self.scratch[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(self.ids[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&self.ids[i..]);
        merged.extend_from_slice(&self.scratch[j..]);
        self.ids = merged;
    }

    /// Finishes construction.
    #[must_use]
    pub fn build(self) -> EventIndexMap {
        EventIndexMap::from_sorted_distinct(self.ids)
    }
}

/// Immutable order-preserving bijection from distinct event identifiers
/// to dense offsets `[0, E)`.
///
/// When the identifiers are already contiguous from zero the indirection
/// is dropped entirely and the identifier is its own index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventIndexMap {
    repr: Repr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Repr {
    /// Identifiers are exactly `0..len`; the map is the identity.
    Dense { len: usize },
    /// Sorted distinct identifiers; offset = position.
    Sorted { ids: Vec<u32> },
}

impl EventIndexMap {
    /// Builds a map from an arbitrary identifier sequence.
    #[must_use]
    pub fn from_ids<I: IntoIterator<Item = u32>>(ids: I) -> Self {
        let mut ids: Vec<u32> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self::from_sorted_distinct(ids)
    }

    fn from_sorted_distinct(ids: Vec<u32>) -> Self {
        let len = ids.len();
        let contiguous = match (ids.first(), ids.last()) {
            (Some(&first), Some(&last)) => first == 0 && last as usize == len - 1,
            _ => true, // the empty map is trivially dense
        };
        if contiguous {
            Self {
                repr: Repr::Dense { len },
            }
        } else {
            Self {
                repr: Repr::Sorted { ids },
            }
        }
    }

    /// Number of distinct identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Dense { len } => *len,
            Repr::Sorted { ids } => ids.len(),
        }
    }

    /// Returns true when no identifier was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true when the dense fast path is active.
    #[must_use]
    pub fn is_dense(&self) -> bool {
        matches!(self.repr, Repr::Dense { .. })
    }

    /// Dense offset of an identifier, or `None` when never observed.
    #[must_use]
    pub fn index_of(&self, id: u32) -> Option<usize> {
        match &self.repr {
            Repr::Dense { len } => {
                let idx = id as usize;
                (idx < *len).then_some(idx)
            }
            Repr::Sorted { ids } => ids.binary_search(&id).ok(),
        }
    }

    /// Inverse lookup: the identifier at a dense offset.
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<u32> {
        match &self.repr {
            Repr::Dense { len } => (index < *len).then(|| u32::try_from(index).unwrap_or(u32::MAX)),
            Repr::Sorted { ids } => ids.get(index).copied(),
        }
    }
}

/// Per-event weighted sums over dense offsets.
///
/// The aggregation the map exists for: with two streams mapped through
/// one shared union map, the resulting vectors are aligned per physical
/// event. `weights` of `None` counts records instead. Identifiers absent
/// from the map are skipped.
#[must_use]
pub fn per_event_weighted_sums(
    map: &EventIndexMap,
    ids: &[u32],
    weights: Option<&[f32]>,
) -> Vec<f64> {
    let mut sums = vec![0.0_f64; map.len()];
    for (i, &id) in ids.iter().enumerate() {
        if let Some(offset) = map.index_of(id) {
            sums[offset] += weights.map_or(1.0, |w| f64::from(w[i]));
        }
    }
    sums
}
