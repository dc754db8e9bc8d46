//! Mass-storage space: the free-space table of a pack, and the
//! allocation table which maps the tracks of one file cycle onto
//! the tracks of the pack.
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use tracing::{event, Level};

/// A run of consecutive tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TrackRegion {
    pub first: u64,
    pub count: u64,
}

impl TrackRegion {
    #[must_use]
    pub const fn new(first: u64, count: u64) -> TrackRegion {
        TrackRegion { first, count }
    }

    /// One past the last track of the region.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.first + self.count
    }
}

impl Display for TrackRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}..{}", self.first, self.limit())
    }
}

/// The unallocated tracks of a pack, kept as a map from the first
/// track of each free region to its length.  Adjacent free regions
/// are always merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackFreeSpace {
    capacity: u64,
    free_tracks: u64,
    regions: BTreeMap<u64, u64>,
}

impl PackFreeSpace {
    #[must_use]
    pub fn new(capacity: u64) -> PackFreeSpace {
        let mut regions = BTreeMap::new();
        if capacity > 0 {
            regions.insert(0, capacity);
        }
        PackFreeSpace {
            capacity,
            free_tracks: capacity,
            regions,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[must_use]
    pub fn free_tracks(&self) -> u64 {
        self.free_tracks
    }

    pub fn free_regions(&self) -> impl Iterator<Item = TrackRegion> + '_ {
        self.regions
            .iter()
            .map(|(first, count)| TrackRegion::new(*first, *count))
    }

    fn take(&mut self, region: TrackRegion) {
        // `region` must lie within a single free region.
        let Some((&start, &len)) = self.regions.range(..=region.first).next_back() else {
            return;
        };
        self.regions.remove(&start);
        if region.first > start {
            self.regions.insert(start, region.first - start);
        }
        let end = start + len;
        if region.limit() < end {
            self.regions.insert(region.limit(), end - region.limit());
        }
        self.free_tracks -= region.count;
    }

    /// Allocate `count` tracks.  A single contiguous region is used
    /// if one is big enough; otherwise the space is gathered from
    /// the largest free regions.  Returns `None`, allocating nothing,
    /// if the pack does not have enough free tracks.
    pub fn allocate(&mut self, count: u64) -> Option<Vec<TrackRegion>> {
        if count > self.free_tracks {
            event!(
                Level::WARN,
                "pack has {} free tracks, cannot allocate {count}",
                self.free_tracks
            );
            return None;
        }
        if count == 0 {
            return Some(Vec::new());
        }
        let exact = self
            .regions
            .iter()
            .find(|(_, len)| **len == count)
            .or_else(|| self.regions.iter().find(|(_, len)| **len > count))
            .map(|(first, _)| *first);
        if let Some(first) = exact {
            let region = TrackRegion::new(first, count);
            self.take(region);
            return Some(vec![region]);
        }

        let mut result = Vec::new();
        let mut wanted = count;
        while wanted > 0 {
            let Some((first, len)) = self
                .regions
                .iter()
                .max_by_key(|(first, len)| (**len, std::cmp::Reverse(**first)))
                .map(|(first, len)| (*first, *len))
            else {
                break;
            };
            let region = TrackRegion::new(first, len.min(wanted));
            self.take(region);
            wanted -= region.count;
            result.push(region);
        }
        result.sort();
        Some(result)
    }

    /// Mark a specific region as allocated.  Fails, changing nothing,
    /// unless every track of the region is currently free.
    pub fn allocate_specific(&mut self, region: TrackRegion) -> bool {
        if region.count == 0 {
            return true;
        }
        match self.regions.range(..=region.first).next_back() {
            Some((&start, &len)) if region.limit() <= start + len => {
                self.take(region);
                true
            }
            _ => false,
        }
    }

    /// Return a region to the free pool.  Fails, changing nothing,
    /// if any part of the region is already free or lies off the
    /// end of the pack.
    pub fn release(&mut self, region: TrackRegion) -> bool {
        if region.count == 0 {
            return true;
        }
        if region.limit() > self.capacity {
            return false;
        }
        let before = self.regions.range(..region.limit()).next_back();
        if let Some((&start, &len)) = before {
            if start + len > region.first {
                event!(Level::ERROR, "tracks {region} are already free");
                return false;
            }
        }
        let mut first = region.first;
        let mut count = region.count;
        if let Some((&start, &len)) = self.regions.range(..region.first).next_back() {
            if start + len == region.first {
                self.regions.remove(&start);
                first = start;
                count += len;
            }
        }
        if let Some(len) = self.regions.remove(&region.limit()) {
            count += len;
        }
        self.regions.insert(first, count);
        self.free_tracks += region.count;
        true
    }
}

/// One entry of a file cycle's allocation table: `count` file
/// tracks starting at `file_track` live on the pack starting at
/// `pack_track`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Extent {
    pub file_track: u64,
    pub pack_track: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationTable {
    // Keyed by first file track.  Entries never overlap.
    extents: BTreeMap<u64, (u64, u64)>,
}

impl AllocationTable {
    #[must_use]
    pub fn new() -> AllocationTable {
        AllocationTable::default()
    }

    pub fn extents(&self) -> impl Iterator<Item = Extent> + '_ {
        self.extents
            .iter()
            .map(|(file_track, (pack_track, count))| Extent {
                file_track: *file_track,
                pack_track: *pack_track,
                count: *count,
            })
    }

    #[must_use]
    pub fn allocated_tracks(&self) -> u64 {
        self.extents.values().map(|(_, count)| count).sum()
    }

    /// The parts of the file-relative region which have no pack
    /// tracks behind them.
    #[must_use]
    pub fn unallocated_runs(&self, region: TrackRegion) -> Vec<TrackRegion> {
        let mut result = Vec::new();
        let mut cursor = region.first;
        // An extent starting before the region may still cover its
        // beginning.
        let start = self
            .extents
            .range(..region.first)
            .next_back()
            .map_or(region.first, |(first, _)| *first);
        for (first, (_, count)) in self.extents.range(start..region.limit()) {
            let limit = first + count;
            if *first > cursor {
                result.push(TrackRegion::new(cursor, first - cursor));
            }
            cursor = cursor.max(limit);
            if cursor >= region.limit() {
                break;
            }
        }
        if cursor < region.limit() {
            result.push(TrackRegion::new(cursor, region.limit() - cursor));
        }
        result
    }

    #[must_use]
    pub fn is_allocated(&self, region: TrackRegion) -> bool {
        self.unallocated_runs(region).is_empty()
    }

    /// Record that file tracks `file_first..` are on the pack at
    /// `pack`.  The caller ensures the file tracks were unallocated.
    pub fn insert(&mut self, file_first: u64, pack: TrackRegion) {
        if pack.count == 0 {
            return;
        }
        let mut file_first = file_first;
        let mut pack_first = pack.first;
        let mut count = pack.count;
        if let Some((&prev_file, &(prev_pack, prev_count))) =
            self.extents.range(..file_first).next_back()
        {
            if prev_file + prev_count == file_first && prev_pack + prev_count == pack_first {
                self.extents.remove(&prev_file);
                file_first = prev_file;
                pack_first = prev_pack;
                count += prev_count;
            }
        }
        let next_file = file_first + count;
        if let Some(&(next_pack, next_count)) = self.extents.get(&next_file) {
            if pack_first + count == next_pack {
                self.extents.remove(&next_file);
                count += next_count;
            }
        }
        self.extents.insert(file_first, (pack_first, count));
    }

    /// Empty the table, returning the pack regions it held.
    pub fn take_all(&mut self) -> Vec<TrackRegion> {
        std::mem::take(&mut self.extents)
            .into_values()
            .map(|(pack_track, count)| TrackRegion::new(pack_track, count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::collection::vec;
    use test_strategy::proptest;

    use super::*;

    #[test]
    fn test_fresh_pack_is_one_region() {
        let pack = PackFreeSpace::new(100);
        assert_eq!(pack.free_tracks(), 100);
        assert_eq!(
            pack.free_regions().collect::<Vec<_>>(),
            vec![TrackRegion::new(0, 100)]
        );
    }

    #[test]
    fn test_allocate_and_release_coalesce() {
        let mut pack = PackFreeSpace::new(100);
        let a = pack.allocate(10).expect("space");
        let b = pack.allocate(20).expect("space");
        assert_eq!(a, vec![TrackRegion::new(0, 10)]);
        assert_eq!(b, vec![TrackRegion::new(10, 20)]);
        assert_eq!(pack.free_tracks(), 70);
        assert!(pack.release(a[0]));
        assert!(pack.release(b[0]));
        assert_eq!(
            pack.free_regions().collect::<Vec<_>>(),
            vec![TrackRegion::new(0, 100)]
        );
    }

    #[test]
    fn test_exact_fit_preferred() {
        let mut pack = PackFreeSpace::new(100);
        assert!(pack.allocate_specific(TrackRegion::new(5, 90)));
        // Free space is now 0..5 and 95..100.
        assert_eq!(pack.allocate(5), Some(vec![TrackRegion::new(0, 5)]));
    }

    #[test]
    fn test_fragmented_allocation() {
        let mut pack = PackFreeSpace::new(30);
        assert!(pack.allocate_specific(TrackRegion::new(10, 10)));
        let regions = pack.allocate(15).expect("enough free tracks");
        assert_eq!(regions.iter().map(|r| r.count).sum::<u64>(), 15);
        assert_eq!(pack.free_tracks(), 5);
    }

    #[test]
    fn test_pack_full() {
        let mut pack = PackFreeSpace::new(10);
        assert_eq!(pack.allocate(11), None);
        assert_eq!(pack.free_tracks(), 10);
    }

    #[test]
    fn test_double_release_rejected() {
        let mut pack = PackFreeSpace::new(10);
        assert!(!pack.release(TrackRegion::new(2, 2)));
        assert!(!pack.release(TrackRegion::new(9, 5)));
        assert_eq!(pack.free_tracks(), 10);
    }

    #[test]
    fn test_allocate_specific_must_be_free() {
        let mut pack = PackFreeSpace::new(10);
        assert!(pack.allocate_specific(TrackRegion::new(2, 3)));
        assert!(!pack.allocate_specific(TrackRegion::new(4, 2)));
        assert_eq!(pack.free_tracks(), 7);
    }

    #[test]
    fn test_unallocated_runs() {
        let mut table = AllocationTable::new();
        table.insert(0, TrackRegion::new(50, 10));
        table.insert(20, TrackRegion::new(80, 5));
        assert_eq!(
            table.unallocated_runs(TrackRegion::new(5, 25)),
            vec![TrackRegion::new(10, 10), TrackRegion::new(25, 5)]
        );
        assert!(table.is_allocated(TrackRegion::new(2, 8)));
        assert!(!table.is_allocated(TrackRegion::new(2, 9)));
        assert_eq!(table.allocated_tracks(), 15);
    }

    #[test]
    fn test_insert_merges_contiguous_extents() {
        let mut table = AllocationTable::new();
        table.insert(0, TrackRegion::new(50, 10));
        table.insert(10, TrackRegion::new(60, 5));
        table.insert(15, TrackRegion::new(90, 5));
        assert_eq!(
            table.extents().collect::<Vec<_>>(),
            vec![
                Extent {
                    file_track: 0,
                    pack_track: 50,
                    count: 15
                },
                Extent {
                    file_track: 15,
                    pack_track: 90,
                    count: 5
                },
            ]
        );
        let mut regions = table.take_all();
        regions.sort();
        assert_eq!(
            regions,
            vec![TrackRegion::new(50, 15), TrackRegion::new(90, 5)]
        );
        assert_eq!(table.allocated_tracks(), 0);
    }

    #[proptest]
    fn released_space_coalesces(
        #[strategy(vec(1u64..40, 0..20))] requests: Vec<u64>,
        reverse: bool,
    ) {
        let mut pack = PackFreeSpace::new(300);
        let mut held: Vec<TrackRegion> = Vec::new();
        for count in requests {
            match pack.allocate(count) {
                Some(regions) => {
                    assert_eq!(regions.iter().map(|r| r.count).sum::<u64>(), count);
                    held.extend(regions);
                }
                None => assert!(pack.free_tracks() < count),
            }
            let held_tracks: u64 = held.iter().map(|r| r.count).sum();
            assert_eq!(pack.free_tracks() + held_tracks, 300);
        }
        if reverse {
            held.reverse();
        }
        for region in held {
            assert!(pack.release(region));
        }
        assert_eq!(
            pack.free_regions().collect::<Vec<_>>(),
            vec![TrackRegion::new(0, 300)]
        );
    }
}
