//! The ordered collection of segments that makes up one table. Routes
//! appends to the tail segment, creating a new one when needed; dispatches
//! lookups via binary search over segment bounds; stitches range scans
//! across segment boundaries.

use crate::errors::{SegmentError, SegmentSetError};
use crate::key::Key;
use crate::search::binary_search;
use crate::segment::{Segment, StoredRecord};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

pub struct SegmentSet {
    dir: PathBuf,
    segments: Vec<Segment>,
    largest_key: Key,
    max_rows_per_segment: u32,
}

impl SegmentSet {
    /// Opens (creating if absent) the `segments/` directory under `dir`,
    /// loads every existing segment file (partial load), and sorts them by
    /// `smallest_key`.
    #[instrument(skip_all, fields(dir = ?dir.as_ref()))]
    pub fn open(dir: impl AsRef<Path>, max_rows_per_segment: u32) -> Result<SegmentSet, SegmentSetError> {
        let dir = dir.as_ref().to_path_buf();
        let segments_dir = dir.join("segments");
        fs::create_dir_all(&segments_dir).map_err(|e| SegmentSetError::Io {
            path: segments_dir.clone(),
            source: e,
        })?;

        let mut paths: Vec<PathBuf> = fs::read_dir(&segments_dir)
            .map_err(|e| SegmentSetError::Io {
                path: segments_dir.clone(),
                source: e,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();

        let mut segments = Vec::with_capacity(paths.len());
        for path in &paths {
            segments.push(Segment::open(path, max_rows_per_segment)?);
        }
        segments.sort_by_key(|s| s.smallest_key());

        let largest_key = segments.last().map(|s| s.largest_key()).unwrap_or(Key::ZERO);

        info!(segments = segments.len(), %largest_key, "segment set opened");

        Ok(SegmentSet {
            dir,
            segments,
            largest_key,
            max_rows_per_segment,
        })
    }

    pub fn largest_key(&self) -> Key {
        self.largest_key
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Appends `value` under an auto-assigned key, routed to the tail
    /// segment (creating a new tail if none exists or the current tail is
    /// full).
    #[instrument(skip(self, value), fields(dir = ?self.dir))]
    pub fn auto_append(&mut self, value: Vec<u8>) -> Result<Key, SegmentSetError> {
        let needs_rotation = match self.segments.last() {
            Some(tail) => tail.is_full(),
            None => true,
        };
        let tail = if needs_rotation {
            self.add_segment()?
        } else {
            let idx = self.segments.len() - 1;
            &mut self.segments[idx]
        };
        let key = tail.auto_append(value)?;
        self.largest_key = key;
        Ok(key)
    }

    /// Appends `record` under its explicit key, routed to the segment whose
    /// range contains that key.
    #[instrument(skip(self, record), fields(dir = ?self.dir, key = %record.key))]
    pub fn append(&mut self, record: StoredRecord) -> Result<(), SegmentSetError> {
        let key = record.key;
        let idx = self.find_segment_index(key)?;
        self.segments[idx].append(record)?;
        if key.greater_than(self.largest_key) {
            self.largest_key = key;
        }
        Ok(())
    }

    /// Returns every record whose key lies in `[from, to]`, stitched across
    /// segment boundaries, in ascending order.
    #[instrument(skip(self), fields(dir = ?self.dir, %from, %to))]
    pub fn get_all(&mut self, from: Key, to: Key) -> Result<Vec<StoredRecord>, SegmentSetError> {
        let mut results = Vec::new();
        for segment in &mut self.segments {
            match segment.get_all(from, to) {
                Ok(records) => results.extend(records),
                Err(SegmentError::SegmentRangeExceeded { .. }) => {
                    if !results.is_empty() {
                        // We have already collected matching records and
                        // this segment has none; we are past the end of
                        // the requested range.
                        break;
                    }
                    continue;
                }
                Err(other) => return Err(other.into()),
            }
        }
        Ok(results)
    }

    /// Flushes every segment. The first error aborts the commit; remaining
    /// segments are left unflushed.
    #[instrument(skip(self), fields(dir = ?self.dir))]
    pub fn commit(&mut self) -> Result<(), SegmentSetError> {
        for segment in &mut self.segments {
            segment.flush()?;
        }
        debug!(segments = self.segments.len(), "segment set committed");
        Ok(())
    }

    /// Binary searches `self.segments` for the index of the segment whose
    /// key range contains `key`, treating a segment whose `largest_key` is
    /// the all-zero sentinel as open-ended.
    fn find_segment_index(&self, key: Key) -> Result<usize, SegmentSetError> {
        if self.segments.is_empty() {
            return Err(SegmentSetError::SegmentRangeExceeded {
                key,
                smallest_key: Key::ZERO,
                largest_key: Key::ZERO,
            });
        }
        if self.segments.len() == 1 {
            return Ok(0);
        }

        let idx = binary_search(
            &self.segments,
            |s| key.less_than(s.smallest_key()),
            |s| {
                let open_ended = s.largest_key().equal(Key::ZERO);
                key.greater_or_equal(s.smallest_key())
                    && (open_ended || key.less_or_equal(s.largest_key()))
            },
        );
        idx.ok_or(SegmentSetError::SegmentRangeExceeded {
            key,
            smallest_key: self.segments[0].smallest_key(),
            largest_key: self.largest_key,
        })
    }

    /// Creates a new tail segment whose initial `largest_key` equals the
    /// previous tail's (or zero if this is the first segment), preserving
    /// global key monotonicity across the set, and returns it.
    fn add_segment(&mut self) -> Result<&mut Segment, SegmentSetError> {
        let ordinal = self.segments.len();
        let path = self
            .dir
            .join("segments")
            .join(format!("s0x{ordinal:08x}.txt"));
        let previous_largest = self
            .segments
            .last()
            .map(|s| s.largest_key())
            .unwrap_or(Key::ZERO);
        let segment = Segment::create_following(path, self.max_rows_per_segment, previous_largest)?;
        debug!(ordinal, %previous_largest, "rotated to new tail segment");
        self.segments.push(segment);
        let idx = self.segments.len() - 1;
        Ok(&mut self.segments[idx])
    }
}
