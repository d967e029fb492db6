//! A single on-disk segment: a header plus an ordered, append-only record
//! log, with partial/full in-memory materialization.

use crate::codec::{read_frame, write_frame};
use crate::errors::SegmentError;
use crate::key::Key;
use crate::search::binary_search;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SegmentHeader {
    pub largest_key: Key,
    pub lines_stored: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub key: Key,
    pub value: Vec<u8>,
}

/// A fixed-capacity, ordered, partially-loadable on-disk record file.
pub struct Segment {
    path: PathBuf,
    header: SegmentHeader,
    stored: Vec<StoredRecord>,
    unsaved: Vec<StoredRecord>,
    smallest_key: Key,
    fully_loaded: bool,
    max_rows_per_segment: u32,
}

impl Segment {
    /// Opens the segment at `path`. If the file exists it is partial-loaded;
    /// otherwise a fresh, empty segment is created and its initial header
    /// flushed to disk.
    #[instrument(skip_all, fields(path = ?path.as_ref()))]
    pub fn open(path: impl AsRef<Path>, max_rows_per_segment: u32) -> Result<Segment, SegmentError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            debug!("opening existing segment file");
            let mut segment = Segment {
                path: path.clone(),
                header: SegmentHeader::default(),
                stored: Vec::new(),
                unsaved: Vec::new(),
                smallest_key: Key::ZERO,
                fully_loaded: false,
                max_rows_per_segment,
            };
            segment.partial_load()?;
            Ok(segment)
        } else {
            debug!("creating new segment file");
            let segment = Segment {
                path,
                header: SegmentHeader::default(),
                stored: Vec::new(),
                unsaved: Vec::new(),
                smallest_key: Key::ZERO,
                fully_loaded: true,
                max_rows_per_segment,
            };
            segment.flush_header_only()?;
            Ok(segment)
        }
    }

    /// Builds a fresh segment whose header inherits `largest_key` from the
    /// previous tail segment, so the first auto-appended key in this
    /// segment is `previous.next()`.
    pub fn create_following(
        path: impl AsRef<Path>,
        max_rows_per_segment: u32,
        previous_largest_key: Key,
    ) -> Result<Segment, SegmentError> {
        let mut segment = Segment::open(path, max_rows_per_segment)?;
        segment.header.largest_key = previous_largest_key;
        segment.flush_header_only()?;
        Ok(segment)
    }

    pub fn smallest_key(&self) -> Key {
        self.smallest_key
    }

    pub fn largest_key(&self) -> Key {
        self.header.largest_key
    }

    pub fn lines_stored(&self) -> u32 {
        self.header.lines_stored
    }

    pub fn is_full(&self) -> bool {
        self.header.lines_stored >= self.max_rows_per_segment
    }

    /// Appends `value` under an auto-assigned key: the successor of the
    /// segment's current `largest_key`.
    #[instrument(skip(self, value), fields(path = ?self.path))]
    pub fn auto_append(&mut self, value: Vec<u8>) -> Result<Key, SegmentError> {
        self.check_not_full()?;
        let new_key = self.header.largest_key.next();
        self.push_record(StoredRecord { key: new_key, value });
        info!(key = %new_key, "auto-appended record");
        Ok(new_key)
    }

    /// Appends `record` under its own (explicit) key, which must be strictly
    /// greater than the segment's current `largest_key`.
    #[instrument(skip(self, record), fields(path = ?self.path, key = %record.key))]
    pub fn append(&mut self, record: StoredRecord) -> Result<(), SegmentError> {
        self.check_not_full()?;
        if self.header.largest_key.greater_or_equal(record.key) {
            return Err(SegmentError::SegmentRangeExceeded {
                from: record.key,
                to: record.key,
                smallest_key: self.smallest_key,
                largest_key: self.header.largest_key,
            });
        }
        let key = record.key;
        self.push_record(record);
        info!(%key, "appended explicit-key record");
        Ok(())
    }

    fn check_not_full(&self) -> Result<(), SegmentError> {
        if self.header.lines_stored >= self.max_rows_per_segment {
            return Err(SegmentError::SegmentFull {
                path: self.path.clone(),
                lines_stored: self.header.lines_stored,
                max_rows_per_segment: self.max_rows_per_segment,
            });
        }
        Ok(())
    }

    fn push_record(&mut self, record: StoredRecord) {
        self.header.largest_key = record.key;
        if self.header.lines_stored == 0 {
            self.smallest_key = record.key;
        }
        self.unsaved.push(record.clone());
        self.stored.push(record);
        self.header.lines_stored += 1;
    }

    /// Returns the value stored at `key`.
    #[instrument(skip(self), fields(path = ?self.path, %key))]
    pub fn get(&mut self, key: Key) -> Result<Vec<u8>, SegmentError> {
        if key.greater_than(self.header.largest_key) || key.less_than(self.smallest_key) {
            return Err(SegmentError::SegmentRangeExceeded {
                from: key,
                to: key,
                smallest_key: self.smallest_key,
                largest_key: self.header.largest_key,
            });
        }
        self.ensure_fully_loaded()?;

        let idx = binary_search(
            &self.stored,
            |r| key.less_than(r.key),
            |r| key.equal(r.key),
        );
        match idx {
            Some(i) => Ok(self.stored[i].value.clone()),
            None => Err(SegmentError::ItemNotFound {
                key,
                smallest_key: self.smallest_key,
                largest_key: self.header.largest_key,
            }),
        }
    }

    /// Returns every record whose key lies in `[from, to]`, in ascending
    /// order.
    #[instrument(skip(self), fields(path = ?self.path, %from, %to))]
    pub fn get_all(&mut self, from: Key, to: Key) -> Result<Vec<StoredRecord>, SegmentError> {
        if from.greater_than(self.header.largest_key) || to.less_than(self.smallest_key) {
            return Err(SegmentError::SegmentRangeExceeded {
                from,
                to,
                smallest_key: self.smallest_key,
                largest_key: self.header.largest_key,
            });
        }
        self.ensure_fully_loaded()?;

        if self.stored.is_empty() {
            return Ok(Vec::new());
        }

        let start = if from.greater_than(self.smallest_key) {
            // first index whose key is >= from
            self.stored.partition_point(|r| r.key.less_than(from))
        } else {
            0
        };
        let end = if to.less_than(self.header.largest_key) {
            // last index whose key is <= to
            self.stored.partition_point(|r| r.key.less_or_equal(to))
        } else {
            self.stored.len()
        };

        if start >= end {
            return Ok(Vec::new());
        }
        Ok(self.stored[start..end].to_vec())
    }

    fn ensure_fully_loaded(&mut self) -> Result<(), SegmentError> {
        if self.fully_loaded {
            return Ok(());
        }
        self.full_load()
    }

    /// Reads the header and the first resident record, if any, to recover
    /// `smallest_key` without materializing the rest of the file.
    fn partial_load(&mut self) -> Result<(), SegmentError> {
        let file = File::open(&self.path).map_err(|e| self.io_err(e))?;
        let mut reader = BufReader::new(file);

        let header: SegmentHeader = match read_frame(&mut reader).map_err(SegmentError::from)? {
            Some(h) => h,
            None => SegmentHeader::default(),
        };
        self.header = header;

        if let Some(first) = read_frame::<_, StoredRecord>(&mut reader).map_err(SegmentError::from)? {
            self.smallest_key = first.key;
            self.stored = vec![first];
        }
        self.fully_loaded = false;
        debug!(
            largest_key = %self.header.largest_key,
            lines_stored = self.header.lines_stored,
            "partial load complete"
        );
        Ok(())
    }

    /// Streams every record from disk into memory, then reconciles any
    /// records appended in-memory before the full load was triggered.
    #[instrument(skip(self), fields(path = ?self.path))]
    fn full_load(&mut self) -> Result<(), SegmentError> {
        let file = File::open(&self.path).map_err(|e| self.io_err(e))?;
        let mut reader = BufReader::new(file);

        let header: SegmentHeader = match read_frame(&mut reader).map_err(SegmentError::from)? {
            Some(h) => h,
            None => SegmentHeader::default(),
        };
        self.header = header;

        let mut records = Vec::new();
        while let Some(record) = read_frame::<_, StoredRecord>(&mut reader).map_err(SegmentError::from)? {
            records.push(record);
        }

        if let Some(last_unsaved) = self.unsaved.last() {
            self.header.largest_key = last_unsaved.key;
        }
        records.extend(self.unsaved.iter().cloned());
        if let Some(first) = records.first() {
            self.smallest_key = first.key;
        }
        self.stored = records;
        self.fully_loaded = true;
        info!(lines_loaded = self.stored.len(), "full load complete");
        Ok(())
    }

    /// Writes the header and just the header (used when creating a fresh
    /// segment file, before any records exist).
    fn flush_header_only(&self) -> Result<(), SegmentError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        let mut writer = std::io::BufWriter::new(file);
        write_frame(&mut writer, &self.header)?;
        Ok(())
    }

    /// Rewrites the header, then appends every `unsaved` record, then
    /// clears the buffer. A fresh file handle is opened and closed for this
    /// call only; no handle is held between operations.
    #[instrument(skip(self), fields(path = ?self.path))]
    pub fn flush(&mut self) -> Result<(), SegmentError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        let mut writer = std::io::BufWriter::new(file);
        write_frame(&mut writer, &self.header)?;

        // The file is truncated above, so every record — not just the
        // unsaved tail — must be rewritten. A partially-loaded segment only
        // holds its smallest record in memory, so force a full load first.
        self.ensure_fully_loaded()?;
        for record in &self.stored {
            write_frame(&mut writer, record)?;
        }
        use std::io::Write;
        writer.flush().map_err(|e| self.io_err(e))?;
        self.unsaved.clear();
        debug!(lines = self.stored.len(), "segment flushed");
        Ok(())
    }

    fn io_err(&self, source: std::io::Error) -> SegmentError {
        SegmentError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
