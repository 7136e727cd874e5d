// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outcome counters shared by every process in a run.
//!
//! The counters live in a small file inside the run directory that every process maps with
//! `MAP_SHARED`. All mappings of the file are backed by the same physical pages, so an atomic
//! read-modify-write in one worker is atomic with respect to every other worker, with no
//! locking.
//!
//! Layout, in native-endian `u64` slots:
//!
//! | slot | contents |
//! |------|----------|
//! | 0    | magic    |
//! | 1..5 | one count per [`OutcomeKind`], by [`OutcomeKind::index`] |

use crate::errors::RunContextError;
use camino::{Utf8Path, Utf8PathBuf};
use memmap2::MmapMut;
use quick_xunit::{OutcomeKind, ReportHeader};
use std::{
    fmt,
    fs::OpenOptions,
    sync::atomic::{AtomicU64, Ordering},
};

const MAGIC: u64 = u64::from_ne_bytes(*b"XUNITMP1");
const SLOT_COUNT: usize = 1 + OutcomeKind::ALL.len();
const LAYOUT_LEN: usize = SLOT_COUNT * size_of::<AtomicU64>();

/// Process-wide tallies of outcome kinds.
pub struct SharedCounters {
    path: Utf8PathBuf,
    map: MmapMut,
}

impl SharedCounters {
    /// Creates a new counters file at `path`, with every count at zero.
    ///
    /// Fails if the file already exists.
    pub(crate) fn create(path: &Utf8Path) -> Result<Self, RunContextError> {
        let map_err = |error| RunContextError::CountersMap {
            path: path.to_owned(),
            error,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(map_err)?;
        // Extending a new file fills it with zeroes.
        file.set_len(LAYOUT_LEN as u64).map_err(map_err)?;

        // SAFETY: the file was just created by us with the right length. Other processes only
        // ever access it through atomics in `slot`.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(map_err)?;
        let counters = Self {
            path: path.to_owned(),
            map,
        };
        counters.slot(0).store(MAGIC, Ordering::Release);
        Ok(counters)
    }

    /// Maps an existing counters file, as created by [`Self::create`].
    pub(crate) fn open(path: &Utf8Path) -> Result<Self, RunContextError> {
        let map_err = |error| RunContextError::CountersMap {
            path: path.to_owned(),
            error,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(map_err)?;
        let len = file.metadata().map_err(map_err)?.len();
        if len != LAYOUT_LEN as u64 {
            return Err(RunContextError::CountersLayout {
                path: path.to_owned(),
                reason: "unexpected length",
            });
        }

        // SAFETY: the length was checked above, and the file is only accessed through atomics.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(map_err)?;
        let counters = Self {
            path: path.to_owned(),
            map,
        };
        if counters.slot(0).load(Ordering::Acquire) != MAGIC {
            return Err(RunContextError::CountersLayout {
                path: path.to_owned(),
                reason: "bad magic",
            });
        }
        Ok(counters)
    }

    /// Returns the path to the counters file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Atomically adds one to the counter for `kind`.
    pub fn increment(&self, kind: OutcomeKind) {
        self.slot(kind.index() + 1).fetch_add(1, Ordering::AcqRel);
    }

    /// Reads every counter.
    ///
    /// Counts only reach their final values once every worker has exited; an earlier
    /// snapshot is valid but incomplete.
    pub fn snapshot(&self) -> CounterSnapshot {
        let read = |kind: OutcomeKind| self.slot(kind.index() + 1).load(Ordering::Acquire);
        CounterSnapshot {
            errors: read(OutcomeKind::Error),
            failures: read(OutcomeKind::Failure),
            passes: read(OutcomeKind::Pass),
            skipped: read(OutcomeKind::Skip),
        }
    }

    fn slot(&self, index: usize) -> &AtomicU64 {
        assert!(index < SLOT_COUNT, "slot {index} out of range");
        // SAFETY: the mapping is page-aligned and LAYOUT_LEN bytes long, so every slot is
        // in bounds and 8-byte aligned. The pages stay mapped for as long as `self` is
        // borrowed, and they are never accessed non-atomically.
        unsafe { &*self.map.as_ptr().cast::<AtomicU64>().add(index) }
    }
}

impl fmt::Debug for SharedCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCounters")
            .field("path", &self.path)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// A point-in-time read of [`SharedCounters`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CounterSnapshot {
    pub errors: u64,
    pub failures: u64,
    pub passes: u64,
    pub skipped: u64,
}

impl CounterSnapshot {
    /// The sum of all counts.
    pub fn total(&self) -> u64 {
        self.errors + self.failures + self.passes + self.skipped
    }

    /// Returns true if any test failed or errored.
    pub fn has_failures(&self) -> bool {
        self.errors > 0 || self.failures > 0
    }

    /// Builds the root element header for a report named `name`.
    pub fn to_header(&self, name: &str) -> ReportHeader {
        ReportHeader {
            name: name.to_owned(),
            errors: self.errors as usize,
            failures: self.failures as usize,
            passes: self.passes as usize,
            skipped: self.skipped as usize,
        }
    }
}
