// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The multi-producer, single-consumer transport for fragments.
//!
//! Every producer appends to its own spool file in the run's spool directory, one JSON string
//! per line. Producers never share a file, so publishing needs no coordination; draining
//! reads every spool file once all producers are known to be done.

use crate::{
    barrier::CompletionBarrier,
    errors::{DrainError, PublishError, RunContextError},
};
use camino::{Utf8Path, Utf8PathBuf};
use quick_xunit::Fragment;
use std::{
    fs::{File, OpenOptions},
    io::Write,
    process,
};
use tracing::{debug, warn};

static SPOOL_EXTENSION: &str = "jsonl";

/// The result channel for one run.
#[derive(Debug)]
pub struct ResultChannel {
    spool_dir: Utf8PathBuf,
}

impl ResultChannel {
    /// Creates the spool directory. It must not already exist.
    pub(crate) fn create(spool_dir: &Utf8Path) -> Result<Self, RunContextError> {
        std::fs::create_dir(spool_dir).map_err(|error| RunContextError::SpoolDir {
            path: spool_dir.to_owned(),
            error,
        })?;
        Ok(Self {
            spool_dir: spool_dir.to_owned(),
        })
    }

    /// Opens an existing spool directory.
    pub(crate) fn open(spool_dir: &Utf8Path) -> Result<Self, RunContextError> {
        let metadata = std::fs::metadata(spool_dir).map_err(|error| RunContextError::SpoolDir {
            path: spool_dir.to_owned(),
            error,
        })?;
        if !metadata.is_dir() {
            return Err(RunContextError::SpoolDir {
                path: spool_dir.to_owned(),
                error: std::io::Error::other("not a directory"),
            });
        }
        Ok(Self {
            spool_dir: spool_dir.to_owned(),
        })
    }

    /// Returns the spool directory.
    pub fn spool_dir(&self) -> &Utf8Path {
        &self.spool_dir
    }

    /// Creates a new producer with its own spool file.
    pub fn publisher(&self) -> Result<Publisher, PublishError> {
        let file_name = format!(
            "{}-{}.{SPOOL_EXTENSION}",
            process::id(),
            uuid::Uuid::new_v4().simple()
        );
        let path = self.spool_dir.join(file_name);
        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&path)
            .map_err(|error| PublishError::Spool {
                path: path.clone(),
                error,
            })?;
        debug!(%path, "opened spool file");

        Ok(Publisher {
            path,
            file,
            published: 0,
        })
    }

    /// Returns every fragment published to this channel, and empties it.
    ///
    /// Taking a [`CompletionBarrier`] guarantees that no producer is still publishing, so no
    /// fragment can be missed. Consuming `self` guarantees the channel is drained only once.
    ///
    /// Fragments from one producer stay in publish order; producers are visited in spool file
    /// name order.
    pub fn drain_all(self, barrier: CompletionBarrier) -> Result<Vec<Fragment>, DrainError> {
        let list_err = |error| DrainError::ListSpool {
            path: self.spool_dir.clone(),
            error,
        };

        let mut spool_files = Vec::new();
        for entry in std::fs::read_dir(&self.spool_dir).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            let Ok(path) = Utf8PathBuf::try_from(entry.path()) else {
                continue;
            };
            if path.extension() == Some(SPOOL_EXTENSION) {
                spool_files.push(path);
            }
        }
        spool_files.sort_unstable();

        let mut fragments = Vec::new();
        for path in &spool_files {
            // Read raw bytes: a torn write may end partway through a UTF-8 character.
            let contents = std::fs::read(path).map_err(|error| DrainError::ReadSpool {
                path: path.clone(),
                error,
            })?;
            read_spool(path, &contents, &mut fragments);
        }

        for path in &spool_files {
            if let Err(error) = std::fs::remove_file(path) {
                debug!(%path, %error, "failed to remove drained spool file");
            }
        }

        debug!(
            producers = barrier.producers(),
            spool_files = spool_files.len(),
            fragments = fragments.len(),
            "drained result channel"
        );
        Ok(fragments)
    }
}

fn read_spool(path: &Utf8Path, contents: &[u8], out: &mut Vec<Fragment>) {
    let (complete, torn) = match contents.iter().rposition(|&b| b == b'\n') {
        Some(end) => (&contents[..end], &contents[end + 1..]),
        None => (&[][..], contents),
    };
    if !torn.is_empty() {
        // A producer died partway through a write.
        warn!(%path, "ignoring incomplete record at end of spool file");
    }

    for (line_no, line) in complete.split(|&b| b == b'\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        match serde_json::from_slice::<Fragment>(line) {
            Ok(fragment) => out.push(fragment),
            Err(error) => {
                warn!(%path, line = line_no + 1, %error, "ignoring corrupt record in spool file");
            }
        }
    }
}

/// The producing end of a [`ResultChannel`].
///
/// Each worker holds one. Publishing appends to a spool file owned by this publisher alone.
#[derive(Debug)]
pub struct Publisher {
    path: Utf8PathBuf,
    file: File,
    published: usize,
}

impl Publisher {
    /// Appends one fragment.
    pub fn publish(&mut self, fragment: &Fragment) -> Result<(), PublishError> {
        let mut line =
            serde_json::to_string(fragment).map_err(|error| PublishError::Encode { error })?;
        line.push('\n');

        // One write call per record, so a record is either entirely present or torn at the
        // end of the file.
        self.file
            .write_all(line.as_bytes())
            .map_err(|error| PublishError::Spool {
                path: self.path.clone(),
                error,
            })?;
        self.published += 1;
        Ok(())
    }

    /// The spool file this publisher writes to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The number of fragments published so far.
    pub fn published(&self) -> usize {
        self.published
    }
}
