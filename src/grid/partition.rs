// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Contiguous partitioning of the β array into chunks.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// How the β array is split into independently dispatched chunks.
///
/// In YAML:
///
/// ```yaml
/// partition:
///   strategy: chunk_size   # or chunk_count, auto
///   value: 5
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// Fixed number of β values per chunk (the last chunk may be shorter).
    ChunkSize(usize),
    /// Fixed number of chunks, sizes differing by at most one.
    ChunkCount(usize),
    /// One chunk per available hardware thread.
    Auto,
}

impl Default for PartitionStrategy {
    fn default() -> Self {
        PartitionStrategy::ChunkSize(5)
    }
}

impl PartitionStrategy {
    /// Index ranges covering `0..len` exactly once, in order.
    ///
    /// Empty input yields no chunks. Never yields an empty range.
    pub fn ranges(&self, len: usize) -> Vec<Range<usize>> {
        if len == 0 {
            return Vec::new();
        }
        match *self {
            PartitionStrategy::ChunkSize(size) => {
                let size = size.max(1);
                (0..len)
                    .step_by(size)
                    .map(|start| start..(start + size).min(len))
                    .collect()
            }
            PartitionStrategy::ChunkCount(count) => balanced_ranges(len, count),
            PartitionStrategy::Auto => balanced_ranges(len, available_parallelism()),
        }
    }
}

/// Split `len` items into `count` ranges whose sizes differ by at most one.
fn balanced_ranges(len: usize, count: usize) -> Vec<Range<usize>> {
    let count = count.clamp(1, len);
    let base = len / count;
    let extra = len % count;
    let mut ranges = Vec::with_capacity(count);
    let mut start = 0;
    for k in 0..count {
        let size = base + usize::from(k < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Number of hardware threads, 1 if unknown.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
