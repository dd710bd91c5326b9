//! MEGA's chunk layout: sizes grow by 128 KiB per chunk up to 1 MiB,
//! then stay at 1 MiB until the file is covered.

use std::collections::BTreeMap;

const CHUNK_STEP: u64 = 128 * 1024;
const CHUNK_MAX: u64 = 1024 * 1024;

/// Map from chunk start offset to chunk length. Iterating the map walks
/// chunks in ascending offset order; the final chunk may be short.
pub fn chunk_schedule(size: u64) -> BTreeMap<u64, usize> {
    let mut chunks = BTreeMap::new();
    let mut pos = 0;
    let mut step = CHUNK_STEP;
    while pos < size {
        let len = step.min(size - pos);
        chunks.insert(pos, len as usize);
        pos += len;
        if step < CHUNK_MAX {
            step += CHUNK_STEP;
        }
    }
    chunks
}
