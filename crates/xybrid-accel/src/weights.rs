//! Memory-mapped weight data backing a compiled graph.

use crate::error::AccelResult;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::Path;

/// Read-only mapping of a model's constant data.
///
/// Base address and length are fixed for the lifetime of the region. The
/// mapping is released when the region is dropped.
#[derive(Debug)]
pub struct WeightRegion {
    map: Mmap,
}

impl WeightRegion {
    /// Map `path` read-only.
    ///
    /// With `populate` the kernel is asked to pre-fault every page so the
    /// first compute does not stall on page faults.
    pub fn map_file(path: impl AsRef<Path>, populate: bool) -> AccelResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut options = MmapOptions::new();
        if populate {
            options.populate();
        }
        // The file is opened read-only and the map is never handed out mutably.
        let map = unsafe { options.map(&file)? };

        log::debug!(
            target: "xybrid_accel",
            "Mapped {} bytes of weight data from {}",
            map.len(),
            path.display()
        );

        Ok(Self { map })
    }

    /// Adopt an existing mapping.
    pub fn from_mmap(map: Mmap) -> Self {
        Self { map }
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.map.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.map
    }
}
