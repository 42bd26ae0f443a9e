/*!
 * Slab Allocator
 * Size-class pooling for small objects with heap fallback
 *
 * Requests of `1..=max_block_size` bytes are served from per-size chunk
 * lists; anything larger, or stricter-aligned than its size class can
 * honor, goes straight to the system heap. Each size class sits behind its
 * own lock so threads allocating different sizes never contend.
 *
 * A local allocator reports its leaks when dropped. The process-wide one
 * from [`global`] lives in a static and is never dropped; call
 * [`report_global_leaks`] on the way out to get the same report.
 */

mod chunk;
mod size_class;
mod tracking;

use self::size_class::SizeClassAllocator;
use self::tracking::LeakTracker;
use super::config::SlabConfig;
use super::traits::{Allocator, MemoryInfo};
use super::types::{
    AllocationRecord, AllocatorStats, BlockSource, MemoryError, MemoryResult, SizeClassStats,
};
use crate::core::errors::ConfigError;
use crate::core::types::{block_align, Address, Size, MAX_BLOCK_ALIGN};
use crate::monitoring::log_allocator_stats;
use parking_lot::Mutex;
use std::alloc::{self, Layout};
use std::panic::Location;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing::{debug, info, trace, warn};

/// Size-class slab allocator
pub struct SlabAllocator {
    config: SlabConfig,
    /// Index `n` serves blocks of `n + 1` bytes
    classes: Box<[Mutex<SizeClassAllocator>]>,
    pooled_allocations: AtomicU64,
    pooled_deallocations: AtomicU64,
    heap_allocations: AtomicU64,
    heap_deallocations: AtomicU64,
    tracker: Option<LeakTracker>,
}

impl SlabAllocator {
    /// Build an allocator from a configuration
    pub fn new(config: SlabConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: SlabConfig) -> Self {
        let classes = (1..=config.max_block_size)
            .map(|size| Mutex::new(SizeClassAllocator::new(size, config.blocks_per_chunk)))
            .collect();

        info!(
            max_block_size = config.max_block_size,
            blocks_per_chunk = config.blocks_per_chunk,
            track_leaks = config.track_leaks,
            "Slab allocator initialized"
        );

        Self {
            tracker: config.track_leaks.then(LeakTracker::new),
            config,
            classes,
            pooled_allocations: AtomicU64::new(0),
            pooled_deallocations: AtomicU64::new(0),
            heap_allocations: AtomicU64::new(0),
            heap_deallocations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &SlabConfig {
        &self.config
    }

    /// Where a request with this layout is served from
    pub fn source_for(&self, layout: Layout) -> BlockSource {
        let size = layout.size();
        if size > 0 && size <= self.config.max_block_size && layout.align() <= block_align(size)
        {
            BlockSource::Pooled
        } else {
            BlockSource::Heap
        }
    }

    /// Allocate `size` bytes at the natural alignment of their size class
    #[track_caller]
    pub fn alloc(&self, size: Size) -> MemoryResult<NonNull<u8>> {
        self.allocate(Self::size_layout(size)?)
    }

    /// Return a block obtained from [`alloc`](Self::alloc)
    ///
    /// # Safety
    ///
    /// `ptr` must come from `alloc(size)` on this allocator with the same
    /// `size`, and must not be used afterwards. Pooled blocks are validated;
    /// heap blocks cannot be.
    pub unsafe fn dealloc(&self, ptr: NonNull<u8>, size: Size) -> MemoryResult<()> {
        self.deallocate(ptr, Self::size_layout(size)?)
    }

    /// Allocate a block for `layout`
    #[track_caller]
    pub fn allocate(&self, layout: Layout) -> MemoryResult<NonNull<u8>> {
        let size = layout.size();
        if size == 0 {
            return Err(MemoryError::ZeroSized);
        }

        let ptr = match self.source_for(layout) {
            BlockSource::Pooled => {
                let ptr = self.classes[size - 1].lock().alloc()?;
                self.pooled_allocations.fetch_add(1, Ordering::Relaxed);
                ptr
            }
            BlockSource::Heap => {
                let heap_layout = Self::heap_layout(layout)?;
                // SAFETY: size is non-zero
                let raw = unsafe { alloc::alloc(heap_layout) };
                let ptr = NonNull::new(raw).ok_or(MemoryError::OutOfMemory { requested: size })?;
                self.heap_allocations.fetch_add(1, Ordering::Relaxed);
                trace!(size, align = layout.align(), "Served from the heap");
                ptr
            }
        };

        if let Some(tracker) = &self.tracker {
            tracker.record(ptr.as_ptr() as Address, size, Location::caller());
        }
        Ok(ptr)
    }

    /// Return a block obtained from [`allocate`](Self::allocate)
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate(layout)` on this allocator with the same
    /// `layout`, and must not be used afterwards.
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) -> MemoryResult<()> {
        let size = layout.size();
        if size == 0 {
            return Err(MemoryError::ZeroSized);
        }

        let heap_layout = match self.source_for(layout) {
            BlockSource::Pooled => None,
            BlockSource::Heap => Some(Self::heap_layout(layout)?),
        };

        // The block can be handed out again the moment it is returned, so
        // its record has to go first
        let address = ptr.as_ptr() as Address;
        let record = self.tracker.as_ref().and_then(|tracker| tracker.forget(address));

        match heap_layout {
            None => {
                let result = self.classes[size - 1].lock().dealloc(ptr);
                let released = match result {
                    Ok(released) => released,
                    Err(e) => {
                        warn!(size, error = %e, "Rejected slab deallocation");
                        if let (Some(tracker), Some(record)) = (&self.tracker, record) {
                            tracker.restore(record);
                        }
                        return Err(e);
                    }
                };
                self.pooled_deallocations.fetch_add(1, Ordering::Relaxed);
                if released {
                    debug!(size, "Size class returned a chunk to the heap");
                }
            }
            Some(heap_layout) => {
                alloc::dealloc(ptr.as_ptr(), heap_layout);
                self.heap_deallocations.fetch_add(1, Ordering::Relaxed);
            }
        }

        Ok(())
    }

    /// Whether `ptr` lies inside a chunk of the size class for `size`
    pub fn owns(&self, ptr: NonNull<u8>, size: Size) -> bool {
        size > 0
            && size <= self.config.max_block_size
            && self.classes[size - 1].lock().owns(ptr.as_ptr() as Address)
    }

    /// Release every unused chunk, returning how many were freed
    pub fn trim(&self) -> usize {
        let released: usize = self.classes.iter().map(|class| class.lock().trim()).sum();
        if released > 0 {
            info!(released, "Trimmed unused slab chunks");
        }
        released
    }

    pub fn stats(&self) -> AllocatorStats {
        let mut stats = AllocatorStats {
            pooled_allocations: self.pooled_allocations.load(Ordering::Relaxed),
            pooled_deallocations: self.pooled_deallocations.load(Ordering::Relaxed),
            heap_allocations: self.heap_allocations.load(Ordering::Relaxed),
            heap_deallocations: self.heap_deallocations.load(Ordering::Relaxed),
            ..Default::default()
        };

        for class in self.classes.iter() {
            let class = class.lock();
            let class_stats = class.stats();
            stats.live_pooled_blocks += class_stats.live_blocks;
            stats.chunk_count += class_stats.chunk_count;
            stats.reserved_bytes += class.reserved_bytes();
        }
        stats
    }

    /// Statistics for one size class, `None` outside the pooled range
    pub fn size_class_stats(&self, size: Size) -> Option<SizeClassStats> {
        if size == 0 || size > self.config.max_block_size {
            return None;
        }
        Some(self.classes[size - 1].lock().stats())
    }

    /// Size classes that currently own at least one chunk
    pub fn active_size_classes(&self) -> Vec<SizeClassStats> {
        self.classes
            .iter()
            .filter_map(|class| {
                let class = class.lock();
                (class.chunk_count() > 0).then(|| class.stats())
            })
            .collect()
    }

    /// Pooled allocations per block size, for sizes that were ever requested
    pub fn size_histogram(&self) -> Vec<(Size, u64)> {
        self.classes
            .iter()
            .filter_map(|class| {
                let class = class.lock();
                (class.allocations() > 0).then(|| (class.block_size(), class.allocations()))
            })
            .collect()
    }

    pub fn is_tracking_leaks(&self) -> bool {
        self.tracker.is_some()
    }

    /// Every live allocation, empty when leak tracking is off
    pub fn live_allocations(&self) -> Vec<AllocationRecord> {
        self.tracker
            .as_ref()
            .map(LeakTracker::live)
            .unwrap_or_default()
    }

    /// Log every live allocation and return the records
    pub fn dump_allocations(&self) -> Vec<AllocationRecord> {
        let records = self.live_allocations();
        LeakTracker::report(&records);
        records
    }

    /// Log every live allocation as a leak; returns how many were reported
    pub fn report_leaks(&self) -> usize {
        let records = self.live_allocations();
        if !records.is_empty() {
            warn!(leaked = records.len(), "Live slab allocations");
        }
        LeakTracker::report(&records)
    }

    /// Save the current set of live allocations
    pub fn push_allocations(&self) {
        if let Some(tracker) = &self.tracker {
            tracker.push_snapshot();
        }
    }

    /// Discard the most recently saved set; `false` when none was saved
    pub fn pop_allocations(&self) -> bool {
        self.tracker
            .as_ref()
            .map(LeakTracker::pop_snapshot)
            .unwrap_or(false)
    }

    /// Live allocations made since the last [`push_allocations`](Self::push_allocations)
    pub fn diff_allocations(&self) -> Vec<AllocationRecord> {
        self.tracker
            .as_ref()
            .map(LeakTracker::diff_since_snapshot)
            .unwrap_or_default()
    }

    /// Log the allocations in [`diff_allocations`](Self::diff_allocations) and return them
    pub fn dump_diff_allocations(&self) -> Vec<AllocationRecord> {
        let records = self.diff_allocations();
        LeakTracker::report(&records);
        records
    }

    fn size_layout(size: Size) -> MemoryResult<Layout> {
        if size == 0 {
            return Err(MemoryError::ZeroSized);
        }
        Layout::from_size_align(size, block_align(size)).map_err(|_| MemoryError::InvalidLayout {
            size,
            alignment: block_align(size),
        })
    }

    fn heap_layout(layout: Layout) -> MemoryResult<Layout> {
        let alignment = layout.align().max(MAX_BLOCK_ALIGN);
        Layout::from_size_align(layout.size(), alignment).map_err(|_| {
            MemoryError::InvalidLayout {
                size: layout.size(),
                alignment,
            }
        })
    }
}

impl Drop for SlabAllocator {
    fn drop(&mut self) {
        if let Some(tracker) = &self.tracker {
            let leaked = tracker.live_count();
            if leaked > 0 {
                warn!(leaked, "Slab allocator dropped with live allocations");
                LeakTracker::report(&tracker.live());
            }
        }
    }
}

impl Allocator for SlabAllocator {
    #[track_caller]
    fn allocate(&self, layout: Layout) -> MemoryResult<NonNull<u8>> {
        SlabAllocator::allocate(self, layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) -> MemoryResult<()> {
        SlabAllocator::deallocate(self, ptr, layout)
    }

    fn owns(&self, ptr: NonNull<u8>, layout: Layout) -> bool {
        SlabAllocator::owns(self, ptr, layout.size())
    }
}

impl MemoryInfo for SlabAllocator {
    fn stats(&self) -> AllocatorStats {
        SlabAllocator::stats(self)
    }

    fn live_allocations(&self) -> Vec<AllocationRecord> {
        SlabAllocator::live_allocations(self)
    }
}

static SLAB_CONFIG: OnceLock<SlabConfig> = OnceLock::new();
static GLOBAL_SLAB: OnceLock<SlabAllocator> = OnceLock::new();

/// Fix the configuration the process-wide allocator is built with
///
/// Must run before the first call to [`global`]; afterwards, or on a second
/// call, it fails with [`ConfigError::AlreadyInstalled`].
pub fn install_slab_config(config: SlabConfig) -> Result<(), ConfigError> {
    config.validate()?;
    ensure_slab_config_open()?;
    SLAB_CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInstalled {
            component: "slab allocator",
        })
}

/// Fails when [`install_slab_config`] could no longer succeed
pub(crate) fn ensure_slab_config_open() -> Result<(), ConfigError> {
    if GLOBAL_SLAB.get().is_some() || SLAB_CONFIG.get().is_some() {
        return Err(ConfigError::AlreadyInstalled {
            component: "slab allocator",
        });
    }
    Ok(())
}

/// The process-wide slab allocator, created on first use
pub fn global() -> &'static SlabAllocator {
    GLOBAL_SLAB.get_or_init(|| {
        SlabAllocator::from_validated(SLAB_CONFIG.get().cloned().unwrap_or_default())
    })
}

/// Log statistics and live blocks of the process-wide allocator
///
/// Returns how many allocations are still live; zero when the allocator was
/// never used or leak tracking is off.
pub fn report_global_leaks() -> usize {
    let Some(slab) = GLOBAL_SLAB.get() else {
        return 0;
    };
    log_allocator_stats(&slab.stats());
    slab.report_leaks()
}
