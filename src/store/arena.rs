use crate::errors::StoreError;
use crate::ids::Handle;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Initial size of a freshly created arena: 1 GB, matching the default the
/// spec calls for. Callers with a good estimate of the dataset size can pick
/// a smaller or larger value through `StoreConfig`.
pub const DEFAULT_INITIAL_SIZE: u64 = 1_024_000_000;

/// Raised when a bump allocation doesn't fit under the current mapping.
/// Purely internal: `with_resize_retry` is the only place that ever sees
/// this, and it never escapes as a `StoreError`.
pub(crate) enum AllocError {
    OutOfSpace,
}

/// A single memory-mapped, append-only, self-growing byte arena.
///
/// All of the store's containers (the way/relation node-id sequences, the
/// serialized generated geometries) live inside one of these, addressed by
/// `Handle` — a byte offset from the arena's base, never a raw pointer, so
/// that a `grow()` which remaps the file at a new base address can't
/// invalidate anything a caller is holding on to.
pub struct Arena {
    path: PathBuf,
    file: File,
    mmap: Option<MmapMut>,
    len: u64,
    cursor: u64,
}

impl Arena {
    /// Creates a new arena backed by a fresh file at `path`. The path is
    /// created with exclusive-create semantics (a stale file from a
    /// previous run at the same path is removed first); it is unlinked
    /// again when the arena is dropped, since this is a scratch arena, not
    /// a database.
    pub fn create<P: AsRef<Path>>(path: P, initial_size: u64) -> Result<Arena, StoreError> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            std::fs::remove_file(&path).map_err(StoreError::GrowthFailure)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(StoreError::GrowthFailure)?;
        file.set_len(initial_size).map_err(StoreError::GrowthFailure)?;

        let mmap = unsafe { MmapOptions::new().map_mut(&file) }.map_err(StoreError::GrowthFailure)?;

        Ok(Arena {
            path,
            file,
            mmap: Some(mmap),
            len: initial_size,
            cursor: 0,
        })
    }

    /// Reserves `len` bytes at the current cursor, 8-byte aligned so that
    /// every handle this returns is safe to treat as the start of a `u64`-
    /// or `i64`-sized sequence. Fails with `OutOfSpace` rather than growing
    /// itself — growth is the caller's (the resize-retry loop's) job, since
    /// only it knows how to rebind every named sub-container afterwards.
    pub(crate) fn alloc_bytes(&mut self, len: u64) -> Result<Handle, AllocError> {
        let aligned = align8(len);
        let start = self.cursor;
        let end = start.checked_add(aligned).ok_or(AllocError::OutOfSpace)?;
        if end > self.len {
            return Err(AllocError::OutOfSpace);
        }
        self.cursor = end;
        Ok(start)
    }

    /// Detaches the mapping, doubles the backing file's length, and remaps.
    /// Previously written bytes survive because `File::set_len` only ever
    /// grows here; the bump cursor is untouched, so every handle acquired
    /// before this call still addresses the same bytes afterwards.
    pub(crate) fn grow(&mut self) -> Result<(), StoreError> {
        let new_len = self.len.saturating_mul(2).max(self.len + 1);

        if let Some(mut mmap) = self.mmap.take() {
            mmap.flush().map_err(StoreError::GrowthFailure)?;
        }

        self.file.set_len(new_len).map_err(StoreError::GrowthFailure)?;
        let mmap = unsafe { MmapOptions::new().map_mut(&self.file) }.map_err(StoreError::GrowthFailure)?;
        self.mmap = Some(mmap);

        log::info!(
            "grew arena {} from {} to {} bytes",
            self.path.display(),
            self.len,
            new_len
        );
        self.len = new_len;
        Ok(())
    }

    pub(crate) fn bytes(&self, handle: Handle, len: u64) -> &[u8] {
        let mmap = self.mmap.as_ref().expect("arena mapping is always present between public calls");
        &mmap[handle as usize..(handle + len) as usize]
    }

    pub(crate) fn bytes_mut(&mut self, handle: Handle, len: u64) -> &mut [u8] {
        let mmap = self.mmap.as_mut().expect("arena mapping is always present between public calls");
        &mut mmap[handle as usize..(handle + len) as usize]
    }

    pub fn capacity(&self) -> u64 {
        self.len
    }

    pub fn used(&self) -> u64 {
        self.cursor
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn align8(len: u64) -> u64 {
    (len + 7) & !7
}

/// Runs `op` against the arena, growing and retrying on `OutOfSpace` until
/// it succeeds. This is the resize-retry protocol from spec.md §4.A,
/// implemented once so every mutating store method can wrap itself in it
/// instead of reimplementing the loop.
///
/// `op` must be pre-commit-idempotent: it may only observably mutate state
/// after it has successfully reserved all the space it needs, since a
/// failed attempt is simply retried from scratch against the grown arena.
pub(crate) fn with_resize_retry<T>(
    arena: &mut Arena,
    mut op: impl FnMut(&mut Arena) -> Result<T, AllocError>,
) -> Result<T, StoreError> {
    loop {
        match op(arena) {
            Ok(value) => return Ok(value),
            Err(AllocError::OutOfSpace) => arena.grow()?,
        }
    }
}
