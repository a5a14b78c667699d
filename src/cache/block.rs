use crate::address;

/// Metadata of a single way.
///
/// When `valid` is false, the remaining fields carry no meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Line {
    pub valid: bool,
    pub dirty: bool,
    pub tag: address,
    pub core_id: u32,
    pub last_access_time: u64,
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if !self.valid {
            return write!(f, "Line(INVALID)");
        }
        f.debug_struct("Line")
            .field("tag", &self.tag)
            .field("core", &self.core_id)
            .field("dirty", &self.dirty)
            .field("last_access", &self.last_access_time)
            .finish()
    }
}

impl Line {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.valid && self.dirty
    }

    /// Whether this line holds `tag` on behalf of `core_id`.
    #[inline]
    #[must_use]
    pub fn matches(&self, tag: address, core_id: u32) -> bool {
        self.valid && self.tag == tag && self.core_id == core_id
    }

    /// Whether this line is valid and owned by `core_id`.
    #[inline]
    #[must_use]
    pub fn is_owned_by(&self, core_id: u32) -> bool {
        self.valid && self.core_id == core_id
    }

    pub fn set_last_access_time(&mut self, time: u64) {
        self.last_access_time = time;
    }

    /// Overwrites this way with a newly installed line.
    ///
    /// Writes allocate dirty.
    pub fn allocate(&mut self, tag: address, is_write: bool, core_id: u32, time: u64) {
        *self = Self {
            valid: true,
            dirty: is_write,
            tag,
            core_id,
            last_access_time: time,
        };
    }

    pub fn invalidate(&mut self) {
        *self = Self::default();
    }
}

/// A line that was evicted to make room for an install.
///
/// Callers use this to issue a writeback when `dirty` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvictedLine {
    pub set_index: usize,
    pub way: usize,
    pub tag: address,
    pub dirty: bool,
    pub core_id: u32,
    pub last_access_time: u64,
}

impl EvictedLine {
    #[must_use]
    pub fn new(set_index: usize, way: usize, line: &Line) -> Self {
        Self {
            set_index,
            way,
            tag: line.tag,
            dirty: line.dirty,
            core_id: line.core_id,
            last_access_time: line.last_access_time,
        }
    }

    /// Whether the evicted line must be written back.
    #[inline]
    #[must_use]
    pub fn needs_writeback(&self) -> bool {
        self.dirty
    }
}
