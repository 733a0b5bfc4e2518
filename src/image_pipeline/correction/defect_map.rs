//! Cached maps of defective sensor pixels.
//!
//! A map starts out [`MapStatus::Unknown`] and only ever moves forward through
//! `Computing -> Cached -> Stable` while a clip is processed. The kernel that owns the map
//! decides when to promote it; the orchestrator only reads the status to decide whether the
//! kernel needs to run at all. [`PixelMap::reset`] is the single way back to `Unknown`.

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum MapStatus {
    /// Nothing known yet, the next frame triggers a search or a load
    #[default]
    Unknown = 0,
    /// A search is in progress over the current frames
    Computing = 1,
    /// The map holds usable coordinates and is applied on every frame
    Cached = 2,
    /// Nothing left to do for this clip; the kernel is no longer invoked
    Stable = 3,
}

impl MapStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Values from 3 upward all mean the map is stable.
    pub fn from_code(code: i32) -> Self {
        match code {
            i32::MIN..=0 => Self::Unknown,
            1 => Self::Computing,
            2 => Self::Cached,
            _ => Self::Stable,
        }
    }

    pub fn needs_processing(self) -> bool {
        self < Self::Stable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMapKind {
    Focus,
    Bad,
}

/// Sensor coordinate of a defective pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelCoord {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone)]
pub struct PixelMap {
    kind: PixelMapKind,
    pixels: Vec<PixelCoord>,
    status: MapStatus,
}

impl PixelMap {
    pub fn new(kind: PixelMapKind) -> Self {
        Self { kind, pixels: Vec::new(), status: MapStatus::Unknown }
    }

    pub fn kind(&self) -> PixelMapKind {
        self.kind
    }

    pub fn status(&self) -> MapStatus {
        self.status
    }

    pub fn pixels(&self) -> &[PixelCoord] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Moves the status forward to `next`. Requests to go backwards are ignored.
    pub fn promote(&mut self, next: MapStatus) {
        if next > self.status {
            trace!(kind = ?self.kind, from = ?self.status, to = ?next, "pixel map status");
            self.status = next;
        }
    }

    /// Replaces the coordinate list without touching the status.
    pub fn set_pixels(&mut self, pixels: Vec<PixelCoord>) {
        self.pixels = pixels;
    }

    /// Drops the coordinates and forces a recomputation on the next frame.
    pub fn reset(&mut self) {
        self.pixels = Vec::new();
        self.status = MapStatus::Unknown;
    }
}
