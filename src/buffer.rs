//! Reusable per-row coverage buffers.
//!
//! [`ScanlineMask`] packs one bit per pixel for Solid scanning;
//! [`CoverageBuffer`] accumulates f32 coverage for AntiAliasing. Both
//! are owned by exactly one scanner context and cleared between rows.

/// Bit-packed 1-bit-per-pixel row mask.
#[derive(Debug, Clone)]
pub struct ScanlineMask {
    bits: Vec<u8>,
    width: usize,
}

impl ScanlineMask {
    pub fn new(width: usize) -> Self {
        ScanlineMask { bits: vec![0; (width + 7) / 8], width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn set(&mut self, column: usize) {
        debug_assert!(column < self.width);
        self.bits[column >> 3] |= 1 << (column & 7);
    }

    #[inline]
    pub fn get(&self, column: usize) -> bool {
        debug_assert!(column < self.width);
        self.bits[column >> 3] & (1 << (column & 7)) != 0
    }

    pub fn set_range(&mut self, first: usize, last: usize) {
        for column in first..=last {
            self.set(column);
        }
    }

    pub fn clear(&mut self) {
        for b in &mut self.bits {
            *b = 0;
        }
    }

    /// The packed bytes, least significant bit first within each byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

/// Per-pixel f32 coverage accumulator for one pixel row.
#[derive(Debug, Clone)]
pub struct CoverageBuffer {
    coverage: Vec<f32>,
}

impl CoverageBuffer {
    pub fn new(width: usize) -> Self {
        CoverageBuffer { coverage: vec![0.0; width] }
    }

    pub fn width(&self) -> usize {
        self.coverage.len()
    }

    #[inline]
    pub fn add(&mut self, column: usize, amount: f32) {
        debug_assert!(column < self.coverage.len());
        self.coverage[column] += amount;
    }

    pub fn add_range(&mut self, first: usize, last: usize, amount: f32) {
        for c in &mut self.coverage[first..=last] {
            *c += amount;
        }
    }

    pub fn clear(&mut self) {
        for c in &mut self.coverage {
            *c = 0.0;
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.coverage
    }
}
