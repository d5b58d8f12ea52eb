/// Shared readback buffer for `getPixels`.
///
/// Grows monotonically to the largest requested size and never shrinks; a
/// fetch that fits in the current capacity reuses the same storage, so the
/// address handed to the host stays stable across same-size or smaller
/// fetches. The old storage is dropped before a larger replacement is
/// allocated.
#[derive(Default)]
pub struct PixelCache {
    buf: Vec<u8>,
}

impl PixelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Slice of exactly `required` bytes, growing the buffer if needed.
    pub fn ensure(&mut self, required: usize) -> &mut [u8] {
        if self.buf.len() < required {
            self.buf = Vec::new();
            self.buf = vec![0; required];
        }
        &mut self.buf[..required]
    }

    /// Buffer base address, returned to the host as an opaque numeric handle
    /// for out-of-band readout.
    pub fn address(&self) -> u64 {
        self.buf.as_ptr() as usize as u64
    }

    pub fn data(&self) -> &[u8] {
        &self.buf
    }
}
