use crate::domain::dimension::Dimension::{Exact, Width};

/// Largest side any encoder we write to accepts (JPEG's limit).
pub const MAX_DIMENSION: u32 = 65_535;
/// Ceiling on output pixels, keeps a 16-bit RGBA buffer well inside Lambda memory.
pub const MAX_PIXELS: u64 = 40_000_000;

pub fn within_limits(width: u32, height: u32) -> bool {
    width <= MAX_DIMENSION
        && height <= MAX_DIMENSION
        && width as u64 * height as u64 <= MAX_PIXELS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// Proportional resize, height follows the source aspect ratio.
    Width(u32),
    /// Exact box, the source is cropped around its centre to fit.
    Exact { width: u32, height: u32 },
}

impl Dimension {
    /// Output size for a source of `src_width` x `src_height`.
    pub fn target(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        match *self {
            Width(new_width) => {
                if src_width == 0 {
                    return (new_width, 1);
                }
                let new_height =
                    (new_width as f64 * src_height as f64 / src_width as f64).round() as u32;
                (new_width, new_height.max(1))
            }
            Exact { width, height } => (width, height),
        }
    }
}
