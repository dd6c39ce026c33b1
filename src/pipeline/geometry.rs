//! Page addressing and page-to-pixel geometry.
//!
//! Invariants are enforced by constructors, so a [`Viewport`] in hand always
//! has positive pixel dimensions and a [`PageNumber`] is always ≥ 1.

use crate::error::RasterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// A validated 1-indexed page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageNumber(NonZeroU32);

impl PageNumber {
    /// Validate an integer page number. Zero and negatives are rejected.
    pub fn new(n: i64) -> Result<Self, RasterError> {
        u32::try_from(n)
            .ok()
            .and_then(NonZeroU32::new)
            .map(PageNumber)
            .ok_or_else(|| {
                RasterError::InvalidArgument(format!(
                    "page_number must be a positive integer, got {n}"
                ))
            })
    }

    /// The 1-indexed value.
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// The 0-indexed position of the page in the document.
    pub fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

impl TryFrom<f64> for PageNumber {
    type Error = RasterError;

    /// JSON numbers arrive as `f64`; fractional and non-finite values are
    /// rejected here rather than truncated.
    fn try_from(n: f64) -> Result<Self, Self::Error> {
        if !n.is_finite() || n.fract() != 0.0 {
            return Err(RasterError::InvalidArgument(format!(
                "page_number must be a positive integer, got {n}"
            )));
        }
        if n < 1.0 || n > f64::from(u32::MAX) {
            return Err(RasterError::InvalidArgument(format!(
                "page_number must be a positive integer, got {n}"
            )));
        }
        Self::new(n as i64)
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Intrinsic page size in PDF points (1/72 inch), rotation applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub fn new(page: PageNumber, width_pt: f32, height_pt: f32) -> Result<Self, RasterError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if !valid(width_pt) || !valid(height_pt) {
            return Err(RasterError::render(
                page.get(),
                format!("page has degenerate size {width_pt}×{height_pt} pt"),
            ));
        }
        Ok(Self {
            width_pt,
            height_pt,
        })
    }
}

/// Device-space rectangle a page is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width_px: u32,
    pub height_px: u32,
}

impl Viewport {
    /// Scale `size` to device pixels, rounding each edge to the nearest pixel.
    ///
    /// Edges are clamped to at least 1 px so thin pages (e.g. a 0.3 pt
    /// ribbon at scale 1.0) still produce a drawable surface.
    pub fn new(page: PageNumber, size: PageSize, scale: f32) -> Result<Self, RasterError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RasterError::render(
                page.get(),
                format!("invalid render scale {scale}"),
            ));
        }

        let edge = |pt: f32| -> Result<u32, RasterError> {
            let px = (f64::from(pt) * f64::from(scale)).round();
            if px > f64::from(i32::MAX) {
                return Err(RasterError::render(
                    page.get(),
                    format!("viewport edge of {px} px is too large"),
                ));
            }
            Ok((px as u32).max(1))
        };

        Ok(Self {
            width_px: edge(size.width_pt)?,
            height_px: edge(size.height_pt)?,
        })
    }

    /// Total pixels a surface of this viewport holds.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width_px) * u64::from(self.height_px)
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width_px, self.height_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: i64) -> PageNumber {
        PageNumber::new(n).unwrap()
    }

    #[test]
    fn page_number_rejects_non_positive() {
        for bad in [0, -1, i64::MIN, i64::from(u32::MAX) + 1] {
            assert!(
                matches!(PageNumber::new(bad), Err(RasterError::InvalidArgument(_))),
                "{bad} should be rejected"
            );
        }
        assert_eq!(p(1).index(), 0);
        assert_eq!(p(7).get(), 7);
    }

    #[test]
    fn page_number_from_json_number() {
        assert_eq!(PageNumber::try_from(3.0).unwrap().get(), 3);
        for bad in [1.5, 0.0, -2.0, f64::NAN, f64::INFINITY, 1e12] {
            assert!(
                matches!(PageNumber::try_from(bad), Err(RasterError::InvalidArgument(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn viewport_letter_at_scale_two() {
        let size = PageSize::new(p(1), 612.0, 792.0).unwrap();
        let vp = Viewport::new(p(1), size, 2.0).unwrap();
        assert_eq!((vp.width_px, vp.height_px), (1224, 1584));
        assert_eq!(vp.pixel_count(), 1224 * 1584);
        assert_eq!(vp.to_string(), "1224x1584");
    }

    #[test]
    fn viewport_rounds_to_nearest() {
        // A4: 595.28 × 841.89 pt
        let size = PageSize::new(p(1), 595.28, 841.89).unwrap();
        let vp = Viewport::new(p(1), size, 1.0).unwrap();
        assert_eq!((vp.width_px, vp.height_px), (595, 842));
    }

    #[test]
    fn viewport_never_collapses_to_zero() {
        let size = PageSize::new(p(1), 0.3, 100.0).unwrap();
        let vp = Viewport::new(p(1), size, 1.0).unwrap();
        assert_eq!(vp.width_px, 1);
    }

    #[test]
    fn degenerate_inputs_are_render_errors() {
        assert!(matches!(
            PageSize::new(p(2), 0.0, 10.0),
            Err(RasterError::Render { page: 2, .. })
        ));
        assert!(PageSize::new(p(1), f32::NAN, 10.0).is_err());

        let size = PageSize::new(p(1), 10.0, 10.0).unwrap();
        assert!(Viewport::new(p(1), size, 0.0).is_err());
        assert!(Viewport::new(p(1), size, f32::NAN).is_err());

        let huge = PageSize::new(p(1), 1.0e9, 10.0).unwrap();
        assert!(Viewport::new(p(1), huge, 8.0).is_err());
    }
}
