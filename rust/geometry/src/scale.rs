// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pixel-to-physical area conversion
//!
//! Calibration is optional and commonly absent; `None` from
//! [`ScaleCalibrator::area_from_pixels`] means "no scale set", not an error.
//! Areas outside the sanity band are logged and returned anyway, since
//! industrial drawings legitimately exceed residential room sizes.

use crate::error::ScaleError;

const DEFAULT_SANITY_BAND: (f64, f64) = (5.0, 10_000.0);

/// Converts pixel areas to physical areas under a calibration factor.
#[derive(Debug, Clone, Copy)]
pub struct ScaleCalibrator {
    pixels_per_unit: Option<f64>,
    sanity_band: (f64, f64),
}

impl ScaleCalibrator {
    /// An uncalibrated calibrator; every area query returns `None`.
    pub fn new() -> Self {
        Self {
            pixels_per_unit: None,
            sanity_band: DEFAULT_SANITY_BAND,
        }
    }

    pub fn with_scale(pixels_per_unit: f64) -> Result<Self, ScaleError> {
        let mut calibrator = Self::new();
        calibrator.set(pixels_per_unit)?;
        Ok(calibrator)
    }

    /// Set the calibration factor in pixels per linear unit.
    pub fn set(&mut self, pixels_per_unit: f64) -> Result<(), ScaleError> {
        if pixels_per_unit <= 0.0 {
            return Err(ScaleError(pixels_per_unit));
        }
        self.pixels_per_unit = Some(pixels_per_unit);
        tracing::info!(pixels_per_unit, "scale calibrated");
        Ok(())
    }

    pub fn is_calibrated(&self) -> bool {
        self.pixels_per_unit.is_some()
    }

    /// Physical area for a pixel area, rounded to two decimals.
    ///
    /// Returns `None` when no calibration is set. Values outside the sanity
    /// band are logged but still returned.
    pub fn area_from_pixels(&self, pixel_area: f64) -> Option<f64> {
        let ppu = self.pixels_per_unit?;
        let area = pixel_area / (ppu * ppu);
        let rounded = (area * 100.0).round() / 100.0;

        let (lo, hi) = self.sanity_band;
        if rounded < lo || rounded > hi {
            tracing::warn!(
                area = rounded,
                band_low = lo,
                band_high = hi,
                "calibrated area outside sanity band; scale may be wrong"
            );
        }

        Some(rounded)
    }
}

impl Default for ScaleCalibrator {
    fn default() -> Self {
        Self::new()
    }
}
