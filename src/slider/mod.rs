use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::{self, Dimension};

/// Numeric limits for one slider, supplied once by the hosting page.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct RangeBounds {
    pub min: f64,
    pub max: f64,
    pub start_min: f64,
    pub start_max: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum BoundsError {
    #[error("{dimension} bounds must be finite numbers")]
    NotFinite { dimension: Dimension },

    #[error("{dimension} range is inverted: min {min} > max {max}")]
    Inverted {
        dimension: Dimension,
        min: f64,
        max: f64,
    },

    #[error("{dimension} step must be positive, got {step}")]
    InvalidStep { dimension: Dimension, step: f64 },
}

impl RangeBounds {
    pub fn new(min: f64, max: f64, start_min: f64, start_max: f64) -> Self {
        Self {
            min,
            max,
            start_min,
            start_max,
        }
    }

    /// Full range with the handles at both ends.
    pub fn full(min: f64, max: f64) -> Self {
        Self::new(min, max, min, max)
    }

    pub fn validate(&self, dimension: Dimension) -> Result<(), BoundsError> {
        let all = [self.min, self.max, self.start_min, self.start_max];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(BoundsError::NotFinite { dimension });
        }
        if self.min > self.max {
            return Err(BoundsError::Inverted {
                dimension,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SliderOptions {
    pub dimension: Dimension,
    pub step: f64,
    pub step_decimals: u32,
    pub connect: bool,
    pub tooltips: [bool; 2],
}

impl SliderOptions {
    pub fn for_dimension(dimension: Dimension) -> Self {
        Self {
            dimension,
            step: dimension.step(),
            step_decimals: dimension.step_decimals(),
            connect: true,
            tooltips: [true, true],
        }
    }
}

/// Dual-handle range slider with a connecting track and formatted handles.
#[derive(Clone, Debug)]
pub struct RangeSlider {
    container_id: String,
    options: SliderOptions,
    bounds: RangeBounds,
    values: [f64; 2],
}

impl RangeSlider {
    pub fn create(
        container_id: impl Into<String>,
        bounds: RangeBounds,
        options: SliderOptions,
    ) -> Result<Self, BoundsError> {
        bounds.validate(options.dimension)?;
        if !(options.step.is_finite() && options.step > 0.0) {
            return Err(BoundsError::InvalidStep {
                dimension: options.dimension,
                step: options.step,
            });
        }
        let mut slider = Self {
            container_id: container_id.into(),
            options,
            bounds,
            values: [bounds.min, bounds.max],
        };
        slider.set(bounds.start_min, bounds.start_max);
        Ok(slider)
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn dimension(&self) -> Dimension {
        self.options.dimension
    }

    pub fn options(&self) -> &SliderOptions {
        &self.options
    }

    pub fn bounds(&self) -> RangeBounds {
        self.bounds
    }

    fn snap(&self, value: f64) -> f64 {
        let RangeBounds { min, max, .. } = self.bounds;
        let clamped = if value.is_nan() {
            min
        } else {
            value.clamp(min, max)
        };
        let steps = ((clamped - min) / self.options.step).round();
        let snapped = (min + steps * self.options.step).min(max);
        let scale = 10f64.powi(self.options.step_decimals as i32);
        (snapped * scale).round() / scale
    }

    /// Moves both handles; values are clamped, snapped to the step and kept uncrossed.
    pub fn set(&mut self, low: f64, high: f64) {
        let high = self.snap(high);
        let low = self.snap(low).min(high);
        self.values = [low, high];
    }

    /// Raw handle positions.
    pub fn values(&self) -> [f64; 2] {
        self.values
    }

    /// Formatted handle values, as the widget's getter returns them.
    pub fn get(&self) -> [String; 2] {
        let dimension = self.options.dimension;
        [
            format::format_value(dimension, self.values[0]),
            format::format_value(dimension, self.values[1]),
        ]
    }

    /// Tooltip text per handle, `None` where tooltips are disabled.
    pub fn tooltips(&self) -> [Option<String>; 2] {
        let [low, high] = self.get();
        [
            self.options.tooltips[0].then_some(low),
            self.options.tooltips[1].then_some(high),
        ]
    }
}
