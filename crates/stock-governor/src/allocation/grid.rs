use serde::{Deserialize, Serialize};

use super::allocator::{AllocationConfig, WeightMethod};

const MAX_RESERVE_PERCENT: f64 = 0.9;

/// Candidate values per tunable axis, in declaration order
/// (outermost first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisValues {
    pub reserve_percent: Vec<f64>,
    pub max_per_product: Vec<u32>,
    pub weight_method: Vec<WeightMethod>,
    pub weight_gamma: Vec<f64>,
    pub dynamic_top_k: Vec<u8>,
}

impl Default for AxisValues {
    fn default() -> Self {
        Self {
            reserve_percent: vec![0.0, 0.1, 0.2],
            max_per_product: vec![0, 50],
            weight_method: vec![WeightMethod::Power, WeightMethod::Softmax],
            weight_gamma: vec![1.0, 1.5, 2.0],
            dynamic_top_k: vec![0, 1],
        }
    }
}

/// Knobs carried through every grid point unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedKnobs {
    pub min_lines: u32,
    pub reserve_min_units: u32,
    pub softmax_tau: f64,
}

impl Default for FixedKnobs {
    fn default() -> Self {
        Self {
            min_lines: 1,
            reserve_min_units: 0,
            softmax_tau: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("axis '{0}' has no candidate values")]
    EmptyAxis(&'static str),
    #[error("axis '{axis}' value {value} is out of range ({expected})")]
    InvalidValue {
        axis: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Validated Cartesian product of the axes. Enumeration is a fixed nested
/// loop with the last declared axis varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigGrid {
    axes: AxisValues,
    fixed: FixedKnobs,
}

impl ConfigGrid {
    pub fn new(axes: AxisValues, fixed: FixedKnobs) -> Result<Self, GridError> {
        non_empty("reserve_percent", &axes.reserve_percent)?;
        non_empty("max_per_product", &axes.max_per_product)?;
        non_empty("weight_method", &axes.weight_method)?;
        non_empty("weight_gamma", &axes.weight_gamma)?;
        non_empty("dynamic_top_k", &axes.dynamic_top_k)?;

        for &value in &axes.reserve_percent {
            if !value.is_finite() || !(0.0..=MAX_RESERVE_PERCENT).contains(&value) {
                return Err(invalid("reserve_percent", value, "0.0 ..= 0.9"));
            }
        }
        for &value in &axes.weight_gamma {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid("weight_gamma", value, "> 0"));
            }
        }
        for &value in &axes.dynamic_top_k {
            if value > 1 {
                return Err(invalid("dynamic_top_k", value, "0 or 1"));
            }
        }
        if !fixed.softmax_tau.is_finite() || fixed.softmax_tau <= 0.0 {
            return Err(invalid("softmax_tau", fixed.softmax_tau, "> 0"));
        }

        Ok(Self { axes, fixed })
    }

    pub fn axes(&self) -> &AxisValues {
        &self.axes
    }

    pub fn fixed(&self) -> &FixedKnobs {
        &self.fixed
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        [
            self.axes.reserve_percent.len(),
            self.axes.max_per_product.len(),
            self.axes.weight_method.len(),
            self.axes.weight_gamma.len(),
            self.axes.dynamic_top_k.len(),
        ]
        .into_iter()
        .fold(1usize, usize::saturating_mul)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grid point at `index` in canonical order.
    pub fn point(&self, index: usize) -> Option<AllocationConfig> {
        if index >= self.len() {
            return None;
        }

        let axes = &self.axes;
        let mut rest = index;
        let mut digit = |len: usize| {
            let value = rest % len;
            rest /= len;
            value
        };
        let top_k = digit(axes.dynamic_top_k.len());
        let gamma = digit(axes.weight_gamma.len());
        let method = digit(axes.weight_method.len());
        let max_per_product = digit(axes.max_per_product.len());
        let reserve = digit(axes.reserve_percent.len());

        Some(AllocationConfig {
            reserve_percent: axes.reserve_percent[reserve],
            max_per_product: axes.max_per_product[max_per_product],
            weight_method: axes.weight_method[method],
            weight_gamma: axes.weight_gamma[gamma],
            dynamic_top_k: axes.dynamic_top_k[top_k],
            min_lines: self.fixed.min_lines,
            reserve_min_units: self.fixed.reserve_min_units,
            softmax_tau: self.fixed.softmax_tau,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = AllocationConfig> + '_ {
        (0..self.len()).filter_map(move |index| self.point(index))
    }
}

fn non_empty<T>(axis: &'static str, values: &[T]) -> Result<(), GridError> {
    if values.is_empty() {
        Err(GridError::EmptyAxis(axis))
    } else {
        Ok(())
    }
}

fn invalid(axis: &'static str, value: impl ToString, expected: &'static str) -> GridError {
    GridError::InvalidValue {
        axis,
        value: value.to_string(),
        expected,
    }
}
