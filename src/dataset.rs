use std::collections::{BTreeMap, HashMap};

use ndarray::Array2;
use serde::Serialize;

use crate::error::RockhoundError;
use crate::raster::LabeledArray;

/// A named grid inside a [`CompositeDataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    pub name: String,
    pub values: Array2<f32>,
    pub nodata: Option<f64>,
    pub attrs: BTreeMap<String, String>,
}

/// Variables sharing one pair of `y`/`x` coordinates, in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeDataset {
    x: Vec<f64>,
    y: Vec<f64>,
    variables: Vec<DataVariable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableSummary {
    pub name: String,
    pub shape: [usize; 2],
    pub units: Option<String>,
    pub valid: usize,
    pub missing: usize,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub x_size: usize,
    pub y_size: usize,
    pub x_range: Option<[f64; 2]>,
    pub y_range: Option<[f64; 2]>,
    pub variables: Vec<VariableSummary>,
}

impl CompositeDataset {
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// `(y, x)` sizes shared by every variable.
    pub fn dims(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|var| var.name.as_str()).collect()
    }

    pub fn variables(&self) -> &[DataVariable] {
        &self.variables
    }

    pub fn get(&self, name: &str) -> Option<&DataVariable> {
        self.variables.iter().find(|var| var.name == name)
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            x_size: self.x.len(),
            y_size: self.y.len(),
            x_range: coordinate_range(&self.x),
            y_range: coordinate_range(&self.y),
            variables: self.variables.iter().map(summarize).collect(),
        }
    }
}

/// Combines labeled arrays into one dataset with an outer join on the
/// coordinates: cells a variable does not cover are NaN.
pub fn merge(arrays: Vec<LabeledArray>) -> Result<CompositeDataset, RockhoundError> {
    let mut names = Vec::with_capacity(arrays.len());
    for array in &arrays {
        let name = array
            .name
            .clone()
            .ok_or_else(|| RockhoundError::MergeConflict("array has no name".to_string()))?;
        if names.contains(&name) {
            return Err(RockhoundError::MergeConflict(format!(
                "variable {name} appears more than once"
            )));
        }
        names.push(name);
    }

    let Some(first) = arrays.first() else {
        return Ok(CompositeDataset::default());
    };

    let shared = arrays
        .iter()
        .all(|array| array.x == first.x && array.y == first.y);
    let (x, y) = if shared {
        (first.x.clone(), first.y.clone())
    } else {
        // Without a two-coordinate axis to copy, use raster order: x west to east, y north to south.
        let x_ascending = axis_direction(arrays.iter().map(|a| a.x.as_slice()), true);
        let y_ascending = axis_direction(arrays.iter().map(|a| a.y.as_slice()), false);
        (
            union_coordinates(arrays.iter().map(|a| a.x.as_slice()), x_ascending),
            union_coordinates(arrays.iter().map(|a| a.y.as_slice()), y_ascending),
        )
    };

    let x_index = coordinate_index(&x);
    let y_index = coordinate_index(&y);
    let variables = arrays
        .into_iter()
        .zip(names)
        .map(|(array, name)| {
            let values = if shared {
                array.values
            } else {
                reindex(&array, &x_index, &y_index, (y.len(), x.len()))
            };
            DataVariable {
                name,
                values,
                nodata: array.nodata,
                attrs: array.attrs,
            }
        })
        .collect();

    Ok(CompositeDataset { x, y, variables })
}

/// Direction of the first axis with at least two coordinates.
fn axis_direction<'a>(mut axes: impl Iterator<Item = &'a [f64]>, fallback: bool) -> bool {
    axes.find(|coords| coords.len() >= 2)
        .map(|coords| coords[1] >= coords[0])
        .unwrap_or(fallback)
}

fn coordinate_key(value: f64) -> u64 {
    // Adding 0.0 folds -0.0 into 0.0 so both hash the same.
    (value + 0.0).to_bits()
}

fn union_coordinates<'a>(axes: impl Iterator<Item = &'a [f64]>, ascending: bool) -> Vec<f64> {
    let mut all = axes.flatten().copied().collect::<Vec<_>>();
    all.sort_by(|a, b| if ascending { a.total_cmp(b) } else { b.total_cmp(a) });
    all.dedup_by(|a, b| coordinate_key(*a) == coordinate_key(*b));
    all
}

fn coordinate_index(coords: &[f64]) -> HashMap<u64, usize> {
    coords
        .iter()
        .enumerate()
        .map(|(i, value)| (coordinate_key(*value), i))
        .collect()
}

fn reindex(
    array: &LabeledArray,
    x_index: &HashMap<u64, usize>,
    y_index: &HashMap<u64, usize>,
    shape: (usize, usize),
) -> Array2<f32> {
    let mut out = Array2::from_elem(shape, f32::NAN);
    let columns = array
        .x
        .iter()
        .map(|value| x_index[&coordinate_key(*value)])
        .collect::<Vec<_>>();
    for (row, y_value) in array.y.iter().enumerate() {
        let target_row = y_index[&coordinate_key(*y_value)];
        for (col, target_col) in columns.iter().enumerate() {
            out[[target_row, *target_col]] = array.values[[row, col]];
        }
    }
    out
}

fn coordinate_range(coords: &[f64]) -> Option<[f64; 2]> {
    let first = *coords.first()?;
    let last = *coords.last()?;
    Some([first.min(last), first.max(last)])
}

fn summarize(var: &DataVariable) -> VariableSummary {
    let (rows, cols) = var.values.dim();
    let mut valid = 0usize;
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut sum = 0.0f64;
    for value in var.values.iter().filter(|value| !value.is_nan()) {
        valid += 1;
        min = min.min(*value);
        max = max.max(*value);
        sum += f64::from(*value);
    }
    VariableSummary {
        name: var.name.clone(),
        shape: [rows, cols],
        units: var.attrs.get("units").filter(|u| !u.is_empty()).cloned(),
        valid,
        missing: rows * cols - valid,
        min: (valid > 0).then_some(min),
        max: (valid > 0).then_some(max),
        mean: (valid > 0).then(|| sum / valid as f64),
    }
}
