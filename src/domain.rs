use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::BEDMAP2_ARCHIVE;
use crate::error::RockhoundError;

/// One of the rasters shipped in the Bedmap2 archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bedmap2Dataset {
    Bed,
    Surface,
    Thickness,
    IcemaskGroundedAndShelves,
    Rockmask,
    LakemaskVostok,
    BedUncertainty,
    ThicknessUncertainty5km,
    DataCoverage,
    Geoid,
}

impl Bedmap2Dataset {
    /// Every dataset, in catalog order.
    pub const ALL: [Bedmap2Dataset; 10] = [
        Bedmap2Dataset::Bed,
        Bedmap2Dataset::Surface,
        Bedmap2Dataset::Thickness,
        Bedmap2Dataset::IcemaskGroundedAndShelves,
        Bedmap2Dataset::Rockmask,
        Bedmap2Dataset::LakemaskVostok,
        Bedmap2Dataset::BedUncertainty,
        Bedmap2Dataset::ThicknessUncertainty5km,
        Bedmap2Dataset::DataCoverage,
        Bedmap2Dataset::Geoid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bedmap2Dataset::Bed => "bed",
            Bedmap2Dataset::Surface => "surface",
            Bedmap2Dataset::Thickness => "thickness",
            Bedmap2Dataset::IcemaskGroundedAndShelves => "icemask_grounded_and_shelves",
            Bedmap2Dataset::Rockmask => "rockmask",
            Bedmap2Dataset::LakemaskVostok => "lakemask_vostok",
            Bedmap2Dataset::BedUncertainty => "bed_uncertainty",
            Bedmap2Dataset::ThicknessUncertainty5km => "thickness_uncertainty_5km",
            Bedmap2Dataset::DataCoverage => "data_coverage",
            Bedmap2Dataset::Geoid => "geoid",
        }
    }
}

impl fmt::Display for Bedmap2Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Bedmap2Dataset {
    type Err = RockhoundError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        Bedmap2Dataset::ALL
            .into_iter()
            .find(|dataset| dataset.as_str() == normalized)
            .ok_or_else(|| RockhoundError::InvalidDataset {
                name: value.to_string(),
                archive: BEDMAP2_ARCHIVE.to_string(),
            })
    }
}

/// Which datasets a fetch should load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSelection {
    All,
    Names(Vec<Bedmap2Dataset>),
}

impl DatasetSelection {
    pub fn single(dataset: Bedmap2Dataset) -> Self {
        DatasetSelection::Names(vec![dataset])
    }

    /// Parses every name up front; the first unknown name fails the whole selection.
    pub fn from_names<I, S>(names: I) -> Result<Self, RockhoundError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let datasets = names
            .into_iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<Bedmap2Dataset>, RockhoundError>>()?;
        Ok(DatasetSelection::Names(datasets))
    }

    /// Expands the selection into an explicit ordered list with repeats removed.
    pub fn normalize(&self) -> Vec<Bedmap2Dataset> {
        match self {
            DatasetSelection::All => Bedmap2Dataset::ALL.to_vec(),
            DatasetSelection::Names(names) => {
                let mut ordered = Vec::with_capacity(names.len());
                for name in names {
                    if !ordered.contains(name) {
                        ordered.push(*name);
                    }
                }
                ordered
            }
        }
    }
}

impl From<Bedmap2Dataset> for DatasetSelection {
    fn from(value: Bedmap2Dataset) -> Self {
        DatasetSelection::single(value)
    }
}

impl From<Vec<Bedmap2Dataset>> for DatasetSelection {
    fn from(value: Vec<Bedmap2Dataset>) -> Self {
        DatasetSelection::Names(value)
    }
}

impl FromStr for DatasetSelection {
    type Err = RockhoundError;

    /// Accepts `all` or a comma separated list of dataset names.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed == "all" {
            return Ok(DatasetSelection::All);
        }
        DatasetSelection::from_names(trimmed.split(',').map(str::trim))
    }
}
