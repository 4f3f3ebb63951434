//! The fixed Bedmap2 catalog: canonical dataset name to archive member, plus
//! the descriptive metadata attached to each loaded array.

use serde::Serialize;

use crate::domain::Bedmap2Dataset;

pub const BEDMAP2_ARCHIVE: &str = "bedmap2_tiff.zip";

/// Directory inside the archive that holds every raster.
pub const ARCHIVE_MEMBER_DIR: &str = "bedmap2_tiff";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CatalogEntry {
    pub dataset: Bedmap2Dataset,
    pub file_name: &'static str,
    pub long_name: &'static str,
    pub units: &'static str,
    pub description: &'static str,
}

impl CatalogEntry {
    pub fn name(&self) -> &'static str {
        self.dataset.as_str()
    }

    /// Path of the raster inside the zip archive.
    pub fn member_path(&self) -> String {
        format!("{ARCHIVE_MEMBER_DIR}/{}", self.file_name)
    }
}

// The geoid raster does not follow the `bedmap2_<name>.tif` convention; the
// misspelling is part of the published file name.
pub static CATALOG: [CatalogEntry; 10] = [
    CatalogEntry {
        dataset: Bedmap2Dataset::Bed,
        file_name: "bedmap2_bed.tif",
        long_name: "bed elevation",
        units: "meters",
        description: "Bed elevation relative to the gl04c geoid",
    },
    CatalogEntry {
        dataset: Bedmap2Dataset::Surface,
        file_name: "bedmap2_surface.tif",
        long_name: "ice surface elevation",
        units: "meters",
        description: "Ice surface elevation relative to the gl04c geoid",
    },
    CatalogEntry {
        dataset: Bedmap2Dataset::Thickness,
        file_name: "bedmap2_thickness.tif",
        long_name: "ice thickness",
        units: "meters",
        description: "Ice thickness",
    },
    CatalogEntry {
        dataset: Bedmap2Dataset::IcemaskGroundedAndShelves,
        file_name: "bedmap2_icemask_grounded_and_shelves.tif",
        long_name: "grounded ice and ice shelf mask",
        units: "",
        description: "0 for grounded ice, 1 for floating ice shelves",
    },
    CatalogEntry {
        dataset: Bedmap2Dataset::Rockmask,
        file_name: "bedmap2_rockmask.tif",
        long_name: "rock outcrop mask",
        units: "",
        description: "0 where rock outcrops are present",
    },
    CatalogEntry {
        dataset: Bedmap2Dataset::LakemaskVostok,
        file_name: "bedmap2_lakemask_vostok.tif",
        long_name: "Lake Vostok mask",
        units: "",
        description: "1 over the extent of Lake Vostok",
    },
    CatalogEntry {
        dataset: Bedmap2Dataset::BedUncertainty,
        file_name: "bedmap2_bed_uncertainty.tif",
        long_name: "bed elevation uncertainty",
        units: "meters",
        description: "Uncertainty of the grounded bed elevation grid",
    },
    CatalogEntry {
        dataset: Bedmap2Dataset::ThicknessUncertainty5km,
        file_name: "bedmap2_thickness_uncertainty_5km.tif",
        long_name: "ice thickness uncertainty",
        units: "meters",
        description: "Ice thickness uncertainty on a 5 km grid",
    },
    CatalogEntry {
        dataset: Bedmap2Dataset::DataCoverage,
        file_name: "bedmap2_data_coverage.tif",
        long_name: "data coverage",
        units: "",
        description: "1 where the cell contains ice thickness measurements",
    },
    CatalogEntry {
        dataset: Bedmap2Dataset::Geoid,
        file_name: "gl04c_geiod_to_WGS84.tif",
        long_name: "geoid height",
        units: "meters",
        description: "Conversion from the gl04c geoid to the WGS84 ellipsoid",
    },
];

pub fn entry(dataset: Bedmap2Dataset) -> &'static CatalogEntry {
    // CATALOG is in the same order as Bedmap2Dataset::ALL.
    &CATALOG[dataset as usize]
}

pub fn entries() -> &'static [CatalogEntry] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_dataset_order() {
        for (entry, dataset) in CATALOG.iter().zip(Bedmap2Dataset::ALL) {
            assert_eq!(entry.dataset, dataset);
        }
        assert_eq!(CATALOG.len(), Bedmap2Dataset::ALL.len());
    }

    #[test]
    fn member_files_follow_naming_convention() {
        for entry in entries() {
            if entry.dataset == Bedmap2Dataset::Geoid {
                continue;
            }
            assert_eq!(entry.file_name, format!("bedmap2_{}.tif", entry.name()));
        }
    }

    #[test]
    fn geoid_is_special_cased() {
        let geoid = entry(Bedmap2Dataset::Geoid);
        assert_eq!(geoid.member_path(), "bedmap2_tiff/gl04c_geiod_to_WGS84.tif");
    }

    #[test]
    fn file_names_are_unique() {
        let mut names = entries().iter().map(|e| e.file_name).collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }
}
