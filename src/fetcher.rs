use camino::Utf8PathBuf;
use tracing::{debug, info};

use crate::catalog::{self, BEDMAP2_ARCHIVE};
use crate::config::ResolvedConfig;
use crate::dataset::{self, CompositeDataset};
use crate::domain::DatasetSelection;
use crate::error::RockhoundError;
use crate::fs_util;
use crate::raster::{GeoTiffDecoder, RasterDecoder};
use crate::registry::{ArchiveFetcher, HttpArchiveFetcher};

/// What a fetch produced: the loaded rasters, or only the verified archive.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Loaded(CompositeDataset),
    Archive(Utf8PathBuf),
}

impl FetchOutcome {
    pub fn into_dataset(self) -> Option<CompositeDataset> {
        match self {
            FetchOutcome::Loaded(dataset) => Some(dataset),
            FetchOutcome::Archive(_) => None,
        }
    }

    pub fn into_archive_path(self) -> Option<Utf8PathBuf> {
        match self {
            FetchOutcome::Archive(path) => Some(path),
            FetchOutcome::Loaded(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct DatasetFetcher<A: ArchiveFetcher, D: RasterDecoder> {
    archives: A,
    decoder: D,
}

impl DatasetFetcher<HttpArchiveFetcher, GeoTiffDecoder> {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, RockhoundError> {
        Ok(Self::new(
            HttpArchiveFetcher::from_config(config)?,
            GeoTiffDecoder::new(),
        ))
    }
}

impl<A: ArchiveFetcher, D: RasterDecoder> DatasetFetcher<A, D> {
    pub fn new(archives: A, decoder: D) -> Self {
        Self { archives, decoder }
    }

    pub fn archives(&self) -> &A {
        &self.archives
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Makes sure the Bedmap2 archive is present and verified, then either
    /// returns its path (`load == false`) or loads the selected rasters.
    pub fn fetch(
        &self,
        selection: &DatasetSelection,
        load: bool,
    ) -> Result<FetchOutcome, RockhoundError> {
        let archive = self.archives.fetch(BEDMAP2_ARCHIVE)?;
        if !load {
            return Ok(FetchOutcome::Archive(archive));
        }

        let datasets = selection.normalize();
        info!(archive = %archive, count = datasets.len(), "loading bedmap2 datasets");

        let mut arrays = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            let entry = catalog::entry(dataset);
            // Dropping the temp dir removes the extracted raster on every path out of this block.
            let temp_dir = tempfile::Builder::new()
                .prefix("rockhound-")
                .tempdir()
                .map_err(|err| RockhoundError::Filesystem(err.to_string()))?;
            let member = entry.member_path();
            debug!(dataset = %dataset, member = %member, "extracting raster");
            let raster_path =
                fs_util::extract_member(archive.as_std_path(), &member, temp_dir.path())?;

            let mut array = self.decoder.open(&raster_path)?;
            let masked = array.mask_nodata();
            debug!(dataset = %dataset, masked, "masked no-data cells");

            let array = array
                .with_name(entry.name())
                .with_attr("long_name", entry.long_name)
                .with_attr("units", entry.units)
                .with_attr("source_file", entry.file_name);
            arrays.push(array);
        }

        Ok(FetchOutcome::Loaded(dataset::merge(arrays)?))
    }

    /// Validates every name before touching the archive, then fetches.
    pub fn fetch_names<I, S>(&self, names: I, load: bool) -> Result<FetchOutcome, RockhoundError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selection = DatasetSelection::from_names(names)?;
        self.fetch(&selection, load)
    }
}

/// Fetches Bedmap2 with configuration taken from `rockhound.json` (when
/// present) and the environment.
pub fn fetch_bedmap2(selection: &DatasetSelection, load: bool) -> Result<FetchOutcome, RockhoundError> {
    let config = crate::config::ConfigLoader::resolve(None)?;
    DatasetFetcher::from_config(&config)?.fetch(selection, load)
}
