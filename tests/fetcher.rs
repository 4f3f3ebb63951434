mod common;

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use rockhound::catalog::BEDMAP2_ARCHIVE;
use rockhound::domain::{Bedmap2Dataset, DatasetSelection};
use rockhound::error::RockhoundError;
use rockhound::fetcher::DatasetFetcher;
use rockhound::raster::{GeoTiffDecoder, LabeledArray, RasterDecoder};
use rockhound::registry::ArchiveFetcher;

use common::{bedmap2_archive, same_values};

struct LocalArchive {
    path: Utf8PathBuf,
    calls: Cell<usize>,
}

impl ArchiveFetcher for LocalArchive {
    fn fetch(&self, archive: &str) -> Result<Utf8PathBuf, RockhoundError> {
        if archive != BEDMAP2_ARCHIVE {
            return Err(RockhoundError::UnknownArchive(archive.to_string()));
        }
        self.calls.set(self.calls.get() + 1);
        Ok(self.path.clone())
    }
}

#[derive(Default)]
struct CountingDecoder {
    inner: GeoTiffDecoder,
    calls: Cell<usize>,
}

impl RasterDecoder for CountingDecoder {
    fn open(&self, path: &Path) -> Result<LabeledArray, RockhoundError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.open(path)
    }
}

/// Fails every decode, remembering the extracted file it was handed.
#[derive(Default)]
struct RejectingDecoder {
    seen: RefCell<Vec<PathBuf>>,
}

impl RasterDecoder for RejectingDecoder {
    fn open(&self, path: &Path) -> Result<LabeledArray, RockhoundError> {
        assert!(path.is_file());
        self.seen.borrow_mut().push(path.to_path_buf());
        Err(RockhoundError::RasterDecode {
            path: path.to_path_buf(),
            message: "unsupported compression".to_string(),
        })
    }
}

fn fetcher(dir: &Path) -> DatasetFetcher<LocalArchive, CountingDecoder> {
    DatasetFetcher::new(
        LocalArchive {
            path: bedmap2_archive(dir),
            calls: Cell::new(0),
        },
        CountingDecoder::default(),
    )
}

#[test]
fn bed_is_loaded_with_missing_cells() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = fetcher(temp.path());

    let dataset = fetcher
        .fetch(&DatasetSelection::single(Bedmap2Dataset::Bed), true)
        .unwrap()
        .into_dataset()
        .unwrap();

    assert_eq!(dataset.names(), vec!["bed"]);
    let bed = dataset.get("bed").unwrap();
    assert_eq!(bed.values[[0, 0]], -120.5);
    assert!(bed.values[[0, 1]].is_nan());
    assert!(bed.values[[1, 1]].is_nan());
    assert_eq!(bed.values[[1, 2]], -2.25);
    assert!(bed.values.iter().all(|value| *value != -9999.0));
    assert_eq!(bed.attrs["units"], "meters");
    assert_eq!(bed.attrs["crs"], "EPSG:3031");
    assert_eq!(dataset.x(), &[-2500.0, -1500.0, -500.0]);
    assert_eq!(dataset.y(), &[1500.0, 500.0]);
}

#[test]
fn explicit_subset_keeps_request_order() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = fetcher(temp.path());

    let dataset = fetcher
        .fetch_names(["thickness", "geoid", "rockmask"], true)
        .unwrap()
        .into_dataset()
        .unwrap();

    assert_eq!(dataset.names(), vec!["thickness", "geoid", "rockmask"]);
    let geoid = dataset.get("geoid").unwrap();
    assert_eq!(geoid.values[[0, 0]], -20.0);
    assert!(geoid.values.iter().all(|value| !value.is_nan()));
    assert_eq!(geoid.attrs["source_file"], "gl04c_geiod_to_WGS84.tif");
    let rockmask = dataset.get("rockmask").unwrap();
    assert!(rockmask.values[[0, 2]].is_nan());
    assert_eq!(fetcher.archives().calls.get(), 1);
}

#[test]
fn all_loads_every_dataset_once_on_the_joined_grid() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = fetcher(temp.path());

    let dataset = fetcher
        .fetch(&DatasetSelection::All, true)
        .unwrap()
        .into_dataset()
        .unwrap();

    let expected = Bedmap2Dataset::ALL
        .iter()
        .map(|dataset| dataset.as_str())
        .collect::<Vec<_>>();
    assert_eq!(dataset.names(), expected);

    // The 2 km uncertainty cell centre adds one x and one y coordinate.
    assert_eq!(dataset.x(), &[-2500.0, -2000.0, -1500.0, -500.0]);
    assert_eq!(dataset.y(), &[1500.0, 1000.0, 500.0]);
    let uncertainty = dataset.get("thickness_uncertainty_5km").unwrap();
    assert_eq!(uncertainty.values[[1, 1]], 55.0);
    assert_eq!(uncertainty.values.iter().filter(|v| !v.is_nan()).count(), 1);
    let bed = dataset.get("bed").unwrap();
    assert_eq!(bed.values[[0, 0]], -120.5);
    assert!(bed.values[[1, 0]].is_nan());
}

#[test]
fn coarse_grid_first_keeps_north_up_orientation() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = fetcher(temp.path());

    let coarse_first = fetcher
        .fetch_names(["thickness_uncertainty_5km", "bed"], true)
        .unwrap()
        .into_dataset()
        .unwrap();
    let bed_first = fetcher
        .fetch_names(["bed", "thickness_uncertainty_5km"], true)
        .unwrap()
        .into_dataset()
        .unwrap();

    assert_eq!(coarse_first.names(), vec!["thickness_uncertainty_5km", "bed"]);
    assert_eq!(coarse_first.y(), &[1500.0, 1000.0, 500.0]);
    assert_eq!(coarse_first.x(), &[-2500.0, -2000.0, -1500.0, -500.0]);
    assert_eq!(coarse_first.y(), bed_first.y());
    assert_eq!(coarse_first.x(), bed_first.x());

    let bed = coarse_first.get("bed").unwrap();
    assert_eq!(bed.values[[0, 0]], -120.5);
    assert_eq!(bed.values[[2, 3]], -2.25);
    let uncertainty = coarse_first.get("thickness_uncertainty_5km").unwrap();
    assert_eq!(uncertainty.values[[1, 1]], 55.0);
}

#[test]
fn unknown_dataset_fails_without_extraction() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = fetcher(temp.path());

    let err = fetcher
        .fetch_names(["not_a_real_dataset"], true)
        .unwrap_err();
    assert_matches!(
        err,
        RockhoundError::InvalidDataset { ref name, ref archive }
            if name == "not_a_real_dataset" && archive == BEDMAP2_ARCHIVE
    );
    assert!(err.to_string().contains("not_a_real_dataset"));
    assert_eq!(fetcher.archives().calls.get(), 0);
    assert_eq!(fetcher.decoder().calls.get(), 0);
}

#[test]
fn no_load_returns_the_archive_without_decoding() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = fetcher(temp.path());

    let path = fetcher
        .fetch(&DatasetSelection::All, false)
        .unwrap()
        .into_archive_path()
        .unwrap();
    assert!(path.as_std_path().is_file());
    assert!(path.ends_with(BEDMAP2_ARCHIVE));
    assert_eq!(fetcher.decoder().calls.get(), 0);
}

#[test]
fn repeated_fetches_return_identical_content() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = fetcher(temp.path());
    let selection = DatasetSelection::Names(vec![Bedmap2Dataset::Surface, Bedmap2Dataset::Bed]);

    let first = fetcher.fetch(&selection, true).unwrap().into_dataset().unwrap();
    let second = fetcher.fetch(&selection, true).unwrap().into_dataset().unwrap();

    assert_eq!(first.names(), second.names());
    assert_eq!(first.x(), second.x());
    assert_eq!(first.y(), second.y());
    for (a, b) in first.variables().iter().zip(second.variables()) {
        assert!(same_values(&a.values, &b.values));
        assert_eq!(a.attrs, b.attrs);
    }
}

#[test]
fn decode_failure_aborts_the_call() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join(BEDMAP2_ARCHIVE);
    {
        use std::io::Write;
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer
            .start_file("bedmap2_tiff/bedmap2_bed.tif", options)
            .unwrap();
        writer
            .write_all(&common::geotiff_f32(common::FINE, &[0.0; 6], Some("-9999")))
            .unwrap();
        writer
            .start_file("bedmap2_tiff/bedmap2_surface.tif", options)
            .unwrap();
        writer.write_all(b"not a tiff").unwrap();
        writer.finish().unwrap();
    }
    let fetcher = DatasetFetcher::new(
        LocalArchive {
            path: Utf8PathBuf::from_path_buf(path).unwrap(),
            calls: Cell::new(0),
        },
        CountingDecoder::default(),
    );

    let err = fetcher
        .fetch_names(["bed", "surface", "thickness"], true)
        .unwrap_err();
    assert_matches!(err, RockhoundError::RasterDecode { .. });
    // thickness is never reached.
    assert_eq!(fetcher.decoder().calls.get(), 2);
}

#[test]
fn scratch_files_are_removed_when_decoding_fails() {
    let temp = tempfile::tempdir().unwrap();
    let fetcher = DatasetFetcher::new(
        LocalArchive {
            path: bedmap2_archive(temp.path()),
            calls: Cell::new(0),
        },
        RejectingDecoder::default(),
    );

    let err = fetcher.fetch_names(["bed", "surface"], true).unwrap_err();
    assert_matches!(err, RockhoundError::RasterDecode { .. });

    let seen = fetcher.decoder().seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].ends_with("bedmap2_tiff/bedmap2_bed.tif"));
    assert!(!seen[0].exists());
    // The per-dataset scratch directory goes with the file.
    let scratch = seen[0].parent().and_then(Path::parent).unwrap();
    assert!(!scratch.exists());
}

#[test]
fn member_missing_from_archive_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join(BEDMAP2_ARCHIVE);
    {
        let file = std::fs::File::create(&path).unwrap();
        let writer = zip::ZipWriter::new(file);
        writer.finish().unwrap();
    }
    let fetcher = DatasetFetcher::new(
        LocalArchive {
            path: Utf8PathBuf::from_path_buf(path).unwrap(),
            calls: Cell::new(0),
        },
        GeoTiffDecoder::new(),
    );

    let err = fetcher.fetch_names(["geoid"], true).unwrap_err();
    assert_matches!(
        err,
        RockhoundError::MemberNotFound { ref member, .. }
            if member == "bedmap2_tiff/gl04c_geiod_to_WGS84.tif"
    );
}
