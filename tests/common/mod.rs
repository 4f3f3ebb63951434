#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

use camino::Utf8PathBuf;
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;
use zip::write::SimpleFileOptions;

use rockhound::catalog::{self, ARCHIVE_MEMBER_DIR, BEDMAP2_ARCHIVE};
use rockhound::domain::Bedmap2Dataset;

pub const NODATA: f32 = -9999.0;

/// Georeferencing of a small north-up test grid.
#[derive(Debug, Clone, Copy)]
pub struct Grid {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel: f64,
    pub width: u32,
    pub height: u32,
}

/// Three columns by two rows of 1 km cells.
pub const FINE: Grid = Grid {
    origin_x: -3000.0,
    origin_y: 2000.0,
    pixel: 1000.0,
    width: 3,
    height: 2,
};

/// One 2 km cell covering the top-left corner of [`FINE`].
pub const COARSE: Grid = Grid {
    origin_x: -3000.0,
    origin_y: 2000.0,
    pixel: 2000.0,
    width: 1,
    height: 1,
};

pub fn geotiff_f32(grid: Grid, data: &[f32], nodata: Option<&str>) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buffer).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray32Float>(grid.width, grid.height)
            .unwrap();
        write_geo_tags(image.encoder(), grid, nodata);
        image.write_data(data).unwrap();
    }
    buffer.into_inner()
}

pub fn geotiff_u8(grid: Grid, data: &[u8], nodata: Option<&str>) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut buffer).unwrap();
        let mut image = encoder
            .new_image::<colortype::Gray8>(grid.width, grid.height)
            .unwrap();
        write_geo_tags(image.encoder(), grid, nodata);
        image.write_data(data).unwrap();
    }
    buffer.into_inner()
}

fn write_geo_tags<W: Write + std::io::Seek, K: tiff::encoder::TiffKind>(
    directory: &mut tiff::encoder::DirectoryEncoder<'_, W, K>,
    grid: Grid,
    nodata: Option<&str>,
) {
    directory
        .write_tag(Tag::ModelPixelScaleTag, &[grid.pixel, grid.pixel, 0.0][..])
        .unwrap();
    directory
        .write_tag(
            Tag::ModelTiepointTag,
            &[0.0, 0.0, 0.0, grid.origin_x, grid.origin_y, 0.0][..],
        )
        .unwrap();
    // GeoKey directory: PixelIsArea, EPSG:3031 projected.
    directory
        .write_tag(
            Tag::GeoKeyDirectoryTag,
            &[1u16, 1, 0, 2, 1025, 0, 1, 1, 3072, 0, 1, 3031][..],
        )
        .unwrap();
    if let Some(nodata) = nodata {
        directory.write_tag(Tag::GdalNodata, nodata).unwrap();
    }
}

/// The raster stored for each dataset in [`bedmap2_archive`].
pub fn member_bytes(dataset: Bedmap2Dataset) -> Vec<u8> {
    match dataset {
        Bedmap2Dataset::Bed => geotiff_f32(
            FINE,
            &[-120.5, NODATA, 310.0, 42.0, NODATA, -2.25],
            Some("-9999"),
        ),
        Bedmap2Dataset::ThicknessUncertainty5km => geotiff_f32(COARSE, &[55.0], Some("-9999")),
        Bedmap2Dataset::Geoid => geotiff_f32(FINE, &[-20.0, -21.0, -22.0, -23.0, -24.0, -25.0], None),
        Bedmap2Dataset::IcemaskGroundedAndShelves
        | Bedmap2Dataset::Rockmask
        | Bedmap2Dataset::LakemaskVostok
        | Bedmap2Dataset::DataCoverage => geotiff_u8(FINE, &[0, 1, 255, 1, 0, 255], Some("255")),
        other => {
            let base = other as usize as f32 * 100.0;
            geotiff_f32(
                FINE,
                &[base, base + 1.0, NODATA, base + 3.0, base + 4.0, base + 5.0],
                Some("-9999"),
            )
        }
    }
}

/// Writes a miniature Bedmap2 archive holding every catalog member.
pub fn bedmap2_archive(dir: &Path) -> Utf8PathBuf {
    let path = dir.join(BEDMAP2_ARCHIVE);
    let file = File::create(&path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    writer
        .add_directory(format!("{ARCHIVE_MEMBER_DIR}/"), options)
        .unwrap();
    for entry in catalog::entries() {
        writer.start_file(entry.member_path(), options).unwrap();
        writer.write_all(&member_bytes(entry.dataset)).unwrap();
    }
    writer.finish().unwrap();
    Utf8PathBuf::from_path_buf(path).unwrap()
}

/// Bitwise equality that treats NaN cells as equal.
pub fn same_values(a: &ndarray::Array2<f32>, b: &ndarray::Array2<f32>) -> bool {
    a.dim() == b.dim() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
}
