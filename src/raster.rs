use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::error::RockhoundError;

const GEO_KEY_RASTER_TYPE: u32 = 1025;
const GEO_KEY_GEOGRAPHIC_TYPE: u32 = 2048;
const GEO_KEY_PROJECTED_CS_TYPE: u32 = 3072;
const RASTER_PIXEL_IS_POINT: u32 = 2;
const USER_DEFINED: u32 = 32767;

pub trait RasterDecoder {
    fn open(&self, path: &Path) -> Result<LabeledArray, RockhoundError>;
}

/// `values` is indexed `[row, column]`, so `values.dim() == (y.len(), x.len())`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArray {
    pub name: Option<String>,
    pub values: Array2<f32>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub nodata: Option<f64>,
    pub attrs: BTreeMap<String, String>,
}

impl LabeledArray {
    pub fn new(values: Array2<f32>, x: Vec<f64>, y: Vec<f64>) -> Result<Self, RockhoundError> {
        let (rows, cols) = values.dim();
        if rows != y.len() || cols != x.len() {
            return Err(RockhoundError::UnsupportedRaster(format!(
                "grid of {rows}x{cols} cells does not match {} y and {} x coordinates",
                y.len(),
                x.len()
            )));
        }
        Ok(Self {
            name: None,
            values,
            x,
            y,
            nodata: None,
            attrs: BTreeMap::new(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Returns how many cells were replaced with NaN.
    pub fn mask_nodata(&mut self) -> usize {
        let Some(nodata) = self.nodata else {
            return 0;
        };
        let sentinel = nodata as f32;
        if sentinel.is_nan() {
            return 0;
        }
        let mut replaced = 0usize;
        self.values.mapv_inplace(|value| {
            if value == sentinel {
                replaced += 1;
                f32::NAN
            } else {
                value
            }
        });
        replaced
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffDecoder;

impl GeoTiffDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode<R: Read + Seek>(&self, reader: R, path: &Path) -> Result<LabeledArray, RockhoundError> {
        let decode_err = |err: tiff::TiffError| RockhoundError::RasterDecode {
            path: path.to_path_buf(),
            message: err.to_string(),
        };

        // Bedmap2 grids are 6667 x 6667 float32 cells, well above the default limits.
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024;
        limits.intermediate_buffer_size = 1024 * 1024 * 1024;
        limits.ifd_value_size = 64 * 1024 * 1024;
        let mut decoder = Decoder::new(reader).map_err(decode_err)?.with_limits(limits);

        let (width, height) = decoder.dimensions().map_err(decode_err)?;
        let samples = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1);
        if samples != 1 {
            return Err(RockhoundError::UnsupportedRaster(format!(
                "{} has {samples} samples per pixel, expected a single band",
                path.display()
            )));
        }

        let geo_keys = read_geo_keys(&mut decoder);
        let pixel_is_point = geo_keys.get(&GEO_KEY_RASTER_TYPE) == Some(&RASTER_PIXEL_IS_POINT);
        let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok();
        let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok();
        let coordinates = match (tiepoint, scale) {
            (Some(tiepoint), Some(scale)) => {
                pixel_coordinates(&tiepoint, &scale, width, height, pixel_is_point)
            }
            _ => None,
        };
        let (x, y) = match coordinates {
            Some(coordinates) => coordinates,
            None => {
                warn!(path = %path.display(), "raster has no georeferencing, using pixel indices");
                (
                    (0..width).map(f64::from).collect(),
                    (0..height).map(f64::from).collect(),
                )
            }
        };
        let nodata = read_nodata(&mut decoder);

        let data = read_values(&mut decoder).map_err(decode_err)?;
        let values = Array2::from_shape_vec((height as usize, width as usize), data).map_err(
            |err| RockhoundError::RasterDecode {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
        )?;

        let mut array = LabeledArray::new(values, x, y)?.with_nodata(nodata);
        if let Some(epsg) = epsg_code(&geo_keys) {
            array = array.with_attr("crs", format!("EPSG:{epsg}"));
        }
        if let Some(nodata) = nodata {
            array = array.with_attr("nodata", nodata.to_string());
        }
        debug!(
            path = %path.display(),
            width,
            height,
            nodata = ?nodata,
            "decoded raster"
        );
        Ok(array)
    }
}

impl RasterDecoder for GeoTiffDecoder {
    fn open(&self, path: &Path) -> Result<LabeledArray, RockhoundError> {
        let file = File::open(path).map_err(|err| {
            RockhoundError::Filesystem(format!("open raster {}: {err}", path.display()))
        })?;
        self.decode(BufReader::new(file), path)
    }
}

// Rows run from the tiepoint southwards, so y decreases along the grid.
pub(crate) fn pixel_coordinates(
    tiepoint: &[f64],
    scale: &[f64],
    width: u32,
    height: u32,
    pixel_is_point: bool,
) -> Option<(Vec<f64>, Vec<f64>)> {
    if tiepoint.len() < 6 || scale.len() < 2 {
        return None;
    }
    let (scale_x, scale_y) = (scale[0], scale[1]);
    let origin_x = tiepoint[3] - tiepoint[0] * scale_x;
    let origin_y = tiepoint[4] + tiepoint[1] * scale_y;
    let offset = if pixel_is_point { 0.0 } else { 0.5 };
    let x = (0..width)
        .map(|col| origin_x + (f64::from(col) + offset) * scale_x)
        .collect();
    let y = (0..height)
        .map(|row| origin_y - (f64::from(row) + offset) * scale_y)
        .collect();
    Some((x, y))
}

fn read_values<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>, tiff::TiffError> {
    let result = decoder.read_image()?;
    Ok(match result {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    })
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let raw = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()?;
    parse_nodata(&raw)
}

pub fn parse_nodata(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_matches(char::from(0)).trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" => None,
        "nan" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

fn read_geo_keys<R: Read + Seek>(decoder: &mut Decoder<R>) -> BTreeMap<u32, u32> {
    decoder
        .get_tag_u32_vec(Tag::GeoKeyDirectoryTag)
        .map(|directory| parse_geo_keys(&directory))
        .unwrap_or_default()
}

pub fn parse_geo_keys(directory: &[u32]) -> BTreeMap<u32, u32> {
    let mut keys = BTreeMap::new();
    if directory.len() < 4 {
        return keys;
    }
    let count = directory[3] as usize;
    for entry in directory[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        // Location 0 means the value is stored inline.
        if location == 0 {
            keys.insert(key, value);
        }
    }
    keys
}

fn epsg_code(geo_keys: &BTreeMap<u32, u32>) -> Option<u32> {
    [GEO_KEY_PROJECTED_CS_TYPE, GEO_KEY_GEOGRAPHIC_TYPE]
        .iter()
        .filter_map(|key| geo_keys.get(key).copied())
        .find(|code| *code != 0 && *code != USER_DEFINED)
}
