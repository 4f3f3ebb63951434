pub mod catalog;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod fs_util;
pub mod output;
pub mod raster;
pub mod registry;
pub mod store;

pub use dataset::CompositeDataset;
pub use domain::{Bedmap2Dataset, DatasetSelection};
pub use error::RockhoundError;
pub use fetcher::{DatasetFetcher, FetchOutcome, fetch_bedmap2};
