use std::io::{self, Write};

use serde::Serialize;

use crate::catalog::CatalogEntry;
use crate::dataset::DatasetSummary;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveResult {
    pub archive: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_catalog(entries: &[CatalogEntry]) -> io::Result<()> {
        Self::print_json(&entries)
    }

    pub fn print_archive(result: &ArchiveResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_summary(summary: &DatasetSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_catalog(entries: &[CatalogEntry]) -> io::Result<()> {
        let mut stdout = io::stdout();
        for entry in entries {
            let units = if entry.units.is_empty() { "-" } else { entry.units };
            writeln!(
                stdout,
                "{:<30} {:<42} {:<7} {}",
                entry.name(),
                entry.file_name,
                units,
                entry.description
            )?;
        }
        Ok(())
    }

    pub fn print_archive(result: &ArchiveResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", result.path)?;
        for member in result.members.iter().flatten() {
            writeln!(stdout, "  {member}")?;
        }
        Ok(())
    }

    pub fn print_summary(summary: &DatasetSummary) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "grid: {} x {} (y, x)", summary.y_size, summary.x_size)?;
        if let (Some(x), Some(y)) = (summary.x_range, summary.y_range) {
            writeln!(stdout, "x: {} .. {}", x[0], x[1])?;
            writeln!(stdout, "y: {} .. {}", y[0], y[1])?;
        }
        for var in &summary.variables {
            let units = var.units.as_deref().unwrap_or("-");
            match (var.min, var.max, var.mean) {
                (Some(min), Some(max), Some(mean)) => writeln!(
                    stdout,
                    "{:<30} valid={:<10} missing={:<10} min={min:.2} max={max:.2} mean={mean:.2} [{units}]",
                    var.name, var.valid, var.missing
                )?,
                _ => writeln!(
                    stdout,
                    "{:<30} valid=0 missing={} [{units}]",
                    var.name, var.missing
                )?,
            }
        }
        Ok(())
    }
}
