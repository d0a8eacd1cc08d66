//! CSV ingestion for the planning tables.
//!
//! Four tables feed a planning run: products, material limits, line
//! capacities, and the optional perishability extension keyed by product
//! name. Keys are normalized as they enter the catalogs.

use std::fs::File;
use std::io;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{Product, ProductCatalog, ResourceCatalog, normalize_key};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed row in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("invalid perishable flag for {product}: {value:?} (expected yes or no)")]
    InvalidPerishableFlag { product: String, value: String },
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    product_id: u32,
    name: String,
    profit: f64,
    material: String,
    material_qty: f64,
    time_per_unit: f64,
    line: String,
    demand: u32,
}

#[derive(Debug, Deserialize)]
struct PerishabilityRow {
    name: String,
    perishable: String,
    cost: f64,
}

#[derive(Debug, Deserialize)]
struct MaterialRow {
    material: String,
    available: f64,
}

#[derive(Debug, Deserialize)]
struct LineRow {
    line: String,
    capacity_minutes: f64,
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn csv_error(path: &Path, source: csv::Error) -> LoadError {
    LoadError::Csv {
        path: path.display().to_string(),
        source,
    }
}

/// Load the product table
/// (`product_id,name,profit,material,material_qty,time_per_unit,line,demand`).
pub fn load_products(path: impl AsRef<Path>) -> Result<ProductCatalog, LoadError> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let mut catalog = ProductCatalog::new();
    for row in reader.deserialize() {
        let row: ProductRow = row.map_err(|source| csv_error(path, source))?;
        catalog.add(Product::new(
            row.product_id,
            row.name,
            row.profit,
            &row.material,
            row.material_qty,
            row.time_per_unit,
            &row.line,
            row.demand,
        ));
    }
    debug!(products = catalog.len(), path = %path.display(), "loaded product table");
    Ok(catalog)
}

/// Merge the perishability extension table (`name,perishable,cost`) into an
/// already loaded product catalog. Rows naming unknown products are skipped;
/// a flag other than yes/no is rejected.
pub fn apply_perishability(
    catalog: &mut ProductCatalog,
    path: impl AsRef<Path>,
) -> Result<(), LoadError> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    for row in reader.deserialize() {
        let row: PerishabilityRow = row.map_err(|source| csv_error(path, source))?;
        match normalize_key(&row.perishable).as_str() {
            "yes" => {
                if let Some(product) = catalog.get_by_name_mut(&row.name) {
                    product.mark_perishable(row.cost);
                }
            }
            "no" => {}
            _ => {
                return Err(LoadError::InvalidPerishableFlag {
                    product: row.name,
                    value: row.perishable,
                });
            }
        }
    }
    Ok(())
}

/// Load material availability (`material,available`) and line capacity
/// (`line,capacity_minutes`) into one resource catalog.
pub fn load_resources(
    materials_path: impl AsRef<Path>,
    lines_path: impl AsRef<Path>,
) -> Result<ResourceCatalog, LoadError> {
    let mut resources = ResourceCatalog::new();

    let path = materials_path.as_ref();
    let mut reader = open_reader(path)?;
    for row in reader.deserialize() {
        let row: MaterialRow = row.map_err(|source| csv_error(path, source))?;
        resources.add_material(&row.material, row.available);
    }

    let path = lines_path.as_ref();
    let mut reader = open_reader(path)?;
    for row in reader.deserialize() {
        let row: LineRow = row.map_err(|source| csv_error(path, source))?;
        resources.add_line(&row.line, row.capacity_minutes);
    }

    debug!(
        materials = resources.material_count(),
        lines = resources.line_count(),
        "loaded resource tables"
    );
    Ok(resources)
}
