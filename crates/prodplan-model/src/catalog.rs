use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

/// Normalize a resource or lookup key: trimmed, lower-case.
///
/// Applied once when data enters a catalog; all later comparisons are exact.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("duplicate product id: {0}")]
    DuplicateProductId(u32),
    #[error("product {product} references unknown material: {material}")]
    UnknownMaterial { product: String, material: String },
    #[error("product {product} references unknown line: {line}")]
    UnknownLine { product: String, line: String },
}

/// A manufactured product and its per-unit resource consumption.
///
/// `material` and `line` are stored normalized so they can be matched
/// against the resource catalog without per-site normalization.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub profit: f64,
    pub material: String,
    pub material_qty: f64,
    pub time_per_unit: f64,
    pub line: String,
    pub demand: u32,
    pub perishable: bool,
    pub spoilage_unit_cost: Option<f64>,
}

impl Product {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u32,
        name: impl Into<String>,
        profit: f64,
        material: &str,
        material_qty: f64,
        time_per_unit: f64,
        line: &str,
        demand: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            profit,
            material: normalize_key(material),
            material_qty,
            time_per_unit,
            line: normalize_key(line),
            demand,
            perishable: false,
            spoilage_unit_cost: None,
        }
    }

    /// Flag the product as perishable with the given spoilage unit cost.
    pub fn mark_perishable(&mut self, unit_cost: f64) {
        self.perishable = true;
        self.spoilage_unit_cost = Some(unit_cost);
    }
}

/// Shared resource bounds: material availability and line time capacity.
///
/// Keys are normalized on insert; iteration order is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    materials: BTreeMap<String, f64>,
    lines: BTreeMap<String, f64>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: &str, available: f64) {
        self.materials.insert(normalize_key(material), available);
    }

    pub fn add_line(&mut self, line: &str, capacity_minutes: f64) {
        self.lines.insert(normalize_key(line), capacity_minutes);
    }

    /// Availability for a normalized material key.
    pub fn material_available(&self, material: &str) -> Option<f64> {
        self.materials.get(material).copied()
    }

    /// Capacity in minutes for a normalized line key.
    pub fn line_capacity(&self, line: &str) -> Option<f64> {
        self.lines.get(line).copied()
    }

    pub fn materials(&self) -> impl Iterator<Item = (&str, f64)> {
        self.materials.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn lines(&self) -> impl Iterator<Item = (&str, f64)> {
        self.lines.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// The set of products under planning, in load order.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Find a product by name, compared under key normalization.
    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Product> {
        let wanted = normalize_key(name);
        self.products
            .iter_mut()
            .find(|p| normalize_key(&p.name) == wanted)
    }

    /// Check catalog invariants: ids are unique and every referenced
    /// material and line exists in the resource catalog.
    pub fn validate(&self, resources: &ResourceCatalog) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for p in &self.products {
            if !seen.insert(p.id) {
                return Err(CatalogError::DuplicateProductId(p.id));
            }
            if resources.material_available(&p.material).is_none() {
                return Err(CatalogError::UnknownMaterial {
                    product: p.name.clone(),
                    material: p.material.clone(),
                });
            }
            if resources.line_capacity(&p.line).is_none() {
                return Err(CatalogError::UnknownLine {
                    product: p.name.clone(),
                    line: p.line.clone(),
                });
            }
        }
        Ok(())
    }
}
