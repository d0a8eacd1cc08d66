//! Derives the plan report from a solved assignment.
//!
//! The analyzer only consumes reportable solutions (optimal or feasible);
//! any other status is a terminal "no solution" outcome. Spoilage figures
//! are recomputed from the assignment rather than read off the leftover
//! variables: the report's `used` sums over all consumers of a perishable
//! material, while the model's leftover equality is scoped to perishable
//! consumers. The reported spoilage cost applies the flat penalty rate to
//! total leftover units; the objective's penalty weighted each material by
//! its own unit cost. Both asymmetries are deliberate and must stay.

use prodplan_solver::{Solution, SolutionStatus};
use serde::Serialize;
use thiserror::Error;

use crate::builder::{PlanConfig, PlanModel};
use crate::catalog::{ProductCatalog, ResourceCatalog};

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("no solution: solver finished with status {0:?}")]
    NoSolution(SolutionStatus),
    #[error("material {0} missing from resource catalog")]
    UnknownMaterial(String),
}

/// Per-product plan line.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPlan {
    pub variable: String,
    pub name: String,
    pub quantity: f64,
    pub profit: f64,
    pub demand: u32,
    pub unused: f64,
    pub unused_pct: f64,
}

/// Spoilage line for one perishable material.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialSpoilage {
    pub material: String,
    pub available: f64,
    pub used: f64,
    pub leftover: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpoilageSummary {
    pub materials: Vec<MaterialSpoilage>,
    pub total_spoilage: f64,
    pub spoilage_cost: f64,
    pub extended_profit: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub status: SolutionStatus,
    pub products: Vec<ProductPlan>,
    pub total_profit: f64,
    pub spoilage: Option<SpoilageSummary>,
}

pub fn analyze(
    products: &ProductCatalog,
    resources: &ResourceCatalog,
    model: &PlanModel,
    solution: &Solution,
    config: &PlanConfig,
) -> Result<PlanReport, AnalyzeError> {
    if !solution.status.is_reportable() {
        return Err(AnalyzeError::NoSolution(solution.status));
    }

    let items = products.products();
    let mut rows = Vec::with_capacity(items.len());
    let mut total_profit = 0.0;
    for (i, p) in items.iter().enumerate() {
        let column = model.product_columns[i];
        let quantity = solution.values[column];
        let profit = quantity * p.profit;
        let unused = f64::from(p.demand) - quantity;
        let unused_pct = if p.demand > 0 {
            unused / f64::from(p.demand) * 100.0
        } else {
            0.0
        };
        total_profit += profit;
        rows.push(ProductPlan {
            variable: model.problem.variables[column].clone(),
            name: p.name.clone(),
            quantity,
            profit,
            demand: p.demand,
            unused,
            unused_pct,
        });
    }

    let spoilage = if config.extended {
        let mut materials = Vec::with_capacity(model.leftover_columns.len());
        let mut total_spoilage = 0.0;
        for (material, _) in &model.leftover_columns {
            let available = resources
                .material_available(material)
                .ok_or_else(|| AnalyzeError::UnknownMaterial(material.clone()))?;
            let used: f64 = items
                .iter()
                .enumerate()
                .filter(|(_, p)| p.material == *material)
                .map(|(i, p)| solution.values[model.product_columns[i]] * p.material_qty)
                .sum();
            let leftover = available - used;
            total_spoilage += leftover;
            materials.push(MaterialSpoilage {
                material: material.clone(),
                available,
                used,
                leftover,
            });
        }
        let spoilage_cost = total_spoilage * config.penalty_rate;
        Some(SpoilageSummary {
            materials,
            total_spoilage,
            spoilage_cost,
            extended_profit: total_profit - spoilage_cost,
        })
    } else {
        None
    };

    Ok(PlanReport {
        status: solution.status,
        products: rows,
        total_profit,
        spoilage,
    })
}
