//! Translates the product and resource catalogs into an LP model.
//!
//! One parameterized builder covers both formulations: the base profit
//! maximization, and the extended variant with spoilage economics for
//! perishable products. Each call constructs a fresh problem; two builds
//! never share variables or constraints.

use prodplan_solver::{ConstraintOp, LpProblem};
use thiserror::Error;
use tracing::debug;

use crate::catalog::{CatalogError, ProductCatalog, ResourceCatalog};

/// Fraction of each leftover unit's spoilage cost charged in the objective.
pub const SPOILAGE_PENALTY_RATE: f64 = 0.05;

/// Minimum production for a perishable product, as a fraction of its demand.
pub const MIN_PERISHABLE_RATIO: f64 = 0.05;

/// Options for one model build.
#[derive(Debug, Clone, Copy)]
pub struct PlanConfig {
    /// Include spoilage terms and perishable production floors
    pub extended: bool,
    /// Weight on the spoilage penalty in the objective, and the flat rate
    /// applied to total leftover units in the report
    pub penalty_rate: f64,
    /// Production floor ratio for perishable products
    pub min_perishable_ratio: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            extended: false,
            penalty_rate: SPOILAGE_PENALTY_RATE,
            min_perishable_ratio: MIN_PERISHABLE_RATIO,
        }
    }
}

impl PlanConfig {
    pub fn base() -> Self {
        Self::default()
    }

    pub fn extended() -> Self {
        Self {
            extended: true,
            ..Self::default()
        }
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("perishable product {0} has no spoilage unit cost")]
    MissingSpoilageCost(String),
}

/// A built model plus the variable layout needed to read its solution.
#[derive(Debug, Clone)]
pub struct PlanModel {
    pub problem: LpProblem,
    /// Column of each product's decision variable, in catalog order
    pub product_columns: Vec<usize>,
    /// Perishable material key and the column of its leftover variable
    pub leftover_columns: Vec<(String, usize)>,
}

struct PerishableMaterial {
    key: String,
    column: usize,
    available: f64,
    unit_cost: f64,
}

/// Build the production planning LP from the catalogs.
///
/// Decision variables are one `x{id}` per product, continuous over
/// `[0, +inf)`; the demand ceiling is an explicit constraint so it can be
/// relaxed independently of the variable domain. The extended variant adds
/// one `leftover_{material}` variable per material consumed by a perishable
/// product.
pub fn build_model(
    products: &ProductCatalog,
    resources: &ResourceCatalog,
    config: &PlanConfig,
) -> Result<PlanModel, BuildError> {
    products.validate(resources)?;

    let items = products.products();
    let mut names: Vec<String> = items.iter().map(|p| format!("x{}", p.id)).collect();
    let product_columns: Vec<usize> = (0..items.len()).collect();

    // One leftover variable per perishable material. Several perishable
    // products may share a material; the highest spoilage unit cost wins.
    let mut perishable: Vec<PerishableMaterial> = Vec::new();
    if config.extended {
        for p in items.iter().filter(|p| p.perishable) {
            let unit_cost = p
                .spoilage_unit_cost
                .ok_or_else(|| BuildError::MissingSpoilageCost(p.name.clone()))?;
            if let Some(entry) = perishable.iter_mut().find(|m| m.key == p.material) {
                entry.unit_cost = entry.unit_cost.max(unit_cost);
            } else {
                let available = resources.material_available(&p.material).ok_or_else(|| {
                    CatalogError::UnknownMaterial {
                        product: p.name.clone(),
                        material: p.material.clone(),
                    }
                })?;
                perishable.push(PerishableMaterial {
                    key: p.material.clone(),
                    column: names.len(),
                    available,
                    unit_cost,
                });
                names.push(format!("leftover_{}", p.material));
            }
        }
    }

    let total_vars = names.len();
    let mut objective = vec![0.0; total_vars];
    for (i, p) in items.iter().enumerate() {
        objective[i] = p.profit;
    }
    for m in &perishable {
        objective[m.column] = -config.penalty_rate * m.unit_cost;
    }

    let mut lp = LpProblem::new(names);
    lp.set_objective(objective, true);

    // Shared material stock: all consumers of a material draw from one pool.
    // A material with no consumers still gets its (trivially true) constraint.
    for (material, available) in resources.materials() {
        let mut coeffs = vec![0.0; total_vars];
        for (i, p) in items.iter().enumerate() {
            if p.material == material {
                coeffs[i] = p.material_qty;
            }
        }
        lp.add_constraint(format!("material_{material}"), coeffs, ConstraintOp::Le, available);
    }

    // Line time budgets
    for (line, capacity) in resources.lines() {
        let mut coeffs = vec![0.0; total_vars];
        for (i, p) in items.iter().enumerate() {
            if p.line == line {
                coeffs[i] = p.time_per_unit;
            }
        }
        lp.add_constraint(format!("line_{line}"), coeffs, ConstraintOp::Le, capacity);
    }

    // Demand ceilings
    for (i, p) in items.iter().enumerate() {
        let mut coeffs = vec![0.0; total_vars];
        coeffs[i] = 1.0;
        lp.add_constraint(
            format!("demand_x{}", p.id),
            coeffs,
            ConstraintOp::Le,
            f64::from(p.demand),
        );
    }

    if config.extended {
        // Leftover definition: leftover[m] + perishable usage of m = available.
        // Only perishable consumers contribute here; the analyzer's spoilage
        // report sums over all consumers of the material.
        for m in &perishable {
            let mut coeffs = vec![0.0; total_vars];
            coeffs[m.column] = 1.0;
            for (i, p) in items.iter().enumerate() {
                if p.perishable && p.material == m.key {
                    coeffs[i] = p.material_qty;
                }
            }
            lp.add_constraint(format!("spoilage_{}", m.key), coeffs, ConstraintOp::Eq, m.available);
        }

        // Minimum production floor for perishable products
        for (i, p) in items.iter().enumerate() {
            if p.perishable {
                let mut coeffs = vec![0.0; total_vars];
                coeffs[i] = 1.0;
                lp.add_constraint(
                    format!("floor_x{}", p.id),
                    coeffs,
                    ConstraintOp::Ge,
                    config.min_perishable_ratio * f64::from(p.demand),
                );
            }
        }
    }

    debug!(
        variables = lp.num_variables(),
        constraints = lp.num_constraints(),
        extended = config.extended,
        "built production model"
    );

    let leftover_columns = perishable.into_iter().map(|m| (m.key, m.column)).collect();
    Ok(PlanModel {
        problem: lp,
        product_columns,
        leftover_columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use prodplan_solver::{SolutionStatus, Solver};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "expected {b}, got {a}");
    }

    /// One product, demand 100, profit 10/unit; material availability 50 at
    /// 1 unit each; line capacity 1000 at 1 minute each.
    fn single_product_catalogs() -> (ProductCatalog, ResourceCatalog) {
        let mut resources = ResourceCatalog::new();
        resources.add_material("milk", 50.0);
        resources.add_line("fill", 1000.0);

        let mut products = ProductCatalog::new();
        products.add(Product::new(1, "Milk", 10.0, "milk", 1.0, 1.0, "fill", 100));
        (products, resources)
    }

    #[test]
    fn test_base_model_shape() {
        let mut resources = ResourceCatalog::new();
        resources.add_material("milk", 100.0);
        resources.add_material("cream", 50.0);
        resources.add_line("fill", 500.0);
        resources.add_line("churn", 300.0);

        let mut products = ProductCatalog::new();
        products.add(Product::new(1, "Milk", 4.5, "milk", 1.0, 0.8, "fill", 100));
        products.add(Product::new(2, "Butter", 8.0, "cream", 0.3, 1.5, "churn", 50));

        let model = build_model(&products, &resources, &PlanConfig::base()).unwrap();
        let lp = &model.problem;

        assert_eq!(lp.num_variables(), 2);
        assert_eq!(lp.variables, vec!["x1", "x2"]);
        // 2 materials + 2 lines + 2 demand ceilings
        assert_eq!(lp.num_constraints(), 6);
        assert!(lp.objective.maximize);
        assert_eq!(lp.objective.coefficients, vec![4.5, 8.0]);

        let demand = lp.constraint("demand_x1").unwrap();
        assert_eq!(demand.op, ConstraintOp::Le);
        assert_close(demand.rhs, 100.0);
        assert_eq!(demand.coefficients, vec![1.0, 0.0]);

        let material = lp.constraint("material_cream").unwrap();
        assert_eq!(material.coefficients, vec![0.0, 0.3]);
        assert_close(material.rhs, 50.0);
    }

    #[test]
    fn test_material_binds_before_demand() {
        let (products, resources) = single_product_catalogs();
        let model = build_model(&products, &resources, &PlanConfig::base()).unwrap();

        let solution = Solver::new().solve(&model.problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_close(solution.values[0], 50.0);
        assert_close(solution.objective_value, 500.0);
    }

    #[test]
    fn test_zero_availability_forces_zero_production() {
        let mut resources = ResourceCatalog::new();
        resources.add_material("milk", 0.0);
        resources.add_line("fill", 1000.0);

        let mut products = ProductCatalog::new();
        products.add(Product::new(1, "Milk", 10.0, "milk", 2.0, 1.0, "fill", 100));

        let model = build_model(&products, &resources, &PlanConfig::base()).unwrap();
        let solution = Solver::new().solve(&model.problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_close(solution.values[0], 0.0);
    }

    #[test]
    fn test_orphan_resource_emits_trivial_constraint() {
        let (products, mut resources) = single_product_catalogs();
        resources.add_material("saffron", 5.0);
        resources.add_line("idle_line", 100.0);

        let model = build_model(&products, &resources, &PlanConfig::base()).unwrap();
        let lp = &model.problem;

        let orphan = lp.constraint("material_saffron").unwrap();
        assert!(orphan.coefficients.iter().all(|c| *c == 0.0));
        assert!(lp.constraint("line_idle_line").is_some());

        let solution = Solver::new().solve(lp);
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_close(solution.objective_value, 500.0);
    }

    #[test]
    fn test_extended_adds_leftover_and_floor() {
        let (mut products, resources) = single_product_catalogs();
        products.get_by_name_mut("Milk").unwrap().mark_perishable(2.0);

        let model = build_model(&products, &resources, &PlanConfig::extended()).unwrap();
        let lp = &model.problem;

        assert_eq!(lp.num_variables(), 2);
        assert_eq!(lp.variables[1], "leftover_milk");
        assert_eq!(model.leftover_columns, vec![("milk".to_string(), 1)]);

        // objective: profit on x, weighted penalty on leftover
        assert_close(lp.objective.coefficients[0], 10.0);
        assert_close(lp.objective.coefficients[1], -0.05 * 2.0);

        let floor = lp.constraint("floor_x1").unwrap();
        assert_eq!(floor.op, ConstraintOp::Ge);
        assert_close(floor.rhs, 5.0);

        let spoilage = lp.constraint("spoilage_milk").unwrap();
        assert_eq!(spoilage.op, ConstraintOp::Eq);
        assert_eq!(spoilage.coefficients, vec![1.0, 1.0]);
        assert_close(spoilage.rhs, 50.0);
    }

    #[test]
    fn test_shared_perishable_material_gets_one_leftover_variable() {
        let mut resources = ResourceCatalog::new();
        resources.add_material("milk", 100.0);
        resources.add_line("fill", 1000.0);

        let mut products = ProductCatalog::new();
        products.add(Product::new(1, "Whole", 4.0, "milk", 1.0, 1.0, "fill", 50));
        products.add(Product::new(2, "Skim", 3.0, "milk", 0.9, 1.0, "fill", 50));
        products.add(Product::new(3, "UHT", 2.0, "milk", 1.1, 1.0, "fill", 50));
        products.get_by_name_mut("Whole").unwrap().mark_perishable(2.0);
        products.get_by_name_mut("Skim").unwrap().mark_perishable(3.0);
        // UHT consumes milk but is not perishable

        let model = build_model(&products, &resources, &PlanConfig::extended()).unwrap();
        let lp = &model.problem;

        assert_eq!(model.leftover_columns.len(), 1);
        assert_eq!(lp.num_variables(), 4);
        // highest unit cost among perishable consumers wins
        assert_close(lp.objective.coefficients[3], -0.05 * 3.0);

        // only perishable consumers contribute to the leftover equality
        let spoilage = lp.constraint("spoilage_milk").unwrap();
        assert_eq!(spoilage.coefficients, vec![1.0, 0.9, 0.0, 1.0]);

        // but all consumers draw from the shared stock constraint
        let material = lp.constraint("material_milk").unwrap();
        assert_eq!(material.coefficients, vec![1.0, 0.9, 1.1, 0.0]);
    }

    #[test]
    fn test_perishable_scenario_still_caps_at_material() {
        let (mut products, resources) = single_product_catalogs();
        products.get_by_name_mut("Milk").unwrap().mark_perishable(2.0);

        let model = build_model(&products, &resources, &PlanConfig::extended()).unwrap();
        let solution = Solver::new().solve(&model.problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!(solution.values[0] >= 5.0 - 1e-6);
        assert_close(solution.values[0], 50.0);
        // everything available is consumed, so nothing is left to spoil
        assert_close(solution.values[1], 0.0);
    }

    #[test]
    fn test_floor_conflict_is_infeasible() {
        let mut resources = ResourceCatalog::new();
        resources.add_material("milk", 0.0);
        resources.add_line("fill", 1000.0);

        let mut products = ProductCatalog::new();
        products.add(Product::new(1, "Milk", 10.0, "milk", 1.0, 1.0, "fill", 100));
        products.get_by_name_mut("Milk").unwrap().mark_perishable(2.0);

        let model = build_model(&products, &resources, &PlanConfig::extended()).unwrap();
        let solution = Solver::new().solve(&model.problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn test_missing_spoilage_cost_is_rejected() {
        let (mut products, resources) = single_product_catalogs();
        products.get_by_name_mut("Milk").unwrap().perishable = true;

        let err = build_model(&products, &resources, &PlanConfig::extended()).unwrap_err();
        assert!(matches!(err, BuildError::MissingSpoilageCost(_)));
    }

    #[test]
    fn test_unknown_material_fails_fast() {
        let mut resources = ResourceCatalog::new();
        resources.add_line("fill", 1000.0);

        let mut products = ProductCatalog::new();
        products.add(Product::new(1, "Milk", 10.0, "milk", 1.0, 1.0, "fill", 100));

        let err = build_model(&products, &resources, &PlanConfig::base()).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Catalog(CatalogError::UnknownMaterial { .. })
        ));
    }

    #[test]
    fn test_base_and_extended_builds_are_independent() {
        let (mut products, resources) = single_product_catalogs();
        products.get_by_name_mut("Milk").unwrap().mark_perishable(2.0);

        let base = build_model(&products, &resources, &PlanConfig::base()).unwrap();
        let extended = build_model(&products, &resources, &PlanConfig::extended()).unwrap();

        assert_eq!(base.problem.num_variables(), 1);
        assert_eq!(extended.problem.num_variables(), 2);
        assert!(base.problem.constraint("floor_x1").is_none());
        assert!(extended.problem.constraint("floor_x1").is_some());
        assert!(base.leftover_columns.is_empty());
    }
}
