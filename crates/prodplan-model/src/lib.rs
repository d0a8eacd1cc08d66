pub mod analyzer;
pub mod builder;
pub mod catalog;
pub mod loader;

pub use analyzer::{AnalyzeError, MaterialSpoilage, PlanReport, ProductPlan, SpoilageSummary, analyze};
pub use builder::{
    BuildError, MIN_PERISHABLE_RATIO, PlanConfig, PlanModel, SPOILAGE_PENALTY_RATE, build_model,
};
pub use catalog::{CatalogError, Product, ProductCatalog, ResourceCatalog, normalize_key};
pub use loader::{LoadError, apply_perishability, load_products, load_resources};
