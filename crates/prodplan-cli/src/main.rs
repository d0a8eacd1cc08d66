use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use prodplan_model::{
    AnalyzeError, LoadError, PlanConfig, PlanReport, ProductCatalog, ResourceCatalog, analyze,
    apply_perishability, build_model, load_products, load_resources,
};
use prodplan_solver::Solver;

#[derive(Parser)]
#[command(name = "prodplan")]
#[command(about = "Production capacity planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the production plan for a data directory
    Solve {
        /// Directory with products.csv, material_limits.csv,
        /// line_capacity.csv and (with --extended) products_ext.csv
        data_dir: PathBuf,
        /// Include spoilage economics and perishable production floors
        #[arg(short, long)]
        extended: bool,
        /// Objective penalty rate on leftover perishable stock
        #[arg(long, default_value_t = prodplan_model::SPOILAGE_PENALTY_RATE)]
        penalty_rate: f64,
        /// Minimum perishable production as a fraction of demand
        #[arg(long, default_value_t = prodplan_model::MIN_PERISHABLE_RATIO)]
        min_ratio: f64,
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
    /// Validate the input tables without solving
    Check {
        /// Directory with the planning tables
        data_dir: PathBuf,
        /// Also load products_ext.csv
        #[arg(short, long)]
        extended: bool,
    },
}

fn load_inputs(dir: &Path, extended: bool) -> Result<(ProductCatalog, ResourceCatalog), LoadError> {
    let mut products = load_products(dir.join("products.csv"))?;
    if extended {
        apply_perishability(&mut products, dir.join("products_ext.csv"))?;
    }
    let resources = load_resources(dir.join("material_limits.csv"), dir.join("line_capacity.csv"))?;
    Ok((products, resources))
}

fn print_report(report: &PlanReport) {
    println!(
        "{:<10} {:<22} {:>12} {:>12} {:>10} {:>10} {:>10}",
        "Variable", "Product", "Optimal", "Profit", "Demand", "Unused", "Unused %"
    );
    for row in &report.products {
        println!(
            "{:<10} {:<22} {:>12.2} ${:>11.2} {:>10} {:>10.2} {:>9.2}%",
            row.variable, row.name, row.quantity, row.profit, row.demand, row.unused, row.unused_pct
        );
    }
    println!();
    println!(
        "{:<10} {:<22} {:>12} ${:>11.2}",
        "", "Total profit:", "", report.total_profit
    );

    if let Some(spoilage) = &report.spoilage {
        println!();
        println!("Perishable raw material spoilage:");
        println!(
            "{:<15} {:>12} {:>12} {:>20}",
            "Material", "Available", "Used", "Leftover (spoiled)"
        );
        println!("{}", "-".repeat(62));
        for m in &spoilage.materials {
            println!(
                "{:<15} {:>12.2} {:>12.2} {:>20.2}",
                m.material, m.available, m.used, m.leftover
            );
        }
        println!("{}", "-".repeat(62));
        println!("Total spoiled amount: {:.2} units", spoilage.total_spoilage);
        println!(
            "Extended profit after spoilage penalty: ${:.2}",
            spoilage.extended_profit
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            data_dir,
            extended,
            penalty_rate,
            min_ratio,
            format,
        } => {
            let (products, resources) = match load_inputs(&data_dir, extended) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("Error loading input: {e}");
                    std::process::exit(1);
                }
            };

            let config = PlanConfig {
                extended,
                penalty_rate,
                min_perishable_ratio: min_ratio,
            };

            let model = match build_model(&products, &resources, &config) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("Error building model: {e}");
                    std::process::exit(1);
                }
            };

            let solution = Solver::new().solve(&model.problem);

            match analyze(&products, &resources, &model, &solution, &config) {
                Ok(report) => {
                    if format == "json" {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&report)
                                .unwrap_or_else(|e| format!("Error serializing report: {e}"))
                        );
                    } else {
                        print_report(&report);
                    }
                }
                Err(AnalyzeError::NoSolution(status)) => {
                    println!("Status: {status:?}");
                    println!("No feasible or optimal solution found.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error analyzing solution: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Check { data_dir, extended } => {
            let (products, resources) = match load_inputs(&data_dir, extended) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("✗ {} has errors:", data_dir.display());
                    eprintln!("  {e}");
                    std::process::exit(1);
                }
            };

            match products.validate(&resources) {
                Ok(()) => {
                    let perishable = products.products().iter().filter(|p| p.perishable).count();
                    println!("✓ {} is valid", data_dir.display());
                    println!("  {} products ({} perishable)", products.len(), perishable);
                    println!("  {} materials", resources.material_count());
                    println!("  {} lines", resources.line_count());
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", data_dir.display());
                    eprintln!("  {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
