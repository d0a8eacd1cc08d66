use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution as _, SolverModel, constraint,
    default_solver, variable,
};
use tracing::{debug, error};

use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{Solution, SolutionStatus};

/// Adapter over the backing LP solver.
///
/// The solver itself is opaque: it receives a linear objective and a set of
/// linear (in)equality constraints over non-negative continuous variables,
/// and returns an optimal assignment or a terminal status. This call blocks
/// until the solve finishes; there is no retry or cancellation.
#[derive(Debug, Default)]
pub struct Solver;

impl Solver {
    pub fn new() -> Self {
        Self
    }

    pub fn solve(&self, problem: &LpProblem) -> Solution {
        let mut vars = ProblemVariables::new();
        let handles: Vec<_> = problem
            .variables
            .iter()
            .map(|name| vars.add(variable().min(0.0).name(name.clone())))
            .collect();

        let mut objective = Expression::default();
        for (handle, coef) in handles.iter().zip(&problem.objective.coefficients) {
            objective += *handle * *coef;
        }

        let unsolved = if problem.objective.maximize {
            vars.maximise(objective)
        } else {
            vars.minimise(objective)
        };

        let mut model = unsolved.using(default_solver);
        for c in &problem.constraints {
            let mut lhs = Expression::default();
            let mut terms = 0usize;
            for (handle, coef) in handles.iter().zip(&c.coefficients) {
                if *coef != 0.0 {
                    lhs += *handle * *coef;
                    terms += 1;
                }
            }
            if terms == 0 {
                // constraints over an empty variable set reduce to `0 op rhs`
                let holds = match c.op {
                    ConstraintOp::Le => 0.0 <= c.rhs,
                    ConstraintOp::Ge => 0.0 >= c.rhs,
                    ConstraintOp::Eq => c.rhs == 0.0,
                };
                if !holds {
                    return Solution::infeasible();
                }
                continue;
            }
            model = match c.op {
                ConstraintOp::Le => model.with(constraint!(lhs <= c.rhs)),
                ConstraintOp::Ge => model.with(constraint!(lhs >= c.rhs)),
                ConstraintOp::Eq => model.with(constraint!(lhs == c.rhs)),
            };
        }

        debug!(
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "solving linear program"
        );

        match model.solve() {
            Ok(solved) => {
                let values: Vec<f64> = handles.iter().map(|v| solved.value(*v)).collect();
                let objective_value = problem
                    .objective
                    .coefficients
                    .iter()
                    .zip(&values)
                    .map(|(c, v)| c * v)
                    .sum();
                Solution {
                    status: SolutionStatus::Optimal,
                    values,
                    objective_value,
                }
            }
            Err(ResolutionError::Infeasible) => Solution::infeasible(),
            Err(ResolutionError::Unbounded) => Solution::unbounded(),
            Err(err) => {
                error!("solver failure: {err}");
                Solution::error()
            }
        }
    }
}
