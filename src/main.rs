use anyhow::{Context, Result};
use sprint_planner::{config, domain, loader, optimizer, planner, telemetry};
use config::{Config, OutputFormat};
use domain::PlanningProblem;
use optimizer::MilpSolver;
use planner::SprintPlanner;
use telemetry::init_tracing;
use tracing::info;

fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;

    let input = match &cfg.problem.path {
        Some(path) => {
            info!(path = %path.display(), "loading planning problem");
            loader::from_path(path)?
        }
        None => {
            info!("no problem path configured, using reference backlog");
            loader::reference_backlog()?
        }
    };
    let problem = PlanningProblem::new(input).context("planning problem rejected")?;

    let solver = MilpSolver::new(cfg.solver.time_limit());
    let planner = SprintPlanner::new(Box::new(solver))
        .with_objective_tolerance(cfg.solver.objective_tolerance);

    let report = planner.plan(&problem).context("sprint planning failed")?;

    match cfg.output.format {
        OutputFormat::Text => println!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
