use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use pivotal_solver::{ConstraintOp, Model, SolveError, Solver, Term};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pivotal")]
#[command(about = "Solve small linear programs with the tableau simplex method", long_about = None)]
struct Cli {
    /// Log solver progress (-v for pivots, -vv for every tableau)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a model file and output the AST
    Parse {
        /// The file to parse
        file: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
    /// Check a model file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
    /// Solve a model and output the optimal solution
    Solve {
        /// Model file, either the text format or JSON (*.json)
        file: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
        /// Give up after this many pivots
        #[arg(long, default_value_t = Solver::default().max_iterations())]
        max_iterations: usize,
        /// Tolerance for floating point comparisons
        #[arg(long, default_value_t = Solver::default().tolerance())]
        tolerance: f64,
        /// Print the final tableau
        #[arg(short, long)]
        tableau: bool,
    },
    /// Solve the built-in three variable example
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logger(cli.verbose) {
        eprintln!("Error installing logger: {}", e);
    }

    match cli.command {
        Commands::Parse { file, format } => {
            let source = read_source(&file);
            match pivotal_lang::Parser::parse(&source) {
                Ok(program) => match format {
                    Format::Json => print_json(&program),
                    Format::Pretty => println!("{:#?}", program),
                },
                Err(e) => {
                    eprintln!("Parse error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Check { file } => {
            let model = load_model(&file);
            if let Err(e) = model.validate() {
                eprintln!("✗ {} has errors:", file.display());
                eprintln!("  {}", e);
                std::process::exit(1);
            }
            println!("✓ {} is valid", file.display());
            println!("  {} variables", model.num_variables());
            println!("  {} constraints", model.num_constraints());
            println!("  {} objective terms", model.objective().len());
        }
        Commands::Solve {
            file,
            format,
            max_iterations,
            tolerance,
            tableau,
        } => {
            let model = load_model(&file);
            let solver = Solver::new()
                .with_max_iterations(max_iterations)
                .with_tolerance(tolerance);
            solve_and_report(&model, &solver, format, tableau);
        }
        Commands::Demo => {
            solve_and_report(&demo_model(), &Solver::new(), Format::Pretty, true);
        }
    }
}

fn setup_logger(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{:5} | {}", record.level(), message))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}

fn read_source(file: &Path) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_model(file: &Path) -> Model {
    let source = read_source(file);

    if file.extension().is_some_and(|ext| ext == "json") {
        return match serde_json::from_str(&source) {
            Ok(model) => model,
            Err(e) => {
                eprintln!("Invalid JSON model: {}", e);
                std::process::exit(1);
            }
        };
    }

    match pivotal_lang::compile_source(&source) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Compile error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            std::process::exit(1);
        }
    }
}

fn solve_and_report(model: &Model, solver: &Solver, format: Format, show_tableau: bool) {
    if format == Format::Pretty {
        println!("{}", model);
    }

    let (solution, final_tableau) = match solver.solve_traced(model) {
        Ok(result) => result,
        Err(e) => {
            match e {
                SolveError::Unbounded { .. } => println!("Status: UNBOUNDED"),
                SolveError::InvalidModel(_) => println!("Status: INVALID MODEL"),
                SolveError::IterationLimitExceeded { .. } => println!("Status: ITERATION LIMIT"),
                SolveError::InvalidConfig { .. } => println!("Status: INVALID CONFIG"),
                SolveError::InvariantViolation(_) => println!("Status: ERROR"),
            }
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let violations = model.violations(&solution, solver.tolerance());
    for v in &violations {
        log::warn!("constraint {} violated: {}", v.constraint, v.description);
    }

    match format {
        Format::Json => print_json(&solution),
        Format::Pretty => {
            println!("Status: OPTIMAL");
            println!("Objective: {}", solution.objective_value);
            println!("Pivots: {}", solution.iterations);
            println!();
            println!("Solution:");
            for (name, value) in solution.iter() {
                println!("  {:20} {:>12.6}", name, value);
            }
            if show_tableau {
                println!();
                println!("Final tableau:");
                print!("{}", final_tableau);
            }
        }
    }

    if !violations.is_empty() {
        std::process::exit(1);
    }
}

/// x, y, z sharing two resources
fn demo_model() -> Model {
    let mut model = Model::new();
    model.add_variable("x");
    model.add_variable("y");
    model.add_variable("z");

    model.add_constraint(
        vec![Term::new(4.0, "x"), Term::new(2.0, "y"), Term::new(1.0, "z")],
        ConstraintOp::Le,
        10.0,
    );
    model.add_constraint(
        vec![Term::new(2.0, "x"), Term::new(5.0, "y"), Term::new(3.0, "z")],
        ConstraintOp::Le,
        15.0,
    );

    model.set_objective(vec![Term::new(2.0, "x"), Term::new(3.0, "y"), Term::new(4.0, "z")]);
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_solve_arguments() {
        let cli = Cli::try_parse_from([
            "pivotal",
            "-vv",
            "solve",
            "model.lp",
            "--format",
            "json",
            "--max-iterations",
            "50",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Solve {
                file,
                format,
                max_iterations,
                tableau,
                ..
            } => {
                assert_eq!(file, PathBuf::from("model.lp"));
                assert_eq!(format, Format::Json);
                assert_eq!(max_iterations, 50);
                assert!(!tableau);
            }
            _ => panic!("Expected solve"),
        }
    }

    #[test]
    fn test_demo_model_solves() {
        let model = demo_model();
        let solution = model.solve().unwrap();
        assert!(model.violations(&solution, 1e-9).is_empty());
        assert!((solution.objective_value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_model_round_trip() {
        let json = serde_json::to_string(&demo_model()).unwrap();
        assert!(json.contains("\"op\":\"le\""));
        let model: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(model, demo_model());
    }
}
