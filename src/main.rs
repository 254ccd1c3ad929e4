use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{eyre, Result};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Normal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spline_orbitals::io::{build_evaluator, read_config, show_info, write_input, ListConfig};
use spline_orbitals::EvalMode;

#[derive(Parser, Debug)]
#[command(version, about = "Evaluate B-spline molecular orbitals at electron positions", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "orbitals.yml")]
    config: PathBuf,

    /// Orbital list to evaluate (default: the first list)
    #[arg(short, long)]
    list: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Mode::Value)]
    mode: Mode,

    /// Random electron positions to draw when the config lists none
    #[arg(long, default_value_t = 1)]
    random: usize,

    #[arg(long)]
    seed: Option<u64>,

    /// Print the orbital summary and the orbital section as read
    #[arg(long)]
    info: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Value,
    Laplacian,
    Hessian,
}

impl From<Mode> for EvalMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Value => EvalMode::Value,
            Mode::Laplacian => EvalMode::Laplacian,
            Mode::Hessian => EvalMode::Hessian,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("Reading configuration from {}", args.config.display());
    let mut config = read_config(&args.config)?;
    if config.orbitals.lists.is_empty() {
        config.orbitals.lists.push(ListConfig {
            name: "all".to_string(),
            orbitals: (0..config.orbitals.nmo).collect(),
        });
    }

    let base_dir = args.config.parent().unwrap_or(Path::new("."));
    let evaluator = build_evaluator(&config, base_dir)?;

    if args.info {
        print!("{}", show_info(&config.orbitals, &evaluator));
        print!("{}", write_input(&config.orbitals)?);
    }

    let list = match &args.list {
        Some(name) => evaluator
            .list_id(name)
            .ok_or_else(|| eyre!("no orbital list named '{}'", name))?,
        None => evaluator
            .lists()
            .iter()
            .next()
            .map(|(id, _)| id)
            .ok_or_else(|| eyre!("no orbital lists configured"))?,
    };

    let electrons: Vec<Vector3<f64>> = if config.electrons.is_empty() {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let dist = Normal::new(0.0, 1.0)?;
        (0..args.random)
            .map(|_| Vector3::<f64>::from_distribution(&dist, &mut rng))
            .collect()
    } else {
        config.electrons.iter().map(|&r| Vector3::from(r)).collect()
    };

    let mode = EvalMode::from(args.mode);
    let mut table = evaluator.table(list, mode)?;
    let indices = evaluator.lists().get(list).map(|l| l.indices().to_vec()).unwrap_or_default();
    for (e, r) in electrons.iter().enumerate() {
        evaluator.evaluate(r, list, mode, &mut table)?;
        println!("electron {} at ({:.6}, {:.6}, {:.6})", e, r.x, r.y, r.z);
        for (row, mo) in indices.iter().enumerate() {
            let columns: Vec<String> = table.row(row).iter().map(|x| format!("{:>14.8e}", x)).collect();
            println!("  mo {:>5} {}", mo, columns.join(" "));
        }
    }
    Ok(())
}
