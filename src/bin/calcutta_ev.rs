use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use calcutta_core::coefficients::save_coefficients;
use calcutta_core::fit::{fit_coefficients, read_games_from_path};
use calcutta_core::{BracketEv, CoefficientSource, EngineConfig, EvEngine, RatingsTable, Round};

#[derive(Parser, Debug)]
#[command(name = "calcutta-ev")]
#[command(about = "Expected value of NCAA Calcutta auction slots")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score every slot of one tournament year
    Ev {
        /// Ratings CSV: year,region,seed,team,rating
        #[arg(short, long)]
        ratings: PathBuf,

        /// Tournament year to score
        #[arg(short, long)]
        year: u16,

        /// Engine configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Coefficients JSON; overrides the configured path
        #[arg(long)]
        coefficients: Option<PathBuf>,

        /// Pool size for currency output; overrides the configured size
        #[arg(long)]
        pool: Option<f64>,

        /// Print the full result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Fit model coefficients from historical games
    Fit {
        /// Games CSV: year,rating_a,rating_b,a_won
        #[arg(short, long)]
        games: PathBuf,

        /// Where to write the coefficients JSON
        #[arg(short, long, default_value = "coefficients.json")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("calcutta_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Ev {
            ratings,
            year,
            config,
            coefficients,
            pool,
            json,
        } => {
            let mut config = match config {
                Some(path) => EngineConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => EngineConfig::default(),
            };
            if coefficients.is_some() {
                config.model.coefficients_path = coefficients;
            }
            if pool.is_some() {
                config.pool.size = pool;
            }
            config.validate()?;

            let engine = EvEngine::from_config(&config)?;
            let table = RatingsTable::from_path(&ratings)
                .with_context(|| format!("loading ratings {}", ratings.display()))?;
            let bracket = table.bracket_for_year(year)?;
            let result = engine.compute_bracket_ev(&bracket)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_table(&result, config.pool.size);
            }
        }
        Command::Fit { games, out } => {
            let games = read_games_from_path(&games)
                .with_context(|| format!("loading games {}", games.display()))?;
            if games.is_empty() {
                bail!("no games to fit");
            }
            let summary = fit_coefficients(&games)?;
            save_coefficients(&out, &summary.to_file())?;
            println!(
                "intercept {:.4}  slope {:.4}  ({} games, {} iterations)",
                summary.coefficients.intercept,
                summary.coefficients.slope,
                summary.games,
                summary.iterations
            );
            println!(
                "log-likelihood {:.2}  Brier {:.4}",
                summary.log_likelihood, summary.brier_score
            );
            println!("wrote {}", out.display());
        }
    }

    Ok(())
}

fn print_table(result: &BracketEv, pool: Option<f64>) {
    match &result.coefficients.source {
        CoefficientSource::Fitted { path } => println!(
            "Model: fitted ({}), intercept {:.3}, slope {:.3}",
            path.display(),
            result.coefficients.coefficients.intercept,
            result.coefficients.coefficients.slope
        ),
        CoefficientSource::Supplied => println!("Model: supplied coefficients"),
        CoefficientSource::Theoretical { reason } => {
            println!("Model: theoretical (intercept 0, slope 1) - {reason}")
        }
    }

    for region in &result.regions {
        println!();
        println!("{}", region.name);
        print!("{:>4}  {:<24} {:>6}", "Seed", "Team", "Rating");
        for round in Round::ALL {
            print!(" {:>6}", round.label());
        }
        print!(" {:>7}", "EV%");
        if pool.is_some() {
            print!(" {:>10}", "EV");
        }
        println!();

        for team in &region.teams {
            let marker = if team.source == calcutta_core::RatingSource::SeedDefault {
                "*"
            } else {
                ""
            };
            print!(
                "{:>4}  {:<24} {:>6.3}",
                team.seed,
                format!("{}{}", team.name, marker),
                team.rating
            );
            for p in team.rounds.as_array() {
                print!(" {:>6.3}", p);
            }
            print!(" {:>7.3}", team.ev_percent());
            if let Some(pool) = pool {
                print!(" {:>10.2}", team.expected_payout(pool));
            }
            println!();
        }
        println!("{:>4}  region total {:.3}%", "", region.total_ev * 100.0);
    }

    let v = &result.validation;
    println!();
    println!(
        "Bracket total {:.3}% of pool (deviation {:+.3} pp, tolerance {:.1} pp){}",
        v.total * 100.0,
        v.deviation * 100.0,
        v.tolerance * 100.0,
        if v.within_tolerance { "" } else { "  WARNING: outside tolerance" }
    );
    if !result.defaulted_slots().is_empty() {
        println!("* rating substituted from seed default");
    }
}
