use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use swish::data::Corpus;
use swish::file::{ReadJsonFile, WriteJsonFile};
use swish::model::{Config, Matchup, Model};
use swish::print::{tabulate_box_score, tabulate_metrics};
use swish::roster::PlayerOverride;
use swish::timed::Timed;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// possession corpus (JSON)
    corpus: Option<PathBuf>,

    /// home team code
    #[clap(long)]
    home: Option<String>,

    /// away team code
    #[clap(long)]
    away: Option<String>,

    /// model configuration (JSON); defaults apply when omitted
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// player overrides (JSON array)
    #[clap(long)]
    overrides: Option<PathBuf>,

    /// home-court advantage coefficient
    #[clap(long, default_value_t = Matchup::DEFAULT_HOME_COURT)]
    home_court: f64,

    /// number of simulated games
    #[clap(short = 't', long, default_value_t = Matchup::DEFAULT_TRIALS)]
    trials: usize,

    /// possessions added to (or removed from) the projected count
    #[clap(long, default_value_t = 0.0, allow_hyphen_values = true)]
    possession_adjust: f64,

    /// seed for reproducible runs
    #[clap(long)]
    seed: Option<u64>,

    /// where to write the projection (JSON)
    #[clap(short = 'o', long)]
    out: Option<PathBuf>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.corpus.as_ref().ok_or(anyhow!("corpus file must be specified"))?;
        self.home.as_ref().ok_or(anyhow!("home team must be specified"))?;
        self.away.as_ref().ok_or(anyhow!("away team must be specified"))?;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let config = match &args.config {
        Some(path) => Config::read_json_file(path)?,
        None => Config::default(),
    };
    let overrides = match &args.overrides {
        Some(path) => Vec::<PlayerOverride>::read_json_file(path)?,
        None => vec![],
    };
    let corpus = Corpus::read_json_file(args.corpus.unwrap())?;
    info!("loaded {} possession records over {} games", corpus.records.len(), corpus.games.len());

    let model = Timed::result(|| Model::fit(&corpus, config))?;
    info!("fitted model in {:.3}s", model.elapsed.as_secs_f64());

    let matchup = Matchup {
        home_court: args.home_court,
        trials: args.trials,
        possession_adjust: args.possession_adjust,
        overrides,
        seed: args.seed,
        ..Matchup::new(args.home.unwrap(), args.away.unwrap())
    };
    let projection = Timed::result(|| model.value.simulate(&matchup))?;
    info!(
        "projected {} at {} over {} games in {:.3}s",
        matchup.away,
        matchup.home,
        matchup.trials,
        projection.elapsed.as_secs_f64()
    );
    let projection = projection.value;

    info!("team metrics:\n{}", Console::default().render(&tabulate_metrics(&projection)));
    info!(
        "{} box score:\n{}",
        projection.home,
        Console::default().render(&tabulate_box_score(&projection.home_players))
    );
    info!(
        "{} box score:\n{}",
        projection.away,
        Console::default().render(&tabulate_box_score(&projection.away_players))
    );

    if let Some(out) = args.out {
        projection.write_json_file(&out)?;
        info!("wrote projection to {}", out.display());
    }
    Ok(())
}
