use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use swish::data::{Corpus, Role};
use swish::file::{ReadJsonFile, WriteJsonFile};
use swish::metric::Metric;
use swish::model::{Config, Model};
use swish::print::tabulate_leaders;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// possession corpus (JSON)
    corpus: Option<PathBuf>,

    /// model configuration (JSON); defaults apply when omitted
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// number of leaders to print per metric
    #[clap(short = 'n', long, default_value_t = 10)]
    top: usize,

    /// restrict to a single metric, e.g. three_made
    #[clap(short = 'm', long, value_parser = parse_metric)]
    metric: Option<Metric>,

    /// print every rating of a single player instead of the leaders
    #[clap(short = 'p', long)]
    player: Option<String>,

    /// where to write the rating table (JSON)
    #[clap(short = 'o', long)]
    out: Option<PathBuf>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.corpus.as_ref().ok_or(anyhow!("corpus file must be specified"))?;
        if self.top == 0 {
            return Err(anyhow!("at least one leader must be printed"));
        }
        Ok(())
    }
}
fn parse_metric(s: &str) -> anyhow::Result<Metric> {
    Metric::iter()
        .find(|metric| metric.to_string() == s.to_lowercase())
        .ok_or(anyhow!("unsupported metric {s}"))
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
    let corpus = Corpus::read_json_file(args.corpus.unwrap())?;
    let model = Model::fit(&corpus, config)?;
    let ratings = model.ratings();
    info!("rated {} players", ratings.profiles.len());

    if let Some(player) = &args.player {
        let profile = ratings
            .get(player)
            .ok_or(anyhow!("no rating for player {player}"))?;
        let columns: Vec<_> = profile
            .columns()
            .into_iter()
            .map(|(column, rating)| format!("{column}: {rating:.2}"))
            .collect();
        info!("{} ({}):\n{}", profile.name, profile.team, columns.join("\n"));
        return Ok(());
    }

    let metrics: Vec<_> = match args.metric {
        Some(metric) => vec![metric],
        None => Metric::iter().collect(),
    };
    for role in Role::iter() {
        for &metric in &metrics {
            let leaders = ratings.top(role, metric, args.top);
            info!(
                "leaders in {metric} ({role}):\n{}",
                Console::default().render(&tabulate_leaders(role, metric, &leaders))
            );
        }
    }

    if let Some(out) = args.out {
        ratings.write_json_file(&out)?;
        info!("wrote {} profiles to {}", ratings.profiles.len(), out.display());
    }
    Ok(())
}
