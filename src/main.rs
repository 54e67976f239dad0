use clap::{Parser, ValueEnum};
use env_logger::Builder;
use log::LevelFilter;
use log::{info, warn};

mod alias;
mod error;
mod historical;
mod marketdata;
mod output;
mod persistence;
mod portfolio;
mod pricer;
mod referential;

use historical::{HistoricalData, NullRequester, Requester, YahooRequester};
use output::{CsvOutput, Output};
use persistence::SQLitePersistance;
use pricer::{Allocation, HoldingsCache, PortfolioSnapshot, Sampling, Step, ValueSeries};

use error::Error;

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum SpotSource {
    Null,
    Yahoo,
}

impl std::fmt::Display for SpotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_possible_value()
            .expect("no values are skipped")
            .get_name()
            .fmt(f)
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum SeriesSampling {
    Transaction,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl std::fmt::Display for SeriesSampling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_possible_value()
            .expect("no values are skipped")
            .get_name()
            .fmt(f)
    }
}

impl SeriesSampling {
    fn to_sampling(self, end: alias::Date, days: Option<u64>) -> Sampling {
        let sampling = match self {
            SeriesSampling::Transaction => Sampling::transaction_dates(),
            SeriesSampling::Daily => Sampling::step(Step::Day, end),
            SeriesSampling::Weekly => Sampling::step(Step::Week, end),
            SeriesSampling::Monthly => Sampling::step(Step::Month, end),
            SeriesSampling::Yearly => Sampling::step(Step::Year, end),
        };
        match days.and_then(|days| end.checked_sub_days(chrono::Days::new(days))) {
            Some(since) => sampling.since(since),
            None => sampling,
        }
    }
}

/// Compute holdings, valuation and value history of a portfolio
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Portfolio file
    #[clap(short, long, value_parser)]
    portfolio: String,

    /// db cache file
    #[clap(short, long, value_parser)]
    cache_file: String,

    /// output dir
    #[clap(short, long, value_parser)]
    output_dir: String,

    /// spot source
    #[clap(default_value_t = SpotSource::Yahoo, short, long, value_parser)]
    spot_source: SpotSource,

    /// value series sampling
    #[clap(default_value_t = SeriesSampling::Transaction, short = 't', long, value_parser)]
    sampling: SeriesSampling,

    /// only keep the last days of the value series
    #[clap(short, long, value_parser)]
    days: Option<u64>,
}

fn make_requester(source: SpotSource) -> Result<Box<dyn Requester>, Error> {
    let value: Box<dyn Requester> = match source {
        SpotSource::Null => Box::new(NullRequester),
        SpotSource::Yahoo => Box::new(YahooRequester::new()?),
    };
    Ok(value)
}

fn main() -> Result<(), Error> {
    //
    // cli arg
    let args = Args::parse();

    //
    // logger
    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder.parse_default_env();
    builder.init();

    //
    // load portfolio
    let portfolio = referential::load_portfolio(&args.portfolio)?;
    info!("loading portfolio {} done", portfolio.name);

    //
    // persistence
    let persistence = SQLitePersistance::new(&args.cache_file)?;

    //
    // historical data
    let requester = make_requester(args.spot_source)?;
    let mut provider = HistoricalData::new(requester, &persistence);

    //
    // current valuation
    let today = chrono::Local::now().date_naive();
    let mut cache = HoldingsCache::new();
    let holdings = cache.holdings(&portfolio, &portfolio.id)?;
    let snapshot = PortfolioSnapshot::from_holdings(&holdings, today, &mut provider);
    if snapshot.is_degraded() {
        warn!(
            "{} holdings without price, valuation is partial",
            snapshot.unavailable.len()
        );
    }
    let allocations = Allocation::from_snapshot(&snapshot);
    info!("compute portfolio valuation done");

    //
    // value history
    info!("compute {} value series", args.sampling);
    let series = ValueSeries::from_transactions(
        portfolio.transactions(),
        args.sampling.to_sampling(today, args.days),
        &mut provider,
    )?;
    if series.unavailable_count() > 0 {
        warn!(
            "{} points of the series miss at least one price",
            series.unavailable_count()
        );
    }
    info!("compute value series done");

    //
    // write output
    let mut output = CsvOutput::new(
        &args.output_dir,
        &portfolio.name,
        &snapshot,
        &series,
        &allocations,
    );
    output.write_indicators()?;
    info!("write output done");

    Ok(())
}
