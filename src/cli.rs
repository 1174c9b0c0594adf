//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvFeedAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestRun};
use crate::domain::config::BacktestConfig;
use crate::domain::config_validation::build_backtest_config;
use crate::domain::metrics::Metrics;
use crate::domain::position::Trade;
use crate::ports::config_port::ConfigPort;
use crate::ports::feed_port::FeedPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "sigtrader", about = "Signal-driven trading backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a CSV signal feed
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides `[data] path`
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Overrides `[report] path`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            output,
        } => run_backtest(&config, data.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Command-line value first, then the config file.
pub fn resolve_path(
    cli_value: Option<&Path>,
    adapter: &dyn ConfigPort,
    section: &str,
) -> Option<PathBuf> {
    cli_value.map(Path::to_path_buf).or_else(|| {
        adapter
            .require_string(section, "path")
            .ok()
            .map(PathBuf::from)
    })
}

fn run_backtest(config_path: &Path, data_path: Option<&Path>, output_path: Option<&Path>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Build and validate BacktestConfig
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Load the signal feed
    let Some(data_path) = resolve_path(data_path, &adapter, "data") else {
        eprintln!("error: no data file given (use --data or [data] path)");
        return ExitCode::from(2);
    };
    eprintln!("Loading signal feed from {}", data_path.display());
    let feed = match CsvFeedAdapter::new(data_path).load_feed(bt_config.price_field, bt_config.trade_type) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!(
        "  {} bars, {} to {}",
        feed.len(),
        feed.dates()[0],
        feed.dates()[feed.len() - 1]
    );

    // Stage 4: Run
    let run = match backtest_engine::run_backtest(&feed, &bt_config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_config(&bt_config);
    print_summary(run.metrics());
    print_trades(run.trades());

    // Stage 5: Optional report; the results above stand even if this fails
    match resolve_path(output_path, &adapter, "report") {
        Some(output) => write_report(&run, &output),
        None => ExitCode::SUCCESS,
    }
}

fn write_report(run: &BacktestRun, output: &Path) -> ExitCode {
    let reporter = CsvReportAdapter::new();
    match reporter.write(run, run.trades().len(), run.config.initial_capital, output) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) if e.is_export_error() => {
            eprintln!("error: failed to write report (results above stand): {e}");
            (&e).into()
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn print_config(config: &BacktestConfig) {
    eprintln!("\n=== Configuration ===");
    eprintln!("Initial Capital:  {:.2}", config.initial_capital);
    eprintln!("Trade Type:       {}", config.trade_type);
    eprintln!("Timeframe:        {}", config.timeframe);
    eprintln!("Price Field:      {}", config.price_field.as_str());
    eprintln!("Position Size:    {:.1}%", config.position_size_pct * 100.0);
    eprintln!("Commission:       {:.3}%", config.commission_pct * 100.0);
    eprintln!("Slippage:         {:.3}%", config.slippage_pct * 100.0);
    eprintln!("Max Positions:    {}", config.max_positions);
}

/// Two decimals, or `inf` for the unbounded ratio sentinel.
pub fn format_ratio(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{value:.2}")
    }
}

pub fn print_summary(metrics: &Metrics) {
    eprintln!("\n=== Results ===");
    eprintln!("Start Value:       {:.2}", metrics.start_value);
    eprintln!("End Value:         {:.2}", metrics.end_value);
    eprintln!("Total Return:      {:.2}%", metrics.total_return);
    eprintln!("Annualized Return: {:.2}%", metrics.annualized_return);
    eprintln!("Max Drawdown:      {:.2}%", metrics.max_drawdown);
    eprintln!("Sharpe Ratio:      {}", format_ratio(metrics.sharpe_ratio));
    eprintln!("Sortino Ratio:     {}", format_ratio(metrics.sortino_ratio));
    eprintln!("Calmar Ratio:      {}", format_ratio(metrics.calmar_ratio));
    eprintln!(
        "Total Trades:      {} ({} won, {} lost)",
        metrics.total_trades, metrics.winning_trades, metrics.losing_trades
    );
    if metrics.win_rate_available {
        eprintln!("Win Rate:          {:.1}%", metrics.win_rate);
    } else {
        eprintln!("Win Rate:          N/A");
    }
    eprintln!("Profit Factor:     {}", format_ratio(metrics.profit_factor));
}

pub fn print_trades(trades: &[Trade]) {
    if trades.is_empty() {
        return;
    }
    eprintln!("\n=== Trades ===");
    for (i, t) in trades.iter().enumerate() {
        eprintln!(
            "{:>4}  {:<5}  {} @ {:.4} -> {} @ {:.4}  {:>10.2} ({:>7.2}%)  {} bars  {}",
            i + 1,
            t.direction,
            t.entry_date,
            t.entry_price,
            t.exit_date,
            t.exit_price,
            t.profit,
            t.profit_pct,
            t.holding_bars,
            t.exit_reason
        );
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    print_config(&config);

    match adapter.require_string("data", "path") {
        Ok(path) => eprintln!("Data:             {path}"),
        Err(_) => eprintln!("Data:             (none, pass --data)"),
    }
    if let Ok(path) = adapter.require_string("report", "path") {
        eprintln!("Report:           {path}");
    }

    eprintln!("\nConfiguration is valid");
    ExitCode::SUCCESS
}
