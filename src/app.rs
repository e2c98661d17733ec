use std::sync::Arc;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, CatalogueVars, ConfigFile};
use crate::controller::{ControllerConfig, ResponseDisposition, ResponsePolicy};
use crate::fetch::{HttpListingSource, HttpSourceOptions, DEFAULT_ENDPOINT};
use crate::format::Dimension;
use crate::output::{self, OutputFormat, SessionReport};
use crate::page::Page;
use crate::session::{Session, SessionCommand, COMMAND_HELP};
use crate::slider::RangeBounds;
use crate::utils::{self, NumericRange};

fn print_banner() {
    const BANNER: &str = concat!(
        "\n  catalogue-filter v",
        env!("CARGO_PKG_VERSION"),
        " - headless catalogue filter controller\n"
    );
    eprintln!("{}", BANNER);
}

fn format_kv_line(label: &str, value: &str) {
    eprintln!(":: {:<10}: {}", label.bold(), value);
}

fn format_bounds(bounds: &RangeBounds) -> String {
    format!(
        "{}..{} (start {}..{})",
        crate::format::js_number(bounds.min),
        crate::format::js_number(bounds.max),
        crate::format::js_number(bounds.start_min),
        crate::format::js_number(bounds.start_max)
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("catalogue_filter={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Clone, Debug)]
struct RunConfig {
    source: HttpSourceOptions,
    controller: ControllerConfig,
    genres: Vec<String>,
    checked_genres: Vec<String>,
    price_range: Option<NumericRange>,
    size_range: Option<NumericRange>,
    title: Option<String>,
    interactive: bool,
    output: Option<String>,
    output_format: OutputFormat,
    no_color: bool,
}

fn resolve_bounds(
    vars: Option<&CatalogueVars>,
    cfg: &ConfigFile,
) -> (RangeBounds, Option<RangeBounds>) {
    match vars {
        Some(vars) => (vars.price_bounds(), vars.size_bounds().or(cfg.size)),
        None => (
            cfg.price.unwrap_or_else(|| RangeBounds::full(0.0, 100.0)),
            cfg.size,
        ),
    }
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let base_url = args
        .url
        .or_else(|| cfg.base_url.clone())
        .ok_or_else(|| "a server base URL is required (--url or base_url in config)".to_string())?;
    reqwest::Url::parse(base_url.trim()).map_err(|e| format!("invalid URL '{base_url}': {e}"))?;

    let source = HttpSourceOptions {
        base_url,
        endpoint: args
            .endpoint
            .or_else(|| cfg.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        timeout_seconds: args.timeout.or(cfg.timeout).unwrap_or(10),
        proxy: args.proxy.or_else(|| cfg.proxy.clone()),
        header: args.header.or_else(|| cfg.header.clone()),
    };

    let policy_raw = args.policy.or_else(|| cfg.response_policy.clone());
    let policy = match policy_raw.as_deref() {
        Some(raw) => ResponsePolicy::parse(raw)
            .ok_or_else(|| format!("invalid response policy '{raw}'"))?,
        None => ResponsePolicy::default(),
    };

    let vars = match args.vars.as_deref().or(cfg.vars.as_deref()) {
        Some(path) => Some(config::load_catalogue_vars(&config::expand_tilde(path))?),
        None => None,
    };
    let (price, size) = resolve_bounds(vars.as_ref(), &cfg);

    let price_range = args
        .price
        .as_deref()
        .map(utils::parse_range)
        .transpose()
        .map_err(|e| format!("invalid --price: {e}"))?;
    let size_range = args
        .size
        .as_deref()
        .map(utils::parse_range)
        .transpose()
        .map_err(|e| format!("invalid --size: {e}"))?;
    if size_range.is_some() && size.is_none() {
        return Err("--size needs size bounds (from --vars or the size section of the config)".to_string());
    }

    let mut genres = cfg.genres.clone().unwrap_or_default();
    if let Some(raw) = args.genres.as_deref() {
        genres = utils::merge_unique(genres, &utils::parse_csv_list(raw));
    }
    let checked_genres: Vec<String> = args.genre.iter().map(|g| g.trim().to_string()).collect();
    let genres = utils::merge_unique(genres, &checked_genres);

    let output = args.output.or_else(|| cfg.output.clone());
    let format_raw = args.format.or_else(|| cfg.output_format.clone());
    let output_format = match format_raw.as_deref() {
        Some(raw) => OutputFormat::parse(raw)
            .ok_or_else(|| format!("invalid output format '{raw}'"))?,
        None => output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };

    Ok(RunConfig {
        source,
        controller: ControllerConfig {
            price,
            size,
            ids: cfg.element_ids.clone().unwrap_or_default(),
            policy,
        },
        genres,
        checked_genres,
        price_range,
        size_range,
        title: args.title,
        interactive: args.interactive,
        output,
        output_format,
        no_color,
    })
}

fn log_disposition(disposition: &ResponseDisposition) {
    match disposition {
        ResponseDisposition::Applied => {}
        ResponseDisposition::Discarded { latest_applied } => {
            debug!(latest_applied, "older response dropped")
        }
        ResponseDisposition::Failed(e) => eprintln!("{} {}", "[ERR]".bold().red(), e),
    }
}

fn apply_filters(session: &mut Session, run: &RunConfig) -> Result<(), String> {
    if let Some(range) = run.price_range {
        session
            .move_slider(Dimension::Price, range.low, range.high)
            .map_err(|e| e.to_string())?;
    }
    if let Some(range) = run.size_range {
        session
            .move_slider(Dimension::Size, range.low, range.high)
            .map_err(|e| e.to_string())?;
    }
    if let Some(title) = run.title.as_deref() {
        session
            .type_text("title", title)
            .map_err(|e| e.to_string())?;
    }
    for genre in run.checked_genres.iter() {
        session
            .set_genre(genre, true)
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

async fn run_interactive(session: &mut Session) -> Result<(), String> {
    eprintln!("{}", "type 'help' for commands, 'quit' to finish".dimmed());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|e| format!("failed to read stdin: {e}"))?;
                let Some(line) = line else { break };
                let command = match SessionCommand::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("{} {}", "[ERR]".bold().red(), e);
                        continue;
                    }
                };
                match command {
                    SessionCommand::Quit => break,
                    SessionCommand::Help => eprintln!("{COMMAND_HELP}"),
                    SessionCommand::Show => println!("{}", session.listing()),
                    SessionCommand::Query => println!("{}", session.controller().current_query()),
                    SessionCommand::Wait => {
                        for disposition in session.settle().await.iter() {
                            log_disposition(disposition);
                        }
                    }
                    other => match session.apply(&other) {
                        Ok(started) => debug!(started, "command applied"),
                        Err(e) => eprintln!("{} {}", "[ERR]".bold().red(), e),
                    },
                }
            }
            Some(completion) = session.completions().recv() => {
                let disposition = session.accept(completion);
                log_disposition(&disposition);
            }
        }
    }
    Ok(())
}

async fn write_report(output: Option<&str>, rendered: &[u8]) -> Result<(), String> {
    match output {
        Some(path) => {
            let mut outfile = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .await
                .map_err(|e| format!("failed to open output file: {e}"))?;
            outfile
                .write_all(rendered)
                .await
                .map_err(|e| format!("failed to write output file: {e}"))?;
            outfile
                .flush()
                .await
                .map_err(|e| format!("failed to write output file: {e}"))?;
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(rendered)
                .await
                .map_err(|e| format!("failed to write report: {e}"))?;
            stdout
                .flush()
                .await
                .map_err(|e| format!("failed to write report: {e}"))?;
        }
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    let source = HttpListingSource::new(&run.source).map_err(|e| e.to_string())?;
    format_kv_line("Endpoint", source.endpoint().as_str());
    format_kv_line("Price", &format_bounds(&run.controller.price));
    if let Some(size) = run.controller.size.as_ref() {
        format_kv_line("Size", &format_bounds(size));
    }
    if !run.genres.is_empty() {
        format_kv_line("Genres", &run.genres.join(", "));
    }
    format_kv_line("Policy", &format!("{:?}", run.controller.policy));
    eprintln!();

    let now = Instant::now();
    let page = Page::catalogue(
        &run.controller.ids,
        &run.genres,
        run.controller.size.is_some(),
    );
    let mut session = Session::start(run.controller.clone(), page, Arc::new(source))
        .map_err(|e| e.to_string())?;
    info!(in_flight = session.in_flight(), "controller bound");

    if run.interactive {
        run_interactive(&mut session).await?;
    } else {
        apply_filters(&mut session, &run)?;
    }

    for disposition in session.settle().await.iter() {
        log_disposition(disposition);
    }

    let report = SessionReport::from_session(&session);
    if report.stats.applied == 0 && report.stats.failed > 0 {
        warn!(failed = report.stats.failed, "no listing response succeeded");
    }
    let rendered = output::render(&report, run.output_format);
    write_report(run.output.as_deref(), &rendered).await?;

    eprintln!();
    eprintln!(
        ":: Completed :: {} requests ({} applied, {} discarded, {} failed) in {}ms ::",
        report.stats.issued,
        report.stats.applied.to_string().green(),
        report.stats.discarded,
        report.stats.failed.to_string().red(),
        now.elapsed().as_millis()
    );
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", CliArgs::command().render_long_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                print!("{}", CliArgs::command().render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_logging(args.verbose);

    if args.init_config {
        let path = match args.config.as_deref() {
            Some(p) => config::expand_tilde(p),
            None => config::default_config_path()
                .ok_or_else(|| "cannot locate a home directory for the config".to_string())?,
        };
        config::ensure_default_config_file(&path)?;
        println!("{}", path.display());
        return Ok(());
    }

    let cfg = match args.config.as_deref() {
        Some(path) => config::load_config(&config::expand_tilde(path), false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
