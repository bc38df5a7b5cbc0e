#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, BufReader};

use clap::{command, Arg, ArgAction};
use color_eyre::eyre::{Result, WrapErr};
use recap::log::*;
use recap::notify::{self, NtfyConfig, NtfyNotifier};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

mod listener;

use crate::listener::Listener;

fn main() -> Result<()> {
    install_color_eyre()?;

    // Command configuration
    let matches = command!()
        .about("Collects playbook lifecycle events and sends the run recap to ntfy.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Turn debugging information on. Overrides -q. Can specify up to -vvvv.")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only log errors. Overridden by -v.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("file")
                .help("Path to a file of newline-delimited events. Defaults to stdin.")
                .short('f')
                .long("file"),
        )
        .arg(
            Arg::new("dry")
                .help("Don't send anything, print the recap to stdout instead.")
                .short('d')
                .long("dry")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    // Set up logging
    let logging_config = tracing_subscriber::fmt::SubscriberBuilder::default()
        .with_timer(tracing_subscriber::fmt::time::UtcTime::new(
            time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        ))
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::NONE)
        .with_writer(io::stderr)
        .compact();

    let quiet = matches.get_flag("quiet");
    let verbose = matches.get_count("verbose") as usize;
    let logging_config = if quiet && verbose == 0 {
        logging_config.with_max_level(LevelFilter::ERROR)
    } else {
        let level = match verbose {
            0 | 1 => LevelFilter::WARN,
            2 => LevelFilter::INFO,
            3 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        logging_config.with_max_level(level)
    };

    let subscriber = logging_config.finish();
    subscriber.init();

    let config = NtfyConfig::from_env();
    debug!("ntfy config: {:?}", config);

    let mut listener = Listener::new();
    let recap = match matches.get_one::<String>("file") {
        Some(path) => {
            let file = File::open(path)
                .wrap_err_with(|| format!("Failed opening event file {}", path))?;
            listener.listen(BufReader::new(file))?
        }
        None => listener.listen(io::stdin().lock())?,
    };

    let recap = match recap {
        Some(recap) => recap,
        None => {
            eprintln!("* warning: no playbook stats received, not sending a recap");
            return Ok(());
        }
    };

    if matches.get_flag("dry") {
        println!("{}", recap);
        return Ok(());
    }

    match NtfyNotifier::new(config) {
        Ok(notifier) => {
            notify::deliver(&notifier, &recap);
        }
        Err(err) => {
            warn!("could not set up ntfy client: {:#}", err);
            eprintln!("* warning: could not set up ntfy client: {:#}", err);
        }
    }

    Ok(())
}
