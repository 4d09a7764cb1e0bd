// tmux-fastcopy is a tmux plugin that aids in copying text: it overlays the
// current pane with vimium-style hint labels for text matching a set of
// regular expressions, and hands the picked text to a configurable action.
mod action;
mod app;
mod cli;
mod config;
mod hint;
mod huffman;
mod matcher;
mod paniclog;
mod tail;
mod text;
mod tmux;
mod ui;
mod widget;
mod wrap;

use std::env;
use std::fs::OpenOptions;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};

use crate::config::Config;
use crate::tmux::shell::ShellDriver;
use crate::tmux::Driver;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let cfg = match cli::parse_args(&args) {
        Ok(cli::Parsed::Run(cfg)) => cfg,
        Ok(cli::Parsed::Version) => {
            println!("tmux-fastcopy version {}", cli::VERSION);
            return ExitCode::SUCCESS;
        }
        Ok(cli::Parsed::Help) => {
            eprint!("{}", cli::usage());
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("tmux-fastcopy: {}", err);
            if err.usage {
                eprint!("{}", cli::usage());
                return ExitCode::from(2);
            }
            return ExitCode::FAILURE;
        }
    };

    match run(cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tmux-fastcopy: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(mut cfg: Config) -> Result<()> {
    init_logging(&cfg)?;
    let driver = ShellDriver::new(&cfg.tmux);

    // The wrapper marks the process it re-runs inside the detached session
    // with this variable; its value is the wrapper's pid, from which the
    // rendezvous token is derived.
    match env::var(wrap::WRAPPED_BY_ENV) {
        Ok(parent) if !parent.is_empty() => run_inner(&driver, &mut cfg, &parent),
        _ => {
            let executable = env::current_exe().context("determine executable")?;
            let wrapper = wrap::Wrapper {
                tmux: &driver,
                executable,
                pid: std::process::id(),
            };
            wrapper.run(&mut cfg)
        }
    }
}

fn run_inner(driver: &dyn Driver, cfg: &mut Config, parent: &str) -> Result<()> {
    let log_file = cfg.log_file.clone();
    let app = app::App { tmux: driver };
    signal_on_exit(driver, &log_file, parent, || app.run(cfg))
}

/// Runs the inner stage and wakes the wrapper afterwards, no matter how the
/// run ended. A panic is written to the log file first so the wrapper's
/// tail sees the trace before the signal unblocks it.
fn signal_on_exit(
    driver: &dyn Driver,
    log_file: &str,
    parent: &str,
    f: impl FnOnce() -> Result<()>,
) -> Result<()> {
    let result = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = paniclog::payload_message(&*payload).to_string();
            paniclog::append(log_file, &message);
            Err(anyhow!("panic: {}", message))
        }
    };

    if let Err(err) = &result {
        log::error!("{:#}", err);
    }

    let signal = format!("{}{}", wrap::SIGNAL_PREFIX, parent);
    if let Err(err) = driver.send_signal(&signal) {
        log::error!("send signal {:?}: {:#}", signal, err);
    }
    result
}

fn init_logging(cfg: &Config) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(if cfg.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    if !cfg.log_file.is_empty() {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&cfg.log_file)
            .with_context(|| format!("open log {:?}", cfg.log_file))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init().context("init logging")?;
    Ok(())
}
