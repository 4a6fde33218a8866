//! vtkernel - a terminal-session kernel
//!
//! Runs a small table of virtual processes on the controlling terminal. The
//! root process is a line-editing shell; commands it cannot handle itself are
//! started as child processes that take over the keyboard until they exit.
//!
//! # Quick Start
//!
//! ```text
//! vtkernel                 # Start the root shell
//! vtkernel -p '$ '         # Custom prompt
//! vtkernel --log-level debug
//! ```
//!
//! # Shell commands
//!
//! | Command | Action |
//! |---------|--------|
//! | echo [ARGS] | Print ARGS, or echo keys until Ctrl+C / Ctrl+D |
//! | shell | Start a nested shell |
//! | history | List committed lines |
//! | clear | Clear the screen |
//! | exit | Leave the current shell |

use std::env;
use std::io::Write;

use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind};
use crossterm::{cursor, execute, terminal};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vtkernel::config::Config;
use vtkernel::core::session::Session;
use vtkernel::ui::{CrosstermSurface, KeyMapper};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line options
#[derive(Debug, Default)]
struct CliArgs {
    /// Prompt override
    prompt: Option<String>,
    /// Log filter override
    log_level: Option<String>,
}

fn print_version() {
    eprintln!("vtkernel {}", VERSION);
}

fn print_help() {
    eprintln!("vtkernel {} - a terminal-session kernel", VERSION);
    eprintln!();
    eprintln!("Usage: vtkernel [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -p, --prompt <TEXT>   Shell prompt (default \"> \")");
    eprintln!("  --log-level <LEVEL>   Log filter: trace, debug, info, warn, error");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Shell commands:");
    eprintln!("  echo [ARGS]           Print ARGS, or echo keys until Ctrl+C");
    eprintln!("  shell                 Start a nested shell");
    eprintln!("  history               List committed lines");
    eprintln!("  clear                 Clear the screen");
    eprintln!("  exit                  Leave the current shell");
    eprintln!();
    eprintln!("Configuration: ~/.vtkernel/config.toml");
    eprintln!("Log file:      ~/.vtkernel/vtkernel.log");
}

fn parse_args() -> Result<CliArgs, String> {
    let args: Vec<String> = env::args().collect();
    let mut cli = CliArgs::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-p" | "--prompt" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing prompt argument".to_string());
                }
                cli.prompt = Some(args[i].clone());
            }
            "--log-level" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing log level argument".to_string());
                }
                cli.log_level = Some(args[i].clone());
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(cli)
}

/// Send tracing output to ~/.vtkernel/vtkernel.log
fn init_logging(level: &str) {
    let log_path = Config::log_path().unwrap_or_else(|| std::path::PathBuf::from("vtkernel.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    // Command line overrides the config file
    let mut config = Config::load();
    if let Some(prompt) = cli.prompt {
        config.prompt = prompt;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level);
    info!("vtkernel {} starting...", VERSION);

    terminal::enable_raw_mode()?;
    let _ = execute!(std::io::stdout(), EnableBracketedPaste);
    let result = run_terminal(&config);

    // Cleanup
    let mut stdout = std::io::stdout();
    let _ = execute!(stdout, DisableBracketedPaste, cursor::Show);
    let _ = terminal::disable_raw_mode();
    let _ = stdout.write_all(b"\r\n");
    let _ = stdout.flush();

    if let Err(e) = &result {
        error!("vtkernel stopped: {}", e);
    }
    info!("vtkernel exiting");
    result
}

/// Run one session until the root shell exits
fn run_terminal(config: &Config) -> anyhow::Result<()> {
    let mut session = Session::new(config, CrosstermSurface::stdout())?;
    session.start()?;
    session.run_pending();

    while session.is_running() {
        match event::read()? {
            Event::Key(key_event) => {
                if key_event.kind == KeyEventKind::Release {
                    continue;
                }
                match KeyMapper::map(&key_event) {
                    Some(key) => session.feed_key(key),
                    None => {
                        debug!(?key_event, "unmapped key");
                        continue;
                    }
                }
            }
            Event::Paste(text) => {
                for key in KeyMapper::map_paste(&text) {
                    session.feed_key(key);
                }
            }
            _ => continue,
        }
        session.run_pending();
    }

    Ok(())
}
