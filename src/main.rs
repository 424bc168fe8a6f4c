mod accounts;
mod catalog;
mod cli;
mod clock;
mod commands;
mod config;
mod error;
mod journal;
mod ledger;
mod reporting;
mod session;
mod snapshot;

use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kedai", about = "Point-of-sale terminal for a small café")]
pub struct Args {
    #[arg(long, help = "Snapshot file (default: data.json)")]
    pub data: Option<PathBuf>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Username to log in as")]
    pub user: Option<String>,

    #[arg(long, env = "KEDAI_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(short, long, help = "Run one command (e.g. '/stock') and exit")]
    pub command: Option<String>,

    #[arg(long, help = "Session journal directory")]
    pub journal_dir: Option<PathBuf>,

    #[arg(long, help = "Do not write a session journal")]
    pub no_journal: bool,

    #[arg(long, help = "Save after every change")]
    pub autosave: bool,

    #[arg(long, help = "Debug output (print settings and parsed commands)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    // CLI overrides
    if let Some(data) = &args.data {
        cfg.data_file = Some(data.clone());
    }
    if let Some(dir) = &args.journal_dir {
        cfg.journal.dir = Some(dir.clone());
    }
    if args.no_journal {
        cfg.journal.enabled = Some(false);
    }
    if args.autosave {
        cfg.autosave = Some(true);
    }

    if let Err(errors) = cfg.validate() {
        for e in &errors {
            eprintln!("Config error {}", e);
        }
        return Err(anyhow::anyhow!("invalid configuration"));
    }

    let root = std::env::current_dir()?;
    let data_file = cfg.data_file();
    let session_id = uuid::Uuid::new_v4().to_string();

    let journal = if cfg.journal_enabled() {
        let dir = cfg.journal_dir(&root);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating journal dir {}", dir.display()))?;
        journal::Journal::new(&dir.join(format!("{}.jsonl", session_id)), &session_id)?
    } else {
        journal::Journal::disabled(&session_id)
    };

    if args.debug {
        eprintln!("[DEBUG] Data file: {}", data_file.display());
        eprintln!("[DEBUG] Journal: {:?}", journal.path);
        eprintln!("[DEBUG] Autosave: {}", cfg.autosave());
        eprintln!("[DEBUG] Max login attempts: {}", cfg.max_login_attempts());
    }

    let (snapshot, source) = snapshot::Snapshot::load(&data_file)?;
    if args.debug {
        eprintln!(
            "[DEBUG] Loaded {:?}: {} users, {} menu items",
            source,
            snapshot.users.len(),
            snapshot.menus.len()
        );
    }
    let menu_items = snapshot.menus.len();
    let save_file = snapshot::save_target(&data_file, source);
    if save_file != data_file {
        eprintln!(
            "Warning: {} will not be overwritten; changes are saved to {}",
            data_file.display(),
            save_file.display()
        );
    }

    let mut session = session::Session::new(
        snapshot,
        &save_file,
        Box::new(clock::SystemClock),
        journal,
    );
    let _ = session.journal_mut().session_start(&save_file, menu_items);

    let opts = cli::ReplOptions {
        username: args.user.clone(),
        password: args.password.clone(),
        max_login_attempts: cfg.max_login_attempts(),
        autosave: cfg.autosave(),
        debug: args.debug,
    };

    if let Some(command) = &args.command {
        cli::run_once(session, &opts, command)
    } else {
        cli::run_repl(session, opts)
    }
}
