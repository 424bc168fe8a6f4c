use crate::commands::{self, Command};
use crate::error::PosError;
use crate::ledger::{LineOutcome, OrderTotal};
use crate::session::{Outcome, Session};
use anyhow::{anyhow, Result};
use rustyline::completion::Completer;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{ColorMode, Editor, Helper};
use std::borrow::Cow;

type LineEditor = Editor<PasswordMask, DefaultHistory>;

/// Draws the line as `*` while `masking` is set
#[derive(Default)]
struct PasswordMask {
    masking: bool,
}

impl Highlighter for PasswordMask {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if self.masking {
            Cow::Owned("*".repeat(line.chars().count()))
        } else {
            Cow::Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, kind: CmdKind) -> bool {
        self.masking && kind != CmdKind::MoveCursor
    }
}

impl Completer for PasswordMask {
    type Candidate = String;
}

impl Hinter for PasswordMask {
    type Hint = String;
}

impl Validator for PasswordMask {}

impl Helper for PasswordMask {}

/// Settings the REPL takes from config and flags
pub struct ReplOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_login_attempts: u32,
    pub autosave: bool,
    pub debug: bool,
}

/// Log in, run a single command, save if anything changed
pub fn run_once(mut session: Session, opts: &ReplOptions, line: &str) -> Result<()> {
    let (Some(username), Some(password)) = (&opts.username, &opts.password) else {
        return Err(anyhow!("--command needs --user and --password (or KEDAI_PASSWORD)"));
    };
    session.begin_login();
    if let Err(e) = session.login(username, password) {
        session.close(false);
        return Err(e.into());
    }

    let cmd = match commands::parse(line) {
        Ok(cmd) => cmd,
        Err(e) => {
            session.close(false);
            return Err(e.into());
        }
    };
    let result = match session.execute(&cmd) {
        Ok(Outcome::Message(msg)) => {
            println!("{}", msg);
            Ok(())
        }
        Ok(Outcome::OrderWalk(_)) => Err(anyhow!("/order is interactive; use /new and /add")),
        Ok(Outcome::Exit) => Ok(()),
        Err(e) => Err(e.into()),
    };

    let saved = if session.is_dirty() {
        session.save().map_err(|e| {
            session.close(false);
            e
        })?;
        true
    } else {
        false
    };
    session.close(saved);
    result
}

pub fn run_repl(mut session: Session, opts: ReplOptions) -> Result<()> {
    let mut rl = LineEditor::new()?;
    rl.set_helper(Some(PasswordMask::default()));
    session.set_save_on_drop(true);

    println!("kedai - log in to continue");

    if !login(&mut rl, &mut session, &opts)? {
        session.close(false);
        return Err(anyhow!("too many failed login attempts"));
    }

    if opts.debug {
        eprintln!("[DEBUG] State: {:?}", session.state());
    }
    let user = session.username().unwrap_or_default().to_string();
    println!("Welcome, {}! Type /help for commands, /exit to save and quit.", user);

    loop {
        match rl.readline(&format!("{}> ", user)) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if !line.starts_with("/passwd") {
                    rl.add_history_entry(line)?;
                }
                if !line.starts_with('/') {
                    println!("Commands start with '/'. Type /help for a list.");
                    continue;
                }
                if handle_command(&mut rl, &mut session, &opts, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    let saved = save_with_retry(&mut rl, &mut session);
    session.close(saved);
    if saved {
        Ok(())
    } else {
        Err(anyhow!(
            "changes were not saved to {}",
            session.data_file().display()
        ))
    }
}

/// Prompt for credentials until success or attempts run out
fn login(rl: &mut LineEditor, session: &mut Session, opts: &ReplOptions) -> Result<bool> {
    session.begin_login();
    for attempt in 0..opts.max_login_attempts {
        let username = match (&opts.username, attempt) {
            (Some(name), 0) => name.clone(),
            _ => match rl.readline("Username: ") {
                Ok(name) => name.trim().to_string(),
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(false),
                Err(e) => return Err(e.into()),
            },
        };
        let password = match (&opts.password, attempt) {
            (Some(pw), 0) => pw.clone(),
            _ => match read_password(rl, "Password: ") {
                Ok(pw) => pw,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(false),
                Err(e) => return Err(e.into()),
            },
        };

        match session.login(&username, &password) {
            Ok(_) => return Ok(true),
            Err(e) => println!("{}", e),
        }
    }
    Ok(false)
}

/// Read a line without echoing it; never added to history
fn read_password(rl: &mut LineEditor, prompt: &str) -> rustyline::Result<String> {
    if let Some(mask) = rl.helper_mut() {
        mask.masking = true;
    }
    rl.set_color_mode(ColorMode::Forced);
    let result = rl.readline(prompt);
    rl.set_color_mode(ColorMode::Enabled);
    if let Some(mask) = rl.helper_mut() {
        mask.masking = false;
    }
    result
}

/// Returns true when the session should end
fn handle_command(
    rl: &mut LineEditor,
    session: &mut Session,
    opts: &ReplOptions,
    line: &str,
) -> bool {
    let cmd = match commands::parse(line) {
        Ok(cmd) => cmd,
        Err(e) => {
            println!("{}", e);
            return false;
        }
    };
    if opts.debug {
        eprintln!("[DEBUG] {:?}", cmd);
    }

    match session.execute(&cmd) {
        Ok(Outcome::Message(msg)) => println!("{}", msg),
        Ok(Outcome::OrderWalk(items)) => walk_order(rl, session, &items),
        Ok(Outcome::Exit) => return true,
        Err(e) => {
            println!("Error: {}", e);
            return false;
        }
    }

    autosave(session, opts, &cmd);
    false
}

/// Save after a mutating command when autosave is on
fn autosave(session: &mut Session, opts: &ReplOptions, cmd: &Command) {
    if opts.autosave && cmd.mutates() && session.is_dirty() {
        if let Err(e) = session.save() {
            eprintln!("Warning: autosave failed: {}", e);
        }
    }
}

/// Ask for a quantity of every menu item; blank or 0 skips the item.
fn walk_order(rl: &mut LineEditor, session: &mut Session, items: &[String]) {
    'items: for name in items {
        loop {
            let stock = match session.catalog().find_by_name(name) {
                Ok(item) => item.stock,
                Err(_) => break,
            };
            let prompt = format!("Order {} (stock {}, Enter to skip): ", name, stock);
            let input = match rl.readline(&prompt) {
                Ok(input) => input,
                Err(_) => {
                    println!("Order entry stopped.");
                    break 'items;
                }
            };
            let input = input.trim();
            let quantity = if input.is_empty() {
                0
            } else {
                match input.parse::<i64>() {
                    Ok(q) => q,
                    Err(_) => {
                        println!("Enter a whole number between 0 and {}.", stock);
                        continue;
                    }
                }
            };

            match session.add_line(name, quantity) {
                Ok(LineOutcome::Added(_) | LineOutcome::Skipped) => break,
                Err(e @ PosError::InvalidAmount { .. }) => println!("{}", e),
                Err(e) => {
                    println!("Error: {}", e);
                    break;
                }
            }
        }
    }

    if session.ledger().current().is_some_and(|o| o.is_empty()) {
        println!("No items ordered.");
        return;
    }
    if let OrderTotal::Amount(total) = session.ledger().total() {
        println!("Order placed. Total: {}.", total);
    }
}

/// Save, offering to retry on failure. Returns whether the data is on disk.
fn save_with_retry(rl: &mut LineEditor, session: &mut Session) -> bool {
    loop {
        match session.save() {
            Ok(()) => {
                println!("Saved to {}.", session.data_file().display());
                return true;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                match rl.readline("Retry saving? [Y/n] ") {
                    Ok(answer) if !answer.trim().eq_ignore_ascii_case("n") => continue,
                    _ => return false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::journal::Journal;
    use crate::snapshot::Snapshot;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn session_in(dir: &TempDir) -> Session {
        Session::new(
            Snapshot::with_defaults(),
            &dir.path().join("data.json"),
            Box::new(FixedClock(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())),
            Journal::disabled("test"),
        )
    }

    fn opts(user: &str, password: &str) -> ReplOptions {
        ReplOptions {
            username: Some(user.to_string()),
            password: Some(password.to_string()),
            max_login_attempts: 3,
            autosave: false,
            debug: false,
        }
    }

    #[test]
    fn test_run_once_saves_changes() {
        let dir = TempDir::new().unwrap();
        run_once(
            session_in(&dir),
            &opts("manager", "manager123"),
            "/restock Latte 4",
        )
        .unwrap();

        let (snapshot, _) = Snapshot::load(&dir.path().join("data.json")).unwrap();
        assert_eq!(snapshot.menus[3].stock, 14);
    }

    #[test]
    fn test_run_once_read_only_skips_save() {
        let dir = TempDir::new().unwrap();
        run_once(session_in(&dir), &opts("kasir", "kasir123"), "/stock").unwrap();
        assert!(!dir.path().join("data.json").exists());
    }

    #[test]
    fn test_run_once_errors() {
        let dir = TempDir::new().unwrap();
        let err = run_once(session_in(&dir), &opts("kasir", "nope"), "/stock").unwrap_err();
        assert!(err.to_string().contains("invalid username or password"));

        let err = run_once(session_in(&dir), &opts("kasir", "kasir123"), "/order").unwrap_err();
        assert!(err.to_string().contains("interactive"));

        let err = run_once(session_in(&dir), &opts("kasir", "kasir123"), "/sales").unwrap_err();
        assert!(err.downcast_ref::<PosError>().is_some());

        let mut no_password = opts("kasir", "x");
        no_password.password = None;
        assert!(run_once(session_in(&dir), &no_password, "/stock").is_err());
    }

    #[test]
    fn test_failed_login_still_ends_session() {
        let dir = TempDir::new().unwrap();
        let journal_path = dir.path().join("s.jsonl");
        let session = Session::new(
            Snapshot::with_defaults(),
            &dir.path().join("data.json"),
            Box::new(FixedClock(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())),
            Journal::new(&journal_path, "s").unwrap(),
        );
        assert!(run_once(session, &opts("kasir", "nope"), "/stock").is_err());

        let types: Vec<String> = std::fs::read_to_string(&journal_path)
            .unwrap()
            .lines()
            .map(|l| {
                let event: serde_json::Value = serde_json::from_str(l).unwrap();
                event["type"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(types, vec!["login_failed", "session_end"]);
    }

    #[test]
    fn test_autosave_after_mutating_command() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let mut session = session_in(&dir);
        session.login("manager", "manager123").unwrap();
        let mut opts = opts("manager", "manager123");
        opts.autosave = true;

        let read_only = commands::parse("/sales").unwrap();
        session.execute(&read_only).unwrap();
        autosave(&mut session, &opts, &read_only);
        assert!(!path.exists());

        let restock = commands::parse("/restock Latte 2").unwrap();
        session.execute(&restock).unwrap();
        autosave(&mut session, &opts, &restock);
        assert!(!session.is_dirty());
        let (snapshot, _) = Snapshot::load(&path).unwrap();
        assert_eq!(snapshot.menus[3].stock, 12);
    }

    #[test]
    fn test_autosave_off_leaves_changes_pending() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir);
        session.login("manager", "manager123").unwrap();

        let restock = commands::parse("/restock Latte 2").unwrap();
        session.execute(&restock).unwrap();
        autosave(&mut session, &opts("manager", "manager123"), &restock);
        assert!(session.is_dirty());
        assert!(!dir.path().join("data.json").exists());
    }

    #[test]
    fn test_password_mask() {
        let mut mask = PasswordMask::default();
        assert_eq!(mask.highlight("kopi", 4), "kopi");
        assert!(!mask.highlight_char("kopi", 4, CmdKind::Other));

        mask.masking = true;
        assert_eq!(mask.highlight("kopi é", 6), "******");
        assert!(mask.highlight_char("kopi", 4, CmdKind::Other));
        assert!(!mask.highlight_char("kopi", 4, CmdKind::MoveCursor));
    }
}
