//! Session context: owns the stores for one operator's run of the program
//! and executes commands against them.
//!
//! State machine: `LoggedOut -> Authenticating -> Active(role) -> Closed`.
//! There is no way back to `Authenticating` once a user is logged in.

use crate::accounts::{AccountStore, Role};
use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::commands::{self, Command};
use crate::error::{PosError, PosResult};
use crate::journal::Journal;
use crate::ledger::{Ledger, LineOutcome, OrderTotal};
use crate::reporting;
use crate::snapshot::Snapshot;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Authenticating,
    Active(Role),
    Closed,
}

/// What the presentation layer should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Message(String),
    /// A fresh order was started; prompt for a quantity of each named item
    OrderWalk(Vec<String>),
    Exit,
}

pub struct Session {
    catalog: Catalog,
    accounts: AccountStore,
    ledger: Ledger,
    clock: Box<dyn Clock>,
    journal: Journal,
    data_file: PathBuf,
    state: SessionState,
    username: Option<String>,
    dirty: bool,
    save_on_drop: bool,
}

impl Session {
    pub fn new(snapshot: Snapshot, data_file: &Path, clock: Box<dyn Clock>, journal: Journal) -> Self {
        let (accounts, catalog) = snapshot.into_stores();
        Self {
            catalog,
            accounts,
            ledger: Ledger::new(),
            clock,
            journal,
            data_file: data_file.to_path_buf(),
            state: SessionState::LoggedOut,
            username: None,
            dirty: false,
            save_on_drop: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        match self.state {
            SessionState::Active(role) => Some(role),
            _ => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn journal_mut(&mut self) -> &mut Journal {
        &mut self.journal
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Unsaved changes exist
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Save unsaved changes when the session is dropped without `close`
    pub fn set_save_on_drop(&mut self, enabled: bool) {
        self.save_on_drop = enabled;
    }

    pub fn begin_login(&mut self) {
        if self.state == SessionState::LoggedOut {
            self.state = SessionState::Authenticating;
        }
    }

    pub fn login(&mut self, username: &str, password: &str) -> PosResult<Role> {
        match self.state {
            SessionState::LoggedOut | SessionState::Authenticating => {}
            _ => return Err(PosError::Usage("already logged in".to_string())),
        }
        self.state = SessionState::Authenticating;

        match self.accounts.authenticate(username, password) {
            Ok(user) => {
                let role = user.role;
                self.username = Some(user.username.clone());
                self.state = SessionState::Active(role);
                let _ = self.journal.login_ok(username, role.as_str());
                Ok(role)
            }
            Err(e) => {
                let _ = self.journal.login_failed(username);
                Err(e)
            }
        }
    }

    /// Run one command for the logged-in user. Failures are journaled.
    pub fn execute(&mut self, cmd: &Command) -> PosResult<Outcome> {
        let result = self.run(cmd);
        if let Err(e) = &result {
            let _ = self.journal.command_failed(cmd.name(), e.code());
        }
        result
    }

    fn run(&mut self, cmd: &Command) -> PosResult<Outcome> {
        let role = self.role().ok_or(PosError::NotLoggedIn)?;
        if !cmd.allowed_for(role) {
            return Err(PosError::Forbidden {
                command: cmd.name().to_string(),
                role: role.to_string(),
            });
        }

        let msg = match cmd {
            Command::Best => match reporting::best_seller(&self.catalog) {
                Some(item) => format!(
                    "{} is the best seller with {} sold.",
                    item.name, item.total_sales
                ),
                None => "No menu items to rank yet.".to_string(),
            },
            Command::Stock => {
                let lines: Vec<String> = reporting::stock_report(&self.catalog)
                    .iter()
                    .map(|(name, stock)| format!("{}: {} pcs", name, stock))
                    .collect();
                if lines.is_empty() {
                    "The menu is empty.".to_string()
                } else {
                    lines.join("\n")
                }
            }
            Command::Price(name) => {
                let price = reporting::price_of(&self.catalog, name)?;
                format!("{} costs {} per serving.", name, price)
            }
            Command::Order => {
                self.start_order();
                let names = self.catalog.items().iter().map(|m| m.name.clone()).collect();
                return Ok(Outcome::OrderWalk(names));
            }
            Command::NewOrder => {
                self.start_order();
                "Started a new order.".to_string()
            }
            Command::Add { item, quantity } => match self.add_line(item, *quantity)? {
                LineOutcome::Added(line) => format!(
                    "Added {} x {} ({}).",
                    line.quantity,
                    line.item,
                    line.subtotal()
                ),
                LineOutcome::Skipped => format!("Skipped {}.", item),
            },
            Command::Total => match self.ledger.total() {
                OrderTotal::Amount(total) => format!("Order total is {}.", total),
                OrderTotal::NoOrder => "No order has been placed yet.".to_string(),
            },
            Command::Restock { item, amount } => {
                let stock = self.catalog.add_stock(item, *amount)?;
                self.dirty = true;
                let _ = self.journal.stock_added(item, *amount as u64, stock);
                format!("Added {} to {}; stock is now {}.", amount, item, stock)
            }
            Command::MenuAdd { name, price, stock } => {
                let item = self.catalog.add(name, *price, *stock)?.clone();
                self.dirty = true;
                let _ = self.journal.menu_added(&item.name, item.price, item.stock);
                format!(
                    "Added {} at {} with {} in stock.",
                    item.name, item.price, item.stock
                )
            }
            Command::MenuRemove(name) => {
                let item = self.catalog.remove(name)?;
                self.dirty = true;
                let _ = self.journal.menu_removed(&item.name, item.total_sales);
                format!("Removed {}.", item.name)
            }
            Command::Sales => {
                let mut out = String::from("Sales history:");
                for (name, sold) in reporting::sales_history(&self.catalog) {
                    let _ = write!(out, "\n{}: {}", name, sold);
                }
                out
            }
            Command::Today => {
                let summary = reporting::daily_total(&self.catalog, self.clock.today());
                let _ = self
                    .journal
                    .daily_report(summary.date, summary.units, summary.revenue);
                format!(
                    "Sales for {}: {} items, revenue {} ({} items all time).",
                    summary.date.format("%Y-%m-%d"),
                    summary.units,
                    summary.revenue,
                    reporting::lifetime_units(&self.catalog)
                )
            }
            Command::Users => self
                .accounts
                .users()
                .iter()
                .map(|u| {
                    let note = if u.is_hashed() { "" } else { ", plaintext password" };
                    format!("{} ({}{})", u.username, u.role, note)
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Command::Passwd(password) => {
                let username = self.username.clone().ok_or(PosError::NotLoggedIn)?;
                self.accounts.set_password(&username, password)?;
                self.dirty = true;
                let _ = self.journal.password_changed(&username);
                "Password changed.".to_string()
            }
            Command::Save => {
                self.save()?;
                format!("Saved to {}.", self.data_file.display())
            }
            Command::WhoAmI => format!(
                "{} ({})\nSession: {}\nData file: {}",
                self.username.as_deref().unwrap_or("?"),
                role,
                self.journal.session_id(),
                self.data_file.display()
            ),
            Command::Help => help_text(role),
            Command::Exit => return Ok(Outcome::Exit),
        };
        Ok(Outcome::Message(msg))
    }

    /// Begin a fresh order; earlier committed lines stay committed
    pub fn start_order(&mut self) {
        self.ledger.new_order();
        let user = self.username.clone().unwrap_or_default();
        let _ = self.journal.order_started(&user);
    }

    /// Add a line to the current order, committing it against the catalog
    pub fn add_line(&mut self, item: &str, quantity: i64) -> PosResult<LineOutcome> {
        let today = self.clock.today();
        let outcome = self
            .ledger
            .add_line(&mut self.catalog, item, quantity, today)?;
        if let LineOutcome::Added(line) = &outcome {
            self.dirty = true;
            let remaining = self
                .catalog
                .find_by_name(&line.item)
                .map(|m| m.stock)
                .unwrap_or(0);
            let _ = self
                .journal
                .order_line(&line.item, line.quantity, line.unit_price, remaining);
        }
        Ok(outcome)
    }

    /// Write the snapshot; clears the dirty flag on success
    pub fn save(&mut self) -> PosResult<()> {
        let snapshot = Snapshot::from_stores(&self.accounts, &self.catalog);
        match snapshot.save(&self.data_file) {
            Ok(()) => {
                self.dirty = false;
                let _ = self.journal.snapshot_saved(&self.data_file);
                Ok(())
            }
            Err(e) => {
                let _ = self
                    .journal
                    .snapshot_save_failed(&self.data_file, &e.to_string());
                Err(e)
            }
        }
    }

    /// End the session; `saved` records whether the final save succeeded
    pub fn close(&mut self, saved: bool) {
        self.state = SessionState::Closed;
        let _ = self.journal.session_end(saved);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.save_on_drop && self.dirty && self.state != SessionState::Closed {
            if let Err(e) = self.save() {
                eprintln!("Warning: unsaved changes lost: {}", e);
            }
            self.close(!self.dirty);
        }
    }
}

pub fn help_text(role: Role) -> String {
    let mut out = format!("Commands ({}):", role);
    for spec in commands::available(role) {
        let _ = write!(out, "\n  {:<34} - {}", spec.usage, spec.about);
    }
    out
}
