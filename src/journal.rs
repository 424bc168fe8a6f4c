//! Append-only JSONL journal of session events.
//!
//! One file per session, one JSON object per line, flushed after every
//! event. Credentials are never written.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct Journal {
    pub path: Option<PathBuf>,
    session_id: String,
    file: Option<File>,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Journal {
    pub fn new(path: &Path, session_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: Some(path.to_path_buf()),
            session_id: session_id.to_string(),
            file: Some(file),
        })
    }

    /// A journal that records nothing
    pub fn disabled(session_id: &str) -> Self {
        Self {
            path: None,
            session_id: session_id.to_string(),
            file: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    pub fn session_start(&mut self, data_file: &Path, menu_items: usize) -> Result<()> {
        self.log(
            "session_start",
            serde_json::json!({ "data_file": data_file, "menu_items": menu_items }),
        )
    }

    pub fn login_ok(&mut self, username: &str, role: &str) -> Result<()> {
        self.log(
            "login_ok",
            serde_json::json!({ "username": username, "role": role }),
        )
    }

    pub fn login_failed(&mut self, username: &str) -> Result<()> {
        self.log("login_failed", serde_json::json!({ "username": username }))
    }

    pub fn order_started(&mut self, username: &str) -> Result<()> {
        self.log("order_started", serde_json::json!({ "username": username }))
    }

    pub fn order_line(
        &mut self,
        item: &str,
        quantity: u64,
        unit_price: u64,
        remaining_stock: u64,
    ) -> Result<()> {
        self.log(
            "order_line",
            serde_json::json!({
                "item": item,
                "quantity": quantity,
                "unit_price": unit_price,
                "remaining_stock": remaining_stock,
            }),
        )
    }

    pub fn stock_added(&mut self, item: &str, amount: u64, stock: u64) -> Result<()> {
        self.log(
            "stock_added",
            serde_json::json!({ "item": item, "amount": amount, "stock": stock }),
        )
    }

    pub fn menu_added(&mut self, item: &str, price: u64, stock: u64) -> Result<()> {
        self.log(
            "menu_added",
            serde_json::json!({ "item": item, "price": price, "stock": stock }),
        )
    }

    pub fn menu_removed(&mut self, item: &str, total_sales: u64) -> Result<()> {
        self.log(
            "menu_removed",
            serde_json::json!({ "item": item, "total_sales": total_sales }),
        )
    }

    pub fn password_changed(&mut self, username: &str) -> Result<()> {
        self.log(
            "password_changed",
            serde_json::json!({ "username": username }),
        )
    }

    pub fn daily_report(&mut self, date: NaiveDate, units: u64, revenue: u64) -> Result<()> {
        self.log(
            "daily_report",
            serde_json::json!({ "date": date, "units": units, "revenue": revenue }),
        )
    }

    pub fn command_failed(&mut self, command: &str, code: &str) -> Result<()> {
        self.log(
            "command_failed",
            serde_json::json!({ "command": command, "code": code }),
        )
    }

    pub fn snapshot_saved(&mut self, path: &Path) -> Result<()> {
        self.log("snapshot_saved", serde_json::json!({ "path": path }))
    }

    pub fn snapshot_save_failed(&mut self, path: &Path, error: &str) -> Result<()> {
        self.log(
            "snapshot_save_failed",
            serde_json::json!({ "path": path, "error": error }),
        )
    }

    pub fn session_end(&mut self, saved: bool) -> Result<()> {
        self.log("session_end", serde_json::json!({ "saved": saved }))
    }
}
