use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use filereg_core::{FileId, FileRecord, Notice, RegistryView, RowHandlers, UserPrompt};
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

/// Print the file table.
pub fn write_table(w: &mut dyn Write, rows: &[FileRecord], color: ColorMode) -> std::io::Result<()> {
    if rows.is_empty() {
        writeln!(w, "No files.")?;
        return Ok(());
    }

    let header = format!(
        "{:>5}  {:<28}  {:>9}  {:<20}  {:<29}  {}",
        "ID", "NAME", "SIZE", "PATH", "CREATED", "COMMENT"
    );
    if color.enabled() {
        writeln!(w, "{}", header.bold())?;
    } else {
        writeln!(w, "{}", header)?;
    }

    for r in rows {
        writeln!(
            w,
            "{:>5}  {:<28}  {:>9}  {:<20}  {:<29}  {}",
            r.id,
            truncate(&r.display_name(), 28),
            format_size(r.size),
            truncate(&r.path, 20),
            truncate(&r.created_at, 29),
            truncate(r.comment_or_empty(), 40),
        )?;
    }

    let summary = format!("{} file(s)", rows.len());
    if color.enabled() {
        writeln!(w, "{}", summary.dimmed())?;
    } else {
        writeln!(w, "{}", summary)?;
    }
    Ok(())
}

/// Print one record as the detail view shows it.
pub fn write_details(w: &mut dyn Write, record: &FileRecord, color: ColorMode) -> std::io::Result<()> {
    let title = format!("File {}", record.id);
    if color.enabled() {
        writeln!(w, "{}", title.bold().cyan())?;
    } else {
        writeln!(w, "{}", title)?;
    }
    writeln!(w, "  Name:      {}", record.name)?;
    writeln!(w, "  Extension: {}", record.extension)?;
    writeln!(w, "  Size:      {}", format_size(record.size))?;
    writeln!(w, "  Path:      {}", record.path)?;
    writeln!(w, "  Created:   {}", record.created_at)?;
    writeln!(
        w,
        "  Updated:   {}",
        record.updated_at.as_deref().unwrap_or("never")
    )?;
    writeln!(w, "  Comment:   {}", record.comment_or_empty())?;
    Ok(())
}

/// Where a download lands when no output path is given: the record's name in
/// the working directory. Directory parts of the server-supplied name are
/// dropped; a name with nothing usable left falls back to `download-<id>`.
pub fn default_download_path(record: &FileRecord) -> PathBuf {
    let name = record.display_name();
    match Path::new(&name).file_name() {
        Some(base) => PathBuf::from(base),
        None => PathBuf::from(format!("download-{}", record.id)),
    }
}

/// Rows of the last rendered table and the handlers wired to them.
struct Rendered {
    handlers: RowHandlers,
    ids: Vec<FileId>,
}

/// [`RegistryView`] that prints the table to stdout.
///
/// Only rows of the most recent render can be clicked, the same way only
/// visible table rows carry handlers.
pub struct TableView {
    color: ColorMode,
    muted: AtomicBool,
    last: Mutex<Option<Rendered>>,
}

impl TableView {
    pub fn new(color: ColorMode) -> Self {
        Self {
            color,
            muted: AtomicBool::new(false),
            last: Mutex::new(None),
        }
    }

    /// Suppress printing while still tracking rendered rows.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// Click the open button of row `id`. Returns `false` if no such row is shown.
    pub fn click_open(&self, id: FileId) -> bool {
        self.with_row(id, |handlers| handlers.open_file_details(id))
    }

    /// Click the delete button of row `id`. Returns `false` if no such row is shown.
    pub fn click_delete(&self, id: FileId) -> bool {
        self.with_row(id, |handlers| handlers.delete_file(id))
    }

    fn with_row(&self, id: FileId, click: impl FnOnce(&RowHandlers)) -> bool {
        let last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match last.as_ref() {
            Some(rendered) if rendered.ids.contains(&id) => {
                click(&rendered.handlers);
                true
            }
            _ => false,
        }
    }
}

impl RegistryView for TableView {
    fn render(&self, rows: &[FileRecord], handlers: &RowHandlers) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Rendered {
            handlers: handlers.clone(),
            ids: rows.iter().map(|r| r.id).collect(),
        });
        if self.muted.load(Ordering::Relaxed) {
            return;
        }
        let mut out = std::io::stdout().lock();
        if let Err(e) = write_table(&mut out, rows, self.color) {
            tracing::warn!(error = %e, "failed to print file table");
        }
    }
}

/// Line-oriented stdin shared by the shell loop and confirmation prompts.
pub struct Console {
    lines: tokio::sync::Mutex<Lines<BufReader<Stdin>>>,
}

impl Console {
    pub fn new() -> Self {
        Self {
            lines: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Print `prompt` and read one line. `None` at end of input.
    pub async fn read_line(&self, prompt: &str) -> std::io::Result<Option<String>> {
        {
            let mut out = std::io::stdout().lock();
            write!(out, "{}", prompt)?;
            out.flush()?;
        }
        self.lines.lock().await.next_line().await
    }

    /// Ask for a value, keeping `current` when the answer is empty.
    pub async fn read_with_default(&self, label: &str, current: &str) -> std::io::Result<String> {
        let answer = self.read_line(&format!("{} [{}]: ", label, current)).await?;
        Ok(match answer {
            Some(a) if !a.trim().is_empty() => a.trim().to_string(),
            _ => current.to_string(),
        })
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// [`UserPrompt`] on the terminal: notices to stdout/stderr, confirmations on stdin.
pub struct ConsolePrompt {
    console: std::sync::Arc<Console>,
    color: ColorMode,
    assume_yes: bool,
}

impl ConsolePrompt {
    pub fn new(console: std::sync::Arc<Console>, color: ColorMode, assume_yes: bool) -> Self {
        Self {
            console,
            color,
            assume_yes,
        }
    }
}

impl UserPrompt for ConsolePrompt {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::Info(msg) => {
                if self.color.enabled() {
                    println!("{}", msg.green());
                } else {
                    println!("{}", msg);
                }
            }
            Notice::Error(msg) => {
                if self.color.enabled() {
                    eprintln!("{} {}", "error:".red().bold(), msg);
                } else {
                    eprintln!("error: {}", msg);
                }
            }
        }
    }

    fn confirm<'a>(&'a self, question: &'a str) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            if self.assume_yes {
                return true;
            }
            match self.console.read_line(&format!("{} [y/N] ", question)).await {
                Ok(Some(answer)) => is_yes(&answer),
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read confirmation");
                    false
                }
            }
        })
    }
}
