//! Interactive session: a read-eval loop over a single [`ActionCoordinator`].
//!
//! Row clicks (`open`, `rm ID`) go through the [`TableView`], which forwards
//! them on the coordinator's row channel; the loop drains that channel after
//! every command.

use std::path::PathBuf;
use std::sync::Arc;

use filereg_core::{
    ActionCoordinator, DetailView, FileEdits, FileId, FileStore, RowAction, SearchFilter,
    UploadForm,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::output::{self, ColorMode, Console, TableView};

const HELP: &str = "\
Commands:
  list                         re-fetch and show all files
  search [name=Q] [path=Q]     filter the table (no arguments clears)
  open ID                      show a file from the table
  save                         edit the open file
  close                        close the open file
  rm [ID]                      delete a file from the table, or the open file
  download [OUT]               download the open file
  upload FILE                  upload a local file
  retry                        resubmit the last failed upload
  actualize                    reconcile the registry with its storage
  help                         show this help
  quit                         leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    List,
    Search(SearchFilter),
    Open(FileId),
    Save,
    Close,
    Remove(Option<FileId>),
    Download(Option<PathBuf>),
    Upload(PathBuf),
    Retry,
    Actualize,
    Help,
    Quit,
}

fn parse_id(arg: Option<&str>) -> Result<FileId, String> {
    let arg = arg.ok_or_else(|| "missing file id".to_string())?;
    arg.parse()
        .map_err(|_| format!("invalid file id: {}", arg))
}

/// Parse one line of shell input.
pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(ShellCommand::Empty);
    };
    let rest: Vec<&str> = words.collect();

    let cmd = match verb {
        "list" | "ls" => ShellCommand::List,
        "search" => {
            let mut name = String::new();
            let mut path = String::new();
            for arg in &rest {
                match arg.split_once('=') {
                    Some(("name", q)) => name = q.to_string(),
                    Some(("path", q)) => path = q.to_string(),
                    Some((key, _)) => return Err(format!("unknown search field: {}", key)),
                    None => name = arg.to_string(),
                }
            }
            ShellCommand::Search(SearchFilter::new(&name, &path))
        }
        "open" => ShellCommand::Open(parse_id(rest.first().copied())?),
        "save" => ShellCommand::Save,
        "close" => ShellCommand::Close,
        "rm" | "delete" => match rest.first().copied() {
            Some(arg) => ShellCommand::Remove(Some(parse_id(Some(arg))?)),
            None => ShellCommand::Remove(None),
        },
        "download" => ShellCommand::Download(rest.first().copied().map(PathBuf::from)),
        "upload" => match rest.first().copied() {
            Some(path) => ShellCommand::Upload(PathBuf::from(path)),
            None => return Err("usage: upload FILE".to_string()),
        },
        "retry" => ShellCommand::Retry,
        "actualize" => ShellCommand::Actualize,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command: {} (try `help`)", other)),
    };
    Ok(cmd)
}

pub struct Shell<'a, S> {
    coordinator: &'a ActionCoordinator<S>,
    view: Arc<TableView>,
    console: Arc<Console>,
    rows: UnboundedReceiver<RowAction>,
    color: ColorMode,
}

impl<'a, S: FileStore> Shell<'a, S> {
    pub fn new(
        coordinator: &'a ActionCoordinator<S>,
        view: Arc<TableView>,
        console: Arc<Console>,
        rows: UnboundedReceiver<RowAction>,
        color: ColorMode,
    ) -> Self {
        Self {
            coordinator,
            view,
            console,
            rows,
            color,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        // Failures are already shown to the user; the shell keeps going.
        let _ = self.coordinator.load().await;
        println!("Type `help` for commands.");

        loop {
            let prompt = match self.coordinator.selection() {
                Some(id) => format!("filereg [{}]> ", id),
                None => "filereg> ".to_string(),
            };
            let Some(line) = self.console.read_line(&prompt).await? else {
                println!();
                break;
            };
            let cmd = match parse_command(&line) {
                Ok(cmd) => cmd,
                Err(msg) => {
                    eprintln!("{}", msg);
                    continue;
                }
            };
            if cmd == ShellCommand::Quit {
                break;
            }
            self.execute(cmd).await?;
            self.drain_row_actions().await;
        }
        Ok(())
    }

    async fn execute(&mut self, cmd: ShellCommand) -> anyhow::Result<()> {
        match cmd {
            ShellCommand::Empty | ShellCommand::Quit => {}
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::List => {
                let _ = self.coordinator.load().await;
            }
            ShellCommand::Search(filter) => {
                self.coordinator.apply_search(filter);
            }
            ShellCommand::Open(id) => {
                if !self.view.click_open(id) {
                    eprintln!("file {} is not in the table", id);
                }
            }
            ShellCommand::Remove(Some(id)) => {
                if !self.view.click_delete(id) {
                    eprintln!("file {} is not in the table", id);
                }
            }
            ShellCommand::Remove(None) => {
                let _ = self.coordinator.delete_selected().await;
            }
            ShellCommand::Close => self.coordinator.dismiss_details(),
            ShellCommand::Save => self.save().await?,
            ShellCommand::Download(dest) => self.download(dest).await,
            ShellCommand::Upload(path) => self.upload(path).await?,
            ShellCommand::Retry => {
                if self.coordinator.retry_upload().await.is_none() {
                    eprintln!("no upload to retry");
                }
            }
            ShellCommand::Actualize => {
                let _ = self.coordinator.actualize().await;
            }
        }
        Ok(())
    }

    /// Run row clicks queued by the last command.
    async fn drain_row_actions(&mut self) {
        while let Ok(action) = self.rows.try_recv() {
            let opened = matches!(action, RowAction::OpenDetails(_));
            if self.coordinator.dispatch(action).await.is_ok()
                && opened
                && let DetailView::Open { record } = self.coordinator.detail()
            {
                let mut out = std::io::stdout().lock();
                if let Err(e) = output::write_details(&mut out, &record, self.color) {
                    tracing::warn!(error = %e, "failed to print file details");
                }
            }
        }
    }

    /// Edit the open file's inputs, pre-filled from the record, then save.
    async fn save(&self) -> anyhow::Result<()> {
        let DetailView::Open { record } = self.coordinator.detail() else {
            // Reports the missing selection.
            let _ = self.coordinator.save_changes(&FileEdits::default()).await;
            return Ok(());
        };
        let current = FileEdits::from_record(&record);
        let edits = FileEdits {
            name: self.console.read_with_default("name", &current.name).await?,
            path: self.console.read_with_default("path", &current.path).await?,
            comment: self
                .console
                .read_with_default("comment", &current.comment)
                .await?,
        };
        let _ = self.coordinator.save_changes(&edits).await;
        Ok(())
    }

    async fn download(&self, dest: Option<PathBuf>) {
        let dest = dest.or_else(|| {
            self.coordinator
                .detail()
                .record()
                .map(output::default_download_path)
        });
        // Without an open file the download reports the missing selection.
        let dest = dest.unwrap_or_else(|| PathBuf::from("download.bin"));
        if let Ok(bytes) = self.coordinator.download(&dest).await {
            println!(
                "Saved {} to {}",
                output::format_size(bytes),
                dest.display()
            );
        }
    }

    async fn upload(&self, path: PathBuf) -> anyhow::Result<()> {
        let form = match UploadForm::read_from(&path).await {
            Ok(form) => form,
            Err(e) => {
                eprintln!("cannot read {}: {}", path.display(), e);
                return Ok(());
            }
        };
        self.coordinator.open_upload();
        let form = UploadForm {
            name: self.console.read_with_default("name", &form.name).await?,
            path: self.console.read_with_default("path", &form.path).await?,
            comment: self.console.read_with_default("comment", "").await?,
            ..form
        };
        if let Ok(record) = self.coordinator.upload_file(form).await {
            println!("Uploaded {} as file {}", record.display_name(), record.id);
        }
        Ok(())
    }
}
