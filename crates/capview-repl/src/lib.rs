//! capview REPL: drive one confined view interactively.
//!
//! Each line is handled the way a file-transfer engine would handle the
//! matching protocol command, through the same [`FileSystemView`] and
//! [`FileHandle`] contracts:
//!
//! - `pwd`, `cd`, `ls`, `stat`, `cat`: navigation and reads
//! - `put`, `mkdir`, `rm`: writes; `put` fires the upload hook afterwards
//! - `probe`: the writability probe on its own
//! - `describe`: hex dump of the node's serialized descriptor
//! - Meta-commands: `/help`, `/quit`

pub mod config;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use capview_kernel::{
    CapabilityFile, CapabilityStore, CapabilityView, FileHandle, FileSystemView, IndexRefresher,
    LoggingRefresher, Request, Session, SessionHook, UploadHook,
};
use capview_kernel::paths::CURRENT_DIR;

use crate::config::Config;

/// Command-line arguments for `capview`.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "capview", version, about = "Browse a directory through a confined capability view")]
pub struct Args {
    /// Confinement root (overrides the config file).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Config file to load instead of the default location.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Grant read-only access regardless of configuration.
    #[arg(long)]
    pub read_only: bool,
}

const HELP_TEXT: &str = r#"capview REPL

Commands:
  pwd                     Print the working directory
  cd <dir>                Change directory (never leaves the root)
  ls [path]               List a directory
  stat <path>             Show metadata as JSON
  cat <path>              Print a file
  put <local> <remote>    Upload a local file
  mkdir <path>            Create a directory
  rm <path>               Delete a file or empty directory
  probe <path>            Test whether an upload to <path> would succeed
  describe <path>         Hex dump of the serialized descriptor

Meta:
  /help, /h, /?           Show this help
  /quit, /q, /exit        Exit"#;

/// REPL state: one view, one hook, one session.
pub struct Repl {
    view: CapabilityView,
    hook: UploadHook,
    session: Session,
    done: bool,
}

impl Repl {
    /// Create a REPL over `store`, confined to `root`.
    pub fn new(store: Arc<dyn CapabilityStore>, root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_refresher(store, root, Arc::new(LoggingRefresher))
    }

    /// Like [`new`](Self::new), reporting uploads to `refresher`.
    pub fn with_refresher(
        store: Arc<dyn CapabilityStore>,
        root: impl Into<PathBuf>,
        refresher: Arc<dyn IndexRefresher>,
    ) -> Result<Self> {
        let root = root.into();
        let view = CapabilityView::new(store, root.clone()).context("creating view")?;
        let hook = UploadHook::new(root, refresher);
        Ok(Self {
            view,
            hook,
            session: Session {
                id: u64::from(std::process::id()),
                user: std::env::var("USER").ok(),
            },
            done: false,
        })
    }

    /// Create a REPL over the local filesystem as `config` describes.
    pub fn from_config(config: &Config, read_only: bool) -> Result<Self> {
        let root = config.resolved_root()?;
        let store = config.build_store(&root, read_only);
        tracing::info!(root = %root.display(), grants = store.grants().grants().len(), "view ready");
        Self::new(Arc::new(store), root)
    }

    pub fn view(&self) -> &CapabilityView {
        &self.view
    }

    /// Whether `/quit` has been entered.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Process a single line of input.
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        let trimmed = line.trim();

        if trimmed.starts_with('/') {
            return self.handle_meta_command(trimmed);
        }
        if trimmed.is_empty() {
            return Ok(None);
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let (command, args) = match parts.split_first() {
            Some((command, args)) => (*command, args),
            None => return Ok(None),
        };

        match command {
            "pwd" => Ok(Some(self.view.current_dir().to_string())),
            "cd" => self.cd(args),
            "ls" => match args.first() {
                Some(path) => self.ls(&self.absolute(path)),
                None => self.ls(CURRENT_DIR),
            },
            "stat" => self.stat(&self.absolute(one_arg(command, args)?)),
            "cat" => self.cat(&self.absolute(one_arg(command, args)?)),
            "put" => match args {
                [local, remote] => self.put(Path::new(local), &self.absolute(remote)),
                _ => bail!("usage: put <local> <remote>"),
            },
            "mkdir" => {
                let path = self.absolute(one_arg(command, args)?);
                Ok(report(self.view.get_file(&path).mkdir(), "mkdir", &path))
            }
            "rm" => {
                let path = self.absolute(one_arg(command, args)?);
                Ok(report(self.view.get_file(&path).delete(), "rm", &path))
            }
            "probe" => {
                let path = self.absolute(one_arg(command, args)?);
                let verdict = if self.view.get_file(&path).is_writable() { "writable" } else { "not writable" };
                Ok(Some(format!("{path}: {verdict}")))
            }
            "describe" => self.describe(&self.absolute(one_arg(command, args)?)),
            _ => Ok(Some(format!("Unknown command: {command}\nType /help for available commands."))),
        }
    }

    /// Virtual path for a command argument; relative arguments are taken
    /// from the working directory.
    fn absolute(&self, arg: &str) -> String {
        if arg.starts_with('/') {
            return arg.to_string();
        }
        let cwd = self.view.current_dir();
        if cwd.ends_with('/') {
            format!("{cwd}{arg}")
        } else {
            format!("{cwd}/{arg}")
        }
    }

    fn cd(&mut self, args: &[&str]) -> Result<Option<String>> {
        let dir = args.first().copied().unwrap_or("/");
        if self.view.change_working_directory(dir) {
            Ok(None)
        } else {
            Ok(Some(format!("cd: {dir}: no such directory")))
        }
    }

    fn ls(&self, path: &str) -> Result<Option<String>> {
        let target = self.view.get_file(path);
        let Some(mut children) = target.list_files() else {
            if target.is_file() {
                return Ok(Some(format_entry(&target)));
            }
            return Ok(Some(format!("ls: {path}: not a directory")));
        };

        if children.is_empty() {
            return Ok(None);
        }
        children.sort_by_key(|child| child.name());
        let lines: Vec<String> = children.iter().map(format_entry).collect();
        Ok(Some(lines.join("\n")))
    }

    fn stat(&self, path: &str) -> Result<Option<String>> {
        let file = self.view.get_file(path);
        if !file.does_exist() {
            return Ok(Some(format!("stat: {path}: not found")));
        }
        let report = serde_json::json!({
            "path": file.absolute_path(),
            "uri": file.uri().as_str(),
            "name": file.name(),
            "directory": file.is_directory(),
            "size": file.size(),
            "modified": format_millis(file.last_modified()),
            "readable": file.is_readable(),
            "writable": file.is_writable(),
            "removable": file.is_removable(),
            "hidden": file.is_hidden(),
            "owner": file.owner_name(),
            "group": file.group_name(),
            "links": file.link_count(),
        });
        Ok(Some(serde_json::to_string_pretty(&report)?))
    }

    fn cat(&self, path: &str) -> Result<Option<String>> {
        let mut reader = self
            .view
            .get_file(path)
            .create_input_stream(0)
            .with_context(|| format!("cat: {path}"))?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).with_context(|| format!("cat: {path}"))?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn put(&self, local: &Path, remote: &str) -> Result<Option<String>> {
        let data = std::fs::read(local).with_context(|| format!("reading {}", local.display()))?;

        let file = self.view.get_file(remote);
        let mut writer = file
            .create_output_stream(0)
            .with_context(|| format!("put: {remote}"))?;
        writer.write_all(&data).with_context(|| format!("put: {remote}"))?;
        writer.flush().with_context(|| format!("put: {remote}"))?;
        drop(writer);

        let outcome = self.hook.on_upload_end(&self.session, &Request::new("STOR", remote));
        tracing::debug!(?outcome, remote, "upload hook");
        Ok(Some(format!("{} bytes -> {}", data.len(), file.absolute_path())))
    }

    fn describe(&self, path: &str) -> Result<Option<String>> {
        let unified = self.view.get_file(path).to_unified();
        let bytes = unified.to_bytes()?;

        let mut output = format!("{unified}\n{} bytes", bytes.len());
        for (i, chunk) in bytes.chunks(16).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            output.push_str(&format!("\n{:08x}  {}", i * 16, hex.join(" ")));
        }
        Ok(Some(output))
    }

    fn handle_meta_command(&mut self, cmd: &str) -> Result<Option<String>> {
        let command = cmd.split_whitespace().next().unwrap_or("");

        match command {
            "/quit" | "/q" | "/exit" => {
                self.done = true;
                Ok(None)
            }
            "/help" | "/h" | "/?" => Ok(Some(HELP_TEXT.to_string())),
            _ => Ok(Some(format!("Unknown command: {command}\nType /help for available commands."))),
        }
    }
}

fn one_arg<'a>(command: &str, args: &[&'a str]) -> Result<&'a str> {
    match args {
        [arg] => Ok(*arg),
        _ => bail!("usage: {command} <path>"),
    }
}

fn report(ok: bool, command: &str, path: &str) -> Option<String> {
    if ok {
        None
    } else {
        Some(format!("{command}: {path}: failed"))
    }
}

/// `drw  1234  2024-01-31 12:00  name`
fn format_entry(file: &CapabilityFile) -> String {
    let kind = if file.is_directory() { 'd' } else { '-' };
    let read = if file.is_readable() { 'r' } else { '-' };
    let mut name = file.name();
    if file.is_directory() {
        name.push('/');
    }
    format!("{kind}{read} {:>10}  {}  {name}", file.size(), format_millis(file.last_modified()))
}

fn format_millis(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(at) if millis > 0 => at.format("%Y-%m-%d %H:%M").to_string(),
        _ => "-".to_string(),
    }
}

/// Run the interactive REPL.
pub fn run(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    if args.root.is_some() {
        config.root = args.root;
    }

    let mut repl = Repl::from_config(&config, args.read_only)?;

    println!("capview v{} rooted at {}", env!("CARGO_PKG_VERSION"), repl.view().root().display());
    println!("Type /help for commands, /quit to exit.\n");

    let mut rl: Editor<(), DefaultHistory> = Editor::new().context("Failed to create editor")?;

    let history_path = config.history.then(|| config::data_dir().join("history.txt"));
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    while !repl.is_done() {
        let prompt = format!("capview:{}> ", repl.view().current_dir());

        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                match repl.process_line(&line) {
                    Ok(Some(output)) => println!("{output}"),
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = rl.save_history(path);
    }

    Ok(())
}
