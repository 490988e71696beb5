//! logging.rs
//!
//! Tracing setup: bare messages on stderr plus a timestamped, size-rotated
//! log file. The returned [`Logging`] handle is owned by `main`; dropping it
//! flushes the file.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::filter::{EnvFilter, FilterFn, filter_fn};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

pub const MAX_LOG_BYTES: u64 = 25_000_000;
pub const LOG_BACKUPS: usize = 3;

const DEFAULT_DIRECTIVE: &str = "pypistats_notify=debug";

/// Events with this target reach the log file only. Used where the message is
/// already printed to stderr directly.
pub const FILE_TARGET: &str = "pypistats_notify::file";

/// Keeps the log file alive for the duration of the run.
pub struct Logging {
    file: Option<RotatingFile>,
}

impl Logging {
    pub fn disabled() -> Self {
        Self { file: None }
    }
}

impl Drop for Logging {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            let _ = file.make_writer().flush();
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default level.
pub fn init(log_path: &Path) -> Result<Logging> {
    let file = RotatingFile::open(log_path, MAX_LOG_BYTES, LOG_BACKUPS)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let console = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_filter(console_filter());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file.clone())
        .with_ansi(false)
        .event_format(FileFormat);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(Logging { file: Some(file) })
}

fn console_filter() -> FilterFn {
    filter_fn(reaches_console as fn(&Metadata<'_>) -> bool)
}

fn reaches_console(meta: &Metadata<'_>) -> bool {
    meta.target() != FILE_TARGET
}

/// `2026-10-16 09:30:00,123 DEBUG : message`
struct FileFormat;

impl<S, N> FormatEvent<S, N> for FileFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} {} : ",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Log file that rolls over to `<path>.1` .. `<path>.N` once it would exceed `max_bytes`.
#[derive(Clone)]
pub struct RotatingFile {
    inner: Arc<Mutex<RotatingInner>>,
}

struct RotatingInner {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFile {
    pub fn open(path: &Path, max_bytes: u64, backups: usize) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }

        let file = open_append(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            inner: Arc::new(Mutex::new(RotatingInner {
                path: path.to_path_buf(),
                file,
                size,
                max_bytes,
                backups,
            })),
        })
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = RotatingWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        // A panic while logging must not silence every later record.
        RotatingWriter(self.inner.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

pub struct RotatingWriter<'a>(MutexGuard<'a, RotatingInner>);

impl Write for RotatingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.file.flush()
    }
}

impl RotatingInner {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.max_bytes > 0 && self.size > 0 && self.size + buf.len() as u64 >= self.max_bytes {
            self.rotate()?;
        }

        let n = self.file.write(buf)?;
        self.size += n as u64;
        Ok(n)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups > 0 {
            for i in (1..self.backups).rev() {
                let from = backup_path(&self.path, i);
                if from.exists() {
                    let to = backup_path(&self.path, i + 1);
                    remove_if_exists(&to)?;
                    fs::rename(&from, &to)?;
                }
            }
            let first = backup_path(&self.path, 1);
            remove_if_exists(&first)?;
            fs::rename(&self.path, &first)?;
            self.file = open_append(&self.path)?;
        } else {
            self.file = File::create(&self.path)?;
        }

        self.size = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
