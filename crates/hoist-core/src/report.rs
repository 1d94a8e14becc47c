//! Failure reporting to the supervising process.
//!
//! A run ends in exactly one of two states. [`Terminal::Success`] emits nothing and exits 0.
//! [`Terminal::Failed`] delivers one `{message, stack}` JSON line and exits 1. Errors and
//! panics (including panics re-raised from relocation workers) both land in `Failed`.

use std::any::Any;
use std::backtrace::Backtrace;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::error;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Location and backtrace of the most recent panic, captured by the hook.
static LAST_PANIC: Mutex<Option<String>> = Mutex::new(None);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub message: String,
    pub stack: String,
}

impl FailureReport {
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        let message = err.to_string();
        let stack = format!("{err:?}");
        Self {
            message: non_empty(message, "install failed"),
            stack,
        }
    }

    fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|msg| (*msg).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "installer panicked".to_string());
        let captured = LAST_PANIC
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .unwrap_or_default();
        let stack = if captured.is_empty() {
            format!("panic: {message}")
        } else {
            format!("panic: {message}\n{captured}")
        };
        Self {
            message: non_empty(message, "installer panicked"),
            stack,
        }
    }
}

fn non_empty(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Success,
    Failed(FailureReport),
}

impl Terminal {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => EXIT_SUCCESS,
            Self::Failed(_) => EXIT_FAILURE,
        }
    }

    /// Deliver the failure (if any) and return the exit code to use.
    pub fn report_to(&self, sink: &mut dyn ReportSink) -> i32 {
        if let Self::Failed(report) = self {
            if let Err(err) = sink.deliver(report) {
                error!(%err, message = %report.message, "failed to deliver failure report");
            }
        }
        self.exit_code()
    }
}

/// Channel to the supervising process.
pub trait ReportSink {
    fn deliver(&mut self, report: &FailureReport) -> io::Result<()>;
}

/// Writes each report as one line of JSON.
#[derive(Debug)]
pub struct JsonLineSink<W> {
    writer: W,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLineSink<io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ReportSink for JsonLineSink<W> {
    fn deliver(&mut self, report: &FailureReport) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Route panic details into the next failure report instead of stderr.
///
/// The hook records the panic location and a backtrace; [`supervise`] picks them up when the
/// unwind reaches it.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "<unknown>".to_string());
        let thread = std::thread::current()
            .name()
            .unwrap_or("<unnamed>")
            .to_string();
        let captured = format!(
            "panicked at {location} (thread '{thread}')\n{}",
            Backtrace::force_capture()
        );
        error!(%location, thread = %thread, "installer panicked");
        if let Ok(mut slot) = LAST_PANIC.lock() {
            *slot = Some(captured);
        }
    }));
}

/// Run `pipeline` and fold every way it can end into a [`Terminal`].
pub fn supervise<F>(pipeline: F) -> Terminal
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(pipeline)) {
        Ok(Ok(())) => Terminal::Success,
        Ok(Err(err)) => {
            error!(error = %err, "install failed");
            Terminal::Failed(FailureReport::from_error(&err))
        }
        Err(payload) => Terminal::Failed(FailureReport::from_panic(payload.as_ref())),
    }
}
