//! Telemetry helpers for structured logging and tracing.

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::fmt::format::{Format, Json, JsonFields, Writer};
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Initialize tracing/telemetry. Users can install their own subscriber; this
/// helper installs a default env-based subscriber if none is set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// A JSON event sink writing to a file, tagged with a logical name.
///
/// Opening never fails: if the destination cannot be created the problem is
/// reported on stderr and the sink writes to stderr instead.
///
/// ```rust,no_run
/// use prometheus_dispatch_pool::util::LogSink;
///
/// let sink = LogSink::open("/var/log/app/jobs.log", "jobs");
/// sink.in_scope(|| tracing::info!("sink ready"));
/// ```
pub struct LogSink {
    name: String,
    path: Option<PathBuf>,
    dispatch: Dispatch,
}

impl LogSink {
    /// Create `path` (and its parent directories) and build a sink on it.
    pub fn open(path: impl AsRef<Path>, name: impl Into<String>) -> Self {
        let path = path.as_ref();
        let name = name.into();

        let (writer, opened) = match create_file(path) {
            Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), Some(path.to_path_buf())),
            Err(e) => {
                eprintln!(
                    "log sink `{name}`: cannot open {}: {e}; falling back to stderr",
                    path.display()
                );
                (BoxMakeWriter::new(io::stderr), None)
            }
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let format = NamedJson {
            sink: name.clone(),
            inner: tracing_subscriber::fmt::format()
                .json()
                .with_file(true)
                .with_line_number(true),
        };
        let subscriber = tracing_subscriber::fmt()
            .fmt_fields(JsonFields::new())
            .event_format(format)
            .with_env_filter(filter)
            .with_writer(writer)
            .finish();

        Self {
            name,
            path: opened,
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Logical name attached to every event.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File being written, or `None` when the sink fell back to stderr.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The underlying dispatcher, for callers composing their own scopes.
    #[must_use]
    pub const fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this sink as the current subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Install this sink as the process-wide subscriber.
    ///
    /// Returns `false` if a global subscriber was already set.
    pub fn install_global(self) -> bool {
        tracing::dispatcher::set_global_default(self.dispatch).is_ok()
    }
}

/// JSON event format with a top-level `sink` field on every line.
struct NamedJson {
    sink: String,
    inner: Format<Json, SystemTime>,
}

impl<S, N> FormatEvent<S, N> for NamedJson
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut line = String::new();
        self.inner.format_event(ctx, Writer::new(&mut line), event)?;

        let mut value: serde_json::Value =
            serde_json::from_str(line.trim_end()).map_err(|_| fmt::Error)?;
        if let Some(object) = value.as_object_mut() {
            object.insert("sink".into(), self.sink.clone().into());
        }
        writeln!(writer, "{value}")
    }
}

fn create_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    File::create(path)
}
