//! Logging setup shared by the poller daemon and the CLI.
//!
//! Each binary calls one init_* function once, before opening any channel.
//! Library code only emits events; it never installs a subscriber. Modules
//! pull in the level macros with `use crate::tracing::prelude::*`.

use std::env;
use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Initialize logging for the long-running poller.
///
/// Under systemd (JOURNAL_STREAM set) events go to journald; otherwise to
/// stdout at INFO unless RUST_LOG says otherwise.
pub fn init_journald_or_stdout() {
    if env::var("JOURNAL_STREAM").is_ok() {
        match tracing_journald::layer() {
            Ok(layer) => tracing_subscriber::registry()
                .with(layer.with_syslog_identifier("atlas-poller".into()))
                .init(),
            Err(e) => {
                use_writer(LevelFilter::INFO, std::io::stdout);
                error!("journald unavailable ({e}), logging to stdout.");
            }
        }
    } else {
        use_writer(LevelFilter::INFO, std::io::stdout);
    }
}

/// Initialize logging for one-shot CLI use.
///
/// Results are printed on stdout, so diagnostics go to stderr and default
/// to WARN.
pub fn init_stderr() {
    use_writer(LevelFilter::WARN, std::io::stderr);
}

fn use_writer<W>(default_level: LevelFilter, writer: W)
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_timer(LocalTimer),
        )
        .init();
}

// Local wall-clock time to the second. Poll results are minutes apart, so
// sub-second UTC stamps only add noise.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(time::macros::format_description!("[hour]:[minute]:[second]"))
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{stamp}")
    }
}
