//! Tracing setup
//!
//! The subscriber is installed before configuration is read so that config
//! file problems are visible. Its filter starts from `RUST_LOG` or the
//! command-line level and is switched to the configured level afterwards.

use tracing::{warn, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Handle for changing the active log filter after startup
pub struct LogLevelHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    /// `RUST_LOG` was set; it wins over any configured level
    from_env: bool,
}

impl LogLevelHandle {
    /// Switch to the configured level unless `RUST_LOG` is in charge
    pub fn apply_configured(&self, level: &str) {
        if !self.from_env {
            self.set_level(level);
        }
    }

    pub fn set_level(&self, level: &str) {
        match EnvFilter::try_new(level) {
            Ok(filter) => {
                if let Err(e) = self.handle.reload(filter) {
                    warn!("Could not change log level: {}", e);
                }
            }
            Err(e) => warn!("Invalid log level '{}': {}", level, e),
        }
    }
}

/// Build a fmt subscriber with a reloadable filter
pub fn build_subscriber<W>(filter: EnvFilter, writer: W) -> (impl Subscriber + Send + Sync + 'static, reload::Handle<EnvFilter, Registry>)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));
    (subscriber, handle)
}

/// Install the global subscriber
///
/// `RUST_LOG` wins; otherwise `initial_level` (from the command line or
/// `BOOKZ_LOG`) is used until the configuration has been read.
pub fn init_tracing(initial_level: &str) -> LogLevelHandle {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (
            EnvFilter::try_new(initial_level).unwrap_or_else(|_| EnvFilter::new("info")),
            false,
        ),
    };

    let (subscriber, handle) = build_subscriber(filter, std::io::stdout);
    subscriber.init();

    LogLevelHandle { handle, from_env }
}
