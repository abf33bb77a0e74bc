//! Optional stderr diagnostics.

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_DIRECTIVES: &str = "aviutl2_plugin=info,aviutl2_example_plugin=info";

static INIT: Once = Once::new();

/// Installs the subscriber once; a subscriber the host process already set wins.
pub(crate) fn init() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init();
        if installed.is_err() {
            tracing::debug!("global subscriber already installed");
        }
    });
}
