//! Tracing setup for the bot process.
//!
//! Logs go to stdout through a formatting layer. The level defaults to
//! `info` for this crate and `warn` for the Discord libraries, and can be
//! overridden with `RUST_LOG`.

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Directives applied before `RUST_LOG` is read
const DEFAULT_DIRECTIVES: &[&str] = &["gridiron_recap=info", "poise=warn", "serenity=warn"];

/// Build the env filter used by [`init`]
pub fn build_filter(extra: Option<&str>) -> EnvFilter {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(extra.unwrap_or_default());

    for directive in DEFAULT_DIRECTIVES {
        // RUST_LOG entries for the same target win over the defaults
        let target = directive.split('=').next().unwrap_or_default();
        if extra.is_some_and(|e| e.contains(target)) {
            continue;
        }
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    filter
}

/// Install the global subscriber
pub fn init() {
    let rust_log = std::env::var("RUST_LOG").ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(build_filter(rust_log.as_deref()))
        .init();
}
