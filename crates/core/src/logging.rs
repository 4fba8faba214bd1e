//! Tracing setup shared by the binaries.
//!
//! `RUST_LOG` wins when set. Otherwise the level comes from the verbosity
//! count (`0` info, `1` debug, `2+` trace) for the riskscan crates only.
//! `RUST_LOG_FORMAT=json` switches to JSON lines. Output goes to stderr so it
//! never mixes with reports printed on stdout.

use tracing_subscriber::EnvFilter;

pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "riskscan=info,riskscan_core=info",
        1 => "riskscan=debug,riskscan_core=debug",
        _ => "riskscan=trace,riskscan_core=trace",
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let is_json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if is_json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.compact().try_init();
    }
}
