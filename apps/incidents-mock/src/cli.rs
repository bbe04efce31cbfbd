use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "incidents-mock",
    version,
    about = "Synthetic Prometheus serving incident fixtures"
)]
pub struct Args {
    /// Listen address (overrides INCIDENTS_MOCK_HTTP_BIND).
    #[arg(long)]
    pub bind: Option<String>,
    /// IANA timezone used to read "now" (overrides INCIDENTS_MOCK_TIMEZONE).
    #[arg(long)]
    pub timezone: Option<String>,
    /// Fixture installed at startup (overrides INCIDENTS_MOCK_FIXTURE_PATH).
    #[arg(long)]
    pub fixture: Option<PathBuf>,
    /// Prometheus base URL for queries the mock does not answer.
    #[arg(long)]
    pub upstream: Option<String>,
    /// Pin "now" to these Unix seconds.
    #[arg(long)]
    pub fixed_now: Option<i64>,
}
