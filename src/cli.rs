//! Command-line configuration for the controller process.

use clap::Parser;

/// Runtime settings for the Sentry controller.
#[derive(Debug, Parser)]
#[command(
    name = "sentry-controller",
    about = "Kubernetes controller that reconciles Team, Project and ClientKey resources against the Sentry API",
    version
)]
pub struct Settings {
    /// Slug of the Sentry organization this controller manages.
    #[arg(long, env = "SENTRY_ORGANIZATION")]
    pub organization: String,

    /// Base URL of the Sentry API.
    #[arg(
        long,
        env = "SENTRY_API_ENDPOINT",
        default_value = "https://sentry.io/api/0/"
    )]
    pub api_endpoint: String,

    /// Sentry API auth token.
    #[arg(long, env = "SENTRY_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Deadline in seconds applied to every Sentry API request, bounding
    /// each reconcile attempt.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Port for the metrics and health probe HTTP server.
    #[arg(long, env = "METRICS_PORT", default_value_t = 8080)]
    pub metrics_port: u16,
}
