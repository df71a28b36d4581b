use super::Parser;

/// Token issuing and session validation service.
#[derive(Parser, Debug)]
#[command(name = "tokenward", version)]
pub struct Cli {
    /// TOML settings file; defaults to `settings/dev.toml` in debug builds.
    #[arg(long, env = "TOKENWARD_SETTINGS")]
    pub settings: Option<String>,
}
