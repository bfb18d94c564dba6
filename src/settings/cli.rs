use super::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "session and credential-flow service")]
pub struct Cli {
    /// Path to a settings file overriding the build-profile default.
    #[arg(long)]
    pub settings: Option<String>,
}
