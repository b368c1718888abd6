use clap::Parser;

#[derive(Parser)]
#[command(name = "site-concierge")]
#[command(version = "1.2.0")]
#[command(about = "Inspect the visitor context and pre-chat fields for a page load")]
pub struct Args {
    /// Page URL of the load to simulate
    pub url: String,

    /// Viewport width in pixels (decides mobile vs desktop)
    #[arg(long, default_value = "1280")]
    pub viewport: u32,

    /// Referrer URL, if any
    #[arg(long)]
    pub referrer: Option<String>,

    /// Path to a TOML config file (defaults apply when omitted)
    #[arg(long)]
    pub config: Option<String>,

    /// Perform the live IP/geo lookup and include the addendum
    #[arg(long)]
    pub geo: bool,

    /// Emit the context and field set as JSON instead of formatted text
    #[arg(long)]
    pub json: bool,
}
