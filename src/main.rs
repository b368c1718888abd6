use clap::Parser;
use colored::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use site_concierge::cli::Args;
use site_concierge::config::ConciergeConfig;
use site_concierge::context::VisitorContext;
use site_concierge::geo::GeoClient;
use site_concierge::session::{MemoryStore, SessionRecord};
use site_concierge::{locale, PageLoad};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConciergeConfig::from_toml_file(path)?,
        None => ConciergeConfig::default(),
    };

    // The CLI simulates one fresh page load, so the session is always new.
    let store = MemoryStore::new();
    let session = SessionRecord::load_or_create(&store);
    let page = PageLoad {
        url: args.url.clone(),
        viewport_width: args.viewport,
        referrer: args.referrer.clone(),
    };

    let mut ctx = VisitorContext::build(
        &page.url,
        page.viewport_width,
        page.referrer.as_deref(),
        &config.repo,
        &session,
    );

    if args.geo {
        let client = GeoClient::with_endpoints(&config.ip_url, &config.geo_url);
        ctx.attach_geo(client.lookup().await);
    }

    if args.json {
        let out = json!({
            "context": ctx,
            "prechat_fields": ctx.prechat_fields(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_context(&ctx, &config);
    Ok(())
}

fn print_context(ctx: &VisitorContext, config: &ConciergeConfig) {
    let path = url::Url::parse(&ctx.page_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| ctx.page_url.clone());

    println!("{}", "SITE CONCIERGE CONTEXT".bright_cyan().bold());
    println!(
        "{}: {}",
        "Base path".bright_yellow(),
        locale::base_path(&path, &config.repo)
    );
    println!(
        "{}: {} -> {}",
        "Locale".bright_yellow(),
        ctx.locale.to_string().bright_white(),
        ctx.widget_language.bright_white()
    );
    println!("{}: {}", "Device".bright_yellow(), ctx.device);
    println!("{}: {}", "Page URL".bright_yellow(), ctx.page_url);
    if let Some(referrer) = &ctx.referrer {
        println!("{}: {}", "Referrer".bright_yellow(), referrer);
    }
    if ctx.utm.any_present() {
        println!("{}: {:?}", "UTM".bright_yellow(), ctx.utm);
    }
    println!(
        "{}: {} (first seen {}, last seen {})",
        "Session".bright_yellow(),
        ctx.session_id.bright_white(),
        ctx.first_seen,
        ctx.last_seen
    );
    if let Some(ip) = &ctx.ip {
        println!("{}: {}", "IP".bright_magenta(), ip);
    }
    if let Some(geo) = &ctx.geo {
        println!("{}: {:?}", "Geo".bright_magenta(), geo);
    }

    println!("{}", "=".repeat(50).bright_blue());
    println!("{}", "Pre-chat fields:".bright_green());
    for (key, value) in ctx.prechat_fields() {
        println!("  {} = {}", key.bright_white(), value);
    }
}
