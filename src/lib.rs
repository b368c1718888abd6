pub mod card;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod geo;
pub mod launcher;
pub mod locale;
pub mod session;
pub mod signals;
pub mod wait;
pub mod widget;

use std::sync::{Arc, Mutex};

use tracing::warn;

pub use card::{Cta, GreetingCard};
pub use config::ConciergeConfig;
pub use context::VisitorContext;
pub use error::ConciergeError;
pub use launcher::{LaunchCoordinator, SendPolicy};
pub use locale::Locale;
pub use session::{KvStore, SessionRecord};
pub use signals::{SignalBus, WidgetSignal};
pub use widget::{ScriptHost, WidgetApi, WidgetBootstrap};

// ---------------------------------------------------------------------------
// Page load input
// ---------------------------------------------------------------------------

/// What the host hands over about the current page load.
#[derive(Debug, Clone)]
pub struct PageLoad {
    pub url: String,
    pub viewport_width: u32,
    pub referrer: Option<String>,
}

// ---------------------------------------------------------------------------
// Concierge — top-level wiring
// ---------------------------------------------------------------------------

/// Ties the pieces together for one page load: session + context, widget
/// bootstrap, launch coordination, and the greeting card.
///
/// The host supplies the widget API and script seams plus the key-value
/// store; everything else is wired here.
pub struct Concierge {
    bus: SignalBus,
    bootstrap: WidgetBootstrap,
    coordinator: Arc<LaunchCoordinator>,
    card: Arc<GreetingCard>,
    geo: geo::GeoClient,
    context: Mutex<VisitorContext>,
    locale: Locale,
}

impl Concierge {
    pub fn new(
        config: &ConciergeConfig,
        api: Arc<dyn WidgetApi>,
        host: Arc<dyn ScriptHost>,
        store: &dyn KvStore,
        page: PageLoad,
    ) -> Self {
        let session = SessionRecord::load_or_create(store);
        let context = VisitorContext::build(
            &page.url,
            page.viewport_width,
            page.referrer.as_deref(),
            &config.repo,
            &session,
        );
        let locale = context.locale;

        let bus = SignalBus::new();
        let coordinator = Arc::new(LaunchCoordinator::new(
            Arc::clone(&api),
            bus.clone(),
            config.send_policy,
            config.timeouts.clone(),
        ));
        let card = Arc::new(GreetingCard::new(
            locale,
            &config.persona,
            Arc::clone(&coordinator),
            bus.clone(),
        ));
        let bootstrap = WidgetBootstrap::new(
            api,
            host,
            config.widget.clone(),
            config.timeouts.clone(),
        );

        Concierge {
            bus,
            bootstrap,
            coordinator,
            card,
            geo: geo::GeoClient::with_endpoints(&config.ip_url, &config.geo_url),
            context: Mutex::new(context),
            locale,
        }
    }

    /// The bus the host publishes widget events into.
    pub fn bus(&self) -> SignalBus {
        self.bus.clone()
    }

    pub fn card(&self) -> Arc<GreetingCard> {
        Arc::clone(&self.card)
    }

    pub fn coordinator(&self) -> Arc<LaunchCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Snapshot of the current visitor context.
    pub fn context(&self) -> VisitorContext {
        self.context.lock().expect("context poisoned").clone()
    }

    /// Load and initialize the widget. A failure here is logged and left for
    /// a later retry — the page works without the widget.
    pub async fn start(&self) {
        if let Err(e) = self
            .bootstrap
            .ensure_initialized(self.locale.widget_tag())
            .await
        {
            warn!(error = %e, "widget bootstrap failed, greeting card stays up");
        }
    }

    /// Resolve IP/geo and fold it into the context, then refresh the
    /// widget's pre-chat fields with the late data. Failures leave the geo
    /// addendum absent.
    pub async fn refresh_geo(&self) {
        let report = self.geo.lookup().await;
        let snapshot = {
            let mut ctx = self.context.lock().expect("context poisoned");
            ctx.attach_geo(report);
            ctx.clone()
        };
        widget::push_prechat(self.bootstrap.api().as_ref(), &snapshot);
    }

    /// React to the widget's ready signal: set the conversation language and
    /// push the pre-chat fields. Loops for the lifetime of the bus — the
    /// widget can become ready again after a teardown.
    pub async fn watch_ready(&self) {
        let api = self.bootstrap.api();
        let mut rx = self.bus.subscribe();
        while rx
            .wait_for(&[WidgetSignal::Ready], std::time::Duration::MAX)
            .await
            .is_some()
        {
            api.set_language(self.locale.widget_tag());
            widget::push_prechat(api.as_ref(), &self.context());
        }
    }

    /// Spawn the long-lived watchers (ready handler, card show/hide, launch
    /// state reset). The caller holds the handles; dropping the runtime
    /// stops them.
    pub fn spawn_watchers(self: &Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let ready = {
            let this = Arc::clone(self);
            tokio::spawn(async move { this.watch_ready().await })
        };
        let card = tokio::spawn(Arc::clone(&self.card).watch_signals());
        let launcher = tokio::spawn(Arc::clone(&self.coordinator).watch_signals());
        vec![ready, card, launcher]
    }
}
