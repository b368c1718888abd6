//! Seam to the externally hosted chat widget.
//!
//! The widget's runtime belongs to the host page. This module defines the
//! trait surface the concierge drives, plus the bootstrap sequence: inject
//! the script once, poll for the entry point, initialize exactly once.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Timeouts, WidgetDeployment};
use crate::context::VisitorContext;
use crate::error::ConciergeError;
use crate::wait::wait_until;

/// The widget's API surface as exposed to the concierge.
///
/// `is_ready` reflects whether the entry point exists yet (the bootstrap
/// script has loaded and installed it); the async operations are only valid
/// once it does.
pub trait WidgetApi: Send + Sync {
    fn is_ready(&self) -> bool;

    /// One-time initialization with the four deployment values.
    fn init(&self, deployment: &WidgetDeployment) -> Result<(), ConciergeError>;

    /// Set the widget's conversation language tag (`en_US`, `fr`, …).
    fn set_language(&self, tag: &str);

    /// Replace the hidden pre-chat field set.
    fn set_hidden_fields(&self, fields: &BTreeMap<String, String>);

    fn launch_chat(&self) -> BoxFuture<'_, Result<(), ConciergeError>>;

    fn send_text(&self, text: &str) -> BoxFuture<'_, Result<(), ConciergeError>>;
}

/// Host-side script loading seam: lets the bootstrap check for an existing
/// tag before creating a new one.
pub trait ScriptHost: Send + Sync {
    fn has_script(&self, url: &str) -> bool;
    fn inject_script(&self, url: &str);
}

/// Drives the load-and-init sequence for the widget.
pub struct WidgetBootstrap {
    api: Arc<dyn WidgetApi>,
    host: Arc<dyn ScriptHost>,
    deployment: WidgetDeployment,
    timeouts: Timeouts,
    initialized: Mutex<bool>,
}

impl WidgetBootstrap {
    pub fn new(
        api: Arc<dyn WidgetApi>,
        host: Arc<dyn ScriptHost>,
        deployment: WidgetDeployment,
        timeouts: Timeouts,
    ) -> Self {
        WidgetBootstrap {
            api,
            host,
            deployment,
            timeouts,
            initialized: Mutex::new(false),
        }
    }

    pub fn api(&self) -> Arc<dyn WidgetApi> {
        Arc::clone(&self.api)
    }

    /// Make sure the widget is loaded and initialized.
    ///
    /// Injects the bootstrap script at most once (skipped when a matching
    /// tag already exists), polls for the entry point within the configured
    /// window, then sets the language and calls `init` with the deployment
    /// values. Idempotent: later calls return immediately once
    /// initialization has succeeded, and a failed attempt leaves the state
    /// clean for a retry.
    pub async fn ensure_initialized(&self, language_tag: &str) -> Result<(), ConciergeError> {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return Ok(());
        }

        if !self.api.is_ready() {
            if !self.host.has_script(&self.deployment.bootstrap_url) {
                debug!(url = %self.deployment.bootstrap_url, "injecting widget bootstrap script");
                self.host.inject_script(&self.deployment.bootstrap_url);
            }

            let api = Arc::clone(&self.api);
            wait_until(
                move || api.is_ready(),
                self.timeouts.poll_interval(),
                self.timeouts.widget_ready(),
            )
            .await
            .map_err(|t| {
                warn!(url = %self.deployment.bootstrap_url, "timed out waiting for widget bootstrap");
                ConciergeError::WidgetUnavailable { waited: t.waited }
            })?;
        }

        self.api.set_language(language_tag);
        self.api.init(&self.deployment)?;
        *initialized = true;
        info!(deployment = %self.deployment.deployment, "widget initialized");
        Ok(())
    }
}

/// Push the context's pre-chat field set into the widget, if it is ready.
///
/// Called on the `Ready` signal and again when late geo data arrives; not
/// ready yet means the fields will be pushed on the readiness pass instead.
pub fn push_prechat(api: &dyn WidgetApi, ctx: &VisitorContext) {
    if !api.is_ready() {
        debug!("widget not ready, skipping pre-chat push");
        return;
    }
    let fields = ctx.prechat_fields();
    debug!(count = fields.len(), "pushing pre-chat fields");
    api.set_hidden_fields(&fields);
}
