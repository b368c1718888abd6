//! Crate-level error type.

use std::time::Duration;

/// Errors surfaced by the concierge layer.
///
/// Geo lookups never produce one of these — they degrade silently. Everything
/// here reaches a caller that can react (typically by restoring the greeting
/// card).
#[derive(Debug, thiserror::Error)]
pub enum ConciergeError {
    /// The widget entry point never appeared within the bounded wait.
    #[error("widget API not available after {waited:?}")]
    WidgetUnavailable { waited: Duration },

    /// The external launch call failed.
    #[error("widget launch failed: {detail}")]
    Launch { detail: String },

    /// The external send-text call failed. Produced by host [`WidgetApi`]
    /// implementations; the crate itself never constructs it.
    ///
    /// [`WidgetApi`]: crate::widget::WidgetApi
    #[error("sending message to widget failed: {detail}")]
    Send { detail: String },

    /// The external init call failed. Produced by host [`WidgetApi`]
    /// implementations; the crate itself never constructs it.
    ///
    /// [`WidgetApi`]: crate::widget::WidgetApi
    #[error("widget init failed: {detail}")]
    Init { detail: String },

    /// Config file could not be read.
    #[error("config read failed at {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file was not valid TOML for [`ConciergeConfig`](crate::config::ConciergeConfig).
    #[error("config parse failed at {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
