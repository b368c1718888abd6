//! Widget lifecycle signals.
//!
//! The embedded widget announces its lifecycle through a small fixed set of
//! host events. Handlers register against this enumeration rather than raw
//! event names, and waits select over an explicit subset with a deadline.

use std::fmt;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::trace;

/// The fixed set of external widget events the concierge reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetSignal {
    Ready,
    Expanded,
    Minimized,
    ConversationStarted,
    FirstBotMessage,
    ConversationEnded,
    ConversationClosed,
}

impl WidgetSignal {
    /// The host-side event name the widget fires for this signal.
    pub fn event_name(&self) -> &'static str {
        match self {
            WidgetSignal::Ready => "onEmbeddedMessagingReady",
            WidgetSignal::Expanded => "onEmbeddedMessagingExpanded",
            WidgetSignal::Minimized => "onEmbeddedMessagingMinimized",
            WidgetSignal::ConversationStarted => "onEmbeddedMessagingConversationStarted",
            WidgetSignal::FirstBotMessage => "onEmbeddedMessagingFirstBotMessageSent",
            WidgetSignal::ConversationEnded => "onEmbeddedMessagingConversationEnded",
            WidgetSignal::ConversationClosed => "onEmbeddedMessagingClosed",
        }
    }

    /// Reverse mapping from a host event name. Unknown names are `None`.
    pub fn from_event_name(name: &str) -> Option<Self> {
        WidgetSignal::all()
            .iter()
            .copied()
            .find(|s| s.event_name() == name)
    }

    pub fn all() -> &'static [WidgetSignal] {
        &[
            WidgetSignal::Ready,
            WidgetSignal::Expanded,
            WidgetSignal::Minimized,
            WidgetSignal::ConversationStarted,
            WidgetSignal::FirstBotMessage,
            WidgetSignal::ConversationEnded,
            WidgetSignal::ConversationClosed,
        ]
    }
}

impl fmt::Display for WidgetSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// Fan-out bus for [`WidgetSignal`]s.
///
/// The host publishes every widget event here once; any number of
/// subscribers observe them. Lagged subscribers drop the oldest signals
/// rather than blocking the publisher.
#[derive(Debug, Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<WidgetSignal>,
}

impl SignalBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        SignalBus { tx }
    }

    /// Publish a signal. A bus with no live subscribers swallows it.
    pub fn publish(&self, signal: WidgetSignal) {
        trace!(signal = %signal, "widget signal");
        let _ = self.tx.send(signal);
    }

    /// Publish the signal matching a raw host event name, if recognized.
    pub fn publish_event(&self, event_name: &str) -> bool {
        match WidgetSignal::from_event_name(event_name) {
            Some(signal) => {
                self.publish(signal);
                true
            }
            None => false,
        }
    }

    pub fn subscribe(&self) -> SignalRx {
        SignalRx {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription handle. Subscribe *before* the action that triggers the
/// signals you intend to wait for, or they may be missed.
pub struct SignalRx {
    rx: broadcast::Receiver<WidgetSignal>,
}

impl SignalRx {
    /// Wait until one of `wanted` arrives or `timeout` elapses.
    ///
    /// Returns the first matching signal, or `None` on timeout or a closed
    /// bus. Non-matching signals are skipped; a lagged receiver resumes from
    /// the oldest retained signal.
    pub async fn wait_for(
        &mut self,
        wanted: &[WidgetSignal],
        timeout: Duration,
    ) -> Option<WidgetSignal> {
        let wait = async {
            loop {
                match self.rx.recv().await {
                    Ok(signal) if wanted.contains(&signal) => return Some(signal),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name_round_trip() {
        for signal in WidgetSignal::all() {
            assert_eq!(WidgetSignal::from_event_name(signal.event_name()), Some(*signal));
        }
    }

    #[test]
    fn test_unknown_event_name() {
        assert_eq!(WidgetSignal::from_event_name("onSomethingElse"), None);
    }

    #[tokio::test]
    async fn test_wait_for_matching_signal() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe();
        bus.publish(WidgetSignal::Expanded);
        bus.publish(WidgetSignal::FirstBotMessage);

        let got = rx
            .wait_for(
                &[WidgetSignal::FirstBotMessage, WidgetSignal::ConversationStarted],
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(got, Some(WidgetSignal::FirstBotMessage));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe();
        let got = rx
            .wait_for(&[WidgetSignal::Ready], Duration::from_secs(2))
            .await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn test_publish_event_recognized() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe();
        assert!(bus.publish_event("onEmbeddedMessagingReady"));
        assert!(!bus.publish_event("onUnknownEvent"));
        let got = rx
            .wait_for(&[WidgetSignal::Ready], Duration::from_secs(1))
            .await;
        assert_eq!(got, Some(WidgetSignal::Ready));
    }
}
