//! Launch orchestration for the embedded chat widget.
//!
//! The contract: `ensure_launched` waits (bounded) for the widget API, calls
//! the external launch at most once even under concurrent callers, and keeps
//! the widget "launched" until a conversation-ended or -closed signal resets
//! it. Message delivery honors the configured send policy.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Timeouts;
use crate::error::ConciergeError;
use crate::signals::{SignalBus, WidgetSignal};
use crate::wait::wait_until;
use crate::widget::WidgetApi;

/// When a pending outbound message is handed to the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SendPolicy {
    /// Right after launch resolves, no event wait.
    Immediate,
    /// After the bot posts its first message or the conversation starts,
    /// keeping the transcript order agent-first. Bounded; on timeout the
    /// message is sent anyway.
    BotFirst,
}

/// Outcome of the shared launch future. `Clone` so every joined caller gets
/// its own copy.
#[derive(Debug, Clone)]
enum LaunchError {
    Unavailable(Duration),
    Failed(String),
}

impl From<LaunchError> for ConciergeError {
    fn from(e: LaunchError) -> Self {
        match e {
            LaunchError::Unavailable(waited) => ConciergeError::WidgetUnavailable { waited },
            LaunchError::Failed(detail) => ConciergeError::Launch { detail },
        }
    }
}

type SharedLaunch = Shared<BoxFuture<'static, Result<(), LaunchError>>>;

enum Phase {
    Idle,
    Pending(SharedLaunch),
    Launched,
}

/// Guarded single-flight state holder.
///
/// The generation counter lets a `reset` during an in-flight launch win:
/// completions carrying a stale generation are ignored.
struct LaunchState {
    inner: Mutex<StateInner>,
}

struct StateInner {
    generation: u64,
    phase: Phase,
}

impl LaunchState {
    fn new() -> Self {
        LaunchState {
            inner: Mutex::new(StateInner {
                generation: 0,
                phase: Phase::Idle,
            }),
        }
    }

    /// Join the in-flight launch, or start one via `make` if none exists.
    /// `None` means already launched.
    fn try_begin(&self, make: impl FnOnce() -> SharedLaunch) -> Option<(SharedLaunch, u64)> {
        let mut inner = self.inner.lock().expect("launch state poisoned");
        match &inner.phase {
            Phase::Launched => None,
            Phase::Pending(fut) => Some((fut.clone(), inner.generation)),
            Phase::Idle => {
                inner.generation += 1;
                let fut = make();
                inner.phase = Phase::Pending(fut.clone());
                Some((fut, inner.generation))
            }
        }
    }

    /// Record the outcome of the launch started under `generation`. Stale
    /// completions (a reset happened meanwhile) are dropped.
    fn complete(&self, generation: u64, success: bool) {
        let mut inner = self.inner.lock().expect("launch state poisoned");
        if inner.generation != generation {
            return;
        }
        if matches!(inner.phase, Phase::Pending(_)) {
            inner.phase = if success { Phase::Launched } else { Phase::Idle };
        }
    }

    /// Back to idle; the next `try_begin` launches again.
    fn reset(&self) {
        let mut inner = self.inner.lock().expect("launch state poisoned");
        inner.generation += 1;
        inner.phase = Phase::Idle;
    }

    fn is_launched(&self) -> bool {
        matches!(
            self.inner.lock().expect("launch state poisoned").phase,
            Phase::Launched
        )
    }
}

/// Coordinates widget launches and message delivery.
pub struct LaunchCoordinator {
    api: Arc<dyn WidgetApi>,
    bus: SignalBus,
    policy: SendPolicy,
    timeouts: Timeouts,
    state: LaunchState,
}

impl LaunchCoordinator {
    pub fn new(
        api: Arc<dyn WidgetApi>,
        bus: SignalBus,
        policy: SendPolicy,
        timeouts: Timeouts,
    ) -> Self {
        LaunchCoordinator {
            api,
            bus,
            policy,
            timeouts,
            state: LaunchState::new(),
        }
    }

    pub fn is_launched(&self) -> bool {
        self.state.is_launched()
    }

    pub fn policy(&self) -> SendPolicy {
        self.policy
    }

    /// Launch the widget if it is not already launched.
    ///
    /// Concurrent callers coalesce onto one shared in-flight operation — the
    /// external launch call happens at most once per idle-to-launched
    /// transition. The wait for widget availability is bounded by the
    /// configured window; both a timeout and an external launch failure
    /// surface to every joined caller, and either clears the in-flight slot
    /// so a later call retries.
    pub async fn ensure_launched(&self) -> Result<(), ConciergeError> {
        let Some((fut, generation)) = self.state.try_begin(|| {
            Self::launch_future(
                Arc::clone(&self.api),
                self.timeouts.poll_interval(),
                self.timeouts.widget_ready(),
            )
        }) else {
            return Ok(());
        };

        let result = fut.await;
        self.state.complete(generation, result.is_ok());
        match result {
            Ok(()) => {
                info!("widget launched");
                Ok(())
            }
            Err(e) => {
                warn!(error = ?e, "widget launch failed");
                Err(e.into())
            }
        }
    }

    fn launch_future(
        api: Arc<dyn WidgetApi>,
        poll_interval: Duration,
        ready_timeout: Duration,
    ) -> SharedLaunch {
        async move {
            let probe = Arc::clone(&api);
            wait_until(move || probe.is_ready(), poll_interval, ready_timeout)
                .await
                .map_err(|t| LaunchError::Unavailable(t.waited))?;
            api.launch_chat()
                .await
                .map_err(|e| LaunchError::Failed(e.to_string()))
        }
        .boxed()
        .shared()
    }

    /// Launch if needed and hand `message` to the widget per the send policy.
    ///
    /// Blank messages are dropped without touching the widget. Under
    /// `BotFirst` the send waits for the bot's first message or a started
    /// conversation (whichever comes first, bounded); on timeout the message
    /// goes out anyway so it is never lost.
    pub async fn deliver(&self, message: &str) -> Result<(), ConciergeError> {
        let text = message.trim();
        if text.is_empty() {
            return Ok(());
        }

        // Subscribe before launching so signals fired during the launch
        // itself are not missed.
        let mut rx = self.bus.subscribe();
        self.ensure_launched().await?;

        if self.policy == SendPolicy::BotFirst {
            let got = rx
                .wait_for(
                    &[
                        WidgetSignal::FirstBotMessage,
                        WidgetSignal::ConversationStarted,
                    ],
                    self.timeouts.first_bot_message(),
                )
                .await;
            match got {
                Some(signal) => debug!(signal = %signal, "bot-first gate opened"),
                None => warn!("bot-first wait timed out, sending anyway"),
            }
        }

        self.api.send_text(text).await
    }

    /// Observe the bus and reset launch state when a conversation ends or
    /// the widget closes. Runs until the bus is dropped; spawn it alongside
    /// the coordinator.
    pub async fn watch_signals(self: Arc<Self>) {
        let mut rx = self.bus.subscribe();
        loop {
            match rx
                .wait_for(
                    &[
                        WidgetSignal::ConversationEnded,
                        WidgetSignal::ConversationClosed,
                    ],
                    Duration::MAX,
                )
                .await
            {
                Some(signal) => {
                    debug!(signal = %signal, "conversation over, resetting launch state");
                    self.state.reset();
                }
                None => return,
            }
        }
    }

    /// Manual reset, for hosts that track conversation lifecycle themselves.
    pub fn reset(&self) {
        self.state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_policy_toml_names() {
        #[derive(Deserialize)]
        struct Wrap {
            policy: SendPolicy,
        }
        let w: Wrap = toml::from_str("policy = \"bot-first\"").expect("parse");
        assert_eq!(w.policy, SendPolicy::BotFirst);
        let w: Wrap = toml::from_str("policy = \"immediate\"").expect("parse");
        assert_eq!(w.policy, SendPolicy::Immediate);
    }

    #[test]
    fn test_state_begin_then_complete() {
        let state = LaunchState::new();
        let (_, generation) = state
            .try_begin(|| async { Ok(()) }.boxed().shared())
            .expect("begin");
        assert!(!state.is_launched());
        state.complete(generation, true);
        assert!(state.is_launched());
        // Launched: no new flight starts.
        assert!(state.try_begin(|| unreachable!()).is_none());
    }

    #[test]
    fn test_state_failed_completion_returns_to_idle() {
        let state = LaunchState::new();
        let (_, generation) = state
            .try_begin(|| async { Ok(()) }.boxed().shared())
            .expect("begin");
        state.complete(generation, false);
        assert!(!state.is_launched());
        assert!(state.try_begin(|| async { Ok(()) }.boxed().shared()).is_some());
    }

    #[test]
    fn test_state_second_begin_joins_first() {
        let state = LaunchState::new();
        let (_, gen_a) = state
            .try_begin(|| async { Ok(()) }.boxed().shared())
            .expect("begin");
        let (_, gen_b) = state.try_begin(|| unreachable!()).expect("join");
        assert_eq!(gen_a, gen_b);
    }

    #[test]
    fn test_stale_completion_ignored_after_reset() {
        let state = LaunchState::new();
        let (_, generation) = state
            .try_begin(|| async { Ok(()) }.boxed().shared())
            .expect("begin");
        state.reset();
        state.complete(generation, true);
        assert!(!state.is_launched());
    }
}
