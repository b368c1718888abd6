//! Greeting card: the localized concierge card shown over the page, with two
//! call-to-action buttons and a free-text input.
//!
//! The card owns its own visibility and busy state; every interaction routes
//! through the [`LaunchCoordinator`] and any failure puts the card back on
//! screen with its inputs enabled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::config::PersonaConfig;
use crate::error::ConciergeError;
use crate::launcher::LaunchCoordinator;
use crate::locale::Locale;
use crate::signals::{SignalBus, WidgetSignal};

const AVATAR_URL: &str =
    "https://images.unsplash.com/photo-1544005313-94ddf0286df2?w=128&h=128&fit=facearea&facepad=2";

/// Localized copy for one locale.
#[derive(Debug, Clone, Copy)]
pub struct CardStrings {
    pub name: &'static str,
    pub role: &'static str,
    pub greeting: &'static str,
    pub cta_primary: &'static str,
    pub cta_secondary: &'static str,
    pub placeholder: &'static str,
    pub fineprint: &'static str,
}

static L10N: Lazy<HashMap<Locale, CardStrings>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        Locale::En,
        CardStrings {
            name: "Algolia AI",
            role: "AI SDR Agent",
            greeting: "Hey there! I’m Algolia AI, your friendly AI SDR agent. \
                       What can I help you with today?",
            cta_primary: "Schedule a Demo",
            cta_secondary: "Chat with Our Team",
            placeholder: "Ask a question",
            fineprint: "This conversation may be recorded and used per our \
                        <a href=\"#\">Privacy Policy</a>.",
        },
    );
    table.insert(
        Locale::De,
        CardStrings {
            name: "Algolia AI",
            role: "KI-SDR-Agentin",
            greeting: "Hallo! Ich bin Algolia AI, deine freundliche KI-SDR-Agentin. \
                       Wobei kann ich dir heute helfen?",
            cta_primary: "Demo vereinbaren",
            cta_secondary: "Mit unserem Team chatten",
            placeholder: "Stelle eine Frage",
            fineprint: "Dieses Gespräch kann aufgezeichnet und gemäß unserer \
                        <a href=\"#\">Datenschutzerklärung</a> verwendet werden.",
        },
    );
    table.insert(
        Locale::Fr,
        CardStrings {
            name: "Algolia AI",
            role: "Agent SDR IA",
            greeting: "Bonjour ! Je suis Algolia AI, votre agent SDR IA. \
                       Comment puis-je vous aider aujourd’hui ?",
            cta_primary: "Planifier une démo",
            cta_secondary: "Discuter avec notre équipe",
            placeholder: "Posez une question",
            fineprint: "Cette conversation peut être enregistrée et utilisée conformément \
                        à notre <a href=\"#\">Politique de confidentialité</a>.",
        },
    );
    table
});

/// Copy shown on one rendered card: localized defaults with the persona
/// override applied. One card component, persona is configuration.
#[derive(Debug, Clone)]
pub struct CardText {
    pub name: String,
    pub role: String,
    pub greeting: String,
    pub cta_primary: String,
    pub cta_secondary: String,
    pub placeholder: String,
    pub fineprint: String,
}

impl CardText {
    pub fn resolve(locale: Locale, persona: &PersonaConfig) -> Self {
        let base = L10N.get(&locale).unwrap_or(&L10N[&Locale::En]);
        CardText {
            name: persona.name.clone().unwrap_or_else(|| base.name.to_string()),
            role: persona.role.clone().unwrap_or_else(|| base.role.to_string()),
            greeting: persona
                .greeting
                .clone()
                .unwrap_or_else(|| base.greeting.to_string()),
            cta_primary: base.cta_primary.to_string(),
            cta_secondary: base.cta_secondary.to_string(),
            placeholder: base.placeholder.to_string(),
            fineprint: base.fineprint.to_string(),
        }
    }
}

/// Which preset button was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cta {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CardState {
    visible: bool,
    busy: bool,
}

/// The greeting card component.
pub struct GreetingCard {
    coordinator: Arc<LaunchCoordinator>,
    bus: SignalBus,
    text: CardText,
    state: Mutex<CardState>,
}

impl GreetingCard {
    pub fn new(
        locale: Locale,
        persona: &PersonaConfig,
        coordinator: Arc<LaunchCoordinator>,
        bus: SignalBus,
    ) -> Self {
        GreetingCard {
            coordinator,
            bus,
            text: CardText::resolve(locale, persona),
            state: Mutex::new(CardState {
                visible: true,
                busy: false,
            }),
        }
    }

    pub fn text(&self) -> &CardText {
        &self.text
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().expect("card state poisoned").visible
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().expect("card state poisoned").busy
    }

    fn set_visible(&self, visible: bool) {
        self.state.lock().expect("card state poisoned").visible = visible;
    }

    /// The card's HTML fragment, ready to insert into the mount node. Copy is
    /// interpolated as-is (the fine print deliberately carries markup).
    pub fn render(&self) -> String {
        let t = &self.text;
        format!(
            r#"<div class="piper-container" id="piperContainer">
  <div class="piper-card" id="piperCard">
    <div class="piper-header">
      <img class="piper-avatar" src="{avatar}" alt="Agent avatar" />
      <div class="piper-hgroup">
        <div class="piper-name">{name}</div>
        <div class="piper-role">{role}</div>
      </div>
    </div>
    <div class="piper-greeting">{greeting}</div>
    <div class="piper-cta-row">
      <button class="piper-pill" data-msg="{cta1}">{cta1}</button>
      <button class="piper-pill" data-msg="{cta2}">{cta2}</button>
    </div>
    <div class="piper-input-wrap">
      <input id="piperInput" class="piper-input" placeholder="{placeholder}" />
      <button id="piperSendBtn" class="piper-send" aria-label="Send message"></button>
    </div>
    <div class="piper-fineprint">{fineprint}</div>
  </div>
</div>"#,
            avatar = AVATAR_URL,
            name = t.name,
            role = t.role,
            greeting = t.greeting,
            cta1 = t.cta_primary,
            cta2 = t.cta_secondary,
            placeholder = t.placeholder,
            fineprint = t.fineprint,
        )
    }

    /// Press one of the preset buttons: the localized label is the message.
    pub async fn cta(&self, which: Cta) -> Result<(), ConciergeError> {
        let message = match which {
            Cta::Primary => self.text.cta_primary.clone(),
            Cta::Secondary => self.text.cta_secondary.clone(),
        };
        self.engage(&message).await
    }

    /// Submit the free-text input. Blank input is a no-op.
    pub async fn submit(&self, input: &str) -> Result<(), ConciergeError> {
        if input.trim().is_empty() {
            return Ok(());
        }
        self.engage(input).await
    }

    /// Common interaction path: hide the card, mark it busy, launch and
    /// deliver. On any failure the card comes back visible and enabled —
    /// the UI is always usable afterwards.
    async fn engage(&self, message: &str) -> Result<(), ConciergeError> {
        {
            let mut state = self.state.lock().expect("card state poisoned");
            if state.busy {
                return Ok(());
            }
            state.busy = true;
            state.visible = false;
        }

        let result = self.coordinator.deliver(message).await;

        let mut state = self.state.lock().expect("card state poisoned");
        state.busy = false;
        if let Err(e) = &result {
            warn!(error = %e, "launch/send failed, restoring card");
            state.visible = true;
        }
        result
    }

    /// Follow widget lifecycle signals: hide while the chat window is open,
    /// reappear when it is minimized, ended, or closed. Runs until the bus
    /// is dropped; spawn it alongside the card.
    pub async fn watch_signals(self: Arc<Self>) {
        let mut rx = self.bus.subscribe();
        loop {
            let signal = rx
                .wait_for(
                    &[
                        WidgetSignal::Expanded,
                        WidgetSignal::Minimized,
                        WidgetSignal::ConversationEnded,
                        WidgetSignal::ConversationClosed,
                    ],
                    Duration::MAX,
                )
                .await;
            match signal {
                Some(WidgetSignal::Expanded) => {
                    debug!("chat expanded, hiding card");
                    self.set_visible(false);
                }
                Some(_) => {
                    debug!("chat dismissed, showing card");
                    self.set_visible(true);
                }
                None => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l10n_covers_all_locales() {
        for locale in Locale::all() {
            assert!(L10N.contains_key(locale), "missing copy for {locale}");
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let text = CardText::resolve(Locale::Fr, &PersonaConfig::default());
        assert_eq!(text.name, "Algolia AI");
        assert_eq!(text.cta_primary, "Planifier une démo");
    }

    #[test]
    fn test_resolve_persona_override() {
        let persona = PersonaConfig {
            name: Some("Piper".to_string()),
            role: None,
            greeting: Some("Hi, I’m Piper.".to_string()),
        };
        let text = CardText::resolve(Locale::En, &persona);
        assert_eq!(text.name, "Piper");
        assert_eq!(text.role, "AI SDR Agent");
        assert_eq!(text.greeting, "Hi, I’m Piper.");
        // CTA labels stay localized, not persona-owned.
        assert_eq!(text.cta_primary, "Schedule a Demo");
    }

    #[test]
    fn test_render_contains_copy() {
        let text = CardText::resolve(Locale::De, &PersonaConfig::default());
        let bus = SignalBus::new();
        let widget = Arc::new(crate::widget::tests_support::NullWidget::ready());
        let coordinator = Arc::new(LaunchCoordinator::new(
            widget,
            bus.clone(),
            crate::launcher::SendPolicy::Immediate,
            crate::config::Timeouts::default(),
        ));
        let card = GreetingCard::new(Locale::De, &PersonaConfig::default(), coordinator, bus);
        let html = card.render();
        assert!(html.contains(&text.greeting));
        assert!(html.contains("Demo vereinbaren"));
        assert!(html.contains("piper-card"));
    }
}
