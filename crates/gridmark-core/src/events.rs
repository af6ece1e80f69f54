//! Typed notifications fired by the controller.

use crate::geo::FeatureId;
use crate::mode::Mode;

/// Notification kinds listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Authenticated,
    BboxChanged,
    ModeChanged,
    FeatureAdded,
    FeatureEdited,
    StyleChanged,
}

/// A notification with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Authenticated(bool),
    BboxChanged,
    ModeChanged(Mode),
    FeatureAdded(FeatureId),
    FeatureEdited(FeatureId),
    StyleChanged(FeatureId),
}

impl ViewEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ViewEvent::Authenticated(_) => EventKind::Authenticated,
            ViewEvent::BboxChanged => EventKind::BboxChanged,
            ViewEvent::ModeChanged(_) => EventKind::ModeChanged,
            ViewEvent::FeatureAdded(_) => EventKind::FeatureAdded,
            ViewEvent::FeatureEdited(_) => EventKind::FeatureEdited,
            ViewEvent::StyleChanged(_) => EventKind::StyleChanged,
        }
    }

    /// Wire name of the event, as used by the web frontend.
    pub fn name(&self) -> &'static str {
        match self.kind() {
            EventKind::Authenticated => "authenticated",
            EventKind::BboxChanged => "bboxChanged",
            EventKind::ModeChanged => "modeChanged",
            EventKind::FeatureAdded => "featureAdded",
            EventKind::FeatureEdited => "featureEdited",
            EventKind::StyleChanged => "styleChanged",
        }
    }
}

type Listener = Box<dyn FnMut(&ViewEvent)>;

/// Subscription list keyed by event kind.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(Option<EventKind>, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to one kind of event.
    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&ViewEvent) + 'static) {
        self.listeners.push((Some(kind), Box::new(listener)));
    }

    /// Listen to every event.
    pub fn on_any(&mut self, listener: impl FnMut(&ViewEvent) + 'static) {
        self.listeners.push((None, Box::new(listener)));
    }

    pub fn fire(&mut self, event: ViewEvent) {
        log::debug!("fire {}", event.name());
        let kind = event.kind();
        for (filter, listener) in &mut self.listeners {
            if filter.is_none_or(|k| k == kind) {
                listener(&event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
