use hecs::Entity;

use crate::InteractionConfig;

/// Something that happened between a hand, an interactable or an attach point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    /// A hand took hold of an interactable
    BeganInteraction {
        /// The hand
        hand: Entity,
        /// The interactable
        interactable: Entity,
    },
    /// A hand let go of an interactable
    EndedInteraction {
        /// The hand
        hand: Entity,
        /// The interactable
        interactable: Entity,
    },
    /// An attach point was coupled to a joint
    PointAttached {
        /// The attach point
        point: Entity,
        /// The joint it coupled to
        joint: Entity,
    },
    /// An attach point came off its joint
    PointDetached {
        /// The attach point
        point: Entity,
        /// The joint it came off
        joint: Entity,
    },
    /// An interactable was destroyed, eg. because it fell out of the world
    Destroyed {
        /// The interactable, which no longer exists
        interactable: Entity,
    },
}

/// Decides who may pick up what, in a networked session.
///
/// Without one every interactable is treated as locally owned.
pub trait OwnershipAuthority: Send + Sync {
    /// Does the local player own this interactable?
    fn is_mine(&self, interactable: Entity) -> bool;

    /// Ask for ownership of an interactable that was just picked up locally
    fn request_ownership(&mut self, interactable: Entity);

    /// May a remotely owned interactable be picked up anyway, and ownership requested
    /// afterwards? If not, trying to pick it up does nothing.
    fn allows_takeover(&self, _interactable: Entity) -> bool {
        true
    }
}

/// Interaction state that isn't attached to any one entity.
pub struct InteractionContext {
    /// Control law tuning
    pub config: InteractionConfig,
    /// Events raised since the last call to [`InteractionContext::drain_events`]
    pub events: Vec<InteractionEvent>,
    /// The ownership authority, if this is a networked session
    pub ownership: Option<Box<dyn OwnershipAuthority>>,
}

impl Default for InteractionContext {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl InteractionContext {
    /// Create a context with the given tuning
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            ownership: None,
        }
    }

    /// Record that something happened
    pub fn raise(&mut self, event: InteractionEvent) {
        self.events.push(event);
    }

    /// Take every event raised so far
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.events)
    }
}

impl std::fmt::Debug for InteractionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionContext")
            .field("config", &self.config)
            .field("events", &self.events)
            .field("ownership", &self.ownership.is_some())
            .finish()
    }
}
