use std::collections::{HashMap, HashSet};

use hecs::Entity;
use rapier3d::prelude::ColliderHandle;

/// Something that happened to the registry, passed to every subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    /// An interactable was registered, or its volumes changed
    Registered {
        /// The interactable
        interactable: Entity,
        /// Its volumes after registration
        volumes: Vec<ColliderHandle>,
    },
    /// An interactable was removed from the registry
    Deregistered {
        /// The interactable
        interactable: Entity,
        /// The volumes it had
        volumes: Vec<ColliderHandle>,
    },
}

/// Returned by [`ColliderRegistry::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

type Subscriber = Box<dyn FnMut(&RegistryEvent) + Send + Sync>;

/// Maps collision volumes to the interactable that owns them.
///
/// Every contact a hand or attach joint sees is resolved through here. Volumes that aren't
/// registered (walls, floors, other hands) simply resolve to `None`.
#[derive(Default)]
pub struct ColliderRegistry {
    by_volume: HashMap<ColliderHandle, Entity>,
    by_interactable: HashMap<Entity, Vec<ColliderHandle>>,
    order: Vec<Entity>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: usize,
}

impl ColliderRegistry {
    /// Register an interactable's volumes, replacing whatever it had registered before.
    ///
    /// Registering the same volumes twice is a no-op, and doesn't notify subscribers again.
    pub fn register(&mut self, interactable: Entity, volumes: &[ColliderHandle]) {
        let mut seen = HashSet::new();
        let volumes = volumes
            .iter()
            .copied()
            .filter(|volume| seen.insert(*volume))
            .collect::<Vec<_>>();

        if let Some(previous) = self.by_interactable.get(&interactable) {
            if *previous == volumes {
                return;
            }
            for volume in previous {
                if self.by_volume.get(volume) == Some(&interactable) {
                    self.by_volume.remove(volume);
                }
            }
        } else {
            self.order.push(interactable);
        }

        for volume in &volumes {
            if let Some(owner) = self.by_volume.insert(*volume, interactable) {
                if owner != interactable {
                    // A volume can only have one owner; the newest registration wins.
                    if let Some(list) = self.by_interactable.get_mut(&owner) {
                        list.retain(|v| v != volume);
                    }
                }
            }
        }

        self.by_interactable.insert(interactable, volumes.clone());
        self.notify(RegistryEvent::Registered {
            interactable,
            volumes,
        });
    }

    /// Remove an interactable and all of its volumes. Returns the volumes it had.
    pub fn deregister(&mut self, interactable: Entity) -> Option<Vec<ColliderHandle>> {
        let volumes = self.by_interactable.remove(&interactable)?;
        for volume in &volumes {
            if self.by_volume.get(volume) == Some(&interactable) {
                self.by_volume.remove(volume);
            }
        }
        self.order.retain(|e| *e != interactable);

        self.notify(RegistryEvent::Deregistered {
            interactable,
            volumes: volumes.clone(),
        });
        Some(volumes)
    }

    /// Which interactable owns this volume?
    pub fn resolve(&self, volume: ColliderHandle) -> Option<Entity> {
        self.by_volume.get(&volume).copied()
    }

    /// The volumes registered for an interactable
    pub fn volumes_of(&self, interactable: Entity) -> &[ColliderHandle] {
        self.by_interactable
            .get(&interactable)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Is this interactable registered?
    pub fn contains(&self, interactable: Entity) -> bool {
        self.by_interactable.contains_key(&interactable)
    }

    /// Every registered interactable, in the order they were first registered
    pub fn list_all(&self) -> Vec<Entity> {
        self.order.clone()
    }

    /// Be told about every registration and deregistration from now on
    pub fn subscribe(
        &mut self,
        subscriber: impl FnMut(&RegistryEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Stop being told. Returns `false` if the subscription didn't exist.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(s, _)| *s != id);
        before != self.subscribers.len()
    }

    fn notify(&mut self, event: RegistryEvent) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&event);
        }
    }
}

impl std::fmt::Debug for ColliderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColliderRegistry")
            .field("by_interactable", &self.by_interactable)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
