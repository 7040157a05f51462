use hecs::Entity;
use rapier3d::prelude::ColliderHandle;

/// One interactable a hand is hovering over, and every volume of it the hand is touching.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverEntry {
    /// The interactable being hovered over
    pub interactable: Entity,
    /// Each touching volume with the time (in seconds) it was first touched
    pub contacts: Vec<(ColliderHandle, f64)>,
}

impl HoverEntry {
    /// When did the earliest contact that's still active begin?
    pub fn first_touch(&self) -> Option<f64> {
        self.contacts
            .iter()
            .map(|(_, time)| *time)
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// The set of interactables a hand is currently touching, in the order they were first touched.
///
/// An interactable stays in the map for as long as at least one of its volumes is touching the
/// hand; removing its last volume removes the interactable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoverMap {
    entries: Vec<HoverEntry>,
}

impl HoverMap {
    /// Record that `volume` (belonging to `interactable`) started touching the hand at `now`.
    /// Touching a volume that's already recorded keeps its original timestamp.
    ///
    /// Returns `true` if the interactable wasn't being hovered over before.
    pub fn enter(&mut self, interactable: Entity, volume: ColliderHandle, now: f64) -> bool {
        match self.entry_mut(interactable) {
            Some(entry) => {
                if !entry.contacts.iter().any(|(v, _)| *v == volume) {
                    entry.contacts.push((volume, now));
                }
                false
            }
            None => {
                self.entries.push(HoverEntry {
                    interactable,
                    contacts: vec![(volume, now)],
                });
                true
            }
        }
    }

    /// Record that `volume` stopped touching the hand.
    ///
    /// Returns `true` if that was the interactable's last volume.
    pub fn exit(&mut self, interactable: Entity, volume: ColliderHandle) -> bool {
        let Some(index) = self.index_of(interactable) else {
            return false;
        };

        let entry = &mut self.entries[index];
        entry.contacts.retain(|(v, _)| *v != volume);
        if entry.contacts.is_empty() {
            self.entries.remove(index);
            return true;
        }

        false
    }

    /// Forget a volume without knowing who owned it, eg. because its owner was deregistered.
    pub fn remove_volume(&mut self, volume: ColliderHandle) {
        for entry in &mut self.entries {
            entry.contacts.retain(|(v, _)| *v != volume);
        }
        self.entries.retain(|e| !e.contacts.is_empty());
    }

    /// Forget an interactable entirely. Returns `true` if it was being hovered over.
    pub fn remove(&mut self, interactable: Entity) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.interactable != interactable);
        before != self.entries.len()
    }

    /// Is the hand hovering over this interactable?
    pub fn contains(&self, interactable: Entity) -> bool {
        self.index_of(interactable).is_some()
    }

    /// Is this particular volume of the interactable recorded?
    pub fn contains_volume(&self, interactable: Entity, volume: ColliderHandle) -> bool {
        self.get(interactable)
            .map(|e| e.contacts.iter().any(|(v, _)| *v == volume))
            .unwrap_or(false)
    }

    /// Get the entry for an interactable
    pub fn get(&self, interactable: Entity) -> Option<&HoverEntry> {
        self.entries.iter().find(|e| e.interactable == interactable)
    }

    /// The hovered interactables, in the order they were first touched
    pub fn interactables(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries.iter().map(|e| e.interactable)
    }

    /// Every entry in the map
    pub fn iter(&self) -> impl Iterator<Item = &HoverEntry> {
        self.entries.iter()
    }

    /// How many interactables are being hovered over?
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the hand hovering over nothing?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn index_of(&self, interactable: Entity) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.interactable == interactable)
    }

    fn entry_mut(&mut self, interactable: Entity) -> Option<&mut HoverEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.interactable == interactable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;
    use rapier3d::prelude::ColliderHandle;

    fn volume(index: u32) -> ColliderHandle {
        ColliderHandle::from_raw_parts(index, 0)
    }

    #[test]
    fn test_interactable_stays_while_any_volume_touches() {
        let mut world = World::new();
        let a = world.spawn(());
        let mut map = HoverMap::default();

        assert!(map.enter(a, volume(0), 1.0));
        assert!(!map.enter(a, volume(1), 2.0));
        assert_eq!(map.len(), 1);

        assert!(!map.exit(a, volume(0)));
        assert!(map.contains(a));
        assert!(!map.contains_volume(a, volume(0)));

        assert!(map.exit(a, volume(1)));
        assert!(!map.contains(a));
        assert!(map.is_empty());
    }

    #[test]
    fn test_reentering_keeps_first_timestamp() {
        let mut world = World::new();
        let a = world.spawn(());
        let mut map = HoverMap::default();

        map.enter(a, volume(0), 1.0);
        map.enter(a, volume(0), 5.0);
        map.enter(a, volume(1), 3.0);
        assert_eq!(map.get(a).unwrap().first_touch(), Some(1.0));

        map.exit(a, volume(0));
        assert_eq!(map.get(a).unwrap().first_touch(), Some(3.0));
    }

    #[test]
    fn test_iteration_order_is_first_touched() {
        let mut world = World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        let c = world.spawn(());
        let mut map = HoverMap::default();

        map.enter(b, volume(1), 0.0);
        map.enter(a, volume(0), 0.0);
        map.enter(c, volume(2), 0.0);
        map.remove(a);
        map.remove_volume(volume(2));

        assert_eq!(map.interactables().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_exit_of_unknown_volume_is_ignored() {
        let mut world = World::new();
        let a = world.spawn(());
        let mut map = HoverMap::default();

        assert!(!map.exit(a, volume(7)));
        map.enter(a, volume(0), 0.0);
        assert!(!map.exit(a, volume(7)));
        assert!(map.contains(a));
    }
}
