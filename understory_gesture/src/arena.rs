// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational slot storage for recognizers.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::recognizer::Recognizer;
use crate::scope::DetectLookup;
use crate::types::{
    DetectState, GestureMask, GesturePriority, PointerId, RecognizerId, RefereeState,
};

/// Per-recognizer bookkeeping kept next to the boxed recognizer.
#[derive(Debug)]
pub(crate) struct Slot {
    generation: u32,
    /// `None` while the recognizer is lent out to a call.
    recognizer: Option<Box<dyn Recognizer>>,
    pub(crate) parent: Option<RecognizerId>,
    pub(crate) priority: GesturePriority,
    pub(crate) mask: GestureMask,
    /// Detection progress observed after the last call into the recognizer.
    pub(crate) detect: DetectState,
    /// Last referee state assigned per pointer by the owning scope or group.
    pub(crate) referee: BTreeMap<PointerId, RefereeState>,
}

impl Slot {
    fn new(generation: u32, recognizer: Box<dyn Recognizer>) -> Self {
        let detect = recognizer.detect_state();
        Self {
            generation,
            recognizer: Some(recognizer),
            parent: None,
            priority: GesturePriority::default(),
            mask: GestureMask::default(),
            detect,
            referee: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Option<Slot>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
}

impl Arena {
    pub(crate) fn insert(&mut self, recognizer: Box<dyn Recognizer>) -> RecognizerId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(Slot::new(generation, recognizer));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "RecognizerId uses 32-bit indices."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.slots.push(Some(Slot::new(generation, recognizer)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "RecognizerId uses 32-bit indices."
            )]
            ((self.slots.len() - 1) as u32, generation)
        };
        RecognizerId::new(idx, generation)
    }

    /// Free the slot of `id`, returning its bookkeeping.
    pub(crate) fn remove(&mut self, id: RecognizerId) -> Option<Slot> {
        if !self.is_alive(id) {
            return None;
        }
        let slot = self.slots[id.idx()].take();
        self.free_list.push(id.idx());
        slot
    }

    pub(crate) fn is_alive(&self, id: RecognizerId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub(crate) fn get(&self, id: RecognizerId) -> Option<&Slot> {
        self.slots
            .get(id.idx())?
            .as_ref()
            .filter(|slot| slot.generation == id.1)
    }

    pub(crate) fn get_mut(&mut self, id: RecognizerId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.idx())?
            .as_mut()
            .filter(|slot| slot.generation == id.1)
    }

    /// Borrow the recognizer of `id`, unless it is stale or lent out.
    pub(crate) fn recognizer(&self, id: RecognizerId) -> Option<&dyn Recognizer> {
        self.get(id)?.recognizer.as_deref()
    }

    pub(crate) fn recognizer_mut(&mut self, id: RecognizerId) -> Option<&mut dyn Recognizer> {
        self.get_mut(id)?.recognizer.as_deref_mut()
    }

    /// Lend the recognizer out of its slot for a call.
    pub(crate) fn take(&mut self, id: RecognizerId) -> Option<Box<dyn Recognizer>> {
        self.get_mut(id)?.recognizer.take()
    }

    /// Return a lent recognizer and refresh the cached detect state.
    ///
    /// If the slot was freed meanwhile, the recognizer is dropped.
    pub(crate) fn restore(&mut self, id: RecognizerId, recognizer: Box<dyn Recognizer>) {
        if let Some(slot) = self.get_mut(id) {
            slot.detect = recognizer.detect_state();
            slot.recognizer = Some(recognizer);
        }
    }

    /// Walk parent links up to the outermost ancestor of `id`.
    pub(crate) fn root_of(&self, id: RecognizerId) -> RecognizerId {
        self.ancestry(id).last().copied().unwrap_or(id)
    }

    /// `id` followed by its live ancestors, outermost last.
    pub(crate) fn ancestry(&self, id: RecognizerId) -> Vec<RecognizerId> {
        let mut path = Vec::from([id]);
        let mut current = id;
        // Depth is bounded by the slot count; a cycle would be a construction bug.
        for _ in 0..self.slots.len() {
            match self.get(current).and_then(|s| s.parent) {
                Some(parent) if self.is_alive(parent) => {
                    path.push(parent);
                    current = parent;
                }
                _ => break,
            }
        }
        path
    }

    /// `id` and every descendant, parents before children.
    pub(crate) fn subtree(&self, id: RecognizerId) -> Vec<RecognizerId> {
        let mut out = Vec::new();
        let mut stack = Vec::from([id]);
        while let Some(next) = stack.pop() {
            if !self.is_alive(next) || out.contains(&next) {
                continue;
            }
            out.push(next);
            if let Some(r) = self.recognizer(next) {
                stack.extend(r.children().iter().rev().copied());
            }
        }
        out
    }
}

impl DetectLookup for Arena {
    fn detect_state(&self, id: RecognizerId) -> Option<DetectState> {
        self.get(id).map(|slot| slot.detect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizers::Press;

    #[test]
    fn stale_ids_do_not_alias_reused_slots() {
        let mut arena = Arena::default();
        let a = arena.insert(Box::new(Press::default()));
        assert!(arena.is_alive(a));
        assert!(arena.remove(a).is_some());
        assert!(!arena.is_alive(a));
        assert!(arena.remove(a).is_none());

        let b = arena.insert(Box::new(Press::default()));
        assert_eq!(a.idx(), b.idx(), "slot reused");
        assert_ne!(a, b, "generation differs");
        assert!(arena.get(a).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn lent_recognizer_is_invisible_until_restored() {
        let mut arena = Arena::default();
        let a = arena.insert(Box::new(Press::default()));
        let boxed = arena.take(a).expect("present");
        assert!(arena.recognizer(a).is_none());
        assert!(arena.take(a).is_none());
        assert_eq!(arena.detect_state(a), Some(DetectState::Ready));
        arena.restore(a, boxed);
        assert!(arena.recognizer(a).is_some());
    }
}
