//! Generation-checked table of engines handed out to C.
//!
//! A handle packs `(generation << 32) | (slot + 1)`. Zero is never a live
//! handle, so zero-initialised C variables are always rejected. Removing
//! an entry bumps its generation, which turns every copy of the old handle
//! stale; a stale or double `term` is a harmless `None`.

use std::mem;

enum Entry<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// Slot table with an intrusive free list threaded through vacant entries.
pub(crate) struct HandleTable<T> {
    entries: Vec<Entry<T>>,
    free_head: Option<u32>,
    live: usize,
}

fn encode(index: u32, generation: u32) -> u64 {
    (u64::from(generation) << 32) | u64::from(index + 1)
}

fn decode(handle: u64) -> Option<(u32, u32)> {
    let index = (handle as u32).checked_sub(1)?;
    Some((index, (handle >> 32) as u32))
}

impl<T> HandleTable<T> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_head: None,
            live: 0,
        }
    }

    /// Store `value` and return its handle.
    pub(crate) fn insert(&mut self, value: T) -> u64 {
        self.live += 1;
        if let Some(index) = self.free_head {
            let entry = &mut self.entries[index as usize];
            if let Entry::Vacant {
                generation,
                next_free,
            } = *entry
            {
                self.free_head = next_free;
                *entry = Entry::Occupied { generation, value };
                return encode(index, generation);
            }
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry::Occupied {
            generation: 0,
            value,
        });
        encode(index, 0)
    }

    /// The value behind `handle`, if it is still live.
    pub(crate) fn get(&self, handle: u64) -> Option<&T> {
        let (index, generation) = decode(handle)?;
        match self.entries.get(index as usize)? {
            Entry::Occupied {
                generation: g,
                value,
            } if *g == generation => Some(value),
            _ => None,
        }
    }

    /// Take the value behind `handle` out of the table.
    ///
    /// A slot whose generation would wrap to zero is retired instead of
    /// recycled, so an ancient handle can never name a new engine.
    pub(crate) fn remove(&mut self, handle: u64) -> Option<T> {
        let (index, generation) = decode(handle)?;
        match self.entries.get(index as usize)? {
            Entry::Occupied { generation: g, .. } if *g == generation => {}
            _ => return None,
        }
        let next_generation = generation.wrapping_add(1);
        let retired = next_generation == 0;
        let vacant = Entry::Vacant {
            generation: next_generation,
            next_free: if retired { None } else { self.free_head },
        };
        let old = mem::replace(&mut self.entries[index as usize], vacant);
        if !retired {
            self.free_head = Some(index);
        }
        self.live -= 1;
        match old {
            Entry::Occupied { value, .. } => Some(value),
            Entry::Vacant { .. } => None,
        }
    }

    /// Number of live entries.
    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_never_live() {
        let mut table = HandleTable::new();
        let h = table.insert("engine");
        assert_ne!(h, 0);
        assert_eq!(table.get(0), None);
        assert_eq!(table.remove(0), None);
        assert_eq!(table.get(h), Some(&"engine"));
    }

    #[test]
    fn removed_handle_goes_stale() {
        let mut table = HandleTable::new();
        let h = table.insert(7u8);
        assert_eq!(table.remove(h), Some(7));
        assert_eq!(table.get(h), None);
        assert_eq!(table.remove(h), None);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn vacant_slots_are_reused_with_new_generation() {
        let mut table = HandleTable::new();
        let a = table.insert(1u8);
        let b = table.insert(2u8);
        table.remove(a);
        let c = table.insert(3u8);
        assert_eq!(decode(c).map(|(i, _)| i), decode(a).map(|(i, _)| i));
        assert_ne!(c, a);
        assert_eq!(table.get(a), None);
        assert_eq!(table.get(b), Some(&2));
        assert_eq!(table.get(c), Some(&3));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn free_list_is_lifo() {
        let mut table = HandleTable::new();
        let handles: Vec<_> = (0..3u8).map(|v| table.insert(v)).collect();
        table.remove(handles[0]);
        table.remove(handles[2]);
        let first = table.insert(10);
        let second = table.insert(11);
        assert_eq!(decode(first).unwrap().0, 2);
        assert_eq!(decode(second).unwrap().0, 0);
    }

    #[test]
    fn wrapped_generation_retires_slot() {
        let mut table = HandleTable::new();
        let h = table.insert(1u8);
        table.remove(h);
        if let Entry::Vacant { generation, .. } = &mut table.entries[0] {
            *generation = u32::MAX;
        }
        let last = table.insert(2u8);
        assert_eq!(decode(last), Some((0, u32::MAX)));
        assert_eq!(table.remove(last), Some(2));
        let fresh = table.insert(3u8);
        assert_eq!(decode(fresh).unwrap().0, 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashMap;

        proptest! {
            #[test]
            fn live_handles_match_model(
                ops in prop::collection::vec(any::<Option<usize>>(), 1..200),
            ) {
                let mut table = HandleTable::new();
                let mut model: HashMap<u64, usize> = HashMap::new();
                let mut dead: Vec<u64> = Vec::new();
                for (step, op) in ops.into_iter().enumerate() {
                    match op {
                        None => {
                            let h = table.insert(step);
                            prop_assert_ne!(h, 0);
                            prop_assert!(model.insert(h, step).is_none());
                        }
                        Some(pick) if !model.is_empty() => {
                            let mut keys: Vec<u64> = model.keys().copied().collect();
                            keys.sort_unstable();
                            let h = keys[pick % keys.len()];
                            prop_assert_eq!(table.remove(h), model.remove(&h));
                            dead.push(h);
                        }
                        Some(_) => {}
                    }
                    prop_assert_eq!(table.len(), model.len());
                    for (h, v) in &model {
                        prop_assert_eq!(table.get(*h), Some(v));
                    }
                    for h in &dead {
                        prop_assert_eq!(table.get(*h), None);
                    }
                }
            }
        }
    }
}
