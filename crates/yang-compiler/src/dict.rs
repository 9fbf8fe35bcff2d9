//! The repository-wide string pool.
//!
//! Every identifier, keyword argument and value persisted in the schema graph
//! is owned by the [`Dict`] and addressed by a [`Sym`] handle. Handle equality
//! implies byte equality, and the reverse holds because the table dedupes.
//! Entries are reference counted: each module records the refs it acquires and
//! releases exactly those when it is destroyed.

use std::collections::HashMap;
use std::num::NonZeroU32;
use triomphe::Arc;

/// Handle to an interned string. Copyable; resolution goes through the
/// owning [`Dict`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sym(NonZeroU32);

impl Sym {
    fn index(self) -> usize {
        self.0.get() as usize - 1
    }

    fn from_index(index: usize) -> Self {
        Sym(NonZeroU32::new(index as u32 + 1).expect("sym index overflow"))
    }
}

impl std::fmt::Debug for Sym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sym({})", self.0.get())
    }
}

struct Slot {
    text: Arc<str>,
    refs: u32,
}

/// Reference-counted, case-sensitive string pool.
#[derive(Default)]
pub struct Dict {
    map: HashMap<Arc<str>, u32>,
    slots: Vec<Option<Slot>>,
    free: Vec<u32>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a copy of `text`, taking one reference on the entry.
    pub fn insert(&mut self, text: &str) -> Sym {
        if let Some(&index) = self.map.get(text) {
            let slot = self.slots[index as usize].as_mut().expect("mapped slot");
            slot.refs += 1;
            return Sym::from_index(index as usize);
        }
        self.insert_new(Arc::from(text))
    }

    /// Intern `text`, consuming the caller's buffer, taking one reference.
    pub fn insert_owned(&mut self, text: String) -> Sym {
        if let Some(&index) = self.map.get(text.as_str()) {
            let slot = self.slots[index as usize].as_mut().expect("mapped slot");
            slot.refs += 1;
            return Sym::from_index(index as usize);
        }
        self.insert_new(Arc::from(text.as_str()))
    }

    fn insert_new(&mut self, text: Arc<str>) -> Sym {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(Slot {
                    text: text.clone(),
                    refs: 1,
                });
                index
            }
            None => {
                self.slots.push(Some(Slot {
                    text: text.clone(),
                    refs: 1,
                }));
                (self.slots.len() - 1) as u32
            }
        };
        self.map.insert(text, index);
        Sym::from_index(index as usize)
    }

    /// Take an additional reference on an existing entry.
    pub fn retain(&mut self, sym: Sym) {
        let slot = self.slots[sym.index()].as_mut().expect("live sym");
        slot.refs += 1;
    }

    /// Drop one reference; the entry is freed when the count reaches zero.
    pub fn release(&mut self, sym: Sym) {
        let index = sym.index();
        let slot = self.slots[index].as_mut().expect("live sym");
        slot.refs -= 1;
        if slot.refs == 0 {
            let slot = self.slots[index].take().expect("live sym");
            self.map.remove(&slot.text);
            self.free.push(index as u32);
        }
    }

    /// Resolve a handle to its text.
    pub fn str(&self, sym: Sym) -> &str {
        &self.slots[sym.index()].as_ref().expect("live sym").text
    }

    /// Current reference count of `text`, or 0 when not interned.
    pub fn refs(&self, text: &str) -> u32 {
        self.map
            .get(text)
            .and_then(|&index| self.slots[index as usize].as_ref())
            .map_or(0, |slot| slot.refs)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_dedupes_and_counts() {
        let mut dict = Dict::new();
        let a = dict.insert("leaf");
        let b = dict.insert_owned("leaf".to_string());
        assert_eq!(a, b);
        assert_eq!(dict.refs("leaf"), 2);
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn it_frees_on_last_release() {
        let mut dict = Dict::new();
        let a = dict.insert("x");
        dict.retain(a);
        dict.release(a);
        assert_eq!(dict.refs("x"), 1);
        dict.release(a);
        assert_eq!(dict.refs("x"), 0);
        assert!(dict.is_empty());
    }

    #[test]
    fn it_reuses_freed_slots() {
        let mut dict = Dict::new();
        let a = dict.insert("gone");
        dict.release(a);
        let b = dict.insert("back");
        assert_eq!(dict.str(b), "back");
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn it_is_case_sensitive() {
        let mut dict = Dict::new();
        let lower = dict.insert("name");
        let upper = dict.insert("Name");
        assert_ne!(lower, upper);
    }
}
