// Copyright 2026 clockpro Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A slab arena addressed by stable [`Token`]s.
//!
//! Vacant slots are chained into a free list and reused by later insertions. A token stays valid until the value it
//! points to is removed.

use std::{
    num::NonZeroUsize,
    ops::{Index, IndexMut},
};

/// Stable handle of a value stored in a [`Slab`].
///
/// `Option<Token>` has the same size as `Token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(NonZeroUsize);

impl Token {
    fn new(index: usize) -> Self {
        Self(NonZeroUsize::MIN.saturating_add(index))
    }

    /// Slot index of the token.
    pub fn index(&self) -> usize {
        self.0.get() - 1
    }
}

/// Arena of values with O(1) insertion, removal and lookup by [`Token`].
#[derive(Debug)]
pub struct Slab<T> {
    entries: Vec<Entry<T>>,
    len: usize,
    next: usize,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slab<T> {
    /// Create an empty slab.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: 0,
            len: 0,
        }
    }

    /// Create an empty slab with room for `capacity` values before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            next: 0,
            len: 0,
        }
    }

    /// Insert a value built from the token it will be stored under, return the token.
    ///
    /// Useful for self-referencing values, e.g. list nodes linked to themselves.
    pub fn insert_with<F>(&mut self, f: F) -> Token
    where
        F: FnOnce(Token) -> T,
    {
        let index = self.next;
        let token = Token::new(index);
        self.insert_at(index, f(token));
        token
    }

    /// Remove the value of the token, returns `None` if the slot is vacant.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        self.remove_at(token.index())
    }

    /// Get the reference of the value of the token.
    pub fn get(&self, token: Token) -> Option<&T> {
        match self.entries.get(token.index()) {
            Some(Entry::Occupied(val)) => Some(val),
            _ => None,
        }
    }

    /// Get the mutable reference of the value of the token.
    pub fn get_mut(&mut self, token: Token) -> Option<&mut T> {
        match self.entries.get_mut(token.index()) {
            Some(Entry::Occupied(val)) => Some(val),
            _ => None,
        }
    }

    /// Count of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if there is no occupied slot.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_at(&mut self, index: usize, val: T) {
        self.len += 1;

        if index == self.entries.len() {
            self.entries.push(Entry::Occupied(val));
            self.next = index + 1;
        } else {
            self.next = match self.entries.get(index) {
                Some(&Entry::Vacant(next)) => next,
                _ => unreachable!("free list points to an occupied slot: {index}"),
            };
            self.entries[index] = Entry::Occupied(val);
        }
    }

    fn remove_at(&mut self, index: usize) -> Option<T> {
        let entry = self.entries.get_mut(index)?;

        if matches!(entry, Entry::Vacant(_)) {
            return None;
        }

        let entry = std::mem::replace(entry, Entry::Vacant(self.next));

        match entry {
            Entry::Vacant(_) => unreachable!(),
            Entry::Occupied(val) => {
                self.len -= 1;
                self.next = index;
                Some(val)
            }
        }
    }
}

/// Panics if the slot is vacant. A stale token is a bookkeeping bug, not a recoverable condition.
impl<T> Index<Token> for Slab<T> {
    type Output = T;

    fn index(&self, token: Token) -> &Self::Output {
        match self.get(token) {
            Some(val) => val,
            None => panic!("access to vacant slab slot {}", token.index()),
        }
    }
}

/// Panics if the slot is vacant.
impl<T> IndexMut<Token> for Slab<T> {
    fn index_mut(&mut self, token: Token) -> &mut Self::Output {
        match self.get_mut(token) {
            Some(val) => val,
            None => panic!("access to vacant slab slot {}", token.index()),
        }
    }
}

#[derive(Debug, Clone)]
enum Entry<T> {
    Vacant(usize),
    Occupied(T),
}
