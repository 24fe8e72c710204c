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

//! Intrusive circular list with a CLOCK hand.
//!
//! Nodes live in a [`Slab`] and carry their own [`Link`]. A [`Ring`] only owns the hand and the length, so moving a
//! node between rings never reallocates it and its token stays valid.

use clockpro_common::slab::{Slab, Token};

/// Identifier of a [`Ring`], recorded in the links of its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RingId(pub u8);

/// Ring links embedded in a node.
///
/// An unlinked node points to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    prev: Token,
    next: Token,
    ring: Option<RingId>,
}

impl Link {
    /// Create the unlinked links of the node stored under `token`.
    pub fn new(token: Token) -> Self {
        Self {
            prev: token,
            next: token,
            ring: None,
        }
    }

    /// The ring holding the node, if any.
    pub fn ring(&self) -> Option<RingId> {
        self.ring
    }

    /// Check if the node is a member of any ring.
    pub fn is_linked(&self) -> bool {
        self.ring.is_some()
    }

    /// Predecessor of the node.
    pub fn prev(&self) -> Token {
        self.prev
    }

    /// Successor of the node.
    pub fn next(&self) -> Token {
        self.next
    }
}

/// Node that can be linked into a [`Ring`].
pub trait Linked {
    /// Links of the node.
    fn link(&self) -> &Link;
    /// Mutable links of the node.
    fn link_mut(&mut self) -> &mut Link;
}

/// Circular doubly-linked list over slab tokens with a movable hand.
#[derive(Debug)]
pub struct Ring {
    id: RingId,
    hand: Option<Token>,
    len: usize,
}

impl Ring {
    /// Create an empty ring.
    pub fn new(id: RingId) -> Self {
        Self { id, hand: None, len: 0 }
    }

    /// Identifier of the ring.
    pub fn id(&self) -> RingId {
        self.id
    }

    /// Count of members.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the ring has no member.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Node at the hand.
    pub fn current(&self) -> Option<Token> {
        self.hand
    }

    /// Check if the node is a member of this ring.
    pub fn contains<T: Linked>(&self, slab: &Slab<T>, token: Token) -> bool {
        slab.get(token).is_some_and(|node| node.link().ring == Some(self.id))
    }

    /// Splice the node right after the hand. The node becomes the hand if the ring is empty.
    ///
    /// # Panics
    ///
    /// Panics if the node is already linked.
    pub fn insert<T: Linked>(&mut self, slab: &mut Slab<T>, token: Token) {
        assert!(
            !slab[token].link().is_linked(),
            "insert node {token:?} into {:?}, but it is linked to {:?}",
            self.id,
            slab[token].link().ring
        );

        match self.hand {
            None => {
                let link = slab[token].link_mut();
                link.prev = token;
                link.next = token;
                self.hand = Some(token);
            }
            Some(hand) => {
                let next = slab[hand].link().next;
                let link = slab[token].link_mut();
                link.prev = hand;
                link.next = next;
                slab[next].link_mut().prev = token;
                slab[hand].link_mut().next = token;
            }
        }

        slab[token].link_mut().ring = Some(self.id);
        self.len += 1;
    }

    /// Detach the node. If it is the hand, the hand moves to its successor.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a member of this ring.
    pub fn remove<T: Linked>(&mut self, slab: &mut Slab<T>, token: Token) {
        let link = *slab[token].link();
        assert_eq!(
            link.ring,
            Some(self.id),
            "remove node {token:?} from {:?}, but it is not a member",
            self.id
        );

        if self.len == 1 {
            self.hand = None;
        } else {
            if self.hand == Some(token) {
                self.hand = Some(link.next);
            }
            slab[link.prev].link_mut().next = link.next;
            slab[link.next].link_mut().prev = link.prev;
        }

        *slab[token].link_mut() = Link::new(token);
        self.len -= 1;
    }

    /// Move the hand to its successor.
    pub fn advance<T: Linked>(&mut self, slab: &Slab<T>) {
        if let Some(hand) = self.hand {
            self.hand = Some(slab[hand].link().next);
        }
    }

    /// Move the hand to its predecessor.
    pub fn retreat<T: Linked>(&mut self, slab: &Slab<T>) {
        if let Some(hand) = self.hand {
            self.hand = Some(slab[hand].link().prev);
        }
    }

    /// Walk the ring once, starting at the hand.
    pub fn iter<'a, T: Linked>(&self, slab: &'a Slab<T>) -> Iter<'a, T> {
        Iter {
            slab,
            next: self.hand,
            remaining: self.len,
        }
    }
}

/// Iterator over the members of a [`Ring`], see [`Ring::iter`].
pub struct Iter<'a, T> {
    slab: &'a Slab<T>,
    next: Option<Token>,
    remaining: usize,
}

impl<T: Linked> Iterator for Iter<'_, T> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let token = self.next?;
        self.remaining -= 1;
        self.next = Some(self.slab[token].link().next);
        Some(token)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
