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

use std::hash::Hash;

use clockpro_common::slab::{Slab, Token};
use equivalent::Equivalent;
use hashbrown::hash_table::HashTable;

use crate::record::Record;

/// Key to record lookup table.
///
/// Stores only tokens. Keys and hashes are read from the records in the slab, so every record is indexed under
/// exactly one token.
#[derive(Debug, Default)]
pub struct Indexer {
    table: HashTable<Token>,
}

impl Indexer {
    /// Index the record of the token. The key must not be indexed yet.
    pub fn insert<K, V>(&mut self, slab: &Slab<Record<K, V>>, token: Token) {
        self.table
            .insert_unique(slab[token].hash(), token, |&t| slab[t].hash());
    }

    /// Find the token of the record with the given key.
    pub fn get<K, V, Q>(&self, slab: &Slab<Record<K, V>>, hash: u64, key: &Q) -> Option<Token>
    where
        Q: Hash + Equivalent<K> + ?Sized,
    {
        self.table.find(hash, |&t| key.equivalent(slab[t].key())).copied()
    }

    /// Drop the record of the token from the table, returns `false` if it is not indexed.
    pub fn remove<K, V>(&mut self, slab: &Slab<Record<K, V>>, token: Token) -> bool {
        match self.table.find_entry(slab[token].hash(), |&t| t == token) {
            Ok(entry) => {
                entry.remove();
                true
            }
            Err(_) => false,
        }
    }

    /// Check if the token is indexed.
    pub fn contains<K, V>(&self, slab: &Slab<Record<K, V>>, token: Token) -> bool {
        self.table.find(slab[token].hash(), |&t| t == token).is_some()
    }

    /// Count of indexed records.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if no record is indexed.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
