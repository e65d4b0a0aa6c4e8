// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Corpus wide identifier index
//!
//! Built once per run from every document's declared entities and read
//! without locking afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::classifier::DeclaredType;
use crate::document::Document;
use crate::extractor::{DeclaredEntity, declared_entities};

/// Identifier lookup over all declared entities of a corpus
#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
    by_id: HashMap<String, Vec<DeclaredEntity>>,
    entity_count: usize,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every entity declared by `documents`
    pub fn build<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut index = Self::new();
        for document in documents {
            for entity in declared_entities(document) {
                index.insert(entity);
            }
        }
        index
    }

    pub fn insert(&mut self, entity: DeclaredEntity) {
        self.entity_count += 1;
        self.by_id.entry(entity.id.clone()).or_default().push(entity);
    }

    /// Declarations of `id` with the given type, in insertion order
    pub fn lookup<'a>(&'a self, entity_type: DeclaredType, id: &str) -> impl Iterator<Item = &'a DeclaredEntity> + use<'a> {
        self.by_id.get(id).into_iter().flatten().filter(move |e| e.entity_type == entity_type)
    }

    /// Documents declaring `entity_type` `id`, sorted
    pub fn owners(&self, entity_type: DeclaredType, id: &str) -> BTreeSet<&str> {
        self.lookup(entity_type, id).map(|e| e.document.as_str()).collect()
    }

    /// Types under which `id` is declared anywhere
    pub fn types_for(&self, id: &str) -> BTreeSet<DeclaredType> {
        self.by_id.get(id).into_iter().flatten().map(|e| e.entity_type).collect()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// (type, id) pairs declared more than once, with every declaration
    pub fn duplicates(&self) -> BTreeMap<(DeclaredType, String), Vec<&DeclaredEntity>> {
        let mut groups: BTreeMap<(DeclaredType, String), Vec<&DeclaredEntity>> = BTreeMap::new();
        for entity in self.by_id.values().flatten() {
            groups.entry((entity.entity_type, entity.id.clone())).or_default().push(entity);
        }
        groups.retain(|_, entries| entries.len() > 1);
        groups
    }

    /// Total number of indexed declarations
    pub fn len(&self) -> usize {
        self.entity_count
    }

    pub fn is_empty(&self) -> bool {
        self.entity_count == 0
    }
}
