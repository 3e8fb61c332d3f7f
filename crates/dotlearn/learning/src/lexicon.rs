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

//! Feature lexicon: deduplicated feature to integer index mapping

use crate::error::{LearningError, LearningResult};
use crate::example::{Feature, FeatureKey};
use crate::persist;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Dense, insertion ordered index over feature keys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lexicon {
    keys: Vec<FeatureKey>,
    #[serde(skip)]
    index: HashMap<FeatureKey, u32>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `feature`'s key, inserting it if unseen
    pub fn lookup_or_insert(&mut self, feature: &Feature) -> u32 {
        let key = feature.key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.keys.len() as u32;
        self.keys.push(key.clone());
        self.index.insert(key, idx);
        idx
    }

    pub fn lookup(&self, feature: &Feature) -> Option<u32> {
        self.index.get(&feature.key()).copied()
    }

    pub fn key(&self, idx: u32) -> Option<&FeatureKey> {
        self.keys.get(idx as usize)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn write(&self, path: &Path) -> LearningResult<()> {
        persist::write_compressed(path, self)
    }

    pub fn read(path: &Path) -> LearningResult<Self> {
        let mut lexicon: Lexicon = persist::read_compressed(path)?;
        lexicon.rebuild_index()?;
        Ok(lexicon)
    }

    fn rebuild_index(&mut self) -> LearningResult<()> {
        self.index.clear();
        for (idx, key) in self.keys.iter().enumerate() {
            if self.index.insert(key.clone(), idx as u32).is_some() {
                return Err(LearningError::Serialization(format!("duplicate lexicon entry `{key}`")));
            }
        }
        Ok(())
    }
}
