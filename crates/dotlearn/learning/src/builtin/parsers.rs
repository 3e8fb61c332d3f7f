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

use crate::error::{LearningError, LearningResult};
use crate::example::Example;
use crate::traits::Parser;
use std::fs;
use std::path::Path;

/// Parser over examples held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryParser {
    examples: Vec<Example>,
    cursor: usize,
}

impl MemoryParser {
    pub fn new(examples: Vec<Example>) -> Self {
        Self { examples, cursor: 0 }
    }

    pub fn from_objects(objects: Vec<serde_json::Value>) -> Self {
        Self::new(objects.into_iter().map(Example::Object).collect())
    }
}

impl Parser for MemoryParser {
    fn next(&mut self) -> Option<Example> {
        let example = self.examples.get(self.cursor).cloned();
        if example.is_some() {
            self.cursor += 1;
        }
        example
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Parser reading one JSON object per line; blank lines are skipped
#[derive(Debug, Clone)]
pub struct JsonLinesParser {
    inner: MemoryParser,
}

impl JsonLinesParser {
    pub fn open(path: impl AsRef<Path>) -> LearningResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| LearningError::io(path, e))?;
        let objects = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| {
                serde_json::from_str(line).map_err(|e| LearningError::Serialization(format!("{}:{}: {e}", path.display(), number + 1)))
            })
            .collect::<LearningResult<Vec<_>>>()?;
        Ok(Self {
            inner: MemoryParser::from_objects(objects),
        })
    }
}

impl Parser for JsonLinesParser {
    fn next(&mut self) -> Option<Example> {
        self.inner.next()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}
