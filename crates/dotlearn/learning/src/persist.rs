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

//! Compressed serialization of learner state and side files

use crate::error::{LearningError, LearningResult};
use crate::traits::Learner;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Encode `value` with bincode into `out`
pub fn encode_into<T: Serialize>(value: &T, out: &mut dyn Write) -> LearningResult<()> {
    let mut out = out;
    bincode::serde::encode_into_std_write(value, &mut out, bincode::config::standard())
        .map(|_| ())
        .map_err(|e| LearningError::Serialization(e.to_string()))
}

/// Write `value` to `path`, bincode encoded and gzip compressed
pub fn write_compressed<T: Serialize>(path: &Path, value: &T) -> LearningResult<()> {
    let file = File::create(path).map_err(|e| LearningError::io(path, e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    encode_into(value, &mut encoder)?;
    let mut writer = encoder.finish().map_err(|e| LearningError::io(path, e))?;
    writer.flush().map_err(|e| LearningError::io(path, e))
}

/// Read a value written by [`write_compressed`]
pub fn read_compressed<T: DeserializeOwned>(path: &Path) -> LearningResult<T> {
    let file = File::open(path).map_err(|e| LearningError::io(path, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    bincode::serde::decode_from_std_read(&mut decoder, bincode::config::standard()).map_err(|e| LearningError::Serialization(e.to_string()))
}

/// Persist a learner's trained state to its side artifact
pub fn write_learner(path: &Path, learner: &dyn Learner) -> LearningResult<()> {
    let file = File::create(path).map_err(|e| LearningError::io(path, e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    learner.write(&mut encoder)?;
    let mut writer = encoder.finish().map_err(|e| LearningError::io(path, e))?;
    writer.flush().map_err(|e| LearningError::io(path, e))
}

/// Serialized state of a learner as raw bytes, for comparing two learners
pub fn learner_bytes(learner: &dyn Learner) -> LearningResult<Vec<u8>> {
    let mut buffer = Vec::new();
    learner.write(&mut buffer)?;
    Ok(buffer)
}
