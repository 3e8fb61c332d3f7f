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

//! Artifact writing
//!
//! The header (disclaimer plus fingerprint) is owned here so that it always matches
//! what revision analysis expects to read back. The body comes from a pluggable
//! [`CodeEmitter`].

use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult};
use crate::revision::fingerprint::{Fingerprint, Header, read_header};
use crate::semantic::{CodeGenerator, GeneratorKind};
use crate::types::ClassifierReturnType;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

/// Everything an emitter may know about the artifact it writes
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSpec {
    pub name: String,
    pub kind: GeneratorKind,
    pub input_type: Option<String>,
    pub return_type: Option<ClassifierReturnType>,
    /// Names the generated code calls at runtime
    pub invokes: BTreeSet<String>,
    pub fingerprint: Fingerprint,
}

impl ArtifactSpec {
    pub fn new(generator: &CodeGenerator, invokes: BTreeSet<String>, fingerprint: Fingerprint) -> Self {
        Self {
            name: generator.name.clone(),
            kind: generator.kind,
            input_type: generator.input_type.clone(),
            return_type: generator.return_type.clone(),
            invokes,
            fingerprint,
        }
    }
}

/// Produces the body of an artifact, after the header
pub trait CodeEmitter: Send + Sync {
    fn emit_body(&self, artifact: &ArtifactSpec, out: &mut dyn Write) -> io::Result<()>;
}

/// Emitter writing a short descriptive comment block
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryEmitter;

impl CodeEmitter for SummaryEmitter {
    fn emit_body(&self, artifact: &ArtifactSpec, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "// {} `{}`", artifact.kind.label(), artifact.name)?;
        if let Some(input_type) = &artifact.input_type {
            writeln!(out, "// input: {input_type}")?;
        }
        if let Some(return_type) = &artifact.return_type {
            writeln!(out, "// returns: {return_type}")?;
        }
        if !artifact.invokes.is_empty() {
            let invokes: Vec<&str> = artifact.invokes.iter().map(String::as_str).collect();
            writeln!(out, "// invokes: {}", invokes.join(", "))?;
        }
        Ok(())
    }
}

/// Writes artifacts into the configured directory
#[derive(Clone)]
pub struct ArtifactWriter {
    generated_dir: PathBuf,
    extension: String,
    emitter: std::sync::Arc<dyn CodeEmitter>,
}

impl ArtifactWriter {
    pub fn new(config: &CompilerConfig, emitter: std::sync::Arc<dyn CodeEmitter>) -> Self {
        Self {
            generated_dir: config.generated_dir.clone(),
            extension: config.artifact_extension.clone(),
            emitter,
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.generated_dir.join(format!("{name}.{}", self.extension))
    }

    /// Write the artifact, replacing any previous version dotlearn generated
    ///
    /// An existing file without a dotlearn header is left untouched.
    pub fn write(&self, artifact: &ArtifactSpec) -> CompileResult<PathBuf> {
        let path = self.path_for(&artifact.name);
        if path.exists() && read_header(&path)? == Header::Foreign {
            return Err(CompileError::ProtectedOverwrite { path });
        }
        fs::create_dir_all(&self.generated_dir).map_err(|e| CompileError::io(&self.generated_dir, e))?;

        let mut contents = Vec::new();
        artifact
            .fingerprint
            .write_header(&mut contents)
            .and_then(|_| self.emitter.emit_body(artifact, &mut contents))
            .map_err(|e| CompileError::io(&path, e))?;
        fs::write(&path, contents).map_err(|e| CompileError::io(&path, e))?;

        debug!(name = %artifact.name, path = %path.display(), "artifact written");
        Ok(path)
    }
}

impl std::fmt::Debug for ArtifactWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactWriter")
            .field("generated_dir", &self.generated_dir)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}
