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

//! Artifact header contract
//!
//! Every generated artifact starts with two lines:
//!
//! ```text
//! // Modifying this comment will cause the next execution of dotlearn to overwrite this file.
//! // <fingerprint>
//! ```
//!
//! The fingerprint is the canonical shape of the declaration, either verbatim or
//! zlib-compressed and hex-encoded depending on the kind of declaration.

use crate::error::{CompileError, CompileResult};
use crate::semantic::GeneratorKind;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

/// First line of every generated artifact
pub const DISCLAIMER: &str = "// Modifying this comment will cause the next execution of dotlearn to overwrite this file.";

/// Prefix of the fingerprint line
pub const FINGERPRINT_PREFIX: &str = "// ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Raw,
    Compressed,
}

impl Encoding {
    pub fn for_kind(kind: GeneratorKind) -> Self {
        match kind {
            GeneratorKind::Alias | GeneratorKind::Conjunction | GeneratorKind::InferenceInvocation => Encoding::Raw,
            GeneratorKind::Coded | GeneratorKind::Composite | GeneratorKind::Learning | GeneratorKind::Constraint | GeneratorKind::Inference => {
                Encoding::Compressed
            }
        }
    }
}

/// Canonical shape of a declaration together with how it is written into artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    shape: String,
    encoding: Encoding,
}

impl Fingerprint {
    pub fn new(shape: impl Into<String>, encoding: Encoding) -> Self {
        let shape: String = shape.into();
        Self {
            shape: shape.replace(['\r', '\n'], ""),
            encoding,
        }
    }

    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Text written after [`FINGERPRINT_PREFIX`] on the second line
    pub fn encode(&self) -> io::Result<String> {
        match self.encoding {
            Encoding::Raw => Ok(self.shape.clone()),
            Encoding::Compressed => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(self.shape.as_bytes())?;
                Ok(hex::encode(encoder.finish()?))
            }
        }
    }

    /// Recover the shape from an encoded fingerprint; `None` if it cannot be decoded
    pub fn decode(encoded: &str, encoding: Encoding) -> Option<String> {
        match encoding {
            Encoding::Raw => Some(encoded.to_string()),
            Encoding::Compressed => {
                let bytes = hex::decode(encoded.trim()).ok()?;
                let mut shape = String::new();
                ZlibDecoder::new(bytes.as_slice()).read_to_string(&mut shape).ok()?;
                Some(shape)
            }
        }
    }

    /// Whether an encoded fingerprint read from an artifact describes this shape
    pub fn matches(&self, encoded: &str) -> bool {
        Fingerprint::decode(encoded, self.encoding).is_some_and(|shape| shape == self.shape)
    }

    /// Write the two header lines
    pub fn write_header(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{DISCLAIMER}")?;
        writeln!(out, "{FINGERPRINT_PREFIX}{}", self.encode()?)
    }
}

/// What the first two lines of an existing artifact say
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    /// Well-formed header carrying this encoded fingerprint
    Generated(String),
    /// The file was not written by dotlearn, or its header was edited
    Foreign,
}

/// Read exactly the first two lines of an artifact
///
/// Lines are read as bytes: a hand-edited file in any encoding is foreign, not an I/O failure.
pub fn read_header(path: &Path) -> CompileResult<Header> {
    let file = File::open(path).map_err(|e| CompileError::io(path, e))?;
    let mut reader = BufReader::new(file);

    let mut next_line = || -> CompileResult<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let read = reader.read_until(b'\n', &mut line).map_err(|e| CompileError::io(path, e))?;
        if read == 0 {
            return Ok(None);
        }
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        Ok(Some(line))
    };
    let first = next_line()?;
    let second = next_line()?;

    match (first, second) {
        (Some(first), Some(second)) if first == DISCLAIMER.as_bytes() => match second.strip_prefix(FINGERPRINT_PREFIX.as_bytes()) {
            Some(encoded) => Ok(Header::Generated(String::from_utf8_lossy(encoded).into_owned())),
            None => Ok(Header::Foreign),
        },
        _ => Ok(Header::Foreign),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_encoding_is_hex_and_reversible() {
        let fingerprint = Fingerprint::new("discrete Word(Token t) <- { return t.form; }", Encoding::Compressed);
        let encoded = fingerprint.encode().unwrap();
        assert!(encoded.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(Fingerprint::decode(&encoded, Encoding::Compressed).as_deref(), Some(fingerprint.shape()));
        assert!(fingerprint.matches(&encoded));
    }

    #[test]
    fn test_raw_encoding_drops_newlines() {
        let fingerprint = Fingerprint::new("discrete Alias(Token) <-\nWord", Encoding::Raw);
        assert_eq!(fingerprint.encode().unwrap(), "discrete Alias(Token) <-Word");
    }

    #[test]
    fn test_undecodable_fingerprint_does_not_match() {
        let fingerprint = Fingerprint::new("anything", Encoding::Compressed);
        assert!(!fingerprint.matches("not hex at all"));
        assert!(!fingerprint.matches("deadbeef"));
    }

    #[test]
    fn test_encoding_by_kind() {
        assert_eq!(Encoding::for_kind(GeneratorKind::Alias), Encoding::Raw);
        assert_eq!(Encoding::for_kind(GeneratorKind::Conjunction), Encoding::Raw);
        assert_eq!(Encoding::for_kind(GeneratorKind::Learning), Encoding::Compressed);
        assert_eq!(Encoding::for_kind(GeneratorKind::Inference), Encoding::Compressed);
    }

    #[test]
    fn test_header_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Word.rs");
        let fingerprint = Fingerprint::new("discrete Word(Token) <- { }", Encoding::Compressed);

        let mut bytes = Vec::new();
        fingerprint.write_header(&mut bytes).unwrap();
        bytes.extend_from_slice(b"fn body() {}\n");
        std::fs::write(&path, bytes).unwrap();

        match read_header(&path).unwrap() {
            Header::Generated(encoded) => assert!(fingerprint.matches(&encoded)),
            Header::Foreign => panic!("header not recognized"),
        }
    }

    #[test]
    fn test_foreign_headers() {
        let dir = tempfile::tempdir().unwrap();
        let edited = dir.path().join("edited.rs");
        std::fs::write(&edited, "// my own notes\n// 1234\n").unwrap();
        assert_eq!(read_header(&edited).unwrap(), Header::Foreign);

        let short = dir.path().join("short.rs");
        std::fs::write(&short, format!("{DISCLAIMER}\n")).unwrap();
        assert_eq!(read_header(&short).unwrap(), Header::Foreign);

        let unprefixed = dir.path().join("unprefixed.rs");
        std::fs::write(&unprefixed, format!("{DISCLAIMER}\nfn main() {{}}\n")).unwrap();
        assert_eq!(read_header(&unprefixed).unwrap(), Header::Foreign);
    }

    #[test]
    fn test_non_utf8_header_is_foreign() {
        let dir = tempfile::tempdir().unwrap();
        let latin1 = dir.path().join("latin1.rs");
        std::fs::write(&latin1, b"// \xff\xfe hand written\nfn main() {}\n").unwrap();
        assert_eq!(read_header(&latin1).unwrap(), Header::Foreign);

        let fingerprint = Fingerprint::new("discrete Word(Token) <- { }", Encoding::Compressed);
        let garbled = dir.path().join("garbled.rs");
        let mut bytes = format!("{DISCLAIMER}\r\n{FINGERPRINT_PREFIX}").into_bytes();
        bytes.extend_from_slice(b"\xff\xfe\n");
        std::fs::write(&garbled, bytes).unwrap();
        match read_header(&garbled).unwrap() {
            Header::Generated(encoded) => assert!(!fingerprint.matches(&encoded)),
            Header::Foreign => panic!("disclaimer not recognized"),
        }
    }
}
