//! Hashing for identity keys and packaged file checksums.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// SHA-256 of a file's contents, hex encoded.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Incremental SHA-256 over a sequence of lines.
///
/// Each component is followed by `\n`, so hashing the lines of a text gives
/// the same digest as hashing the text itself (when it ends in a newline).
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add one line.
    pub fn update_line(&mut self, line: &str) -> &mut Self {
        self.hasher.update(line.as_bytes());
        self.hasher.update(b"\n");
        self
    }

    /// Add several lines in order.
    pub fn update_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> &mut Self {
        for line in lines {
            self.update_line(line);
        }
        self
    }

    /// Hex digest.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// First 16 hex characters of the digest.
    pub fn finish_short(self) -> String {
        let mut digest = self.finish();
        digest.truncate(16);
        digest
    }
}
