//! Package access for 3MF files
//!
//! 3MF files are ZIP archives. This module opens the archive, enumerates its
//! entries with shell-style patterns and reads entry contents. The archive
//! handle lives inside [`Package`] and is released when the package is
//! dropped, on every exit path.

use crate::error::{Error, Result};
use crate::model::PackageLayout;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

/// Root model entry used by plain 3MF producers
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// Per-object model entries written by filament-painting slicers
pub const OBJECT_MODELS_PATTERN: &str = "3D/Objects/*.model";

/// Slicing metadata holding the filament color table
pub const SLICE_INFO_PATH: &str = "Metadata/slice_info.config";

/// An opened 3MF package
pub struct Package<R: Read> {
    archive: ZipArchive<R>,
}

impl Package<BufReader<File>> {
    /// Open a package from a file on disk
    ///
    /// Fails with [`Error::Io`] when the path cannot be opened and with
    /// [`Error::Zip`] when the file is not a readable ZIP archive.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::open(BufReader::new(file))
    }
}

impl<R: Read + Seek> Package<R> {
    /// Open a package from a reader
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        debug!(entries = archive.len(), "opened 3MF package");
        Ok(Self { archive })
    }

    /// Get the number of entries in the archive
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Check if the archive is empty
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// List all entry names in the archive's directory order
    pub fn entry_names(&mut self) -> Vec<String> {
        (0..self.archive.len())
            .filter_map(|i| self.archive.by_index(i).ok().map(|f| f.name().to_string()))
            .collect()
    }

    /// List entry names matching a shell-style glob such as `3D/Objects/*.model`
    ///
    /// The result keeps the archive's directory order.
    pub fn list_entries(&mut self, pattern: &str) -> Result<Vec<String>> {
        let pattern = EntryPattern::new(pattern)?;
        Ok(self
            .entry_names()
            .into_iter()
            .filter(|name| pattern.matches(name))
            .collect())
    }

    /// Check if an entry exists in the archive
    pub fn has_entry(&mut self, name: &str) -> bool {
        self.archive.by_name(name).is_ok()
    }

    /// Read an entry's bytes, failing with [`Error::MissingFile`] if it is absent
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        self.read_optional_entry(name)?
            .ok_or_else(|| Error::MissingFile(name.to_string()))
    }

    /// Read an entry's bytes, returning `None` if it is absent
    pub fn read_optional_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(Error::Zip(e)),
        };
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(Some(content))
    }

    /// Detect which package layout is present
    ///
    /// Per-object model entries take precedence: slicers that write them also
    /// write a root model that only holds components.
    pub fn detect_layout(&mut self) -> Result<PackageLayout> {
        let object_models = self.list_entries(OBJECT_MODELS_PATTERN)?;
        if !object_models.is_empty() {
            return Ok(PackageLayout::FilamentPaint);
        }
        if self.has_entry(MODEL_PATH) {
            return Ok(PackageLayout::Legacy);
        }
        Err(Error::MissingFile(format!(
            "no model entry: expected {} or {}",
            OBJECT_MODELS_PATTERN, MODEL_PATH
        )))
    }

    /// Model entry names for a layout, in archive order
    pub fn model_entries(&mut self, layout: PackageLayout) -> Result<Vec<String>> {
        match layout {
            PackageLayout::FilamentPaint => self.list_entries(OBJECT_MODELS_PATTERN),
            PackageLayout::Legacy => Ok(vec![MODEL_PATH.to_string()]),
        }
    }
}

/// A compiled shell-style glob over archive entry names
///
/// Supports `*` (any run of characters, including `/`), `?` (one character)
/// and bracket classes `[abc]`, `[a-z]`, `[!abc]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPattern {
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
    Class {
        negated: bool,
        ranges: Vec<(char, char)>,
    },
}

impl EntryPattern {
    /// Compile a pattern
    pub fn new(pattern: &str) -> Result<Self> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '*' => {
                    // Collapse runs of stars
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyChar);
                    i += 1;
                }
                '[' => {
                    let (token, next) = Self::parse_class(&chars, i, pattern)?;
                    tokens.push(token);
                    i = next;
                }
                c => {
                    tokens.push(Token::Literal(c));
                    i += 1;
                }
            }
        }

        Ok(Self { tokens })
    }

    fn parse_class(chars: &[char], start: usize, pattern: &str) -> Result<(Token, usize)> {
        let mut i = start + 1;
        let negated = matches!(chars.get(i), Some('!') | Some('^'));
        if negated {
            i += 1;
        }

        let mut ranges = Vec::new();
        let mut first = true;
        loop {
            let Some(&c) = chars.get(i) else {
                return Err(Error::InvalidPattern(format!(
                    "unterminated character class in '{}'",
                    pattern
                )));
            };
            // A leading ']' is a literal member
            if c == ']' && !first {
                return Ok((Token::Class { negated, ranges }, i + 1));
            }
            first = false;

            if chars.get(i + 1) == Some(&'-') && chars.get(i + 2).is_some_and(|&e| e != ']') {
                ranges.push((c, chars[i + 2]));
                i += 3;
            } else {
                ranges.push((c, c));
                i += 1;
            }
        }
    }

    /// Check whether a name matches the whole pattern
    pub fn matches(&self, name: &str) -> bool {
        let name: Vec<char> = name.chars().collect();
        let (mut t, mut n) = (0, 0);
        // Position of the last `*` and the name index it is currently absorbing up to
        let mut backtrack: Option<(usize, usize)> = None;

        while n < name.len() {
            let step = match self.tokens.get(t) {
                Some(Token::AnyRun) => {
                    backtrack = Some((t, n));
                    t += 1;
                    continue;
                }
                Some(token) => token.matches_char(name[n]),
                None => false,
            };

            if step {
                t += 1;
                n += 1;
            } else if let Some((star, absorbed)) = backtrack {
                t = star + 1;
                n = absorbed + 1;
                backtrack = Some((star, absorbed + 1));
            } else {
                return false;
            }
        }

        self.tokens[t..].iter().all(|token| *token == Token::AnyRun)
    }
}

impl Token {
    fn matches_char(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyChar => true,
            Token::AnyRun => true,
            Token::Class { negated, ranges } => {
                let hit = ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
                hit != *negated
            }
        }
    }
}
