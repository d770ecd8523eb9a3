//! Level catalog: the ordered list of CV sections.
//!
//! ## Sources (priority order):
//!   1. `general.levels_file` from config (TOML, `[[level]]` tables)
//!   2. Built-in sections
//!
//! ## File format:
//!   ```toml
//!   [[level]]
//!   name = "About Me"
//!   content = "First line<br>Second line"
//!   ```
//!
//! Content is rich text: `<br>` separates lines. Everything else is shown
//! verbatim.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// One CV section, gated behind a batch of coins.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LevelRecord {
    pub name: String,
    pub content: String,
}

impl LevelRecord {
    pub fn new(name: &str, content: &str) -> Self {
        LevelRecord { name: name.to_string(), content: content.to_string() }
    }

    /// Content split into display lines on `<br>` (any spelling).
    pub fn content_lines(&self) -> Vec<&str> {
        split_breaks(&self.content)
    }
}

/// Split rich text into lines at each `<br>` tag, trimming each line.
pub fn split_breaks(content: &str) -> Vec<&str> {
    let mut lines = vec![];
    let mut rest = content;
    while let Some((start, end)) = find_break(rest) {
        lines.push(rest[..start].trim());
        rest = &rest[end..];
    }
    lines.push(rest.trim());
    lines
}

/// Locate the next `<br>`, `<br/>` or `<br />` (case-insensitive).
/// Returns the byte range of the tag.
fn find_break(s: &str) -> Option<(usize, usize)> {
    let lower = s.to_ascii_lowercase();
    let start = lower.find("<br")?;
    let close = lower[start..].find('>')? + start;
    let inner = lower[start + 3..close].trim();
    if inner.is_empty() || inner == "/" {
        Some((start, close + 1))
    } else {
        // Something like `<bravo>`: not a break, keep scanning after it.
        let (s2, e2) = find_break(&s[close + 1..])?;
        Some((s2 + close + 1, e2 + close + 1))
    }
}

#[derive(Debug)]
pub enum CatalogError {
    /// `get(index)` with `index >= len`.
    OutOfRange { index: usize, len: usize },
    /// A catalog must hold at least one level.
    Empty,
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::OutOfRange { index, len } => {
                write!(f, "level index {index} out of range (catalog has {len} levels)")
            }
            CatalogError::Empty => write!(f, "level catalog is empty"),
            CatalogError::Io { path, source } => {
                write!(f, "could not read {}: {source}", path.display())
            }
            CatalogError::Parse { path, source } => {
                write!(f, "could not parse {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io { source, .. } => Some(source),
            CatalogError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    level: Vec<LevelRecord>,
}

/// Immutable, ordered sequence of levels. Never empty.
#[derive(Clone, Debug)]
pub struct LevelCatalog {
    levels: Vec<LevelRecord>,
}

impl LevelCatalog {
    pub fn new(levels: Vec<LevelRecord>) -> Result<Self, CatalogError> {
        if levels.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(LevelCatalog { levels })
    }

    pub fn builtin() -> Self {
        LevelCatalog { levels: builtin_levels() }
    }

    /// Load a catalog from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|err| match err {
            CatalogError::Parse { source, .. } => CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text).map_err(|source| CatalogError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        Self::new(file.level)
    }

    pub fn get(&self, index: usize) -> Result<&LevelRecord, CatalogError> {
        self.levels.get(index).ok_or(CatalogError::OutOfRange {
            index,
            len: self.levels.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn last_index(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn names(&self) -> Vec<&str> {
        self.levels.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelRecord> {
        self.levels.iter()
    }
}

// ══════════════════════════════════════════════════════════════
// Built-in sections
// ══════════════════════════════════════════════════════════════

fn builtin_levels() -> Vec<LevelRecord> {
    vec![
        LevelRecord::new(
            "About Me",
            "Hi, I’m John Doe, a Web Developer with a passion for interactive design.",
        ),
        LevelRecord::new(
            "Skills",
            "JavaScript - 90%<br>HTML/CSS - 85%<br>Phaser - 80%<br>React - 75%<br>Node.js - 70%",
        ),
        LevelRecord::new(
            "Experience",
            "Software Dev at TechCorp, 2020-2023: Built XYZ.<br>Freelancer, 2018-2020: Various projects.",
        ),
        LevelRecord::new(
            "Projects",
            "Project X: Interactive CV [Link].<br>Project Y: Web Game [Link].<br>Project Z: Portfolio [Link].",
        ),
        LevelRecord::new(
            "Contact",
            "Email: john.doe@example.com<br>LinkedIn: linkedin.com/in/johndoe<br>GitHub: github.com/johndoe",
        ),
    ]
}
