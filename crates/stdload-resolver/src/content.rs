//! Content access and markdown section extraction
//!
//! A section is the text from its heading up to the next heading of the
//! same or a higher level. Headings inside fenced code blocks do not count.

use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::ContentError;

#[allow(clippy::expect_used)]
static HEADING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$").expect("heading pattern")
});

#[allow(clippy::expect_used)]
static FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})").expect("fence pattern"));

#[allow(clippy::expect_used)]
static SLUG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern"));

/// Where the emitter gets document text from
pub trait ContentSource {
    /// Whole text of a document, `path` relative to the content root
    fn read(&self, path: &Path) -> Result<String, ContentError>;
}

/// Reads documents from a directory on disk
#[derive(Debug, Clone)]
pub struct FsContentSource {
    root: PathBuf,
}

impl FsContentSource {
    /// Source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Content root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentSource for FsContentSource {
    fn read(&self, path: &Path) -> Result<String, ContentError> {
        std::fs::read_to_string(self.root.join(path)).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                ContentError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ContentError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }
}

/// How a section's heading is recognised
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeadingMatch {
    /// Heading text, compared case-insensitively
    Text(String),
    /// Slug of the heading text, e.g. `api` for `## API`
    Slug(String),
}

impl HeadingMatch {
    fn accepts(&self, title: &str) -> bool {
        match self {
            HeadingMatch::Text(text) => title.trim().eq_ignore_ascii_case(text.trim()),
            HeadingMatch::Slug(slug) => slugify(title) == *slug,
        }
    }
}

impl std::fmt::Display for HeadingMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeadingMatch::Text(text) => f.write_str(text),
            HeadingMatch::Slug(slug) => write!(f, "#{slug}"),
        }
    }
}

/// Lowercase, with every run of other characters turned into one `-`
#[must_use]
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    SLUG_REGEX
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Rough token count: one token per four characters, rounded up
#[must_use]
pub fn estimate_tokens(text: &str) -> u64 {
    let chars = text.chars().count() as u64;
    chars.div_ceil(4)
}

/// A section found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Zero-based line of the opening heading
    pub line: usize,
    /// Section text, heading line included, trailing blank lines trimmed
    pub text: String,
}

/// Extract the section under the first heading that matches
#[must_use]
pub fn extract_section(markdown: &str, heading: &HeadingMatch) -> Option<Extracted> {
    let mut fence: Option<String> = None;
    let mut section: Option<(usize, usize, Vec<&str>)> = None;

    for (number, line) in markdown.lines().enumerate() {
        if let Some(open) = &fence {
            if FENCE_REGEX
                .captures(line)
                .is_some_and(|c| c[1].starts_with(open.as_str()))
            {
                fence = None;
            }
            if let Some((_, _, lines)) = section.as_mut() {
                lines.push(line);
            }
            continue;
        }

        if let Some(caps) = FENCE_REGEX.captures(line) {
            fence = Some(caps[1].to_string());
        } else if let Some(caps) = HEADING_REGEX.captures(line) {
            let level = caps[1].len();
            let title = caps.get(2).map_or("", |m| m.as_str());
            match section.as_ref().map(|(open, _, _)| *open) {
                Some(open) if level <= open => break,
                Some(_) => {}
                None if heading.accepts(title) => section = Some((level, number, Vec::new())),
                None => {}
            }
        }

        if let Some((_, _, lines)) = section.as_mut() {
            lines.push(line);
        }
    }

    section.map(|(_, line, lines)| Extracted {
        line,
        text: lines.join("\n").trim_end().to_string(),
    })
}
