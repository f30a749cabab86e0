//! Reference and request-atom syntax
//!
//! Only the shape of a reference is checked here. Whether a code or section
//! actually exists is the catalog's business.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::unit::UnitId;

/// Prefix that marks a product alias atom (`product:api`)
pub const PRODUCT_PREFIX: &str = "product:";

/// Syntax errors for references and atoms
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtomSyntaxError {
    #[error("empty atom")]
    Empty,

    #[error("atom '{atom}' has no standard code before ':'")]
    MissingCode { atom: String },

    #[error("atom '{atom}' has no value after ':'")]
    MissingValue { atom: String },

    #[error("'{code}' is not a valid standard code (expected e.g. CS or NIST-IG)")]
    InvalidCode { code: String },

    #[error("'{section}' is not a valid section key (expected lowercase letters, digits, '-' or '_')")]
    InvalidSection { section: String },

    #[error("'{name}' is not a valid product name")]
    InvalidProduct { name: String },
}

/// `CODE` or `CODE:section`, as written in dependency lists
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StandardRef {
    pub code: String,
    pub section: Option<String>,
}

impl StandardRef {
    pub fn whole(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            section: None,
        }
    }

    pub fn section(code: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            section: Some(section.into()),
        }
    }

    /// Conflict matching: a bare code covers every section of that standard
    pub fn matches(&self, unit: &UnitId) -> bool {
        self.code == unit.code
            && self
                .section
                .as_deref()
                .map_or(true, |section| section == unit.section)
    }
}

impl fmt::Display for StandardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.section {
            Some(section) => write!(f, "{}:{}", self.code, section),
            None => f.write_str(&self.code),
        }
    }
}

impl FromStr for StandardRef {
    type Err = AtomSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AtomSyntaxError::Empty);
        }
        match s.split_once(':') {
            None => {
                check_code(s)?;
                Ok(Self::whole(s))
            }
            Some((code, section)) => {
                split_parts(s, code, section)?;
                check_section(section)?;
                Ok(Self::section(code, section))
            }
        }
    }
}

impl TryFrom<String> for StandardRef {
    type Error = AtomSyntaxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StandardRef> for String {
    fn from(value: StandardRef) -> Self {
        value.to_string()
    }
}

/// Which sections of a standard an atom asks for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SectionSelector {
    /// `CODE` or `CODE:*`
    All,
    /// `CODE:section`
    Named(String),
}

/// One atom of a load request, syntax-checked but not yet looked up
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AtomSpec {
    Product(String),
    Standard {
        code: String,
        selector: SectionSelector,
    },
}

impl fmt::Display for AtomSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomSpec::Product(name) => write!(f, "{PRODUCT_PREFIX}{name}"),
            AtomSpec::Standard {
                code,
                selector: SectionSelector::All,
            } => write!(f, "{code}:*"),
            AtomSpec::Standard {
                code,
                selector: SectionSelector::Named(section),
            } => write!(f, "{code}:{section}"),
        }
    }
}

impl FromStr for AtomSpec {
    type Err = AtomSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AtomSyntaxError::Empty);
        }

        if let Some(name) = s.strip_prefix(PRODUCT_PREFIX) {
            let name = name.trim();
            if name.is_empty() {
                return Err(AtomSyntaxError::MissingValue { atom: s.to_string() });
            }
            if !is_key(name) {
                return Err(AtomSyntaxError::InvalidProduct {
                    name: name.to_string(),
                });
            }
            return Ok(AtomSpec::Product(name.to_string()));
        }

        match s.split_once(':') {
            None => {
                check_code(s)?;
                Ok(AtomSpec::Standard {
                    code: s.to_string(),
                    selector: SectionSelector::All,
                })
            }
            Some((code, value)) => {
                split_parts(s, code, value)?;
                let selector = if value == "*" {
                    SectionSelector::All
                } else {
                    check_section(value)?;
                    SectionSelector::Named(value.to_string())
                };
                Ok(AtomSpec::Standard {
                    code: code.to_string(),
                    selector,
                })
            }
        }
    }
}

fn split_parts(atom: &str, code: &str, value: &str) -> Result<(), AtomSyntaxError> {
    if code.is_empty() {
        return Err(AtomSyntaxError::MissingCode {
            atom: atom.to_string(),
        });
    }
    if value.is_empty() {
        return Err(AtomSyntaxError::MissingValue {
            atom: atom.to_string(),
        });
    }
    check_code(code)
}

/// `^[A-Z][A-Z0-9]*(-[A-Z0-9]+)*$`
pub fn is_code(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && s.split('-').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        })
}

/// `^[a-z0-9][a-z0-9_-]*$`, shared by section keys and product names
pub fn is_key(s: &str) -> bool {
    s.chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

fn check_code(code: &str) -> Result<(), AtomSyntaxError> {
    if is_code(code) {
        Ok(())
    } else {
        Err(AtomSyntaxError::InvalidCode {
            code: code.to_string(),
        })
    }
}

fn check_section(section: &str) -> Result<(), AtomSyntaxError> {
    if is_key(section) {
        Ok(())
    } else {
        Err(AtomSyntaxError::InvalidSection {
            section: section.to_string(),
        })
    }
}
