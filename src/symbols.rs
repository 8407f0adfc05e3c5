//! The symbol universe
//!
//! A run crawls a fixed, ordered list of stock symbols loaded once from a JSON
//! file shaped like:
//!
//! ```json
//! [{"code": "004150", "name": "한솔홀딩스"}, {"code": "005930"}]
//! ```
//!
//! The order of the file is the crawl order and the export row order.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// A single stock symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Exchange code, e.g. `005930`
    pub code: String,

    /// Display name, if known up front
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Symbol {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: None,
        }
    }

    pub fn with_name(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({})", name, self.code),
            None => f.write_str(&self.code),
        }
    }
}

/// Ordered, duplicate-free list of symbols, constant for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolUniverse {
    symbols: Vec<Symbol>,
}

impl SymbolUniverse {
    /// Builds a universe, rejecting blank, non-alphanumeric or duplicate codes
    pub fn new(symbols: Vec<Symbol>) -> ConfigResult<Self> {
        let mut seen = HashSet::new();

        for symbol in &symbols {
            let code = symbol.code.as_str();
            if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::Validation(format!(
                    "invalid symbol code '{}'",
                    code
                )));
            }
            if !seen.insert(code) {
                return Err(ConfigError::Validation(format!(
                    "duplicate symbol code '{}'",
                    code
                )));
            }
        }

        Ok(Self { symbols })
    }

    /// Builds a universe from bare codes
    pub fn from_codes<I, S>(codes: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(codes.into_iter().map(Symbol::new).collect())
    }

    /// Parses a universe from JSON text
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let symbols: Vec<Symbol> = serde_json::from_str(text)?;
        Self::new(symbols)
    }

    /// Loads a universe from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let universe = Self::from_json(&content)?;
        if universe.is_empty() {
            tracing::warn!("Symbol universe {} is empty", path.display());
        }
        Ok(universe)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl<'a> IntoIterator for &'a SymbolUniverse {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.symbols.iter()
    }
}
