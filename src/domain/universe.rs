//! Instrument universe partitioned by class.
//!
//! Each instrument belongs to exactly one class for the whole run. Code lists
//! come from configuration as comma separated strings, one list per class.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentClass {
    Crypto,
    Equity,
    Forex,
}

impl InstrumentClass {
    pub const ALL: [InstrumentClass; 3] = [
        InstrumentClass::Crypto,
        InstrumentClass::Equity,
        InstrumentClass::Forex,
    ];

    /// Config key holding this class's code list.
    pub fn config_key(&self) -> &'static str {
        match self {
            InstrumentClass::Crypto => "crypto",
            InstrumentClass::Equity => "equity",
            InstrumentClass::Forex => "forex",
        }
    }

    /// Quote-driven classes are priced from the bid/ask mid when available.
    pub fn is_quote_driven(&self) -> bool {
        matches!(self, InstrumentClass::Forex)
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

impl FromStr for InstrumentClass {
    type Err = UniverseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crypto" => Ok(InstrumentClass::Crypto),
            "equity" | "stock" => Ok(InstrumentClass::Equity),
            "forex" | "fx" => Ok(InstrumentClass::Forex),
            other => Err(UniverseError::UnknownClass(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instrument {
    pub code: String,
    pub class: InstrumentClass,
}

impl Instrument {
    pub fn new(code: impl Into<String>, class: InstrumentClass) -> Self {
        Self {
            code: code.into(),
            class,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Universe {
    pub instruments: Vec<Instrument>,
    pub benchmark: String,
}

impl Universe {
    /// Builds a universe from per-class code lists, preserving the order
    /// crypto, equity, forex and the order within each list.
    pub fn from_lists(
        lists: &[(InstrumentClass, Vec<String>)],
        benchmark: &str,
    ) -> Result<Self, UniverseError> {
        let mut seen = HashSet::new();
        let mut instruments = Vec::new();

        for (class, codes) in lists {
            for code in codes {
                if !seen.insert(code.clone()) {
                    return Err(UniverseError::DuplicateCode(code.clone()));
                }
                instruments.push(Instrument::new(code.clone(), *class));
            }
        }

        if instruments.is_empty() {
            return Err(UniverseError::EmptyUniverse);
        }

        let benchmark = benchmark.trim().to_uppercase();
        if benchmark.is_empty() {
            return Err(UniverseError::MissingBenchmark);
        }

        Ok(Universe {
            instruments,
            benchmark,
        })
    }

    pub fn count(&self) -> usize {
        self.instruments.len()
    }

    pub fn class_of(&self, code: &str) -> Option<InstrumentClass> {
        self.instruments
            .iter()
            .find(|i| i.code == code)
            .map(|i| i.class)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.instruments.iter().map(|i| i.code.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),

    #[error("unknown instrument class: {0}")]
    UnknownClass(String),

    #[error("no instruments configured")]
    EmptyUniverse,

    #[error("no benchmark configured")]
    MissingBenchmark,
}

/// Parses a comma separated code list. An empty or blank input yields an
/// empty list so a class may be left out of the universe.
pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}
