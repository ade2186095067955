//! Project identity strings.
//!
//! A project's name encodes where it is, what it is and which contract it
//! belongs to:
//!
//! ```text
//! DAL-ES-24-117-Lakeside Elementary
//! ─┬─ ┬─ ───┬── ────────┬──────────
//!  │  │     │           └ display name (may itself contain '-')
//!  │  │     └ project number NN-NNN
//!  │  └ project type
//!  └ city
//! ```
//!
//! Names created before project numbers existed (`CITY-TYPE-Name`) still
//! decode; anything shorter decodes to a bare display name with no prefix.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between identity tokens.
pub const DELIMITER: char = '-';

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}-\d{3}$").expect("project number regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Project name cannot be empty")]
    EmptyName,

    #[error("Invalid project number '{0}': format must be XX-XXX (e.g., 12-345)")]
    InvalidNumber(String),

    #[error("Unknown city '{0}'")]
    UnknownCity(String),

    #[error("Unknown project type '{0}'")]
    UnknownProjectType(String),

    #[error("Project name '{0}' would be read as part of the project prefix")]
    AmbiguousName(String),
}

// ── City ──────────────────────────────────────────────────────────────

/// Office city. Values outside the known set are kept verbatim so that
/// legacy names survive a decode/encode cycle untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum City {
    Dallas,
    Austin,
    Houston,
    SanAntonio,
    CorpusChristi,
    Other(String),
}

impl City {
    /// Known cities in the order they are offered to the user.
    pub const KNOWN: [City; 5] = [
        City::Dallas,
        City::Austin,
        City::Houston,
        City::SanAntonio,
        City::CorpusChristi,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Dallas => "DAL",
            Self::Austin => "AUS",
            Self::Houston => "HOU",
            Self::SanAntonio => "SA",
            Self::CorpusChristi => "CC",
            Self::Other(raw) => raw,
        }
    }

    /// Human-readable name; `None` for unrecognized values.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Self::Dallas => Some("Dallas"),
            Self::Austin => Some("Austin"),
            Self::Houston => Some("Houston"),
            Self::SanAntonio => Some("San Antonio"),
            Self::CorpusChristi => Some("Corpus Christi"),
            Self::Other(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Decode a token, falling back to `Other` for anything unrecognized.
    pub fn from_raw(raw: &str) -> Self {
        Self::from_str(raw).unwrap_or_else(|_| Self::Other(raw.to_string()))
    }
}

impl FromStr for City {
    type Err = IdentityError;

    /// Strict parse: only the known abbreviations are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAL" => Ok(Self::Dallas),
            "AUS" => Ok(Self::Austin),
            "HOU" => Ok(Self::Houston),
            "SA" => Ok(Self::SanAntonio),
            "CC" => Ok(Self::CorpusChristi),
            _ => Err(IdentityError::UnknownCity(s.to_string())),
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for City {
    fn from(s: String) -> Self {
        Self::from_raw(&s)
    }
}

impl From<City> for String {
    fn from(c: City) -> Self {
        c.as_str().to_string()
    }
}

// ── Project type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectType {
    ElementarySchool,
    MiddleSchool,
    HighSchool,
    HigherEducation,
    BondProposal,
    Unique,
    Other(String),
}

impl ProjectType {
    pub const KNOWN: [ProjectType; 6] = [
        ProjectType::ElementarySchool,
        ProjectType::MiddleSchool,
        ProjectType::HighSchool,
        ProjectType::HigherEducation,
        ProjectType::BondProposal,
        ProjectType::Unique,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::ElementarySchool => "ES",
            Self::MiddleSchool => "MS",
            Self::HighSchool => "HS",
            Self::HigherEducation => "HE",
            Self::BondProposal => "BP",
            Self::Unique => "UQ",
            Self::Other(raw) => raw,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        match self {
            Self::ElementarySchool => Some("Elementary School"),
            Self::MiddleSchool => Some("Middle School"),
            Self::HighSchool => Some("High School"),
            Self::HigherEducation => Some("Higher Education"),
            Self::BondProposal => Some("Bond Proposal"),
            Self::Unique => Some("Unique"),
            Self::Other(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    pub fn from_raw(raw: &str) -> Self {
        Self::from_str(raw).unwrap_or_else(|_| Self::Other(raw.to_string()))
    }
}

impl FromStr for ProjectType {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ES" => Ok(Self::ElementarySchool),
            "MS" => Ok(Self::MiddleSchool),
            "HS" => Ok(Self::HighSchool),
            "HE" => Ok(Self::HigherEducation),
            "BP" => Ok(Self::BondProposal),
            "UQ" => Ok(Self::Unique),
            _ => Err(IdentityError::UnknownProjectType(s.to_string())),
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ProjectType {
    fn from(s: String) -> Self {
        Self::from_raw(&s)
    }
}

impl From<ProjectType> for String {
    fn from(t: ProjectType) -> Self {
        t.as_str().to_string()
    }
}

// ── Project number ────────────────────────────────────────────────────

/// Contract number in `NN-NNN` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectNumber(String);

impl ProjectNumber {
    pub fn is_valid(s: &str) -> bool {
        NUMBER_RE.is_match(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProjectNumber {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(IdentityError::InvalidNumber(s.to_string()))
        }
    }
}

impl TryFrom<String> for ProjectNumber {
    type Error = IdentityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ProjectNumber> for String {
    fn from(n: ProjectNumber) -> Self {
        n.0
    }
}

impl fmt::Display for ProjectNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Identity ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIdentity {
    pub city: City,
    pub project_type: ProjectType,
    pub number: Option<ProjectNumber>,
    pub display_name: String,
}

impl ProjectIdentity {
    /// The canonical encoded name.
    pub fn encode(&self) -> Result<String, IdentityError> {
        encode(
            &self.city,
            &self.project_type,
            self.number.as_ref(),
            &self.display_name,
        )
    }
}

/// Join the identity parts with [`DELIMITER`], skipping empty parts.
///
/// Only the name is checked here; the number is validated by its type and
/// city/type membership is the caller's concern. Without a number, a name
/// that itself starts with `NN-NNN-` is rejected because [`decode`] would
/// take it for the number.
pub fn encode(
    city: &City,
    project_type: &ProjectType,
    number: Option<&ProjectNumber>,
    name: &str,
) -> Result<String, IdentityError> {
    if name.trim().is_empty() {
        return Err(IdentityError::EmptyName);
    }
    if number.is_none() && starts_with_number(name) {
        return Err(IdentityError::AmbiguousName(name.to_string()));
    }
    let parts = [
        city.as_str(),
        project_type.as_str(),
        number.map(ProjectNumber::as_str).unwrap_or(""),
        name,
    ];
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-");
    Ok(joined)
}

/// True when the first two tokens of `name` form a project number and more
/// tokens follow.
fn starts_with_number(name: &str) -> bool {
    let mut tokens = name.splitn(3, DELIMITER);
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(a), Some(b), Some(_)) => ProjectNumber::is_valid(&format!("{a}-{b}")),
        _ => false,
    }
}

/// An encoded name split into its structural prefix and the user-facing
/// short name. `prefix` keeps its trailing delimiter, so
/// `format!("{prefix}{short_name}")` is always the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedName<'a> {
    pub prefix: &'a str,
    pub short_name: &'a str,
}

impl DecodedName<'_> {
    pub fn has_number(&self) -> bool {
        self.prefix.matches(DELIMITER).count() == 4
    }
}

pub fn decode(encoded: &str) -> DecodedName<'_> {
    let dashes: Vec<usize> = encoded.match_indices(DELIMITER).map(|(i, _)| i).collect();
    let tokens = dashes.len() + 1;

    let split_at = if tokens >= 5 && ProjectNumber::is_valid(&encoded[dashes[1] + 1..dashes[3]]) {
        Some(dashes[3] + 1)
    } else if tokens >= 3 {
        Some(dashes[1] + 1)
    } else {
        None
    };

    match split_at {
        Some(at) => DecodedName {
            prefix: &encoded[..at],
            short_name: &encoded[at..],
        },
        None => DecodedName {
            prefix: "",
            short_name: encoded,
        },
    }
}

/// The name shown in lists: the encoded string minus its structural prefix.
pub fn display_name(encoded: &str) -> &str {
    decode(encoded).short_name
}

/// The raw city/type tokens used by the sidebar filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterKey<'a> {
    pub city: &'a str,
    pub project_type: &'a str,
}

/// Tokens 0 and 1, taken positionally and never validated. `None` when the
/// name has fewer than two tokens.
pub fn filter_key_of(encoded: &str) -> Option<FilterKey<'_>> {
    let mut tokens = encoded.splitn(3, DELIMITER);
    let city = tokens.next()?;
    let project_type = tokens.next()?;
    Some(FilterKey { city, project_type })
}

/// Full structural decode. `None` when the name has no prefix or an empty
/// display name.
pub fn parse(encoded: &str) -> Option<ProjectIdentity> {
    let decoded = decode(encoded);
    if decoded.prefix.is_empty() || decoded.short_name.is_empty() {
        return None;
    }
    let key = filter_key_of(encoded)?;
    let number = if decoded.has_number() {
        let start = key.city.len() + key.project_type.len() + 2;
        let end = decoded.prefix.len() - 1;
        decoded.prefix[start..end].parse().ok()
    } else {
        None
    };
    Some(ProjectIdentity {
        city: City::from_raw(key.city),
        project_type: ProjectType::from_raw(key.project_type),
        number,
        display_name: decoded.short_name.to_string(),
    })
}

// ── Rename ────────────────────────────────────────────────────────────

/// In-place rename of a project: the structural prefix is fixed, only the
/// short name is editable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameSession {
    prefix: String,
    text: String,
}

impl RenameSession {
    pub fn start(full_name: &str) -> Self {
        let decoded = decode(full_name);
        Self {
            prefix: decoded.prefix.to_string(),
            text: decoded.short_name.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Rejoin prefix and edited text into the full name to store.
    ///
    /// Fails when the result would decode to a different prefix, so the
    /// next session always reopens with the same text.
    pub fn finish(&self) -> Result<String, IdentityError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(IdentityError::EmptyName);
        }
        let full = format!("{}{}", self.prefix, text);
        if decode(&full).prefix != self.prefix {
            return Err(IdentityError::AmbiguousName(text.to_string()));
        }
        Ok(full)
    }
}
