//! Widget route templates.
//!
//! A template such as `/news/%slug%/comments` is parsed into literal and
//! placeholder segments. Placeholders stand for values only known at request
//! time, so bans replace them with a wildcard segment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::DomainError;

/// Marker delimiting a placeholder segment on both ends.
pub const PLACEHOLDER_MARKER: char = '%';

/// Segment emitted in ban paths in place of a placeholder.
pub const WILDCARD_SEGMENT: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        let delimited = raw.len() >= 2
            && raw.starts_with(PLACEHOLDER_MARKER)
            && raw.ends_with(PLACEHOLDER_MARKER);

        if delimited {
            Self::Placeholder(raw[1..raw.len() - 1].to_string())
        } else {
            Self::Literal(raw.to_string())
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Placeholder(name) => write!(f, "{PLACEHOLDER_MARKER}{name}{PLACEHOLDER_MARKER}"),
        }
    }
}

/// Parsed path template of a widget route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteTemplate {
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parse a template; it must be absolute (start with `/`).
    pub fn parse(template: &str) -> Result<Self, DomainError> {
        let Some(rest) = template.strip_prefix('/') else {
            return Err(DomainError::route_template(template));
        };

        let segments = rest.split('/').map(Segment::parse).collect();
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_placeholders(&self) -> bool {
        self.segments.iter().any(Segment::is_placeholder)
    }

    /// Render the path with every placeholder replaced by [`WILDCARD_SEGMENT`].
    pub fn wildcard_path(&self) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(value) => path.push_str(value),
                Segment::Placeholder(_) => path.push_str(WILDCARD_SEGMENT),
            }
        }
        path
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for RouteTemplate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RouteTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RouteTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
