//! Location paths into the validated input
//!
//! A path is a sequence of tokens. Compiled plans may contain the
//! [`PathToken::EachItem`] wildcard, which the executor expands into
//! concrete [`PathToken::Index`] tokens when it walks an array.
//!
//! The textual form joins property names with `.` and renders indices as
//! `[n]` and the wildcard as `[*]`, e.g. `DATABASE.replicas[0].host`. It is
//! meant for people: a property name containing `.` or `[` does not parse
//! back. The serialized form is a token array (`["DATABASE", "replicas",
//! 0, "host"]`, wildcard as `null`) and is lossless.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of a location path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathToken {
    /// Object member
    Property(String),
    /// Concrete array element
    Index(usize),
    /// Every element of an array
    EachItem,
}

/// Location of a value inside the input
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationPath(Vec<PathToken>);

impl LocationPath {
    /// The empty path, addressing the input itself
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_tokens(tokens: Vec<PathToken>) -> Self {
        Self(tokens)
    }

    /// Extend with an object member
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(PathToken::Property(name.into()));
        Self(tokens)
    }

    /// Extend with a concrete array index
    pub fn index(&self, index: usize) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(PathToken::Index(index));
        Self(tokens)
    }

    /// Extend with the each-item wildcard
    pub fn each_item(&self) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(PathToken::EachItem);
        Self(tokens)
    }

    pub fn tokens(&self) -> &[PathToken] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Split off the last token
    pub fn split_last(&self) -> Option<(LocationPath, &PathToken)> {
        self.0
            .split_last()
            .map(|(last, parent)| (LocationPath(parent.to_vec()), last))
    }

    /// Whether the path still contains a wildcard
    pub fn has_wildcard(&self) -> bool {
        self.0.iter().any(|t| matches!(t, PathToken::EachItem))
    }

    /// Render as a JSON pointer (`/DATABASE/replicas/0`)
    pub fn to_pointer(&self) -> String {
        let mut pointer = String::new();
        for token in &self.0 {
            pointer.push('/');
            match token {
                PathToken::Property(name) => pointer.push_str(&escape_pointer(name)),
                PathToken::Index(i) => pointer.push_str(&i.to_string()),
                PathToken::EachItem => pointer.push('*'),
            }
        }
        pointer
    }
}

/// Escape a single JSON pointer reference token
pub(crate) fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            match token {
                PathToken::Property(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathToken::Index(index) => write!(f, "[{}]", index)?,
                PathToken::EachItem => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for LocationPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = Vec::new();
        let mut name = String::new();
        let mut chars = s.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if !name.is_empty() {
                        tokens.push(PathToken::Property(std::mem::take(&mut name)));
                    }
                }
                '[' => {
                    if !name.is_empty() {
                        tokens.push(PathToken::Property(std::mem::take(&mut name)));
                    }
                    let mut inner = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(ch) => inner.push(ch),
                            None => return Err(format!("Unterminated index in path '{}'", s)),
                        }
                    }
                    if inner == "*" {
                        tokens.push(PathToken::EachItem);
                    } else {
                        let index = inner
                            .parse::<usize>()
                            .map_err(|_| format!("Invalid index '{}' in path '{}'", inner, s))?;
                        tokens.push(PathToken::Index(index));
                    }
                }
                _ => name.push(c),
            }
        }
        if !name.is_empty() {
            tokens.push(PathToken::Property(name));
        }

        Ok(LocationPath(tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let path = LocationPath::root().child("DATABASE").child("replicas").index(0).child("host");
        assert_eq!(path.to_string(), "DATABASE.replicas[0].host");
        assert_eq!(LocationPath::root().child("PORT").to_string(), "PORT");
        assert_eq!(LocationPath::root().child("HOSTS").each_item().to_string(), "HOSTS[*]");
        assert_eq!(LocationPath::root().to_string(), "");
    }

    #[test]
    fn test_parse_matches_display() {
        let path: LocationPath = "DATABASE.replicas[0].host".parse().unwrap();
        assert_eq!(
            path,
            LocationPath::root().child("DATABASE").child("replicas").index(0).child("host")
        );

        let wildcard: LocationPath = "HOSTS[*]".parse().unwrap();
        assert!(wildcard.has_wildcard());

        assert!("HOSTS[x]".parse::<LocationPath>().is_err());
        assert!("HOSTS[1".parse::<LocationPath>().is_err());
    }

    #[test]
    fn test_pointer() {
        let path = LocationPath::root().child("a/b").index(2);
        assert_eq!(path.to_pointer(), "/a~1b/2");
    }

    #[test]
    fn test_split_last() {
        let path = LocationPath::root().child("DB").child("HOST");
        let (parent, last) = path.split_last().unwrap();
        assert_eq!(parent, LocationPath::root().child("DB"));
        assert_eq!(last, &PathToken::Property("HOST".to_string()));
        assert!(LocationPath::root().split_last().is_none());
    }

    #[test]
    fn test_ordering_follows_tokens() {
        let a = LocationPath::root().child("X").index(1);
        let b = LocationPath::root().child("X").index(10);
        assert!(a < b);
    }

    #[test]
    fn test_serde_as_tokens() {
        let path = LocationPath::root().child("DATABASE").index(0).child("host");
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!(["DATABASE", 0, "host"]));
        let back: LocationPath = serde_json::from_value(json).unwrap();
        assert_eq!(back, path);

        let wildcard = LocationPath::root().child("HOSTS").each_item();
        let json = serde_json::to_value(&wildcard).unwrap();
        assert_eq!(json, serde_json::json!(["HOSTS", null]));
        assert_eq!(serde_json::from_value::<LocationPath>(json).unwrap(), wildcard);
    }

    #[test]
    fn test_dotted_names_survive_serde() {
        let path = LocationPath::root().child("spring.datasource.url").child("a[0]");
        let json = serde_json::to_string(&path).unwrap();
        let back: LocationPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tokens(), path.tokens());
        assert_eq!(back.to_string(), "spring.datasource.url.a[0]");
    }
}
