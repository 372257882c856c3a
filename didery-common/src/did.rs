use std::fmt;
use std::str::FromStr;

use crate::crypto;
use crate::error::{Result, ValidationError};

/// Method whose idstring is the base64url inception verification key.
pub const DEFAULT_METHOD: &str = "dad";

/// A parsed DID reference: `did:<method>:<idstring>[?query][/path][#fragment]`.
///
/// Only the bare `did:<method>:<idstring>` triple is ever used as a storage
/// key; see [`Did::bare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Did {
    pub method: String,
    pub id_string: String,
    pub query: Option<String>,
    pub path: Option<String>,
    pub fragment: Option<String>,
}

fn is_method_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '=' | ':')
}

fn is_query_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '=' | '&')
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '/')
}

fn is_fragment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split the longest prefix of `s` made of `accept` characters.
fn take_while(s: &str, accept: fn(char) -> bool) -> (&str, &str) {
    let end = s.find(|c: char| !accept(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// Parse an optional `<marker><chars>` component. A marker followed by no
/// valid characters is rejected.
fn optional_part<'a>(
    s: &'a str,
    marker: char,
    accept: fn(char) -> bool,
) -> Result<(Option<String>, &'a str)> {
    let Some(rest) = s.strip_prefix(marker) else {
        return Ok((None, s));
    };
    let (part, rest) = take_while(rest, accept);
    if part.is_empty() {
        return Err(invalid());
    }
    Ok((Some(part.to_string()), rest))
}

fn invalid() -> ValidationError {
    ValidationError::MalformedDid("Invalid DID value.".into())
}

impl Did {
    pub fn parse(reference: &str) -> Result<Self> {
        let rest = reference.strip_prefix("did:").ok_or_else(invalid)?;

        let (method, rest) = take_while(rest, is_method_char);
        if method.is_empty() {
            return Err(invalid());
        }
        let rest = rest.strip_prefix(':').ok_or_else(invalid)?;

        let (id_string, rest) = take_while(rest, is_id_char);
        if id_string.is_empty() || id_string.split(':').any(str::is_empty) {
            return Err(invalid());
        }

        let (query, rest) = optional_part(rest, '?', is_query_char)?;
        let (path, rest) = optional_part(rest, '/', is_path_char)?;
        let (fragment, rest) = optional_part(rest, '#', is_fragment_char)?;
        if !rest.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            method: method.to_string(),
            id_string: id_string.to_string(),
            query,
            path,
            fragment,
        })
    }

    /// `did:<method>:<idstring>` with every navigational suffix removed.
    pub fn bare(&self) -> String {
        format!("did:{}:{}", self.method, self.id_string)
    }

    /// Whether the idstring is itself the inception verification key.
    pub fn is_self_certifying(&self) -> bool {
        self.method == DEFAULT_METHOD
    }

    /// Compare the idstring against a base64url verification key after
    /// decoding both. Either side failing to decode is a mismatch.
    pub fn matches_key(&self, verkey: &str) -> bool {
        match (crypto::decode(&self.id_string), crypto::decode(verkey)) {
            (Ok(id), Ok(key)) => id == key,
            _ => false,
        }
    }
}

/// Parse `reference` and return its bare form.
pub fn bare_did(reference: &str) -> Result<String> {
    Did::parse(reference).map(|did| did.bare())
}

impl FromStr for Did {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:{}:{}", self.method, self.id_string)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "/{path}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}
