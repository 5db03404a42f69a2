//! Per-route assignment cookie: value codec and the two cookie stores.
//!
//! Value format is `<experimentID>.<variantIndex>[-<variantIndex>...]`.

use cookie::Cookie;
use http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use std::collections::HashMap;

/// Decoded cookie value. Indexes are not validated against any catalog here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAssignment {
    pub experiment_id: String,
    pub variant_indexes: Vec<usize>,
}

/// RFC 6265 `cookie-octet`: visible ASCII except `"`, `,`, `;` and `\`.
pub fn is_cookie_value_char(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '"' | ',' | ';' | '\\')
}

/// RFC 2616 `token` character, as required for cookie names.
pub fn is_cookie_name_char(c: char) -> bool {
    c.is_ascii_graphic()
        && !matches!(
            c,
            '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?'
                | '=' | '{' | '}'
        )
}

pub fn cookie_name(prefix: &str, route: &str) -> String {
    format!("{prefix}{route}")
}

pub fn encode_assignment(experiment_id: &str, variant_indexes: &[usize]) -> String {
    let vars: Vec<String> = variant_indexes.iter().map(|i| i.to_string()).collect();
    format!("{}.{}", experiment_id, vars.join("-"))
}

/// Parse a cookie value. Any malformed part makes the whole value unusable.
pub fn parse_assignment(value: &str) -> Option<PersistedAssignment> {
    let (experiment_id, vars) = value.split_once('.')?;
    if experiment_id.is_empty() || vars.is_empty() {
        return None;
    }
    let variant_indexes = vars
        .split('-')
        .map(|v| v.parse::<usize>().ok())
        .collect::<Option<Vec<_>>>()?;
    Some(PersistedAssignment {
        experiment_id: experiment_id.to_string(),
        variant_indexes,
    })
}

/// A requested cookie write. Always scoped to path `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieWrite {
    pub name: String,
    pub value: String,
    pub max_age: u64,
}

impl CookieWrite {
    pub fn to_cookie(&self) -> Cookie<'static> {
        let max_age = i64::try_from(self.max_age).unwrap_or(i64::MAX);
        Cookie::build((self.name.clone(), self.value.clone()))
            .path("/")
            .max_age(cookie::time::Duration::seconds(max_age))
            .build()
    }

    /// Serialized form suitable for a `Set-Cookie` header.
    pub fn to_header_string(&self) -> String {
        self.to_cookie().to_string()
    }
}

pub trait CookieReader {
    fn get_cookie(&self, name: &str) -> Option<String>;
}

pub trait CookieWriter {
    fn set_cookie(&mut self, write: &CookieWrite);
}

/// Parse a `Cookie` header style string (`a=1; b=2`). The first occurrence of a
/// name wins; unparsable pairs are skipped.
pub fn parse_cookie_string(raw: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for parsed in Cookie::split_parse(raw.to_string()) {
        let Ok(c) = parsed else { continue };
        if pairs.iter().any(|(name, _)| name == c.name()) {
            continue;
        }
        pairs.push((c.name().to_string(), c.value().to_string()));
    }
    pairs
}

/// Browser-style store: a single ambient `name=value; ...` string, the way a
/// document cookie jar reads back. Writes replace the named pair in place.
#[derive(Debug, Clone, Default)]
pub struct DocumentCookieStore {
    pairs: Vec<(String, String)>,
    written: Vec<String>,
}

impl DocumentCookieStore {
    pub fn from_document(document: &str) -> Self {
        Self {
            pairs: parse_cookie_string(document),
            written: Vec::new(),
        }
    }

    pub fn document(&self) -> String {
        self.pairs
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Serialized cookies written so far, in order.
    pub fn written(&self) -> &[String] {
        &self.written
    }
}

impl CookieReader for DocumentCookieStore {
    fn get_cookie(&self, name: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

impl CookieWriter for DocumentCookieStore {
    fn set_cookie(&mut self, write: &CookieWrite) {
        match self.pairs.iter_mut().find(|(n, _)| *n == write.name) {
            Some(pair) => pair.1 = write.value.clone(),
            None => self.pairs.push((write.name.clone(), write.value.clone())),
        }
        self.written.push(write.to_header_string());
    }
}

/// Server-side store: reads the incoming `Cookie` headers and collects writes
/// for the outgoing response, which may carry several `Set-Cookie` headers.
#[derive(Debug, Clone, Default)]
pub struct HeaderCookieStore {
    incoming: HashMap<String, String>,
    outgoing: Vec<CookieWrite>,
}

impl HeaderCookieStore {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = HashMap::new();
        for value in headers.get_all(COOKIE) {
            let Ok(raw) = value.to_str() else {
                tracing::debug!("skipping non-ascii Cookie header");
                continue;
            };
            for (name, value) in parse_cookie_string(raw) {
                incoming.entry(name).or_insert(value);
            }
        }
        Self {
            incoming,
            outgoing: Vec::new(),
        }
    }

    pub fn outgoing(&self) -> &[CookieWrite] {
        &self.outgoing
    }

    /// Append one `Set-Cookie` header per pending write, keeping any the
    /// response already carries.
    pub fn apply_to(&self, headers: &mut HeaderMap) {
        for write in &self.outgoing {
            match HeaderValue::from_str(&write.to_header_string()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => {
                    tracing::warn!(cookie = %write.name, "dropping unencodable Set-Cookie: {}", e);
                }
            }
        }
    }
}

impl CookieReader for HeaderCookieStore {
    fn get_cookie(&self, name: &str) -> Option<String> {
        self.outgoing
            .iter()
            .rev()
            .find(|w| w.name == name)
            .map(|w| w.value.clone())
            .or_else(|| self.incoming.get(name).cloned())
    }
}

impl CookieWriter for HeaderCookieStore {
    fn set_cookie(&mut self, write: &CookieWrite) {
        self.outgoing.retain(|w| w.name != write.name);
        self.outgoing.push(write.clone());
    }
}
