use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::proto::gnmi::Path;
use crate::proto::gnmi::PathElem;
use crate::PathError;

/// Element name or key value matching anything in subscription paths.
pub const WILDCARD: &str = "*";

impl PathElem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: BTreeMap::new(),
        }
    }

    pub fn with_key(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.key.insert(key.into(), value.into());
        self
    }

    /// Pattern match where `pattern` may use [`WILDCARD`] as its name or as a
    /// key value. A pattern without keys matches every keyed instance.
    pub fn matches(
        &self,
        pattern: &PathElem,
    ) -> bool {
        if pattern.name != WILDCARD && pattern.name != self.name {
            return false;
        }
        pattern.key.iter().all(|(k, v)| match self.key.get(k) {
            Some(actual) => v == WILDCARD || v == actual,
            None => false,
        })
    }
}

impl Path {
    pub fn from_elems(elem: Vec<PathElem>) -> Self {
        Self {
            origin: String::new(),
            elem,
            target: String::new(),
        }
    }

    /// Builds a path from its text form, e.g. `/interfaces/interface[name=eth0]/state`.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let elem = split_segments(text)?
            .iter()
            .map(|segment| parse_elem(text, segment))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_elems(elem))
    }

    pub fn is_root(&self) -> bool {
        self.elem.is_empty()
    }

    /// Appends `other`'s elements to this path, keeping this path's origin
    /// and target.
    pub fn join(
        &self,
        other: &Path,
    ) -> Path {
        let mut joined = self.clone();
        joined.elem.extend(other.elem.iter().cloned());
        joined
    }

    /// Exact element-wise prefix test, keys included.
    pub fn has_prefix(
        &self,
        prefix: &Path,
    ) -> bool {
        prefix.elem.len() <= self.elem.len()
            && prefix.elem.iter().zip(self.elem.iter()).all(|(p, e)| p == e)
    }

    /// Wildcard-aware prefix test used for subscriptions and Get.
    pub fn matches(
        &self,
        pattern: &Path,
    ) -> bool {
        pattern.elem.len() <= self.elem.len()
            && pattern.elem.iter().zip(self.elem.iter()).all(|(p, e)| e.matches(p))
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.elem.is_empty() {
            return f.write_str("/");
        }
        for elem in &self.elem {
            write!(f, "/{elem}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PathElem {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&escape(&self.name, &['/', '[', ']']))?;
        for (k, v) in &self.key {
            write!(f, "[{}={}]", escape(k, &['=', ']']), escape(v, &[']']))?;
        }
        Ok(())
    }
}

fn escape(
    text: &str,
    special: &[char],
) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Splits on `/` outside of key selectors. Escapes are kept for
/// `parse_elem`.
fn split_segments(text: &str) -> Result<Vec<String>, PathError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_key = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '[' if !in_key => {
                in_key = true;
                current.push(c);
            }
            ']' if in_key => {
                in_key = false;
                current.push(c);
            }
            '/' if !in_key => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if in_key {
        return Err(PathError::UnterminatedKey {
            path: text.to_string(),
        });
    }
    if !current.is_empty() {
        segments.push(current);
    }
    Ok(segments)
}

fn parse_elem(
    text: &str,
    segment: &str,
) -> Result<PathElem, PathError> {
    let malformed = || PathError::MalformedKey {
        path: text.to_string(),
        element: segment.to_string(),
    };

    let mut chars = segment.chars();
    let mut name = String::new();
    let mut rest = None;
    while let Some(c) = chars.next() {
        match c {
            '\\' => name.extend(chars.next()),
            '[' => {
                rest = Some(chars.as_str());
                break;
            }
            _ => name.push(c),
        }
    }
    if name.is_empty() {
        return Err(PathError::EmptyName {
            path: text.to_string(),
        });
    }

    let mut elem = PathElem::new(name);
    let Some(mut rest) = rest else {
        return Ok(elem);
    };

    // `rest` starts just after an opening bracket.
    loop {
        let mut key = String::new();
        let mut value = String::new();
        let mut chars = rest.chars();
        let mut seen_eq = false;
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let target = if seen_eq { &mut value } else { &mut key };
                    target.extend(chars.next());
                }
                '=' if !seen_eq => seen_eq = true,
                ']' => {
                    closed = true;
                    break;
                }
                _ if seen_eq => value.push(c),
                _ => key.push(c),
            }
        }
        if !seen_eq || !closed || key.is_empty() {
            return Err(malformed());
        }
        elem.key.insert(key, value);

        rest = chars.as_str();
        if rest.is_empty() {
            return Ok(elem);
        }
        match rest.strip_prefix('[') {
            Some(next) => rest = next,
            None => return Err(malformed()),
        }
    }
}
