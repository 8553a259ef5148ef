//! In-place rewriting of agent configuration and startup files.
//!
//! Both rewriters stream the target line by line into a temporary file in
//! the same directory, sync it, and rename it over the original. A reader
//! sees either the old content or the new content, never a missing file.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use regex::bytes::{Captures, Regex};
use tempfile::NamedTempFile;

use super::error::{InstallerError, Result};

/// Literal placeholder tokens and their replacements.
///
/// Substitution happens in one left-to-right pass over each line. Where
/// several tokens could match at the same position the longest wins, and
/// replacement text is never scanned again, so the outcome does not depend
/// on the order tokens were inserted. Lines are handled as raw bytes, so
/// text outside the tokens may be in any encoding.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    map: BTreeMap<String, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a token. Empty tokens are ignored.
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let token = token.into();
        if !token.is_empty() {
            self.map.insert(token, value.into());
        }
        self
    }

    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(token, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Apply every substitution to `line`.
    pub fn apply(&self, line: &[u8]) -> Vec<u8> {
        match self.matcher() {
            Some(re) => self.apply_with(&re, line),
            None => line.to_vec(),
        }
    }

    fn apply_with(&self, re: &Regex, line: &[u8]) -> Vec<u8> {
        re.replace_all(line, |caps: &Captures<'_>| {
            // every match is one of the tokens, so it is valid UTF-8
            std::str::from_utf8(&caps[0])
                .ok()
                .and_then(|token| self.map.get(token))
                .map(|value| value.as_bytes().to_vec())
                .unwrap_or_else(|| caps[0].to_vec())
        })
        .into_owned()
    }

    /// Alternation of all tokens, longest first so that leftmost-first
    /// matching prefers the longest token at any position.
    fn matcher(&self) -> Option<Regex> {
        if self.map.is_empty() {
            return None;
        }
        let mut tokens: Vec<&str> = self.map.keys().map(String::as_str).collect();
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let pattern = tokens
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        // escaped literals always form a valid pattern
        Regex::new(&pattern).ok()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Placeholders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut placeholders = Self::new();
        for (k, v) in iter {
            placeholders.insert(k, v);
        }
        placeholders
    }
}

/// Replace every placeholder occurrence in the file at `path`.
///
/// An empty map copies every line unchanged. A missing or unreadable
/// source fails before any temporary file is created.
pub fn rewrite_placeholders(path: &Path, placeholders: &Placeholders) -> Result<()> {
    let matcher = placeholders.matcher();
    rewrite_lines_with(path, |line| match &matcher {
        Some(re) => placeholders.apply_with(re, line),
        None => line.to_vec(),
    })
}

/// Replace whole lines: any line matching a rule's pattern becomes the
/// rule's replacement (first matching rule wins). Used for `key=value`
/// files that ship with real values instead of placeholder tokens.
pub fn rewrite_matching_lines(path: &Path, rules: &[(Regex, String)]) -> Result<()> {
    rewrite_lines_with(path, |line| {
        let (body, terminator) = split_terminator(line);
        match rules.iter().find(|(re, _)| re.is_match(body)) {
            Some((_, replacement)) => {
                let replacement = replacement.trim_end_matches(['\r', '\n']);
                // keep the original terminator; a final unterminated line
                // gets one so the next key never joins it
                let terminator = if terminator.is_empty() { &b"\n"[..] } else { terminator };
                [replacement.as_bytes(), terminator].concat()
            }
            None => line.to_vec(),
        }
    })
}

fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
    let body_len = line
        .iter()
        .rposition(|b| *b != b'\r' && *b != b'\n')
        .map_or(0, |i| i + 1);
    line.split_at(body_len)
}

/// Stream `path` through `transform` one line (terminator included) at a
/// time and atomically replace it with the result.
fn rewrite_lines_with<F>(path: &Path, mut transform: F) -> Result<()>
where
    F: FnMut(&[u8]) -> Vec<u8>,
{
    let source = File::open(path).map_err(|e| InstallerError::io(path, e))?;
    let permissions = source
        .metadata()
        .map_err(|e| InstallerError::io(path, e))?
        .permissions();

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir).map_err(|e| InstallerError::io(dir, e))?;

    let mut reader = BufReader::new(source);
    let mut writer = BufWriter::new(temp);
    let mut line = Vec::new();
    let mut count = 0usize;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| InstallerError::io(path, e))?;
        if read == 0 {
            break;
        }
        writer
            .write_all(&transform(&line))
            .map_err(|e| InstallerError::io(path, e))?;
        count += 1;
    }

    let temp = writer
        .into_inner()
        .map_err(|e| InstallerError::io(path, e.into_error()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| InstallerError::io(temp.path(), e))?;
    fs::set_permissions(temp.path(), permissions).map_err(|e| InstallerError::io(temp.path(), e))?;

    temp.persist(path)
        .map_err(|e| InstallerError::io(path, e.error))?;

    debug!("rewrote {} lines in {}", count, path.display());
    Ok(())
}
