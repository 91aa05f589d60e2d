//! Masking templates.
//!
//! A template is literal text with `{{ ... }}` actions. The set of actions is
//! closed:
//!
//! | Action            | Short form       | Output                                 |
//! |-------------------|------------------|----------------------------------------|
//! | `{{ .Raw }}`      | `{{ raw }}`      | the original value                     |
//! | `{{ .Salt }}`     | `{{ salt }}`     | the run salt as hex                    |
//! | `{{ .Hashed }}`   | `{{ hash }}`     | bcrypt of the value with the run salt  |
//! | `{{ .First N }}`  | `{{ first:N }}`  | first N characters                     |
//! | `{{ .Last N }}`   | `{{ last:N }}`   | last N characters                      |
//!
//! Everything outside actions is copied as is, so `{{ .First 3 }}***` keeps
//! the first three characters and appends three asterisks.

use super::hash::{HashCache, HashCost};
use super::salt::Salt;
use crate::error::Result;
use std::borrow::Cow;

/// A single masking operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Raw,
    Salt,
    Hashed,
    First(usize),
    Last(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Op(Operation),
}

/// Inputs visible to a template while rendering one value
#[derive(Debug, Clone, Copy)]
pub struct ValueContext<'a> {
    /// Exact bytes of the value, which need not be UTF-8
    pub raw: &'a [u8],
    pub salt: &'a Salt,
    pub cost: HashCost,
}

impl ValueContext<'_> {
    /// First `n` characters. Invalid UTF-8 is decoded lossily first.
    pub fn first(&self, n: usize) -> Cow<'_, [u8]> {
        match String::from_utf8_lossy(self.raw) {
            Cow::Borrowed(text) => Cow::Borrowed(first_chars(text, n).as_bytes()),
            Cow::Owned(text) => Cow::Owned(first_chars(&text, n).as_bytes().to_vec()),
        }
    }

    /// Last `n` characters. Invalid UTF-8 is decoded lossily first.
    pub fn last(&self, n: usize) -> Cow<'_, [u8]> {
        match String::from_utf8_lossy(self.raw) {
            Cow::Borrowed(text) => Cow::Borrowed(last_chars(text, n).as_bytes()),
            Cow::Owned(text) => Cow::Owned(last_chars(&text, n).as_bytes().to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl CompiledTemplate {
    /// Compile a template string. The error is a human-readable reason.
    pub fn compile(source: &str) -> std::result::Result<Self, String> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }

            let after_open = &rest[open + 2..];
            let close = after_open
                .find("}}")
                .ok_or_else(|| format!("unterminated action in {:?}", source))?;

            segments.push(Segment::Op(parse_action(after_open[..close].trim())?));
            rest = &after_open[close + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether any segment depends on the run salt
    pub fn is_salted(&self) -> bool {
        self.segments.iter().any(|s| {
            matches!(
                s,
                Segment::Op(Operation::Hashed) | Segment::Op(Operation::Salt)
            )
        })
    }

    /// Render against one value. Text and `Raw` are copied byte for byte.
    pub fn render(&self, ctx: &ValueContext<'_>, cache: &mut HashCache) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.source.len() + ctx.raw.len());

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.extend_from_slice(text.as_bytes()),
                Segment::Op(Operation::Raw) => out.extend_from_slice(ctx.raw),
                Segment::Op(Operation::Salt) => {
                    out.extend_from_slice(ctx.salt.to_hex().as_bytes())
                }
                Segment::Op(Operation::Hashed) => {
                    let hashed = cache.get_or_hash(ctx.raw, ctx.salt, ctx.cost)?;
                    out.extend_from_slice(hashed.as_bytes())
                }
                Segment::Op(Operation::First(n)) => out.extend_from_slice(&ctx.first(*n)),
                Segment::Op(Operation::Last(n)) => out.extend_from_slice(&ctx.last(*n)),
            }
        }

        Ok(out)
    }
}

fn parse_action(action: &str) -> std::result::Result<Operation, String> {
    let mut words = action.split_whitespace();
    let head = words
        .next()
        .ok_or_else(|| "empty action {{ }}".to_string())?;
    let arg = words.next();
    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument {:?} in {{{{ {} }}}}", extra, action));
    }

    let (name, inline_arg) = match head.split_once(':') {
        Some((name, n)) => (name, Some(n)),
        None => (head, None),
    };

    let op = match (name, inline_arg.or(arg)) {
        (".Raw" | "raw", None) => Operation::Raw,
        (".Salt" | "salt", None) => Operation::Salt,
        (".Hashed" | "hash" | "hashed", None) => Operation::Hashed,
        (".First" | "first", Some(n)) => Operation::First(parse_count(n, action)?),
        (".Last" | "last", Some(n)) => Operation::Last(parse_count(n, action)?),
        (".First" | "first" | ".Last" | "last", None) => {
            return Err(format!("missing character count in {{{{ {} }}}}", action))
        }
        (".Raw" | "raw" | ".Salt" | "salt" | ".Hashed" | "hash" | "hashed", Some(_)) => {
            return Err(format!("{} takes no argument", name))
        }
        _ => return Err(format!("unknown operation {:?}", name)),
    };

    if inline_arg.is_some() && arg.is_some() {
        return Err(format!("unexpected argument in {{{{ {} }}}}", action));
    }

    Ok(op)
}

fn parse_count(n: &str, action: &str) -> std::result::Result<usize, String> {
    n.parse::<usize>()
        .map_err(|_| format!("invalid character count {:?} in {{{{ {} }}}}", n, action))
}

/// First `n` characters, or all of `raw` when it is shorter
pub fn first_chars(raw: &str, n: usize) -> &str {
    match raw.char_indices().nth(n) {
        Some((end, _)) => &raw[..end],
        None => raw,
    }
}

/// Last `n` characters, or all of `raw` when it is shorter
pub fn last_chars(raw: &str, n: usize) -> &str {
    if n == 0 {
        return &raw[raw.len()..];
    }
    match raw.char_indices().rev().nth(n - 1) {
        Some((start, _)) => &raw[start..],
        None => raw,
    }
}
