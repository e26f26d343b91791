//! Prometheus text exposition parser.
//!
//! Parses the line-oriented format served on a Traefik `/metrics` endpoint:
//!
//! ```text
//! # HELP traefik_service_requests_total How many HTTP requests processed on a service.
//! # TYPE traefik_service_requests_total counter
//! traefik_service_requests_total{code="200",method="GET",service="whoami@docker"} 12
//! ```
//!
//! Parsing is lazy: [`parse`] returns a cloneable iterator that borrows the
//! scraped text. Comment lines are ignored, malformed lines and unparseable
//! values are skipped without aborting the rest of the input.

use std::borrow::Cow;
use tracing::trace;

/// Suffix distinguishing the series of a summary or histogram family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    Sum,
    Count,
    Bucket,
}

impl Suffix {
    fn as_str(&self) -> &'static str {
        match self {
            Suffix::Sum => "_sum",
            Suffix::Count => "_count",
            Suffix::Bucket => "_bucket",
        }
    }
}

/// Histogram bucket bound (`le`) or summary quantile carried by a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Marker {
    Bucket(f64),
    Quantile(f64),
}

/// A single parsed exposition line.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample<'a> {
    /// Full series name, including any `_sum`/`_count`/`_bucket` suffix.
    pub name: &'a str,
    /// Label pairs in exposition order, escapes decoded.
    pub labels: Vec<(&'a str, Cow<'a, str>)>,
    pub value: f64,
    pub marker: Option<Marker>,
}

impl<'a> RawSample<'a> {
    /// Returns the value of the first label called `name`.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_ref())
    }

    /// Returns the series suffix, if any.
    pub fn suffix(&self) -> Option<Suffix> {
        split_suffix(self.name).1
    }

    /// Returns the family name with any series suffix removed.
    pub fn base_name(&self) -> &'a str {
        split_suffix(self.name).0
    }
}

/// Splits a series name into its family base name and suffix.
pub fn split_suffix(name: &str) -> (&str, Option<Suffix>) {
    for suffix in [Suffix::Sum, Suffix::Count, Suffix::Bucket] {
        if let Some(base) = name.strip_suffix(suffix.as_str()) {
            if !base.is_empty() {
                return (base, Some(suffix));
            }
        }
    }
    (name, None)
}

/// Lazy iterator over the samples of an exposition text.
///
/// Cloning the iterator restarts nothing: the clone continues from the same
/// position. Call [`parse`] again on the same text to start over.
#[derive(Debug, Clone)]
pub struct Samples<'a> {
    lines: std::str::Lines<'a>,
    line_no: usize,
}

/// Parses exposition text into a lazy sequence of samples.
pub fn parse(text: &str) -> Samples<'_> {
    Samples {
        lines: text.lines(),
        line_no: 0,
    }
}

impl<'a> Iterator for Samples<'a> {
    type Item = RawSample<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            match parse_line(line) {
                Ok(Some(sample)) => return Some(sample),
                Ok(None) => continue,
                Err(reason) => {
                    trace!(line = self.line_no, reason, "Skipping exposition line");
                }
            }
        }
        None
    }
}

/// Parses one line. `Ok(None)` for blank and comment lines.
fn parse_line(line: &str) -> Result<Option<RawSample<'_>>, &'static str> {
    let mut cur = Cursor::new(line);
    cur.skip_ws();
    match cur.peek() {
        None | Some(b'#') => return Ok(None),
        _ => {}
    }

    let name = cur.take_name(is_metric_name_start, is_metric_name_char);
    if name.is_empty() {
        return Err("missing metric name");
    }

    let mut labels = Vec::new();
    let mut separated = cur.skip_ws();
    if cur.eat(b'{') {
        parse_labels(&mut cur, &mut labels)?;
        separated = cur.skip_ws();
    }
    if !separated {
        return Err("missing value");
    }
    let value = parse_value(cur.take_token()).ok_or("invalid value")?;

    // Optional timestamp, ignored
    if cur.skip_ws() && !cur.is_empty() {
        cur.take_token()
            .parse::<i64>()
            .map_err(|_| "invalid timestamp")?;
        cur.skip_ws();
    }
    if !cur.is_empty() {
        return Err("trailing data");
    }

    let marker = match split_suffix(name).1 {
        Some(Suffix::Bucket) => label_value(&labels, "le")
            .and_then(parse_value)
            .map(Marker::Bucket),
        Some(_) => None,
        None => label_value(&labels, "quantile")
            .and_then(parse_value)
            .map(Marker::Quantile),
    };

    Ok(Some(RawSample {
        name,
        labels,
        value,
        marker,
    }))
}

fn parse_labels<'a>(
    cur: &mut Cursor<'a>,
    labels: &mut Vec<(&'a str, Cow<'a, str>)>,
) -> Result<(), &'static str> {
    loop {
        cur.skip_ws();
        if cur.eat(b'}') {
            return Ok(());
        }

        let key = cur.take_name(is_label_name_start, is_label_name_char);
        if key.is_empty() {
            return Err("invalid label name");
        }
        cur.skip_ws();
        if !cur.eat(b'=') {
            return Err("expected '=' after label name");
        }
        cur.skip_ws();
        if !cur.eat(b'"') {
            return Err("expected quoted label value");
        }
        let value = cur.take_quoted()?;
        labels.push((key, value));

        cur.skip_ws();
        if cur.eat(b',') {
            continue;
        }
        if cur.eat(b'}') {
            return Ok(());
        }
        return Err("expected ',' or '}' in label set");
    }
}

fn label_value<'s>(labels: &'s [(&str, Cow<'_, str>)], name: &str) -> Option<&'s str> {
    labels
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.as_ref())
}

/// Parses a sample value, accepting the exposition spellings of infinities and NaN.
fn parse_value(token: &str) -> Option<f64> {
    match token {
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => token.parse().ok(),
    }
}

fn is_metric_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':'
}

fn is_metric_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b':'
}

fn is_label_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_label_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte cursor over a single line.
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skips spaces and tabs, returning whether anything was skipped.
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn take_name(&mut self, start: fn(u8) -> bool, rest: fn(u8) -> bool) -> &'a str {
        let begin = self.pos;
        match self.peek() {
            Some(b) if start(b) => self.pos += 1,
            _ => return "",
        }
        while matches!(self.peek(), Some(b) if rest(b)) {
            self.pos += 1;
        }
        let src: &'a str = self.src;
        &src[begin..self.pos]
    }

    /// Takes everything up to the next whitespace.
    fn take_token(&mut self) -> &'a str {
        let begin = self.pos;
        while matches!(self.peek(), Some(b) if b != b' ' && b != b'\t') {
            self.pos += 1;
        }
        let src: &'a str = self.src;
        &src[begin..self.pos]
    }

    /// Takes a label value after its opening quote, decoding `\\`, `\"` and `\n`.
    fn take_quoted(&mut self) -> Result<Cow<'a, str>, &'static str> {
        let src: &'a str = self.src;
        let bytes = src.as_bytes();
        let mut owned: Option<String> = None;
        let mut chunk_start = self.pos;

        while let Some(&b) = bytes.get(self.pos) {
            match b {
                b'"' => {
                    let tail = &src[chunk_start..self.pos];
                    self.pos += 1;
                    return Ok(match owned {
                        Some(mut s) => {
                            s.push_str(tail);
                            Cow::Owned(s)
                        }
                        None => Cow::Borrowed(tail),
                    });
                }
                b'\\' => {
                    let s = owned.get_or_insert_with(String::new);
                    s.push_str(&src[chunk_start..self.pos]);
                    match bytes.get(self.pos + 1) {
                        Some(b'n') => s.push('\n'),
                        Some(b'\\') => s.push('\\'),
                        Some(b'"') => s.push('"'),
                        Some(_) => {
                            // Unknown escape: keep the backslash, the next char is copied below
                            s.push('\\');
                            self.pos += 1;
                            chunk_start = self.pos;
                            continue;
                        }
                        None => return Err("unterminated label value"),
                    }
                    self.pos += 2;
                    chunk_start = self.pos;
                }
                _ => self.pos += 1,
            }
        }
        Err("unterminated label value")
    }
}
