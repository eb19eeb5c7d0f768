use std::fmt::Write as _;

use crate::model::{Field, Literal, LiteralKind, Quad, Term};
use crate::types::{QuadError, Result};

use super::TermCodec;

/// Encodes terms in N-Triples syntax.
///
/// The default graph encodes as the empty string, which sorts before every
/// other key.
#[derive(Clone, Copy, Debug, Default)]
pub struct NTriplesCodec;

impl NTriplesCodec {
    /// Creates the codec.
    pub fn new() -> Self {
        Self
    }
}

impl TermCodec for NTriplesCodec {
    fn encode(&self, term: &Term) -> String {
        let mut out = String::new();
        write_term(&mut out, term);
        out
    }

    fn decode(&self, key: &str) -> Result<Term> {
        if key.is_empty() {
            return Ok(Term::DefaultGraph);
        }
        let mut cursor = Cursor::new(key);
        let term = cursor.term()?;
        if !cursor.at_end() {
            return Err(cursor.error("trailing characters after term"));
        }
        Ok(term)
    }

    fn validate(&self, term: &Term) -> Result<()> {
        match term {
            Term::BlankNode(label) if !is_blank_label(label) => Err(QuadError::Codec(format!(
                "blank node label {label:?} must be non-empty without whitespace"
            ))),
            Term::Literal(Literal {
                kind: LiteralKind::Language(lang),
                ..
            }) if !is_language_tag(lang) => Err(QuadError::Codec(format!(
                "language tag {lang:?} must be non-empty ASCII letters, digits or '-'"
            ))),
            _ => Ok(()),
        }
    }
}

fn is_blank_label(label: &str) -> bool {
    !label.is_empty() && !label.chars().any(char::is_whitespace)
}

fn is_language_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-'
}

fn is_language_tag(lang: &str) -> bool {
    !lang.is_empty() && lang.chars().all(is_language_char)
}

fn write_term(out: &mut String, term: &Term) {
    match term {
        Term::Iri(iri) => write_iri(out, iri),
        Term::BlankNode(label) => {
            out.push_str("_:");
            out.push_str(label);
        }
        Term::Literal(Literal { value, kind }) => {
            out.push('"');
            for ch in value.chars() {
                match ch {
                    '\\' => out.push_str("\\\\"),
                    '"' => out.push_str("\\\""),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    c if c.is_control() => push_unicode_escape(out, c),
                    c => out.push(c),
                }
            }
            out.push('"');
            match kind {
                LiteralKind::Simple => {}
                LiteralKind::Language(lang) => {
                    out.push('@');
                    out.push_str(lang);
                }
                LiteralKind::Typed(datatype) => {
                    out.push_str("^^");
                    write_iri(out, datatype);
                }
            }
        }
        Term::DefaultGraph => {}
    }
}

fn write_iri(out: &mut String, iri: &str) {
    out.push('<');
    for ch in iri.chars() {
        match ch {
            '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => push_unicode_escape(out, ch),
            c if c <= ' ' => push_unicode_escape(out, c),
            c => out.push(c),
        }
    }
    out.push('>');
}

fn push_unicode_escape(out: &mut String, ch: char) {
    let code = u32::from(ch);
    if code <= 0xFFFF {
        let _ = write!(out, "\\u{code:04X}");
    } else {
        let _ = write!(out, "\\U{code:08X}");
    }
}

/// Parses one N-Quads line.
///
/// Returns `Ok(None)` for blank lines and comments. A missing graph term
/// places the quad in the default graph.
pub fn parse_nquads_line(line: &str) -> Result<Option<Quad>> {
    let mut cursor = Cursor::new(line);
    cursor.skip_ws();
    if cursor.at_end() || cursor.peek() == Some('#') {
        return Ok(None);
    }
    let subject = cursor.term()?;
    cursor.skip_ws();
    let predicate = cursor.term()?;
    cursor.skip_ws();
    let object = cursor.term()?;
    cursor.skip_ws();
    let context = if cursor.peek() == Some('.') {
        Term::DefaultGraph
    } else {
        let graph = cursor.term()?;
        cursor.skip_ws();
        graph
    };
    if cursor.peek() != Some('.') {
        return Err(cursor.error("expected '.' terminating statement"));
    }
    cursor.bump();
    cursor.skip_ws();
    if !cursor.at_end() && cursor.peek() != Some('#') {
        return Err(cursor.error("trailing characters after statement"));
    }
    Ok(Some(Quad::new(subject, predicate, object, context)))
}

/// Renders `quad` as one N-Quads statement, omitting the default graph.
pub fn format_nquads_line(quad: &Quad) -> String {
    let codec = NTriplesCodec;
    let mut line = String::new();
    for field in Field::ALL {
        let term = quad.get(field);
        if term.is_default_graph() {
            continue;
        }
        line.push_str(&codec.encode(term));
        line.push(' ');
    }
    line.push('.');
    line
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            _ => Err(self.error(&format!("expected '{expected}'"))),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.bump();
        }
    }

    fn error(&self, msg: &str) -> QuadError {
        QuadError::Codec(format!("{msg} at offset {} in {:?}", self.pos, self.src))
    }

    fn term(&mut self) -> Result<Term> {
        match self.peek() {
            Some('<') => Ok(Term::Iri(self.iri()?)),
            Some('_') => self.blank_node(),
            Some('"') => self.literal(),
            _ => Err(self.error("expected term")),
        }
    }

    fn iri(&mut self) -> Result<String> {
        self.expect('<')?;
        let mut iri = String::new();
        loop {
            match self.bump() {
                Some('>') => return Ok(iri),
                Some('\\') => iri.push(self.unicode_escape()?),
                Some(ch) => iri.push(ch),
                None => return Err(self.error("unterminated IRI")),
            }
        }
    }

    fn blank_node(&mut self) -> Result<Term> {
        self.expect('_')?;
        self.expect(':')?;
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if !ch.is_whitespace()) {
            self.bump();
        }
        let label = &self.src[start..self.pos];
        if label.is_empty() {
            return Err(self.error("empty blank node label"));
        }
        Ok(Term::BlankNode(label.to_owned()))
    }

    fn literal(&mut self) -> Result<Term> {
        self.expect('"')?;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.peek() {
                    Some('\\') => {
                        self.bump();
                        value.push('\\');
                    }
                    Some('"') => {
                        self.bump();
                        value.push('"');
                    }
                    Some('n') => {
                        self.bump();
                        value.push('\n');
                    }
                    Some('r') => {
                        self.bump();
                        value.push('\r');
                    }
                    Some('t') => {
                        self.bump();
                        value.push('\t');
                    }
                    _ => value.push(self.unicode_escape()?),
                },
                Some(ch) => value.push(ch),
                None => return Err(self.error("unterminated literal")),
            }
        }
        let kind = match self.peek() {
            Some('@') => {
                self.bump();
                let start = self.pos;
                while matches!(self.peek(), Some(ch) if is_language_char(ch)) {
                    self.bump();
                }
                let lang = &self.src[start..self.pos];
                if lang.is_empty() {
                    return Err(self.error("empty language tag"));
                }
                LiteralKind::Language(lang.to_owned())
            }
            Some('^') => {
                self.bump();
                self.expect('^')?;
                LiteralKind::Typed(self.iri()?)
            }
            _ => LiteralKind::Simple,
        };
        Ok(Term::Literal(Literal { value, kind }))
    }

    /// Decodes `uXXXX` or `UXXXXXXXX` following a backslash.
    fn unicode_escape(&mut self) -> Result<char> {
        let width = match self.bump() {
            Some('u') => 4,
            Some('U') => 8,
            _ => return Err(self.error("invalid escape sequence")),
        };
        let rest = self.rest();
        let digits = rest
            .get(..width)
            .ok_or_else(|| self.error("truncated unicode escape"))?;
        let code =
            u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid unicode escape"))?;
        let ch = char::from_u32(code).ok_or_else(|| self.error("invalid code point"))?;
        self.pos += width;
        Ok(ch)
    }
}
