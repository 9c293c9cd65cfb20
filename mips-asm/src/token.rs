//! Single-pass tokenizer. A `Token` is emitted from source text by matching a
//! single combined regular expression whose alternatives are ordered so that earlier branches
//! win ties (`regex`'s leftmost-first semantics over `|`) — this realizes the tokenizer's
//! class precedence (newline, punctuation, comment, whitespace, string, char, then the
//! directive/mnemonic/register/integer/label cascade) without a hand-rolled state machine.

use lazy_static::lazy_static;
use regex::Regex;
use std::rc::Rc;

/// Where a token came from: the source file, 1-based line, byte offset within that line, and
/// byte offset from the start of the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Rc<String>,
    pub line: u32,
    pub line_offset: u32,
    pub file_offset: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.line_offset + 1)
    }
}

/// A parsed integer/char/string value, carried alongside the token's raw text so later stages
/// never have to re-parse.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedValue {
    None,
    Int(i64),
    Bytes(Vec<u8>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenType {
    Newline,
    Whitespace,
    Comma,
    Colon,
    LeftParen,
    RightParen,
    Register,
    Mnemonic,
    Directive,
    Immediate,
    Ascii,
    Char,
    Comment,
    Label,
    Unknown,
}

impl TokenType {
    /// `Immediate | Char | Label` accept anywhere an immediate-like value is expected.
    pub fn is_immediate_like(self) -> bool {
        matches!(self, TokenType::Immediate | TokenType::Char | TokenType::Label)
    }

    pub fn is_trivia(self) -> bool {
        matches!(self, TokenType::Whitespace | TokenType::Comment)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenType,
    pub raw_text: String,
    pub parsed_value: ParsedValue,
    pub location: SourceLocation,
}

impl Token {
    pub fn int_value(&self) -> Option<i64> {
        match self.parsed_value {
            ParsedValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

const DIRECTIVES: &[&str] = &[
    "text", "ktext", "data", "kdata", "align", "byte", "half", "word", "ascii", "asciiz", "space",
    "extern", "globl", "include",
];

lazy_static! {
    /// One alternation, precedence encoded by branch order.
    /// Named groups let `Lexer::next_token` recover which branch matched without re-testing.
    static ref TOKEN_RE: Regex = Regex::new(concat!(
        r"(?P<newline>\n)",
        r"|(?P<comma>,)",
        r"|(?P<colon>:)",
        r"|(?P<lparen>\()",
        r"|(?P<rparen>\))",
        r"|(?P<comment>#[^\n]*)",
        r"|(?P<whitespace>[ \t\r]+)",
        r#"|(?P<ascii>"(?:\\.|[^"\\])*")"#,
        r"|(?P<char>'(?:\\.|[^'\\])')",
        r"|(?P<word>[^\s,:()#]+)",
    ))
    .unwrap();

    static ref REGISTER_RE: Regex = Regex::new(r"^\$([A-Za-z][A-Za-z0-9]*|[0-9]+)$").unwrap();
    static ref LABEL_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_.$]*$").unwrap();
    static ref INT_RE: Regex =
        Regex::new(r"^-?(0[xX][0-9a-fA-F]+|0[oO][0-7]+|0[bB][01]+|[0-9]+([eE][0-9]+)?)$").unwrap();
}

/// Walks the source text once, handing back one [`Token`] per call. `known_mnemonics` decides
/// whether a bare word is a `Mnemonic` or (failing that) a `Label`/`Unknown`.
pub struct Lexer<'a> {
    text: &'a str,
    file: Rc<String>,
    pos: usize,
    line: u32,
    line_start: usize,
    known_mnemonics: &'a dyn Fn(&str) -> bool,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, file: &str, known_mnemonics: &'a dyn Fn(&str) -> bool) -> Self {
        Lexer {
            text,
            file: Rc::new(file.to_owned()),
            pos: 0,
            line: 1,
            line_start: 0,
            known_mnemonics,
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            line: self.line,
            line_offset: (self.pos - self.line_start) as u32,
            file_offset: self.pos as u32,
        }
    }

    /// Classifies a bare, non-punctuation word by a fallback cascade: directive name, register,
    /// integer literal, then a label-shaped identifier, else `Unknown`.
    fn classify_word(&self, word: &str) -> (TokenType, ParsedValue) {
        if let Some(name) = word.strip_prefix('.') {
            if DIRECTIVES.contains(&name) {
                return (TokenType::Directive, ParsedValue::None);
            }
        }
        if (self.known_mnemonics)(word) {
            return (TokenType::Mnemonic, ParsedValue::None);
        }
        if REGISTER_RE.is_match(word) {
            return (TokenType::Register, ParsedValue::None);
        }
        if INT_RE.is_match(word) {
            if let Some(v) = mips_util::from_string(word, 64, true) {
                return (TokenType::Immediate, ParsedValue::Int(v));
            }
        }
        if LABEL_RE.is_match(word) {
            return (TokenType::Label, ParsedValue::None);
        }
        (TokenType::Unknown, ParsedValue::None)
    }

    fn advance_location(&mut self, matched: &str) {
        for (i, c) in matched.char_indices() {
            if c == '\n' {
                self.line += 1;
                self.line_start = self.pos + i + 1;
            }
        }
        self.pos += matched.len();
    }

    pub fn next_token(&mut self) -> Option<Token> {
        if self.pos >= self.text.len() {
            return None;
        }
        let caps = TOKEN_RE.captures_at(self.text, self.pos)?;
        let whole = caps.get(0).unwrap();
        if whole.start() != self.pos {
            // Shouldn't happen given the `word` catch-all matches any non-trivia byte, but
            // guard against the lexer stalling rather than looping forever.
            return None;
        }
        let location = self.location();
        let matched = whole.as_str();

        let (kind, parsed) = if caps.name("newline").is_some() {
            (TokenType::Newline, ParsedValue::None)
        } else if caps.name("comma").is_some() {
            (TokenType::Comma, ParsedValue::None)
        } else if caps.name("colon").is_some() {
            (TokenType::Colon, ParsedValue::None)
        } else if caps.name("lparen").is_some() {
            (TokenType::LeftParen, ParsedValue::None)
        } else if caps.name("rparen").is_some() {
            (TokenType::RightParen, ParsedValue::None)
        } else if caps.name("comment").is_some() {
            (TokenType::Comment, ParsedValue::None)
        } else if caps.name("whitespace").is_some() {
            (TokenType::Whitespace, ParsedValue::None)
        } else if caps.name("ascii").is_some() {
            let inner = &matched[1..matched.len() - 1];
            match mips_util::decode_ascii_escapes(inner) {
                Some(bytes) => (TokenType::Ascii, ParsedValue::Bytes(bytes)),
                None => (TokenType::Unknown, ParsedValue::None),
            }
        } else if caps.name("char").is_some() {
            match mips_util::from_string(matched, 8, false) {
                Some(v) => (TokenType::Char, ParsedValue::Int(v)),
                None => (TokenType::Unknown, ParsedValue::None),
            }
        } else if caps.name("word").is_some() {
            self.classify_word(matched)
        } else {
            unreachable!("TOKEN_RE always matches one named alternative");
        };

        self.advance_location(matched);
        Some(Token { kind, raw_text: matched.to_owned(), parsed_value: parsed, location })
    }
}

/// Tokenizes `text` fully, dropping whitespace/comment trivia.
pub fn tokenize(text: &str, file: &str, known_mnemonics: &dyn Fn(&str) -> bool) -> Vec<Token> {
    let mut lexer = Lexer::new(text, file, known_mnemonics);
    let mut tokens = Vec::new();
    while let Some(tok) = lexer.next_token() {
        if !tok.kind.is_trivia() {
            tokens.push(tok);
        }
    }
    tokens
}

#[cfg(test)]
mod test {
    use super::*;

    fn no_mnemonics(_: &str) -> bool {
        false
    }

    #[test]
    fn tokenizes_a_simple_instruction_line() {
        let tokens = tokenize("add $t0, $t1, $t2\n", "t.s", &no_mnemonics);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenType::Label,
                TokenType::Register,
                TokenType::Comma,
                TokenType::Register,
                TokenType::Comma,
                TokenType::Register,
                TokenType::Newline,
            ]
        );
    }

    #[test]
    fn mnemonic_wins_when_known() {
        let is_add = |s: &str| s == "add";
        let tokens = tokenize("add", "t.s", &is_add);
        assert_eq!(tokens[0].kind, TokenType::Mnemonic);
    }

    #[test]
    fn recognizes_directives_and_strings() {
        let tokens = tokenize(".asciiz \"hi\\n\"", "t.s", &no_mnemonics);
        assert_eq!(tokens[0].kind, TokenType::Directive);
        assert_eq!(tokens[1].kind, TokenType::Ascii);
        assert_eq!(tokens[1].parsed_value, ParsedValue::Bytes(vec![b'h', b'i', b'\n']));
    }

    #[test]
    fn recognizes_hex_and_char_immediates() {
        let tokens = tokenize("0x1F 'a'", "t.s", &no_mnemonics);
        assert_eq!(tokens[0].int_value(), Some(0x1F));
        assert_eq!(tokens[1].kind, TokenType::Char);
        assert_eq!(tokens[1].int_value(), Some(b'a' as i64));
    }

    #[test]
    fn tracks_line_and_file_offsets_across_newlines() {
        let tokens = tokenize("add\nsub", "t.s", &|_| true);
        assert_eq!(tokens[0].location.line, 1);
        assert_eq!(tokens[2].location.line, 2);
        assert_eq!(tokens[2].location.file_offset, 4);
    }

    #[test]
    fn comment_runs_to_end_of_line_and_is_suppressed() {
        let tokens = tokenize("add # trailing comment\nsub", "t.s", &|_| true);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenType::Mnemonic, TokenType::Newline, TokenType::Mnemonic]);
    }
}
