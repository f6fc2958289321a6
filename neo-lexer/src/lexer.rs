//! The tokenizer itself.
//!
//! Grounded on `lexer_t` and `lexer_scan_next` in the original's
//! `neo_lexer.h`/`neo_lexer.c`: a single forward pass over the source text
//! that decodes UTF-8 lazily and returns one [`Token`] per call. Because the
//! source is already a validated `&str` here (rather than a raw byte
//! pointer), the manual `utf8_decode`/`utf8_seqlen` routines collapse into
//! iterating `char_indices`; the rest of the state machine - line/column
//! tracking, keyword recognition, numeric/string/char literal scanning -
//! follows the original directly.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use neo_types::strscan::{self, Scanned};

use crate::span::SourceSpan;
use crate::token::{Token, TokenKind};

/// An in-memory source file: its name and borrowed text.
///
/// Grounded on `source_t`, referenced but not defined in the header pack;
/// here it's simply the owning pair a [`Lexer`] borrows from.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'src> {
    /// File name as it should appear in diagnostics.
    pub name: &'src str,
    /// Full file contents.
    pub text: &'src str,
}

impl<'src> SourceFile<'src> {
    /// Wraps an already-loaded name/text pair. Loading from disk is the
    /// caller's concern (see `neo-compiler`'s CLI-facing glue).
    pub fn new(name: &'src str, text: &'src str) -> Self {
        SourceFile { name, text }
    }
}

/// Tokenizes a single [`SourceFile`].
pub struct Lexer<'src> {
    src: SourceFile<'src>,
    chars: Peekable<CharIndices<'src>>,
    tok_start: usize,
    line_start: usize,
    line: u32,
    col: u32,
    hit_eof: bool,
}

impl<'src> Lexer<'src> {
    /// Builds a lexer over `src`, positioned at its first byte.
    pub fn new(src: SourceFile<'src>) -> Self {
        Lexer {
            src,
            chars: src.text.char_indices().peekable(),
            tok_start: 0,
            line_start: 0,
            line: 1,
            col: 1,
            hit_eof: false,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
            self.line_start = self.byte_pos();
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn byte_pos(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.src.text.len())
    }

    fn current_line_span(&self) -> SourceSpan<'src> {
        let end = self.src.text[self.line_start..]
            .find('\n')
            .map(|i| self.line_start + i)
            .unwrap_or(self.src.text.len());
        SourceSpan::new(&self.src.text[self.line_start..end])
    }

    fn make_token(&mut self, kind: TokenKind, radix: Option<neo_types::strscan::Radix>) -> Token<'src> {
        let end = self.byte_pos();
        let lexeme = SourceSpan::new(&self.src.text[self.tok_start..end]);
        Token {
            kind,
            radix,
            line: self.line,
            col: self.col.saturating_sub((end - self.tok_start) as u32),
            lexeme,
            lexeme_line: self.current_line_span(),
            file: self.src.name,
        }
    }

    /// Skips ASCII whitespace (except newline, which is a significant
    /// token) and both comment forms: `#` runs to end of line, `#* ... *#`
    /// is a block comment. Implemented with an explicit loop rather than
    /// recursion, matching the spec's "comment scanning is recursive in
    /// the source but must be implemented iteratively."
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' => {
                    self.bump();
                }
                Some('#') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if matches!(lookahead.next(), Some((_, '*'))) {
                        self.bump();
                        self.bump();
                        self.skip_block_comment();
                    } else {
                        while let Some(c) = self.peek_char() {
                            if c == '\n' {
                                break;
                            }
                            self.bump();
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Scans past a `#* ... *#` block comment, whose opening delimiter has
    /// already been consumed. An unterminated block comment simply runs to
    /// end of file, matching the original's tolerant EOF handling.
    fn skip_block_comment(&mut self) {
        loop {
            match self.peek_char() {
                None => return,
                Some('*') => {
                    self.bump();
                    if self.peek_char() == Some('#') {
                        self.bump();
                        return;
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Scans and returns the next token. Returns an `MeEof`-kind token
    /// forever once the end of the source has been reached, mirroring the
    /// original's "call scan_next in a loop until EOF" usage pattern.
    pub fn scan_next(&mut self) -> Token<'src> {
        self.skip_whitespace_and_comments();
        self.tok_start = self.byte_pos();

        let Some(c) = self.peek_char() else {
            self.hit_eof = true;
            return self.make_token(TokenKind::MeEof, None);
        };

        if c == '\n' {
            self.bump();
            return self.make_token(TokenKind::PuNewline, None);
        }
        if c.is_ascii_digit() {
            return self.scan_number();
        }
        if c == '"' {
            return self.scan_string();
        }
        if c == '\'' {
            return self.scan_char();
        }
        if is_ident_start(c) {
            return self.scan_ident();
        }
        self.scan_operator()
    }

    /// Drains every remaining token into a `Vec`, including the trailing
    /// `MeEof` sentinel, matching `lexer_drain`.
    pub fn drain(mut self) -> Vec<Token<'src>> {
        let mut out = Vec::new();
        loop {
            let tok = self.scan_next();
            let is_eof = tok.is_eof();
            out.push(tok);
            if is_eof {
                break;
            }
        }
        out
    }

    fn scan_ident(&mut self) -> Token<'src> {
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                self.bump();
            } else {
                break;
            }
        }
        let end = self.byte_pos();
        let text = &self.src.text[self.tok_start..end];
        let kind = TokenKind::keyword_for(text).unwrap_or(TokenKind::LiIdent);
        self.make_token(kind, None)
    }

    fn scan_number(&mut self) -> Token<'src> {
        if self.peek_char() == Some('0') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if let Some((_, c2)) = lookahead.next() {
                if matches!(c2, 'x' | 'X' | 'b' | 'B' | 'o' | 'O' | 'c' | 'C') {
                    self.bump();
                    self.bump();
                    while let Some(c) = self.peek_char() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    return self.finish_number();
                }
            }
        }

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        if self.peek_char() == Some('.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if matches!(lookahead.next(), Some((_, c)) if c.is_ascii_digit()) {
                self.bump();
                while let Some(c) = self.peek_char() {
                    if c.is_ascii_digit() || c == '_' {
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            let exponent_follows =
                matches!(lookahead.peek(), Some((_, c)) if c.is_ascii_digit() || *c == '+' || *c == '-');
            if exponent_follows {
                self.bump();
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.bump();
                }
                while let Some(c) = self.peek_char() {
                    if c.is_ascii_digit() {
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        self.finish_number()
    }

    fn finish_number(&mut self) -> Token<'src> {
        let end = self.byte_pos();
        let text = &self.src.text[self.tok_start..end];
        match strscan::scan_numeric(text) {
            Scanned::Int(_) => {
                let radix = detect_radix(text);
                self.make_token(TokenKind::LiInt, Some(radix))
            }
            Scanned::Float(_) => self.make_token(TokenKind::LiFloat, None),
            Scanned::Overflow | Scanned::Malformed => self.make_token(TokenKind::MeErr, None),
        }
    }

    fn scan_string(&mut self) -> Token<'src> {
        self.bump(); // opening quote
        loop {
            match self.peek_char() {
                None => return self.make_token(TokenKind::MeErr, None),
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        self.make_token(TokenKind::LiString, None)
    }

    fn scan_char(&mut self) -> Token<'src> {
        self.bump(); // opening quote
        match self.peek_char() {
            Some('\\') => {
                self.bump();
                self.bump();
            }
            Some(_) => {
                self.bump();
            }
            None => return self.make_token(TokenKind::MeErr, None),
        }
        if self.peek_char() == Some('\'') {
            self.bump();
            self.make_token(TokenKind::LiChar, None)
        } else {
            self.make_token(TokenKind::MeErr, None)
        }
    }

    fn scan_operator(&mut self) -> Token<'src> {
        macro_rules! try3 {
            ($a:expr, $b:expr, $c:expr, $kind:expr) => {
                if self.match3($a, $b, $c) {
                    return self.make_token($kind, None);
                }
            };
        }
        macro_rules! try2 {
            ($a:expr, $b:expr, $kind:expr) => {
                if self.match2($a, $b) {
                    return self.make_token($kind, None);
                }
            };
        }
        macro_rules! try1 {
            ($a:expr, $kind:expr) => {
                if self.match1($a) {
                    return self.make_token($kind, None);
                }
            };
        }

        use TokenKind::*;
        // Longest-match-first within each shared prefix family.
        try3!('*', '*', '=', OpPowAssign);
        try2!('*', '*', OpPow);
        if self.match3('!', '+', '=') {
            return self.make_token(OpAddAssignNoOv, None);
        }
        try2!('!', '+', OpAddNoOv);
        if self.match3('!', '-', '=') {
            return self.make_token(OpSubAssignNoOv, None);
        }
        try2!('!', '-', OpSubNoOv);
        if self.match3('!', '*', '*') {
            if self.match1('=') {
                return self.make_token(OpPowAssignNoOv, None);
            }
            return self.make_token(OpPowNoOv, None);
        }
        if self.match3('!', '*', '=') {
            return self.make_token(OpMulAssignNoOv, None);
        }
        try2!('!', '*', OpMulNoOv);
        try2!('!', '=', OpNotEqual);

        if self.match1('<') {
            if self.match2('<', '<') {
                if self.match1('=') {
                    return self.make_token(OpBitRolAssign, None);
                }
                return self.make_token(OpBitRol, None);
            }
            if self.match1('<') {
                if self.match1('=') {
                    return self.make_token(OpBitAshlAssign, None);
                }
                return self.make_token(OpBitAshl, None);
            }
            if self.match1('=') {
                return self.make_token(OpLessEqual, None);
            }
            return self.make_token(OpLess, None);
        }
        if self.match1('>') {
            if self.match3('>', '>', '>') {
                if self.match1('=') {
                    return self.make_token(OpBitLshrAssign, None);
                }
                return self.make_token(OpBitLshr, None);
            }
            if self.match2('>', '>') {
                if self.match1('=') {
                    return self.make_token(OpBitRorAssign, None);
                }
                return self.make_token(OpBitRor, None);
            }
            if self.match1('>') {
                if self.match1('=') {
                    return self.make_token(OpBitAshrAssign, None);
                }
                return self.make_token(OpBitAshr, None);
            }
            if self.match1('=') {
                return self.make_token(OpGreaterEqual, None);
            }
            return self.make_token(OpGreater, None);
        }

        try2!('+', '=', OpAddAssign);
        try2!('+', '+', OpInc);
        try1!('+', OpAdd);
        try2!('-', '>', PuArrow);
        try2!('-', '=', OpSubAssign);
        try2!('-', '-', OpDec);
        try1!('-', OpSub);
        try2!('*', '=', OpMulAssign);
        try1!('*', OpMul);
        try2!('/', '=', OpDivAssign);
        try1!('/', OpDiv);
        try2!('%', '=', OpModAssign);
        try1!('%', OpMod);
        try2!('=', '=', OpEqual);
        try1!('=', OpAssign);
        try2!('!', '=', OpNotEqual);
        try2!('&', '=', OpBitAndAssign);
        try1!('&', OpBitAnd);
        try2!('|', '=', OpBitOrAssign);
        try1!('|', OpBitOr);
        try2!('^', '=', OpBitXorAssign);
        try1!('^', OpBitXor);
        try1!('~', OpBitCompl);
        try1!('.', OpDot);
        try1!('(', PuLParen);
        try1!(')', PuRParen);
        try1!('[', PuLBracket);
        try1!(']', PuRBracket);
        try1!('{', PuLBrace);
        try1!('}', PuRBrace);
        try1!(',', PuComma);
        try1!(':', PuColon);
        try1!('@', PuAt);

        self.bump();
        self.make_token(TokenKind::MeErr, None)
    }

    fn match1(&mut self, a: char) -> bool {
        if self.peek_char() == Some(a) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn match2(&mut self, a: char, b: char) -> bool {
        let mut lookahead = self.chars.clone();
        if lookahead.next().map(|(_, c)| c) == Some(a) && lookahead.next().map(|(_, c)| c) == Some(b)
        {
            self.bump();
            self.bump();
            true
        } else {
            false
        }
    }

    fn match3(&mut self, a: char, b: char, c: char) -> bool {
        let mut lookahead = self.chars.clone();
        if lookahead.next().map(|(_, x)| x) == Some(a)
            && lookahead.next().map(|(_, x)| x) == Some(b)
            && lookahead.next().map(|(_, x)| x) == Some(c)
        {
            self.bump();
            self.bump();
            self.bump();
            true
        } else {
            false
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn detect_radix(text: &str) -> neo_types::strscan::Radix {
    use neo_types::strscan::Radix;
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'0' {
        match bytes[1] {
            b'b' | b'B' => return Radix::Binary,
            b'o' | b'O' | b'c' | b'C' => return Radix::Octal,
            b'x' | b'X' => return Radix::Hex,
            _ => {}
        }
    }
    Radix::Decimal
}

impl fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lexer")
            .field("file", &self.src.name)
            .field("line", &self.line)
            .field("col", &self.col)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let file = SourceFile::new("test.neo", src);
        Lexer::new(file)
            .drain()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_keyword_and_ident() {
        assert_eq!(
            kinds("let x"),
            vec![TokenKind::KwLet, TokenKind::LiIdent, TokenKind::MeEof]
        );
    }

    #[rstest]
    #[case("42", TokenKind::LiInt)]
    #[case("0x2a", TokenKind::LiInt)]
    #[case("3.14", TokenKind::LiFloat)]
    #[case("1e10", TokenKind::LiFloat)]
    fn scans_numeric_literals(#[case] src: &str, #[case] expect: TokenKind) {
        let ks = kinds(src);
        assert_eq!(ks[0], expect);
    }

    #[test]
    fn scans_string_and_char_literals() {
        assert_eq!(
            kinds(r#""hello" 'a'"#),
            vec![TokenKind::LiString, TokenKind::LiChar, TokenKind::MeEof]
        );
    }

    #[test]
    fn scans_multichar_operators_longest_match_first() {
        assert_eq!(
            kinds("a <<<= b"),
            vec![
                TokenKind::LiIdent,
                TokenKind::OpBitRolAssign,
                TokenKind::LiIdent,
                TokenKind::MeEof
            ]
        );
        assert_eq!(
            kinds(">>>>"),
            vec![TokenKind::OpBitLshr, TokenKind::MeEof]
        );
    }

    #[test]
    fn recognizes_literal_keywords() {
        assert_eq!(
            kinds("true and not self"),
            vec![
                TokenKind::LiTrue,
                TokenKind::OpLogAnd,
                TokenKind::OpLogNot,
                TokenKind::LiSelf,
                TokenKind::MeEof
            ]
        );
    }

    #[test]
    fn skips_comments_and_tracks_newlines() {
        let ks = kinds("let x # a comment\nlet y");
        assert_eq!(
            ks,
            vec![
                TokenKind::KwLet,
                TokenKind::LiIdent,
                TokenKind::PuNewline,
                TokenKind::KwLet,
                TokenKind::LiIdent,
                TokenKind::MeEof
            ]
        );
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        assert_eq!(kinds(r#""unterminated"#), vec![TokenKind::MeErr, TokenKind::MeEof]);
    }
}
