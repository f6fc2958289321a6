//! Token kinds and the [`Token`] value the lexer produces one at a time.
//!
//! The variant list and lexeme table are transcribed from the `tkdef` X-macro
//! in the original's `neo_lexer.h`, grouped the same way: keywords, literals,
//! punctuation, operators, then the two meta tokens `ERROR`/`EOF`.

use std::fmt;

use neo_types::strscan::Radix;

use crate::span::SourceSpan;

/// A lexical token type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum TokenKind {
    // Keywords.
    KwFunction,
    KwLet,
    KwNew,
    KwEnd,
    KwThen,
    KwIf,
    KwElse,
    KwReturn,
    KwClass,
    KwModule,
    KwBreak,
    KwContinue,
    KwWhile,
    KwStatic,
    KwDo,
    // Literals.
    LiIdent,
    LiInt,
    LiFloat,
    LiString,
    LiChar,
    LiTrue,
    LiFalse,
    LiSelf,
    // Punctuation.
    PuLParen,
    PuRParen,
    PuLBracket,
    PuRBracket,
    PuLBrace,
    PuRBrace,
    PuComma,
    PuArrow,
    PuColon,
    PuAt,
    PuNewline,
    // Operators.
    OpDot,
    OpAssign,
    OpAdd,
    OpSub,
    OpMul,
    OpPow,
    OpAddNoOv,
    OpSubNoOv,
    OpMulNoOv,
    OpPowNoOv,
    OpDiv,
    OpMod,
    OpAddAssign,
    OpSubAssign,
    OpMulAssign,
    OpPowAssign,
    OpAddAssignNoOv,
    OpSubAssignNoOv,
    OpMulAssignNoOv,
    OpPowAssignNoOv,
    OpDivAssign,
    OpModAssign,
    OpInc,
    OpDec,
    OpEqual,
    OpNotEqual,
    OpLess,
    OpLessEqual,
    OpGreater,
    OpGreaterEqual,
    OpBitAnd,
    OpBitOr,
    OpBitXor,
    OpBitAndAssign,
    OpBitOrAssign,
    OpBitXorAssign,
    OpBitAshl,
    OpBitAshr,
    OpBitRol,
    OpBitRor,
    OpBitLshr,
    OpBitAshlAssign,
    OpBitAshrAssign,
    OpBitRolAssign,
    OpBitRorAssign,
    OpBitLshrAssign,
    OpBitCompl,
    OpLogAnd,
    OpLogOr,
    OpLogNot,
    // Meta.
    MeErr,
    MeEof,
}

impl TokenKind {
    /// The first and last token kinds classified as keywords, matching
    /// `KWR_START`/`KWR_END` in the original - used by the parser to
    /// recognize reserved words when diagnosing "expected identifier"
    /// errors.
    pub const KEYWORD_RANGE: (TokenKind, TokenKind) = (TokenKind::KwFunction, TokenKind::KwDo);

    /// The canonical lexeme for a fixed-text token kind (keywords,
    /// punctuation, operators). Literal and meta kinds return a
    /// placeholder describing the kind rather than actual source text,
    /// matching `tok_lexemes`'s `"<ident>"`-style entries.
    pub fn lexeme(self) -> &'static str {
        use TokenKind::*;
        match self {
            KwFunction => "func",
            KwLet => "let",
            KwNew => "new",
            KwEnd => "end",
            KwThen => "then",
            KwIf => "if",
            KwElse => "else",
            KwReturn => "return",
            KwClass => "class",
            KwModule => "module",
            KwBreak => "break",
            KwContinue => "continue",
            KwWhile => "while",
            KwStatic => "static",
            KwDo => "do",
            LiIdent => "<ident>",
            LiInt => "<int>",
            LiFloat => "<float>",
            LiString => "<string>",
            LiChar => "<char>",
            LiTrue => "true",
            LiFalse => "false",
            LiSelf => "self",
            PuLParen => "(",
            PuRParen => ")",
            PuLBracket => "[",
            PuRBracket => "]",
            PuLBrace => "{",
            PuRBrace => "}",
            PuComma => ",",
            PuArrow => "->",
            PuColon => ":",
            PuAt => "@",
            PuNewline => "\\n",
            OpDot => ".",
            OpAssign => "=",
            OpAdd => "+",
            OpSub => "-",
            OpMul => "*",
            OpPow => "**",
            OpAddNoOv => "!+",
            OpSubNoOv => "!-",
            OpMulNoOv => "!*",
            OpPowNoOv => "!**",
            OpDiv => "/",
            OpMod => "%",
            OpAddAssign => "+=",
            OpSubAssign => "-=",
            OpMulAssign => "*=",
            OpPowAssign => "**=",
            OpAddAssignNoOv => "!+=",
            OpSubAssignNoOv => "!-=",
            OpMulAssignNoOv => "!*=",
            OpPowAssignNoOv => "!**=",
            OpDivAssign => "/=",
            OpModAssign => "%=",
            OpInc => "++",
            OpDec => "--",
            OpEqual => "==",
            OpNotEqual => "!=",
            OpLess => "<",
            OpLessEqual => "<=",
            OpGreater => ">",
            OpGreaterEqual => ">=",
            OpBitAnd => "&",
            OpBitOr => "|",
            OpBitXor => "^",
            OpBitAndAssign => "&=",
            OpBitOrAssign => "|=",
            OpBitXorAssign => "^=",
            OpBitAshl => "<<",
            OpBitAshr => ">>",
            OpBitRol => "<<<",
            OpBitRor => ">>>",
            OpBitLshr => ">>>>",
            OpBitAshlAssign => "<<=",
            OpBitAshrAssign => ">>=",
            OpBitRolAssign => "<<<=",
            OpBitRorAssign => ">>>=",
            OpBitLshrAssign => ">>>>=",
            OpBitCompl => "~",
            OpLogAnd => "and",
            OpLogOr => "or",
            OpLogNot => "not",
            MeErr => "ERROR",
            MeEof => "EOF",
        }
    }

    /// Looks up the keyword/literal-keyword token kind for an identifier's
    /// text, if any. Covers both the 15 control-flow keywords and the 6
    /// "custom" literal keywords (`true`, `false`, `and`, `or`, `not`,
    /// `self`) that the original tracks in a separate `KW_MAPPINGS` table.
    pub fn keyword_for(ident: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match ident {
            "func" => KwFunction,
            "let" => KwLet,
            "new" => KwNew,
            "end" => KwEnd,
            "then" => KwThen,
            "if" => KwIf,
            "else" => KwElse,
            "return" => KwReturn,
            "class" => KwClass,
            "module" => KwModule,
            "break" => KwBreak,
            "continue" => KwContinue,
            "while" => KwWhile,
            "static" => KwStatic,
            "do" => KwDo,
            "true" => LiTrue,
            "false" => LiFalse,
            "and" => OpLogAnd,
            "or" => OpLogOr,
            "not" => OpLogNot,
            "self" => LiSelf,
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.lexeme())
    }
}

/// A single scanned token, with position and source-text information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    /// The token's kind.
    pub kind: TokenKind,
    /// Numeric radix, meaningful only when `kind == TokenKind::LiInt`.
    pub radix: Option<Radix>,
    /// 1-based line number of the token's first byte.
    pub line: u32,
    /// 1-based column number of the token's first byte.
    pub col: u32,
    /// The token's own source text.
    pub lexeme: SourceSpan<'src>,
    /// The full line of source text containing the token, used for
    /// caret-style diagnostics.
    pub lexeme_line: SourceSpan<'src>,
    /// Name of the source file the token came from.
    pub file: &'src str,
}

impl<'src> Token<'src> {
    /// Whether this token is the designated end-of-file sentinel.
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::MeEof
    }

    /// Whether this token is a lexer error sentinel.
    pub fn is_error(&self) -> bool {
        self.kind == TokenKind::MeErr
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {:?} {:?}",
            self.file, self.line, self.col, self.kind, self.lexeme
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_covers_control_keywords_and_literal_keywords() {
        assert_eq!(TokenKind::keyword_for("func"), Some(TokenKind::KwFunction));
        assert_eq!(TokenKind::keyword_for("and"), Some(TokenKind::OpLogAnd));
        assert_eq!(TokenKind::keyword_for("self"), Some(TokenKind::LiSelf));
        assert_eq!(TokenKind::keyword_for("banana"), None);
    }

    #[test]
    fn lexeme_round_trips_for_fixed_text_kinds() {
        assert_eq!(TokenKind::OpBitLshrAssign.lexeme(), ">>>>=");
        assert_eq!(TokenKind::PuArrow.lexeme(), "->");
    }
}
