//! The tokenizer (§4.1 "Tokenizer"): built once from the symbol table
//! via `logos`'s derive, rather than hand-composing one big regex from
//! registered symbols sorted by length descending — `logos` already
//! resolves overlapping literal/regex alternatives by longest match, so
//! the registrations below state each symbol once and let the derive
//! build the DFA.

use logos::Logos;

fn unquote(raw: &str) -> String {
    // XPath string literals double the delimiter to escape it:
    // "foo""bar" -> foo"bar", 'foo''bar' -> foo'bar'.
    let delim = raw.chars().next().unwrap();
    let inner = &raw[1..raw.len() - 1];
    let doubled = format!("{}{}", delim, delim);
    inner.replace(&doubled, &delim.to_string())
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum RawToken {
    #[regex(r#""([^"]|"")*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^']|'')*'"#, |lex| unquote(lex.slice()))]
    StringLit(String),

    #[regex(r"[0-9]+(\.[0-9]*)?|\.[0-9]+", |lex| lex.slice().parse().ok())]
    Number(f64),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token("::")]
    AxisSep,
    #[token(":")]
    Colon,
    #[token("//")]
    SlashSlash,
    #[token("/")]
    Slash,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token("@")]
    At,
    #[token("|")]
    Pipe,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("!=")]
    Ne,
    #[token("=")]
    Eq,
    #[token("<=")]
    Le,
    #[token("<<")]
    Precedes,
    #[token("<")]
    Lt,
    #[token(">=")]
    Ge,
    #[token(">>")]
    Follows,
    #[token(">")]
    Gt,
    #[token("$")]
    Dollar,
    #[token("?")]
    Question,

    #[regex(r"[A-Za-z_][A-Za-z0-9_\-]*", |lex| lex.slice().to_string())]
    Name(String),
}

/// A lexed token plus its source position (§3.1's `position`).
#[derive(Debug, Clone, PartialEq)]
pub struct LexedToken {
    pub raw: RawToken,
    pub position: crate::error::Position,
}

/// Drains a `logos::Lexer` into a flat vector up front. `logos`'s DFA
/// table is built once (lazily, on first use of the derive) and reused
/// across every `Tokenizer::tokenize` call, matching §4.1's "lazily
/// compiled on first parse".
pub struct Tokenizer;

impl Tokenizer {
    pub fn tokenize(source: &str) -> Result<Vec<LexedToken>, crate::error::Error> {
        let mut out = Vec::new();
        let mut lexer = RawToken::lexer(source);
        let mut line = 1u32;
        let mut col = 1u32;
        let mut last_end = 0usize;
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            // Advance line/col bookkeeping over the skipped gap plus this token.
            for ch in source[last_end..span.start].chars() {
                if ch == '\n' {
                    line += 1;
                    col = 1;
                } else {
                    col += 1;
                }
            }
            let position = crate::error::Position { line, column: col };
            for ch in source[span.start..span.end].chars() {
                if ch == '\n' {
                    line += 1;
                    col = 1;
                } else {
                    col += 1;
                }
            }
            last_end = span.end;

            match result {
                Ok(tok) => out.push(LexedToken { raw: tok, position }),
                Err(_) => {
                    return Err(crate::error::Error::syntax(
                        position,
                        format!("unrecognized token near '{}'", &source[span.start..span.end.min(source.len())]),
                    ))
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_path_with_predicate() {
        let toks = Tokenizer::tokenize("/r/x[@a>15]/@a").unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.raw.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                RawToken::Slash,
                RawToken::Name("r".into()),
                RawToken::Slash,
                RawToken::Name("x".into()),
                RawToken::LBracket,
                RawToken::At,
                RawToken::Name("a".into()),
                RawToken::Gt,
                RawToken::Number(15.0),
                RawToken::RBracket,
                RawToken::Slash,
                RawToken::At,
                RawToken::Name("a".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_string_literal_with_escaped_quote() {
        let toks = Tokenizer::tokenize(r#"concat("foo""bar", 'x')"#).unwrap();
        assert_eq!(toks[2].raw, RawToken::StringLit("foo\"bar".to_string()));
    }
}
