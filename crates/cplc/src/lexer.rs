//! Converts characters from a [`CharSource`] into tagged [`Token`]s (§4.D).
//!
//! The lexer is the only component allowed to call `unread_char`, and
//! always exactly once per lookahead decision (`:`, `<`, `>`, the
//! terminating character of a number or identifier) — never twice in a
//! row, which would trip the character source's double-pushback guard.

use crate::diagnostics::FatalError;
use crate::interner::StringInterner;
use crate::source::{CharSource, END_OF_INPUT};
use crate::token::{lookup_keyword, Token, TokenCode, KEYWORDS};

pub struct Lexer<'a> {
    source: &'a mut CharSource,
    interner: &'a mut StringInterner,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a mut CharSource, interner: &'a mut StringInterner) -> Self {
        Lexer { source, interner }
    }

    /// Scans and returns the next token, or a fatal error if the
    /// character source's pushback discipline was violated (an
    /// implementer bug, not a user-input error).
    pub fn next_token(&mut self) -> Result<Token, FatalError> {
        let lead = loop {
            match self.source.read_char() {
                END_OF_INPUT => return Ok(Token::new(TokenCode::EndOfInput)),
                ch if is_whitespace(ch) => continue,
                b'!' as i32 => {
                    self.skip_comment();
                    continue;
                }
                ch => break ch as u8,
            }
        };
        let position = self.source.current_column() - 1;

        let token = match lead {
            b';' => Token::new(TokenCode::Semicolon),
            b',' => Token::new(TokenCode::Comma),
            b'.' => Token::new(TokenCode::Dot),
            b'(' => Token::new(TokenCode::LeftParen),
            b')' => Token::new(TokenCode::RightParen),
            b'+' => Token::new(TokenCode::Plus),
            b'-' => Token::new(TokenCode::Minus),
            b'*' => Token::new(TokenCode::Mult),
            b'/' => Token::new(TokenCode::Divide),
            b'=' => Token::new(TokenCode::Equality),
            b':' => self.scan_colon()?,
            b'<' => self.scan_less()?,
            b'>' => self.scan_greater()?,
            d if d.is_ascii_digit() => self.scan_number(d),
            l if l.is_ascii_alphabetic() => self.scan_identifier(l)?,
            other => {
                self.source.report_error(
                    crate::diagnostics::Severity::Lexical,
                    format!("Illegal character '{}'", other as char),
                    position,
                );
                Token::new(TokenCode::Error)
            }
        };

        Ok(token.with_position(position))
    }

    fn skip_comment(&mut self) {
        loop {
            match self.source.read_char() {
                END_OF_INPUT => break,
                ch if ch as u8 == b'\n' => break,
                _ => continue,
            }
        }
    }

    fn scan_colon(&mut self) -> Result<Token, FatalError> {
        match self.source.read_char() {
            ch if ch == b'=' as i32 => Ok(Token::new(TokenCode::Assign)),
            END_OF_INPUT => Ok(Token::new(TokenCode::Error)),
            _ => {
                self.source.unread_char()?;
                Ok(Token::new(TokenCode::Error))
            }
        }
    }

    fn scan_less(&mut self) -> Result<Token, FatalError> {
        match self.source.read_char() {
            ch if ch == b'=' as i32 => Ok(Token::new(TokenCode::LessEqual)),
            END_OF_INPUT => Ok(Token::new(TokenCode::Less)),
            _ => {
                self.source.unread_char()?;
                Ok(Token::new(TokenCode::Less))
            }
        }
    }

    fn scan_greater(&mut self) -> Result<Token, FatalError> {
        match self.source.read_char() {
            ch if ch == b'=' as i32 => Ok(Token::new(TokenCode::GreaterEqual)),
            END_OF_INPUT => Ok(Token::new(TokenCode::Greater)),
            _ => {
                self.source.unread_char()?;
                Ok(Token::new(TokenCode::Greater))
            }
        }
    }

    fn scan_number(&mut self, first: u8) -> Token {
        let mut value: i64 = (first - b'0') as i64;
        loop {
            match self.source.read_char() {
                ch if ch != END_OF_INPUT && (ch as u8).is_ascii_digit() => {
                    value = value * 10 + (ch as u8 - b'0') as i64;
                }
                END_OF_INPUT => break,
                _ => {
                    // Best-effort: double pushback can't happen here since
                    // we only ever unread the single non-digit we just read.
                    let _ = self.source.unread_char();
                    break;
                }
            }
        }
        Token::new(TokenCode::IntConst).with_value(value)
    }

    fn scan_identifier(&mut self, first: u8) -> Result<Token, FatalError> {
        self.interner.begin();
        self.interner.push(first);
        loop {
            match self.source.read_char() {
                ch if ch != END_OF_INPUT
                    && ((ch as u8).is_ascii_alphanumeric()) =>
                {
                    self.interner.push(ch as u8);
                }
                END_OF_INPUT => break,
                _ => {
                    self.source.unread_char()?;
                    break;
                }
            }
        }
        let spelling = self.interner.current().to_ascii_uppercase();
        if let Some(code) = lookup_keyword(&spelling) {
            // Reserved word: don't commit, the spelling field is unused.
            Ok(Token::new(code))
        } else {
            let handle = self.interner.commit();
            Ok(Token::new(TokenCode::Identifier).with_spelling(handle))
        }
    }
}

fn is_whitespace(ch: i32) -> bool {
    ch == b' ' as i32 || ch == b'\t' as i32 || ch == b'\n' as i32 || ch == b'\r' as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<TokenCode> {
        let mut source = CharSource::new(src);
        let mut interner = StringInterner::new();
        let mut lexer = Lexer::new(&mut source, &mut interner);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            let done = tok.code == TokenCode::EndOfInput;
            out.push(tok.code);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn keyword_in_isolation_is_recognised() {
        let mut source = CharSource::new("WHILE");
        let mut interner = StringInterner::new();
        let mut lexer = Lexer::new(&mut source, &mut interner);
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.code, TokenCode::While);
        assert!(tok.spelling.is_none());
    }

    #[test]
    fn keyword_embedded_in_longer_identifier_is_not_a_keyword() {
        let mut source = CharSource::new("WHILEX");
        let mut interner = StringInterner::new();
        let mut lexer = Lexer::new(&mut source, &mut interner);
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.code, TokenCode::Identifier);
        assert_eq!(interner.resolve(tok.spelling.unwrap()), "WHILEX");
    }

    /// §8 "Lexical round-trip": every reserved word in [`KEYWORDS`] — not
    /// just a sample — lexes to its keyword code with no spelling when
    /// standing alone, and to a full-spelling `IDENTIFIER` when it's only
    /// a prefix of a longer name. This is the property whose gap let
    /// `WRITE` go unrecognised (it was missing from `KEYWORDS` entirely).
    #[test]
    fn every_reserved_word_round_trips_in_isolation_and_embedded() {
        for &(spelling, code) in KEYWORDS {
            let mut source = CharSource::new(spelling);
            let mut interner = StringInterner::new();
            let mut lexer = Lexer::new(&mut source, &mut interner);
            let tok = lexer.next_token().unwrap();
            assert_eq!(tok.code, code, "{spelling} should lex as its keyword code");
            assert!(tok.spelling.is_none(), "{spelling} keyword token carries no spelling");

            let embedded = format!("{spelling}X");
            let mut source = CharSource::new(&embedded);
            let mut interner = StringInterner::new();
            let mut lexer = Lexer::new(&mut source, &mut interner);
            let tok = lexer.next_token().unwrap();
            assert_eq!(tok.code, TokenCode::Identifier, "{embedded} should lex as an identifier");
            assert_eq!(interner.resolve(tok.spelling.unwrap()), embedded);
        }
    }

    #[test]
    fn write_keyword_is_recognised_like_any_other_reserved_word() {
        let mut source = CharSource::new("WRITE");
        let mut interner = StringInterner::new();
        let mut lexer = Lexer::new(&mut source, &mut interner);
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.code, TokenCode::Write);
        assert!(tok.spelling.is_none());
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let codes = tokens("! this is ignored\nBEGIN END.");
        assert_eq!(
            codes,
            vec![
                TokenCode::Begin,
                TokenCode::End,
                TokenCode::Dot,
                TokenCode::EndOfInput
            ]
        );
    }

    #[test]
    fn assign_vs_bare_colon() {
        let codes = tokens(":=");
        assert_eq!(codes, vec![TokenCode::Assign, TokenCode::EndOfInput]);
        let codes = tokens(":x");
        assert_eq!(
            codes,
            vec![TokenCode::Error, TokenCode::Identifier, TokenCode::EndOfInput]
        );
    }

    #[test]
    fn relational_operators_with_and_without_equals() {
        assert_eq!(
            tokens("< <= > >="),
            vec![
                TokenCode::Less,
                TokenCode::LessEqual,
                TokenCode::Greater,
                TokenCode::GreaterEqual,
                TokenCode::EndOfInput
            ]
        );
    }

    #[test]
    fn intconst_accumulates_base_ten() {
        let mut source = CharSource::new("4207x");
        let mut interner = StringInterner::new();
        let mut lexer = Lexer::new(&mut source, &mut interner);
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.code, TokenCode::IntConst);
        assert_eq!(tok.value, 4207);
        let next = lexer.next_token().unwrap();
        assert_eq!(next.code, TokenCode::Identifier);
    }

    #[test]
    fn illegal_character_is_reported_and_tagged() {
        let mut source = CharSource::new("@");
        let mut interner = StringInterner::new();
        let mut lexer = Lexer::new(&mut source, &mut interner);
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.code, TokenCode::Error);
    }
}
