mod cursor;
mod token;

use crate::Error;

use cursor::Cursor;
pub use token::{Token, TokenKind};

/// Splits input text into tokens, keeping trivia (whitespace and comments)
/// so the parser can report accurate locations.
pub(crate) struct Lexer {
    tokens: Vec<Token>,
    errors: Vec<Error>,
}

impl Lexer {
    pub(crate) fn new(input: &str) -> Self {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        let mut cursor = Cursor::new(input);
        while !cursor.is_eof() {
            let (token, error) = cursor.advance();
            tokens.push(token);
            if let Some(error) = error {
                errors.push(error);
            }
        }
        tokens.push(Token::new(TokenKind::Eof, "EOF".to_string(), input.len()));

        Self { tokens, errors }
    }

    pub(crate) fn tokens(&self) -> &[Token] {
        self.tokens.as_slice()
    }

    pub(crate) fn errors(&self) -> &[Error] {
        self.errors.as_slice()
    }

    pub(crate) fn into_parts(self) -> (Vec<Token>, Vec<Error>) {
        (self.tokens, self.errors)
    }
}

impl Cursor<'_> {
    fn advance(&mut self) -> (Token, Option<Error>) {
        let index = self.offset();
        let first_char = self.bump().unwrap();

        match first_char {
            c if is_whitespace(c) => (self.whitespace(c, index), None),
            '/' if self.first() == '/' => (self.line_comment(index), None),
            '/' if self.first() == '*' => self.block_comment(index),
            '"' | '\'' => self.quoted_string(first_char, index),
            ';' => (
                Token::new(TokenKind::Semicolon, first_char.into(), index),
                None,
            ),
            '{' => (Token::new(TokenKind::LBrace, first_char.into(), index), None),
            '}' => (Token::new(TokenKind::RBrace, first_char.into(), index), None),
            '+' if is_delimiter(self.first()) || matches!(self.first(), '"' | '\'') => {
                (Token::new(TokenKind::Plus, first_char.into(), index), None)
            }
            c => (self.word(c, index), None),
        }
    }

    fn whitespace(&mut self, first_char: char, index: usize) -> Token {
        let mut buf = String::new();
        buf.push(first_char);

        while !self.is_eof() && is_whitespace(self.first()) {
            buf.push(self.bump().unwrap());
        }

        Token::new(TokenKind::Whitespace, buf, index)
    }

    fn line_comment(&mut self, index: usize) -> Token {
        let mut buf = String::from('/');

        while !self.is_eof() && !is_line_terminator(self.first()) {
            buf.push(self.bump().unwrap());
        }

        Token::new(TokenKind::Comment, buf, index)
    }

    fn block_comment(&mut self, index: usize) -> (Token, Option<Error>) {
        let mut buf = String::from('/');
        buf.push(self.bump().unwrap()); // the `*` we peeked

        while !self.is_eof() {
            let c = self.bump().unwrap();
            buf.push(c);
            if c == '*' && self.eatc('/') {
                buf.push('/');
                return (Token::new(TokenKind::Comment, buf, index), None);
            }
        }

        let error = Error::with_loc("unterminated block comment", buf.clone(), index);
        (Token::new(TokenKind::Error, buf, index), Some(error))
    }

    fn quoted_string(&mut self, quote: char, index: usize) -> (Token, Option<Error>) {
        let mut buf = String::new();
        buf.push(quote);

        while !self.is_eof() {
            let c = self.bump().unwrap();
            buf.push(c);
            if c == quote {
                return (Token::new(TokenKind::StringValue, buf, index), None);
            }
            // A backslash escapes the next character in double quotes only.
            if c == '\\' && quote == '"' {
                if let Some(escaped) = self.bump() {
                    buf.push(escaped);
                }
            }
        }

        let error = Error::with_loc("unterminated string", buf.clone(), index);
        (Token::new(TokenKind::Error, buf, index), Some(error))
    }

    fn word(&mut self, first_char: char, index: usize) -> Token {
        let mut buf = String::new();
        buf.push(first_char);

        while !self.is_eof() {
            let first = self.first();
            if is_delimiter(first) || first == '"' || first == '\'' {
                break;
            }
            if first == '/' && (self.second() == '/' || self.second() == '*') {
                break;
            }
            buf.push(self.bump().unwrap());
        }

        Token::new(TokenKind::Word, buf, index)
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{000B}' | '\u{000C}')
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r')
}

fn is_delimiter(c: char) -> bool {
    matches!(c, ';' | '{' | '}') || is_whitespace(c) || c == cursor::EOF_CHAR
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokens()
            .iter()
            .filter(|t| !t.is_trivia())
            .map(|t| t.kind())
            .collect()
    }

    #[test]
    fn it_lexes_a_statement() {
        assert_eq!(
            kinds("leaf l { type string; }"),
            [
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::LBrace,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Semicolon,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn it_lexes_quoted_strings_with_escapes() {
        let lexer = Lexer::new(r#"description "a \"quoted\" word";"#);
        assert!(lexer.errors().is_empty());
        let string = lexer
            .tokens()
            .iter()
            .find(|t| t.kind() == TokenKind::StringValue)
            .unwrap();
        assert_eq!(string.data(), r#""a \"quoted\" word""#);
    }

    #[test]
    fn it_keeps_paths_out_of_comments() {
        assert_eq!(
            kinds("path /a:b/c;"),
            [
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Semicolon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn it_reports_unterminated_strings() {
        let lexer = Lexer::new("description \"no end");
        assert_eq!(lexer.errors().len(), 1);
        assert_eq!(lexer.errors()[0].message(), "unterminated string");
    }

    #[test]
    fn it_lexes_concatenation() {
        assert_eq!(
            kinds(r#"pattern "a" + "b";"#),
            [
                TokenKind::Word,
                TokenKind::StringValue,
                TokenKind::Plus,
                TokenKind::StringValue,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }
}
