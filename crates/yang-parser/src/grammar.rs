use crate::lexer::{Lexer, Token, TokenKind};
use crate::limit::LimitTracker;
use crate::stmt::{Document, Keyword, Statement};
use crate::Error;

/// Parses the compact YANG syntax into a [`Document`].
///
/// ## Example
/// ```rust
/// use yang_parser::Parser;
///
/// let input = r#"
/// module example {
///   namespace "urn:example";
///   prefix ex;
///   leaf greeting { type string; }
/// }
/// "#;
///
/// let tree = Parser::new(input).parse();
/// assert!(tree.errors().is_empty());
/// assert_eq!(tree.document().statements.len(), 1);
/// ```
pub struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<Error>,
    recursion: LimitTracker,
}

/// The result of a parse: a (possibly partial) document plus the errors
/// encountered while producing it.
#[derive(Debug)]
pub struct SyntaxTree {
    document: Document,
    errors: Vec<Error>,
    recursion: LimitTracker,
}

impl SyntaxTree {
    pub(crate) fn from_parts(document: Document, errors: Vec<Error>) -> Self {
        Self {
            document,
            errors,
            recursion: LimitTracker::default(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn errors(&self) -> &[Error] {
        self.errors.as_slice()
    }

    /// Recursion limit usage over the whole parse.
    pub fn recursion_limit(&self) -> LimitTracker {
        self.recursion
    }
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let (tokens, errors) = Lexer::new(input).into_parts();
        Self {
            input,
            tokens,
            pos: 0,
            errors,
            recursion: LimitTracker::default(),
        }
    }

    /// Configure the maximum statement nesting depth.
    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.recursion = LimitTracker::new(limit);
        self
    }

    pub fn parse(mut self) -> SyntaxTree {
        let mut statements = Vec::new();

        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Word => {
                    if let Some(statement) = self.parse_statement() {
                        statements.push(statement);
                    }
                }
                _ => {
                    let token = self.bump();
                    self.errors.push(Error::with_loc(
                        "expected a statement keyword",
                        token.data().to_string(),
                        token.index(),
                    ));
                }
            }
        }

        SyntaxTree {
            document: Document { statements },
            errors: self.errors,
            recursion: self.recursion,
        }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        let keyword_token = self.bump();
        let keyword = Keyword::from_word(keyword_token.data());
        let loc = keyword_token.index();

        let arg = self.parse_argument();
        let mut statement = Statement::new(keyword, arg, loc);

        match self.peek_kind() {
            TokenKind::Semicolon => {
                self.bump();
                Some(statement)
            }
            TokenKind::LBrace => {
                self.bump();
                self.recursion.consume();
                if self.recursion.limited() {
                    self.errors.push(Error::with_loc(
                        "statement nesting exceeds the recursion limit",
                        statement.keyword.as_str().to_string(),
                        loc,
                    ));
                    self.recursion.release();
                    return None;
                }
                loop {
                    match self.peek_kind() {
                        TokenKind::RBrace => {
                            self.bump();
                            break;
                        }
                        TokenKind::Eof => {
                            self.errors.push(Error::with_loc(
                                "missing closing brace",
                                "EOF".to_string(),
                                self.input.len(),
                            ));
                            break;
                        }
                        TokenKind::Word => {
                            if let Some(child) = self.parse_statement() {
                                statement.children.push(child);
                            }
                        }
                        _ => {
                            let token = self.bump();
                            self.errors.push(Error::with_loc(
                                "expected a substatement or `}`",
                                token.data().to_string(),
                                token.index(),
                            ));
                        }
                    }
                }
                self.recursion.release();
                Some(statement)
            }
            _ => {
                let token = self.bump();
                self.errors.push(Error::with_loc(
                    "expected `;` or `{` after statement",
                    token.data().to_string(),
                    token.index(),
                ));
                None
            }
        }
    }

    fn parse_argument(&mut self) -> Option<String> {
        match self.peek_kind() {
            TokenKind::Word => {
                let token = self.bump();
                Some(token.data().to_string())
            }
            TokenKind::StringValue => {
                let token = self.bump();
                let mut arg = self.string_value(&token);
                // `"a" + "b"` concatenates adjacent quoted strings.
                while self.peek_kind() == TokenKind::Plus {
                    self.bump();
                    if self.peek_kind() == TokenKind::StringValue {
                        let token = self.bump();
                        arg.push_str(&self.string_value(&token));
                    } else {
                        let token = self.bump();
                        self.errors.push(Error::with_loc(
                            "expected a quoted string after `+`",
                            token.data().to_string(),
                            token.index(),
                        ));
                        break;
                    }
                }
                Some(arg)
            }
            _ => None,
        }
    }

    /// Strip quotes and, for double quotes, apply escape translation followed
    /// by the RFC 6020 §6.1.3 indentation-stripping rule.
    fn string_value(&self, token: &Token) -> String {
        let raw = token.data();
        let inner = &raw[1..raw.len() - 1];
        if raw.starts_with('\'') {
            return inner.to_string();
        }

        let unescaped = unescape(inner);
        strip_indentation(&unescaped, self.quote_column(token.index()))
    }

    /// Column of the opening quote, with a tab counting as eight columns.
    fn quote_column(&self, index: usize) -> usize {
        let line_start = self.input[..index].rfind('\n').map_or(0, |i| i + 1);
        self.input[line_start..index]
            .chars()
            .map(|c| if c == '\t' { 8 } else { 1 })
            .sum()
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.skip_trivia();
        self.tokens[self.pos].kind()
    }

    fn bump(&mut self) -> Token {
        self.skip_trivia();
        let token = self.tokens[self.pos].clone();
        if token.kind() != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn skip_trivia(&mut self) {
        while self.tokens[self.pos].is_trivia() || self.tokens[self.pos].kind() == TokenKind::Error
        {
            self.pos += 1;
        }
    }
}

/// `\n`, `\t`, `\\` and `\"` are translated; any other `\X` stays literal.
fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Remove up to `indent` leading columns from every line after the first.
/// The indent is the column just past the opening quote; residual spaces are
/// preserved, and a tab that would overshoot the indent is kept.
fn strip_indentation(input: &str, quote_column: usize) -> String {
    let indent = quote_column + 1;
    let mut lines = input.split('\n');
    let mut out = String::with_capacity(input.len());

    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        let mut columns = 0;
        let mut rest = line;
        loop {
            let mut chars = rest.chars();
            match chars.next() {
                Some(' ') if columns < indent => {
                    columns += 1;
                    rest = chars.as_str();
                }
                Some('\t') if columns + 8 <= indent => {
                    columns += 8;
                    rest = chars.as_str();
                }
                _ => break,
            }
        }
        out.push_str(rest);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_one(input: &str) -> Statement {
        let tree = Parser::new(input).parse();
        assert_eq!(tree.errors(), &[], "unexpected syntax errors");
        tree.into_document().statements.remove(0)
    }

    #[test]
    fn it_parses_nested_statements() {
        let module = parse_one("module a { leaf l { type string; } }");
        assert_eq!(module.keyword, Keyword::Module);
        assert_eq!(module.arg.as_deref(), Some("a"));
        let leaf = &module.children[0];
        assert_eq!(leaf.keyword, Keyword::Leaf);
        assert_eq!(leaf.children[0].keyword, Keyword::Type);
        assert_eq!(leaf.children[0].arg.as_deref(), Some("string"));
    }

    #[test]
    fn it_translates_escapes() {
        let statement = parse_one(r#"description "line\nnext\ttab \d";"#);
        assert_eq!(statement.arg.as_deref(), Some("line\nnext\ttab \\d"));
    }

    #[test]
    fn it_strips_indentation_in_double_quotes() {
        let input = "description\n  \"first\n     second\";";
        let statement = parse_one(input);
        // The quote sits at column 2, so up to 3 leading columns go away.
        assert_eq!(statement.arg.as_deref(), Some("first\n  second"));
    }

    #[test]
    fn it_keeps_single_quotes_verbatim() {
        let statement = parse_one(r#"pattern '\d+[a-z] ';"#);
        assert_eq!(statement.arg.as_deref(), Some(r"\d+[a-z] "));
    }

    #[test]
    fn it_concatenates_quoted_strings() {
        let statement = parse_one(r#"pattern "[a-z]" + "[0-9]";"#);
        assert_eq!(statement.arg.as_deref(), Some("[a-z][0-9]"));
    }

    #[test]
    fn it_parses_extension_statements() {
        let statement = parse_one("ex:annotation value;");
        assert_eq!(
            statement.keyword,
            Keyword::Unknown("ex:annotation".to_string())
        );
    }

    #[test]
    fn it_recovers_from_a_missing_terminator() {
        let tree = Parser::new("module a { leaf l }").parse();
        assert!(!tree.errors().is_empty());
    }
}
