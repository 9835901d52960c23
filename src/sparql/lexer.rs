//! Tokenizer shared by the query parser and the Turtle reader
//!
//! Quoted strings and IRIs are consumed whole, so a `.`, `;` or `}` inside
//! them never reaches the grammar as punctuation.

use std::fmt;

use super::error::QueryError;

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `<...>`, without the angle brackets
    IriRef(String),
    /// `prefix:local`; the prefix may be empty (`:name`) and so may the local part (`ex:`)
    PrefixedName { prefix: String, local: String },
    /// `?name` or `$name`, without the sigil
    Variable(String),
    /// Unescaped contents of a quoted string
    String(String),
    /// `@tag` following a string, or a Turtle directive such as `@prefix`
    LangTag(String),
    Integer(String),
    Decimal(String),
    Double(String),
    /// Bare word: keywords, `a`, `true`, function names
    Ident(String),
    /// `_:label`
    BlankNode(String),
    DoubleCaret,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Semicolon,
    Comma,
    Star,
    Bang,
    AndAnd,
    OrOr,
    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Slash,
    Pipe,
    Caret,
    Plus,
    Minus,
    Question,
}

impl Token {
    /// Check for a case-insensitive keyword
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(word) if word.eq_ignore_ascii_case(keyword))
    }

    /// Tokens that end a value, after which `-5` is subtraction rather than a number
    fn ends_value(&self) -> bool {
        matches!(
            self,
            Token::IriRef(_)
                | Token::PrefixedName { .. }
                | Token::Variable(_)
                | Token::String(_)
                | Token::Integer(_)
                | Token::Decimal(_)
                | Token::Double(_)
                | Token::RParen
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::IriRef(iri) => write!(f, "<{}>", iri),
            Token::PrefixedName { prefix, local } => write!(f, "{}:{}", prefix, local),
            Token::Variable(v) => write!(f, "?{}", v),
            Token::String(s) => write!(f, "\"{}\"", s),
            Token::LangTag(t) => write!(f, "@{}", t),
            Token::Integer(n) | Token::Decimal(n) | Token::Double(n) => write!(f, "{}", n),
            Token::Ident(w) => write!(f, "{}", w),
            Token::BlankNode(b) => write!(f, "_:{}", b),
            Token::DoubleCaret => write!(f, "^^"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Dot => write!(f, "."),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Star => write!(f, "*"),
            Token::Bang => write!(f, "!"),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Eq => write!(f, "="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Le => write!(f, "<="),
            Token::Ge => write!(f, ">="),
            Token::Slash => write!(f, "/"),
            Token::Pipe => write!(f, "|"),
            Token::Caret => write!(f, "^"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Question => write!(f, "?"),
        }
    }
}

/// A token with the byte offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub start: usize,
}

/// Hand-written scanner over the query or document text
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Spanned>,
    /// Open parentheses; inside them `<` after a value is a comparison
    paren_depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0, tokens: Vec::new(), paren_depth: 0 }
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, QueryError> {
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else {
                break;
            };
            let start = self.pos;
            let token = self.next_token(c)?;
            match token {
                Token::LParen => self.paren_depth += 1,
                Token::RParen => self.paren_depth = self.paren_depth.saturating_sub(1),
                _ => {}
            }
            self.tokens.push(Spanned { token, start });
        }
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn error(&self, message: impl Into<String>, at: usize) -> QueryError {
        QueryError::syntax(message, &self.input[at..])
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                // Comment runs to end of line
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn previous_ends_value(&self) -> bool {
        self.tokens.last().is_some_and(|t| t.token.ends_value())
    }

    fn next_token(&mut self, c: char) -> Result<Token, QueryError> {
        let start = self.pos;
        match c {
            '<' => {
                let in_expression = self.paren_depth > 0 && self.previous_ends_value();
                if !in_expression {
                    if let Some(iri) = self.scan_iri_ref() {
                        return Ok(Token::IriRef(iri));
                    }
                }
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    return Ok(Token::Le);
                }
                Ok(Token::Lt)
            }
            '"' | '\'' => self.scan_string(c).map(Token::String),
            '?' | '$' => {
                self.bump();
                let name = self.scan_name();
                if name.is_empty() {
                    if c == '$' {
                        return Err(self.error("Expected variable name", start));
                    }
                    return Ok(Token::Question);
                }
                Ok(Token::Variable(name))
            }
            '@' => {
                self.bump();
                let tag = self.scan_while(|c| c.is_ascii_alphanumeric() || c == '-');
                if tag.is_empty() {
                    return Err(self.error("Expected language tag", start));
                }
                Ok(Token::LangTag(tag))
            }
            '_' if self.peek_nth(1) == Some(':') => {
                self.bump();
                self.bump();
                Ok(Token::BlankNode(self.scan_name()))
            }
            '0'..='9' => Ok(self.scan_number()),
            '+' | '-' | '.'
                if self.peek_nth(1).is_some_and(|n| n.is_ascii_digit())
                    && (c == '.' || !self.previous_ends_value()) =>
            {
                Ok(self.scan_number())
            }
            '{' => self.single(Token::LBrace),
            '}' => self.single(Token::RBrace),
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '[' => self.single(Token::LBracket),
            ']' => self.single(Token::RBracket),
            '.' => self.single(Token::Dot),
            ';' => self.single(Token::Semicolon),
            ',' => self.single(Token::Comma),
            '*' => self.single(Token::Star),
            '/' => self.single(Token::Slash),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '=' => self.single(Token::Eq),
            '^' => {
                self.bump();
                if self.peek() == Some('^') {
                    self.bump();
                    return Ok(Token::DoubleCaret);
                }
                Ok(Token::Caret)
            }
            '!' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    return Ok(Token::NotEq);
                }
                Ok(Token::Bang)
            }
            '>' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    return Ok(Token::Ge);
                }
                Ok(Token::Gt)
            }
            '&' => {
                self.bump();
                if self.bump() == Some('&') {
                    return Ok(Token::AndAnd);
                }
                Err(self.error("Expected '&&'", start))
            }
            '|' => {
                self.bump();
                if self.peek() == Some('|') {
                    self.bump();
                    return Ok(Token::OrOr);
                }
                Ok(Token::Pipe)
            }
            c if c.is_alphabetic() || c == ':' => self.scan_word(),
            _ => Err(self.error(format!("Unexpected character '{}'", c), start)),
        }
    }

    fn single(&mut self, token: Token) -> Result<Token, QueryError> {
        self.bump();
        Ok(token)
    }

    fn scan_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
        self.input[start..self.pos].to_string()
    }

    fn scan_name(&mut self) -> String {
        self.scan_while(|c| c.is_alphanumeric() || c == '_')
    }

    /// An IRI reference runs to the next `>` with no whitespace or quote before it.
    /// Anything else starting with `<` is a comparison operator.
    fn scan_iri_ref(&mut self) -> Option<String> {
        let body = &self.rest()[1..];
        let end = body.find(|c: char| {
            c == '>' || c.is_whitespace() || matches!(c, '<' | '"' | '{' | '}' | '|' | '^' | '`')
        })?;
        if !body[end..].starts_with('>') {
            return None;
        }
        let iri = body[..end].to_string();
        self.pos += end + 2;
        Some(iri)
    }

    fn scan_string(&mut self, quote: char) -> Result<String, QueryError> {
        let start = self.pos;
        let triple: String = std::iter::repeat(quote).take(3).collect();
        let long = self.rest().starts_with(&triple);
        self.pos += if long { 3 } else { 1 };

        let mut value = String::new();
        loop {
            if long && self.rest().starts_with(&triple) {
                self.pos += 3;
                return Ok(value);
            }
            let Some(c) = self.bump() else {
                return Err(self.error("Unterminated string literal", start));
            };
            match c {
                c if c == quote && !long => return Ok(value),
                '\n' | '\r' if !long => {
                    return Err(self.error("Line break in string literal", start));
                }
                '\\' => value.push(self.scan_escape(start)?),
                c => value.push(c),
            }
        }
    }

    fn scan_escape(&mut self, start: usize) -> Result<char, QueryError> {
        let escaped = match self.bump() {
            Some('t') => '\t',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('b') => '\u{8}',
            Some('f') => '\u{c}',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('\\') => '\\',
            Some('u') => return self.scan_unicode(4, start),
            Some('U') => return self.scan_unicode(8, start),
            _ => return Err(self.error("Invalid escape sequence", start)),
        };
        Ok(escaped)
    }

    fn scan_unicode(&mut self, digits: usize, start: usize) -> Result<char, QueryError> {
        let hex = self.rest().get(..digits).unwrap_or_default();
        let code = u32::from_str_radix(hex, 16)
            .ok()
            .filter(|_| hex.len() == digits)
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("Invalid unicode escape", start))?;
        self.pos += digits;
        Ok(code)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.bump();
        }
        self.scan_while(|c| c.is_ascii_digit());

        let mut decimal = false;
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            decimal = true;
            self.bump();
            self.scan_while(|c| c.is_ascii_digit());
        }

        let has_exponent = matches!(self.peek(), Some('e' | 'E'))
            && (self.peek_nth(1).is_some_and(|c| c.is_ascii_digit())
                || (matches!(self.peek_nth(1), Some('+' | '-'))
                    && self.peek_nth(2).is_some_and(|c| c.is_ascii_digit())));
        if has_exponent {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            self.scan_while(|c| c.is_ascii_digit());
            return Token::Double(self.input[start..self.pos].to_string());
        }

        let text = self.input[start..self.pos].to_string();
        if decimal {
            Token::Decimal(text)
        } else {
            Token::Integer(text)
        }
    }

    /// A bare word or a prefixed name
    fn scan_word(&mut self) -> Result<Token, QueryError> {
        let prefix = self.scan_while(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.');
        // A trailing dot ends the statement, it is not part of the word
        let prefix = self.give_back_trailing_dots(prefix);

        if self.peek() != Some(':') {
            return Ok(Token::Ident(prefix));
        }
        self.bump();

        let local = self.scan_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '%'));
        let local = self.give_back_trailing_dots(local);
        Ok(Token::PrefixedName { prefix, local })
    }

    fn give_back_trailing_dots(&mut self, mut word: String) -> String {
        while word.ends_with('.') {
            word.pop();
            self.pos -= 1;
        }
        word
    }
}

/// Tokenize text in one call
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, QueryError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_basic_pattern() {
        assert_eq!(
            tokens("?s a schema:Event ."),
            vec![
                Token::Variable("s".into()),
                Token::Ident("a".into()),
                Token::PrefixedName { prefix: "schema".into(), local: "Event".into() },
                Token::Dot,
            ]
        );
    }

    #[test]
    fn test_delimiters_inside_strings() {
        assert_eq!(
            tokens(r#"?s ex:p "a. b; c } d" ."#)[2],
            Token::String("a. b; c } d".into())
        );
    }

    #[test]
    fn test_iri_versus_less_than() {
        assert_eq!(tokens("<http://ex.org/a#b>"), vec![Token::IriRef("http://ex.org/a#b".into())]);
        assert_eq!(
            tokens("?x < 5"),
            vec![Token::Variable("x".into()), Token::Lt, Token::Integer("5".into())]
        );
        assert_eq!(tokens("?x <= 5")[1], Token::Le);
    }

    #[test]
    fn test_unspaced_comparisons_inside_parens() {
        assert_eq!(
            tokens("(?n<40&&?n>18)"),
            vec![
                Token::LParen,
                Token::Variable("n".into()),
                Token::Lt,
                Token::Integer("40".into()),
                Token::AndAnd,
                Token::Variable("n".into()),
                Token::Gt,
                Token::Integer("18".into()),
                Token::RParen,
            ]
        );
        assert_eq!(tokens("(?a<=?b)")[2], Token::Le);
        // An IRI operand after an operator is still an IRI
        assert_eq!(tokens("(?p = <http://ex.org/p>)")[3], Token::IriRef("http://ex.org/p".into()));
        // Outside parentheses a value followed by an IRI is a triple pattern
        assert_eq!(tokens("?s <http://ex.org/p> ?o")[1], Token::IriRef("http://ex.org/p".into()));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("42"), vec![Token::Integer("42".into())]);
        assert_eq!(tokens("4.5"), vec![Token::Decimal("4.5".into())]);
        assert_eq!(tokens("1e3"), vec![Token::Double("1e3".into())]);
        assert_eq!(tokens("?x > -5")[2], Token::Integer("-5".into()));
        // Statement-ending dot after an integer
        assert_eq!(tokens("5 ."), vec![Token::Integer("5".into()), Token::Dot]);
        assert_eq!(tokens("5."), vec![Token::Integer("5".into()), Token::Dot]);
    }

    #[test]
    fn test_prefixed_name_trailing_dot() {
        assert_eq!(
            tokens("ex:name."),
            vec![Token::PrefixedName { prefix: "ex".into(), local: "name".into() }, Token::Dot]
        );
        assert_eq!(
            tokens(":local"),
            vec![Token::PrefixedName { prefix: "".into(), local: "local".into() }]
        );
    }

    #[test]
    fn test_string_escapes_and_tags() {
        assert_eq!(
            tokens(r#""say \"hi\"\n"@en"#),
            vec![Token::String("say \"hi\"\n".into()), Token::LangTag("en".into())]
        );
        assert_eq!(tokens(r#""é""#), vec![Token::String("é".into())]);
        assert_eq!(tokens(r#""""multi
line""""#), vec![Token::String("multi\nline".into())]);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(tokens("# comment\n?x # trailing"), vec![Token::Variable("x".into())]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize(r#"?s ?p "open"#).unwrap_err();
        assert!(matches!(err, QueryError::Syntax { .. }));
        assert_eq!(err.fragment(), Some("\"open"));
    }

    #[test]
    fn test_path_operators() {
        assert_eq!(tokens("ex:a/ex:b")[1], Token::Slash);
        assert_eq!(tokens("^ex:a")[0], Token::Caret);
        assert_eq!(tokens("ex:a ? ")[1], Token::Question);
        assert_eq!(tokens("\"1\"^^xsd:integer")[1], Token::DoubleCaret);
    }
}
