use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceSpan};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    OpenParen,
    CloseParen,
    Atom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: SourceSpan,
}

/// Splits source text into parentheses and atoms.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

/// Like [`tokenize`], but accepts raw bytes and rejects anything that is not UTF-8 text.
pub fn tokenize_bytes(bytes: &[u8]) -> Result<Vec<Token>, Diagnostic> {
    decode(bytes).map(tokenize)
}

/// Checks that raw input is UTF-8 text.
pub fn decode(bytes: &[u8]) -> Result<&str, Diagnostic> {
    match std::str::from_utf8(bytes) {
        Ok(source) => Ok(source),
        Err(err) => {
            let start = err.valid_up_to();
            let end = start + err.error_len().unwrap_or(bytes.len() - start);
            Err(Diagnostic::new(
                DiagnosticKind::Lex,
                format!("input is not valid UTF-8 text at byte {start}"),
            )
            .with_span(SourceSpan::new(start, end)))
        }
    }
}

/// Separators are exactly space, tab, CR and LF; any other character may be part of an atom.
pub fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current: usize,
    peeked: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            current: 0,
            peeked: None,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.peeked.take().or_else(|| self.chars.next());
        if let Some((idx, ch)) = next {
            self.current = idx + ch.len_utf8();
        }
        next
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    fn collect_while<F>(&mut self, start: usize, mut predicate: F) -> &'a str
    where
        F: FnMut(char) -> bool,
    {
        while let Some((_, ch)) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.bump();
        }
        let source = self.source;
        &source[start..self.current]
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some((start, ch)) = self.bump() {
            let token = match ch {
                c if is_separator(c) => continue,
                '(' => self.simple_token(start, TokenKind::OpenParen),
                ')' => self.simple_token(start, TokenKind::CloseParen),
                _ => {
                    let lexeme = self.collect_while(start, |c| {
                        !is_separator(c) && c != '(' && c != ')'
                    });
                    Token {
                        kind: TokenKind::Atom,
                        lexeme: lexeme.to_string(),
                        span: SourceSpan::new(start, self.current),
                    }
                }
            };
            tokens.push(token);
        }
        tokens
    }

    fn simple_token(&self, start: usize, kind: TokenKind) -> Token {
        Token {
            kind,
            lexeme: self.source[start..self.current].to_string(),
            span: SourceSpan::new(start, self.current),
        }
    }
}
