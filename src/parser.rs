use crate::{
    ast::{NodeId, SyntaxTree},
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
    lexer::{self, Token, TokenKind},
    stack::ensure_sufficient_stack,
    value::Value,
};

/// Reads `source` into a single code list wrapping every top-level form.
pub fn parse_program(source: &str, tree: &mut SyntaxTree) -> Result<Value, Diagnostic> {
    let tokens = lexer::tokenize(source);
    Parser::new(tokens, tree).parse_root(source.len())
}

/// Builds the program list from an already tokenized source, with a fresh syntax tree.
pub fn parse(tokens: Vec<Token>) -> Result<(Value, SyntaxTree), Diagnostic> {
    let mut tree = SyntaxTree::new();
    let end = tokens.last().map(|token| token.span.end).unwrap_or(0);
    let root = Parser::new(tokens, &mut tree).parse_root(end)?;
    Ok((root, tree))
}

/// Parses an atom: optional `-` followed by digits is an integer, anything else a symbol.
pub fn parse_atom(lexeme: &str, span: SourceSpan) -> Result<Value, Diagnostic> {
    if is_integer_literal(lexeme) {
        lexeme.parse::<i64>().map(Value::int).map_err(|_| {
            Diagnostic::new(
                DiagnosticKind::Parse,
                format!("integer literal `{lexeme}` is out of range"),
            )
            .with_span(span)
        })
    } else {
        Ok(Value::symbol(lexeme))
    }
}

fn is_integer_literal(lexeme: &str) -> bool {
    let digits = lexeme.strip_prefix('-').unwrap_or(lexeme);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

struct Parser<'t> {
    tokens: Vec<Token>,
    current: usize,
    tree: &'t mut SyntaxTree,
}

impl<'t> Parser<'t> {
    fn new(tokens: Vec<Token>, tree: &'t mut SyntaxTree) -> Self {
        Self {
            tokens,
            current: 0,
            tree,
        }
    }

    fn parse_root(&mut self, end: usize) -> Result<Value, Diagnostic> {
        let start = self.tokens.first().map(|token| token.span.start).unwrap_or(0);
        let root = self.tree.push(SourceSpan::new(start, end), None)?;
        let mut items = Vec::new();
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::CloseParen {
                return Err(self.error(token, "unexpected `)` with no matching `(`"));
            }
            items.push(self.parse_form(root)?);
        }
        self.tree.close(root, end, None);
        Ok(Value::code(items, root))
    }

    fn parse_form(&mut self, parent: NodeId) -> Result<Value, Diagnostic> {
        let token = self.advance();
        match token.kind {
            TokenKind::OpenParen => ensure_sufficient_stack(|| self.parse_list(token.span, parent)),
            TokenKind::CloseParen => Err(self.error(&token, "unexpected `)` with no matching `(`")),
            TokenKind::Atom => parse_atom(&token.lexeme, token.span),
        }
    }

    fn parse_list(&mut self, open: SourceSpan, parent: NodeId) -> Result<Value, Diagnostic> {
        let node = self.tree.push(open, Some(parent))?;
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(Diagnostic::new(
                        DiagnosticKind::Parse,
                        "unterminated list: input ended before matching `)`",
                    )
                    .with_span(open));
                }
                Some(token) if token.kind == TokenKind::CloseParen => {
                    let close = self.advance();
                    let head = items
                        .first()
                        .and_then(|item: &Value| item.as_symbol())
                        .map(str::to_string);
                    self.tree.close(node, close.span.end, head);
                    return Ok(Value::code(items, node));
                }
                Some(_) => items.push(self.parse_form(node)?),
            }
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        self.current += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn error(&self, token: &Token, message: &str) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Parse, message).with_span(token.span)
    }
}
