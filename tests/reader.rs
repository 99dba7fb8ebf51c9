use quill::{
    DiagnosticKind, SourceSpan,
    ast::SyntaxTree,
    lexer::{self, TokenKind},
    parser,
    value::{ListTag, Value, ValueKind},
};

fn kinds(source: &str) -> Vec<TokenKind> {
    lexer::tokenize(source)
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

fn program(source: &str) -> (Value, SyntaxTree) {
    parser::parse(lexer::tokenize(source)).expect("source should parse")
}

fn items(value: &Value) -> &[Value] {
    match value.0.as_ref() {
        ValueKind::List(list) => &list.items,
        _ => panic!("expected List, found {}", value.type_name()),
    }
}

fn parse_error(source: &str) -> DiagnosticKind {
    match parser::parse(lexer::tokenize(source)) {
        Ok((value, _)) => panic!("expected parse error, parsed {value}"),
        Err(diag) => diag.kind,
    }
}

#[test]
fn splits_parens_and_atoms() {
    use TokenKind::*;
    assert_eq!(
        kinds("(+ 1\t(foo))"),
        vec![OpenParen, Atom, Atom, OpenParen, Atom, CloseParen, CloseParen]
    );
    let tokens = lexer::tokenize("(+ 1\t(foo))");
    assert_eq!(tokens[4].lexeme, "foo");
    assert_eq!(tokens[4].span, SourceSpan::new(6, 9));
}

#[test]
fn only_space_tab_cr_lf_separate_atoms() {
    let tokens = lexer::tokenize(" a\r\nb\u{0C}c ");
    let lexemes: Vec<_> = tokens.iter().map(|token| token.lexeme.as_str()).collect();
    assert_eq!(lexemes, vec!["a", "b\u{0C}c"]);
}

#[test]
fn atoms_end_at_parentheses() {
    let tokens = lexer::tokenize("(set! x(quote y))");
    let lexemes: Vec<_> = tokens.iter().map(|token| token.lexeme.as_str()).collect();
    assert_eq!(lexemes, vec!["(", "set!", "x", "(", "quote", "y", ")", ")"]);
}

#[test]
fn empty_source_has_no_tokens() {
    assert!(lexer::tokenize(" \n\t ").is_empty());
}

#[test]
fn rejects_non_text_input() {
    let err = lexer::tokenize_bytes(&[b'(', 0xff, b')']).expect_err("invalid UTF-8");
    assert_eq!(err.kind, DiagnosticKind::Lex);
    assert_eq!(err.span, Some(SourceSpan::new(1, 2)));
    assert_eq!(lexer::tokenize_bytes(b"(a)").map(|t| t.len()).ok(), Some(3));
}

#[test]
fn classifies_integer_literals_and_symbols() {
    let (root, _) = program("(1 -2 007 - -x 3a foo)");
    let forms = items(&root);
    assert_eq!(forms.len(), 1);
    let atoms = items(&forms[0]);
    assert_eq!(atoms[0].as_int(), Some(1));
    assert_eq!(atoms[1].as_int(), Some(-2));
    assert_eq!(atoms[2].as_int(), Some(7));
    assert_eq!(atoms[3].as_symbol(), Some("-"));
    assert_eq!(atoms[4].as_symbol(), Some("-x"));
    assert_eq!(atoms[5].as_symbol(), Some("3a"));
    assert_eq!(atoms[6].as_symbol(), Some("foo"));
}

#[test]
fn wraps_top_level_forms_in_one_code_list() {
    let (root, _) = program("(define x 1) x (+ x 2)");
    let list = root.as_list().expect("root is a list");
    assert_eq!(list.tag, ListTag::Code);
    assert_eq!(list.items.len(), 3);
    assert_eq!(list.items[1].as_symbol(), Some("x"));
    assert_eq!(root.to_string(), "((define x 1) x (+ x 2))");
}

#[test]
fn records_syntactic_parents() {
    let (root, tree) = program("(define (f x) (g x))");
    let root_id = root.as_list().and_then(|list| list.origin).expect("root origin");
    let define = &items(&root)[0];
    let define_id = define.as_list().and_then(|list| list.origin).expect("define origin");
    let body_id = items(define)[2]
        .as_list()
        .and_then(|list| list.origin)
        .expect("body origin");

    assert_eq!(tree.parent(root_id), None);
    assert_eq!(tree.parent(define_id), Some(root_id));
    assert_eq!(tree.parent(body_id), Some(define_id));

    let node = tree.get(define_id).expect("define node");
    assert_eq!(node.head.as_deref(), Some("define"));
    assert_eq!(node.span, SourceSpan::new(0, 20));
    assert_eq!(tree.get(body_id).map(|node| node.span), Some(SourceSpan::new(14, 19)));
}

#[test]
fn traceback_walks_enclosing_forms() {
    let (root, tree) = program("(a (b (c)))");
    let c = &items(&items(&items(&root)[0])[1])[1];
    let c_id = c.as_list().and_then(|list| list.origin).expect("origin");
    assert_eq!(
        tree.traceback(c_id),
        vec![
            "within (c ...) at 6..9".to_string(),
            "within (b ...) at 3..10".to_string(),
            "within (a ...) at 0..11".to_string(),
        ]
    );
}

#[test]
fn node_ids_do_not_resolve_in_other_trees() {
    let (root, _) = program("(a)");
    let id = items(&root)[0].as_list().and_then(|list| list.origin).expect("origin");
    let mut other = SyntaxTree::with_id(1);
    parser::parse_program("(b)", &mut other).expect("parses");
    assert!(other.get(id).is_none());
    assert_eq!(other.parent(id), None);
}

#[test]
fn unterminated_list_is_a_parse_error() {
    assert_eq!(parse_error("(+ 1 (* 2 3)"), DiagnosticKind::Parse);
}

#[test]
fn stray_close_paren_is_a_parse_error() {
    assert_eq!(parse_error(")"), DiagnosticKind::Parse);
    assert_eq!(parse_error("(a))"), DiagnosticKind::Parse);
}

#[test]
fn out_of_range_integer_is_a_parse_error() {
    assert_eq!(parse_error("99999999999999999999"), DiagnosticKind::Parse);
}

#[test]
fn deeply_nested_lists_parse() {
    let depth = 1_000;
    let source = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
    let (root, tree) = program(&source);
    assert_eq!(items(&root).len(), 1);
    assert_eq!(tree.len(), depth + 1);
}
