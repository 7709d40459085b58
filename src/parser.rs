use crate::{
    ast::{self, Node},
    common::{Error, ErrorKind, Errors},
    lexer::Lexer,
    token::{Token, TokenKind},
};

const STATEMENT_END: &[TokenKind] = &[TokenKind::Semicolon];
const GROUP_END: &[TokenKind] = &[TokenKind::RightParen];
const ARGUMENT_END: &[TokenKind] = &[TokenKind::RightParen, TokenKind::Comma];

/// Recursive descent over a lazily lexed token stream with one token of
/// lookahead.
///
/// Every `parse_*` method starts on the first token of its construct and
/// leaves `self.token` on the last token it consumed (the terminator for
/// expressions, the closing brace for blocks). Expressions are folded left to
/// right in the order tokens arrive; there is no precedence table, so
/// parentheses are the only way to regroup.
#[derive(Debug)]
struct Parser {
    lexer: Lexer,
    token: Token,
    errors: Errors,
}

impl Parser {
    fn new(source: &str) -> Self {
        Parser {
            lexer: Lexer::new(source),
            token: Token::new(TokenKind::Eof, 1, ""),
            errors: Errors::new(),
        }
    }

    fn next_token(&mut self) -> TokenKind {
        self.token = self.lexer.next_token();
        self.token.kind
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.lexer.peek_token().kind
    }

    fn is(&self, kind: TokenKind) -> bool {
        self.token.kind == kind
    }

    fn at_terminator(&self, terminators: &[TokenKind]) -> bool {
        terminators.contains(&self.token.kind)
    }

    fn error(&mut self, kind: ErrorKind) {
        let error = self.token.error_at(kind);
        self.errors.add(error);
    }

    /// Skips ahead to the end of the current expression so the caller can go
    /// on with the next one. Parentheses opened while skipping are matched and
    /// a closing brace is left for the enclosing block.
    fn synchronize(&mut self, terminators: &[TokenKind]) {
        let mut depth = 0usize;
        loop {
            match self.token.kind {
                TokenKind::Eof => return,
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen if depth > 0 => depth -= 1,
                kind if depth == 0 && terminators.contains(&kind) => return,
                _ => {}
            }
            if self.peek_kind() == TokenKind::RightBrace {
                return;
            }
            self.next_token();
        }
    }

    /// Skips the remains of a statement that failed to parse, including any
    /// block it opened.
    fn synchronize_statement(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.token.kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => return,
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
            if depth == 0 && self.peek_kind() == TokenKind::RightBrace {
                return;
            }
            self.next_token();
        }
    }

    fn parse_statement_or_recover(&mut self) -> Option<Node> {
        let reported = self.errors.len();
        let node = self.parse_statement();
        if node.is_none() && self.errors.len() > reported {
            self.synchronize_statement();
        }
        node
    }

    fn parse_statement(&mut self) -> Option<Node> {
        match self.token.kind {
            TokenKind::Var => self.parse_variable(),
            TokenKind::LeftBrace => self.parse_block().map(Node::from),
            TokenKind::If => self.parse_conditional(),
            TokenKind::Loop => self.parse_loop(),
            TokenKind::Fun => self.parse_function(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => self.parse_break(),
            _ => self.parse_expression(None, STATEMENT_END),
        }
    }

    fn parse_identifier(&self) -> ast::Identifier {
        ast::Identifier {
            token: self.token.clone(),
            name: self.token.literal.clone(),
        }
    }

    fn parse_variable(&mut self) -> Option<Node> {
        let token = self.token.clone();

        if self.next_token() != TokenKind::Ident {
            self.error(ErrorKind::ExpectedIdent(self.token.literal.clone()));
            self.synchronize(STATEMENT_END);
            return None;
        }
        let variable = ast::Variable {
            token,
            name: self.parse_identifier(),
        };

        self.next_token();
        self.parse_expression(Some(variable.into()), STATEMENT_END)
    }

    fn parse_block(&mut self) -> Option<ast::Block> {
        let mut block = ast::Block {
            token: self.token.clone(),
            nodes: Vec::new(),
        };

        self.next_token(); // skip the opening {
        while !self.is(TokenKind::RightBrace) && !self.is(TokenKind::Eof) {
            if let Some(node) = self.parse_statement_or_recover() {
                block.nodes.push(node);
            }
            self.next_token();
        }

        if self.is(TokenKind::Eof) {
            self.error(ErrorKind::UnexpectedEof(TokenKind::RightBrace.to_string()));
            return None;
        }

        Some(block)
    }

    /// Expects the next token to open a block and parses it.
    fn expect_block(&mut self) -> Option<ast::Block> {
        if self.next_token() != TokenKind::LeftBrace {
            self.error(ErrorKind::ExpectedBrace(self.token.literal.clone()));
            return None;
        }
        self.parse_block()
    }

    fn parse_conditional(&mut self) -> Option<Node> {
        let token = self.token.clone();

        if self.next_token() != TokenKind::LeftParen {
            self.error(ErrorKind::ExpectedParen(self.token.literal.clone()));
            return None;
        }
        let condition = self.parse_group()?;
        let then_block = self.expect_block()?;

        let else_block = if self.peek_kind() == TokenKind::Else {
            self.next_token(); // skip else
            Some(self.expect_block()?)
        } else {
            None
        };

        Some(
            ast::Conditional {
                token,
                condition: Box::new(condition),
                then_block,
                else_block,
            }
            .into(),
        )
    }

    fn parse_loop(&mut self) -> Option<Node> {
        let token = self.token.clone();
        let mut init = None;
        let mut condition = Node::from(ast::BooleanLit::literal_true(token.line));
        let mut iter = None;

        if self.peek_kind() == TokenKind::LeftParen {
            self.next_token(); // skip loop
            self.next_token(); // skip (

            let init_node = self.parse_statement();
            if !matches!(init_node, Some(Node::Assign(_))) {
                self.error(ErrorKind::ExpectedLoopInit);
                self.synchronize(GROUP_END);
                return None;
            }
            init = init_node.map(Box::new);

            self.next_token(); // skip ;
            let condition_node = self.parse_expression(None, STATEMENT_END);
            match condition_node {
                Some(node @ Node::Infix(_)) => condition = node,
                _ => {
                    self.error(ErrorKind::ExpectedLoopCondition);
                    self.synchronize(GROUP_END);
                    return None;
                }
            }

            self.next_token(); // skip ;
            if !self.is(TokenKind::RightParen) {
                iter = Some(Box::new(self.parse_expression(None, GROUP_END)?));
            }
        }

        let body = self.expect_block()?;

        Some(
            ast::Loop {
                token,
                init,
                condition: Box::new(condition),
                iter,
                body,
            }
            .into(),
        )
    }

    fn parse_function(&mut self) -> Option<Node> {
        let token = self.token.clone();

        if self.next_token() != TokenKind::Ident {
            self.error(ErrorKind::ExpectedIdent(self.token.literal.clone()));
            return None;
        }
        let name = self.parse_identifier();

        if self.next_token() != TokenKind::LeftParen {
            self.error(ErrorKind::ExpectedParen(self.token.literal.clone()));
            return None;
        }
        let params = self.parse_parameters()?;
        let body = self.expect_block()?;

        log::trace!("parsed function {} with {} parameters", name, params.len());
        Some(
            ast::Function {
                token,
                name,
                params,
                body,
            }
            .into(),
        )
    }

    fn parse_parameters(&mut self) -> Option<Vec<ast::Identifier>> {
        let mut params = Vec::new();

        if self.peek_kind() == TokenKind::RightParen {
            self.next_token();
            return Some(params);
        }

        loop {
            match self.next_token() {
                TokenKind::Ident => params.push(self.parse_identifier()),
                TokenKind::Eof => {
                    self.error(ErrorKind::UnexpectedEof(TokenKind::RightParen.to_string()));
                    return None;
                }
                _ => {
                    self.error(ErrorKind::ExpectedIdent(self.token.literal.clone()));
                    return None;
                }
            }

            match self.next_token() {
                TokenKind::Comma => continue,
                TokenKind::RightParen => break,
                TokenKind::Eof => {
                    self.error(ErrorKind::UnexpectedEof(TokenKind::RightParen.to_string()));
                    return None;
                }
                _ => {
                    self.error(ErrorKind::UnexpectedToken(self.token.literal.clone()));
                    return None;
                }
            }
        }

        Some(params)
    }

    fn parse_return(&mut self) -> Option<Node> {
        let token = self.token.clone();

        self.next_token();
        let value = self.parse_required_expression(STATEMENT_END)?;

        Some(
            ast::Return {
                token,
                value: Box::new(value),
            }
            .into(),
        )
    }

    fn parse_break(&mut self) -> Option<Node> {
        let token = self.token.clone();

        let next = self.lexer.peek_token();
        if next.kind != TokenKind::Semicolon {
            self.errors.add(Error::new(
                next.line,
                ErrorKind::ExpectedTerminator {
                    expected: TokenKind::Semicolon.to_string(),
                    found: next.literal,
                },
            ));
            return None;
        }
        self.next_token();

        Some(ast::Break { token }.into())
    }

    /// Folds tokens into `expr` until one of `terminators` is the current
    /// token. Returns `None` for an empty expression or after reporting an
    /// error.
    fn parse_expression(&mut self, mut expr: Option<Node>, terminators: &[TokenKind]) -> Option<Node> {
        while !self.at_terminator(terminators) {
            if self.is(TokenKind::Eof) {
                self.error(ErrorKind::UnexpectedEof(terminators[0].to_string()));
                return None;
            }

            if self.is(TokenKind::Equal) {
                return self.parse_assign(expr, terminators);
            }

            match self.parse_token(expr) {
                Some(folded) => expr = Some(folded),
                None => {
                    self.synchronize(terminators);
                    return None;
                }
            }

            // a closing brace can never continue an expression; leave it to the block
            let next = self.lexer.peek_token();
            if next.kind == TokenKind::RightBrace {
                self.errors.add(Error::new(
                    next.line,
                    ErrorKind::ExpectedTerminator {
                        expected: terminators[0].to_string(),
                        found: next.literal,
                    },
                ));
                return None;
            }
            self.next_token();
        }

        expr
    }

    fn parse_required_expression(&mut self, terminators: &[TokenKind]) -> Option<Node> {
        if self.at_terminator(terminators) {
            self.error(ErrorKind::ExpectedExpression(self.token.literal.clone()));
            return None;
        }
        self.parse_expression(None, terminators)
    }

    fn parse_assign(&mut self, left: Option<Node>, terminators: &[TokenKind]) -> Option<Node> {
        let token = self.token.clone();

        let left = match left {
            Some(left @ (Node::Identifier(_) | Node::Variable(_))) => left,
            _ => {
                self.error(ErrorKind::IllegalOperation);
                self.synchronize(terminators);
                return None;
            }
        };

        self.next_token(); // skip =
        let right = self.parse_required_expression(terminators)?;

        Some(
            ast::Assign {
                token,
                left: Box::new(left),
                right: Box::new(right),
            }
            .into(),
        )
    }

    /// Folds the current token into the expression accumulated so far.
    fn parse_token(&mut self, expr: Option<Node>) -> Option<Node> {
        match expr {
            Some(left) if self.token.kind.is_infix_op() => self.parse_infix(left),
            Some(_) if self.token.kind.starts_operand() => {
                self.error(ErrorKind::ExpectedOperator(self.token.literal.clone()));
                None
            }
            _ => self.parse_operand(),
        }
    }

    /// Parses a single operand: a literal, an identifier or call, a group, or
    /// a prefix expression applied to another operand.
    fn parse_operand(&mut self) -> Option<Node> {
        let token = self.token.clone();

        match token.kind {
            TokenKind::Ident => {
                let ident = self.parse_identifier();
                if self.peek_kind() == TokenKind::LeftParen {
                    self.next_token();
                    self.parse_call(ident)
                } else {
                    Some(ident.into())
                }
            }
            TokenKind::Integer => match token.literal.parse::<i64>() {
                Ok(value) => Some(ast::IntegerLit { token, value }.into()),
                Err(_) => {
                    self.error(ErrorKind::InvalidNumber(token.literal));
                    None
                }
            },
            TokenKind::String => {
                let value = token.literal.clone();
                Some(ast::StringLit { token, value }.into())
            }
            TokenKind::True | TokenKind::False => {
                let value = token.kind == TokenKind::True;
                Some(ast::BooleanLit { token, value }.into())
            }
            TokenKind::LeftParen => self.parse_group(),
            kind if kind.is_prefix_op() => self.parse_prefix(),
            kind if kind.is_infix_op() => {
                self.error(ErrorKind::ExpectedExpression(token.literal));
                None
            }
            TokenKind::Eof => {
                self.error(ErrorKind::EofInExpression);
                None
            }
            TokenKind::Illegal => {
                self.error(ErrorKind::IllegalCharacter(token.literal));
                None
            }
            TokenKind::UnterminatedString => {
                self.error(ErrorKind::UnterminatedString);
                None
            }
            _ => {
                self.error(ErrorKind::UnexpectedToken(token.literal));
                None
            }
        }
    }

    fn parse_prefix(&mut self) -> Option<Node> {
        let token = self.token.clone();

        self.next_token();
        let right = self.parse_operand()?;

        Some(
            ast::Prefix {
                token,
                right: Box::new(right),
            }
            .into(),
        )
    }

    fn parse_infix(&mut self, left: Node) -> Option<Node> {
        let token = self.token.clone();

        self.next_token();
        let right = self.parse_operand()?;

        Some(
            ast::Infix {
                token,
                left: Box::new(left),
                right: Box::new(right),
            }
            .into(),
        )
    }

    /// Parses `( expr )` starting on the opening parenthesis. The group itself
    /// leaves no node behind; its content is returned directly.
    fn parse_group(&mut self) -> Option<Node> {
        self.next_token(); // skip (
        self.parse_required_expression(GROUP_END)
    }

    fn parse_call(&mut self, callee: ast::Identifier) -> Option<Node> {
        let token = self.token.clone();
        let mut args = Vec::new();

        if self.peek_kind() == TokenKind::RightParen {
            self.next_token();
        } else {
            loop {
                self.next_token(); // skip ( or ,
                args.push(self.parse_required_expression(ARGUMENT_END)?);
                if self.is(TokenKind::RightParen) {
                    break;
                }
            }
        }

        Some(
            ast::FuncCall {
                token,
                callee: Box::new(callee.into()),
                args,
            }
            .into(),
        )
    }
}

/// Parses `source` into a package, collecting every syntax error on the way.
pub fn parse_package(source: &str, namespace: &str) -> (ast::Package, Errors) {
    let mut parser = Parser::new(source);
    let mut nodes = Vec::new();

    while parser.next_token() != TokenKind::Eof {
        if let Some(node) = parser.parse_statement_or_recover() {
            nodes.push(node);
        }
    }

    log::debug!(
        "parsed package {} into {} nodes with {} errors",
        namespace,
        nodes.len(),
        parser.errors.len()
    );

    (
        ast::Package {
            namespace: namespace.to_string(),
            nodes,
        },
        parser.errors,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Vec<String> {
        let (package, errors) = parse_package(source, "test");
        assert!(errors.is_empty(), "unexpected errors:\n{}", errors);
        package.nodes.iter().map(|node| node.to_string()).collect()
    }

    fn parse_errors(source: &str) -> Vec<ErrorKind> {
        let (_, errors) = parse_package(source, "test");
        errors.iter().map(|error| error.kind.clone()).collect()
    }

    #[test]
    fn prints_canonical_forms() {
        let source = r#"
1;
var z;
var a = 2;
var b = +3;
var c = +4 + -5;
var d = -a + b + +c;
var e = e + ( ( a + ( b + -c) ) + ( d ) );
var f = 8 + a + b / 7 * c;
"hello";
var g = "hello world";
true;
var h = !false;
var i = a + (-b / 7);
{ "hello"; }
if (!true) { "hello"; }
if (!a) { "hello"; } else { "world"; }
fun j(a, b) { "hello"; }
b = a;
loop { "hello"; }
a == b;
j(5, 1 + -1);
5 + -j(a, b, c);
return j();
break;
{ 5 + (a * 2); }
"#;

        let expected = vec![
            "1",
            "var z",
            "var a = 2",
            "var b = (+3)",
            "var c = ((+4) + (-5))",
            "var d = (((-a) + b) + (+c))",
            "var e = (e + ((a + (b + (-c))) + d))",
            "var f = ((((8 + a) + b) / 7) * c)",
            "\"hello\"",
            "var g = \"hello world\"",
            "true",
            "var h = (!false)",
            "var i = (a + ((-b) / 7))",
            "{\n\t\"hello\";\n}",
            "if ((!true)) {\n\t\"hello\";\n}",
            "if ((!a)) {\n\t\"hello\";\n} else {\n\t\"world\";\n}",
            "fun j(a, b) {\n\t\"hello\";\n}",
            "b = a",
            "loop {\n\t\"hello\";\n}",
            "(a == b)",
            "j(5, (1 + (-1)))",
            "(5 + (-j(a, b, c)))",
            "return j()",
            "break",
            "{\n\t(5 + (a * 2));\n}",
        ];

        assert_eq!(parse_ok(source), expected);
    }

    #[test]
    fn reprinted_forms_parse_back_unchanged() {
        let printed = parse_ok(
            r#"
var d = -a + b + +c;
var f = 8 + a + b / 7 * c;
if (a < b) { var x = a; } else { { x; }; }
loop (var i = 0; i < 10; i = i + 1) { print(i, (i * 2)); }
loop (i = 0; i != 3; ) { break; }
fun k() { return a(b(1), -c); }
"#,
        );

        for line in printed {
            let source = format!("{};", line);
            assert_eq!(parse_ok(&source), vec![line.clone()], "reparsing {}", line);
        }
    }

    #[test]
    fn folds_strictly_left_to_right() {
        assert_eq!(
            parse_ok("8 + a + b / 7 * c;"),
            vec!["((((8 + a) + b) / 7) * c)"]
        );
        assert_eq!(parse_ok("1 < 2 == true;"), vec!["((1 < 2) == true)"]);
    }

    #[test]
    fn parses_c_style_loops() {
        assert_eq!(
            parse_ok("loop (var i = 0; i < 3; i = i + 1) { i; }"),
            vec!["loop (var i = 0; (i < 3); i = (i + 1)) {\n\ti;\n}"]
        );
        assert_eq!(
            parse_ok("loop (i = 0; i < 3; ) { break; }"),
            vec!["loop (i = 0; (i < 3); ) {\n\tbreak;\n}"]
        );
    }

    #[test]
    fn call_arguments_may_be_assignments_and_nested_calls() {
        assert_eq!(
            parse_ok("f(a = 1, g(h(2)), (3));"),
            vec!["f(a = 1, g(h(2)), 3)"]
        );
    }

    #[test]
    fn nested_blocks_indent_every_line() {
        assert_eq!(
            parse_ok("{ { 1; } }"),
            vec!["{\n\t{\n\t\t1;\n\t};\n}"]
        );
    }

    #[test]
    fn assignment_to_non_identifier_is_illegal() {
        assert_eq!(parse_errors("1 = 2;"), vec![ErrorKind::IllegalOperation]);
        assert_eq!(
            parse_errors("(a + b) = 2;"),
            vec![ErrorKind::IllegalOperation]
        );
    }

    #[test]
    fn keeps_parsing_after_a_bad_statement() {
        let (package, errors) = parse_package("var = 1;\n1 +;\n2 * 3;\nvar ok = 4;", "test");

        assert_eq!(
            errors.kinds(),
            vec![
                &ErrorKind::ExpectedIdent("=".into()),
                &ErrorKind::UnexpectedToken(";".into()),
            ]
        );
        assert_eq!(errors.iter().map(|e| e.line).collect::<Vec<_>>(), vec![1, 2]);

        let printed: Vec<String> = package.nodes.iter().map(|n| n.to_string()).collect();
        assert_eq!(printed, vec!["(2 * 3)", "var ok = 4"]);
    }

    #[test]
    fn reports_missing_terminators() {
        assert_eq!(
            parse_errors("1 + 2"),
            vec![ErrorKind::UnexpectedEof(";".into())]
        );
        assert_eq!(
            parse_errors("{ 1;"),
            vec![ErrorKind::UnexpectedEof("}".into())]
        );
        assert_eq!(
            parse_errors("(1 + 2"),
            vec![ErrorKind::UnexpectedEof(")".into())]
        );
    }

    #[test]
    fn reports_structural_expectations() {
        assert_eq!(
            parse_errors("if 1 { 2; }"),
            vec![ErrorKind::ExpectedParen("1".into())]
        );
        assert_eq!(
            parse_errors("fun (a) { }"),
            vec![ErrorKind::ExpectedIdent("(".into())]
        );
        assert_eq!(
            parse_errors("fun f(a) a;"),
            vec![ErrorKind::ExpectedBrace("a".into())]
        );
        assert_eq!(
            parse_errors("loop (1; i < 2; i) { }"),
            vec![ErrorKind::ExpectedLoopInit]
        );
        assert_eq!(
            parse_errors("loop (i = 0; true; i) { }"),
            vec![ErrorKind::ExpectedLoopCondition]
        );
    }

    #[test]
    fn reports_lexical_problems() {
        assert_eq!(
            parse_errors("1 + @;"),
            vec![ErrorKind::IllegalCharacter("@".into())]
        );
        assert_eq!(
            parse_errors("\"abc;"),
            vec![ErrorKind::UnterminatedString]
        );
        assert_eq!(
            parse_errors("99999999999999999999;"),
            vec![ErrorKind::InvalidNumber("99999999999999999999".into())]
        );
    }

    #[test]
    fn operand_after_complete_expression_is_an_error() {
        assert_eq!(
            parse_errors("a b;"),
            vec![ErrorKind::ExpectedOperator("b".into())]
        );
        assert_eq!(
            parse_errors("1 !2;"),
            vec![ErrorKind::ExpectedOperator("!".into())]
        );
    }

    #[test]
    fn missing_semicolon_before_closing_brace() {
        let (package, errors) = parse_package("{ 1; 2 }\n3;", "test");
        assert_eq!(
            errors.kinds(),
            vec![&ErrorKind::ExpectedTerminator {
                expected: ";".into(),
                found: "}".into()
            }]
        );
        let printed: Vec<String> = package.nodes.iter().map(|n| n.to_string()).collect();
        assert_eq!(printed, vec!["{\n\t1;\n}", "3"]);
    }

    #[test]
    fn break_requires_a_semicolon() {
        assert_eq!(
            parse_errors("loop { break }"),
            vec![ErrorKind::ExpectedTerminator {
                expected: ";".into(),
                found: "}".into()
            }]
        );
    }

    #[test]
    fn empty_statements_are_skipped_silently() {
        let (package, errors) = parse_package(";;1;", "test");
        assert!(errors.is_empty());
        assert_eq!(package.nodes.len(), 1);
    }

    #[test]
    fn package_prints_numbered_lines() {
        let (package, _) = parse_package("var a = 1; { a; }", "main");
        assert_eq!(package.to_string(), "0\tvar a = 1;\n1\t{\n2\t\ta;\n3\t}\n");
    }
}
