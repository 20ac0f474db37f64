use super::*;

fn count_logs(stmts: &[Stmt], message: &str) -> usize {
    stmts
        .iter()
        .map(|stmt| match stmt {
            Stmt::Log { message: m, .. } => usize::from(m == message),
            Stmt::Block { body, .. } => count_logs(body, message),
            Stmt::For { body, .. } | Stmt::While { body, .. } => {
                count_logs(std::slice::from_ref(body.as_ref()), message)
            }
            Stmt::If { then_s, else_s, .. } => {
                count_logs(std::slice::from_ref(then_s.as_ref()), message)
                    + else_s
                        .as_ref()
                        .map(|s| count_logs(std::slice::from_ref(s.as_ref()), message))
                        .unwrap_or(0)
            }
            _ => 0,
        })
        .sum()
}

/* ===== Declarations ===== */

#[test]
fn test_parse_scalar_declaration_with_several_names() {
    let program = parse("int a = 1, b;").expect("parse failed");

    assert_eq!(program.body.len(), 1);
    match &program.body[0] {
        Stmt::Declare {
            ty, declarators, ..
        } => {
            assert_eq!(*ty, DeclType::Int);
            assert_eq!(declarators.len(), 2);
            assert_eq!(declarators[0].name, "a");
            assert!(matches!(declarators[0].init, Some(Expr::LitInt { v: 1, .. })));
            assert_eq!(declarators[1].name, "b");
            assert!(declarators[1].init.is_none());
        }
        other => unreachable!("Expected Declare, got {:?}", other),
    }
}

#[test]
fn test_parse_container_declarations() {
    let program = parse(
        r#"
        vector<int> v = {1, 2};
        vector<vector<int>> m = {{1}, {2, 3}};
        vector< vector<int> > spaced;
    "#,
    )
    .expect("parse failed");

    let types: Vec<DeclType> = program
        .body
        .iter()
        .map(|stmt| match stmt {
            Stmt::Declare { ty, .. } => *ty,
            other => unreachable!("Expected Declare, got {:?}", other),
        })
        .collect();
    assert_eq!(types, vec![DeclType::Vector, DeclType::Matrix, DeclType::Matrix]);

    match &program.body[1] {
        Stmt::Declare { declarators, .. } => match &declarators[0].init {
            Some(Expr::LitList { elements, .. }) => {
                assert_eq!(elements.len(), 2);
                assert!(matches!(&elements[1], Expr::LitList { elements, .. } if elements.len() == 2));
            }
            other => unreachable!("Expected list initializer, got {:?}", other),
        },
        other => unreachable!("Expected Declare, got {:?}", other),
    }
}

#[test]
fn test_identifiers_may_start_with_keywords() {
    let program = parse("int interval = 1; int returned = 2; int iffy = 3; int format = 4;")
        .expect("parse failed");
    assert_eq!(program.body.len(), 4);

    let program = parse("interval = format;").expect("parse failed");
    assert!(matches!(&program.body[0], Stmt::Expr { expr: Expr::Assign { .. }, .. }));
}

/* ===== Methods ===== */

#[test]
fn test_method_renaming() {
    let program = parse("v.push_back(1); n = v.size(); v.clear();").expect("parse failed");

    let methods: Vec<Method> = program
        .body
        .iter()
        .map(|stmt| match stmt {
            Stmt::Expr {
                expr: Expr::MethodCall { method, .. },
                ..
            } => method.clone(),
            Stmt::Expr {
                expr: Expr::Assign { value, .. },
                ..
            } => match value.as_ref() {
                Expr::MethodCall { method, .. } => method.clone(),
                other => unreachable!("Expected MethodCall, got {:?}", other),
            },
            other => unreachable!("Expected method call statement, got {:?}", other),
        })
        .collect();

    assert_eq!(
        methods,
        vec![Method::Push, Method::Len, Method::Other("clear".to_string())]
    );
}

#[test]
fn test_member_access_and_free_calls_are_kept() {
    let program = parse("x = v.length; y = max(1, 2);").expect("parse failed");

    match &program.body[0] {
        Stmt::Expr {
            expr: Expr::Assign { value, .. },
            ..
        } => assert!(matches!(value.as_ref(), Expr::Member { property, .. } if property == "length")),
        other => unreachable!("Expected assignment, got {:?}", other),
    }
    match &program.body[1] {
        Stmt::Expr {
            expr: Expr::Assign { value, .. },
            ..
        } => assert!(matches!(value.as_ref(), Expr::Call { args, .. } if args.len() == 2)),
        other => unreachable!("Expected assignment, got {:?}", other),
    }
}

/* ===== Expressions ===== */

#[test]
fn test_precedence_and_associativity() {
    let program = parse("x = 1 + 2 * 3 - 4;").expect("parse failed");

    let Stmt::Expr {
        expr: Expr::Assign { value, .. },
        ..
    } = &program.body[0]
    else {
        unreachable!("Expected assignment");
    };

    // ((1 + (2 * 3)) - 4)
    match value.as_ref() {
        Expr::Binary {
            op: BinaryOp::Sub,
            left,
            ..
        } => match left.as_ref() {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                right.as_ref(),
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            )),
            other => unreachable!("Expected Add, got {:?}", other),
        },
        other => unreachable!("Expected Sub, got {:?}", other),
    }
}

#[test]
fn test_update_and_compound_operators() {
    let program = parse("i++; --j; k += 2; k %= 3;").expect("parse failed");

    let exprs: Vec<&Expr> = program
        .body
        .iter()
        .map(|stmt| match stmt {
            Stmt::Expr { expr, .. } => expr,
            other => unreachable!("Expected expression statement, got {:?}", other),
        })
        .collect();

    assert!(matches!(exprs[0], Expr::Update { op: UpdateOp::Inc, prefix: false, .. }));
    assert!(matches!(exprs[1], Expr::Update { op: UpdateOp::Dec, prefix: true, .. }));
    assert!(matches!(exprs[2], Expr::Assign { op: AssignOp::Add, .. }));
    assert!(matches!(exprs[3], Expr::Assign { op: AssignOp::Mod, .. }));
}

#[test]
fn test_comments_are_ignored() {
    let program = parse(
        r#"
        // leading comment
        int a = 1; /* inline */ int b = 2;
        /* multi
           line */
    "#,
    )
    .expect("parse failed");
    assert_eq!(program.body.len(), 2);
}

/* ===== Instrumentation ===== */

#[test]
fn test_for_loop_gets_start_and_iteration_markers() {
    let program = normalize("for (int i = 0; i < 3; i++) { v[i] = 0; }").expect("normalize failed");

    assert_eq!(program.body.len(), 2);
    assert!(matches!(&program.body[0], Stmt::Log { message, .. } if message == LOOP_STARTED));

    match &program.body[1] {
        Stmt::For { body, init, test, update, .. } => {
            assert!(init.is_some());
            assert!(test.is_some());
            assert!(update.is_some());
            match body.as_ref() {
                Stmt::Block { body, .. } => {
                    assert_eq!(body.len(), 2);
                    assert!(matches!(&body[0], Stmt::Log { message, .. } if message == LOOP_ITERATION));
                    assert!(matches!(&body[1], Stmt::Expr { .. }));
                }
                other => unreachable!("Expected Block body, got {:?}", other),
            }
        }
        other => unreachable!("Expected For, got {:?}", other),
    }
}

#[test]
fn test_nested_and_braceless_loops_are_instrumented() {
    let program = normalize(
        r#"
        for (int i = 0; i < 2; i++)
            for (int j = 0; j < 2; j++)
                m[i][j] = 1;
        if (ok) for (int k = 0; k < 1; k++) x++;
        while (w) { for (;;) break; }
    "#,
    )
    .expect("normalize failed");

    assert_eq!(count_logs(&program.body, LOOP_STARTED), 4);
    assert_eq!(count_logs(&program.body, LOOP_ITERATION), 4);

    // A loop in a single-statement position is wrapped with its marker
    let if_stmt = program
        .body
        .iter()
        .find(|stmt| matches!(stmt, Stmt::If { .. }))
        .expect("if statement missing");
    match if_stmt {
        Stmt::If { then_s, .. } => match then_s.as_ref() {
            Stmt::Block { body, .. } => {
                assert_eq!(body.len(), 2);
                assert!(matches!(&body[0], Stmt::Log { .. }));
                assert!(matches!(&body[1], Stmt::For { .. }));
            }
            other => unreachable!("Expected wrapped block, got {:?}", other),
        },
        other => unreachable!("Expected If, got {:?}", other),
    }
}

#[test]
fn test_while_loops_are_left_alone() {
    let program = normalize("while (i < 3) { i++; }").expect("normalize failed");
    assert_eq!(count_logs(&program.body, LOOP_STARTED), 0);
    assert_eq!(count_logs(&program.body, LOOP_ITERATION), 0);

    let parsed = parse("for (;;) {}").expect("parse failed");
    assert_eq!(count_logs(&parsed.body, LOOP_STARTED), 0);
}

/* ===== Errors ===== */

#[test]
fn test_syntax_error_location() {
    let err = parse("int a = 1;\nint b = ;").expect_err("should fail");
    assert!(matches!(err, ParseError::PestError(..)));

    let span = err.span().expect("missing span");
    assert_eq!(span.start_line, 1);
    assert!(err.to_string().starts_with("syntax error at line 2"));
}

#[test]
fn test_unsupported_syntax_is_rejected() {
    for source in ["int *p;", "string s = \"x\";", "int f() { return 1; }", "x = 1"] {
        assert!(parse(source).is_err(), "expected failure for {:?}", source);
    }
}

#[test]
fn test_number_literal_overflow_is_a_build_error() {
    let err = parse("int x = 99999999999999999999;").expect_err("should fail");
    assert!(matches!(err, ParseError::BuildError(..)));
    assert!(err.to_string().contains("99999999999999999999"));
}

#[test]
fn test_bracket_nesting_limit() {
    let source = format!("x = {}1{};", "(".repeat(40), ")".repeat(40));
    let err = parse(&source).expect_err("should fail");
    assert!(matches!(err, ParseError::BuildError(..)));
    assert_eq!(err.span().map(|span| span.start_col), Some(4 + 32));
    assert!(err.message().contains("brackets nested too deeply"));

    // Brackets inside comments do not count
    let source = format!("// {}\n/* {} */ x = ((1));", "(".repeat(100), "{".repeat(100));
    assert!(parse(&source).is_ok());
}

#[test]
fn test_operator_chain_limit() {
    let at_limit = format!("x = {};", vec!["1"; 60].join(" * "));
    assert!(parse(&at_limit).is_ok());

    let too_long = format!("x = {};", vec!["1"; 200].join(" * "));
    let err = parse(&too_long).expect_err("should fail");
    assert!(err.message().contains("expression nested too deeply"));
}

#[test]
fn test_instrumented_tree_respects_nesting_limit() {
    // Each braceless loop body gains a block for its marker
    let source = format!("{}x = 1;", "for (;;) ".repeat(31));
    assert!(parse(&source).is_ok());
    let err = normalize(&source).expect_err("should fail");
    assert!(err.message().contains("statement nested too deeply"));

    let source = format!("{}x = 1;", "for (;;) ".repeat(30));
    assert!(normalize(&source).is_ok());
}

#[test]
fn test_is_valid_identifier() {
    for name in ["arr", "_x1", "Matrix2", "interval"] {
        assert!(is_valid_identifier(name), "{} should be valid", name);
    }
    for name in ["int", "for", "vector", "1a", "a-b", "a b", ""] {
        assert!(!is_valid_identifier(name), "{:?} should be invalid", name);
    }
}

/* ===== Serialization ===== */

#[test]
fn test_program_round_trips_through_json() {
    let program = normalize(
        r#"
        vector<vector<int>> m = {{1, 2}};
        for (int i = 0; i < m[0].size(); i++) { m[0][i] *= -1; }
    "#,
    )
    .expect("normalize failed");

    let json = serde_json::to_string(&program).expect("serialize failed");
    let back: Program = serde_json::from_str(&json).expect("deserialize failed");
    let again = serde_json::to_string(&back).expect("serialize failed");
    assert_eq!(json, again);
}
