#![allow(clippy::unwrap_used, reason = "tests feed fixed JSON fixtures")]

use pretty_assertions::assert_eq;

use super::*;

fn lower(json: &str) -> Result<(NodeArena, NodeId, StringInterner), LowerError> {
    let root: Node = serde_json::from_str(json).unwrap();
    let mut arena = NodeArena::new();
    let interner = StringInterner::new();
    let program = lower_program(&root, &mut arena, &interner)?;
    Ok((arena, program, interner))
}

fn body(arena: &NodeArena, program: NodeId) -> Vec<NodeKind> {
    let NodeKind::Program { body } = *arena.kind(program) else {
        panic!("not a program");
    };
    arena.list(body).iter().map(|id| *arena.kind(*id)).collect()
}

#[test]
fn lowers_constant_declaration() {
    let (arena, program, interner) = lower(
        r#"{"type":"Program","start":0,"end":12,"body":[
            {"type":"VariableDeclaration","kind":"const","start":0,"end":12,"declarations":[
                {"type":"VariableDeclarator","id":{"type":"Identifier","name":"x"},
                 "init":{"type":"Literal","value":1,"raw":"1","start":10,"end":11}}]}]}"#,
    )
    .unwrap();

    let stmts = body(&arena, program);
    let [NodeKind::VariableDeclaration { kind, name, init }] = stmts.as_slice() else {
        panic!("unexpected body {stmts:?}");
    };
    assert_eq!(*kind, DeclKind::Const);
    assert_eq!(interner.lookup(*name), "x");
    assert_eq!(*arena.kind(*init), NodeKind::Literal(Literal::Number(1.0)));
    assert_eq!(arena.span(*init), Span::new(10, 11));
}

#[test]
fn lowers_arrow_with_expression_body() {
    let (arena, program, _) = lower(
        r#"{"type":"Program","body":[{"type":"ExpressionStatement","expression":
            {"type":"ArrowFunctionExpression","expression":true,
             "params":[{"type":"Identifier","name":"x"}],
             "body":{"type":"BinaryExpression","operator":"*",
                     "left":{"type":"Identifier","name":"x"},
                     "right":{"type":"Identifier","name":"x"}}}}]}"#,
    )
    .unwrap();

    let stmts = body(&arena, program);
    let [NodeKind::ExpressionStatement { expr }] = stmts.as_slice() else {
        panic!("unexpected body {stmts:?}");
    };
    let NodeKind::Function { params, body, .. } = *arena.kind(*expr) else {
        panic!("expected a function");
    };
    assert_eq!(arena.params(params).len(), 1);
    let FunctionBody::Expr(product) = body else {
        panic!("expected an expression body");
    };
    assert!(matches!(
        arena.kind(product),
        NodeKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn null_literal_and_logical_operators() {
    let (arena, program, _) = lower(
        r#"{"type":"Program","body":[{"type":"ExpressionStatement","expression":
            {"type":"LogicalExpression","operator":"||",
             "left":{"type":"Literal","value":null},
             "right":{"type":"Literal","value":"s"}}}]}"#,
    )
    .unwrap();

    let stmts = body(&arena, program);
    let [NodeKind::ExpressionStatement { expr }] = stmts.as_slice() else {
        panic!("unexpected body {stmts:?}");
    };
    let NodeKind::Logical { op, left, .. } = *arena.kind(*expr) else {
        panic!("expected a logical expression");
    };
    assert_eq!(op, LogicalOp::Or);
    assert_eq!(*arena.kind(left), NodeKind::Literal(Literal::Null));
}

#[test]
fn unknown_node_types_are_rejected() {
    let err = lower(
        r#"{"type":"Program","body":[{"type":"WhileStatement","test":{"type":"Literal","value":true},"body":{"type":"BlockStatement","body":[]}}]}"#,
    )
    .unwrap_err();
    assert_eq!(err, LowerError::UnsupportedNode);
}

#[test]
fn compound_assignment_is_rejected() {
    let err = lower(
        r#"{"type":"Program","body":[{"type":"ExpressionStatement","expression":
            {"type":"AssignmentExpression","operator":"+=","start":3,"end":9,
             "left":{"type":"Identifier","name":"x"},
             "right":{"type":"Literal","value":1}}}]}"#,
    )
    .unwrap_err();
    assert_eq!(
        err,
        LowerError::UnsupportedOperator {
            operator: "+=".to_owned(),
            span: Span::new(3, 9),
        }
    );
}

#[test]
fn declarations_need_exactly_one_initialized_name() {
    let err = lower(
        r#"{"type":"Program","body":[{"type":"VariableDeclaration","kind":"let","declarations":[
            {"type":"VariableDeclarator","id":{"type":"Identifier","name":"x"}}]}]}"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        LowerError::MalformedDeclaration {
            reason: "missing initializer",
            ..
        }
    ));
}

#[test]
fn root_must_be_a_program() {
    let err = lower(r#"{"type":"Identifier","name":"x"}"#).unwrap_err();
    assert_eq!(err, LowerError::NotAProgram);
}

#[test]
fn deeply_nested_expressions_lower() {
    let depth = 100;
    let mut json = String::new();
    for _ in 0..depth {
        json.push_str(r#"{"type":"UnaryExpression","operator":"-","prefix":true,"argument":"#);
    }
    json.push_str(r#"{"type":"Literal","value":1}"#);
    for _ in 0..depth {
        json.push('}');
    }
    let program = format!(
        r#"{{"type":"Program","body":[{{"type":"ExpressionStatement","expression":{json}}}]}}"#
    );

    let root: Node = serde_json::from_str(&program).unwrap();
    let mut arena = NodeArena::new();
    let interner = StringInterner::new();
    lower_program(&root, &mut arena, &interner).unwrap();
    assert_eq!(arena.len(), depth + 3);
}
