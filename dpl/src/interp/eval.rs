//! Tree-walking evaluator

use super::builtins::{self, OutputRef};
use super::env::{child_scope, Namespace, NamespaceRef};
use super::error::{InterpResult, RuntimeError};
use super::ops::{self, INDEXABLE_KINDS, SCALAR_KINDS};
use super::value::{Kind, Value};
use crate::ast::{Branch, Node};
use indexmap::IndexMap;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Maximum nesting of user function calls
pub const MAX_CALL_DEPTH: usize = 10_000;

/// Stack growth parameters for deep recursion
pub(crate) const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
pub(crate) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds one level of call depth until dropped
struct CallDepthGuard;

impl CallDepthGuard {
    fn enter() -> InterpResult<Self> {
        CALL_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= MAX_CALL_DEPTH {
                return Err(RuntimeError::CallDepthExceeded(MAX_CALL_DEPTH));
            }
            depth.set(current + 1);
            Ok(CallDepthGuard)
        })
    }
}

impl Drop for CallDepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Build a root namespace holding the built-ins (writing to stdout) and `bindings`.
/// Host bindings override built-ins of the same name.
pub fn root_namespace(bindings: HashMap<String, Value>) -> NamespaceRef {
    root_namespace_with_output(bindings, builtins::stdout())
}

/// Like [`root_namespace`], with `print`/`println` writing to `out`
pub fn root_namespace_with_output(
    bindings: HashMap<String, Value>,
    out: OutputRef,
) -> NamespaceRef {
    let mut table = builtins::builtins(out);
    table.extend(bindings);
    Namespace::with_bindings(table).into_ref()
}

/// Execute `root` in a fresh root namespace
pub fn exec(root: &Node, bindings: HashMap<String, Value>) -> InterpResult<Value> {
    debug!(bindings = bindings.len(), "exec");
    exec_in(root, &root_namespace(bindings))
}

/// Execute `root` against a caller-owned namespace
pub fn exec_in(root: &Node, namespace: &NamespaceRef) -> InterpResult<Value> {
    match root.exec(namespace) {
        Err(RuntimeError::Return(_)) => Err(RuntimeError::ReturnOutsideFunction),
        other => other,
    }
}

impl Node {
    /// Evaluate this node in `namespace` with automatic stack growth
    pub fn exec(&self, namespace: &NamespaceRef) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.exec_inner(namespace))
    }

    fn exec_inner(&self, ns: &NamespaceRef) -> InterpResult<Value> {
        match self {
            Node::Int(n) => Ok(Value::Int(*n)),
            Node::Real(x) => Ok(Value::Real(*x)),
            Node::Text(s) => Ok(Value::Text(s.clone())),
            Node::Bool(b) => Ok(Value::Bool(*b)),
            Node::Null => Ok(Value::Null),

            Node::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| item.exec(ns))
                    .collect::<InterpResult<Vec<_>>>()?;
                Ok(Value::array(values))
            }

            Node::Object(pairs) => {
                let mut entries = IndexMap::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = key.exec(ns)?.to_text();
                    let value = value.exec(ns)?;
                    entries.insert(key, value);
                }
                Ok(Value::object(entries))
            }

            Node::Ident(name) => ns.borrow().get(name),

            Node::Binary { op, left, right } => {
                let left = left.exec(ns)?;
                let right = right.exec(ns)?;
                ops::binary(*op, &left, &right)
            }

            Node::Unary { op, operand } => ops::unary(*op, &operand.exec(ns)?),

            Node::Index { target, index } => {
                let target = target.exec(ns)?;
                ops::gate("[<index>]", INDEXABLE_KINDS, &target)?;
                let index = index.exec(ns)?;
                if target.kind() != Kind::Object && !SCALAR_KINDS.contains(&index.kind()) {
                    return Err(RuntimeError::InvalidIndex(index.kind()));
                }
                target.el_by_index(&index)
            }

            Node::Create { target, value } => {
                let name = target.as_ident().ok_or(RuntimeError::IdentifierExpected)?;
                let value = value.exec(ns)?;
                ns.borrow_mut().create(name, value.clone())?;
                Ok(value)
            }

            Node::Set { target, value } => {
                let value = value.exec(ns)?;
                assign(target, value.clone(), ns)?;
                Ok(value)
            }

            Node::Block(statements) => {
                let mut last = Value::Null;
                for statement in statements {
                    last = statement.exec(ns)?;
                }
                Ok(last)
            }

            Node::If {
                branches,
                otherwise,
            } => exec_if(branches, otherwise.as_deref(), ns),

            Node::For {
                recipients,
                source,
                body,
            } => exec_for(recipients, source, body, ns),

            Node::Call { callee, args } => {
                let callee = callee.exec(ns)?;
                if callee.kind() != Kind::Function {
                    return Err(RuntimeError::operator_not_defined("call", callee.kind()));
                }
                let args = args
                    .iter()
                    .map(|arg| arg.exec(ns))
                    .collect::<InterpResult<Vec<_>>>()?;
                callee.call(&args)
            }

            Node::Return(value) => Err(RuntimeError::Return(value.exec(ns)?)),

            Node::Function { params, body } => make_function(params, body, ns),
        }
    }
}

/// `target = value` where target is an identifier or an index chain rooted at one
fn assign(target: &Node, value: Value, ns: &NamespaceRef) -> InterpResult<()> {
    // Indices in source order reversed: the written-to index comes first
    let mut indexes = Vec::new();
    let mut cursor = target;
    while let Node::Index { target, index } = cursor {
        indexes.push(index.exec(ns)?);
        cursor = target;
    }

    let name = cursor.as_ident().ok_or(RuntimeError::IdentifierExpected)?;

    let Some((last, path)) = indexes.split_first() else {
        ns.borrow_mut().set(name, value);
        return Ok(());
    };

    let mut container = ns.borrow().get(name)?;
    for index in path.iter().rev() {
        container = container.el_by_index(index)?;
    }
    container.set_el_by_index(last, value)
}

fn exec_if(branches: &[Branch], otherwise: Option<&Node>, ns: &NamespaceRef) -> InterpResult<Value> {
    for branch in branches {
        if branch.cond.exec(ns)?.to_bool()? {
            return branch.body.exec(&child_scope(ns, HashMap::new()));
        }
    }
    match otherwise {
        Some(body) => body.exec(&child_scope(ns, HashMap::new())),
        None => Ok(Value::Null),
    }
}

fn identifiers(nodes: &[Node]) -> InterpResult<Vec<String>> {
    nodes
        .iter()
        .map(|node| {
            node.as_ident()
                .map(str::to_string)
                .ok_or(RuntimeError::IdentifierExpected)
        })
        .collect()
}

fn exec_for(
    recipients: &[Node],
    source: &Node,
    body: &Node,
    ns: &NamespaceRef,
) -> InterpResult<Value> {
    let names = identifiers(recipients)?;
    let source = source.exec(ns)?;

    let mut last = Value::Null;
    match names.as_slice() {
        [] => return Err(RuntimeError::TooFewRecipients),
        [item] => {
            for value in source.iter()? {
                let scope = child_scope(ns, HashMap::from([(item.clone(), value)]));
                last = body.exec(&scope)?;
            }
        }
        [key, item] => {
            for (k, v) in source.iter2()? {
                let scope = child_scope(ns, HashMap::from([(key.clone(), k), (item.clone(), v)]));
                last = body.exec(&scope)?;
            }
        }
        _ => return Err(RuntimeError::TooManyRecipients),
    }
    Ok(last)
}

/// Build a closure over the defining scope
fn make_function(params: &[Node], body: &Rc<Node>, ns: &NamespaceRef) -> InterpResult<Value> {
    let names = identifiers(params)?;
    let scope = Rc::clone(ns);
    let body = Rc::clone(body);

    Ok(Value::function(move |args| {
        let _depth = CallDepthGuard::enter()?;
        trace!(params = names.len(), args = args.len(), "call");

        let bindings = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), args.get(i).cloned().unwrap_or(Value::Null)))
            .collect();

        match body.exec(&child_scope(&scope, bindings)) {
            Err(RuntimeError::Return(value)) => Ok(value),
            other => other,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, UnOp};

    fn run(node: &Node) -> InterpResult<Value> {
        exec(node, HashMap::new())
    }

    fn block(nodes: Vec<Node>) -> Node {
        Node::Block(nodes)
    }

    fn id(name: &str) -> Node {
        Node::ident(name)
    }

    #[test]
    fn test_literals() {
        assert_eq!(run(&Node::Int(5)).unwrap(), Value::Int(5));
        assert_eq!(run(&Node::text("hi")).unwrap(), Value::text("hi"));
        assert_eq!(run(&Node::Null).unwrap(), Value::Null);
        assert_eq!(run(&block(vec![])).unwrap(), Value::Null);
    }

    #[test]
    fn test_object_literal_keys_are_text_last_write_wins() {
        let node = Node::Object(vec![
            (Node::Int(1), Node::text("a")),
            (Node::text("1"), Node::text("b")),
            (Node::Bool(true), Node::Null),
        ]);
        assert_eq!(run(&node).unwrap().to_text(), "{1:b,true:null}");
    }

    #[test]
    fn test_create_requires_identifier() {
        let node = Node::create(Node::Int(1), Node::ident("missing"));
        // Identifier check happens before the value is evaluated
        assert!(matches!(run(&node), Err(RuntimeError::IdentifierExpected)));
    }

    #[test]
    fn test_create_twice_fails() {
        let node = block(vec![
            Node::create(id("x"), Node::Int(1)),
            Node::create(id("x"), Node::Int(2)),
        ]);
        assert!(matches!(
            run(&node),
            Err(RuntimeError::VariableAlreadyExists(name)) if name == "x"
        ));
    }

    #[test]
    fn test_set_nested_index() {
        // m := [[1, 2], [3, 4]]; m[1][0] = 9; m
        let matrix = Node::Array(vec![
            Node::Array(vec![Node::Int(1), Node::Int(2)]),
            Node::Array(vec![Node::Int(3), Node::Int(4)]),
        ]);
        let node = block(vec![
            Node::create(id("m"), matrix),
            Node::set(
                Node::index(Node::index(id("m"), Node::Int(1)), Node::Int(0)),
                Node::Int(9),
            ),
            id("m"),
        ]);
        assert_eq!(run(&node).unwrap().to_text(), "[[1,2],[9,4]]");
    }

    #[test]
    fn test_set_index_requires_identifier_root() {
        let node = Node::set(Node::index(Node::Array(vec![]), Node::Int(0)), Node::Int(1));
        assert!(matches!(run(&node), Err(RuntimeError::IdentifierExpected)));
    }

    #[test]
    fn test_set_index_undefined_root() {
        let node = Node::set(Node::index(id("nope"), Node::Int(0)), Node::Int(1));
        assert!(matches!(
            run(&node),
            Err(RuntimeError::UndefinedVariable(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_set_returns_value() {
        let node = Node::set(id("x"), Node::Int(4));
        assert_eq!(run(&node).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_index_gates() {
        let on_int = Node::index(Node::Int(5), Node::Int(0));
        assert_eq!(
            run(&on_int).unwrap_err().to_string(),
            "operator [<index>] is not defined for type int"
        );

        let array_index = Node::index(Node::text("abc"), Node::Array(vec![]));
        assert!(matches!(
            run(&array_index),
            Err(RuntimeError::InvalidIndex(Kind::Array))
        ));
    }

    #[test]
    fn test_object_accepts_any_index_via_text() {
        // {"[]": 1}[[]]
        let node = Node::index(
            Node::Object(vec![(Node::text("[]"), Node::Int(1))]),
            Node::Array(vec![]),
        );
        assert_eq!(run(&node).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_if_elif_else() {
        let node = |n: i64| Node::If {
            branches: vec![
                Branch {
                    cond: Node::binary(BinOp::Lt, Node::Int(n), Node::Int(0)),
                    body: Node::text("neg"),
                },
                Branch {
                    cond: Node::binary(BinOp::Eq, Node::Int(n), Node::Int(0)),
                    body: Node::text("zero"),
                },
            ],
            otherwise: Some(Box::new(Node::text("pos"))),
        };
        assert_eq!(run(&node(-1)).unwrap(), Value::text("neg"));
        assert_eq!(run(&node(0)).unwrap(), Value::text("zero"));
        assert_eq!(run(&node(3)).unwrap(), Value::text("pos"));
    }

    #[test]
    fn test_if_without_match_is_null() {
        let node = Node::If {
            branches: vec![Branch {
                cond: Node::Bool(false),
                body: Node::Int(1),
            }],
            otherwise: None,
        };
        assert_eq!(run(&node).unwrap(), Value::Null);
    }

    #[test]
    fn test_if_body_scope_is_discarded() {
        let node = block(vec![
            Node::If {
                branches: vec![Branch {
                    cond: Node::Bool(true),
                    body: Node::create(id("m"), Node::Int(5)),
                }],
                otherwise: None,
            },
            id("m"),
        ]);
        assert!(matches!(
            run(&node),
            Err(RuntimeError::UndefinedVariable(name)) if name == "m"
        ));
    }

    #[test]
    fn test_for_recipient_checks() {
        let bad = Node::for_in(vec![Node::Int(1)], id("undefined"), Node::Null);
        assert!(matches!(run(&bad), Err(RuntimeError::IdentifierExpected)));

        let none = Node::for_in(vec![], Node::Int(3), Node::Null);
        assert!(matches!(run(&none), Err(RuntimeError::TooFewRecipients)));

        let three = Node::for_in(vec![id("a"), id("b"), id("c")], Node::Int(3), Node::Null);
        assert!(matches!(run(&three), Err(RuntimeError::TooManyRecipients)));
    }

    #[test]
    fn test_for_result_is_last_body_value() {
        let node = Node::for_in(vec![id("i")], Node::Int(4), id("i"));
        assert_eq!(run(&node).unwrap(), Value::Int(3));

        let empty = Node::for_in(vec![id("i")], Node::Int(0), id("i"));
        assert_eq!(run(&empty).unwrap(), Value::Null);
    }

    #[test]
    fn test_for_two_recipients() {
        // s := 0; for i, v in [10, 20] { s = s + i * v }; s
        let node = block(vec![
            Node::create(id("s"), Node::Int(0)),
            Node::for_in(
                vec![id("i"), id("v")],
                Node::Array(vec![Node::Int(10), Node::Int(20)]),
                Node::set(
                    id("s"),
                    Node::binary(
                        BinOp::Add,
                        id("s"),
                        Node::binary(BinOp::Mul, id("i"), id("v")),
                    ),
                ),
            ),
            id("s"),
        ]);
        assert_eq!(run(&node).unwrap(), Value::Int(20));
    }

    #[test]
    fn test_for_pairs_source_errors() {
        let node = Node::for_in(vec![id("a"), id("b")], Node::Int(5), id("a"));
        assert!(matches!(run(&node), Err(RuntimeError::NoIterSupport2(Kind::Int))));

        let single = Node::for_in(vec![id("a")], Node::Null, id("a"));
        assert!(matches!(run(&single), Err(RuntimeError::NoIterSupport(Kind::Null))));
    }

    #[test]
    fn test_for_iterations_get_fresh_scopes() {
        // fs := []; for i in 3 { fs = append(fs, () -> { i }) }; [fs[0](), fs[2]()]
        let node = block(vec![
            Node::create(id("fs"), Node::Array(vec![])),
            Node::for_in(
                vec![id("i")],
                Node::Int(3),
                Node::set(
                    id("fs"),
                    Node::call(
                        id("append"),
                        vec![id("fs"), Node::function(vec![], id("i"))],
                    ),
                ),
            ),
            Node::Array(vec![
                Node::call(Node::index(id("fs"), Node::Int(0)), vec![]),
                Node::call(Node::index(id("fs"), Node::Int(2)), vec![]),
            ]),
        ]);
        assert_eq!(
            run(&node).unwrap(),
            Value::array(vec![Value::Int(0), Value::Int(2)])
        );
    }

    #[test]
    fn test_call_non_function() {
        let node = Node::call(Node::Int(1), vec![]);
        assert_eq!(
            run(&node).unwrap_err().to_string(),
            "operator call is not defined for type int"
        );
    }

    #[test]
    fn test_function_params() {
        // f := (a, b) -> { [a, b] }; f(1)
        let node = block(vec![
            Node::create(
                id("f"),
                Node::function(vec![id("a"), id("b")], Node::Array(vec![id("a"), id("b")])),
            ),
            Node::call(id("f"), vec![Node::Int(1)]),
        ]);
        assert_eq!(run(&node).unwrap().to_text(), "[1,null]");
    }

    #[test]
    fn test_function_params_must_be_identifiers() {
        let node = Node::function(vec![Node::Int(1)], Node::Null);
        assert!(matches!(run(&node), Err(RuntimeError::IdentifierExpected)));
    }

    #[test]
    fn test_return_inside_function() {
        let node = Node::call(
            Node::function(
                vec![],
                block(vec![Node::ret(Node::Int(7)), Node::Int(8)]),
            ),
            vec![],
        );
        assert_eq!(run(&node).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_return_at_top_level() {
        let node = Node::ret(Node::Int(1));
        let err = run(&node).unwrap_err();
        assert!(matches!(err, RuntimeError::ReturnOutsideFunction));
        assert_eq!(err.to_string(), "`return` used outside a function context");
    }

    #[test]
    fn test_closure_captures_scope() {
        // make := () -> { n := 0; () -> { n = n + 1 } }; c := make(); c(); c()
        let counter = Node::function(
            vec![],
            block(vec![
                Node::create(id("n"), Node::Int(0)),
                Node::function(
                    vec![],
                    Node::set(id("n"), Node::binary(BinOp::Add, id("n"), Node::Int(1))),
                ),
            ]),
        );
        let node = block(vec![
            Node::create(id("make"), counter),
            Node::create(id("c"), Node::call(id("make"), vec![])),
            Node::call(id("c"), vec![]),
            Node::call(id("c"), vec![]),
        ]);
        assert_eq!(run(&node).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_host_binding_overrides_builtin() {
        let node = Node::call(id("len"), vec![Node::Null]);
        let mut bindings = HashMap::new();
        bindings.insert("len".to_string(), Value::function(|_| Ok(Value::Int(-1))));
        assert_eq!(exec(&node, bindings).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_unary_nodes() {
        let neg = Node::unary(UnOp::Neg, Node::text("3"));
        assert_eq!(run(&neg).unwrap(), Value::Int(-3));
        let not = Node::unary(UnOp::Not, Node::Array(vec![]));
        assert_eq!(run(&not).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_exec_in_persists_bindings() {
        let ns = root_namespace(HashMap::new());
        exec_in(&Node::create(id("x"), Node::Int(1)), &ns).unwrap();
        assert_eq!(exec_in(&id("x"), &ns).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_call_depth_limit() {
        // f := (n) -> { f(n + 1) }; f(0)
        let node = block(vec![
            Node::create(
                id("f"),
                Node::function(
                    vec![id("n")],
                    Node::call(id("f"), vec![Node::binary(BinOp::Add, id("n"), Node::Int(1))]),
                ),
            ),
            Node::call(id("f"), vec![Node::Int(0)]),
        ]);
        assert!(matches!(
            run(&node),
            Err(RuntimeError::CallDepthExceeded(MAX_CALL_DEPTH))
        ));
        // The guard unwinds fully after the failure
        assert_eq!(CALL_DEPTH.with(Cell::get), 0);
    }
}
