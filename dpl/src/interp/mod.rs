//! Interpreter: runtime values, namespaces and the tree-walking evaluator

mod builtins;
mod env;
mod error;
mod eval;
mod json;
mod ops;
mod value;

pub use builtins::{builtins, stdout, OutputRef};
pub use env::{child_scope, Namespace, NamespaceRef};
pub use error::{InterpResult, RuntimeError};
pub use eval::{exec, exec_in, root_namespace, root_namespace_with_output, MAX_CALL_DEPTH};
pub(crate) use eval::{STACK_GROW_SIZE, STACK_RED_ZONE};
pub use ops::{binary, unary};
pub use value::{ArrayRef, FunctionRef, Kind, ObjectRef, PairIter, Value, ValueIter};
