//! Scopes: the per-model registry and the per-chain scope stack.

pub mod registry;
pub mod stack;

pub use registry::{
    Extension, ExtensionOp, Finder, ScopeBuilder, ScopeDefinition, ScopeRegistry,
    BUILTIN_OPERATIONS,
};
pub use stack::{ScopeContext, ScopeGuard};
