//! The script-loader bytecode cache scenarios.
//!
//! A script is either loaded from source (and possibly encoded into the
//! bytecode cache after executing) or loaded from cached bytecode, falling
//! back to source when the cache entry cannot be used. Both modes share the
//! root so one walker classifies whichever one actually happens.

use crate::tree::{Branch, Node, TransitionTree};
use std::sync::Arc;

pub const LOAD_SOURCE: &str = "scriptloader_load_source";
pub const LOAD_BYTECODE: &str = "scriptloader_load_bytecode";
pub const GENERATE_BYTECODE: &str = "scriptloader_generate_bytecode";
pub const EXECUTE: &str = "scriptloader_execute";
pub const ENCODE_AND_EXECUTE: &str = "scriptloader_encode_and_execute";
pub const BYTECODE_SAVED: &str = "scriptloader_bytecode_saved";
pub const BYTECODE_FAILED: &str = "scriptloader_bytecode_failed";
pub const FALLBACK: &str = "scriptloader_fallback";

/// Every event the loader may fire. `GENERATE_BYTECODE` is listened for but
/// has no transition, so it always fails the walk.
pub const EVENTS: [&str; 8] = [
    LOAD_SOURCE,
    LOAD_BYTECODE,
    GENERATE_BYTECODE,
    EXECUTE,
    ENCODE_AND_EXECUTE,
    BYTECODE_SAVED,
    BYTECODE_FAILED,
    FALLBACK,
];

/// Terminal labels.
pub mod labels {
    pub const SOURCE_EXEC: &str = "source_exec";
    pub const BYTECODE_SAVED: &str = "bytecode_saved";
    pub const BYTECODE_FAILED: &str = "bytecode_failed";
    pub const BYTECODE_EXEC: &str = "bytecode_exec";
    pub const FALLBACK_SOURCE_EXEC: &str = "fallback_source_exec";
    pub const FALLBACK_BYTECODE_SAVED: &str = "fallback_bytecode_saved";
    pub const FALLBACK_BYTECODE_FAILED: &str = "fallback_bytecode_failed";
}

/// The source-load sub-tree, with leaf labels prefixed for the fallback copy.
fn load_source(prefix: &str) -> Node {
    Node::branch([
        (
            ENCODE_AND_EXECUTE,
            Node::branch([
                (BYTECODE_SAVED, Node::leaf(format!("{prefix}bytecode_saved"))),
                (BYTECODE_FAILED, Node::leaf(format!("{prefix}bytecode_failed"))),
            ]),
        ),
        (EXECUTE, Node::leaf(format!("{prefix}source_exec"))),
    ])
}

fn root() -> Arc<Branch> {
    Arc::new(Branch::new([
        (LOAD_SOURCE, load_source("")),
        (
            LOAD_BYTECODE,
            Node::branch([
                (
                    FALLBACK,
                    Node::branch([(LOAD_SOURCE, load_source("fallback_"))]),
                ),
                (EXECUTE, Node::leaf(labels::BYTECODE_EXEC)),
            ]),
        ),
    ]))
}

/// The Transition Tree for the script-loader bytecode cache.
pub fn tree() -> TransitionTree {
    TransitionTree::from_literal(root())
}
