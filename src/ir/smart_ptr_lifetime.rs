//! Smart Pointer Lifetime Optimization
//!
//! Tracks the ownership-transfer state of move-only smart-pointer values
//! through a function's instruction stream and removes destructor calls that
//! are provably no-ops. Move constructors and destructors are recognized by
//! semantics tags embedded in the callee's mangled name; everything else is
//! an opaque use that conservatively invalidates what we know.
//!
//! The analysis is strictly local to each basic block: all tracked state is
//! reset to `Unknown` at every block boundary, so no fact ever flows across
//! a control-flow edge. Missed opportunities are the only failure mode; the
//! pass never deletes a destructor unless the value is known empty at that
//! exact point.

use fxhash::FxHashMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::optimization::{OptimizationPass, OptimizationResult};
use super::{IrBlockId, IrFunction, IrId, IrInstruction, IrModule};

/// Registration token for this pass.
pub const SMART_PTR_LIFETIME_PASS_NAME: &str = "smart-ptr-lifetime-opts";

/// Statistics key reported through `OptimizationResult::stats`.
pub const STAT_DESTRUCTORS_REMOVED: &str = "smart-ptr-destructors-removed";

/// The lifetime state of a tracked smart-pointer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// May be live. The conservative default for anything not explicitly
    /// tracked, and the result of any use we cannot classify.
    Unknown,

    /// Just became the destination of a move-construction: it owns whatever
    /// resource was moved in, so a destroy of it is not a no-op.
    MovedTo,

    /// Holds no resource: either it was moved from, or its destructor
    /// already ran.
    Empty,
}

/// Classification of a call instruction's callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownCall {
    Unrecognized,
    MoveConstruct,
    Destructor,
}

/// Name patterns for one move-only smart-pointer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartPtrSemantics {
    /// Display name of the type, for logging only
    pub type_name: String,

    /// Tag identifying the type's move constructor
    pub move_tag: String,

    /// Tag identifying the type's destructor
    pub destroy_tag: String,
}

impl SmartPtrSemantics {
    /// The standard `unique_ptr` tagging scheme.
    pub fn unique_ptr() -> Self {
        Self {
            type_name: "unique_ptr".to_string(),
            move_tag: "__SEMANTICS_unique_ptr_move".to_string(),
            destroy_tag: "__SEMANTICS_unique_ptr_destroy".to_string(),
        }
    }
}

/// Classifies callee names against a configurable set of smart-pointer
/// types. Matching is by substring tag search. Pure: classification has no
/// side effects and no state beyond the configured table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallClassifier {
    /// Gate substring checked before any per-type tag. `classify` runs on
    /// every call instruction, so the common case (no semantics tag at all)
    /// must stay a single scan of the name.
    tag_gate: String,

    /// Recognized smart-pointer types
    semantics: Vec<SmartPtrSemantics>,
}

impl CallClassifier {
    pub fn new(semantics: Vec<SmartPtrSemantics>) -> Self {
        Self {
            tag_gate: "__SEMANTICS".to_string(),
            semantics,
        }
    }

    /// Classifier recognizing only `unique_ptr`.
    pub fn unique_ptr() -> Self {
        Self::new(vec![SmartPtrSemantics::unique_ptr()])
    }

    /// Override the fastpath gate substring.
    pub fn with_gate(mut self, gate: impl Into<String>) -> Self {
        self.tag_gate = gate.into();
        self
    }

    /// Load a classifier configuration from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Decide what a call to `name` means.
    pub fn classify(&self, name: &str) -> KnownCall {
        if !name.contains(self.tag_gate.as_str()) {
            return KnownCall::Unrecognized;
        }
        for sem in &self.semantics {
            if name.contains(sem.move_tag.as_str()) {
                return KnownCall::MoveConstruct;
            }
            if name.contains(sem.destroy_tag.as_str()) {
                return KnownCall::Destructor;
            }
        }
        KnownCall::Unrecognized
    }
}

impl Default for CallClassifier {
    fn default() -> Self {
        Self::unique_ptr()
    }
}

/// The pass itself. One instance holds only its classifier configuration;
/// all analysis state is created per function and discarded on return, so
/// instances are safe to use from independent per-function pipelines.
pub struct SmartPtrLifetimePass {
    classifier: CallClassifier,
}

impl SmartPtrLifetimePass {
    pub fn new() -> Self {
        Self {
            classifier: CallClassifier::unique_ptr(),
        }
    }

    pub fn with_classifier(classifier: CallClassifier) -> Self {
        Self { classifier }
    }

    /// Single linear scan over `function`. Returns the number of destructor
    /// calls removed.
    fn run_scan(&self, function: &mut IrFunction) -> usize {
        let mut lifetimes: FxHashMap<IrId, Lifetime> = FxHashMap::default();
        let mut dead: SmallVec<[(IrBlockId, usize); 8]> = SmallVec::new();

        for (&block_id, block) in &function.cfg.blocks {
            for (idx, inst) in block.instructions.iter().enumerate() {
                match inst {
                    IrInstruction::CallDirect { callee, args, .. } => {
                        match self.classifier.classify(callee) {
                            // The explicit mapping supersedes generic
                            // invalidation: `to` now owns the moved-in
                            // resource, `from` is left empty.
                            KnownCall::MoveConstruct if args.len() >= 2 => {
                                lifetimes.insert(args[0], Lifetime::MovedTo);
                                lifetimes.insert(args[1], Lifetime::Empty);
                            }
                            KnownCall::Destructor if !args.is_empty() => {
                                let state = lifetimes.entry(args[0]).or_insert(Lifetime::Unknown);
                                if *state == Lifetime::Empty {
                                    // Already empty: the destructor is a
                                    // noop. State stays Empty, so a duplicate
                                    // destroy of the same value is dead too.
                                    trace!(
                                        "{}: destructor of {} in {} is a noop",
                                        function.name,
                                        args[0],
                                        block_id
                                    );
                                    dead.push((block_id, idx));
                                } else {
                                    // Runs for real. Afterwards the value
                                    // holds nothing.
                                    *state = Lifetime::Empty;
                                }
                            }
                            // Unrecognized name, or a recognized name with
                            // the wrong arity: treat as an opaque call.
                            _ => invalidate_tracked(&mut lifetimes, args.iter().copied()),
                        }
                    }
                    // No callee to classify. Invalidate every operand,
                    // function pointer included.
                    IrInstruction::CallIndirect { .. } => {
                        invalidate_tracked(&mut lifetimes, inst.uses())
                    }
                    // Any other kind of use (load, store, arithmetic, ...)
                    // is opaque to this analysis.
                    other => invalidate_tracked(&mut lifetimes, other.uses()),
                }
            }

            invalidate_tracked(&mut lifetimes, block.terminator.uses());

            // Block boundary: we do not know which block we may have come
            // from, so forget everything. Keys are kept, states reset.
            for state in lifetimes.values_mut() {
                *state = Lifetime::Unknown;
            }
        }

        let removed = dead.len();
        // Indices were collected in scan order, so walking them backwards
        // removes higher indices first and never shifts a pending one.
        for &(block_id, idx) in dead.iter().rev() {
            if let Some(block) = function.cfg.get_block_mut(block_id) {
                debug!(
                    "{}: removing redundant destructor at {}[{}]",
                    function.name, block_id, idx
                );
                block.instructions.remove(idx);
            }
        }
        removed
    }
}

impl Default for SmartPtrLifetimePass {
    fn default() -> Self {
        Self::new()
    }
}

/// Force every already-tracked operand to `Unknown`. Operands that are not
/// tracked yet are left alone; an opaque use never starts tracking.
fn invalidate_tracked(
    lifetimes: &mut FxHashMap<IrId, Lifetime>,
    operands: impl IntoIterator<Item = IrId>,
) {
    for op in operands {
        if let Some(state) = lifetimes.get_mut(&op) {
            *state = Lifetime::Unknown;
        }
    }
}

impl OptimizationPass for SmartPtrLifetimePass {
    fn name(&self) -> &'static str {
        SMART_PTR_LIFETIME_PASS_NAME
    }

    fn run_on_module(&mut self, module: &mut IrModule) -> OptimizationResult {
        let mut result = OptimizationResult::unchanged();
        for function in module.functions.values_mut() {
            result = result.combine(self.run_on_function(function));
        }
        result
    }

    fn run_on_function(&mut self, function: &mut IrFunction) -> OptimizationResult {
        let removed = self.run_scan(function);
        if removed == 0 {
            return OptimizationResult::unchanged();
        }

        let mut result = OptimizationResult::changed();
        result.instructions_eliminated = removed;
        result
            .stats
            .insert(STAT_DESTRUCTORS_REMOVED.to_string(), removed);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrBuilder, IrFunctionSignature, IrType, IrValue};

    const MOVE: &str = "_Z4moveP__SEMANTICS_unique_ptr_move";
    const DESTROY: &str = "_Z7destroyP__SEMANTICS_unique_ptr_destroy";

    /// Builds a function with two smart-pointer slots and hands them plus
    /// the builder to `body`. Returns the module and the function's
    /// instruction count before any pass ran.
    fn build_function(
        body: impl FnOnce(&mut IrBuilder, crate::ir::IrId, crate::ir::IrId),
    ) -> (crate::ir::IrModule, usize) {
        let mut builder = IrBuilder::new("test".to_string(), "test.cpp".to_string());
        builder.start_function("f".to_string(), IrFunctionSignature::void());
        let to = builder.build_alloc(IrType::ptr_to_named("unique_ptr")).unwrap();
        let from = builder.build_alloc(IrType::ptr_to_named("unique_ptr")).unwrap();
        body(&mut builder, to, from);
        builder.build_return(None).unwrap();
        builder.finish_function();

        let count = builder.module.function_by_name("f").unwrap().instruction_count();
        (builder.module, count)
    }

    fn run(module: &mut crate::ir::IrModule) -> OptimizationResult {
        SmartPtrLifetimePass::new().run_on_module(module)
    }

    #[test]
    fn test_classifier_tags() {
        let classifier = CallClassifier::unique_ptr();
        assert_eq!(classifier.classify(MOVE), KnownCall::MoveConstruct);
        assert_eq!(classifier.classify(DESTROY), KnownCall::Destructor);
        assert_eq!(classifier.classify("_Z3foov"), KnownCall::Unrecognized);
        // No gate substring means no match even if a tag-like suffix exists.
        assert_eq!(
            classifier.classify("unique_ptr_move"),
            KnownCall::Unrecognized
        );
    }

    #[test]
    fn test_classifier_multiple_types() {
        let classifier = CallClassifier::new(vec![
            SmartPtrSemantics::unique_ptr(),
            SmartPtrSemantics {
                type_name: "owned_fd".to_string(),
                move_tag: "__SEMANTICS_owned_fd_move".to_string(),
                destroy_tag: "__SEMANTICS_owned_fd_destroy".to_string(),
            },
        ]);
        assert_eq!(
            classifier.classify("_Z1fP__SEMANTICS_owned_fd_destroy"),
            KnownCall::Destructor
        );
        assert_eq!(classifier.classify(MOVE), KnownCall::MoveConstruct);
    }

    #[test]
    fn test_classifier_from_json() {
        let json = r#"{
            "tag_gate": "__SEMANTICS",
            "semantics": [{
                "type_name": "unique_ptr",
                "move_tag": "__SEMANTICS_unique_ptr_move",
                "destroy_tag": "__SEMANTICS_unique_ptr_destroy"
            }]
        }"#;
        let classifier = CallClassifier::from_json(json).unwrap();
        assert_eq!(classifier, CallClassifier::unique_ptr());
    }

    #[test]
    fn test_basic_redundant_destroy_removed() {
        let (mut module, before) = build_function(|b, to, from| {
            b.build_void_call(MOVE, vec![to, from]).unwrap();
            b.build_void_call(DESTROY, vec![from]).unwrap();
        });

        let result = run(&mut module);
        assert!(result.modified);
        assert_eq!(result.instructions_eliminated, 1);
        assert_eq!(result.stats[STAT_DESTRUCTORS_REMOVED], 1);
        assert_eq!(
            module.function_by_name("f").unwrap().instruction_count(),
            before - 1
        );
    }

    #[test]
    fn test_double_destroy_both_removed() {
        let (mut module, before) = build_function(|b, to, from| {
            b.build_void_call(MOVE, vec![to, from]).unwrap();
            b.build_void_call(DESTROY, vec![from]).unwrap();
            b.build_void_call(DESTROY, vec![from]).unwrap();
        });

        let result = run(&mut module);
        assert_eq!(result.instructions_eliminated, 2);
        assert_eq!(
            module.function_by_name("f").unwrap().instruction_count(),
            before - 2
        );
    }

    #[test]
    fn test_opaque_call_invalidates() {
        // move(to, from); unknown(to); destroy(to) -- the opaque call forces
        // `to` back to Unknown, so the destroy runs for real.
        let (mut module, before) = build_function(|b, to, from| {
            b.build_void_call(MOVE, vec![to, from]).unwrap();
            b.build_void_call("_Z7unknownv", vec![to]).unwrap();
            b.build_void_call(DESTROY, vec![to]).unwrap();
        });

        let result = run(&mut module);
        assert!(!result.modified);
        assert_eq!(
            module.function_by_name("f").unwrap().instruction_count(),
            before
        );
    }

    #[test]
    fn test_opaque_call_invalidates_moved_from() {
        let (mut module, _) = build_function(|b, to, from| {
            b.build_void_call(MOVE, vec![to, from]).unwrap();
            b.build_void_call("_Z7unknownv", vec![from]).unwrap();
            b.build_void_call(DESTROY, vec![from]).unwrap();
        });

        assert!(!run(&mut module).modified);
    }

    #[test]
    fn test_indirect_call_invalidates() {
        let (mut module, _) = build_function(|b, to, from| {
            b.build_void_call(MOVE, vec![to, from]).unwrap();
            let fp = b.build_const(IrValue::Null).unwrap();
            b.build_indirect_call(fp, vec![from]).unwrap();
            b.build_void_call(DESTROY, vec![from]).unwrap();
        });

        assert!(!run(&mut module).modified);
    }

    #[test]
    fn test_non_call_use_invalidates() {
        // A store through the moved-from slot is an opaque use.
        let (mut module, _) = build_function(|b, to, from| {
            b.build_void_call(MOVE, vec![to, from]).unwrap();
            let zero = b.build_const(IrValue::I64(0)).unwrap();
            b.build_store(from, zero).unwrap();
            b.build_void_call(DESTROY, vec![from]).unwrap();
        });

        assert!(!run(&mut module).modified);
    }

    #[test]
    fn test_block_boundary_reset() {
        // move in the entry block, destroy of `from` in the successor: the
        // per-block reset means the destroy must survive.
        let mut builder = IrBuilder::new("test".to_string(), "test.cpp".to_string());
        builder.start_function("f".to_string(), IrFunctionSignature::void());
        let to = builder.build_alloc(IrType::ptr_to_named("unique_ptr")).unwrap();
        let from = builder.build_alloc(IrType::ptr_to_named("unique_ptr")).unwrap();
        builder.build_void_call(MOVE, vec![to, from]).unwrap();
        let next = builder.create_block().unwrap();
        builder.build_branch(next).unwrap();
        builder.switch_to_block(next);
        builder.build_void_call(DESTROY, vec![from]).unwrap();
        builder.build_return(None).unwrap();
        builder.finish_function();

        assert!(!run(&mut builder.module).modified);
    }

    #[test]
    fn test_redundancy_within_later_block_still_found() {
        // The reset clears facts across the edge, but a move/destroy pair
        // wholly inside the second block is still eliminated.
        let mut builder = IrBuilder::new("test".to_string(), "test.cpp".to_string());
        builder.start_function("f".to_string(), IrFunctionSignature::void());
        let to = builder.build_alloc(IrType::ptr_to_named("unique_ptr")).unwrap();
        let from = builder.build_alloc(IrType::ptr_to_named("unique_ptr")).unwrap();
        let next = builder.create_block().unwrap();
        builder.build_branch(next).unwrap();
        builder.switch_to_block(next);
        builder.build_void_call(MOVE, vec![to, from]).unwrap();
        builder.build_void_call(DESTROY, vec![from]).unwrap();
        builder.build_return(None).unwrap();
        builder.finish_function();

        let result = run(&mut builder.module);
        assert_eq!(result.instructions_eliminated, 1);
    }

    #[test]
    fn test_unrelated_calls_noop() {
        let (mut module, before) = build_function(|b, to, from| {
            b.build_void_call("_Z3foov", vec![to]).unwrap();
            b.build_void_call("_Z3barv", vec![from]).unwrap();
        });

        let result = run(&mut module);
        assert!(!result.modified);
        assert_eq!(result.instructions_eliminated, 0);
        assert_eq!(
            module.function_by_name("f").unwrap().instruction_count(),
            before
        );
    }

    #[test]
    fn test_destroy_of_untracked_value_runs() {
        // A destructor on a value never seen before is not provably
        // redundant; only the duplicate after it is.
        let (mut module, before) = build_function(|b, to, _| {
            b.build_void_call(DESTROY, vec![to]).unwrap();
            b.build_void_call(DESTROY, vec![to]).unwrap();
        });

        let result = run(&mut module);
        assert_eq!(result.instructions_eliminated, 1);
        assert_eq!(
            module.function_by_name("f").unwrap().instruction_count(),
            before - 1
        );
    }

    #[test]
    fn test_destroy_of_moved_to_runs() {
        // `to` owns the moved-in resource, so its destructor is real.
        let (mut module, _) = build_function(|b, to, from| {
            b.build_void_call(MOVE, vec![to, from]).unwrap();
            b.build_void_call(DESTROY, vec![to]).unwrap();
        });

        assert!(!run(&mut module).modified);
    }

    #[test]
    fn test_arity_guard_degrades_to_opaque() {
        // A call whose name says "move" but carries a single argument is
        // treated as an opaque call over its operands, nothing more.
        let (mut module, _) = build_function(|b, to, from| {
            b.build_void_call(MOVE, vec![to, from]).unwrap();
            b.build_void_call(MOVE, vec![from]).unwrap();
            b.build_void_call(DESTROY, vec![from]).unwrap();
        });

        // The malformed move invalidated `from`, so the destroy runs.
        assert!(!run(&mut module).modified);
    }

    #[test]
    fn test_zero_arg_destroy_is_ignored() {
        let (mut module, before) = build_function(|b, _, _| {
            b.build_void_call(DESTROY, vec![]).unwrap();
        });

        let result = run(&mut module);
        assert!(!result.modified);
        assert_eq!(
            module.function_by_name("f").unwrap().instruction_count(),
            before
        );
    }

    #[test]
    fn test_move_overwrites_prior_state() {
        // destroy(from) leaves `from` Empty; a later move re-targets both
        // values unconditionally, so destroy(to) must run.
        let (mut module, _) = build_function(|b, to, from| {
            b.build_void_call(DESTROY, vec![from]).unwrap();
            b.build_void_call(MOVE, vec![to, from]).unwrap();
            b.build_void_call(DESTROY, vec![to]).unwrap();
        });

        assert!(!run(&mut module).modified);
    }

    #[test]
    fn test_custom_smart_ptr_type() {
        let classifier = CallClassifier::new(vec![SmartPtrSemantics {
            type_name: "scoped_buf".to_string(),
            move_tag: "__SEMANTICS_scoped_buf_move".to_string(),
            destroy_tag: "__SEMANTICS_scoped_buf_destroy".to_string(),
        }]);

        let (mut module, _) = build_function(|b, to, from| {
            b.build_void_call("_Z1mP__SEMANTICS_scoped_buf_move", vec![to, from])
                .unwrap();
            b.build_void_call("_Z1dP__SEMANTICS_scoped_buf_destroy", vec![from])
                .unwrap();
        });

        let mut pass = SmartPtrLifetimePass::with_classifier(classifier);
        let result = pass.run_on_module(&mut module);
        assert_eq!(result.instructions_eliminated, 1);
    }
}
