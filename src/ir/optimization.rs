//! IR Optimization Passes
//!
//! Pass infrastructure: the `OptimizationPass` trait, the result type passes
//! report through, and a `PassManager` that runs a registered pipeline to a
//! fixpoint. Passes declare no dependencies on other analyses; each one is
//! self-contained.

use super::{IrFunction, IrId, IrModule};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Optimization pass trait
pub trait OptimizationPass {
    /// Get the name of this pass (its registration token)
    fn name(&self) -> &'static str;

    /// Run the pass on a module
    fn run_on_module(&mut self, module: &mut IrModule) -> OptimizationResult;

    /// Run the pass on a function (default implementation does nothing)
    fn run_on_function(&mut self, _function: &mut IrFunction) -> OptimizationResult {
        OptimizationResult::unchanged()
    }
}

/// Result of an optimization pass
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Whether the IR was modified
    pub modified: bool,

    /// Number of instructions eliminated
    pub instructions_eliminated: usize,

    /// Number of blocks eliminated
    pub blocks_eliminated: usize,

    /// Other statistics
    pub stats: HashMap<String, usize>,
}

impl OptimizationResult {
    /// Create a result indicating no changes
    pub fn unchanged() -> Self {
        Self {
            modified: false,
            instructions_eliminated: 0,
            blocks_eliminated: 0,
            stats: HashMap::new(),
        }
    }

    /// Create a result indicating changes
    pub fn changed() -> Self {
        Self {
            modified: true,
            instructions_eliminated: 0,
            blocks_eliminated: 0,
            stats: HashMap::new(),
        }
    }

    /// Combine results
    pub fn combine(mut self, other: OptimizationResult) -> Self {
        self.modified |= other.modified;
        self.instructions_eliminated += other.instructions_eliminated;
        self.blocks_eliminated += other.blocks_eliminated;

        for (key, value) in other.stats {
            *self.stats.entry(key).or_insert(0) += value;
        }

        self
    }
}

/// Optimization pass manager
pub struct PassManager {
    passes: Vec<Box<dyn OptimizationPass>>,
}

impl PassManager {
    /// Create a new pass manager
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Add a pass to the manager
    pub fn add_pass<P: OptimizationPass + 'static>(&mut self, pass: P) {
        self.passes.push(Box::new(pass));
    }

    /// Names of the registered passes, in run order
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Build the default optimization pipeline
    pub fn default_pipeline() -> Self {
        let mut manager = Self::new();

        manager.add_pass(super::smart_ptr_lifetime::SmartPtrLifetimePass::new());
        manager.add_pass(DeadCodeEliminationPass::new());

        manager
    }

    /// Run all passes on a module, repeating until nothing changes
    pub fn run(&mut self, module: &mut IrModule) -> OptimizationResult {
        let mut total_result = OptimizationResult::unchanged();

        loop {
            let mut changed = false;

            for pass in &mut self.passes {
                let result = pass.run_on_module(module);
                if result.modified {
                    debug!(
                        "pass {} modified module {} ({} instructions eliminated)",
                        pass.name(),
                        module.name,
                        result.instructions_eliminated
                    );
                    changed = true;
                }
                total_result = total_result.combine(result);
            }

            if !changed {
                break;
            }
        }

        total_result
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Dead code elimination pass
///
/// Removes instructions whose result is never read, unless they have side
/// effects. Calls always survive; a destructor call only disappears through
/// the lifetime pass, never through DCE.
pub struct DeadCodeEliminationPass;

impl DeadCodeEliminationPass {
    pub fn new() -> Self {
        Self
    }

    /// Find all registers read anywhere in a function
    fn find_used_registers(&self, function: &IrFunction) -> HashSet<IrId> {
        let mut used = HashSet::new();

        for block in function.cfg.blocks.values() {
            for inst in &block.instructions {
                used.extend(inst.uses());
            }
            used.extend(block.terminator.uses());
        }

        used
    }

    /// Remove dead instructions from a function
    fn eliminate_dead_instructions(&self, function: &mut IrFunction) -> usize {
        let used = self.find_used_registers(function);
        let mut eliminated = 0;

        for block in function.cfg.blocks.values_mut() {
            let original_len = block.instructions.len();
            block.instructions.retain(|inst| {
                if let Some(dest) = inst.dest() {
                    used.contains(&dest) || inst.has_side_effects()
                } else {
                    // Instructions without destinations are kept for their
                    // effects.
                    true
                }
            });
            eliminated += original_len - block.instructions.len();
        }

        eliminated
    }
}

impl OptimizationPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn run_on_module(&mut self, module: &mut IrModule) -> OptimizationResult {
        let mut result = OptimizationResult::unchanged();

        for function in module.functions.values_mut() {
            result = result.combine(self.run_on_function(function));
        }

        result
    }

    fn run_on_function(&mut self, function: &mut IrFunction) -> OptimizationResult {
        let eliminated = self.eliminate_dead_instructions(function);
        if eliminated == 0 {
            return OptimizationResult::unchanged();
        }

        let mut result = OptimizationResult::changed();
        result.instructions_eliminated = eliminated;
        result
    }
}
