//! IR Builder
//!
//! A builder interface for constructing IR modules programmatically. The
//! builder keeps track of the current function and block and provides helper
//! methods for the common instruction patterns. Used heavily by tests and
//! benchmarks.

use super::{
    IrBlockId, IrFunction, IrFunctionId, IrFunctionSignature, IrId, IrInstruction, IrModule,
    IrSourceLocation, IrTerminator, IrType, IrValue,
};

/// Builder for constructing IR modules
pub struct IrBuilder {
    /// The module being built
    pub module: IrModule,

    /// Current function being built
    current_function: Option<IrFunctionId>,

    /// Current basic block being built
    current_block: Option<IrBlockId>,

    /// Source location context
    current_source_location: IrSourceLocation,
}

impl IrBuilder {
    /// Create a new IR builder
    pub fn new(module_name: String, source_file: String) -> Self {
        Self {
            module: IrModule::new(module_name, source_file),
            current_function: None,
            current_block: None,
            current_source_location: IrSourceLocation::unknown(),
        }
    }

    /// Set the current source location for debugging
    pub fn set_source_location(&mut self, loc: IrSourceLocation) {
        self.current_source_location = loc;
    }

    // === Module Building ===

    /// Start building a new function
    pub fn start_function(&mut self, name: String, signature: IrFunctionSignature) -> IrFunctionId {
        let id = self.module.alloc_function_id();
        let function = IrFunction::new(id, name, signature);
        self.current_function = Some(id);
        self.current_block = Some(function.entry_block());
        self.module.add_function(function);
        id
    }

    /// Finish building the current function
    pub fn finish_function(&mut self) {
        self.current_function = None;
        self.current_block = None;
    }

    /// Get the current function
    pub fn current_function(&self) -> Option<&IrFunction> {
        self.current_function
            .and_then(|id| self.module.functions.get(&id))
    }

    /// Get the current function mutably
    pub fn current_function_mut(&mut self) -> Option<&mut IrFunction> {
        self.current_function
            .and_then(move |id| self.module.functions.get_mut(&id))
    }

    // === Block Building ===

    /// Create a new basic block in the current function
    pub fn create_block(&mut self) -> Option<IrBlockId> {
        self.current_function_mut().map(|f| f.cfg.create_block())
    }

    /// Create a new basic block with a label
    pub fn create_block_with_label(&mut self, label: String) -> Option<IrBlockId> {
        let block_id = self.create_block()?;
        if let Some(block) = self
            .current_function_mut()
            .and_then(|f| f.cfg.get_block_mut(block_id))
        {
            block.label = Some(label);
        }
        Some(block_id)
    }

    /// Switch to building in a different block
    pub fn switch_to_block(&mut self, block: IrBlockId) {
        self.current_block = Some(block);
    }

    /// Get the current block
    pub fn current_block(&self) -> Option<IrBlockId> {
        self.current_block
    }

    // === Register Management ===

    /// Allocate a new register in the current function
    pub fn alloc_reg(&mut self) -> Option<IrId> {
        self.current_function_mut().map(|f| f.alloc_reg())
    }

    // === Instruction Building ===

    fn push(&mut self, inst: IrInstruction) -> Option<()> {
        let block_id = self.current_block?;
        let block = self
            .current_function_mut()
            .and_then(|f| f.cfg.get_block_mut(block_id))?;
        block.add_instruction(inst);
        Some(())
    }

    /// Load a constant into a fresh register
    pub fn build_const(&mut self, value: IrValue) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.push(IrInstruction::Const { dest, value })?;
        Some(dest)
    }

    /// Allocate a stack slot of the given type
    pub fn build_alloc(&mut self, ty: IrType) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.push(IrInstruction::Alloc { dest, ty })?;
        Some(dest)
    }

    /// Store a value through a pointer
    pub fn build_store(&mut self, ptr: IrId, value: IrId) -> Option<()> {
        self.push(IrInstruction::Store { ptr, value })
    }

    /// Load a value through a pointer
    pub fn build_load(&mut self, ptr: IrId, ty: IrType) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.push(IrInstruction::Load { dest, ptr, ty })?;
        Some(dest)
    }

    /// Direct call producing a value
    pub fn build_call(&mut self, callee: &str, args: Vec<IrId>) -> Option<IrId> {
        let dest = self.alloc_reg()?;
        self.push(IrInstruction::CallDirect {
            dest: Some(dest),
            callee: callee.to_string(),
            args,
        })?;
        Some(dest)
    }

    /// Direct call with no result
    pub fn build_void_call(&mut self, callee: &str, args: Vec<IrId>) -> Option<()> {
        self.push(IrInstruction::CallDirect {
            dest: None,
            callee: callee.to_string(),
            args,
        })
    }

    /// Indirect call through a function pointer, no result
    pub fn build_indirect_call(&mut self, func_ptr: IrId, args: Vec<IrId>) -> Option<()> {
        self.push(IrInstruction::CallIndirect {
            dest: None,
            func_ptr,
            args,
        })
    }

    // === Terminators ===

    fn terminate(&mut self, term: IrTerminator) -> Option<()> {
        let block_id = self.current_block?;
        let successors: Vec<IrBlockId> = match &term {
            IrTerminator::Branch { target } => vec![*target],
            IrTerminator::CondBranch {
                true_target,
                false_target,
                ..
            } => vec![*true_target, *false_target],
            IrTerminator::Switch { cases, default, .. } => {
                let mut succs: Vec<_> = cases.iter().map(|(_, t)| *t).collect();
                succs.push(*default);
                succs
            }
            IrTerminator::Return { .. } | IrTerminator::Unreachable => Vec::new(),
        };

        let function = self.current_function_mut()?;
        function.cfg.get_block_mut(block_id)?.set_terminator(term);
        for succ in successors {
            function.cfg.connect_blocks(block_id, succ);
        }
        Some(())
    }

    /// Unconditional branch to another block
    pub fn build_branch(&mut self, target: IrBlockId) -> Option<()> {
        self.terminate(IrTerminator::Branch { target })
    }

    /// Conditional branch
    pub fn build_cond_branch(
        &mut self,
        condition: IrId,
        true_target: IrBlockId,
        false_target: IrBlockId,
    ) -> Option<()> {
        self.terminate(IrTerminator::CondBranch {
            condition,
            true_target,
            false_target,
        })
    }

    /// Return from the current function
    pub fn build_return(&mut self, value: Option<IrId>) -> Option<()> {
        self.terminate(IrTerminator::Return { value })
    }
}
