//! IR Functions
//!
//! Function representation: signature, register allocation, and the control
//! flow graph that holds the body.

use super::{IrBlockId, IrControlFlowGraph, IrId, IrSourceLocation, IrType, Linkage};
use serde::{Deserialize, Serialize};

/// IR function representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrFunction {
    /// Unique identifier for this function
    pub id: IrFunctionId,

    /// Function name (mangled if necessary)
    pub name: String,

    /// Function signature
    pub signature: IrFunctionSignature,

    /// Control flow graph (function body)
    pub cfg: IrControlFlowGraph,

    /// Linkage type
    pub linkage: Linkage,

    /// Source location for debugging
    pub source_location: IrSourceLocation,

    /// Next available register ID
    pub next_reg_id: u32,
}

/// Unique identifier for functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrFunctionId(pub u32);

impl std::fmt::Display for IrFunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn{}", self.0)
    }
}

/// Function signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrFunctionSignature {
    /// Parameter types and names
    pub parameters: Vec<IrParameter>,

    /// Return type
    pub return_type: IrType,
}

impl IrFunctionSignature {
    pub fn new(parameters: Vec<IrParameter>, return_type: IrType) -> Self {
        Self {
            parameters,
            return_type,
        }
    }

    /// A signature with no parameters returning void.
    pub fn void() -> Self {
        Self::new(Vec::new(), IrType::Void)
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrParameter {
    /// Parameter name
    pub name: String,

    /// Parameter type
    pub ty: IrType,

    /// Register assigned to this parameter
    pub reg: IrId,
}

impl IrParameter {
    pub fn new(name: impl Into<String>, ty: IrType) -> Self {
        Self {
            name: name.into(),
            ty,
            reg: IrId::invalid(),
        }
    }
}

impl IrFunction {
    /// Create a new function. Parameter registers are allocated up front.
    pub fn new(id: IrFunctionId, name: String, signature: IrFunctionSignature) -> Self {
        let mut function = Self {
            id,
            name,
            signature,
            cfg: IrControlFlowGraph::new(),
            linkage: Linkage::Private,
            source_location: IrSourceLocation::unknown(),
            next_reg_id: 0,
        };

        let param_count = function.signature.parameters.len();
        for i in 0..param_count {
            let reg = function.alloc_reg();
            function.signature.parameters[i].reg = reg;
        }

        function
    }

    /// Allocate a new register
    pub fn alloc_reg(&mut self) -> IrId {
        let id = IrId::new(self.next_reg_id);
        self.next_reg_id += 1;
        id
    }

    /// Get the entry block
    pub fn entry_block(&self) -> IrBlockId {
        self.cfg.entry_block
    }

    /// Get parameter register by index
    pub fn get_param_reg(&self, index: usize) -> Option<IrId> {
        self.signature.parameters.get(index).map(|p| p.reg)
    }

    /// Total number of (non-terminator) instructions in the body
    pub fn instruction_count(&self) -> usize {
        self.cfg
            .blocks
            .values()
            .map(|block| block.instructions.len())
            .sum()
    }

    /// Check if this function contains any call instructions
    pub fn is_leaf(&self) -> bool {
        !self
            .cfg
            .blocks
            .values()
            .flat_map(|block| &block.instructions)
            .any(|inst| inst.is_call())
    }

    /// Verify function integrity
    pub fn verify(&self) -> Result<(), String> {
        // Extern declarations carry no body.
        if self.cfg.blocks.is_empty() {
            return Ok(());
        }

        self.cfg.verify()
    }
}
