//! IR Instructions
//!
//! Defines the instruction set for the intermediate representation. Calls
//! come in two flavors: `CallDirect` carries the resolved callee by its
//! mangled name (the handle the lifetime pass classifies on), and
//! `CallIndirect` goes through a function-pointer register with no name to
//! classify.

use super::{IrId, IrType, IrValue};
use serde::{Deserialize, Serialize};

/// IR instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrInstruction {
    // === Value Operations ===
    /// Load constant value
    Const { dest: IrId, value: IrValue },

    /// Copy value from one register to another
    Copy { dest: IrId, src: IrId },

    /// Load value from memory
    Load { dest: IrId, ptr: IrId, ty: IrType },

    /// Store value to memory
    Store { ptr: IrId, value: IrId },

    // === Arithmetic Operations ===
    /// Binary arithmetic operation
    BinOp {
        dest: IrId,
        op: BinaryOp,
        left: IrId,
        right: IrId,
    },

    /// Unary operation
    UnOp {
        dest: IrId,
        op: UnaryOp,
        operand: IrId,
    },

    /// Compare operation
    Cmp {
        dest: IrId,
        op: CompareOp,
        left: IrId,
        right: IrId,
    },

    // === Memory Operations ===
    /// Allocate a stack slot
    Alloc { dest: IrId, ty: IrType },

    // === Type Operations ===
    /// Type cast
    Cast {
        dest: IrId,
        src: IrId,
        from_ty: IrType,
        to_ty: IrType,
    },

    /// Select (ternary) operation
    Select {
        dest: IrId,
        condition: IrId,
        true_val: IrId,
        false_val: IrId,
    },

    // === Calls ===
    /// Call to a function resolved by mangled name
    CallDirect {
        dest: Option<IrId>,
        callee: String,
        args: Vec<IrId>,
    },

    /// Call through a function pointer; the callee cannot be resolved
    CallIndirect {
        dest: Option<IrId>,
        func_ptr: IrId,
        args: Vec<IrId>,
    },
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Comparison operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl IrInstruction {
    /// Get the destination register if this instruction produces a value
    pub fn dest(&self) -> Option<IrId> {
        match self {
            IrInstruction::Const { dest, .. }
            | IrInstruction::Copy { dest, .. }
            | IrInstruction::Load { dest, .. }
            | IrInstruction::BinOp { dest, .. }
            | IrInstruction::UnOp { dest, .. }
            | IrInstruction::Cmp { dest, .. }
            | IrInstruction::Alloc { dest, .. }
            | IrInstruction::Cast { dest, .. }
            | IrInstruction::Select { dest, .. } => Some(*dest),

            IrInstruction::CallDirect { dest, .. } | IrInstruction::CallIndirect { dest, .. } => {
                *dest
            }

            IrInstruction::Store { .. } => None,
        }
    }

    /// Get all registers read by this instruction.
    ///
    /// The match is exhaustive on purpose: an instruction kind added to the
    /// IR must declare its operands here before the crate compiles again, so
    /// it can never slip past the conservative invalidation in the passes.
    pub fn uses(&self) -> Vec<IrId> {
        match self {
            IrInstruction::Const { .. } => Vec::new(),
            IrInstruction::Copy { src, .. } => vec![*src],
            IrInstruction::Load { ptr, .. } => vec![*ptr],
            IrInstruction::Store { ptr, value } => vec![*ptr, *value],
            IrInstruction::BinOp { left, right, .. } => vec![*left, *right],
            IrInstruction::UnOp { operand, .. } => vec![*operand],
            IrInstruction::Cmp { left, right, .. } => vec![*left, *right],
            IrInstruction::Alloc { .. } => Vec::new(),
            IrInstruction::Cast { src, .. } => vec![*src],
            IrInstruction::Select {
                condition,
                true_val,
                false_val,
                ..
            } => vec![*condition, *true_val, *false_val],
            IrInstruction::CallDirect { args, .. } => args.clone(),
            IrInstruction::CallIndirect { func_ptr, args, .. } => {
                let mut uses = vec![*func_ptr];
                uses.extend(args.iter().copied());
                uses
            }
        }
    }

    /// Check if this is a call instruction (direct or indirect)
    pub fn is_call(&self) -> bool {
        matches!(
            self,
            IrInstruction::CallDirect { .. } | IrInstruction::CallIndirect { .. }
        )
    }

    /// Check if this instruction has side effects
    pub fn has_side_effects(&self) -> bool {
        matches!(
            self,
            IrInstruction::Store { .. }
                | IrInstruction::CallDirect { .. }
                | IrInstruction::CallIndirect { .. }
        )
    }
}
