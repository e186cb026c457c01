//! Mid-level Intermediate Representation (IR)
//!
//! This module defines a small, explicit intermediate representation used as
//! the substrate for the optimization passes in this crate. The IR is
//! designed to be:
//! - Simple and explicit (no implicit operations)
//! - Ordered: functions hold basic blocks in layout order, blocks hold
//!   instructions in program order
//! - Easy to transform in place

pub mod blocks;
pub mod builder;
pub mod dump;
pub mod functions;
pub mod instructions;
pub mod modules;
pub mod optimization;
pub mod smart_ptr_lifetime;
pub mod types;

pub use blocks::*;
pub use builder::*;
pub use functions::*;
pub use instructions::*;
pub use modules::*;
pub use types::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// IR version for compatibility checking
pub const IR_VERSION: u32 = 1;

/// Unique identifier for IR values (registers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrId(u32);

impl IrId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn invalid() -> Self {
        Self(u32::MAX)
    }

    pub fn is_valid(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for IrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Source location information for debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrSourceLocation {
    pub file_id: u32,
    pub line: u32,
    pub column: u32,
}

impl IrSourceLocation {
    pub fn unknown() -> Self {
        Self {
            file_id: 0,
            line: 0,
            column: 0,
        }
    }
}

/// Linkage type for symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    /// Private to the module
    Private,
    /// Available within the package
    Internal,
    /// Publicly exported
    Public,
    /// External symbol (defined elsewhere)
    External,
}
