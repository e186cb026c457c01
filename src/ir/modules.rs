//! IR Modules
//!
//! The top-level compilation unit: a named container of functions. Functions
//! are kept in insertion order so passes and dumps process them
//! deterministically.

use super::{IrFunction, IrFunctionId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// IR module - represents a compilation unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrModule {
    /// Module name
    pub name: String,

    /// Source file path
    pub source_file: String,

    /// Functions defined in this module
    pub functions: IndexMap<IrFunctionId, IrFunction>,

    /// Next available function ID
    pub next_function_id: u32,
}

impl IrModule {
    /// Create a new empty module
    pub fn new(name: String, source_file: String) -> Self {
        Self {
            name,
            source_file,
            functions: IndexMap::new(),
            next_function_id: 0,
        }
    }

    /// Allocate a new function ID
    pub fn alloc_function_id(&mut self) -> IrFunctionId {
        let id = IrFunctionId(self.next_function_id);
        self.next_function_id += 1;
        id
    }

    /// Add a function to the module
    pub fn add_function(&mut self, function: IrFunction) {
        self.functions.insert(function.id, function);
    }

    /// Get a function by ID
    pub fn get_function(&self, id: IrFunctionId) -> Option<&IrFunction> {
        self.functions.get(&id)
    }

    /// Get a mutable function by ID
    pub fn get_function_mut(&mut self, id: IrFunctionId) -> Option<&mut IrFunction> {
        self.functions.get_mut(&id)
    }

    /// Look up a function by name
    pub fn function_by_name(&self, name: &str) -> Option<&IrFunction> {
        self.functions.values().find(|f| f.name == name)
    }

    /// Total instruction count across all functions
    pub fn instruction_count(&self) -> usize {
        self.functions
            .values()
            .map(|f| f.instruction_count())
            .sum()
    }

    /// Serialize the module to JSON (snapshots for debugging/tooling)
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Verify all functions in the module
    pub fn verify(&self) -> Result<(), String> {
        for function in self.functions.values() {
            function
                .verify()
                .map_err(|e| format!("{}: {}", function.name, e))?;
        }
        Ok(())
    }
}
