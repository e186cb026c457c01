//! End-to-end tests for the optimization pipeline: modules built through
//! `IrBuilder`, run through the `PassManager`, checked via counts and dumps.

use smartptr_opt::ir::dump::dump_module;
use smartptr_opt::ir::optimization::{OptimizationPass, PassManager};
use smartptr_opt::ir::smart_ptr_lifetime::{
    SmartPtrLifetimePass, STAT_DESTRUCTORS_REMOVED,
};
use smartptr_opt::ir::{IrBuilder, IrFunctionSignature, IrId, IrModule, IrType, IrValue};
use smartptr_opt::logging;

const MOVE: &str = "_Z4moveP__SEMANTICS_unique_ptr_move";
const DESTROY: &str = "_Z7destroyP__SEMANTICS_unique_ptr_destroy";

fn smart_ptr_slot(builder: &mut IrBuilder) -> IrId {
    builder
        .build_alloc(IrType::ptr_to_named("unique_ptr"))
        .unwrap()
}

/// A function with one move and one provably-redundant destroy.
fn add_redundant_function(builder: &mut IrBuilder, name: &str) {
    builder.start_function(name.to_string(), IrFunctionSignature::void());
    let to = smart_ptr_slot(builder);
    let from = smart_ptr_slot(builder);
    builder.build_void_call(MOVE, vec![to, from]).unwrap();
    builder.build_void_call(DESTROY, vec![from]).unwrap();
    builder.build_void_call(DESTROY, vec![to]).unwrap(); // real, must stay
    builder.build_return(None).unwrap();
    builder.finish_function();
}

fn add_clean_function(builder: &mut IrBuilder, name: &str) {
    builder.start_function(name.to_string(), IrFunctionSignature::void());
    let x = builder.build_const(IrValue::I32(1)).unwrap();
    builder.build_void_call("_Z3usei", vec![x]).unwrap();
    builder.build_return(None).unwrap();
    builder.finish_function();
}

#[test]
fn pipeline_removes_redundant_destructors_across_functions() {
    logging::init_test();

    let mut builder = IrBuilder::new("pipeline".to_string(), "pipeline.cpp".to_string());
    add_redundant_function(&mut builder, "first");
    add_redundant_function(&mut builder, "second");
    add_clean_function(&mut builder, "clean");
    let mut module = builder.module;

    let before = module.instruction_count();
    let result = PassManager::default_pipeline().run(&mut module);

    assert!(result.modified);
    assert_eq!(result.stats[STAT_DESTRUCTORS_REMOVED], 2);
    assert_eq!(module.instruction_count(), before - 2);
    assert!(module.verify().is_ok());

    // Each function keeps exactly one (real) destructor call.
    let text = dump_module(&module);
    assert_eq!(text.matches(DESTROY).count(), 2);
}

#[test]
fn pipeline_combines_lifetime_and_dce() {
    logging::init_test();

    let mut builder = IrBuilder::new("combined".to_string(), "combined.cpp".to_string());
    builder.start_function("f".to_string(), IrFunctionSignature::void());
    let to = smart_ptr_slot(&mut builder);
    let from = smart_ptr_slot(&mut builder);
    let _unused = builder.build_const(IrValue::I64(0)).unwrap(); // DCE fodder
    builder.build_void_call(MOVE, vec![to, from]).unwrap();
    builder.build_void_call(DESTROY, vec![from]).unwrap();
    builder.build_return(None).unwrap();
    builder.finish_function();
    let mut module = builder.module;

    let before = module.instruction_count();
    let result = PassManager::default_pipeline().run(&mut module);

    // One redundant destructor plus one dead constant.
    assert_eq!(result.instructions_eliminated, 2);
    assert_eq!(module.instruction_count(), before - 2);
}

#[test]
fn pipeline_reaches_fixpoint_on_clean_module() {
    logging::init_test();

    let mut builder = IrBuilder::new("clean".to_string(), "clean.cpp".to_string());
    add_clean_function(&mut builder, "only");
    let mut module = builder.module;

    let snapshot = module.clone();
    let result = PassManager::default_pipeline().run(&mut module);

    assert!(!result.modified);
    assert_eq!(module, snapshot);
}

#[test]
fn pass_reports_changed_flag_per_module() {
    let mut builder = IrBuilder::new("flag".to_string(), "flag.cpp".to_string());
    add_redundant_function(&mut builder, "f");
    let mut module: IrModule = builder.module;

    let mut pass = SmartPtrLifetimePass::new();
    assert!(pass.run_on_module(&mut module).modified);
    // Second run finds nothing left to remove.
    assert!(!pass.run_on_module(&mut module).modified);
}

#[test]
fn removed_calls_disappear_from_dump() {
    let mut builder = IrBuilder::new("dump".to_string(), "dump.cpp".to_string());
    builder.start_function("f".to_string(), IrFunctionSignature::void());
    let to = smart_ptr_slot(&mut builder);
    let from = smart_ptr_slot(&mut builder);
    builder.build_void_call(MOVE, vec![to, from]).unwrap();
    builder.build_void_call(DESTROY, vec![from]).unwrap();
    builder.build_return(None).unwrap();
    builder.finish_function();
    let mut module = builder.module;

    assert!(dump_module(&module).contains(DESTROY));
    SmartPtrLifetimePass::new().run_on_module(&mut module);
    let after = dump_module(&module);
    assert!(!after.contains(DESTROY));
    assert!(after.contains(MOVE));
}
