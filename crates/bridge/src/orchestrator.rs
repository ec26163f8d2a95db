//! Drives the front-end over one batch of sources.
//!
//! Code generation stays disabled; every unit still goes through scope
//! building, attribution and flow analysis. A crash in one unit only loses
//! that unit's tree. Running out of memory loses the batch, but the caller
//! still gets a [`CompilationResult`] back.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use frontend::compiler::DEFAULT_MAX_TREE_NODES;
use frontend::{
    CompilationUnit, CompileFault, Compiler, CompilerOptions, CompilerRequestor, NameEnvironment,
    Problem, ProblemId, SourceUnit, StandardProcessor, UnitContext, UnitProcessor, UnitResult,
};
use tracing::{debug, error, warn};

use crate::result::CompilationResult;
use crate::WarnedFiles;

#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Render problem messages and dump every problem to stdout.
    pub debug: bool,
    pub max_tree_nodes: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            debug: false,
            max_tree_nodes: DEFAULT_MAX_TREE_NODES,
        }
    }
}

impl BridgeOptions {
    fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            compute_messages: self.debug,
            max_tree_nodes: self.max_tree_nodes,
            ..CompilerOptions::default()
        }
    }
}

/// Compiles `units` against `classpath` (earlier entries win).
pub fn compile(
    units: Vec<SourceUnit>,
    classpath: &[PathBuf],
    options: &BridgeOptions,
    warned: &mut WarnedFiles,
) -> CompilationResult {
    compile_with(units, classpath, options, warned, &mut StandardProcessor)
}

/// Same as [`compile`] with a custom per-unit processor.
pub fn compile_with(
    units: Vec<SourceUnit>,
    classpath: &[PathBuf],
    options: &BridgeOptions,
    warned: &mut WarnedFiles,
    processor: &mut dyn UnitProcessor,
) -> CompilationResult {
    let names = NameEnvironment::new(classpath);
    let mut compiler = Compiler::new(options.compiler_options(), names);
    let mut processor = IsolatingProcessor {
        inner: processor,
        warned,
    };
    let mut requestor = BridgeRequestor::new(options.debug);
    debug!(units = units.len(), classpath = classpath.len(), "compiling batch");

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        compiler.compile(&units, &mut processor, &mut requestor)
    }));
    let failure = match outcome {
        Ok(Ok(())) => {
            let (names, env) = compiler.into_environments();
            debug!(
                trees = requestor.trees.len(),
                problems = requestor.problems.len(),
                had_errors = requestor.had_errors,
                "batch compiled"
            );
            return CompilationResult::new(
                requestor.trees,
                names,
                env,
                requestor.problems,
                requestor.had_errors,
            );
        }
        Ok(Err(fault)) => fault,
        Err(payload) => CompileFault::Internal {
            file: None,
            message: panic_message(payload.as_ref()),
        },
    };

    // Release everything the batch allocated before logging.
    let problems = std::mem::take(&mut requestor.problems);
    drop(requestor);
    drop(processor);
    drop(compiler);
    drop(units);
    if failure.is_out_of_memory() {
        error!(error = %failure, "out of memory, dropping the batch");
    } else {
        error!(error = %failure, "front-end aborted the batch");
    }
    CompilationResult::degraded(problems)
}

/// Runs the wrapped processor, turning panics and internal faults of one
/// unit into a lost tree. Each crashing file is logged once per
/// [`WarnedFiles`].
struct IsolatingProcessor<'a, 'p> {
    inner: &'a mut (dyn UnitProcessor + 'p),
    warned: &'a mut WarnedFiles,
}

impl UnitProcessor for IsolatingProcessor<'_, '_> {
    fn process(&mut self, cx: UnitContext<'_>) -> Result<(), CompileFault> {
        let path = cx.source.path().to_path_buf();
        let inner = &mut *self.inner;
        let fault = match catch_unwind(AssertUnwindSafe(move || inner.process(cx))) {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(fault)) if fault.is_out_of_memory() => return Err(fault),
            Ok(Err(fault)) => fault,
            Err(payload) => CompileFault::Internal {
                file: Some(path.clone()),
                message: panic_message(payload.as_ref()),
            },
        };
        if self.warned.warn_once(&path) {
            warn!(file = %path.display(), error = %fault, "front-end crashed, skipping file");
        }
        Err(fault)
    }
}

struct BridgeRequestor {
    debug: bool,
    trees: HashMap<SourceUnit, CompilationUnit>,
    problems: Vec<Problem>,
    had_errors: bool,
}

impl BridgeRequestor {
    fn new(debug: bool) -> Self {
        Self {
            debug,
            trees: HashMap::new(),
            problems: Vec::new(),
            had_errors: false,
        }
    }
}

impl CompilerRequestor for BridgeRequestor {
    fn accept_result(&mut self, mut result: UnitResult) {
        for problem in &mut result.problems {
            if problem.id == ProblemId::DUPLICATE_TYPES {
                problem.severity = problem.severity.downgrade();
            }
        }
        if result.has_errors() {
            self.had_errors = true;
        }
        if self.debug {
            for problem in &result.problems {
                println!(
                    "{}:{}:{}: {} {} {}",
                    problem.file.display(),
                    problem.line,
                    problem.column,
                    problem.severity.label(),
                    problem.id,
                    problem.render()
                );
            }
        }
        self.problems.append(&mut result.problems);
        if let Some(tree) = result.tree {
            self.trees.insert(result.source, tree);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(path: &str, text: &str) -> SourceUnit {
        SourceUnit::new(path, text)
    }

    #[test]
    fn duplicate_types_do_not_flip_had_errors() {
        let mut warned = WarnedFiles::default();
        let result = compile(
            vec![
                unit("p/A.java", "package p; class A {}"),
                unit("p/A2.java", "package p; class A {}"),
            ],
            &[],
            &BridgeOptions::default(),
            &mut warned,
        );
        assert!(!result.had_errors());
        let duplicate = result
            .problems()
            .iter()
            .find(|p| p.id == ProblemId::DUPLICATE_TYPES)
            .expect("duplicate reported");
        assert!(!duplicate.is_error());
    }

    #[test]
    fn real_errors_set_had_errors() {
        let mut warned = WarnedFiles::default();
        let result = compile(
            vec![unit("A.java", "class A extends Missing {}")],
            &[],
            &BridgeOptions::default(),
            &mut warned,
        );
        assert!(result.had_errors());
        assert!(result.tree(std::path::Path::new("A.java")).is_some());
    }

    #[test]
    fn out_of_memory_degrades_the_batch() {
        let mut warned = WarnedFiles::default();
        let options = BridgeOptions {
            max_tree_nodes: 4,
            ..BridgeOptions::default()
        };
        let result = compile(
            vec![unit("A.java", "class A { int a = 1; int b = 2; void f() { a = b; } }")],
            &[],
            &options,
            &mut warned,
        );
        assert!(result.had_errors());
        assert!(result.env().is_none());
        assert_eq!(result.trees().count(), 0);
    }

    struct Panicking;

    impl UnitProcessor for Panicking {
        fn process(&mut self, cx: UnitContext<'_>) -> Result<(), CompileFault> {
            if cx.source.path().ends_with("Bad.java") {
                panic!("attribution blew up");
            }
            StandardProcessor.process(cx)
        }
    }

    #[test]
    fn a_crashing_unit_only_loses_its_tree() {
        let mut warned = WarnedFiles::default();
        let units = vec![
            unit("Bad.java", "class Bad {}"),
            unit("Good.java", "class Good { void f() { g(); } }"),
        ];
        for _ in 0..2 {
            let result = compile_with(
                units.clone(),
                &[],
                &BridgeOptions::default(),
                &mut warned,
                &mut Panicking,
            );
            assert!(result.tree(std::path::Path::new("Bad.java")).is_none());
            assert!(result.tree(std::path::Path::new("Good.java")).is_some());
            // Diagnostics of the other file survive.
            assert!(result
                .problems()
                .iter()
                .any(|p| p.id == ProblemId::UNDEFINED_METHOD));
        }
        assert_eq!(warned.len(), 1);
        assert!(warned.contains(std::path::Path::new("Bad.java")));
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "panic");
    }
}
