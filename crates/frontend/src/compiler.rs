//! Batch compiler: parses every unit, builds scopes across the batch, then
//! hands each unit to a [`UnitProcessor`] and its result to a
//! [`CompilerRequestor`].

use tracing::{debug, warn};

use crate::ast::CompilationUnit;
use crate::lookup::LookupEnvironment;
use crate::name_env::NameEnvironment;
use crate::parser::JavaParser;
use crate::problem::{Problem, ProblemFactory, ProblemId};
use crate::scope::{self, ParsedUnit};
use crate::source::SourceUnit;
use crate::{attribution, flow, CompileFault};

/// Default cap on the number of tree nodes a batch may allocate.
pub const DEFAULT_MAX_TREE_NODES: usize = 4_000_000;

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub source_level: String,
    pub report_warnings: bool,
    pub parse_doc_comments: bool,
    pub store_annotations: bool,
    pub generate_code: bool,
    pub compute_messages: bool,
    /// Exceeding this many tree nodes in one batch aborts it with
    /// [`CompileFault::OutOfMemory`].
    pub max_tree_nodes: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            source_level: "1.8".to_string(),
            report_warnings: false,
            parse_doc_comments: false,
            store_annotations: true,
            generate_code: false,
            compute_messages: false,
            max_tree_nodes: DEFAULT_MAX_TREE_NODES,
        }
    }
}

/// Receives each unit once its problems have been collected.
pub trait CodeGenerator {
    fn generate(&mut self, unit: &CompilationUnit, env: &LookupEnvironment) -> Result<(), CompileFault>;
}

/// Generator that produces nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipCodeGeneration;

impl CodeGenerator for SkipCodeGeneration {
    fn generate(&mut self, _: &CompilationUnit, _: &LookupEnvironment) -> Result<(), CompileFault> {
        Ok(())
    }
}

/// Everything a processor may touch while handling one unit.
pub struct UnitContext<'a> {
    pub source: &'a SourceUnit,
    pub tree: &'a mut CompilationUnit,
    pub env: &'a mut LookupEnvironment,
    pub names: &'a NameEnvironment,
    pub factory: &'a ProblemFactory,
    pub problems: &'a mut Vec<Problem>,
    pub generator: &'a mut dyn CodeGenerator,
    pub options: &'a CompilerOptions,
}

/// Per-unit processing step run after scopes are built.
pub trait UnitProcessor {
    fn process(&mut self, cx: UnitContext<'_>) -> Result<(), CompileFault>;
}

/// Attribution, flow analysis and, when enabled, code generation.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardProcessor;

impl UnitProcessor for StandardProcessor {
    fn process(&mut self, mut cx: UnitContext<'_>) -> Result<(), CompileFault> {
        attribution::attribute(&mut cx)?;
        flow::analyze(&mut cx);
        if cx.options.generate_code {
            cx.generator.generate(cx.tree, cx.env)?;
        }
        Ok(())
    }
}

/// Outcome for one source unit. `tree` is `None` when the unit could not
/// be parsed or processing failed internally.
#[derive(Debug)]
pub struct UnitResult {
    pub source: SourceUnit,
    pub tree: Option<CompilationUnit>,
    pub problems: Vec<Problem>,
}

impl UnitResult {
    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(Problem::is_error)
    }
}

pub trait CompilerRequestor {
    fn accept_result(&mut self, result: UnitResult);
}

/// Requestor that keeps every result.
#[derive(Debug, Default)]
pub struct ResultCollector {
    pub results: Vec<UnitResult>,
}

impl CompilerRequestor for ResultCollector {
    fn accept_result(&mut self, result: UnitResult) {
        self.results.push(result);
    }
}

pub struct Compiler {
    options: CompilerOptions,
    factory: ProblemFactory,
    names: NameEnvironment,
    env: LookupEnvironment,
    generator: Box<dyn CodeGenerator>,
}

impl Compiler {
    pub fn new(options: CompilerOptions, names: NameEnvironment) -> Self {
        let factory = ProblemFactory::new(options.compute_messages, options.report_warnings);
        Self {
            options,
            factory,
            names,
            env: LookupEnvironment::new(),
            generator: Box::new(SkipCodeGeneration),
        }
    }

    pub fn with_generator(mut self, generator: Box<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn environment(&self) -> &LookupEnvironment {
        &self.env
    }

    pub fn names(&self) -> &NameEnvironment {
        &self.names
    }

    /// Gives up the compiler, keeping its environments.
    pub fn into_environments(self) -> (NameEnvironment, LookupEnvironment) {
        (self.names, self.env)
    }

    /// Compiles `units` as one batch. Results are delivered to `requestor`
    /// in input order, except units that fail to parse, which are delivered
    /// right away. `OutOfMemory` aborts the batch and is returned; other
    /// faults only lose the affected unit's tree.
    pub fn compile(
        &mut self,
        units: &[SourceUnit],
        processor: &mut dyn UnitProcessor,
        requestor: &mut dyn CompilerRequestor,
    ) -> Result<(), CompileFault> {
        let mut parser = JavaParser::new()?;
        let mut parsed = Vec::with_capacity(units.len());
        let mut allocated = 0usize;
        for unit in units {
            let tree = match parser.parse(unit) {
                Ok(tree) => tree,
                Err(fault) if fault.is_out_of_memory() => return Err(fault),
                Err(fault) => {
                    warn!(file = %unit.path().display(), error = %fault, "parse failed");
                    requestor.accept_result(UnitResult {
                        source: unit.clone(),
                        tree: None,
                        problems: Vec::new(),
                    });
                    continue;
                }
            };
            allocated += tree.len();
            if allocated > self.options.max_tree_nodes {
                return Err(CompileFault::OutOfMemory {
                    file: Some(unit.path().to_path_buf()),
                });
            }
            let problems = self.syntax_problems(unit, &tree);
            parsed.push(ParsedUnit {
                source: unit.clone(),
                tree,
                problems,
            });
        }
        debug!(units = parsed.len(), nodes = allocated, "parsed batch");

        scope::build(
            &mut parsed,
            &mut self.env,
            &self.names,
            &self.factory,
            &self.options,
        );

        for ParsedUnit {
            source,
            mut tree,
            mut problems,
        } in parsed
        {
            let outcome = processor.process(UnitContext {
                source: &source,
                tree: &mut tree,
                env: &mut self.env,
                names: &self.names,
                factory: &self.factory,
                problems: &mut problems,
                generator: self.generator.as_mut(),
                options: &self.options,
            });
            match outcome {
                Ok(()) => requestor.accept_result(UnitResult {
                    source,
                    tree: Some(tree),
                    problems,
                }),
                Err(fault) if fault.is_out_of_memory() => return Err(fault),
                Err(fault) => {
                    debug!(file = %source.path().display(), error = %fault, "unit processing failed");
                    requestor.accept_result(UnitResult {
                        source,
                        tree: None,
                        problems,
                    });
                }
            }
        }
        Ok(())
    }

    fn syntax_problems(&self, unit: &SourceUnit, tree: &CompilationUnit) -> Vec<Problem> {
        tree.syntax_errors
            .iter()
            .map(|span| {
                let token: String = unit
                    .contents()
                    .get(span.start..span.end)
                    .unwrap_or_default()
                    .chars()
                    .take(32)
                    .collect();
                self.factory
                    .error(ProblemId::PARSING_ERROR, unit.path(), *span, vec![token])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::compile_with_options;

    #[test]
    fn syntax_errors_become_problems() {
        let (results, _) = compile_with_options(
            CompilerOptions::default(),
            &[("A.java", "class A { void f() { int = ; } }")],
        );
        assert!(results[0].tree.is_some());
        assert!(results[0].problems.iter().any(|p| p.id == ProblemId::PARSING_ERROR));
        assert!(results[0].has_errors());
    }

    #[test]
    fn node_budget_aborts_the_batch() {
        let mut compiler = Compiler::new(
            CompilerOptions {
                max_tree_nodes: 10,
                ..CompilerOptions::default()
            },
            NameEnvironment::default(),
        );
        let units = vec![
            SourceUnit::new("A.java", "class A { int a; int b; int c; void f() { a = b + c; } }"),
            SourceUnit::new("B.java", "class B {}"),
        ];
        let mut collector = ResultCollector::default();
        let fault = compiler
            .compile(&units, &mut StandardProcessor, &mut collector)
            .unwrap_err();
        assert!(fault.is_out_of_memory());
        assert_eq!(fault.file(), Some(std::path::Path::new("A.java")));
        assert!(collector.results.is_empty());
    }

    struct Failing;

    impl UnitProcessor for Failing {
        fn process(&mut self, cx: UnitContext<'_>) -> Result<(), CompileFault> {
            if cx.source.path().ends_with("Bad.java") {
                return Err(CompileFault::Internal {
                    file: Some(cx.source.path().to_path_buf()),
                    message: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn internal_faults_only_lose_the_unit() {
        let mut compiler = Compiler::new(CompilerOptions::default(), NameEnvironment::default());
        let units = vec![
            SourceUnit::new("Bad.java", "class Bad {}"),
            SourceUnit::new("Good.java", "class Good {}"),
        ];
        let mut collector = ResultCollector::default();
        compiler.compile(&units, &mut Failing, &mut collector).unwrap();
        assert_eq!(collector.results.len(), 2);
        assert!(collector.results[0].tree.is_none());
        assert!(collector.results[1].tree.is_some());
    }

    struct Counting(std::rc::Rc<std::cell::Cell<usize>>);

    impl CodeGenerator for Counting {
        fn generate(&mut self, _: &CompilationUnit, _: &LookupEnvironment) -> Result<(), CompileFault> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn generator_runs_only_when_enabled() {
        let units = vec![SourceUnit::new("A.java", "class A {}")];
        for (generate_code, expected) in [(false, 0), (true, 1)] {
            let options = CompilerOptions {
                generate_code,
                ..CompilerOptions::default()
            };
            let calls = std::rc::Rc::new(std::cell::Cell::new(0));
            let mut compiler = Compiler::new(options, NameEnvironment::default())
                .with_generator(Box::new(Counting(calls.clone())));
            let mut collector = ResultCollector::default();
            compiler
                .compile(&units, &mut StandardProcessor, &mut collector)
                .unwrap();
            assert_eq!(calls.get(), expected);
        }
    }
}
