//! Command implementations: gather inputs, compile once, then report,
//! describe symbols or dump generic trees.

use anyhow::{bail, Context};
use bridge::{
    BridgeOptions, CompilationResult, ExternalAnnotationRepository, JsonAnnotations,
    ResolvedClass, ResolvedSymbol, SourceRegistry, WarnedFiles,
};
use frontend::{CompilationUnit, NodeId, SourceUnit};
use loader::{classpath, java_sources, read_source, Encoding, ProjectMetadata};
use rayon::prelude::*;
use reporters::Stats;
use serde_json::{json, Value as JsonValue};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::args::{AstArgs, AstFormat, CheckArgs, InputArgs, SymbolsArgs};
use crate::config::{load_config, Config};
use crate::output::{self, Format};

/// Everything one command needs to compile: registered sources, classpath
/// and the optional external annotation database.
pub struct Session {
    registry: SourceRegistry,
    classpath: Vec<PathBuf>,
    annotations: Option<JsonAnnotations>,
    options: BridgeOptions,
    warned: WarnedFiles,
    failed_reads: usize,
}

impl Session {
    pub fn prepare(input: &InputArgs, config: &Config) -> anyhow::Result<Self> {
        let meta = input
            .project
            .as_deref()
            .map(ProjectMetadata::load)
            .transpose()?;

        let project_classpath = meta.as_ref().map(classpath::assemble).unwrap_or_default();
        let classpath = classpath::dedup_existing(
            input
                .classpath
                .iter()
                .chain(&project_classpath)
                .chain(&config.classpath),
        );

        let roots = if !input.paths.is_empty() {
            input.paths.clone()
        } else if let Some(meta) = &meta {
            meta.source_roots()
        } else {
            bail!("no sources given; pass paths or --project");
        };
        let mut files = Vec::new();
        for root in &roots {
            if root.is_file() {
                files.push(root.clone());
            } else if root.is_dir() {
                files.extend(java_sources(std::slice::from_ref(root))?);
            } else {
                bail!("source path not found: {}", root.display());
            }
        }

        let encoding = match input.encoding {
            Some(encoding) => encoding,
            None => meta
                .as_ref()
                .and_then(|m| m.encoding.as_deref())
                .or(config.encoding.as_deref())
                .map(str::parse::<Encoding>)
                .transpose()
                .map_err(anyhow::Error::msg)?
                .unwrap_or_default(),
        };
        info!(files = files.len(), classpath = classpath.len(), %encoding, "Sources queued");

        let read: Vec<(PathBuf, anyhow::Result<String>)> = files
            .par_iter()
            .map(|path| (path.clone(), read_source(path, encoding)))
            .collect();
        let mut registry = SourceRegistry::new();
        let mut failed_reads = 0;
        for (path, text) in read {
            match text {
                Ok(text) => {
                    let unit = SourceUnit::new(path, text).with_encoding(&encoding.to_string());
                    registry.insert(unit);
                }
                Err(e) => {
                    warn!(file = %path.display(), "Skipping unreadable source: {e:#}");
                    failed_reads += 1;
                }
            }
        }

        let annotations = input
            .annotations
            .as_ref()
            .or(config.annotations.as_ref())
            .map(|path| JsonAnnotations::load(path))
            .transpose()?;
        if let Some(db) = &annotations {
            debug!(classes = db.class_count(), "External annotations loaded");
        }

        let mut options = BridgeOptions {
            debug: input.debug,
            ..BridgeOptions::default()
        };
        if let Some(budget) = input.max_tree_nodes.or(config.max_tree_nodes) {
            options.max_tree_nodes = budget;
        }

        Ok(Self {
            registry,
            classpath,
            annotations,
            options,
            warned: WarnedFiles::default(),
            failed_reads,
        })
    }

    pub fn compile(&mut self) -> Stats {
        let start = Instant::now();
        let files = self.registry.len() + self.failed_reads;
        let classpath_entries = self.classpath.len();
        let result = self
            .registry
            .compile(&self.classpath, &self.options, &mut self.warned);
        let stats = Stats {
            files,
            classpath_entries,
            compiled: result.trees().count(),
            had_errors: result.had_errors(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        if !self.warned.is_empty() {
            warn!(files = self.warned.len(), "Some files crashed the front-end");
        }
        info!(
            compiled = stats.compiled,
            errors = stats.had_errors,
            "Compilation finished"
        );
        stats
    }

    pub fn result(&self) -> Option<&CompilationResult> {
        self.registry.result()
    }
}

fn start(input: &InputArgs) -> anyhow::Result<(Session, Config)> {
    let config = load_config().context("failed to load configuration")?;
    crate::init_logging(input.debug, input.quiet, input.threads);
    let session = Session::prepare(input, &config)?;
    Ok((session, config))
}

pub fn run_check(args: CheckArgs) -> anyhow::Result<()> {
    let (mut session, config) = start(&args.input)?;
    info!("Check started");
    let format = match args.format {
        Some(format) => format,
        None => config
            .format
            .as_deref()
            .map(str::parse::<Format>)
            .transpose()
            .map_err(anyhow::Error::msg)?
            .unwrap_or(Format::Text),
    };
    let stats = session.compile();
    let warnings = session
        .result()
        .map(|r| output::warnings(r.problems()))
        .unwrap_or_default();
    reporters::write_report(args.output.as_deref(), &stats, &warnings, format.into())
        .context("failed to write report")?;
    if let Some(threshold) = args.fail_on {
        if warnings.iter().any(|w| w.severity >= threshold) {
            std::process::exit(1);
        }
    }
    info!(warnings = warnings.len(), "Check completed");
    Ok(())
}

pub fn run_symbols(args: SymbolsArgs) -> anyhow::Result<()> {
    let (mut session, _) = start(&args.input)?;
    session.compile();
    let registry = &session.registry;
    let Some(rx) = registry.resolver(
        session
            .annotations
            .as_ref()
            .map(|db| db as &dyn ExternalAnnotationRepository),
    ) else {
        bail!("compilation did not produce a lookup environment");
    };

    let classes: Vec<ResolvedClass<'_>> = if args.classes.is_empty() {
        let mut all = Vec::new();
        for unit in registry.units() {
            if let Some(tree) = registry.tree(unit.path()) {
                collect_types(tree, &tree.types, &mut |node| {
                    if let Some(ResolvedSymbol::Class(c)) = rx.resolve(tree, node) {
                        all.push(c);
                    }
                });
            }
        }
        all
    } else {
        let mut found = Vec::new();
        for name in &args.classes {
            match rx.find_class(name) {
                Some(c) => found.push(c),
                None => bail!("class not found: {name}"),
            }
        }
        found
    };

    if args.json {
        let described: Vec<JsonValue> = classes.iter().map(describe_json).collect();
        println!("{}", serde_json::to_string_pretty(&described)?);
    } else {
        for class in &classes {
            print!("{}", describe_text(class));
        }
    }
    Ok(())
}

pub fn run_ast(args: AstArgs) -> anyhow::Result<()> {
    let (mut session, _) = start(&args.input)?;
    session.compile();
    let paths: Vec<PathBuf> = session
        .registry
        .units()
        .map(|u| u.path().to_path_buf())
        .collect();
    for path in paths {
        let Some(ast) = session.registry.convert(&path) else {
            warn!(file = %path.display(), "No tree for file");
            continue;
        };
        match args.format {
            AstFormat::Json => println!("{}", ast.to_json()?),
            AstFormat::Dot => println!("{}", ast.to_dot()),
        }
    }
    Ok(())
}

fn collect_types(tree: &CompilationUnit, nodes: &[NodeId], visit: &mut dyn FnMut(NodeId)) {
    for &node in nodes {
        visit(node);
        if let Some(decl) = tree.type_decl(node) {
            collect_types(tree, &decl.member_types, visit);
        }
    }
}

fn class_header(class: &ResolvedClass<'_>) -> String {
    let kind = match class.kind() {
        Some(frontend::TypeKind::Interface) => "interface",
        Some(frontend::TypeKind::Enum) => "enum",
        Some(frontend::TypeKind::Annotation) => "@interface",
        Some(frontend::TypeKind::Record) => "record",
        _ => "class",
    };
    let mut header = format!("{kind} {}", class.qualified_name());
    if let Some(superclass) = class.superclass() {
        header.push_str(&format!(" extends {}", superclass.qualified_name()));
    }
    let interfaces: Vec<String> = class.interfaces().iter().map(|i| i.qualified_name()).collect();
    if !interfaces.is_empty() {
        header.push_str(&format!(" implements {}", interfaces.join(", ")));
    }
    header
}

fn describe_text(class: &ResolvedClass<'_>) -> String {
    let mut out = format!("{}\n", class_header(class));
    for annotation in class.annotations(true) {
        out.push_str(&format!("  @{}\n", annotation.name()));
    }
    for field in class.fields(false) {
        let value = field.value().map(|v| format!(" = {v}")).unwrap_or_default();
        out.push_str(&format!("  field {}: {}{value}\n", field.name(), field.type_name()));
    }
    for method in class.constructors().into_iter().chain(class.methods(false)) {
        let mut line = format!("  method {}", method.signature());
        if let Some(ret) = method.return_type_name() {
            line.push_str(&format!(": {ret}"));
        }
        if let Some(overridden) = method.super_method().and_then(|m| m.declaring_class()) {
            line.push_str(&format!(" overrides {}", overridden.qualified_name()));
        }
        for annotation in method.annotations() {
            line.push_str(&format!(" @{}", annotation.name()));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn describe_json(class: &ResolvedClass<'_>) -> JsonValue {
    let names = |annotations: Vec<bridge::ResolvedAnnotation<'_>>| -> Vec<String> {
        annotations.iter().map(|a| a.name()).collect()
    };
    json!({
        "name": class.qualified_name(),
        "header": class_header(class),
        "annotations": names(class.annotations(true)),
        "fields": class.fields(false).iter().map(|f| json!({
            "name": f.name(),
            "type": f.type_name(),
            "value": f.value().map(|v| v.to_string()),
        })).collect::<Vec<_>>(),
        "methods": class.constructors().into_iter().chain(class.methods(false)).map(|m| json!({
            "signature": m.signature(),
            "returns": m.return_type_name(),
            "overrides": m.super_method().and_then(|s| s.declaring_class()).map(|c| c.qualified_name()),
            "annotations": names(m.annotations()),
        })).collect::<Vec<_>>(),
    })
}
