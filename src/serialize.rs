//! Output writers: prefix dump, surface reconstruction, MLTL standard
//! serialization, saved-program JSON, and per-spec SMT queries.
//!
//! Every writer is opt-in: a `None` target skips it, an empty string
//! derives the output path from the input path, anything else is used
//! verbatim.

use std::fs;
use std::path::{Path, PathBuf};

use crate::context::{Context, Program, Section};
use crate::error::{CompileError, CompileResult};
use crate::expr::{ExprId, ExprKind, OperatorKind};
use crate::log;
use crate::sat;

const MODULE: &str = "SRLZ";

/// Which optional outputs a run writes, straight from the CLI.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub c2po: Option<String>,
    pub prefix: Option<String>,
    pub mltl: Option<String>,
    pub pickle: Option<String>,
    pub smt: Option<String>,
}

fn resolve(target: &str, input_path: &Path, extension: &str) -> PathBuf {
    if target.is_empty() {
        input_path.with_extension(extension)
    } else {
        PathBuf::from(target)
    }
}

/// Write every requested output format.
pub fn write_outputs(
    program: &Program,
    context: &Context,
    input_path: &Path,
    options: &WriteOptions,
) -> CompileResult {
    if let Some(target) = &options.c2po {
        write_c2po(program, input_path, target)?;
    }
    if let Some(target) = &options.prefix {
        write_prefix(program, input_path, target)?;
    }
    if let Some(target) = &options.mltl {
        write_mltl(program, context, input_path, target)?;
    }
    if let Some(target) = &options.pickle {
        write_pickle(program, input_path, target)?;
    }
    if let Some(target) = &options.smt {
        write_smt(program, context, input_path, target)?;
    }
    Ok(())
}

/// Reconstruct the surface language of `program`.
pub fn to_c2po(program: &Program) -> String {
    let mut out = String::new();
    for section in &program.sections {
        match section {
            Section::Input(decls) => {
                out.push_str("INPUT\n");
                for decl in decls {
                    out.push_str(&format!("  {}: {};\n", decl.symbols.join(", "), decl.ty));
                }
            }
            Section::Define(defines) => {
                out.push_str("DEFINE\n");
                for define in defines {
                    out.push_str(&format!(
                        "  {} := {};\n",
                        define.symbol,
                        program.arena.to_infix(define.expr)
                    ));
                }
            }
            Section::Struct(defs) => {
                out.push_str("STRUCT\n");
                for def in defs {
                    let members: Vec<String> = def
                        .members
                        .iter()
                        .map(|(name, ty)| format!("{}: {}", name, ty))
                        .collect();
                    out.push_str(&format!("  {}: {{ {} }};\n", def.symbol, members.join("; ")));
                }
            }
            Section::Atomic(defs) => {
                out.push_str("ATOMIC\n");
                for def in defs {
                    out.push_str(&format!(
                        "  {} := {};\n",
                        def.symbol,
                        program.arena.to_infix(def.expr)
                    ));
                }
            }
            Section::Specs { future } => {
                out.push_str(if *future { "FTSPEC\n" } else { "PTSPEC\n" });
                let set = if *future {
                    program.ft_spec_set
                } else {
                    program.pt_spec_set
                };
                for &spec in &program.arena[set].children {
                    out.push_str(&format!("  {}\n", program.arena.to_infix(spec)));
                }
            }
        }
    }
    out
}

fn write_c2po(program: &Program, input_path: &Path, target: &str) -> CompileResult {
    let path = resolve(target, input_path, "out.c2po");
    log::debug(MODULE, 1, format!("Writing surface format to {}", path.display()));
    fs::write(&path, to_c2po(program))?;
    Ok(())
}

/// Prefix-notation rendering of every spec, one per line.
pub fn to_prefix_dump(program: &Program) -> String {
    let mut out = String::new();
    for spec in program.specs() {
        out.push_str(&program.arena.to_prefix(spec));
        out.push('\n');
    }
    out
}

fn write_prefix(program: &Program, input_path: &Path, target: &str) -> CompileResult {
    let path = resolve(target, input_path, "prefix.c2po");
    log::debug(MODULE, 1, format!("Writing prefix format to {}", path.display()));
    fs::write(&path, to_prefix_dump(program))?;
    Ok(())
}

/// MLTL-standard rendering of one expression: atomics print as `aN`.
fn mltl_str(program: &Program, context: &Context, id: ExprId) -> String {
    if let Some(aid) = context.atomic_id.get(&id) {
        return format!("a{}", aid);
    }
    let node = &program.arena[id];
    match &node.kind {
        ExprKind::Constant { value } => value.to_string(),
        ExprKind::Signal { symbol, .. } => symbol.clone(),
        ExprKind::Variable { symbol } => symbol.clone(),
        ExprKind::AtomicChecker { symbol } => symbol.clone(),
        ExprKind::Operator { op } => match op {
            OperatorKind::LogicalNot => {
                format!("!({})", mltl_str(program, context, node.children[0]))
            }
            OperatorKind::LogicalAnd
            | OperatorKind::LogicalOr
            | OperatorKind::LogicalXor
            | OperatorKind::LogicalImplies
            | OperatorKind::LogicalEquiv => {
                let sep = match op {
                    OperatorKind::LogicalAnd => "&",
                    OperatorKind::LogicalOr => "|",
                    OperatorKind::LogicalXor => "^",
                    OperatorKind::LogicalImplies => "->",
                    _ => "<->",
                };
                let parts: Vec<String> = node
                    .children
                    .iter()
                    .map(|&c| mltl_str(program, context, c))
                    .collect();
                format!("({})", parts.join(&format!(" {} ", sep)))
            }
            other => format!("({})", other.symbol()),
        },
        ExprKind::Temporal { op, interval } => {
            if node.children.len() == 2 {
                format!(
                    "({}) {}[{},{}] ({})",
                    mltl_str(program, context, node.children[0]),
                    op.symbol(),
                    interval.lb,
                    interval.ub,
                    mltl_str(program, context, node.children[1])
                )
            } else {
                format!(
                    "{}[{},{}]({})",
                    op.symbol(),
                    interval.lb,
                    interval.ub,
                    mltl_str(program, context, node.children[0])
                )
            }
        }
        ExprKind::Probability { prob } => format!(
            "Pr({}) >= {}",
            mltl_str(program, context, node.children[0]),
            prob
        ),
        ExprKind::Formula { .. } => mltl_str(program, context, node.children[0]),
        _ => program.arena.to_prefix(id),
    }
}

/// MLTL-standard serialization: one formula per line, FT specs first.
pub fn to_mltl_std(program: &Program, context: &Context) -> String {
    let mut out = String::new();
    for spec in program.specs() {
        out.push_str(&mltl_str(program, context, spec));
        out.push('\n');
    }
    out
}

fn write_mltl(program: &Program, context: &Context, input_path: &Path, target: &str) -> CompileResult {
    let path = resolve(target, input_path, "mltl");
    log::debug(MODULE, 1, format!("Writing MLTL standard format to {}", path.display()));
    fs::write(&path, to_mltl_std(program, context))?;
    Ok(())
}

/// Serialize `program` (arena included) so a later run can load it
/// without a parser.
fn write_pickle(program: &Program, input_path: &Path, target: &str) -> CompileResult {
    let path = resolve(target, input_path, "pickle");
    log::debug(MODULE, 1, format!("Writing saved program to {}", path.display()));
    let text = serde_json::to_string(program)
        .map_err(|err| CompileError::file_io(format!("cannot serialize program: {}", err)))?;
    fs::write(&path, text)?;
    Ok(())
}

/// Write one SMT-LIB2 file per future-time spec into a directory.
fn write_smt(program: &Program, context: &Context, input_path: &Path, target: &str) -> CompileResult {
    let dir = resolve(target, input_path, "smt");
    log::debug(MODULE, 1, format!("Writing SMT encodings to {}", dir.display()));

    if dir.is_file() {
        fs::remove_file(&dir)?;
    } else if dir.is_dir() {
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;

    for spec in program.ft_specs() {
        if matches!(program.arena[spec].kind, ExprKind::Contract { .. }) {
            continue;
        }
        let symbol = program.spec_symbol(spec).unwrap_or("spec").to_string();
        let expr = program.spec_expr(spec);
        match sat::to_smt_query(program, context, expr) {
            Ok(smt) => fs::write(dir.join(format!("{}.smt", symbol)), smt)?,
            Err(err) => log::error(MODULE, err.to_string()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Config;
    use crate::expr::Loc;
    use crate::typecheck::type_check;
    use crate::types::Type;

    fn sample_program() -> (Program, Context) {
        let mut program = Program::new();
        program.declare_signals(vec!["a0", "a1"], Type::bool());
        let a0 = program.arena.mk_signal(Loc::none(), "a0");
        let a1 = program.arena.mk_signal(Loc::none(), "a1");
        let and = program.arena.mk_and(Loc::none(), vec![a0, a1]);
        let g = program.arena.mk_global(Loc::none(), 0, 5, and);
        program.add_ft_spec("req", 0, g);
        let (ok, mut context) = type_check(&mut program, Config::default());
        assert!(ok);
        crate::passes::compute_atomics(&mut program, &mut context);
        (program, context)
    }

    #[test]
    fn mltl_standard_uses_atomic_ids() {
        let (program, context) = sample_program();
        let text = to_mltl_std(&program, &context);
        assert_eq!(text, "G[0,5]((a0 & a1))\n");
    }

    #[test]
    fn surface_reconstruction_has_sections() {
        let (program, _context) = sample_program();
        let text = to_c2po(&program);
        assert!(text.contains("INPUT\n"));
        assert!(text.contains("a0, a1: bool;"));
        assert!(text.contains("FTSPEC\n"));
        assert!(text.contains("req:"));
    }

    #[test]
    fn prefix_dump_round_trips_structure() {
        let (program, _context) = sample_program();
        let text = to_prefix_dump(&program);
        assert_eq!(text, "(req: (G[0,5] (&& a0 a1)))\n");
    }

    #[test]
    fn saved_program_round_trips() {
        let (program, _context) = sample_program();
        let text = serde_json::to_string(&program).unwrap();
        let loaded: Program = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded.specs().len(), 1);
        assert_eq!(
            loaded.arena.to_prefix(loaded.specs()[0]),
            program.arena.to_prefix(program.specs()[0])
        );
    }

    #[test]
    fn smt_directory_gets_one_file_per_spec() {
        let (program, context) = sample_program();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("queries");
        write_smt(
            &program,
            &context,
            Path::new("input.c2po"),
            target.to_str().unwrap(),
        )
        .unwrap();
        let entries: Vec<_> = fs::read_dir(&target).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(target.join("req.smt").is_file());
    }
}
