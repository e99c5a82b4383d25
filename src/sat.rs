//! SMT-LIB2 encoding of MLTL satisfiability and the solver driver.
//!
//! Formulas are encoded over the AUFLIA logic: every atomic becomes an
//! uninterpreted predicate `f_aN : Int -> Bool` over trace indices, and
//! every node a `define-fun` over an evaluation index `k` and a trace
//! length `len`. End-of-trace semantics follow the bounded-MLTL reading:
//! a `G` over a range past the end of the trace holds vacuously, an `F`
//! requires the trace to actually reach its lower bound.
//!
//! The solver runs as an external subprocess on a file in the working
//! directory; verdicts are classified by substring search over stdout.
//! A missing solver or a timeout degrades to [`SatResult::Unknown`] and
//! never fails the compile.

use std::collections::HashMap;
use std::fs;
use std::process::Command;
use std::time::{Duration, Instant};

use crate::context::{Context, Program};
use crate::error::{CompileError, CompileResult};
use crate::expr::{ExprId, ExprKind, Loc, OperatorKind, TemporalKind};
use crate::log;
use crate::util;

const MODULE: &str = "SAT";

/// Verdict of a satisfiability or equivalence query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

/// Whether `solver -version` runs and exits zero.
pub fn check_solver_installed(solver: &str) -> bool {
    Command::new(solver)
        .arg("-version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Render the AUFLIA satisfiability query for `root`.
///
/// Fails when the expression contains a construct with no encoding
/// (`Release`, or anything below the atomic frontier that is not an
/// atomic).
pub fn to_smt_query(program: &Program, context: &Context, root: ExprId) -> CompileResult<String> {
    let mut lines: Vec<String> = vec!["(set-logic AUFLIA)".to_string()];

    let mut declared: Vec<u32> = context.atomic_id.values().copied().collect();
    declared.sort_unstable();
    declared.dedup();
    for aid in &declared {
        lines.push(format!("(declare-fun f_a{} (Int) Bool)", aid));
    }

    let mut names: HashMap<ExprId, String> = HashMap::new();
    let mut count = 0usize;
    let mut root_name = String::new();

    for id in program.arena.postorder(root) {
        let name = format!("f_e{}", count);
        count += 1;
        names.insert(id, name.clone());
        root_name = name.clone();

        let signature = format!("define-fun {} ((k Int) (len Int)) Bool", name);
        let child_call = |c: ExprId, at: &str| format!("({} {} len)", names[&c], at);

        let node = &program.arena[id];
        let line = if let Some(value) = node.bool_value() {
            format!("({} {})", signature, value)
        } else if let Some(&aid) = context.atomic_id.get(&id) {
            format!("({} (and (> len k) (f_a{} k)))", signature, aid)
        } else {
            match &node.kind {
                ExprKind::Operator { op } => match op {
                    OperatorKind::LogicalNot => {
                        format!("({} (not {}))", signature, child_call(node.children[0], "k"))
                    }
                    OperatorKind::LogicalAnd => {
                        let operands: Vec<String> =
                            node.children.iter().map(|&c| child_call(c, "k")).collect();
                        format!("({} (and {}))", signature, operands.join(" "))
                    }
                    OperatorKind::LogicalOr => {
                        let operands: Vec<String> =
                            node.children.iter().map(|&c| child_call(c, "k")).collect();
                        format!("({} (or {}))", signature, operands.join(" "))
                    }
                    OperatorKind::LogicalImplies => format!(
                        "({} (=> {} {}))",
                        signature,
                        child_call(node.children[0], "k"),
                        child_call(node.children[1], "k")
                    ),
                    OperatorKind::LogicalEquiv => format!(
                        "({} (= {} {}))",
                        signature,
                        child_call(node.children[0], "k"),
                        child_call(node.children[1], "k")
                    ),
                    other => {
                        return Err(CompileError::smt_encoding(format!(
                            "operator '{}' has no SMT encoding",
                            other.symbol()
                        )))
                    }
                },
                ExprKind::Temporal { op, interval } => {
                    let (lb, ub) = (interval.lb, interval.ub);
                    match op {
                        TemporalKind::Global => format!(
                            "({} (or (<= len (+ {} k)) (forall ((i Int)) (=> (and (<= (+ {} k) i) (<= i (+ {} k)) (< i len)) {}))))",
                            signature, lb, lb, ub,
                            child_call(node.children[0], "i")
                        ),
                        TemporalKind::Future => format!(
                            "({} (and (> len (+ {} k)) (exists ((i Int)) (and (<= (+ {} k) i) (<= i (+ {} k)) (< i len) {}))))",
                            signature, lb, lb, ub,
                            child_call(node.children[0], "i")
                        ),
                        TemporalKind::Until => format!(
                            "({} (and (> len (+ {} k)) (exists ((i Int)) (and (<= (+ {} k) i) (<= i (+ {} k)) (< i len) {} (forall ((j Int)) (=> (and (<= (+ {} k) j) (< j i)) {}))))))",
                            signature, lb, lb, ub,
                            child_call(node.children[1], "i"),
                            lb,
                            child_call(node.children[0], "j")
                        ),
                        TemporalKind::Release => {
                            return Err(CompileError::smt_encoding(
                                "release operator has no SMT encoding",
                            ))
                        }
                        other => {
                            return Err(CompileError::smt_encoding(format!(
                                "past-time operator '{}' has no SMT encoding",
                                other.symbol()
                            )))
                        }
                    }
                }
                other => {
                    return Err(CompileError::smt_encoding(format!(
                        "expression has no SMT encoding: {:?}",
                        other
                    )))
                }
            }
        };
        lines.push(line);
    }

    lines.push(format!("(assert (exists ((len Int)) ({} 0 len)))", root_name));
    lines.push("(check-sat)".to_string());

    Ok(lines.join("\n"))
}

/// Run the solver on the encoding of `expr` and classify the verdict.
pub fn check_sat_expr(program: &Program, context: &Context, expr: ExprId) -> SatResult {
    log::debug(
        MODULE,
        1,
        format!("Checking satisfiability: {}", program.arena.to_prefix(expr)),
    );

    let solver = &context.config.smt_solver;
    if !check_solver_installed(solver) {
        log::error(MODULE, format!("{} not found", solver));
        return SatResult::Unknown;
    }

    let smt = match to_smt_query(program, context, expr) {
        Ok(smt) => smt,
        Err(err) => {
            log::error(MODULE, err.to_string());
            return SatResult::Unknown;
        }
    };

    let smt_path = context.config.workdir.join("__tmp__.smt");
    if let Err(err) = fs::write(&smt_path, smt) {
        log::error(MODULE, format!("cannot write {}: {}", smt_path.display(), err));
        return SatResult::Unknown;
    }

    let mut cmd = Command::new(solver);
    cmd.arg(&smt_path);
    log::debug(MODULE, 1, format!("Running '{} {}'", solver, smt_path.display()));

    let start = Instant::now();
    let output = util::run_with_timeout(&mut cmd, Duration::from_secs(context.config.timeout_sat));
    let _ = fs::remove_file(&smt_path);

    let output = match output {
        Ok(Some(output)) => output,
        Ok(None) => {
            log::warning(
                MODULE,
                format!("{} timeout after {}s", solver, context.config.timeout_sat),
            );
            log::stat(MODULE, "sat_check_time=timeout");
            return SatResult::Unknown;
        }
        Err(err) => {
            log::error(MODULE, format!("error running {}: {}", solver, err));
            return SatResult::Unknown;
        }
    };

    log::stat(
        MODULE,
        format!("sat_check_time={:.3}", start.elapsed().as_secs_f64()),
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.contains("unsat") {
        log::debug(MODULE, 1, "unsat");
        SatResult::Unsat
    } else if stdout.contains("sat") {
        log::debug(MODULE, 1, "sat");
        SatResult::Sat
    } else {
        log::debug(MODULE, 1, "unknown");
        SatResult::Unknown
    }
}

/// Check every future-time spec for satisfiability. Contracts are skipped
/// with a warning; a missing solver yields no results.
pub fn check_sat_specs(program: &Program, context: &Context) -> Vec<(String, SatResult)> {
    if !check_solver_installed(&context.config.smt_solver) {
        log::error(MODULE, format!("{} not found", context.config.smt_solver));
        return Vec::new();
    }

    let mut results = Vec::new();
    for spec in program.ft_specs() {
        if matches!(program.arena[spec].kind, ExprKind::Contract { .. }) {
            log::warning(MODULE, "Found contract, skipping");
            continue;
        }
        let symbol = program.spec_symbol(spec).unwrap_or("<anonymous>").to_string();
        let expr = program.spec_expr(spec);
        results.push((symbol, check_sat_expr(program, context, expr)));
    }
    results
}

/// Check whether two formulas are equivalent by asserting the negated
/// biconditional: `unsat` means equivalent, `sat` means inequivalent,
/// anything else is unknown.
pub fn check_equiv(
    program: &mut Program,
    context: &Context,
    expr1: ExprId,
    expr2: ExprId,
) -> SatResult {
    log::debug(
        MODULE,
        1,
        format!(
            "Checking equivalence: {} <-> {}",
            program.arena.to_prefix(expr1),
            program.arena.to_prefix(expr2)
        ),
    );

    let equiv = program.arena.mk_equiv(Loc::none(), expr1, expr2);
    let neg = program.arena.mk_not(Loc::none(), equiv);

    let start = Instant::now();
    let result = check_sat_expr(program, context, neg);
    let elapsed = start.elapsed().as_secs_f64();

    // The query scaffolding must not linger as parent back edges on the
    // real formulas; SCQ sizing reads sibling sets through parents.
    program.arena[expr1].parents.retain(|&p| p != equiv);
    program.arena[expr2].parents.retain(|&p| p != equiv);

    if elapsed > context.config.timeout_sat as f64 {
        log::stat(MODULE, "equiv_check_time=timeout");
    } else {
        log::stat(MODULE, format!("equiv_check_time={:.3}", elapsed));
    }

    match result {
        SatResult::Sat => log::debug(MODULE, 1, "Not equivalent"),
        SatResult::Unsat => log::debug(MODULE, 1, "Equivalent"),
        SatResult::Unknown => log::debug(MODULE, 1, "Unknown"),
    }
    result
}
