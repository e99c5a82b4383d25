//! The ordered transformation pipeline.
//!
//! ```text
//! Program (typed)
//!       │
//!       ▼
//! ┌─────────────────────┐
//! │ expand definitions  │ macro expansion, Pr() aliasing
//! │ calls -> structs    │
//! │ resolve contracts   │ (A,G) -> active/valid/verified
//! │ unroll aggregation  │ foreach/forsome/... -> finite forms
//! │ resolve accesses    │ struct member projection
//! │ compute atomics     │ stable atomic ids at the TL frontier
//! ├─────────────────────┤
//! │ rewrite   (or)      │ SCQ-directed local rewrites
//! │ eqsat               │ saturation + SCQ-aware extraction
//! ├─────────────────────┤
//! │ nnf / bnf           │ normal forms (opt-in)
//! │ remove extended ops │ down to !, &&, U
//! │ multi-arity -> bin  │ left-associative reassociation
//! │ cse                 │ prefix-string keyed sharing
//! │ check sat           │ warn on unsat/unknown specs
//! │ scq sizing          │ final memory budget
//! └─────────────────────┘
//! ```
//!
//! Pass order is fixed; configuration only decides which optional entries
//! appear. The saturation optimizer is mutually exclusive with the rewrite
//! pass, extended-operator removal, binary conversion, and CSE.

use std::collections::{HashMap, HashSet};

use crate::context::{Context, Program};
use crate::expr::{Expr, ExprArena, ExprId, ExprKind, OperatorKind, TemporalKind};
use crate::log;
use crate::types::{Engine, Frontend, Interval, Type};
use crate::{eqsat, sat, scq};

const MODULE: &str = "PASS";

/// A transformation over a typed program.
pub type Pass = fn(&mut Program, &mut Context);

/// Which optional passes a compilation runs.
#[derive(Debug, Clone)]
pub struct PassOptions {
    pub enable_rewrite: bool,
    pub enable_cse: bool,
    /// Keep extended operators instead of lowering to `!`, `&&`, `U`.
    pub enable_extops: bool,
    pub enable_eqsat: bool,
    pub enable_nnf: bool,
    pub enable_bnf: bool,
    pub enable_sat: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        PassOptions {
            enable_rewrite: true,
            enable_cse: true,
            enable_extops: false,
            enable_eqsat: false,
            enable_nnf: false,
            enable_bnf: false,
            enable_sat: false,
        }
    }
}

/// The enabled passes, in pipeline order.
pub fn pass_list(opts: &PassOptions) -> Vec<(&'static str, Pass)> {
    let mut passes: Vec<(&'static str, Pass)> = vec![
        ("expand_definitions", expand_definitions),
        ("convert_function_calls_to_structs", convert_function_calls_to_structs),
        ("resolve_contracts", resolve_contracts),
        ("unroll_set_aggregation", unroll_set_aggregation),
        ("resolve_struct_accesses", resolve_struct_accesses),
        ("compute_atomics", compute_atomics),
    ];
    if opts.enable_rewrite && !opts.enable_eqsat {
        passes.push(("optimize_rewrite_rules", optimize_rewrite_rules));
    }
    if opts.enable_eqsat {
        passes.push(("optimize_eqsat", eqsat::optimize_eqsat));
    }
    if opts.enable_nnf {
        passes.push(("to_nnf", to_nnf));
    } else if opts.enable_bnf {
        passes.push(("to_bnf", to_bnf));
    }
    if !opts.enable_extops && !opts.enable_eqsat {
        passes.push(("remove_extended_operators", remove_extended_operators));
    }
    if !opts.enable_eqsat {
        passes.push(("multi_operators_to_binary", multi_operators_to_binary));
    }
    if opts.enable_cse && !opts.enable_eqsat {
        passes.push(("optimize_cse", optimize_cse));
    }
    if opts.enable_sat {
        passes.push(("check_sat", check_sat));
    }
    passes.push(("compute_scq_sizes", compute_scq_sizes));
    passes
}

/// Run every enabled pass in order.
pub fn run_passes(program: &mut Program, context: &mut Context, opts: &PassOptions) {
    for (name, pass) in pass_list(opts) {
        log::debug(MODULE, 1, format!("Running pass '{}'", name));
        pass(program, context);
    }
}

fn is_op(arena: &ExprArena, id: ExprId, op: OperatorKind) -> bool {
    arena[id].operator() == Some(op)
}

fn as_temporal(arena: &ExprArena, id: ExprId, kind: TemporalKind) -> Option<Interval> {
    match arena[id].temporal() {
        Some((k, interval)) if k == kind => Some(interval),
        _ => None,
    }
}

fn prefix_eq(arena: &ExprArena, a: ExprId, b: ExprId) -> bool {
    arena.to_prefix(a) == arena.to_prefix(b)
}

/// Every postorder node of every definition body, then of the program.
fn definition_and_program_postorder(program: &Program, context: &Context) -> Vec<ExprId> {
    let mut out = Vec::new();
    for symbol in &context.definition_order {
        if let Some(&def) = context.definitions.get(symbol) {
            out.extend(program.arena.postorder(def));
        }
    }
    out.extend(program.postorder());
    out
}

/// Inline macro expansion: a variable naming a definition or specification
/// is replaced by that definition's expression (or the spec's body).
/// Definitions used under a probability operator are duplicated into a
/// separate `Pr(<sym>)` bucket so probabilistic and plain usages never
/// alias.
pub fn expand_definitions(program: &mut Program, context: &mut Context) {
    log::debug(MODULE, 1, "Expanding definitions");

    for id in definition_and_program_postorder(program, context) {
        let ExprKind::Variable { symbol } = program.arena[id].kind.clone() else {
            continue;
        };
        let mut symbol = symbol;

        let probabilistic = program.arena.is_probabilistic(id);
        let pr_symbol = format!("Pr({})", symbol);
        if probabilistic
            && context.definitions.contains_key(&symbol)
            && !context.definitions.contains_key(&pr_symbol)
        {
            let def = context.definitions[&symbol];
            let mut copy = program.arena[def].clone();
            copy.parents = Vec::new();
            let copy_id = program.arena.alloc(copy);
            if let ExprKind::Variable { symbol: s } = &mut program.arena[id].kind {
                *s = pr_symbol.clone();
            }
            context.add_definition(pr_symbol.clone(), copy_id);
            symbol = pr_symbol;
        } else if probabilistic {
            if let ExprKind::Variable { symbol: s } = &mut program.arena[id].kind {
                *s = pr_symbol.clone();
            }
            symbol = pr_symbol;
        }

        if let Some(&def) = context.definitions.get(&symbol) {
            program.arena.replace(id, def);
        } else if let Some(&spec) = context.specifications.get(&symbol) {
            let body = program.spec_expr(spec);
            program.arena.replace(id, body);
        }
    }
}

/// Any function call whose symbol names a struct becomes a struct node
/// with positional member assignment.
pub fn convert_function_calls_to_structs(program: &mut Program, context: &mut Context) {
    for id in definition_and_program_postorder(program, context) {
        let ExprKind::FunctionCall { symbol } = program.arena[id].kind.clone() else {
            continue;
        };
        let Some(declared) = context.structs.get(&symbol) else {
            continue;
        };
        let members: Vec<String> = declared.iter().map(|(name, _)| name.clone()).collect();
        let loc = program.arena[id].loc;
        let children = program.arena[id].children.clone();
        let ty = program.arena[id].ty.clone();
        let mut node = Expr::new(loc, ExprKind::Struct { symbol, members }, children);
        node.ty = ty;
        let new = program.arena.alloc(node);
        program.arena.replace(id, new);
    }
}

/// Replace each contract `(A, G)` by three tracked formulas:
/// `active = A`, `valid = A -> G`, `verified = A && G`.
pub fn resolve_contracts(program: &mut Program, _context: &mut Context) {
    log::debug(MODULE, 1, "Replacing contracts");

    for spec in program.specs() {
        let ExprKind::Contract { symbol, numbers } = program.arena[spec].kind.clone() else {
            continue;
        };
        let loc = program.arena[spec].loc;
        let assume = program.arena[spec].children[0];
        let guarantee = program.arena[spec].children[1];

        let mut active = Expr::new(
            loc,
            ExprKind::Formula {
                symbol: format!("__{}_active__", symbol),
                number: numbers.0,
            },
            vec![assume],
        );
        active.ty = Type::bool();
        let active = program.arena.alloc(active);

        let implies = program.arena.mk_implies(loc, assume, guarantee);
        let mut valid = Expr::new(
            loc,
            ExprKind::Formula {
                symbol: format!("__{}_valid__", symbol),
                number: numbers.1,
            },
            vec![implies],
        );
        valid.ty = Type::bool();
        let valid = program.arena.alloc(valid);

        let conj = program.arena.mk_and(loc, vec![assume, guarantee]);
        let mut verified = Expr::new(
            loc,
            ExprKind::Formula {
                symbol: format!("__{}_verified__", symbol),
                number: numbers.2,
            },
            vec![conj],
        );
        verified.ty = Type::bool();
        let verified = program.arena.alloc(verified);

        program.replace_spec(spec, vec![active, valid, verified]);
        log::debug(MODULE, 1, format!("Replaced contract '{}'", symbol));
    }
}

fn resolve_struct_accesses_below(program: &mut Program, root: ExprId) {
    for id in program.arena.postorder(root) {
        let ExprKind::StructAccess { member } = program.arena[id].kind.clone() else {
            continue;
        };
        let target = program.arena[id].children[0];
        let ExprKind::Struct { members, .. } = program.arena[target].kind.clone() else {
            continue;
        };
        if let Some(pos) = members.iter().position(|m| *m == member) {
            let value = program.arena[target].children[pos];
            program.arena.replace(id, value);
        }
    }
}

/// Unroll `foreach`/`forsome` into conjunction/disjunction over the set's
/// members with the bound variable renamed into each copy, and the
/// counting aggregations into a sum comparison.
pub fn unroll_set_aggregation(program: &mut Program, _context: &mut Context) {
    log::debug(MODULE, 1, "Unrolling set aggregation expressions");

    let mut visited: HashSet<ExprId> = HashSet::new();
    let mut stack = vec![program.pt_spec_set, program.ft_spec_set];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let ExprKind::SetAggregation { op, bound } = program.arena[id].kind.clone() else {
            stack.extend(program.arena[id].children.iter().copied());
            continue;
        };

        let loc = program.arena[id].loc;
        let set_expr = program.arena[id].children[0];
        let body = *program.arena[id].children.last().unwrap();
        resolve_struct_accesses_below(program, set_expr);

        let copies: Vec<ExprId> = program.arena[set_expr]
            .children
            .clone()
            .into_iter()
            .map(|member| program.arena.rename(&bound, member, body))
            .collect();

        use crate::expr::AggregationKind::*;
        let new = match op {
            ForEach => program.arena.mk_and(loc, copies),
            ForSome => program.arena.mk_or(loc, copies),
            ForExactly | ForAtLeast | ForAtMost => {
                let num = program.arena[id].children[1];
                let sum = program
                    .arena
                    .mk_operator(loc, OperatorKind::ArithmeticAdd, copies);
                program.arena[sum].ty = Type::int();
                let rel = match op {
                    ForExactly => OperatorKind::Equal,
                    ForAtLeast => OperatorKind::GreaterThanOrEqual,
                    _ => OperatorKind::LessThanOrEqual,
                };
                program.arena.mk_operator(loc, rel, vec![sum, num])
            }
        };

        program.arena.replace(id, new);
        resolve_struct_accesses_below(program, new);
        stack.push(new);
    }
}

/// Replace every struct access with the accessed member expression.
pub fn resolve_struct_accesses(program: &mut Program, _context: &mut Context) {
    log::debug(MODULE, 1, "Resolving struct accesses");
    for root in [program.ft_spec_set, program.pt_spec_set] {
        resolve_struct_accesses_below(program, root);
    }
}

/// Assign stable atomic ids. An atomic is any node the temporal-logic
/// engine does not compute itself but that feeds at least one node it
/// does; syntactically equal subtrees share one id. Without a front end,
/// signals become atomics directly under their signal id.
pub fn compute_atomics(program: &mut Program, context: &mut Context) {
    let mut atomic_map: HashMap<String, u32> = HashMap::new();
    let mut aid: u32 = 0;

    for id in program.postorder() {
        if program.arena[id].engine == Engine::TemporalLogic
            || program.arena[id].is_constant()
            || context.atomic_id.contains_key(&id)
        {
            continue;
        }

        let key = program.arena.to_prefix(id);
        if let Some(&existing) = atomic_map.get(&key) {
            context.atomic_id.insert(id, existing);
            continue;
        }

        if context.config.frontend == Frontend::None {
            if let ExprKind::Signal { signal_id, .. } = program.arena[id].kind {
                let assigned = if signal_id >= 0 {
                    signal_id as u32
                } else {
                    let fresh = aid;
                    aid += 1;
                    fresh
                };
                context.atomic_id.insert(id, assigned);
                atomic_map.insert(key, assigned);
                continue;
            }
        }

        let feeds_tl = program.arena[id]
            .parents
            .iter()
            .any(|&p| program.arena[p].engine == Engine::TemporalLogic);
        if feeds_tl {
            context.atomic_id.insert(id, aid);
            atomic_map.insert(key, aid);
            aid += 1;
        }
    }

    log::debug(
        MODULE,
        1,
        format!("Computed {} atomics", context.atomic_id.len()),
    );
}

/// Sort the operands of every commutative operator by ascending
/// worst-case propagation delay, normalizing rewrite matching.
pub fn sort_operands_by_pd(program: &mut Program, _context: &mut Context) {
    log::debug(MODULE, 1, "Sorting operands by WPD");
    scq::compute_propagation_delays(program);

    for id in program.postorder() {
        let commutative = program.arena[id]
            .operator()
            .map(|op| op.is_commutative())
            .unwrap_or(false);
        if !commutative {
            continue;
        }
        let mut children = program.arena[id].children.clone();
        children.sort_by_key(|&c| program.arena[c].wpd);
        program.arena[id].children = children;
    }
}

/// Merge nested occurrences of the same multi-arity operator into their
/// parent, up to a fixed arity cap.
pub fn flatten_multi_operators(program: &mut Program, _context: &mut Context) {
    log::debug(MODULE, 1, "Flattening multi-arity operators");

    const MAX_ARITY: usize = 4;

    for id in program.postorder() {
        let Some(op) = program.arena[id].operator().filter(|o| o.is_multi_arity()) else {
            continue;
        };
        let children = program.arena[id].children.clone();
        let mut merged = Vec::new();
        for child in &children {
            if program.arena[*child].operator() == Some(op) && merged.len() < MAX_ARITY {
                merged.extend(program.arena[*child].children.iter().copied());
            } else {
                merged.push(*child);
            }
        }
        if merged == children {
            continue;
        }
        let loc = program.arena[id].loc;
        let ty = program.arena[id].ty.clone();
        let mut node = Expr::new(loc, ExprKind::Operator { op }, merged);
        node.ty = ty;
        let new = program.arena.alloc(node);
        program.arena.replace(id, new);
    }
}

/// Pattern-directed rewrites that shrink SCQ memory: constant folding on
/// negation, double-negation removal, temporal-operator fusion, interval
/// coalescing, and factoring. One postorder sweep approximates the fixed
/// point; bodies are compared by prefix string.
pub fn optimize_rewrite_rules(program: &mut Program, context: &mut Context) {
    log::debug(MODULE, 1, "Performing rewrites");
    sort_operands_by_pd(program, context);

    for id in program.postorder() {
        if let Some(new) = rewrite_node(program, id) {
            log::debug(
                MODULE,
                2,
                format!(
                    "{} ==> {}",
                    program.arena.to_prefix(id),
                    program.arena.to_prefix(new)
                ),
            );
            program.arena.replace(id, new);
        }
    }
}

fn rewrite_node(program: &mut Program, id: ExprId) -> Option<ExprId> {
    let loc = program.arena[id].loc;

    if is_op(&program.arena, id, OperatorKind::LogicalNot) {
        let opnd1 = program.arena[id].children[0];
        if let Some(v) = program.arena[opnd1].bool_value() {
            // !true = false, !false = true
            return Some(program.arena.mk_bool(loc, !v));
        }
        if is_op(&program.arena, opnd1, OperatorKind::LogicalNot) {
            // !!p = p
            return Some(program.arena[opnd1].children[0]);
        }
        if let Some(iv) = as_temporal(&program.arena, opnd1, TemporalKind::Global) {
            let opnd2 = program.arena[opnd1].children[0];
            if is_op(&program.arena, opnd2, OperatorKind::LogicalNot) {
                // !(G[l,u] !p) = F[l,u] p
                let p = program.arena[opnd2].children[0];
                return Some(program.arena.mk_future(loc, iv.lb, iv.ub, p));
            }
        }
        if let Some(iv) = as_temporal(&program.arena, opnd1, TemporalKind::Future) {
            let opnd2 = program.arena[opnd1].children[0];
            if is_op(&program.arena, opnd2, OperatorKind::LogicalNot) {
                // !(F[l,u] !p) = G[l,u] p
                let p = program.arena[opnd2].children[0];
                return Some(program.arena.mk_global(loc, iv.lb, iv.ub, p));
            }
        }
        return None;
    }

    if is_op(&program.arena, id, OperatorKind::Equal) {
        let lhs = program.arena[id].children[0];
        let rhs = program.arena[id].children[1];
        if program.arena[lhs].is_constant() && program.arena[rhs].is_constant() {
            return None;
        }
        if program.arena[lhs].bool_value() == Some(true) {
            // (true == p) = p
            return Some(rhs);
        }
        if program.arena[rhs].bool_value() == Some(true) {
            // (p == true) = p
            return Some(lhs);
        }
        return None;
    }

    if let Some(iv) = as_temporal(&program.arena, id, TemporalKind::Global) {
        let opnd1 = program.arena[id].children[0];
        let mut new = None;
        if iv.lb == 0 && iv.ub == 0 {
            // G[0,0] p = p
            new = Some(opnd1);
        }
        if let Some(v) = program.arena[opnd1].bool_value() {
            if v {
                // G[l,u] true = true. The false case is NOT folded: the
                // empty trace satisfies G[l,u] false but not false.
                new = Some(program.arena.mk_bool(loc, true));
            }
        } else if let Some(iv2) = as_temporal(&program.arena, opnd1, TemporalKind::Global) {
            // G[l1,u1] G[l2,u2] p = G[l1+l2,u1+u2] p
            let p = program.arena[opnd1].children[0];
            new = Some(
                program
                    .arena
                    .mk_global(loc, iv.lb + iv2.lb, iv.ub + iv2.ub, p),
            );
        } else if let Some(iv2) = as_temporal(&program.arena, opnd1, TemporalKind::Future) {
            let p = program.arena[opnd1].children[0];
            if iv.lb == iv.ub {
                // G[a,a] F[l,u] p = F[l+a,u+a] p
                new = Some(
                    program
                        .arena
                        .mk_future(loc, iv.lb + iv2.lb, iv.ub + iv2.ub, p),
                );
            } else if iv2.lb == iv2.ub {
                // G[l,u] F[a,a] p = G[l+a,u+a] p
                new = Some(
                    program
                        .arena
                        .mk_global(loc, iv.lb + iv2.lb, iv.ub + iv2.ub, p),
                );
            }
        }
        return new;
    }

    if let Some(iv) = as_temporal(&program.arena, id, TemporalKind::Future) {
        let opnd1 = program.arena[id].children[0];
        let mut new = None;
        if iv.lb == 0 && iv.ub == 0 {
            // F[0,0] p = p
            new = Some(opnd1);
        }
        if let Some(v) = program.arena[opnd1].bool_value() {
            if !v {
                // F[l,u] false = false. The true case is NOT folded: the
                // empty trace satisfies true but not F[l,u] true.
                new = Some(program.arena.mk_bool(loc, false));
            }
        } else if let Some(iv2) = as_temporal(&program.arena, opnd1, TemporalKind::Future) {
            // F[l1,u1] F[l2,u2] p = F[l1+l2,u1+u2] p
            let p = program.arena[opnd1].children[0];
            new = Some(
                program
                    .arena
                    .mk_future(loc, iv.lb + iv2.lb, iv.ub + iv2.ub, p),
            );
        } else if let Some(iv2) = as_temporal(&program.arena, opnd1, TemporalKind::Global) {
            let p = program.arena[opnd1].children[0];
            if iv.lb == iv.ub {
                // F[a,a] G[l,u] p = G[l+a,u+a] p
                new = Some(
                    program
                        .arena
                        .mk_global(loc, iv.lb + iv2.lb, iv.ub + iv2.ub, p),
                );
            } else if iv2.lb == iv2.ub {
                // F[l,u] G[a,a] p = F[l+a,u+a] p
                new = Some(
                    program
                        .arena
                        .mk_future(loc, iv.lb + iv2.lb, iv.ub + iv2.ub, p),
                );
            }
        }
        return new;
    }

    if is_op(&program.arena, id, OperatorKind::LogicalAnd) {
        if program.arena[id].children.len() != 2 {
            return None;
        }
        let lhs = program.arena[id].children[0];
        let rhs = program.arena[id].children[1];

        if let (Some(iv1), Some(iv2)) = (
            as_temporal(&program.arena, lhs, TemporalKind::Global),
            as_temporal(&program.arena, rhs, TemporalKind::Global),
        ) {
            let p = program.arena[lhs].children[0];
            let q = program.arena[rhs].children[0];
            let (lb1, ub1, lb2, ub2) = (iv1.lb, iv1.ub, iv2.lb, iv2.ub);
            if prefix_eq(&program.arena, p, q) {
                // Union of overlapping or adjacent intervals.
                if lb1 <= lb2 && ub1 >= ub2 {
                    return Some(program.arena.mk_global(loc, lb1, ub1, p));
                } else if lb2 <= lb1 && ub2 >= ub1 {
                    return Some(program.arena.mk_global(loc, lb2, ub2, p));
                } else if lb1 <= lb2 && lb2 <= ub1 + 1 {
                    return Some(program.arena.mk_global(loc, lb1, ub1.max(ub2), p));
                } else if lb2 <= lb1 && lb1 <= ub2 + 1 {
                    return Some(program.arena.mk_global(loc, lb2, ub1.max(ub2), p));
                }
                return None;
            }
            // G[l1,u1]p && G[l2,u2]q = G[l3,u3](G[l1-l3,u1-u3]p && G[l2-l3,u2-u3]q)
            let lb3 = lb1.min(lb2);
            let ub3 = lb3 + (ub1 - lb1).min(ub2 - lb2);
            let left = program.arena.mk_global(loc, lb1 - lb3, ub1 - ub3, p);
            let right = program.arena.mk_global(loc, lb2 - lb3, ub2 - ub3, q);
            let conj = program.arena.mk_and(loc, vec![left, right]);
            return Some(program.arena.mk_global(loc, lb3, ub3, conj));
        }

        if let (Some(iv1), Some(iv2)) = (
            as_temporal(&program.arena, lhs, TemporalKind::Future),
            as_temporal(&program.arena, rhs, TemporalKind::Future),
        ) {
            let p = program.arena[lhs].children[0];
            let q = program.arena[rhs].children[0];
            if prefix_eq(&program.arena, p, q) {
                // F[l1,u1]p && F[l2,u2]p keeps the contained interval.
                let (lb1, ub1, lb2, ub2) = (iv1.lb, iv1.ub, iv2.lb, iv2.ub);
                if lb1 <= lb2 && ub1 >= ub2 {
                    return Some(program.arena.mk_future(loc, lb2, ub2, p));
                } else if lb2 <= lb1 && ub2 >= ub1 {
                    return Some(program.arena.mk_future(loc, lb1, ub1, p));
                }
            }
            return None;
        }

        if let (Some(iv1), Some(iv2)) = (
            as_temporal(&program.arena, lhs, TemporalKind::Until),
            as_temporal(&program.arena, rhs, TemporalKind::Until),
        ) {
            let lhs_lhs = program.arena[lhs].children[0];
            let lhs_rhs = program.arena[lhs].children[1];
            let rhs_lhs = program.arena[rhs].children[0];
            let rhs_rhs = program.arena[rhs].children[1];
            if prefix_eq(&program.arena, lhs_rhs, rhs_rhs) && iv1.lb == iv2.lb {
                // (p U[l,u1] q) && (r U[l,u2] q) = (p && r) U[l,min(u1,u2)] q
                let conj = program.arena.mk_and(loc, vec![lhs_lhs, rhs_lhs]);
                return Some(program.arena.mk_until(
                    loc,
                    iv1.lb,
                    iv1.ub.min(iv2.ub),
                    conj,
                    lhs_rhs,
                ));
            }
            return None;
        }
        return None;
    }

    if is_op(&program.arena, id, OperatorKind::LogicalOr) {
        if program.arena[id].children.len() != 2 {
            return None;
        }
        let lhs = program.arena[id].children[0];
        let rhs = program.arena[id].children[1];

        if let (Some(iv1), Some(iv2)) = (
            as_temporal(&program.arena, lhs, TemporalKind::Future),
            as_temporal(&program.arena, rhs, TemporalKind::Future),
        ) {
            let p = program.arena[lhs].children[0];
            let q = program.arena[rhs].children[0];
            let (lb1, ub1, lb2, ub2) = (iv1.lb, iv1.ub, iv2.lb, iv2.ub);
            if prefix_eq(&program.arena, p, q) {
                // Union of overlapping or adjacent intervals.
                if lb1 <= lb2 && ub1 >= ub2 {
                    return Some(program.arena.mk_future(loc, lb1, ub1, p));
                } else if lb2 <= lb1 && ub2 >= ub1 {
                    return Some(program.arena.mk_future(loc, lb2, ub2, p));
                } else if lb1 <= lb2 && lb2 <= ub1 + 1 {
                    return Some(program.arena.mk_future(loc, lb1, ub1.max(ub2), p));
                } else if lb2 <= lb1 && lb1 <= ub2 + 1 {
                    return Some(program.arena.mk_future(loc, lb2, ub1.max(ub2), p));
                }
                return None;
            }
            // F[l1,u1]p || F[l2,u2]q = F[l3,u3](F[l1-l3,u1-u3]p || F[l2-l3,u2-u3]q)
            let lb3 = lb1.min(lb2);
            let ub3 = lb3 + (ub1 - lb1).min(ub2 - lb2);
            let left = program.arena.mk_future(loc, lb1 - lb3, ub1 - ub3, p);
            let right = program.arena.mk_future(loc, lb2 - lb3, ub2 - ub3, q);
            let disj = program.arena.mk_or(loc, vec![left, right]);
            return Some(program.arena.mk_future(loc, lb3, ub3, disj));
        }

        if let (Some(iv1), Some(iv2)) = (
            as_temporal(&program.arena, lhs, TemporalKind::Global),
            as_temporal(&program.arena, rhs, TemporalKind::Global),
        ) {
            let p = program.arena[lhs].children[0];
            let q = program.arena[rhs].children[0];
            if prefix_eq(&program.arena, p, q) {
                // G[l1,u1]p || G[l2,u2]p keeps the contained interval.
                let (lb1, ub1, lb2, ub2) = (iv1.lb, iv1.ub, iv2.lb, iv2.ub);
                if lb1 >= lb2 && ub1 <= ub2 {
                    return Some(program.arena.mk_global(loc, lb1, ub1, p));
                } else if lb2 >= lb1 && ub2 <= ub1 {
                    return Some(program.arena.mk_global(loc, lb2, ub2, p));
                }
            }
            return None;
        }
        return None;
    }

    if let Some(iv) = as_temporal(&program.arena, id, TemporalKind::Until) {
        let lhs = program.arena[id].children[0];
        let rhs = program.arena[id].children[1];
        if let Some(iv2) = as_temporal(&program.arena, rhs, TemporalKind::Global) {
            let inner = program.arena[rhs].children[0];
            if iv2.lb == 0 && prefix_eq(&program.arena, lhs, inner) {
                // p U[l,u1] (G[0,u2] p) = G[l,l+u2] p
                return Some(program.arena.mk_global(loc, iv.lb, iv.lb + iv2.ub, lhs));
            }
        }
        if let Some(iv2) = as_temporal(&program.arena, rhs, TemporalKind::Future) {
            let inner = program.arena[rhs].children[0];
            if iv2.lb == 0 && prefix_eq(&program.arena, lhs, inner) {
                // p U[l,u1] (F[0,u2] p) = F[l,l+u2] p
                return Some(program.arena.mk_future(loc, iv.lb, iv.lb + iv2.ub, lhs));
            }
        }
        return None;
    }

    None
}

/// Convert to Negation Normal Form: negations pushed down to literals.
/// Preorder with re-reading, since a replacement's children must be
/// traversed in place of the replaced node's.
pub fn to_nnf(program: &mut Program, _context: &mut Context) {
    log::debug(MODULE, 1, "Converting to NNF");

    let mut visited: HashSet<ExprId> = HashSet::new();
    let mut stack = vec![program.pt_spec_set, program.ft_spec_set];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let current = match nnf_node(program, id) {
            Some(new) => {
                program.arena.replace(id, new);
                new
            }
            None => id,
        };
        stack.extend(program.arena[current].children.iter().copied());
    }
}

fn nnf_node(program: &mut Program, id: ExprId) -> Option<ExprId> {
    let loc = program.arena[id].loc;

    if is_op(&program.arena, id, OperatorKind::LogicalNot) {
        let operand = program.arena[id].children[0];

        if is_op(&program.arena, operand, OperatorKind::LogicalNot) {
            // !!p = p
            return Some(program.arena[operand].children[0]);
        }
        if is_op(&program.arena, operand, OperatorKind::LogicalOr) {
            // !(p || q) = !p && !q
            let negated: Vec<ExprId> = program.arena[operand]
                .children
                .clone()
                .into_iter()
                .map(|c| program.arena.mk_not(loc, c))
                .collect();
            return Some(program.arena.mk_and(loc, negated));
        }
        if is_op(&program.arena, operand, OperatorKind::LogicalAnd) {
            // !(p && q) = !p || !q
            let negated: Vec<ExprId> = program.arena[operand]
                .children
                .clone()
                .into_iter()
                .map(|c| program.arena.mk_not(loc, c))
                .collect();
            return Some(program.arena.mk_or(loc, negated));
        }
        if is_op(&program.arena, operand, OperatorKind::LogicalImplies) {
            // !(p -> q) = p && !q
            let lhs = program.arena[operand].children[0];
            let rhs = program.arena[operand].children[1];
            let not_rhs = program.arena.mk_not(loc, rhs);
            return Some(program.arena.mk_and(loc, vec![lhs, not_rhs]));
        }
        if is_op(&program.arena, operand, OperatorKind::LogicalXor) {
            // !(p xor q) = (p && q) || (!p && !q)
            let lhs = program.arena[operand].children[0];
            let rhs = program.arena[operand].children[1];
            let both = program.arena.mk_and(loc, vec![lhs, rhs]);
            let not_lhs = program.arena.mk_not(loc, lhs);
            let not_rhs = program.arena.mk_not(loc, rhs);
            let neither = program.arena.mk_and(loc, vec![not_lhs, not_rhs]);
            return Some(program.arena.mk_or(loc, vec![both, neither]));
        }
        if is_op(&program.arena, operand, OperatorKind::LogicalEquiv) {
            // !(p <-> q) = (p && !q) || (!p && q)
            let lhs = program.arena[operand].children[0];
            let rhs = program.arena[operand].children[1];
            let not_rhs = program.arena.mk_not(loc, rhs);
            let left = program.arena.mk_and(loc, vec![lhs, not_rhs]);
            let not_lhs = program.arena.mk_not(loc, lhs);
            let right = program.arena.mk_and(loc, vec![not_lhs, rhs]);
            return Some(program.arena.mk_or(loc, vec![left, right]));
        }
        if let Some(iv) = as_temporal(&program.arena, operand, TemporalKind::Future) {
            // !F[l,u] p = G[l,u] !p
            let p = program.arena[operand].children[0];
            let not_p = program.arena.mk_not(loc, p);
            return Some(program.arena.mk_global(loc, iv.lb, iv.ub, not_p));
        }
        if let Some(iv) = as_temporal(&program.arena, operand, TemporalKind::Global) {
            // !G[l,u] p = F[l,u] !p
            let p = program.arena[operand].children[0];
            let not_p = program.arena.mk_not(loc, p);
            return Some(program.arena.mk_future(loc, iv.lb, iv.ub, not_p));
        }
        if let Some(iv) = as_temporal(&program.arena, operand, TemporalKind::Until) {
            // !(p U q) = !p R !q
            let lhs = program.arena[operand].children[0];
            let rhs = program.arena[operand].children[1];
            let not_lhs = program.arena.mk_not(loc, lhs);
            let not_rhs = program.arena.mk_not(loc, rhs);
            return Some(program.arena.mk_release(loc, iv.lb, iv.ub, not_lhs, not_rhs));
        }
        if let Some(iv) = as_temporal(&program.arena, operand, TemporalKind::Release) {
            // !(p R q) = !p U !q
            let lhs = program.arena[operand].children[0];
            let rhs = program.arena[operand].children[1];
            let not_lhs = program.arena.mk_not(loc, lhs);
            let not_rhs = program.arena.mk_not(loc, rhs);
            return Some(program.arena.mk_until(loc, iv.lb, iv.ub, not_lhs, not_rhs));
        }
        return None;
    }

    if is_op(&program.arena, id, OperatorKind::LogicalImplies) {
        // p -> q = !p || q
        let lhs = program.arena[id].children[0];
        let rhs = program.arena[id].children[1];
        let not_lhs = program.arena.mk_not(loc, lhs);
        return Some(program.arena.mk_or(loc, vec![not_lhs, rhs]));
    }

    if is_op(&program.arena, id, OperatorKind::LogicalXor) {
        // p xor q = (p && !q) || (!p && q)
        let lhs = program.arena[id].children[0];
        let rhs = program.arena[id].children[1];
        let not_rhs = program.arena.mk_not(loc, rhs);
        let left = program.arena.mk_and(loc, vec![lhs, not_rhs]);
        let not_lhs = program.arena.mk_not(loc, lhs);
        let right = program.arena.mk_and(loc, vec![not_lhs, rhs]);
        return Some(program.arena.mk_or(loc, vec![left, right]));
    }

    None
}

/// Convert to Boolean Normal Form: only `!`, `&&`, and `U` remain.
pub fn to_bnf(program: &mut Program, _context: &mut Context) {
    log::debug(MODULE, 1, "Converting to BNF");

    for id in program.postorder() {
        let loc = program.arena[id].loc;

        if is_op(&program.arena, id, OperatorKind::LogicalOr) {
            // p || q = !(!p && !q)
            let negated: Vec<ExprId> = program.arena[id]
                .children
                .clone()
                .into_iter()
                .map(|c| program.arena.mk_not(loc, c))
                .collect();
            let conj = program.arena.mk_and(loc, negated);
            let new = program.arena.mk_not(loc, conj);
            program.arena.replace(id, new);
        } else if is_op(&program.arena, id, OperatorKind::LogicalImplies) {
            // p -> q = !(p && !q)
            let lhs = program.arena[id].children[0];
            let rhs = program.arena[id].children[1];
            let not_rhs = program.arena.mk_not(loc, rhs);
            let conj = program.arena.mk_and(loc, vec![lhs, not_rhs]);
            let new = program.arena.mk_not(loc, conj);
            program.arena.replace(id, new);
        } else if is_op(&program.arena, id, OperatorKind::LogicalXor) {
            // p xor q = !(!p && !q) && !(p && q)
            let lhs = program.arena[id].children[0];
            let rhs = program.arena[id].children[1];
            let not_lhs = program.arena.mk_not(loc, lhs);
            let not_rhs = program.arena.mk_not(loc, rhs);
            let neither = program.arena.mk_and(loc, vec![not_lhs, not_rhs]);
            let not_neither = program.arena.mk_not(loc, neither);
            let both = program.arena.mk_and(loc, vec![lhs, rhs]);
            let not_both = program.arena.mk_not(loc, both);
            let new = program.arena.mk_and(loc, vec![not_neither, not_both]);
            program.arena.replace(id, new);
        } else if let Some(iv) = as_temporal(&program.arena, id, TemporalKind::Future) {
            // F[l,u] p = true U[l,u] p
            let p = program.arena[id].children[0];
            let t = program.arena.mk_bool(loc, true);
            let new = program.arena.mk_until(loc, iv.lb, iv.ub, t, p);
            program.arena.replace(id, new);
        } else if let Some(iv) = as_temporal(&program.arena, id, TemporalKind::Global) {
            // G[l,u] p = !(true U[l,u] !p)
            let p = program.arena[id].children[0];
            let t = program.arena.mk_bool(loc, true);
            let not_p = program.arena.mk_not(loc, p);
            let until = program.arena.mk_until(loc, iv.lb, iv.ub, t, not_p);
            let new = program.arena.mk_not(loc, until);
            program.arena.replace(id, new);
        } else if let Some(iv) = as_temporal(&program.arena, id, TemporalKind::Release) {
            // p R q = !(!p U !q)
            let lhs = program.arena[id].children[0];
            let rhs = program.arena[id].children[1];
            let not_lhs = program.arena.mk_not(loc, lhs);
            let not_rhs = program.arena.mk_not(loc, rhs);
            let until = program.arena.mk_until(loc, iv.lb, iv.ub, not_lhs, not_rhs);
            let new = program.arena.mk_not(loc, until);
            program.arena.replace(id, new);
        }
    }
}

/// Lower `||`, `xor`, `->`, `<->`, `F`, and `R` into `!`, `&&`, `U` via
/// the standard dualities.
pub fn remove_extended_operators(program: &mut Program, _context: &mut Context) {
    log::debug(MODULE, 1, "Removing extended operators");

    for id in program.postorder() {
        let loc = program.arena[id].loc;

        if is_op(&program.arena, id, OperatorKind::LogicalOr) {
            // p || q = !(!p && !q)
            let negated: Vec<ExprId> = program.arena[id]
                .children
                .clone()
                .into_iter()
                .map(|c| program.arena.mk_not(loc, c))
                .collect();
            let conj = program.arena.mk_and(loc, negated);
            let new = program.arena.mk_not(loc, conj);
            program.arena.replace(id, new);
        } else if is_op(&program.arena, id, OperatorKind::LogicalXor) {
            // p xor q = !(!(p && !q) && !(!p && q))
            let lhs = program.arena[id].children[0];
            let rhs = program.arena[id].children[1];
            let not_rhs = program.arena.mk_not(loc, rhs);
            let left = program.arena.mk_and(loc, vec![lhs, not_rhs]);
            let not_left = program.arena.mk_not(loc, left);
            let not_lhs = program.arena.mk_not(loc, lhs);
            let right = program.arena.mk_and(loc, vec![not_lhs, rhs]);
            let not_right = program.arena.mk_not(loc, right);
            let conj = program.arena.mk_and(loc, vec![not_left, not_right]);
            let new = program.arena.mk_not(loc, conj);
            program.arena.replace(id, new);
        } else if is_op(&program.arena, id, OperatorKind::LogicalImplies) {
            // p -> q = !(p && !q)
            let lhs = program.arena[id].children[0];
            let rhs = program.arena[id].children[1];
            let not_rhs = program.arena.mk_not(loc, rhs);
            let conj = program.arena.mk_and(loc, vec![lhs, not_rhs]);
            let new = program.arena.mk_not(loc, conj);
            program.arena.replace(id, new);
        } else if is_op(&program.arena, id, OperatorKind::LogicalEquiv) {
            // p <-> q = !(p && !q) && !(!p && q)
            let lhs = program.arena[id].children[0];
            let rhs = program.arena[id].children[1];
            let not_rhs = program.arena.mk_not(loc, rhs);
            let left = program.arena.mk_and(loc, vec![lhs, not_rhs]);
            let not_left = program.arena.mk_not(loc, left);
            let not_lhs = program.arena.mk_not(loc, lhs);
            let right = program.arena.mk_and(loc, vec![not_lhs, rhs]);
            let not_right = program.arena.mk_not(loc, right);
            let new = program.arena.mk_and(loc, vec![not_left, not_right]);
            program.arena.replace(id, new);
        } else if let Some(iv) = as_temporal(&program.arena, id, TemporalKind::Release) {
            // p R q = !(!p U !q)
            let lhs = program.arena[id].children[0];
            let rhs = program.arena[id].children[1];
            let not_lhs = program.arena.mk_not(loc, lhs);
            let not_rhs = program.arena.mk_not(loc, rhs);
            let until = program.arena.mk_until(loc, iv.lb, iv.ub, not_lhs, not_rhs);
            let new = program.arena.mk_not(loc, until);
            program.arena.replace(id, new);
        } else if let Some(iv) = as_temporal(&program.arena, id, TemporalKind::Future) {
            // F[l,u] p = true U[l,u] p
            let p = program.arena[id].children[0];
            let t = program.arena.mk_bool(loc, true);
            let new = program.arena.mk_until(loc, iv.lb, iv.ub, t, p);
            program.arena.replace(id, new);
        }
    }
}

/// Left-associative reassociation of n-ary `&&`, `||`, `+`, `*` (n >= 3)
/// into nested binary applications.
pub fn multi_operators_to_binary(program: &mut Program, _context: &mut Context) {
    log::debug(MODULE, 1, "Converting multi-arity operators");

    for id in program.postorder() {
        let Some(op) = program.arena[id].operator().filter(|o| o.is_multi_arity()) else {
            continue;
        };
        let children = program.arena[id].children.clone();
        if children.len() < 3 {
            continue;
        }
        let loc = program.arena[id].loc;
        let ty = program.arena[id].ty.clone();
        let mut acc = {
            let mut node = Expr::new(loc, ExprKind::Operator { op }, vec![children[0], children[1]]);
            node.ty = ty.clone();
            program.arena.alloc(node)
        };
        for &child in &children[2..] {
            let mut node = Expr::new(loc, ExprKind::Operator { op }, vec![acc, child]);
            node.ty = ty.clone();
            acc = program.arena.alloc(node);
        }
        program.arena.replace(id, acc);
    }
}

/// Syntactic common-subexpression elimination keyed on prefix strings,
/// applied to the FT and PT spec sets independently so they never share
/// nodes. Probabilistic subexpressions key into a disjoint namespace.
pub fn optimize_cse(program: &mut Program, _context: &mut Context) {
    log::debug(MODULE, 1, "Performing CSE");

    for set in [program.ft_spec_set, program.pt_spec_set] {
        let mut seen: HashMap<String, ExprId> = HashMap::new();
        for id in program.arena.postorder(set) {
            let mut key = program.arena.to_prefix(id);
            if program.arena.is_probabilistic(id) {
                key = format!("Pr({})", key);
            }
            match seen.get(&key) {
                Some(&canonical) => program.arena.replace(id, canonical),
                None => {
                    seen.insert(key, id);
                }
            }
        }
    }
}

/// Warn about each future-time spec the solver reports unsatisfiable or
/// cannot decide.
pub fn check_sat(program: &mut Program, context: &mut Context) {
    log::debug(MODULE, 1, "Checking FT formulas satisfiability");

    for (symbol, result) in sat::check_sat_specs(program, context) {
        match result {
            sat::SatResult::Sat => log::debug(MODULE, 1, format!("{} is sat", symbol)),
            sat::SatResult::Unsat => log::warning(MODULE, format!("{} is unsat", symbol)),
            sat::SatResult::Unknown => log::warning(MODULE, format!("{} is unknown", symbol)),
        }
    }
}

/// Final memory budget over the rewritten IR.
pub fn compute_scq_sizes(program: &mut Program, context: &mut Context) {
    scq::compute_scq_sizes(program, context);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Config;
    use crate::expr::Loc;

    fn typed(program: &mut Program) -> Context {
        let (ok, context) = crate::typecheck::type_check(program, Config::default());
        assert!(ok, "test program failed to type check");
        context
    }

    fn spec_body(program: &Program) -> ExprId {
        program.spec_expr(program.ft_specs()[0])
    }

    #[test]
    fn rewrite_fuses_nested_globals() {
        // G[0,5] G[0,3] a0 ==> G[0,8] a0, which sizes to three slots.
        let mut program = Program::new();
        program.declare_signals(vec!["a0"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a0");
        let inner = program.arena.mk_global(Loc::none(), 0, 3, a);
        let outer = program.arena.mk_global(Loc::none(), 0, 5, inner);
        program.add_ft_spec("s", 0, outer);
        let mut context = typed(&mut program);
        compute_atomics(&mut program, &mut context);
        optimize_rewrite_rules(&mut program, &mut context);
        assert_eq!(program.arena.to_prefix(spec_body(&program)), "(G[0,8] a0)");
        compute_scq_sizes(&mut program, &mut context);
        assert_eq!(program.total_scq_size, 3);
    }

    #[test]
    fn rewrite_coalesces_overlapping_globals() {
        // G[0,5] a0 && G[3,8] a0 ==> G[0,8] a0.
        let mut program = Program::new();
        program.declare_signals(vec!["a0"], Type::bool());
        let a1 = program.arena.mk_signal(Loc::none(), "a0");
        let a2 = program.arena.mk_signal(Loc::none(), "a0");
        let g1 = program.arena.mk_global(Loc::none(), 0, 5, a1);
        let g2 = program.arena.mk_global(Loc::none(), 3, 8, a2);
        let and = program.arena.mk_and(Loc::none(), vec![g1, g2]);
        program.add_ft_spec("s", 0, and);
        let mut context = typed(&mut program);
        compute_atomics(&mut program, &mut context);
        optimize_rewrite_rules(&mut program, &mut context);
        assert_eq!(program.arena.to_prefix(spec_body(&program)), "(G[0,8] a0)");
    }

    #[test]
    fn rewrite_coalesces_adjacent_globals() {
        // Adjacency: ub+1 >= lb' is enough, no overlap required.
        let mut program = Program::new();
        program.declare_signals(vec!["a0"], Type::bool());
        let a1 = program.arena.mk_signal(Loc::none(), "a0");
        let a2 = program.arena.mk_signal(Loc::none(), "a0");
        let g1 = program.arena.mk_global(Loc::none(), 0, 4, a1);
        let g2 = program.arena.mk_global(Loc::none(), 5, 9, a2);
        let and = program.arena.mk_and(Loc::none(), vec![g1, g2]);
        program.add_ft_spec("s", 0, and);
        let mut context = typed(&mut program);
        compute_atomics(&mut program, &mut context);
        optimize_rewrite_rules(&mut program, &mut context);
        assert_eq!(program.arena.to_prefix(spec_body(&program)), "(G[0,9] a0)");
    }

    #[test]
    fn rewrite_keeps_global_false() {
        // G[l,u] false must NOT fold to false (empty-trace semantics).
        let mut program = Program::new();
        program.declare_signals(vec!["a0"], Type::bool());
        let f = program.arena.mk_bool(Loc::none(), false);
        let g = program.arena.mk_global(Loc::none(), 1, 4, f);
        program.add_ft_spec("s", 0, g);
        let mut context = typed(&mut program);
        compute_atomics(&mut program, &mut context);
        optimize_rewrite_rules(&mut program, &mut context);
        assert_eq!(program.arena.to_prefix(spec_body(&program)), "(G[1,4] false)");
    }

    #[test]
    fn rewrite_factors_distinct_global_bodies() {
        // G[0,5]p && G[3,8]q ==> G[0,5](G[0,0]p && G[3,3]q).
        let mut program = Program::new();
        program.declare_signals(vec!["p", "q"], Type::bool());
        let p = program.arena.mk_signal(Loc::none(), "p");
        let q = program.arena.mk_signal(Loc::none(), "q");
        let g1 = program.arena.mk_global(Loc::none(), 0, 5, p);
        let g2 = program.arena.mk_global(Loc::none(), 3, 8, q);
        let and = program.arena.mk_and(Loc::none(), vec![g1, g2]);
        program.add_ft_spec("s", 0, and);
        let mut context = typed(&mut program);
        compute_atomics(&mut program, &mut context);
        optimize_rewrite_rules(&mut program, &mut context);
        assert_eq!(
            program.arena.to_prefix(spec_body(&program)),
            "(G[0,5] (&& (G[0,0] p) (G[3,3] q)))"
        );
    }

    #[test]
    fn rewrite_collapses_until_into_global() {
        // p U[2,9] (G[0,4] p) ==> G[2,6] p.
        let mut program = Program::new();
        program.declare_signals(vec!["p"], Type::bool());
        let p1 = program.arena.mk_signal(Loc::none(), "p");
        let p2 = program.arena.mk_signal(Loc::none(), "p");
        let g = program.arena.mk_global(Loc::none(), 0, 4, p2);
        let u = program.arena.mk_until(Loc::none(), 2, 9, p1, g);
        program.add_ft_spec("s", 0, u);
        let mut context = typed(&mut program);
        compute_atomics(&mut program, &mut context);
        optimize_rewrite_rules(&mut program, &mut context);
        assert_eq!(program.arena.to_prefix(spec_body(&program)), "(G[2,6] p)");
    }

    #[test]
    fn rewrite_merges_until_pair() {
        let mut program = Program::new();
        program.declare_signals(vec!["p", "q", "r"], Type::bool());
        let p = program.arena.mk_signal(Loc::none(), "p");
        let q1 = program.arena.mk_signal(Loc::none(), "q");
        let q2 = program.arena.mk_signal(Loc::none(), "q");
        let r = program.arena.mk_signal(Loc::none(), "r");
        let u1 = program.arena.mk_until(Loc::none(), 1, 7, p, q1);
        let u2 = program.arena.mk_until(Loc::none(), 1, 5, r, q2);
        let and = program.arena.mk_and(Loc::none(), vec![u1, u2]);
        program.add_ft_spec("s", 0, and);
        let mut context = typed(&mut program);
        compute_atomics(&mut program, &mut context);
        optimize_rewrite_rules(&mut program, &mut context);
        // Operands get sorted by wpd first: u2 (wpd 5) before u1 (wpd 7).
        assert_eq!(
            program.arena.to_prefix(spec_body(&program)),
            "(U[1,5] (&& r p) q)"
        );
    }

    #[test]
    fn extended_operator_elimination_rewrites_future() {
        // F[0,4] a0 ==> true U[0,4] a0.
        let mut program = Program::new();
        program.declare_signals(vec!["a0"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a0");
        let f = program.arena.mk_future(Loc::none(), 0, 4, a);
        program.add_ft_spec("s", 0, f);
        let mut context = typed(&mut program);
        remove_extended_operators(&mut program, &mut context);
        assert_eq!(
            program.arena.to_prefix(spec_body(&program)),
            "(U[0,4] true a0)"
        );
    }

    #[test]
    fn nnf_pushes_negations_to_literals() {
        // !(a0 && !a1) ==> !a0 || a1.
        let mut program = Program::new();
        program.declare_signals(vec!["a0", "a1"], Type::bool());
        let a0 = program.arena.mk_signal(Loc::none(), "a0");
        let a1 = program.arena.mk_signal(Loc::none(), "a1");
        let not_a1 = program.arena.mk_not(Loc::none(), a1);
        let and = program.arena.mk_and(Loc::none(), vec![a0, not_a1]);
        let not = program.arena.mk_not(Loc::none(), and);
        program.add_ft_spec("s", 0, not);
        let mut context = typed(&mut program);
        to_nnf(&mut program, &mut context);
        assert_eq!(
            program.arena.to_prefix(spec_body(&program)),
            "(|| (! a0) a1)"
        );
    }

    #[test]
    fn nnf_is_idempotent() {
        let mut program = Program::new();
        program.declare_signals(vec!["a0", "a1"], Type::bool());
        let a0 = program.arena.mk_signal(Loc::none(), "a0");
        let a1 = program.arena.mk_signal(Loc::none(), "a1");
        let g = program.arena.mk_global(Loc::none(), 0, 3, a1);
        let and = program.arena.mk_and(Loc::none(), vec![a0, g]);
        let not = program.arena.mk_not(Loc::none(), and);
        let f = program.arena.mk_future(Loc::none(), 1, 2, not);
        let outer = program.arena.mk_not(Loc::none(), f);
        program.add_ft_spec("s", 0, outer);
        let mut context = typed(&mut program);
        to_nnf(&mut program, &mut context);
        let first = program.arena.to_prefix(spec_body(&program));
        to_nnf(&mut program, &mut context);
        let second = program.arena.to_prefix(spec_body(&program));
        assert_eq!(first, second);
    }

    #[test]
    fn bnf_leaves_only_not_and_until() {
        let mut program = Program::new();
        program.declare_signals(vec!["a0", "a1"], Type::bool());
        let a0 = program.arena.mk_signal(Loc::none(), "a0");
        let a1 = program.arena.mk_signal(Loc::none(), "a1");
        let or = program.arena.mk_or(Loc::none(), vec![a0, a1]);
        let g = program.arena.mk_global(Loc::none(), 0, 3, or);
        program.add_ft_spec("s", 0, g);
        let mut context = typed(&mut program);
        to_bnf(&mut program, &mut context);
        for id in program.arena.postorder(spec_body(&program)) {
            match &program.arena[id].kind {
                ExprKind::Operator { op } => assert!(
                    matches!(op, OperatorKind::LogicalNot | OperatorKind::LogicalAnd),
                    "unexpected operator {:?}",
                    op
                ),
                ExprKind::Temporal { op, .. } => {
                    assert_eq!(*op, TemporalKind::Until)
                }
                _ => {}
            }
        }
    }

    #[test]
    fn multi_arity_conjunction_becomes_left_nested() {
        let mut program = Program::new();
        program.declare_signals(vec!["a", "b", "c"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let b = program.arena.mk_signal(Loc::none(), "b");
        let c = program.arena.mk_signal(Loc::none(), "c");
        let and = program.arena.mk_and(Loc::none(), vec![a, b, c]);
        program.add_ft_spec("s", 0, and);
        let mut context = typed(&mut program);
        multi_operators_to_binary(&mut program, &mut context);
        assert_eq!(
            program.arena.to_prefix(spec_body(&program)),
            "(&& (&& a b) c)"
        );
    }

    #[test]
    fn flatten_merges_nested_conjunctions() {
        let mut program = Program::new();
        program.declare_signals(vec!["a", "b", "c"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let b = program.arena.mk_signal(Loc::none(), "b");
        let c = program.arena.mk_signal(Loc::none(), "c");
        let inner = program.arena.mk_and(Loc::none(), vec![a, b]);
        let outer = program.arena.mk_and(Loc::none(), vec![inner, c]);
        program.add_ft_spec("s", 0, outer);
        let mut context = typed(&mut program);
        flatten_multi_operators(&mut program, &mut context);
        assert_eq!(program.arena.to_prefix(spec_body(&program)), "(&& a b c)");
    }

    #[test]
    fn cse_shares_syntactically_equal_subtrees() {
        let mut program = Program::new();
        program.declare_signals(vec!["a"], Type::bool());
        let a1 = program.arena.mk_signal(Loc::none(), "a");
        let a2 = program.arena.mk_signal(Loc::none(), "a");
        let g1 = program.arena.mk_global(Loc::none(), 0, 3, a1);
        let g2 = program.arena.mk_global(Loc::none(), 0, 3, a2);
        let and = program.arena.mk_and(Loc::none(), vec![g1, g2]);
        program.add_ft_spec("s", 0, and);
        let mut context = typed(&mut program);
        optimize_cse(&mut program, &mut context);
        let body = spec_body(&program);
        let kids = program.arena[body].children.clone();
        assert_eq!(kids[0], kids[1], "equal subtrees must share one node");
    }

    #[test]
    fn cse_is_idempotent() {
        let mut program = Program::new();
        program.declare_signals(vec!["a", "b"], Type::bool());
        let a1 = program.arena.mk_signal(Loc::none(), "a");
        let a2 = program.arena.mk_signal(Loc::none(), "a");
        let b = program.arena.mk_signal(Loc::none(), "b");
        let and1 = program.arena.mk_and(Loc::none(), vec![a1, b]);
        let and2 = program.arena.mk_and(Loc::none(), vec![a2, b]);
        let or = program.arena.mk_or(Loc::none(), vec![and1, and2]);
        program.add_ft_spec("s", 0, or);
        let mut context = typed(&mut program);
        optimize_cse(&mut program, &mut context);
        let first: Vec<ExprId> = program.postorder();
        optimize_cse(&mut program, &mut context);
        let second: Vec<ExprId> = program.postorder();
        assert_eq!(first, second, "second CSE run must be a fixed point");
    }

    #[test]
    fn cse_keeps_ft_and_pt_disjoint() {
        let mut program = Program::new();
        program.declare_signals(vec!["a"], Type::bool());
        let a1 = program.arena.mk_signal(Loc::none(), "a");
        let a2 = program.arena.mk_signal(Loc::none(), "a");
        program.add_ft_spec("f", 0, a1);
        program.add_pt_spec("p", 0, a2);
        let mut context = typed(&mut program);
        optimize_cse(&mut program, &mut context);
        assert_ne!(
            program.spec_expr(program.ft_specs()[0]),
            program.spec_expr(program.arena[program.pt_spec_set].children[0]),
            "FT and PT spec sets must never share nodes"
        );
    }

    #[test]
    fn expansion_inlines_definitions() {
        let mut program = Program::new();
        program.declare_signals(vec!["a", "b"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let b = program.arena.mk_signal(Loc::none(), "b");
        let def_body = program.arena.mk_and(Loc::none(), vec![a, b]);
        program.add_define("both", def_body);
        let use_site = program.arena.mk_variable(Loc::none(), "both");
        let g = program.arena.mk_global(Loc::none(), 0, 2, use_site);
        program.add_ft_spec("s", 0, g);
        let mut context = typed(&mut program);
        expand_definitions(&mut program, &mut context);
        assert_eq!(
            program.arena.to_prefix(spec_body(&program)),
            "(G[0,2] (&& a b))"
        );
        // Shared identity: the spec points at the definition body itself.
        assert_eq!(program.arena[spec_body(&program)].children[0], def_body);
    }

    #[test]
    fn probabilistic_uses_get_their_own_definition_bucket() {
        // A definition referenced both under a probability bound and
        // outside one must never alias: the probabilistic use site gets a
        // Pr() duplicate of the definition body.
        let mut program = Program::new();
        program.declare_signals(vec!["a", "b"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let b = program.arena.mk_signal(Loc::none(), "b");
        let def_body = program.arena.mk_and(Loc::none(), vec![a, b]);
        program.add_define("both", def_body);

        let plain_use = program.arena.mk_variable(Loc::none(), "both");
        let prob_use = program.arena.mk_variable(Loc::none(), "both");
        let g = program.arena.mk_global(Loc::none(), 0, 2, prob_use);
        let pr = program.arena.alloc(Expr::new(
            Loc::none(),
            ExprKind::Probability { prob: 0.95 },
            vec![g],
        ));
        let and = program.arena.mk_and(Loc::none(), vec![plain_use, pr]);
        program.add_ft_spec("s", 0, and);

        let mut context = typed(&mut program);
        expand_definitions(&mut program, &mut context);

        assert!(context.definitions.contains_key("Pr(both)"));
        let plain_site = program.arena[spec_body(&program)].children[0];
        let pr_node = program.arena[spec_body(&program)].children[1];
        let g_node = program.arena[pr_node].children[0];
        let prob_site = program.arena[g_node].children[0];
        assert_eq!(plain_site, def_body, "plain use shares the definition body");
        assert_ne!(prob_site, def_body, "probabilistic use must not alias");
        assert_eq!(
            program.arena.to_prefix(prob_site),
            program.arena.to_prefix(def_body)
        );
    }

    #[test]
    fn contracts_resolve_to_three_formulas() {
        let mut program = Program::new();
        program.declare_signals(vec!["a", "g"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let g = program.arena.mk_signal(Loc::none(), "g");
        program.add_ft_contract("safety", (0, 1, 2), a, g);
        let mut context = typed(&mut program);
        resolve_contracts(&mut program, &mut context);
        let specs = program.ft_specs();
        assert_eq!(specs.len(), 3);
        let symbols: Vec<String> = specs
            .iter()
            .map(|&s| program.spec_symbol(s).unwrap().to_string())
            .collect();
        assert_eq!(
            symbols,
            vec!["__safety_active__", "__safety_valid__", "__safety_verified__"]
        );
        assert_eq!(
            program.arena.to_prefix(program.spec_expr(specs[1])),
            "(-> a g)"
        );
        assert_eq!(
            program.arena.to_prefix(program.spec_expr(specs[2])),
            "(&& a g)"
        );
    }

    #[test]
    fn foreach_unrolls_into_conjunction() {
        let mut program = Program::new();
        program.declare_signals(vec!["a", "b"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let b = program.arena.mk_signal(Loc::none(), "b");
        let set = program
            .arena
            .alloc(Expr::new(Loc::none(), ExprKind::SetExpression, vec![a, b]));
        let body_var = program.arena.mk_variable(Loc::none(), "x");
        let body = program.arena.mk_not(Loc::none(), body_var);
        let agg = program.arena.alloc(Expr::new(
            Loc::none(),
            ExprKind::SetAggregation {
                op: crate::expr::AggregationKind::ForEach,
                bound: "x".to_string(),
            },
            vec![set, body],
        ));
        program.add_ft_spec("s", 0, agg);
        let mut context = typed(&mut program);
        unroll_set_aggregation(&mut program, &mut context);
        assert_eq!(
            program.arena.to_prefix(spec_body(&program)),
            "(&& (! a) (! b))"
        );
    }

    #[test]
    fn pipeline_leaves_no_compile_time_constructs() {
        // P1: after the pipeline, no Variable / FunctionCall / Struct /
        // StructAccess / SetExpression / SetAggregation / Contract nodes.
        let mut program = Program::new();
        program.declare_signals(vec!["a", "b"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let b = program.arena.mk_signal(Loc::none(), "b");
        let def_body = program.arena.mk_or(Loc::none(), vec![a, b]);
        program.add_define("either", def_body);
        let use1 = program.arena.mk_variable(Loc::none(), "either");
        let g = program.arena.mk_global(Loc::none(), 0, 4, use1);
        program.add_ft_spec("s", 0, g);
        let assume = program.arena.mk_signal(Loc::none(), "a");
        let guarantee = program.arena.mk_signal(Loc::none(), "b");
        program.add_ft_contract("agc", (1, 2, 3), assume, guarantee);
        let mut context = typed(&mut program);
        run_passes(&mut program, &mut context, &PassOptions::default());
        for id in program.postorder() {
            assert!(
                !matches!(
                    program.arena[id].kind,
                    ExprKind::Variable { .. }
                        | ExprKind::FunctionCall { .. }
                        | ExprKind::Struct { .. }
                        | ExprKind::StructAccess { .. }
                        | ExprKind::SetExpression
                        | ExprKind::SetAggregation { .. }
                        | ExprKind::Contract { .. }
                ),
                "compile-time construct survived the pipeline: {:?}",
                program.arena[id].kind
            );
        }
    }

    #[test]
    fn pass_list_respects_exclusions() {
        let mut opts = PassOptions::default();
        opts.enable_eqsat = true;
        let names: Vec<&str> = pass_list(&opts).iter().map(|(n, _)| *n).collect();
        assert!(names.contains(&"optimize_eqsat"));
        assert!(!names.contains(&"optimize_rewrite_rules"));
        assert!(!names.contains(&"optimize_cse"));
        assert!(!names.contains(&"remove_extended_operators"));
        assert!(!names.contains(&"multi_operators_to_binary"));

        let mut opts = PassOptions::default();
        opts.enable_nnf = true;
        opts.enable_bnf = true;
        let names: Vec<&str> = pass_list(&opts).iter().map(|(n, _)| *n).collect();
        assert!(names.contains(&"to_nnf"));
        assert!(!names.contains(&"to_bnf"), "NNF wins when both are requested");
    }
}
