//! Propagation delays and Shared Connection Queue (SCQ) sizing.
//!
//! Every node the temporal-logic engine evaluates owns a ring buffer in
//! the monitor. Its size is driven by how far the node's output can lag
//! behind (best-case propagation delay, BPD) and how long siblings can
//! keep it waiting (worst-case propagation delay, WPD):
//!
//! ```text
//! q        = max(max_sibling_wpd - bpd, 0)
//! scq_size = q + min(q, H) + 1        where H = max(prediction_horizon - 1, 0)
//! ```
//!
//! Probability-bearing nodes additionally buffer the widest interval of
//! any temporal parent. Sizing runs over the *final* IR only, after all
//! rewrites have settled.

use crate::context::{Context, Program};
use crate::expr::{ExprId, ExprKind, OperatorKind};
use crate::log;
use crate::types::Engine;

const MODULE: &str = "SCQ";

/// Compute `(bpd, wpd)` for every node reachable from the spec sets.
///
/// Leaves are `(0, 0)`; negation passes its operand through; boolean
/// connectives take the min BPD and max WPD of their children; temporal
/// operators then shift by `lb` and `ub`.
pub fn compute_propagation_delays(program: &mut Program) {
    for root in [program.ft_spec_set, program.pt_spec_set] {
        for id in program.arena.postorder(root) {
            let (bpd, wpd) = delay_of(program, id);
            let node = &mut program.arena[id];
            node.bpd = bpd;
            node.wpd = wpd;
        }
    }
}

fn delay_of(program: &Program, id: ExprId) -> (i64, i64) {
    let node = &program.arena[id];
    let child_delays: Vec<(i64, i64)> = node
        .children
        .iter()
        .map(|&c| (program.arena[c].bpd, program.arena[c].wpd))
        .collect();

    match &node.kind {
        ExprKind::Operator { op } if *op == OperatorKind::LogicalNot => child_delays[0],
        ExprKind::Operator { op } if op.is_logical() => {
            let bpd = child_delays.iter().map(|d| d.0).min().unwrap_or(0);
            let wpd = child_delays.iter().map(|d| d.1).max().unwrap_or(0);
            (bpd, wpd)
        }
        ExprKind::Temporal { interval, .. } => {
            let bpd = child_delays.iter().map(|d| d.0).min().unwrap_or(0) + interval.lb as i64;
            let wpd = child_delays.iter().map(|d| d.1).max().unwrap_or(0) + interval.ub as i64;
            (bpd, wpd)
        }
        ExprKind::Probability { .. } | ExprKind::Formula { .. } => {
            child_delays.first().copied().unwrap_or((0, 0))
        }
        // Leaves, front-end computed nodes, and spec sections.
        _ => (0, 0),
    }
}

/// Compute per-node queue sizes and `[start, end)` offsets for everything
/// reachable from the future-time spec set, and the program-wide total.
pub fn compute_scq_sizes(program: &mut Program, context: &Context) {
    compute_propagation_delays(program);

    let horizon = std::cmp::max(context.config.prediction_horizon - 1, 0);
    let mut total: i64 = 0;

    for id in program.arena.postorder(program.ft_spec_set) {
        match &program.arena[id].kind {
            ExprKind::SpecSection { .. } => continue,
            ExprKind::Formula { .. } => {
                let body = program.arena[id].children[0];
                let body_total = program.arena[body].total_scq_size;
                let node = &mut program.arena[id];
                node.scq_size = 1;
                node.total_scq_size = body_total + 1;
                total += 1;
                node.scq = (total - 1, total);
                continue;
            }
            _ => {}
        }

        if program.arena[id].engine != Engine::TemporalLogic
            && !context.atomic_id.contains_key(&id)
        {
            continue;
        }

        let max_wpd = program
            .arena
            .siblings(id)
            .iter()
            .map(|&s| program.arena[s].wpd)
            .max()
            .unwrap_or(0)
            .max(0);

        let q = std::cmp::max(max_wpd - program.arena[id].bpd, 0);
        let scq_size = if program.arena.is_probabilistic(id) {
            let buffer = program.arena[id]
                .parents
                .iter()
                .filter_map(|&p| program.arena[p].temporal())
                .map(|(_, interval)| interval.duration() as i64)
                .max()
                .unwrap_or(0);
            q + buffer + std::cmp::min(q + buffer, horizon) + 1
        } else {
            q + std::cmp::min(q, horizon) + 1
        };

        let children_total: i64 = program.arena[id]
            .children
            .iter()
            .filter(|&&c| program.arena[c].scq_size > -1)
            .map(|&c| program.arena[c].total_scq_size)
            .sum();

        let node = &mut program.arena[id];
        node.scq_size = scq_size;
        node.total_scq_size = children_total + scq_size;
        total += scq_size;
        node.scq = (total - scq_size, total);
    }

    program.total_scq_size = total;
    log::debug(MODULE, 1, format!("Program SCQ size: {}", total));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Config;
    use crate::expr::Loc;
    use crate::typecheck::type_check;
    use crate::types::Type;

    fn checked(program: &mut Program) -> Context {
        let (ok, context) = type_check(program, Config::default());
        assert!(ok);
        context
    }

    #[test]
    fn delays_of_nested_globals() {
        let mut program = Program::new();
        program.declare_signals(vec!["a"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let inner = program.arena.mk_global(Loc::none(), 0, 3, a);
        let outer = program.arena.mk_global(Loc::none(), 0, 5, inner);
        program.add_ft_spec("s", 0, outer);
        compute_propagation_delays(&mut program);
        assert_eq!((program.arena[a].bpd, program.arena[a].wpd), (0, 0));
        assert_eq!((program.arena[inner].bpd, program.arena[inner].wpd), (0, 3));
        assert_eq!((program.arena[outer].bpd, program.arena[outer].wpd), (0, 8));
    }

    #[test]
    fn fused_global_totals_three_slots() {
        // G[0,8] a0 sizes to formula(1) + G(1) + a0(1) = 3.
        let mut program = Program::new();
        program.declare_signals(vec!["a0"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a0");
        let g = program.arena.mk_global(Loc::none(), 0, 8, a);
        program.add_ft_spec("s", 0, g);
        let mut context = checked(&mut program);
        crate::passes::compute_atomics(&mut program, &mut context);
        compute_scq_sizes(&mut program, &context);
        assert_eq!(program.total_scq_size, 3);
        assert_eq!(program.arena[g].scq_size, 1);
        assert_eq!(program.arena[a].scq_size, 1);
    }

    #[test]
    fn lagging_sibling_gets_a_deeper_queue() {
        // In a0 && G[0,5] a1, a0 must buffer while the Global waits.
        let mut program = Program::new();
        program.declare_signals(vec!["a0", "a1"], Type::bool());
        let a0 = program.arena.mk_signal(Loc::none(), "a0");
        let a1 = program.arena.mk_signal(Loc::none(), "a1");
        let g = program.arena.mk_global(Loc::none(), 0, 5, a1);
        let and = program.arena.mk_and(Loc::none(), vec![a0, g]);
        program.add_ft_spec("s", 0, and);
        let mut context = checked(&mut program);
        crate::passes::compute_atomics(&mut program, &mut context);
        compute_scq_sizes(&mut program, &context);
        // a0: siblings {a0, G}, max_wpd 5, bpd 0 -> 5 + 1 = 6 slots.
        assert_eq!(program.arena[a0].scq_size, 6);
        // The Global itself has wpd equal to its sibling max, one slot.
        assert_eq!(program.arena[g].scq_size, 1);
    }

    #[test]
    fn offsets_are_sequential_and_disjoint() {
        let mut program = Program::new();
        program.declare_signals(vec!["a0", "a1"], Type::bool());
        let a0 = program.arena.mk_signal(Loc::none(), "a0");
        let a1 = program.arena.mk_signal(Loc::none(), "a1");
        let and = program.arena.mk_and(Loc::none(), vec![a0, a1]);
        let g = program.arena.mk_global(Loc::none(), 0, 4, and);
        program.add_ft_spec("s", 0, g);
        let mut context = checked(&mut program);
        crate::passes::compute_atomics(&mut program, &mut context);
        compute_scq_sizes(&mut program, &context);
        let mut spans: Vec<(i64, i64)> = program
            .postorder()
            .iter()
            .filter(|&&id| program.arena[id].scq_size > -1)
            .map(|&id| program.arena[id].scq)
            .collect();
        spans.sort();
        let mut end = 0;
        for (lo, hi) in spans {
            assert_eq!(lo, end, "offsets must be allocated sequentially");
            assert!(hi > lo);
            end = hi;
        }
        assert_eq!(end, program.total_scq_size);
    }

    #[test]
    fn bpd_never_exceeds_wpd() {
        let mut program = Program::new();
        program.declare_signals(vec!["a", "b"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let b = program.arena.mk_signal(Loc::none(), "b");
        let f = program.arena.mk_future(Loc::none(), 2, 6, a);
        let g = program.arena.mk_global(Loc::none(), 1, 3, b);
        let u = program.arena.mk_until(Loc::none(), 0, 4, f, g);
        program.add_ft_spec("s", 0, u);
        compute_propagation_delays(&mut program);
        for id in program.postorder() {
            let node = &program.arena[id];
            assert!(node.bpd <= node.wpd, "bpd > wpd on {:?}", id);
        }
    }
}
