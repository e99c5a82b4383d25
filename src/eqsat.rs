//! Equality saturation over MLTL via an external saturation engine.
//!
//! The optimizer encodes a formula into the engine's S-expression input
//! language, saturates it against the embedded MLTL rule set, and parses
//! the resulting e-graph from JSON. Extraction is done here rather than in
//! the engine because the SCQ cost of a node depends on its *siblings*
//! (a child queue must cover the slowest co-operand), which an engine-side
//! per-node cost function cannot express.
//!
//! ```text
//! formula ──encode──> .egg ──engine --to-json──> .json ──parse──> e-graph
//!                                                                  │
//!     new formula <──rebuild── representatives <──SCQ-aware extract┘
//! ```
//!
//! The extracted formula replaces the original unconditionally; the
//! equivalence verdict from the solver is recorded as telemetry
//! (`equiv_result=equiv|not-equiv|unknown`). Extraction failure aborts
//! this pass only and leaves the input IR untouched.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::process::Command;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::context::{Context, Program};
use crate::expr::{ExprArena, ExprId, ExprKind, Loc, OperatorKind, TemporalKind};
use crate::log;
use crate::types::Interval;
use crate::{passes, sat, scq, util};

const MODULE: &str = "EQST";

const INF: i64 = 1_000_000_000;

/// The MLTL term language and rewrite rules fed to the engine before
/// every query.
const PRELUDE: &str = include_str!("mltl.egg");

/// Directive closing every query: saturate the embedded rule set.
const SCHEDULE: &str = "(run-schedule (saturate mltl-rewrites))";

// ---- JSON wire format ----

#[derive(Debug, Deserialize)]
struct RawEGraph {
    nodes: HashMap<String, RawENode>,
}

#[derive(Debug, Deserialize)]
struct RawENode {
    op: String,
    #[serde(default)]
    children: Vec<String>,
    eclass: String,
}

/// Payload nodes (intervals, interval bounds, variable names, boolean
/// literals) are folded into their owning e-node rather than becoming
/// e-nodes themselves.
fn is_payload_id(id: &str) -> bool {
    id.contains("Interval") || id.contains("i64") || id.contains("String") || id.contains("bool")
}

/// One node of the saturated e-graph.
#[derive(Debug, Clone)]
pub struct ENode {
    pub enode_id: String,
    pub op: String,
    pub interval: Option<Interval>,
    pub string: Option<String>,
    pub value: Option<bool>,
    pub child_eclass_ids: Vec<String>,
    pub eclass_id: String,
}

impl ENode {
    fn from_json(id: &str, nodes: &HashMap<String, RawENode>) -> Result<ENode, String> {
        let content = nodes
            .get(id)
            .ok_or_else(|| format!("unknown e-node id '{}'", id))?;

        let mut child_eclass_ids = Vec::new();
        for child in &content.children {
            if is_payload_id(child) {
                continue;
            }
            let child_node = nodes
                .get(child)
                .ok_or_else(|| format!("unknown child e-node id '{}'", child))?;
            child_eclass_ids.push(child_node.eclass.clone());
        }

        let mut interval = None;
        let mut string = None;
        let mut value = None;

        if matches!(content.op.as_str(), "Global" | "Future" | "Until" | "Release") {
            let interval_ids: Vec<&String> = content
                .children
                .iter()
                .filter(|c| c.contains("Interval"))
                .collect();
            if interval_ids.len() != 1 {
                return Err(format!(
                    "invalid number of intervals for temporal op {} ({})",
                    id,
                    interval_ids.len()
                ));
            }
            let interval_node = nodes
                .get(interval_ids[0])
                .ok_or_else(|| format!("unknown interval id '{}'", interval_ids[0]))?;
            if interval_node.children.len() != 2 {
                return Err(format!(
                    "invalid number of children for interval {} ({})",
                    interval_ids[0],
                    interval_node.children.len()
                ));
            }
            let bound = |idx: usize| -> Result<u32, String> {
                let bound_id = &interval_node.children[idx];
                let bound_node = nodes
                    .get(bound_id)
                    .ok_or_else(|| format!("unknown bound id '{}'", bound_id))?;
                bound_node
                    .op
                    .parse::<u32>()
                    .map_err(|_| format!("non-numeric interval bound '{}'", bound_node.op))
            };
            interval = Some(Interval::new(bound(0)?, bound(1)?));
        } else if content.op.starts_with("Var") {
            let string_ids: Vec<&String> = content
                .children
                .iter()
                .filter(|c| c.contains("String"))
                .collect();
            if string_ids.len() != 1 {
                return Err(format!(
                    "invalid number of strings for var {} ({})",
                    id,
                    string_ids.len()
                ));
            }
            let string_node = nodes
                .get(string_ids[0])
                .ok_or_else(|| format!("unknown string id '{}'", string_ids[0]))?;
            string = Some(string_node.op.clone());
        } else if content.op.starts_with("Bool") {
            let bool_ids: Vec<&String> = content
                .children
                .iter()
                .filter(|c| c.contains("bool"))
                .collect();
            if bool_ids.len() != 1 {
                return Err(format!(
                    "invalid number of bools for {} ({})",
                    id,
                    bool_ids.len()
                ));
            }
            let bool_node = nodes
                .get(bool_ids[0])
                .ok_or_else(|| format!("unknown bool id '{}'", bool_ids[0]))?;
            value = Some(bool_node.op.contains("true"));
        }

        Ok(ENode {
            enode_id: id.to_string(),
            op: content.op.clone(),
            interval,
            string,
            value,
            child_eclass_ids,
            eclass_id: content.eclass.clone(),
        })
    }

    /// The atomic id carried by a `Var` payload (`"a3"` -> 3).
    fn atomic_id(&self) -> Option<u32> {
        self.string
            .as_deref()?
            .trim_matches('"')
            .strip_prefix('a')?
            .parse()
            .ok()
    }
}

/// A saturated e-graph with its root e-class located.
#[derive(Debug)]
pub struct EGraph {
    pub root: String,
    pub eclasses: HashMap<String, Vec<ENode>>,
}

impl EGraph {
    /// Build an e-graph from the engine's JSON output and locate the
    /// e-class of the original expression by structural matching.
    /// Exactly one candidate root e-class is required.
    pub fn from_json(
        text: &str,
        original: ExprId,
        arena: &ExprArena,
        context: &Context,
    ) -> Result<EGraph, String> {
        let raw: RawEGraph =
            serde_json::from_str(text).map_err(|err| format!("bad e-graph JSON: {}", err))?;
        Self::from_raw(&raw, original, arena, context)
    }

    fn from_raw(
        raw: &RawEGraph,
        original: ExprId,
        arena: &ExprArena,
        context: &Context,
    ) -> Result<EGraph, String> {
        let mut eclasses: HashMap<String, Vec<ENode>> = HashMap::new();
        for id in raw.nodes.keys() {
            if is_payload_id(id) {
                continue;
            }
            let enode = ENode::from_json(id, &raw.nodes)?;
            eclasses.entry(enode.eclass_id.clone()).or_default().push(enode);
        }

        if eclasses.is_empty() {
            return Err("empty e-graph".to_string());
        }

        let graph = EGraph {
            root: String::new(),
            eclasses,
        };

        let mut candidates: Vec<String> = Vec::new();
        for enodes in graph.eclasses.values() {
            for enode in enodes {
                if graph.matches_subtree(arena, context, original, enode)
                    && !candidates.contains(&enode.eclass_id)
                {
                    candidates.push(enode.eclass_id.clone());
                }
            }
        }

        match candidates.len() {
            1 => Ok(EGraph {
                root: candidates.into_iter().next().unwrap(),
                eclasses: graph.eclasses,
            }),
            0 => Err("no root candidates".to_string()),
            n => Err(format!("many root candidates ({})", n)),
        }
    }

    /// Whether `enode`'s operator, arity, and payload match the top level
    /// of `expr`.
    fn is_match_top_level(
        &self,
        arena: &ExprArena,
        context: &Context,
        expr: ExprId,
        enode: &ENode,
    ) -> bool {
        let node = &arena[expr];
        if enode.op == "Bool" {
            return node.bool_value().is_some() && node.bool_value() == enode.value;
        }
        if enode.op.starts_with("Var") {
            return match (context.atomic_id.get(&expr), enode.atomic_id()) {
                (Some(&aid), Some(enode_aid)) => aid == enode_aid,
                _ => false,
            };
        }
        if enode.op == "Not" {
            return node.operator() == Some(OperatorKind::LogicalNot);
        }
        if enode.op.starts_with("And") {
            return node.operator() == Some(OperatorKind::LogicalAnd)
                && node.children.len() == enode.child_eclass_ids.len();
        }
        if enode.op.starts_with("Or") {
            return node.operator() == Some(OperatorKind::LogicalOr)
                && node.children.len() == enode.child_eclass_ids.len();
        }
        if enode.op == "Equiv" {
            return node.operator() == Some(OperatorKind::LogicalEquiv);
        }
        if enode.op == "Implies" {
            return node.operator() == Some(OperatorKind::LogicalImplies);
        }
        for (name, kind) in [
            ("Global", TemporalKind::Global),
            ("Future", TemporalKind::Future),
            ("Until", TemporalKind::Until),
            ("Release", TemporalKind::Release),
        ] {
            if enode.op == name {
                return matches!(node.temporal(), Some((k, iv)) if k == kind && Some(iv) == enode.interval);
            }
        }
        false
    }

    /// Whether `expr`'s whole subtree can be matched through `enode`:
    /// every child subtree must find at least one matching e-node in the
    /// corresponding child e-class. Recursion is bounded by the depth of
    /// the original expression.
    fn matches_subtree(
        &self,
        arena: &ExprArena,
        context: &Context,
        expr: ExprId,
        enode: &ENode,
    ) -> bool {
        if !self.is_match_top_level(arena, context, expr, enode) {
            return false;
        }
        for (&child_expr, child_eclass) in
            arena[expr].children.iter().zip(enode.child_eclass_ids.iter())
        {
            let Some(child_enodes) = self.eclasses.get(child_eclass) else {
                return false;
            };
            if !child_enodes
                .iter()
                .any(|child| self.matches_subtree(arena, context, child_expr, child))
            {
                return false;
            }
        }
        true
    }

    /// Visit every e-node, children's e-classes before their parents'
    /// where possible (cycles are cut at already-visited e-classes).
    pub fn traverse(&self) -> Vec<&ENode> {
        let mut out = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&ENode, bool)> = self
            .eclasses
            .get(&self.root)
            .map(|nodes| nodes.iter().map(|n| (n, false)).collect())
            .unwrap_or_default();

        while let Some((enode, seen)) = stack.pop() {
            if seen {
                out.push(enode);
                continue;
            }
            stack.push((enode, true));
            visited.insert(enode.eclass_id.as_str());
            for child in &enode.child_eclass_ids {
                if visited.contains(child.as_str()) {
                    continue;
                }
                if let Some(nodes) = self.eclasses.get(child) {
                    stack.extend(nodes.iter().map(|n| (n, false)));
                }
            }
        }
        out
    }

    /// For each e-class, the maximum achievable best-case propagation
    /// delay and the minimum achievable worst-case delay across its
    /// members. Two traversal rounds absorb cycles: entries still at
    /// `(-1, INF)` after the first round converge on the second.
    pub fn compute_propagation_delays(&self) -> (HashMap<String, i64>, HashMap<String, i64>) {
        let mut max_bpd: HashMap<String, i64> =
            self.eclasses.keys().map(|k| (k.clone(), -1)).collect();
        let mut min_wpd: HashMap<String, i64> =
            self.eclasses.keys().map(|k| (k.clone(), INF)).collect();

        for round in 0..2 {
            for enode in self.traverse() {
                if round == 1
                    && max_bpd[&enode.eclass_id] >= 0
                    && min_wpd[&enode.eclass_id] < INF
                {
                    continue;
                }
                self.delay_step(enode, &mut max_bpd, &mut min_wpd);
            }
        }

        (max_bpd, min_wpd)
    }

    fn delay_step(
        &self,
        enode: &ENode,
        max_bpd: &mut HashMap<String, i64>,
        min_wpd: &mut HashMap<String, i64>,
    ) {
        let ec = enode.eclass_id.clone();
        if matches!(enode.op.as_str(), "Bool" | "true" | "false") || enode.op.starts_with("Var") {
            max_bpd.insert(ec.clone(), 0);
            min_wpd.insert(ec, 0);
        } else if enode.op == "Not" {
            let operand = &enode.child_eclass_ids[0];
            let (b, w) = (max_bpd[operand], min_wpd[operand]);
            max_bpd.insert(ec.clone(), b);
            min_wpd.insert(ec, w);
        } else {
            let (lb, ub) = match enode.interval {
                Some(iv) => (iv.lb as i64, iv.ub as i64),
                None => (0, 0),
            };
            let child_bpds: Vec<i64> = enode
                .child_eclass_ids
                .iter()
                .map(|c| max_bpd[c])
                .collect();
            let finite_wpds: Vec<i64> = enode
                .child_eclass_ids
                .iter()
                .map(|c| min_wpd[c])
                .filter(|&w| w < INF)
                .collect();
            let cur_bpd = child_bpds.iter().copied().min().unwrap_or(0) + lb;
            let cur_wpd = match finite_wpds.iter().copied().max() {
                Some(w) => w + ub,
                None => INF,
            };
            let entry_b = max_bpd.entry(ec.clone()).or_insert(-1);
            *entry_b = (*entry_b).max(cur_bpd);
            let entry_w = min_wpd.entry(ec).or_insert(INF);
            *entry_w = (*entry_w).min(cur_wpd);
        }
    }

    /// The local SCQ cost of each e-node. Leaves and single-operand
    /// operators cost one slot; every other operator pays, per child, the
    /// gap between the slowest sibling's WPD and the child's own BPD (the
    /// unique slowest child is measured against the runner-up instead).
    pub fn compute_cost(&self) -> HashMap<String, i64> {
        let mut cost: HashMap<String, i64> = self
            .traverse()
            .iter()
            .map(|n| (n.enode_id.clone(), INF))
            .collect();

        let (max_bpd, min_wpd) = self.compute_propagation_delays();

        for enode in self.traverse() {
            let value = if matches!(enode.op.as_str(), "Bool" | "true" | "false")
                || enode.op.starts_with("Var")
            {
                1
            } else if matches!(enode.op.as_str(), "Global" | "Future" | "Not") {
                // Lonely single children: no sibling can stall them.
                1
            } else {
                let mut wpds: Vec<i64> = enode
                    .child_eclass_ids
                    .iter()
                    .map(|c| min_wpd[c])
                    .collect();
                let max1 = wpds.iter().copied().max().unwrap_or(0);
                if let Some(pos) = wpds.iter().position(|&w| w == max1) {
                    wpds.remove(pos);
                }
                let max2 = wpds.iter().copied().max().unwrap_or(0);

                let mut total = 1;
                for child in &enode.child_eclass_ids {
                    let against = if min_wpd[child] == max1 { max2 } else { max1 };
                    total += std::cmp::max(against - max_bpd[child], 0);
                }
                total
            };
            cost.insert(enode.enode_id.clone(), value);
        }

        cost
    }

    /// Pick the cheapest representative of every e-class by total cost
    /// and rebuild the IR bottom-up from the root's representative.
    /// Atomics map back to the original expression carrying the same
    /// atomic id.
    pub fn extract(
        &self,
        arena: &mut ExprArena,
        atomics: &HashMap<ExprId, u32>,
    ) -> Result<ExprId, String> {
        let cost = self.compute_cost();
        let mut total_cost: HashMap<String, i64> = HashMap::new();
        let mut rep: HashMap<String, (ENode, i64)> = HashMap::new();

        for enode in self.traverse() {
            total_cost.insert(enode.enode_id.clone(), INF);
            rep.entry(enode.eclass_id.clone())
                .or_insert_with(|| (enode.clone(), INF));
        }

        for enode in self.traverse() {
            let child_costs: i64 = enode
                .child_eclass_ids
                .iter()
                .map(|c| total_cost[&rep[c].0.enode_id])
                .sum();
            let total = cost[&enode.enode_id] + child_costs;
            total_cost.insert(enode.enode_id.clone(), total);
            if total < rep[&enode.eclass_id].1 {
                rep.insert(enode.eclass_id.clone(), (enode.clone(), total));
            }
        }

        self.build_expr_tree(&rep, arena, atomics)
    }

    fn build_expr_tree(
        &self,
        rep: &HashMap<String, (ENode, i64)>,
        arena: &mut ExprArena,
        atomics: &HashMap<ExprId, u32>,
    ) -> Result<ExprId, String> {
        let mut built: HashMap<String, ExprId> = HashMap::new();
        let mut stack: Vec<(bool, String)> = vec![(false, self.root.clone())];

        while let Some((seen, eclass)) = stack.pop() {
            if built.contains_key(&eclass) {
                continue;
            }
            let (enode, _) = rep
                .get(&eclass)
                .ok_or_else(|| format!("no representative for e-class '{}'", eclass))?;
            let enode = enode.clone();

            if !seen {
                stack.push((true, eclass));
                for child in &enode.child_eclass_ids {
                    if !built.contains_key(child) {
                        stack.push((false, child.clone()));
                    }
                }
                continue;
            }

            let child = |built: &HashMap<String, ExprId>, idx: usize| -> Result<ExprId, String> {
                built
                    .get(&enode.child_eclass_ids[idx])
                    .copied()
                    .ok_or_else(|| "representative cycle in extraction".to_string())
            };

            let expr = if enode.op == "Bool" {
                arena.mk_bool(Loc::none(), enode.value.unwrap_or(false))
            } else if enode.op.starts_with("Var") {
                let aid = enode
                    .atomic_id()
                    .ok_or_else(|| "no atomic id payload for Var".to_string())?;
                match atomics.iter().find(|(_, &i)| i == aid) {
                    Some((&expr, _)) => expr,
                    None => {
                        log::internal(MODULE, format!("no atomic found with id {}", aid));
                        arena.mk_bool(Loc::none(), false)
                    }
                }
            } else if enode.op == "Not" {
                let operand = child(&built, 0)?;
                arena.mk_not(Loc::none(), operand)
            } else if enode.op.starts_with("And") {
                let children = (0..enode.child_eclass_ids.len())
                    .map(|i| child(&built, i))
                    .collect::<Result<Vec<_>, _>>()?;
                arena.mk_and(Loc::none(), children)
            } else if enode.op.starts_with("Or") {
                let children = (0..enode.child_eclass_ids.len())
                    .map(|i| child(&built, i))
                    .collect::<Result<Vec<_>, _>>()?;
                arena.mk_or(Loc::none(), children)
            } else if enode.op == "Equiv" {
                let lhs = child(&built, 0)?;
                let rhs = child(&built, 1)?;
                arena.mk_equiv(Loc::none(), lhs, rhs)
            } else if enode.op == "Implies" {
                let lhs = child(&built, 0)?;
                let rhs = child(&built, 1)?;
                arena.mk_implies(Loc::none(), lhs, rhs)
            } else if matches!(enode.op.as_str(), "Global" | "Future") {
                let iv = enode
                    .interval
                    .ok_or_else(|| format!("no interval for {}", enode.op))?;
                let operand = child(&built, 0)?;
                let kind = if enode.op == "Global" {
                    TemporalKind::Global
                } else {
                    TemporalKind::Future
                };
                arena.mk_temporal(Loc::none(), kind, iv, vec![operand])
            } else if matches!(enode.op.as_str(), "Until" | "Release") {
                let iv = enode
                    .interval
                    .ok_or_else(|| format!("no interval for {}", enode.op))?;
                let lhs = child(&built, 0)?;
                let rhs = child(&built, 1)?;
                let kind = if enode.op == "Until" {
                    TemporalKind::Until
                } else {
                    TemporalKind::Release
                };
                arena.mk_temporal(Loc::none(), kind, iv, vec![lhs, rhs])
            } else {
                return Err(format!("invalid e-node type '{}'", enode.op));
            };

            built.insert(enode.eclass_id.clone(), expr);
        }

        built
            .get(&self.root)
            .copied()
            .ok_or_else(|| "extraction produced no root expression".to_string())
    }
}

/// Render `spec`'s body in the engine's input language via postorder
/// let-bindings.
pub fn to_egglog(program: &Program, context: &Context, spec: ExprId) -> String {
    let root = program.spec_expr(spec);
    let mut out = String::new();
    let mut index: HashMap<ExprId, usize> = HashMap::new();

    for (i, id) in program.arena.postorder(root).into_iter().enumerate() {
        index.insert(id, i);
        let node = &program.arena[id];

        if let Some(value) = node.bool_value() {
            out.push_str(&format!("(let e{} (Bool {}))\n", i, value));
            continue;
        }
        if let Some(&aid) = context.atomic_id.get(&id) {
            out.push_str(&format!("(let e{} (Var \"a{}\"))\n", i, aid));
            continue;
        }

        match &node.kind {
            ExprKind::Operator { op } => match op {
                OperatorKind::LogicalNot => {
                    out.push_str(&format!("(let e{} (Not e{}))\n", i, index[&node.children[0]]));
                }
                OperatorKind::LogicalImplies => {
                    out.push_str(&format!(
                        "(let e{} (Implies e{} e{}))\n",
                        i, index[&node.children[0]], index[&node.children[1]]
                    ));
                }
                OperatorKind::LogicalEquiv => {
                    out.push_str(&format!(
                        "(let e{} (Equiv e{} e{}))\n",
                        i, index[&node.children[0]], index[&node.children[1]]
                    ));
                }
                OperatorKind::LogicalAnd => {
                    let operands: Vec<String> =
                        node.children.iter().map(|c| format!("e{}", index[c])).collect();
                    out.push_str(&format!(
                        "(let e{} (And{} {}))\n",
                        i,
                        node.children.len(),
                        operands.join(" ")
                    ));
                }
                OperatorKind::LogicalOr => {
                    let operands: Vec<String> =
                        node.children.iter().map(|c| format!("e{}", index[c])).collect();
                    out.push_str(&format!(
                        "(let e{} (Or{} {}))\n",
                        i,
                        node.children.len(),
                        operands.join(" ")
                    ));
                }
                _ => {}
            },
            ExprKind::Temporal { op, interval } => match op {
                TemporalKind::Global | TemporalKind::Future => {
                    out.push_str(&format!(
                        "(let e{} ({} (Interval {} {}) e{}))\n",
                        i,
                        if *op == TemporalKind::Global { "Global" } else { "Future" },
                        interval.lb,
                        interval.ub,
                        index[&node.children[0]]
                    ));
                }
                TemporalKind::Until => {
                    out.push_str(&format!(
                        "(let e{} (Until (Interval {} {}) e{} e{}))\n",
                        i,
                        interval.lb,
                        interval.ub,
                        index[&node.children[0]],
                        index[&node.children[1]]
                    ));
                }
                TemporalKind::Release => {
                    log::error(MODULE, "Release not implemented for the saturation encoding");
                }
                _ => {}
            },
            _ => {}
        }
    }

    out
}

/// Encode `spec`, run the engine, and parse the resulting e-graph.
/// Returns `None` (with telemetry) on timeout, engine failure, or an
/// e-graph without a unique root.
pub fn run_egglog(program: &Program, context: &Context, spec: ExprId) -> Option<EGraph> {
    let egg_path = context.config.workdir.join("__tmp__.egg");
    let json_path = egg_path.with_extension("json");

    let query = format!("{}\n{}{}\n", PRELUDE, to_egglog(program, context, spec), SCHEDULE);
    if let Err(err) = fs::write(&egg_path, query) {
        log::error(MODULE, format!("cannot write {}: {}", egg_path.display(), err));
        return None;
    }

    let mut cmd = Command::new(&context.config.egglog);
    cmd.arg("--to-json").arg(&egg_path);
    log::debug(
        MODULE,
        1,
        format!("Running '{} --to-json {}'", context.config.egglog, egg_path.display()),
    );

    let start = Instant::now();
    let outcome = util::run_with_timeout(
        &mut cmd,
        Duration::from_secs(context.config.timeout_egglog),
    );

    let output = match outcome {
        Ok(Some(output)) => output,
        Ok(None) => {
            log::warning(
                MODULE,
                format!("{} timeout after {}s", context.config.egglog, context.config.timeout_egglog),
            );
            log::stat(MODULE, "egraph_time=timeout");
            let _ = fs::remove_file(&egg_path);
            return None;
        }
        Err(err) => {
            log::error(MODULE, format!("error running {}: {}", context.config.egglog, err));
            let _ = fs::remove_file(&egg_path);
            return None;
        }
    };

    if !output.status.success() {
        log::error(
            MODULE,
            format!(
                "error running {}\n{}",
                context.config.egglog,
                String::from_utf8_lossy(&output.stderr)
            ),
        );
        let _ = fs::remove_file(&egg_path);
        return None;
    }

    let text = match fs::read_to_string(&json_path) {
        Ok(text) => text,
        Err(err) => {
            log::error(MODULE, format!("cannot read e-graph JSON: {}", err));
            let _ = fs::remove_file(&egg_path);
            return None;
        }
    };

    let _ = fs::remove_file(&egg_path);
    let _ = fs::remove_file(&json_path);

    let root = program.spec_expr(spec);
    match EGraph::from_json(&text, root, &program.arena, context) {
        Ok(egraph) => {
            log::stat(
                MODULE,
                format!("egraph_time={:.3}", start.elapsed().as_secs_f64()),
            );
            Some(egraph)
        }
        Err(err) => {
            log::error(MODULE, format!("e-graph construction failed: {}", err));
            None
        }
    }
}

/// The saturation optimization pass: saturate the first future-time
/// formula, extract the cheapest equivalent, validate with the solver,
/// and swap it in.
pub fn optimize_eqsat(program: &mut Program, context: &mut Context) {
    scq::compute_scq_sizes(program, context);
    log::stat(MODULE, format!("old_scq_size={}", program.total_scq_size));

    log::debug(MODULE, 1, "Optimizing via e-graph");
    passes::sort_operands_by_pd(program, context);

    let ft = program.ft_specs();
    if ft.is_empty() {
        return;
    }
    if ft.len() > 1 {
        log::warning(
            MODULE,
            "E-graph optimization only supports single formulas, using first only",
        );
    }
    let spec = ft[0];

    let Some(egraph) = run_egglog(program, context, spec) else {
        return;
    };

    let old = program.spec_expr(spec);
    let new = match egraph.extract(&mut program.arena, &context.atomic_id) {
        Ok(new) => new,
        Err(err) => {
            log::error(MODULE, format!("e-graph extraction failed: {}", err));
            return;
        }
    };

    let verdict = match sat::check_equiv(program, context, old, new) {
        sat::SatResult::Unsat => "equiv",
        sat::SatResult::Sat => "not-equiv",
        sat::SatResult::Unknown => "unknown",
    };

    // The extracted formula is installed regardless of the verdict; the
    // verdict itself is telemetry. Flip here once validation is required.
    program.arena.replace(old, new);

    scq::compute_scq_sizes(program, context);
    log::stat(MODULE, format!("equiv_result={}", verdict));
    log::stat(MODULE, format!("new_scq_size={}", program.total_scq_size));
}
