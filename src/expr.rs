//! Expression IR: an id-keyed arena of tagged nodes forming a DAG with
//! parent back-references.
//!
//! Children are the owning direction of the graph; parents are
//! relation-only back edges kept consistent by the mutation helpers
//! ([`ExprArena::alloc`], [`ExprArena::add_child`], [`ExprArena::replace`]).
//! Nodes are never freed during a compilation: a pass that replaces a node
//! simply leaves the old one unreachable from the specification roots.
//!
//! Structural equality is *syntactic*: two expressions are equal iff their
//! prefix-notation strings ([`ExprArena::to_prefix`]) are identical. Common
//! subexpression elimination and atomic-id assignment rely on nothing else.

use std::collections::HashSet;
use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::types::{Engine, Interval, Type};

/// A source location (line-based; 0 means unknown).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loc {
    pub line: u32,
}

impl Loc {
    pub fn new(line: u32) -> Self {
        Loc { line }
    }

    /// An unknown location, used for synthesized nodes.
    pub fn none() -> Self {
        Loc { line: 0 }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "line ?")
        } else {
            write!(f, "line {}", self.line)
        }
    }
}

/// A literal constant value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Non-temporal operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    // Logical
    LogicalNot,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    LogicalImplies,
    LogicalEquiv,
    // Bitwise
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNot,
    ShiftLeft,
    ShiftRight,
    // Arithmetic
    ArithmeticAdd,
    ArithmeticSub,
    ArithmeticMul,
    ArithmeticDiv,
    ArithmeticMod,
    ArithmeticNeg,
    // Relational
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl OperatorKind {
    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            OperatorKind::LogicalNot
                | OperatorKind::LogicalAnd
                | OperatorKind::LogicalOr
                | OperatorKind::LogicalXor
                | OperatorKind::LogicalImplies
                | OperatorKind::LogicalEquiv
        )
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(
            self,
            OperatorKind::BitwiseAnd
                | OperatorKind::BitwiseOr
                | OperatorKind::BitwiseXor
                | OperatorKind::BitwiseNot
                | OperatorKind::ShiftLeft
                | OperatorKind::ShiftRight
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            OperatorKind::ArithmeticAdd
                | OperatorKind::ArithmeticSub
                | OperatorKind::ArithmeticMul
                | OperatorKind::ArithmeticDiv
                | OperatorKind::ArithmeticMod
                | OperatorKind::ArithmeticNeg
        )
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            OperatorKind::Equal
                | OperatorKind::NotEqual
                | OperatorKind::GreaterThan
                | OperatorKind::LessThan
                | OperatorKind::GreaterThanOrEqual
                | OperatorKind::LessThanOrEqual
        )
    }

    /// Operators that may take more than two operands.
    pub fn is_multi_arity(&self) -> bool {
        matches!(
            self,
            OperatorKind::LogicalAnd
                | OperatorKind::LogicalOr
                | OperatorKind::ArithmeticAdd
                | OperatorKind::ArithmeticMul
        )
    }

    /// Operators whose operand order does not change the result.
    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            OperatorKind::LogicalAnd
                | OperatorKind::LogicalOr
                | OperatorKind::LogicalXor
                | OperatorKind::LogicalEquiv
                | OperatorKind::ArithmeticAdd
                | OperatorKind::ArithmeticMul
                | OperatorKind::BitwiseAnd
                | OperatorKind::BitwiseOr
                | OperatorKind::BitwiseXor
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            OperatorKind::LogicalNot => "!",
            OperatorKind::LogicalAnd => "&&",
            OperatorKind::LogicalOr => "||",
            OperatorKind::LogicalXor => "xor",
            OperatorKind::LogicalImplies => "->",
            OperatorKind::LogicalEquiv => "<->",
            OperatorKind::BitwiseAnd => "&",
            OperatorKind::BitwiseOr => "|",
            OperatorKind::BitwiseXor => "^",
            OperatorKind::BitwiseNot => "~",
            OperatorKind::ShiftLeft => "<<",
            OperatorKind::ShiftRight => ">>",
            OperatorKind::ArithmeticAdd => "+",
            OperatorKind::ArithmeticSub => "-",
            OperatorKind::ArithmeticMul => "*",
            OperatorKind::ArithmeticDiv => "/",
            OperatorKind::ArithmeticMod => "%",
            OperatorKind::ArithmeticNeg => "neg",
            OperatorKind::Equal => "==",
            OperatorKind::NotEqual => "!=",
            OperatorKind::GreaterThan => ">",
            OperatorKind::LessThan => "<",
            OperatorKind::GreaterThanOrEqual => ">=",
            OperatorKind::LessThanOrEqual => "<=",
        }
    }
}

/// Temporal operator kinds. `Global`/`Future`/`Until`/`Release` are
/// future-time; `Historical`/`Once`/`Since` are past-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalKind {
    Global,
    Future,
    Until,
    Release,
    Historical,
    Once,
    Since,
}

impl TemporalKind {
    pub fn is_future_time(&self) -> bool {
        matches!(
            self,
            TemporalKind::Global | TemporalKind::Future | TemporalKind::Until | TemporalKind::Release
        )
    }

    pub fn is_past_time(&self) -> bool {
        !self.is_future_time()
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemporalKind::Global => "G",
            TemporalKind::Future => "F",
            TemporalKind::Until => "U",
            TemporalKind::Release => "R",
            TemporalKind::Historical => "H",
            TemporalKind::Once => "O",
            TemporalKind::Since => "S",
        }
    }
}

/// Set-aggregation operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationKind {
    ForEach,
    ForSome,
    ForExactly,
    ForAtLeast,
    ForAtMost,
}

impl AggregationKind {
    /// Aggregations carrying a numeric parameter as a middle child.
    pub fn is_parameterized(&self) -> bool {
        matches!(
            self,
            AggregationKind::ForExactly | AggregationKind::ForAtLeast | AggregationKind::ForAtMost
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            AggregationKind::ForEach => "foreach",
            AggregationKind::ForSome => "forsome",
            AggregationKind::ForExactly => "forexactly",
            AggregationKind::ForAtLeast => "foratleast",
            AggregationKind::ForAtMost => "foratmost",
        }
    }
}

/// The tagged variant of an expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Boolean or numeric literal.
    Constant { value: Value },
    /// External input signal. `signal_id` is resolved from the signal
    /// mapping during type checking; -1 means unresolved.
    Signal { symbol: String, signal_id: i32 },
    /// Unresolved symbol; replaced by a definition, specification, or
    /// bound-variable value during the pass pipeline.
    Variable { symbol: String },
    /// Reference to a named atomic checker.
    AtomicChecker { symbol: String },
    /// Logical, arithmetic, bitwise, or relational operator.
    Operator { op: OperatorKind },
    /// Temporal operator with its time interval.
    Temporal { op: TemporalKind, interval: Interval },
    /// Probability bound wrapping a sub-expression.
    Probability { prob: f64 },
    /// Compile-time set literal.
    SetExpression,
    /// Struct instance; `members` are the field names, positionally
    /// matching `children`.
    Struct { symbol: String, members: Vec<String> },
    /// Access of `member` on the struct expression in `children[0]`.
    StructAccess { member: String },
    /// Unresolved call; only struct instantiations are supported and they
    /// are rewritten into [`ExprKind::Struct`] by the pass pipeline.
    FunctionCall { symbol: String },
    /// Aggregation over a set with a bound variable. Children are
    /// `[set, body]`, or `[set, num, body]` for parameterized kinds.
    SetAggregation {
        op: AggregationKind,
        bound: String,
    },
    /// A named top-level formula; `children[0]` is its body.
    Formula { symbol: String, number: i32 },
    /// Assume-guarantee contract; children are `[assume, guarantee]`.
    /// The three numbers are the formula slots for the derived
    /// active/valid/verified conditions.
    Contract {
        symbol: String,
        numbers: (i32, i32, i32),
    },
    /// Root of the future-time or past-time specification set.
    SpecSection { future: bool },
}

fn engine_for(kind: &ExprKind) -> Engine {
    match kind {
        ExprKind::Operator { op } if op.is_logical() => Engine::TemporalLogic,
        ExprKind::Operator { .. } => Engine::Booleanizer,
        ExprKind::Temporal { .. }
        | ExprKind::Probability { .. }
        | ExprKind::Formula { .. }
        | ExprKind::Contract { .. }
        | ExprKind::SpecSection { .. } => Engine::TemporalLogic,
        ExprKind::AtomicChecker { .. } => Engine::AtomicChecker,
        _ => Engine::None,
    }
}

/// Stable identity of a node in an [`ExprArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub u32);

impl ExprId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One IR node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub loc: Loc,
    pub kind: ExprKind,
    pub ty: Type,
    pub children: Vec<ExprId>,
    /// Back references only; never an ownership edge.
    pub parents: Vec<ExprId>,
    pub engine: Engine,
    /// Best-case propagation delay, in time steps.
    pub bpd: i64,
    /// Worst-case propagation delay, in time steps.
    pub wpd: i64,
    /// Queue slots required for this node; -1 until computed.
    pub scq_size: i64,
    /// Queue slots for this node plus its whole subtree.
    pub total_scq_size: i64,
    /// `[start, end)` offsets into the program-wide SCQ address space.
    pub scq: (i64, i64),
}

impl Expr {
    pub fn new(loc: Loc, kind: ExprKind, children: Vec<ExprId>) -> Self {
        let engine = engine_for(&kind);
        Expr {
            loc,
            kind,
            ty: Type::None,
            children,
            parents: Vec::new(),
            engine,
            bpd: 0,
            wpd: 0,
            scq_size: -1,
            total_scq_size: 0,
            scq: (0, 0),
        }
    }

    pub fn operator(&self) -> Option<OperatorKind> {
        match self.kind {
            ExprKind::Operator { op } => Some(op),
            _ => None,
        }
    }

    pub fn temporal(&self) -> Option<(TemporalKind, Interval)> {
        match self.kind {
            ExprKind::Temporal { op, interval } => Some((op, interval)),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ExprKind::Constant { .. })
    }

    /// The boolean value when this node is a boolean constant.
    pub fn bool_value(&self) -> Option<bool> {
        match self.kind {
            ExprKind::Constant {
                value: Value::Bool(b),
            } => Some(b),
            _ => None,
        }
    }
}

/// The arena owning every IR node of a compilation. Node identity is the
/// index; identities are never reused, so an unreachable node simply stays
/// behind untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExprArena {
    nodes: Vec<Expr>,
}

impl Index<ExprId> for ExprArena {
    type Output = Expr;

    fn index(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }
}

impl IndexMut<ExprId> for ExprArena {
    fn index_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.nodes[id.index()]
    }
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a node and register the parent back edge on each child.
    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        let children = expr.children.clone();
        self.nodes.push(expr);
        for child in children {
            let parents = &mut self.nodes[child.index()].parents;
            if !parents.contains(&id) {
                parents.push(id);
            }
        }
        id
    }

    /// Append `child` to `parent`'s children, keeping back edges in sync.
    pub fn add_child(&mut self, parent: ExprId, child: ExprId) {
        self.nodes[parent.index()].children.push(child);
        let parents = &mut self.nodes[child.index()].parents;
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    /// Substitute `new` for `old` in every parent of `old`, preserving slot
    /// position and multiplicity, and union `old`'s parents into `new`'s.
    /// After this call `old` has no parents and is unreachable unless it is
    /// itself a root.
    pub fn replace(&mut self, old: ExprId, new: ExprId) {
        if old == new {
            return;
        }
        let parents = std::mem::take(&mut self.nodes[old.index()].parents);
        for &parent in &parents {
            for slot in &mut self.nodes[parent.index()].children {
                if *slot == old {
                    *slot = new;
                }
            }
        }
        let new_parents = &mut self.nodes[new.index()].parents;
        for parent in parents {
            if !new_parents.contains(&parent) {
                new_parents.push(parent);
            }
        }
    }

    /// Structural copy of `body` in which every [`ExprKind::Variable`]
    /// matching `bound` is the (shared) node `value`. All other nodes in
    /// the copy are fresh identities.
    pub fn rename(&mut self, bound: &str, value: ExprId, body: ExprId) -> ExprId {
        if let ExprKind::Variable { symbol } = &self[body].kind {
            if symbol == bound {
                return value;
            }
        }
        let loc = self[body].loc;
        let kind = self[body].kind.clone();
        let ty = self[body].ty.clone();
        let children = self[body].children.clone();
        let new_children: Vec<ExprId> = children
            .into_iter()
            .map(|c| self.rename(bound, value, c))
            .collect();
        let mut expr = Expr::new(loc, kind, new_children);
        expr.ty = ty;
        self.alloc(expr)
    }

    /// Every node reachable from `root`, children before parents, each
    /// exactly once (deduplicated by identity).
    pub fn postorder(&self, root: ExprId) -> Vec<ExprId> {
        let mut out = Vec::new();
        let mut visited: HashSet<ExprId> = HashSet::new();
        let mut stack: Vec<(ExprId, bool)> = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            for &child in self[id].children.iter().rev() {
                if !visited.contains(&child) {
                    stack.push((child, false));
                }
            }
        }
        out
    }

    /// Every node reachable from `root`, parents before children, each
    /// exactly once (deduplicated by identity).
    pub fn preorder(&self, root: ExprId) -> Vec<ExprId> {
        let mut out = Vec::new();
        let mut visited: HashSet<ExprId> = HashSet::new();
        let mut stack: Vec<ExprId> = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            out.push(id);
            for &child in self[id].children.iter().rev() {
                if !visited.contains(&child) {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// All co-children of every parent of `id`, excluding `id` itself,
    /// deduplicated. These are the nodes whose output `id` must wait on
    /// inside a shared consumer.
    pub fn siblings(&self, id: ExprId) -> Vec<ExprId> {
        let mut out = Vec::new();
        for &parent in &self[id].parents {
            for &child in &self[parent].children {
                if child != id && !out.contains(&child) {
                    out.push(child);
                }
            }
        }
        out
    }

    /// Whether `id` is a probability operator or has one among its
    /// ancestors.
    pub fn is_probabilistic(&self, id: ExprId) -> bool {
        let mut visited: HashSet<ExprId> = HashSet::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if !visited.insert(cur) {
                continue;
            }
            if matches!(self[cur].kind, ExprKind::Probability { .. }) {
                return true;
            }
            stack.extend(self[cur].parents.iter().copied());
        }
        false
    }

    // ---- Constructors ----

    pub fn mk_bool(&mut self, loc: Loc, value: bool) -> ExprId {
        let mut expr = Expr::new(
            loc,
            ExprKind::Constant {
                value: Value::Bool(value),
            },
            vec![],
        );
        expr.ty = Type::const_bool();
        self.alloc(expr)
    }

    pub fn mk_int(&mut self, loc: Loc, value: i64) -> ExprId {
        let mut expr = Expr::new(
            loc,
            ExprKind::Constant {
                value: Value::Int(value),
            },
            vec![],
        );
        expr.ty = Type::Int { is_const: true };
        self.alloc(expr)
    }

    pub fn mk_float(&mut self, loc: Loc, value: f64) -> ExprId {
        let mut expr = Expr::new(
            loc,
            ExprKind::Constant {
                value: Value::Float(value),
            },
            vec![],
        );
        expr.ty = Type::Float { is_const: true };
        self.alloc(expr)
    }

    pub fn mk_signal(&mut self, loc: Loc, symbol: impl Into<String>) -> ExprId {
        self.alloc(Expr::new(
            loc,
            ExprKind::Signal {
                symbol: symbol.into(),
                signal_id: -1,
            },
            vec![],
        ))
    }

    pub fn mk_variable(&mut self, loc: Loc, symbol: impl Into<String>) -> ExprId {
        self.alloc(Expr::new(
            loc,
            ExprKind::Variable {
                symbol: symbol.into(),
            },
            vec![],
        ))
    }

    pub fn mk_operator(&mut self, loc: Loc, op: OperatorKind, children: Vec<ExprId>) -> ExprId {
        let mut expr = Expr::new(loc, ExprKind::Operator { op }, children);
        if op.is_logical() || op.is_relational() {
            expr.ty = Type::bool();
        }
        self.alloc(expr)
    }

    pub fn mk_not(&mut self, loc: Loc, operand: ExprId) -> ExprId {
        self.mk_operator(loc, OperatorKind::LogicalNot, vec![operand])
    }

    pub fn mk_and(&mut self, loc: Loc, children: Vec<ExprId>) -> ExprId {
        self.mk_operator(loc, OperatorKind::LogicalAnd, children)
    }

    pub fn mk_or(&mut self, loc: Loc, children: Vec<ExprId>) -> ExprId {
        self.mk_operator(loc, OperatorKind::LogicalOr, children)
    }

    pub fn mk_implies(&mut self, loc: Loc, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.mk_operator(loc, OperatorKind::LogicalImplies, vec![lhs, rhs])
    }

    pub fn mk_equiv(&mut self, loc: Loc, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.mk_operator(loc, OperatorKind::LogicalEquiv, vec![lhs, rhs])
    }

    pub fn mk_temporal(
        &mut self,
        loc: Loc,
        op: TemporalKind,
        interval: Interval,
        children: Vec<ExprId>,
    ) -> ExprId {
        let mut expr = Expr::new(loc, ExprKind::Temporal { op, interval }, children);
        expr.ty = Type::bool();
        self.alloc(expr)
    }

    pub fn mk_global(&mut self, loc: Loc, lb: u32, ub: u32, operand: ExprId) -> ExprId {
        self.mk_temporal(loc, TemporalKind::Global, Interval::new(lb, ub), vec![operand])
    }

    pub fn mk_future(&mut self, loc: Loc, lb: u32, ub: u32, operand: ExprId) -> ExprId {
        self.mk_temporal(loc, TemporalKind::Future, Interval::new(lb, ub), vec![operand])
    }

    pub fn mk_until(&mut self, loc: Loc, lb: u32, ub: u32, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.mk_temporal(loc, TemporalKind::Until, Interval::new(lb, ub), vec![lhs, rhs])
    }

    pub fn mk_release(&mut self, loc: Loc, lb: u32, ub: u32, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.mk_temporal(loc, TemporalKind::Release, Interval::new(lb, ub), vec![lhs, rhs])
    }

    // ---- Printing ----

    /// Canonical prefix-notation rendering. This string *is* the notion of
    /// structural equality: CSE keys, atomic-id sharing, and rewrite-rule
    /// body matching all compare these strings and nothing else.
    pub fn to_prefix(&self, id: ExprId) -> String {
        let expr = &self[id];
        let kids = |arena: &Self| -> Vec<String> {
            expr.children.iter().map(|&c| arena.to_prefix(c)).collect()
        };
        match &expr.kind {
            ExprKind::Constant { value } => value.to_string(),
            ExprKind::Signal { symbol, .. } => symbol.clone(),
            ExprKind::Variable { symbol } => symbol.clone(),
            ExprKind::AtomicChecker { symbol } => symbol.clone(),
            ExprKind::Operator { op } => {
                format!("({} {})", op.symbol(), kids(self).join(" "))
            }
            ExprKind::Temporal { op, interval } => {
                format!("({}{} {})", op.symbol(), interval, kids(self).join(" "))
            }
            ExprKind::Probability { prob } => {
                format!("(pr {} {})", prob, kids(self).join(" "))
            }
            ExprKind::SetExpression => format!("(set {})", kids(self).join(" ")),
            ExprKind::Struct { symbol, .. } => {
                format!("({} {})", symbol, kids(self).join(" "))
            }
            ExprKind::StructAccess { member } => {
                format!("(. {} {})", self.to_prefix(expr.children[0]), member)
            }
            ExprKind::FunctionCall { symbol } => {
                format!("({} {})", symbol, kids(self).join(" "))
            }
            ExprKind::SetAggregation { op, bound } => {
                format!("({} {} {})", op.symbol(), bound, kids(self).join(" "))
            }
            ExprKind::Formula { symbol, .. } => {
                format!("({}: {})", symbol, self.to_prefix(expr.children[0]))
            }
            ExprKind::Contract { symbol, .. } => {
                format!("(contract {} {})", symbol, kids(self).join(" "))
            }
            ExprKind::SpecSection { future } => {
                let tag = if *future { "ftspec" } else { "ptspec" };
                format!("({} {})", tag, kids(self).join(" "))
            }
        }
    }

    /// Infix rendering, used for the surface-language reconstruction dump.
    pub fn to_infix(&self, id: ExprId) -> String {
        let expr = &self[id];
        match &expr.kind {
            ExprKind::Constant { value } => value.to_string(),
            ExprKind::Signal { symbol, .. } => symbol.clone(),
            ExprKind::Variable { symbol } => symbol.clone(),
            ExprKind::AtomicChecker { symbol } => symbol.clone(),
            ExprKind::Operator { op } => match op {
                OperatorKind::LogicalNot | OperatorKind::BitwiseNot | OperatorKind::ArithmeticNeg => {
                    format!("{}({})", op.symbol(), self.to_infix(expr.children[0]))
                }
                _ => {
                    let parts: Vec<String> =
                        expr.children.iter().map(|&c| self.to_infix(c)).collect();
                    format!("({})", parts.join(&format!(" {} ", op.symbol())))
                }
            },
            ExprKind::Temporal { op, interval } => {
                if expr.children.len() == 2 {
                    format!(
                        "({}) {}{} ({})",
                        self.to_infix(expr.children[0]),
                        op.symbol(),
                        interval,
                        self.to_infix(expr.children[1])
                    )
                } else {
                    format!("{}{}({})", op.symbol(), interval, self.to_infix(expr.children[0]))
                }
            }
            ExprKind::Probability { prob } => {
                format!("Pr({}) >= {}", self.to_infix(expr.children[0]), prob)
            }
            ExprKind::SetExpression => {
                let parts: Vec<String> = expr.children.iter().map(|&c| self.to_infix(c)).collect();
                format!("{{{}}}", parts.join(", "))
            }
            ExprKind::Struct { symbol, .. } | ExprKind::FunctionCall { symbol } => {
                let parts: Vec<String> = expr.children.iter().map(|&c| self.to_infix(c)).collect();
                format!("{}({})", symbol, parts.join(", "))
            }
            ExprKind::StructAccess { member } => {
                format!("{}.{}", self.to_infix(expr.children[0]), member)
            }
            ExprKind::SetAggregation { op, bound } => {
                let set = self.to_infix(expr.children[0]);
                let body = self.to_infix(*expr.children.last().unwrap_or(&expr.children[0]));
                if expr.children.len() == 3 {
                    format!(
                        "{}({}: {})({})({})",
                        op.symbol(),
                        bound,
                        set,
                        self.to_infix(expr.children[1]),
                        body
                    )
                } else {
                    format!("{}({}: {})({})", op.symbol(), bound, set, body)
                }
            }
            ExprKind::Formula { symbol, .. } => {
                format!("{}: {};", symbol, self.to_infix(expr.children[0]))
            }
            ExprKind::Contract { symbol, .. } => {
                format!(
                    "{}: {} => {};",
                    symbol,
                    self.to_infix(expr.children[0]),
                    self.to_infix(expr.children[1])
                )
            }
            ExprKind::SpecSection { .. } => {
                let parts: Vec<String> = expr.children.iter().map(|&c| self.to_infix(c)).collect();
                parts.join("\n")
            }
        }
    }
}
