//! Program container, compilation context, and per-compilation
//! configuration.
//!
//! A [`Program`] owns the expression arena plus an ordered list of
//! declaration sections and the two specification set roots (future-time
//! and past-time). The [`Context`] carries the symbol tables the type
//! checker populates and every later pass consults. [`Config`] is the
//! immutable record of one compilation's options; there is no process-wide
//! type configuration, everything is threaded through here.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::expr::{Expr, ExprArena, ExprId, ExprKind, Loc};
use crate::types::{Frontend, Implementation, Type};

/// A declaration of one or more signals with a shared type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalDecl {
    pub symbols: Vec<String>,
    pub ty: Type,
    pub loc: Loc,
}

/// A named macro definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Define {
    pub symbol: String,
    pub expr: ExprId,
    pub loc: Loc,
}

/// A struct declaration with ordered, typed members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDef {
    pub symbol: String,
    pub members: Vec<(String, Type)>,
    pub loc: Loc,
}

/// A named atomic-checker definition bound to a relational expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomicDef {
    pub symbol: String,
    pub expr: ExprId,
    pub loc: Loc,
}

/// One section of a program, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Section {
    Input(Vec<SignalDecl>),
    Define(Vec<Define>),
    Struct(Vec<StructDef>),
    Atomic(Vec<AtomicDef>),
    /// Marker; the specs themselves live under the spec-set roots.
    Specs { future: bool },
}

/// A complete specification program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub arena: ExprArena,
    pub sections: Vec<Section>,
    /// Root of the future-time spec set.
    pub ft_spec_set: ExprId,
    /// Root of the past-time spec set.
    pub pt_spec_set: ExprId,
    /// Program-wide SCQ memory total, filled in by the SCQ sizer.
    pub total_scq_size: i64,
}

impl Program {
    pub fn new() -> Self {
        let mut arena = ExprArena::new();
        let ft_spec_set = arena.alloc(Expr::new(
            Loc::none(),
            ExprKind::SpecSection { future: true },
            vec![],
        ));
        let pt_spec_set = arena.alloc(Expr::new(
            Loc::none(),
            ExprKind::SpecSection { future: false },
            vec![],
        ));
        Program {
            arena,
            sections: Vec::new(),
            ft_spec_set,
            pt_spec_set,
            total_scq_size: 0,
        }
    }

    /// Declare signals; the section is appended in order.
    pub fn declare_signals<S: Into<String>>(&mut self, symbols: Vec<S>, ty: Type) {
        let decl = SignalDecl {
            symbols: symbols.into_iter().map(Into::into).collect(),
            ty,
            loc: Loc::none(),
        };
        self.sections.push(Section::Input(vec![decl]));
    }

    /// Add a macro definition section entry.
    pub fn add_define(&mut self, symbol: impl Into<String>, expr: ExprId) {
        let define = Define {
            symbol: symbol.into(),
            expr,
            loc: Loc::none(),
        };
        self.sections.push(Section::Define(vec![define]));
    }

    /// Add a struct declaration.
    pub fn add_struct(&mut self, symbol: impl Into<String>, members: Vec<(String, Type)>) {
        let def = StructDef {
            symbol: symbol.into(),
            members,
            loc: Loc::none(),
        };
        self.sections.push(Section::Struct(vec![def]));
    }

    /// Add an atomic-checker definition.
    pub fn add_atomic(&mut self, symbol: impl Into<String>, expr: ExprId) {
        let def = AtomicDef {
            symbol: symbol.into(),
            expr,
            loc: Loc::none(),
        };
        self.sections.push(Section::Atomic(vec![def]));
    }

    /// Wrap `expr` in a named formula and append it to the future-time
    /// spec set, returning the formula node.
    pub fn add_ft_spec(&mut self, symbol: impl Into<String>, number: i32, expr: ExprId) -> ExprId {
        if !self
            .sections
            .iter()
            .any(|s| matches!(s, Section::Specs { future: true }))
        {
            self.sections.push(Section::Specs { future: true });
        }
        let formula = self.arena.alloc(Expr::new(
            Loc::none(),
            ExprKind::Formula {
                symbol: symbol.into(),
                number,
            },
            vec![expr],
        ));
        self.arena.add_child(self.ft_spec_set, formula);
        formula
    }

    /// Wrap `expr` in a named formula and append it to the past-time spec
    /// set, returning the formula node.
    pub fn add_pt_spec(&mut self, symbol: impl Into<String>, number: i32, expr: ExprId) -> ExprId {
        if !self
            .sections
            .iter()
            .any(|s| matches!(s, Section::Specs { future: false }))
        {
            self.sections.push(Section::Specs { future: false });
        }
        let formula = self.arena.alloc(Expr::new(
            Loc::none(),
            ExprKind::Formula {
                symbol: symbol.into(),
                number,
            },
            vec![expr],
        ));
        self.arena.add_child(self.pt_spec_set, formula);
        formula
    }

    /// Append a contract `(assume, guarantee)` to the future-time spec set.
    pub fn add_ft_contract(
        &mut self,
        symbol: impl Into<String>,
        numbers: (i32, i32, i32),
        assume: ExprId,
        guarantee: ExprId,
    ) -> ExprId {
        if !self
            .sections
            .iter()
            .any(|s| matches!(s, Section::Specs { future: true }))
        {
            self.sections.push(Section::Specs { future: true });
        }
        let contract = self.arena.alloc(Expr::new(
            Loc::none(),
            ExprKind::Contract {
                symbol: symbol.into(),
                numbers,
            },
            vec![assume, guarantee],
        ));
        self.arena.add_child(self.ft_spec_set, contract);
        contract
    }

    /// All specs (formulas and contracts) of both spec sets, FT first.
    pub fn specs(&self) -> Vec<ExprId> {
        let mut out = self.arena[self.ft_spec_set].children.clone();
        out.extend(self.arena[self.pt_spec_set].children.iter().copied());
        out
    }

    /// All future-time specs.
    pub fn ft_specs(&self) -> Vec<ExprId> {
        self.arena[self.ft_spec_set].children.clone()
    }

    /// Postorder over everything reachable from both spec sets.
    pub fn postorder(&self) -> Vec<ExprId> {
        let mut out = self.arena.postorder(self.ft_spec_set);
        out.extend(self.arena.postorder(self.pt_spec_set));
        out
    }

    /// Preorder over everything reachable from both spec sets.
    pub fn preorder(&self) -> Vec<ExprId> {
        let mut out = self.arena.preorder(self.ft_spec_set);
        out.extend(self.arena.preorder(self.pt_spec_set));
        out
    }

    /// Replace the spec `old` with `new` entries in whichever spec set
    /// contains it, preserving position.
    pub fn replace_spec(&mut self, old: ExprId, new: Vec<ExprId>) {
        for set in [self.ft_spec_set, self.pt_spec_set] {
            let pos = self.arena[set].children.iter().position(|&c| c == old);
            if let Some(pos) = pos {
                self.arena[set].children.splice(pos..pos + 1, new.iter().copied());
                let old_parents = &mut self.arena[old].parents;
                old_parents.retain(|&p| p != set);
                for &n in &new {
                    let parents = &mut self.arena[n].parents;
                    if !parents.contains(&set) {
                        parents.push(set);
                    }
                }
                return;
            }
        }
    }

    /// The body of a formula or the assumption of a contract.
    pub fn spec_expr(&self, spec: ExprId) -> ExprId {
        self.arena[spec].children[0]
    }

    /// The symbol of a formula or contract node, if it is one.
    pub fn spec_symbol(&self, spec: ExprId) -> Option<&str> {
        match &self.arena[spec].kind {
            ExprKind::Formula { symbol, .. } => Some(symbol),
            ExprKind::Contract { symbol, .. } => Some(symbol),
            _ => None,
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte-order sigil for the spec binary, selected by `--endian`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    Native,
    Network,
    Big,
    Little,
}

impl Endianness {
    /// The struct-format sigil the assembler consumes.
    pub fn sigil(&self) -> char {
        match self {
            Endianness::Native => '@',
            Endianness::Network => '!',
            Endianness::Big => '>',
            Endianness::Little => '<',
        }
    }
}

/// Immutable per-compilation configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub workdir: PathBuf,
    pub implementation: Implementation,
    /// Mission time in time steps; -1 when neither given nor inferable.
    pub mission_time: i64,
    pub endianness: Endianness,
    pub frontend: Frontend,
    /// Whether the run will hand the program to an assembler. Atomic-id
    /// assignment falls back to fresh ids for unmapped signals when this
    /// is off.
    pub assembly_enabled: bool,
    pub int_width: u32,
    pub int_signed: bool,
    pub float_width: u32,
    /// Steps the monitor is allowed to predict ahead; 0 disables the
    /// prediction buffer in SCQ sizing.
    pub prediction_horizon: i64,
    pub signal_mapping: HashMap<String, u32>,
    /// Saturation engine timeout, seconds.
    pub timeout_egglog: u64,
    /// SMT solver timeout, seconds.
    pub timeout_sat: u64,
    /// SMT solver executable.
    pub smt_solver: String,
    /// Saturation engine executable.
    pub egglog: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_path: PathBuf::new(),
            output_path: PathBuf::from("spec.bin"),
            workdir: std::env::temp_dir().join(crate::util::default_workdir_name()),
            implementation: Implementation::C,
            mission_time: -1,
            endianness: Endianness::Native,
            frontend: Frontend::None,
            assembly_enabled: false,
            int_width: 32,
            int_signed: false,
            float_width: 32,
            prediction_horizon: 0,
            signal_mapping: HashMap::new(),
            timeout_egglog: 3600,
            timeout_sat: 3600,
            smt_solver: "z3".to_string(),
            egglog: "egglog".to_string(),
        }
    }
}

/// Which time domain the type checker is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeDomain {
    Unset,
    FutureTime,
    PastTime,
}

/// Symbol tables and derived facts shared by the type checker and every
/// pass.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub signals: HashMap<String, Type>,
    pub definitions: HashMap<String, ExprId>,
    /// Insertion order of definitions, for deterministic expansion.
    pub definition_order: Vec<String>,
    pub structs: HashMap<String, Vec<(String, Type)>>,
    pub atomic_checkers: HashMap<String, ExprId>,
    pub specifications: HashMap<String, ExprId>,
    pub contracts: HashMap<String, ExprId>,
    /// Types of set-aggregation bound variables.
    pub variables: HashMap<String, Type>,
    /// Bound variable symbol -> the set expression it ranges over.
    pub bound_vars: HashMap<String, ExprId>,
    /// Stable atomic ids; syntactically equal subtrees share one id.
    pub atomic_id: HashMap<ExprId, u32>,
    time_domain: TimeDomain,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Context {
            config,
            signals: HashMap::new(),
            definitions: HashMap::new(),
            definition_order: Vec::new(),
            structs: HashMap::new(),
            atomic_checkers: HashMap::new(),
            specifications: HashMap::new(),
            contracts: HashMap::new(),
            variables: HashMap::new(),
            bound_vars: HashMap::new(),
            atomic_id: HashMap::new(),
            time_domain: TimeDomain::Unset,
        }
    }

    pub fn add_signal(&mut self, symbol: impl Into<String>, ty: Type) {
        self.signals.insert(symbol.into(), ty);
    }

    pub fn add_definition(&mut self, symbol: impl Into<String>, expr: ExprId) {
        let symbol = symbol.into();
        if !self.definitions.contains_key(&symbol) {
            self.definition_order.push(symbol.clone());
        }
        self.definitions.insert(symbol, expr);
    }

    pub fn add_struct(&mut self, symbol: impl Into<String>, members: Vec<(String, Type)>) {
        self.structs.insert(symbol.into(), members);
    }

    pub fn add_atomic_checker(&mut self, symbol: impl Into<String>, expr: ExprId) {
        self.atomic_checkers.insert(symbol.into(), expr);
    }

    pub fn add_formula(&mut self, symbol: impl Into<String>, spec: ExprId) {
        self.specifications.insert(symbol.into(), spec);
    }

    pub fn add_contract(&mut self, symbol: impl Into<String>, contract: ExprId) {
        self.contracts.insert(symbol.into(), contract);
    }

    pub fn add_variable(&mut self, symbol: impl Into<String>, ty: Type) {
        self.variables.insert(symbol.into(), ty);
    }

    pub fn add_bound_var(&mut self, symbol: impl Into<String>, set_expr: ExprId) {
        self.bound_vars.insert(symbol.into(), set_expr);
    }

    /// Whether `symbol` is already bound to any kind of declaration.
    pub fn is_symbol_used(&self, symbol: &str) -> bool {
        self.signals.contains_key(symbol)
            || self.definitions.contains_key(symbol)
            || self.structs.contains_key(symbol)
            || self.atomic_checkers.contains_key(symbol)
            || self.specifications.contains_key(symbol)
            || self.contracts.contains_key(symbol)
    }

    pub fn set_future_time(&mut self) {
        self.time_domain = TimeDomain::FutureTime;
    }

    pub fn set_past_time(&mut self) {
        self.time_domain = TimeDomain::PastTime;
    }

    pub fn is_future_time(&self) -> bool {
        self.time_domain == TimeDomain::FutureTime
    }

    pub fn is_past_time(&self) -> bool {
        self.time_domain == TimeDomain::PastTime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprKind;

    #[test]
    fn new_program_has_empty_spec_sets() {
        let program = Program::new();
        assert!(program.specs().is_empty());
        assert!(matches!(
            program.arena[program.ft_spec_set].kind,
            ExprKind::SpecSection { future: true }
        ));
    }

    #[test]
    fn ft_spec_is_wrapped_in_formula() {
        let mut program = Program::new();
        let a = program.arena.mk_signal(Loc::none(), "a");
        let spec = program.add_ft_spec("req1", 0, a);
        assert!(matches!(
            program.arena[spec].kind,
            ExprKind::Formula { .. }
        ));
        assert_eq!(program.spec_expr(spec), a);
        assert_eq!(program.ft_specs(), vec![spec]);
        assert!(program.arena[spec].parents.contains(&program.ft_spec_set));
    }

    #[test]
    fn replace_spec_splices_in_position() {
        let mut program = Program::new();
        let a = program.arena.mk_signal(Loc::none(), "a");
        let b = program.arena.mk_signal(Loc::none(), "b");
        let s1 = program.add_ft_spec("s1", 0, a);
        let s2 = program.add_ft_spec("s2", 1, b);
        let c = program.arena.mk_signal(Loc::none(), "c");
        let r1 = program.add_ft_spec("r1", 2, c);
        // Pull r1 back out and splice it over s1.
        let set = program.ft_spec_set;
        program.arena[set].children.pop();
        program.replace_spec(s1, vec![r1]);
        assert_eq!(program.ft_specs(), vec![r1, s2]);
        assert!(!program.arena[s1].parents.contains(&set));
    }

    #[test]
    fn symbol_table_tracks_all_namespaces() {
        let mut ctx = Context::new(Config::default());
        ctx.add_signal("sig", Type::bool());
        ctx.add_struct("S", vec![("x".to_string(), Type::int())]);
        assert!(ctx.is_symbol_used("sig"));
        assert!(ctx.is_symbol_used("S"));
        assert!(!ctx.is_symbol_used("nope"));
    }

    #[test]
    fn definition_order_is_insertion_order() {
        let mut ctx = Context::new(Config::default());
        let mut arena = ExprArena::new();
        let a = arena.mk_signal(Loc::none(), "a");
        ctx.add_definition("second", a);
        ctx.add_definition("first", a);
        assert_eq!(ctx.definition_order, vec!["second", "first"]);
    }
}
