//! Bottom-up type checking of a program.
//!
//! Each specification root is walked once in postorder; every node's type
//! is inferred from its children and the operator rules. Errors are
//! reported as they are found and accumulate across a section, so a user
//! sees everything wrong with a section in one run. The checker returns a
//! well-typed flag together with the populated [`Context`].

use crate::context::{Config, Context, Program, Section};
use crate::expr::{ExprId, ExprKind, OperatorKind, Value};
use crate::log;
use crate::types::{fits_int_width, Engine, Frontend, Implementation, Type};

const MODULE: &str = "TYPC";

/// Type check `program` under `config`, returning whether it is
/// well-typed and the context built along the way.
pub fn type_check(program: &mut Program, config: Config) -> (bool, Context) {
    log::debug(MODULE, 1, "Type checking");

    let mut status = true;
    let mut context = Context::new(config);

    for section in program.sections.clone() {
        status = type_check_section(program, &mut context, &section) && status;
    }

    (status, context)
}

fn type_check_section(program: &mut Program, context: &mut Context, section: &Section) -> bool {
    let mut status = true;

    match section {
        Section::Input(decls) => {
            for decl in decls {
                for signal in &decl.symbols {
                    if context.is_symbol_used(signal) {
                        status = false;
                        log::error_at(
                            MODULE,
                            format!("Symbol '{}' already in use", signal),
                            decl.loc,
                        );
                    }
                    context.add_signal(signal.clone(), decl.ty.clone());
                }
            }
        }
        Section::Define(defines) => {
            for define in defines {
                if context.is_symbol_used(&define.symbol) {
                    status = false;
                    log::error_at(
                        MODULE,
                        format!("Symbol '{}' already in use", define.symbol),
                        define.loc,
                    );
                }
                let good = type_check_expr(program, context, define.expr);
                if good {
                    context.add_definition(define.symbol.clone(), define.expr);
                }
                status = status && good;
            }
        }
        Section::Struct(defs) => {
            for def in defs {
                if context.is_symbol_used(&def.symbol) {
                    status = false;
                    log::error_at(
                        MODULE,
                        format!("Symbol '{}' already in use", def.symbol),
                        def.loc,
                    );
                }
                context.add_struct(def.symbol.clone(), def.members.clone());
            }
        }
        Section::Atomic(defs) => {
            for def in defs {
                if context.is_symbol_used(&def.symbol) {
                    status = false;
                    log::error_at(
                        MODULE,
                        format!("Symbol '{}' already in use", def.symbol),
                        def.loc,
                    );
                }
                let good = type_check_atomic(program, context, def.expr);
                if good {
                    context.add_atomic_checker(def.symbol.clone(), def.expr);
                }
                status = status && good;
            }
        }
        Section::Specs { future } => {
            if *future {
                context.set_future_time();
            } else {
                context.set_past_time();
            }
            let set = if *future {
                program.ft_spec_set
            } else {
                program.pt_spec_set
            };
            for spec in program.arena[set].children.clone() {
                if let Some(symbol) = program.spec_symbol(spec).map(str::to_string) {
                    if !symbol.is_empty() && context.is_symbol_used(&symbol) {
                        status = false;
                        log::error_at(
                            MODULE,
                            format!("Symbol '{}' already in use", symbol),
                            program.arena[spec].loc,
                        );
                    }
                }
                status = type_check_expr(program, context, spec) && status;
            }
        }
    }

    status
}

/// An atomic checker definition must be a relational operator over
/// (Signal | Constant) operands, signal on the left; filter functions are
/// unsupported.
fn type_check_atomic(program: &mut Program, context: &mut Context, expr: ExprId) -> bool {
    let is_relational = program.arena[expr]
        .operator()
        .map(|op| op.is_relational())
        .unwrap_or(false);
    if !is_relational {
        log::error_at(
            MODULE,
            "Atomic checker definition not a relation",
            program.arena[expr].loc,
        );
        return false;
    }

    if !type_check_expr(program, context, expr) {
        return false;
    }

    let lhs = program.arena[expr].children[0];
    let rhs = program.arena[expr].children[1];

    match &program.arena[lhs].kind {
        ExprKind::FunctionCall { .. } => {
            log::error_at(MODULE, "Atomic checker filters unsupported", program.arena[lhs].loc);
            return false;
        }
        ExprKind::Signal { .. } => {}
        _ => {
            log::error_at(
                MODULE,
                "Left-hand side of atomic checker definition not a signal",
                program.arena[lhs].loc,
            );
            return false;
        }
    }

    if !matches!(
        program.arena[rhs].kind,
        ExprKind::Constant { .. } | ExprKind::Signal { .. }
    ) {
        log::error_at(
            MODULE,
            "Right-hand side of atomic checker definition not a constant nor signal",
            program.arena[rhs].loc,
        );
        return false;
    }

    true
}

/// Type check a single expression tree bottom-up.
pub fn type_check_expr(program: &mut Program, context: &mut Context, root: ExprId) -> bool {
    // Bound variables are visible to the whole aggregation body, so they
    // are registered ahead of the bottom-up walk.
    for id in program.arena.preorder(root) {
        if let ExprKind::SetAggregation { bound, .. } = &program.arena[id].kind {
            let set_expr = program.arena[id].children[0];
            context.add_bound_var(bound.clone(), set_expr);
        }
    }

    for id in program.arena.postorder(root) {
        if !type_check_node(program, context, id) {
            return false;
        }
    }
    true
}

fn child_types(program: &Program, id: ExprId) -> Vec<Type> {
    program.arena[id]
        .children
        .iter()
        .map(|&c| program.arena[c].ty.clone())
        .collect()
}

fn type_check_node(program: &mut Program, context: &mut Context, id: ExprId) -> bool {
    let loc = program.arena[id].loc;
    let kind = program.arena[id].kind.clone();

    match kind {
        ExprKind::SpecSection { .. } => true,
        ExprKind::Formula { symbol, .. } => {
            let body_ty = program.arena[program.spec_expr(id)].ty.clone();
            if !body_ty.is_bool() {
                log::error_at(
                    MODULE,
                    format!("Formula must be a bool, found {}", body_ty),
                    loc,
                );
                return false;
            }
            context.add_formula(symbol, id);
            program.arena[id].ty = Type::bool();
            true
        }
        ExprKind::Contract { symbol, .. } => {
            let tys = child_types(program, id);
            if !tys[0].is_bool() {
                log::error_at(
                    MODULE,
                    format!("Assume of contract must be a bool, found {}", tys[0]),
                    loc,
                );
                return false;
            }
            if !tys[1].is_bool() {
                log::error_at(
                    MODULE,
                    format!("Guarantee of contract must be a bool, found {}", tys[1]),
                    loc,
                );
                return false;
            }
            context.add_contract(symbol, id);
            program.arena[id].ty = Type::Contract;
            true
        }
        ExprKind::Constant { value } => {
            if let Value::Int(v) = value {
                if !fits_int_width(v, context.config.int_width, context.config.int_signed) {
                    log::error_at(
                        MODULE,
                        format!(
                            "Constant '{}' not representable in configured int width ('{}')",
                            v, context.config.int_width
                        ),
                        loc,
                    );
                    return false;
                }
            }
            true
        }
        ExprKind::Signal { symbol, .. } => {
            let declared = match context.signals.get(&symbol) {
                Some(ty) => ty.clone(),
                None => {
                    log::error_at(MODULE, format!("Signal '{}' not declared", symbol), loc);
                    return false;
                }
            };
            if context.config.assembly_enabled
                && !context.config.signal_mapping.contains_key(&symbol)
            {
                log::error_at(
                    MODULE,
                    format!("Mapping does not contain signal '{}'", symbol),
                    loc,
                );
                return false;
            }
            if context.config.frontend != Frontend::Booleanizer
                && (declared.is_integer() || declared.is_float())
            {
                log::error_at(
                    MODULE,
                    format!(
                        "Non-bool type found '{}' ({})\n\tDid you mean to enable the Booleanizer?",
                        symbol, declared
                    ),
                    loc,
                );
                return false;
            }
            if context.config.frontend == Frontend::Booleanizer {
                program.arena[id].engine = Engine::Booleanizer;
            }
            if let Some(&sid) = context.config.signal_mapping.get(&symbol) {
                if let ExprKind::Signal { signal_id, .. } = &mut program.arena[id].kind {
                    *signal_id = sid as i32;
                }
            }
            program.arena[id].ty = declared;
            true
        }
        ExprKind::AtomicChecker { symbol } => {
            if context.config.frontend != Frontend::AtomicChecker {
                log::error_at(
                    MODULE,
                    format!("Atomic checkers not enabled, but found in expression '{}'", symbol),
                    loc,
                );
                return false;
            }
            if !context.atomic_checkers.contains_key(&symbol) {
                log::error_at(MODULE, format!("Atomic checker '{}' not defined", symbol), loc);
                return false;
            }
            program.arena[id].ty = Type::bool();
            true
        }
        ExprKind::Variable { symbol } => {
            if let Some(&set_expr) = context.bound_vars.get(&symbol) {
                let set_ty = program.arena[set_expr].ty.clone();
                match set_ty {
                    Type::Set { member, .. } => {
                        program.arena[id].ty = *member;
                        true
                    }
                    other => {
                        log::internal(
                            MODULE,
                            format!(
                                "Set aggregation set not assigned to type 'set', found '{}'",
                                other
                            ),
                        );
                        false
                    }
                }
            } else if let Some(ty) = context.variables.get(&symbol) {
                program.arena[id].ty = ty.clone();
                true
            } else if let Some(&def) = context.definitions.get(&symbol) {
                program.arena[id].ty = program.arena[def].ty.clone();
                true
            } else if context.structs.contains_key(&symbol) {
                log::error_at(
                    MODULE,
                    "Defined structs may not be used as variables, try declaring the struct first",
                    loc,
                );
                false
            } else if context.atomic_checkers.contains_key(&symbol) {
                program.arena[id].ty = Type::bool();
                true
            } else if context.specifications.contains_key(&symbol) {
                program.arena[id].ty = Type::bool();
                true
            } else if context.contracts.contains_key(&symbol) {
                log::error_at(
                    MODULE,
                    format!("Contracts not allowed as sub-expressions ('{}')", symbol),
                    loc,
                );
                false
            } else {
                log::error_at(MODULE, format!("Symbol '{}' not recognized", symbol), loc);
                false
            }
        }
        ExprKind::SetExpression => {
            let tys = child_types(program, id);
            let mut is_const = true;
            let mut member_ty = Type::None;
            for ty in &tys {
                is_const = is_const && ty.is_const();
                member_ty = ty.clone();
            }
            for ty in &tys {
                if *ty != member_ty {
                    log::error_at(
                        MODULE,
                        format!(
                            "Set must be of homogeneous type (found '{}' and '{}')",
                            ty, member_ty
                        ),
                        loc,
                    );
                    return false;
                }
            }
            program.arena[id].ty = Type::Set {
                member: Box::new(member_ty),
                is_const,
            };
            true
        }
        ExprKind::Struct { symbol, members } => {
            let declared = match context.structs.get(&symbol) {
                Some(members) => members.clone(),
                None => {
                    log::error_at(MODULE, format!("Struct '{}' not defined", symbol), loc);
                    return false;
                }
            };
            let tys = child_types(program, id);
            let is_const = tys.iter().all(|t| t.is_const());
            for (name, expected) in &declared {
                let Some(pos) = members.iter().position(|m| m == name) else {
                    log::error_at(
                        MODULE,
                        format!("Member '{}' not in struct '{}'", name, symbol),
                        loc,
                    );
                    return false;
                };
                if tys[pos] != *expected {
                    log::error_at(
                        MODULE,
                        format!(
                            "Member '{}' invalid type for struct '{}' (expected '{}' but got '{}')",
                            name, symbol, expected, tys[pos]
                        ),
                        loc,
                    );
                    return false;
                }
            }
            program.arena[id].ty = Type::Struct { symbol, is_const };
            true
        }
        ExprKind::StructAccess { member } => {
            let struct_ty = program.arena[program.arena[id].children[0]].ty.clone();
            let Type::Struct { symbol, .. } = struct_ty else {
                log::error_at(
                    MODULE,
                    format!("Struct access on non-struct value ('{}')", struct_ty),
                    loc,
                );
                return false;
            };
            let Some(declared) = context.structs.get(&symbol) else {
                log::error_at(MODULE, format!("Struct '{}' not defined", symbol), loc);
                return false;
            };
            match declared.iter().find(|(name, _)| *name == member) {
                Some((_, ty)) => {
                    program.arena[id].ty = ty.clone();
                    true
                }
                None => {
                    log::error_at(
                        MODULE,
                        format!("Member '{}' invalid for struct '{}'", member, symbol),
                        loc,
                    );
                    false
                }
            }
        }
        ExprKind::FunctionCall { symbol } => {
            // Only struct instantiations are supported as calls.
            let Some(declared) = context.structs.get(&symbol).cloned() else {
                log::error_at(MODULE, format!("General functions unsupported ('{}')", symbol), loc);
                return false;
            };
            let actual = child_types(program, id);
            let expected: Vec<Type> = declared.iter().map(|(_, t)| t.clone()).collect();
            if expected.len() != actual.len()
                || expected.iter().zip(actual.iter()).any(|(e, a)| e != a)
            {
                let fmt_tys = |tys: &[Type]| {
                    tys.iter().map(Type::to_string).collect::<Vec<_>>().join(", ")
                };
                log::error_at(
                    MODULE,
                    format!(
                        "Struct instantiation does not match signature\n\tFound:    {}({})\n\tExpected: {}({})",
                        symbol,
                        fmt_tys(&actual),
                        symbol,
                        fmt_tys(&expected)
                    ),
                    loc,
                );
                return false;
            }
            let is_const = actual.iter().all(|t| t.is_const());
            program.arena[id].ty = Type::Struct { symbol, is_const };
            true
        }
        ExprKind::SetAggregation { op, .. } => {
            let set_expr = program.arena[id].children[0];
            let set_ty = program.arena[set_expr].ty.clone();
            let (member_ty, set_const) = match &set_ty {
                Type::Set { member, is_const } => ((**member).clone(), *is_const),
                other => {
                    log::error_at(
                        MODULE,
                        format!("Set aggregation set must be Set type (found '{}')", other),
                        loc,
                    );
                    return false;
                }
            };
            if let ExprKind::SetAggregation { bound, .. } = &program.arena[id].kind {
                let bound = bound.clone();
                context.add_variable(bound, member_ty);
            }
            if op.is_parameterized() {
                if context.config.frontend != Frontend::Booleanizer {
                    log::error_at(
                        MODULE,
                        "Parameterized set aggregation operators require Booleanizer, but Booleanizer not enabled",
                        loc,
                    );
                    return false;
                }
                let num = program.arena[id].children[1];
                let num_ty = program.arena[num].ty.clone();
                if !num_ty.is_integer() {
                    log::error_at(
                        MODULE,
                        format!(
                            "Parameter for set aggregation must be integer type (found '{}')",
                            num_ty
                        ),
                        loc,
                    );
                    return false;
                }
            }
            let body = *program.arena[id].children.last().unwrap();
            let body_ty = program.arena[body].ty.clone();
            if !body_ty.is_bool() {
                log::error_at(
                    MODULE,
                    format!("Set aggregation expression must be 'bool' (found '{}')", body_ty),
                    loc,
                );
                return false;
            }
            program.arena[id].ty = Type::Bool {
                is_const: body_ty.is_const() && set_const,
            };
            true
        }
        ExprKind::Temporal { op, interval } => {
            let tys = child_types(program, id);
            let mut is_const = true;
            for ty in &tys {
                is_const = is_const && ty.is_const();
                if !ty.is_bool() {
                    log::error_at(
                        MODULE,
                        format!(
                            "Invalid operands for '{}', found '{}' but expected 'bool'",
                            op.symbol(),
                            ty
                        ),
                        loc,
                    );
                    return false;
                }
            }
            if op.is_future_time() && context.is_past_time() {
                log::error_at(
                    MODULE,
                    "Mixed-time formulas unsupported, found future-time operator in PTSPEC",
                    loc,
                );
                return false;
            }
            if op.is_past_time() {
                if context.config.implementation != Implementation::C {
                    log::error_at(
                        MODULE,
                        "Past-time operators only supported for the C implementation",
                        loc,
                    );
                    return false;
                }
                if context.is_future_time() {
                    log::error_at(
                        MODULE,
                        "Mixed-time formulas unsupported, found past-time operator in FTSPEC",
                        loc,
                    );
                    return false;
                }
            }
            if !interval.is_valid() {
                log::error_at(
                    MODULE,
                    format!(
                        "Time interval invalid, lower bound must be less than or equal to upper bound [{},{}]",
                        interval.lb, interval.ub
                    ),
                    loc,
                );
                return false;
            }
            if !fits_int_width(
                interval.ub as i64,
                context.config.int_width,
                context.config.int_signed,
            ) {
                log::error_at(
                    MODULE,
                    format!(
                        "Interval bound '{}' not representable in configured int width ('{}')",
                        interval.ub, context.config.int_width
                    ),
                    loc,
                );
                return false;
            }
            program.arena[id].ty = Type::Bool { is_const };
            true
        }
        ExprKind::Probability { prob } => {
            if !(0.0..=1.0).contains(&prob) {
                log::error_at(
                    MODULE,
                    format!("Probability must be in the range [0.0,1.0], found ({})", prob),
                    loc,
                );
                return false;
            }
            program.arena[id].ty = Type::bool();
            true
        }
        ExprKind::Operator { op } if op.is_bitwise() => {
            if context.config.implementation != Implementation::C {
                log::error_at(
                    MODULE,
                    "Bitwise operators only supported for the C implementation",
                    loc,
                );
                return false;
            }
            if context.config.frontend != Frontend::Booleanizer {
                log::error_at(
                    MODULE,
                    "Found Booleanizer expression, but Booleanizer not enabled",
                    loc,
                );
                return false;
            }
            let tys = child_types(program, id);
            let target = tys[0].clone();
            for ty in &tys {
                if *ty != target || !ty.is_integer() {
                    log::error_at(
                        MODULE,
                        format!(
                            "Invalid operands for '{}', found '{}' but expected '{}'",
                            op.symbol(),
                            ty,
                            target
                        ),
                        loc,
                    );
                    return false;
                }
            }
            let is_const = tys.iter().all(|t| t.is_const());
            program.arena[id].ty = target.with_const(is_const);
            true
        }
        ExprKind::Operator { op } if op.is_arithmetic() => {
            if context.config.implementation != Implementation::C {
                log::error_at(
                    MODULE,
                    "Arithmetic operators only supported for the C implementation",
                    loc,
                );
                return false;
            }
            if context.config.frontend != Frontend::Booleanizer {
                log::error_at(
                    MODULE,
                    "Found Booleanizer expression, but Booleanizer not enabled",
                    loc,
                );
                return false;
            }
            if op == OperatorKind::ArithmeticDiv {
                let rhs = program.arena[id].children[1];
                if let ExprKind::Constant { value } = &program.arena[rhs].kind {
                    let is_zero = match value {
                        Value::Int(v) => *v == 0,
                        Value::Float(v) => *v == 0.0,
                        Value::Bool(_) => false,
                    };
                    if is_zero {
                        log::error_at(MODULE, "Divide by zero found", loc);
                        return false;
                    }
                }
            }
            let tys = child_types(program, id);
            let target = tys[0].clone();
            for ty in &tys {
                if *ty != target {
                    log::error_at(
                        MODULE,
                        format!(
                            "Operands must be of homogeneous type, found {} and {}",
                            ty, target
                        ),
                        loc,
                    );
                    return false;
                }
            }
            let is_const = tys.iter().all(|t| t.is_const());
            program.arena[id].ty = target.with_const(is_const);
            true
        }
        ExprKind::Operator { op } if op.is_relational() => {
            let tys = child_types(program, id);
            if tys[0] != tys[1] {
                log::error_at(
                    MODULE,
                    format!(
                        "Invalid operands for '{}', must be of same type (found '{}' and '{}')",
                        op.symbol(),
                        tys[0],
                        tys[1]
                    ),
                    loc,
                );
                return false;
            }
            if matches!(op, OperatorKind::Equal | OperatorKind::NotEqual)
                && (tys[0].is_float() || tys[1].is_float())
            {
                log::error_at(MODULE, "Equality invalid for float expressions", loc);
                return false;
            }
            program.arena[id].ty = Type::Bool {
                is_const: tys[0].is_const() && tys[1].is_const(),
            };
            true
        }
        ExprKind::Operator { op } => {
            // Logical operators.
            let tys = child_types(program, id);
            let mut is_const = true;
            for ty in &tys {
                is_const = is_const && ty.is_const();
                if !ty.is_bool() {
                    log::error_at(
                        MODULE,
                        format!(
                            "Invalid operands for '{}', found '{}' but expected 'bool'",
                            op.symbol(),
                            ty
                        ),
                        loc,
                    );
                    return false;
                }
            }
            program.arena[id].ty = Type::Bool { is_const };
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Loc;
    use crate::types::Interval;

    fn bool_program_with(
        build: impl FnOnce(&mut Program) -> ExprId,
    ) -> (Program, Config) {
        let mut program = Program::new();
        program.declare_signals(vec!["a", "b"], Type::bool());
        let expr = build(&mut program);
        program.add_ft_spec("spec0", 0, expr);
        (program, Config::default())
    }

    #[test]
    fn well_typed_boolean_spec_passes() {
        let (mut program, config) = bool_program_with(|p| {
            let a = p.arena.mk_signal(Loc::none(), "a");
            let b = p.arena.mk_signal(Loc::none(), "b");
            let and = p.arena.mk_and(Loc::none(), vec![a, b]);
            p.arena.mk_global(Loc::none(), 0, 5, and)
        });
        let (ok, _ctx) = type_check(&mut program, config);
        assert!(ok);
        // Every reachable node has a type now.
        for id in program.postorder() {
            if !matches!(program.arena[id].kind, ExprKind::SpecSection { .. }) {
                assert!(!program.arena[id].ty.is_none(), "untyped node {:?}", id);
            }
        }
    }

    #[test]
    fn undeclared_signal_fails() {
        let (mut program, config) = bool_program_with(|p| p.arena.mk_signal(Loc::none(), "ghost"));
        let (ok, _) = type_check(&mut program, config);
        assert!(!ok);
    }

    #[test]
    fn invalid_interval_fails() {
        let (mut program, config) = bool_program_with(|p| {
            let a = p.arena.mk_signal(Loc::none(), "a");
            p.arena
                .mk_temporal(Loc::none(), crate::expr::TemporalKind::Global, Interval { lb: 5, ub: 2 }, vec![a])
        });
        let (ok, _) = type_check(&mut program, config);
        assert!(!ok);
    }

    #[test]
    fn non_bool_operand_of_temporal_fails() {
        let mut program = Program::new();
        program.declare_signals(vec!["x"], Type::int());
        let x = program.arena.mk_signal(Loc::none(), "x");
        let g = program.arena.mk_global(Loc::none(), 0, 2, x);
        program.add_ft_spec("s", 0, g);
        let mut config = Config::default();
        config.frontend = Frontend::Booleanizer;
        let (ok, _) = type_check(&mut program, config);
        assert!(!ok);
    }

    #[test]
    fn non_bool_signal_requires_booleanizer() {
        let mut program = Program::new();
        program.declare_signals(vec!["x"], Type::int());
        let x = program.arena.mk_signal(Loc::none(), "x");
        let five = program.arena.mk_int(Loc::none(), 5);
        let cmp = program
            .arena
            .mk_operator(Loc::none(), OperatorKind::GreaterThan, vec![x, five]);
        program.add_ft_spec("s", 0, cmp);
        let (ok, _) = type_check(&mut program, Config::default());
        assert!(!ok, "int signal without Booleanizer must fail");
    }

    #[test]
    fn past_time_operator_requires_c_target() {
        let mut program = Program::new();
        program.declare_signals(vec!["a"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let h = program.arena.mk_temporal(
            Loc::none(),
            crate::expr::TemporalKind::Historical,
            Interval::new(0, 3),
            vec![a],
        );
        program.add_pt_spec("p", 0, h);
        let mut config = Config::default();
        config.implementation = Implementation::Vhdl;
        let (ok, _) = type_check(&mut program, config);
        assert!(!ok);
    }

    #[test]
    fn mixed_time_formula_fails() {
        let mut program = Program::new();
        program.declare_signals(vec!["a"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let h = program.arena.mk_temporal(
            Loc::none(),
            crate::expr::TemporalKind::Once,
            Interval::new(0, 3),
            vec![a],
        );
        let g = program.arena.mk_global(Loc::none(), 0, 5, h);
        program.add_ft_spec("s", 0, g);
        let (ok, _) = type_check(&mut program, Config::default());
        assert!(!ok);
    }

    #[test]
    fn float_equality_fails() {
        let mut program = Program::new();
        program.declare_signals(vec!["x"], Type::float());
        let x = program.arena.mk_signal(Loc::none(), "x");
        let c = program.arena.mk_float(Loc::none(), 1.5);
        let eq = program
            .arena
            .mk_operator(Loc::none(), OperatorKind::Equal, vec![x, c]);
        program.add_ft_spec("s", 0, eq);
        let mut config = Config::default();
        config.frontend = Frontend::Booleanizer;
        let (ok, _) = type_check(&mut program, config);
        assert!(!ok);
    }

    #[test]
    fn division_by_constant_zero_fails() {
        let mut program = Program::new();
        program.declare_signals(vec!["x"], Type::int());
        let x = program.arena.mk_signal(Loc::none(), "x");
        let zero = program.arena.mk_int(Loc::none(), 0);
        let div = program
            .arena
            .mk_operator(Loc::none(), OperatorKind::ArithmeticDiv, vec![x, zero]);
        let five = program.arena.mk_int(Loc::none(), 5);
        let cmp = program
            .arena
            .mk_operator(Loc::none(), OperatorKind::GreaterThan, vec![div, five]);
        program.add_ft_spec("s", 0, cmp);
        let mut config = Config::default();
        config.frontend = Frontend::Booleanizer;
        let (ok, _) = type_check(&mut program, config);
        assert!(!ok);
    }

    #[test]
    fn constant_wider_than_int_width_fails() {
        let mut program = Program::new();
        program.declare_signals(vec!["x"], Type::int());
        let x = program.arena.mk_signal(Loc::none(), "x");
        let big = program.arena.mk_int(Loc::none(), 300);
        let cmp = program
            .arena
            .mk_operator(Loc::none(), OperatorKind::GreaterThan, vec![x, big]);
        program.add_ft_spec("s", 0, cmp);
        let mut config = Config::default();
        config.frontend = Frontend::Booleanizer;
        config.int_width = 8;
        let (ok, _) = type_check(&mut program, config);
        assert!(!ok);
    }

    #[test]
    fn probability_out_of_range_fails() {
        let mut program = Program::new();
        program.declare_signals(vec!["a"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        let g = program.arena.mk_global(Loc::none(), 0, 2, a);
        let pr = program.arena.alloc(crate::expr::Expr::new(
            Loc::none(),
            ExprKind::Probability { prob: 1.5 },
            vec![g],
        ));
        program.add_ft_spec("s", 0, pr);
        let (ok, _) = type_check(&mut program, Config::default());
        assert!(!ok);
    }

    #[test]
    fn atomic_checker_definition_must_be_relational() {
        let mut program = Program::new();
        program.declare_signals(vec!["a"], Type::bool());
        let a = program.arena.mk_signal(Loc::none(), "a");
        program.add_atomic("chk", a);
        let spec = program.arena.mk_bool(Loc::none(), true);
        program.add_ft_spec("s", 0, spec);
        let mut config = Config::default();
        config.frontend = Frontend::AtomicChecker;
        let (ok, _) = type_check(&mut program, config);
        assert!(!ok);
    }

    #[test]
    fn errors_accumulate_across_a_section() {
        let mut program = Program::new();
        program.declare_signals(vec!["a"], Type::bool());
        let g1 = program.arena.mk_signal(Loc::none(), "ghost1");
        let g2 = program.arena.mk_signal(Loc::none(), "ghost2");
        program.add_ft_spec("s1", 0, g1);
        program.add_ft_spec("s2", 1, g2);
        // Both specs are checked even though the first already failed.
        let (ok, ctx) = type_check(&mut program, Config::default());
        assert!(!ok);
        assert!(ctx.specifications.is_empty());
    }
}
