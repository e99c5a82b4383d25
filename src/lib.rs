//! Compiler core for Mission-Time Linear Temporal Logic specifications
//! targeting the R2U2 runtime verification engine.
//!
//! The crate owns the formula intermediate representation and the
//! optimization pipeline that runs between an external surface-language
//! parser and an external bytecode assembler:
//!
//! - an id-keyed expression DAG with parent back-references ([`expr`]),
//! - a bottom-up type checker ([`typecheck`]),
//! - an ordered pass pipeline with SCQ-directed rewrites ([`passes`]),
//! - equality saturation with SCQ-aware extraction ([`eqsat`]),
//! - an SMT-LIB2 satisfiability/equivalence backend ([`sat`]),
//! - propagation-delay and queue sizing ([`scq`]).
//!
//! The optimization target throughout is the monitor's Shared Connection
//! Queue memory: every node the temporal-logic engine evaluates owns a
//! ring buffer whose depth depends on how far its siblings can lag.

pub mod cli;
pub mod compile;
pub mod context;
pub mod eqsat;
pub mod error;
pub mod expr;
pub mod frontend;
pub mod log;
pub mod passes;
pub mod sat;
pub mod scq;
pub mod serialize;
pub mod style;
pub mod typecheck;
pub mod types;
pub mod util;

pub use compile::{compile, compile_with, Assemble, Options, Stage};
pub use context::{Config, Context, Endianness, Program, Section};
pub use error::{CompileError, CompileErrorKind, CompileResult, ReturnCode};
pub use expr::{Expr, ExprArena, ExprId, ExprKind, Loc, OperatorKind, TemporalKind, Value};
pub use passes::{pass_list, run_passes, PassOptions};
pub use sat::SatResult;
pub use serialize::WriteOptions;
pub use typecheck::type_check;
pub use types::{Engine, Frontend, Implementation, Interval, Type};
