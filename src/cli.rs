//! Command-line interface for the MLTL specification compiler.

use clap::{Parser, ValueEnum};

use crate::compile::{self, Options};
use crate::context::Endianness;
use crate::error::ReturnCode;
use crate::serialize::WriteOptions;
use crate::types::Implementation;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImplArg {
    C,
    Cpp,
    Vhdl,
}

impl From<ImplArg> for Implementation {
    fn from(arg: ImplArg) -> Self {
        match arg {
            ImplArg::C => Implementation::C,
            ImplArg::Cpp => Implementation::Cpp,
            ImplArg::Vhdl => Implementation::Vhdl,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EndianArg {
    Native,
    Network,
    Big,
    Little,
}

impl From<EndianArg> for Endianness {
    fn from(arg: EndianArg) -> Self {
        match arg {
            EndianArg::Native => Endianness::Native,
            EndianArg::Network => Endianness::Network,
            EndianArg::Big => Endianness::Big,
            EndianArg::Little => Endianness::Little,
        }
    }
}

/// Compile MLTL specifications into monitor bytecode for the R2U2 engine.
#[derive(Debug, Parser)]
#[command(name = "mltlc")]
#[command(about = "MLTL specification compiler for the R2U2 runtime verification engine")]
#[command(version)]
pub struct Cli {
    /// Specification input: a saved program (.pickle/.json) produced by a
    /// surface-language frontend
    pub input: String,

    /// CSV trace file; a '#'-header maps signal names to column order
    #[arg(long)]
    pub trace: Option<String>,

    /// Map file with one NAME:INT signal assignment per line
    #[arg(long)]
    pub map: Option<String>,

    /// Disable output
    #[arg(short, long)]
    pub quiet: bool,

    /// Set debug level (0=none, 1=basic, 2=extra)
    #[arg(long, value_name = "LEVEL", num_args = 0..=1, default_missing_value = "1")]
    pub debug: Option<u8>,

    /// Enable stat output (one key=value per line)
    #[arg(long)]
    pub stats: bool,

    /// Target monitor implementation
    #[arg(long = "impl", value_enum, default_value = "c")]
    pub implementation: ImplArg,

    /// Location for the specification binary
    #[arg(short, long, default_value = "spec.bin")]
    pub output: String,

    /// Bit width for integer types
    #[arg(long, default_value_t = 32)]
    pub int_width: u32,

    /// Treat integer types as signed
    #[arg(long)]
    pub int_signed: bool,

    /// Bit width for floating-point types
    #[arg(long, default_value_t = 32)]
    pub float_width: u32,

    /// Mission time, overriding inference from a trace file
    #[arg(long)]
    pub mission_time: Option<i64>,

    /// Steps the monitor may predict ahead
    #[arg(long, default_value_t = 0)]
    pub prediction_horizon: i64,

    /// Byte order of the spec binary
    #[arg(long, value_enum, default_value = "native")]
    pub endian: EndianArg,

    /// Enable atomic checkers
    #[arg(long = "atomic-checkers", alias = "at")]
    pub atomic_checkers: bool,

    /// Enable the booleanizer
    #[arg(long = "booleanizer", alias = "bz")]
    pub booleanizer: bool,

    /// Only run the parser stage
    #[arg(short = 'p', long = "parse")]
    pub only_parse: bool,

    /// Only run the parser and type checker
    #[arg(long = "type-check", alias = "tc")]
    pub only_type_check: bool,

    /// Only run the parser, type checker, and passes
    #[arg(short = 'c', long = "compile")]
    pub only_compile: bool,

    /// Disable the CSE optimization
    #[arg(long = "disable-cse", alias = "dc")]
    pub disable_cse: bool,

    /// Disable the MLTL rewrite rule optimizations
    #[arg(long = "disable-rewrite", alias = "dr")]
    pub disable_rewrite: bool,

    /// Enable equality saturation
    #[arg(long = "eqsat", alias = "eq")]
    pub eqsat: bool,

    /// Keep extended operators
    #[arg(long)]
    pub extops: bool,

    /// Convert to negation normal form
    #[arg(long)]
    pub nnf: bool,

    /// Convert to boolean normal form
    #[arg(long)]
    pub bnf: bool,

    /// Check satisfiability of future-time formulas
    #[arg(long = "check-sat", alias = "sat")]
    pub check_sat: bool,

    /// Timeout for saturation engine calls, in seconds
    #[arg(long, default_value_t = 3600)]
    pub timeout_egglog: u64,

    /// Timeout for SMT solver calls, in seconds
    #[arg(long, default_value_t = 3600)]
    pub timeout_sat: u64,

    /// Write the final program in surface format
    #[arg(long = "write-c2po", value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    pub write_c2po: Option<String>,

    /// Write the final program in MLTL standard format
    #[arg(long = "write-mltl", value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    pub write_mltl: Option<String>,

    /// Write the final program in prefix notation
    #[arg(long = "write-prefix", value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    pub write_prefix: Option<String>,

    /// Write the final program in saved-program form
    #[arg(long = "write-pickle", value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    pub write_pickle: Option<String>,

    /// Write the SMT encoding of each future-time formula
    #[arg(long = "write-smt", value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    pub write_smt: Option<String>,

    /// Keep the working directory
    #[arg(long)]
    pub keep: bool,

    /// Location for temporary files
    #[arg(long)]
    pub workdir: Option<String>,
}

impl From<Cli> for Options {
    fn from(cli: Cli) -> Self {
        Options {
            input: cli.input,
            trace: cli.trace,
            map: cli.map,
            output: cli.output,
            implementation: cli.implementation.into(),
            mission_time: cli.mission_time,
            int_width: cli.int_width,
            int_signed: cli.int_signed,
            float_width: cli.float_width,
            endian: cli.endian.into(),
            prediction_horizon: cli.prediction_horizon,
            atomic_checkers: cli.atomic_checkers,
            booleanizer: cli.booleanizer,
            only_parse: cli.only_parse,
            only_type_check: cli.only_type_check,
            only_compile: cli.only_compile,
            disable_cse: cli.disable_cse,
            disable_rewrite: cli.disable_rewrite,
            eqsat: cli.eqsat,
            extops: cli.extops,
            nnf: cli.nnf,
            bnf: cli.bnf,
            check_sat: cli.check_sat,
            timeout_egglog: cli.timeout_egglog,
            timeout_sat: cli.timeout_sat,
            write: WriteOptions {
                c2po: cli.write_c2po,
                prefix: cli.write_prefix,
                mltl: cli.write_mltl,
                pickle: cli.write_pickle,
                smt: cli.write_smt,
            },
            keep: cli.keep,
            workdir: cli.workdir,
            debug: cli.debug.unwrap_or(0),
            stats: cli.stats,
            quiet: cli.quiet,
        }
    }
}

/// Entry point for the binary.
pub fn run() -> ReturnCode {
    let cli = Cli::parse();
    let opts: Options = cli.into();
    compile::compile(&opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_surface() {
        let cli = Cli::parse_from(["mltlc", "spec.pickle"]);
        assert_eq!(cli.output, "spec.bin");
        assert_eq!(cli.int_width, 32);
        assert_eq!(cli.float_width, 32);
        assert_eq!(cli.timeout_egglog, 3600);
        assert_eq!(cli.timeout_sat, 3600);
        assert!(cli.write_prefix.is_none());
        assert!(cli.debug.is_none());
    }

    #[test]
    fn write_flags_accept_optional_paths() {
        let cli = Cli::parse_from(["mltlc", "spec.pickle", "--write-prefix"]);
        assert_eq!(cli.write_prefix.as_deref(), Some(""));
        let cli = Cli::parse_from(["mltlc", "spec.pickle", "--write-prefix", "out.txt"]);
        assert_eq!(cli.write_prefix.as_deref(), Some("out.txt"));
    }

    #[test]
    fn debug_flag_defaults_to_level_one() {
        let cli = Cli::parse_from(["mltlc", "spec.pickle", "--debug"]);
        assert_eq!(cli.debug, Some(1));
        let cli = Cli::parse_from(["mltlc", "spec.pickle", "--debug", "2"]);
        assert_eq!(cli.debug, Some(2));
    }

    #[test]
    fn frontend_aliases_parse() {
        let cli = Cli::parse_from(["mltlc", "spec.pickle", "--at"]);
        assert!(cli.atomic_checkers);
        let cli = Cli::parse_from(["mltlc", "spec.pickle", "--bz", "--eq"]);
        assert!(cli.booleanizer);
        assert!(cli.eqsat);
    }
}
