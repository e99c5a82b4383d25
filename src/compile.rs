//! The compilation driver: input validation, staging, pass execution,
//! output writing, and assembly hand-off.
//!
//! ```text
//! options ──validate──> Config + PassOptions
//!    │
//!    ▼
//! saved program ──type check──> Context ──passes──> final IR
//!                                                      │
//!                               requested dumps <──────┤
//!                               external assembler <───┘ (when linked)
//! ```
//!
//! The driver returns a [`ReturnCode`]; every failure path maps onto the
//! documented exit codes. The working directory lives exactly as long as
//! the pass pipeline unless `--keep` is given.

use std::path::{Path, PathBuf};

use crate::context::{Config, Context, Endianness, Program};
use crate::error::ReturnCode;
use crate::frontend;
use crate::log;
use crate::passes::{self, PassOptions};
use crate::serialize::{self, WriteOptions};
use crate::typecheck;
use crate::types::{Frontend, Implementation};
use crate::util::{self, Workdir};

const MODULE: &str = "MAIN";

/// How far a run proceeds before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Parse,
    TypeCheck,
    Passes,
    Assemble,
}

/// The external assembler seam. The core compiles down to a final IR;
/// turning that into the binary spec file is the assembler's job.
pub trait Assemble {
    fn assemble(&self, program: &Program, context: &Context) -> crate::error::CompileResult<Vec<u8>>;
}

/// Everything the CLI (or an embedding tool) can ask of one compilation.
#[derive(Debug, Clone)]
pub struct Options {
    pub input: String,
    pub trace: Option<String>,
    pub map: Option<String>,
    pub output: String,
    pub implementation: Implementation,
    pub mission_time: Option<i64>,
    pub int_width: u32,
    pub int_signed: bool,
    pub float_width: u32,
    pub endian: Endianness,
    pub prediction_horizon: i64,
    pub atomic_checkers: bool,
    pub booleanizer: bool,
    pub only_parse: bool,
    pub only_type_check: bool,
    pub only_compile: bool,
    pub disable_cse: bool,
    pub disable_rewrite: bool,
    pub eqsat: bool,
    pub extops: bool,
    pub nnf: bool,
    pub bnf: bool,
    pub check_sat: bool,
    pub timeout_egglog: u64,
    pub timeout_sat: u64,
    pub write: WriteOptions,
    pub keep: bool,
    pub workdir: Option<String>,
    pub debug: u8,
    pub stats: bool,
    pub quiet: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            input: String::new(),
            trace: None,
            map: None,
            output: "spec.bin".to_string(),
            implementation: Implementation::C,
            mission_time: None,
            int_width: 32,
            int_signed: false,
            float_width: 32,
            endian: Endianness::Native,
            prediction_horizon: 0,
            atomic_checkers: false,
            booleanizer: false,
            only_parse: false,
            only_type_check: false,
            only_compile: false,
            disable_cse: false,
            disable_rewrite: false,
            eqsat: false,
            extops: false,
            nnf: false,
            bnf: false,
            check_sat: false,
            timeout_egglog: 3600,
            timeout_sat: 3600,
            write: WriteOptions::default(),
            keep: false,
            workdir: None,
            debug: 0,
            stats: false,
            quiet: false,
        }
    }
}

/// Validate option compatibility and file existence, returning the
/// compilation configuration, the pass selection, and the final stage.
pub fn validate_input(
    opts: &Options,
    has_assembler: bool,
) -> Option<(Config, PassOptions, Stage)> {
    log::debug(MODULE, 1, "Validating input");
    let mut status = true;

    let input_path = PathBuf::from(&opts.input);
    if !input_path.is_file() {
        log::error(
            MODULE,
            format!("Input file '{}' not a valid file", opts.input),
        );
        status = false;
    }

    let trace_path = opts.trace.as_ref().map(PathBuf::from);
    if let Some(path) = &trace_path {
        if !path.is_file() {
            log::error(MODULE, format!("Trace file '{}' is not a valid file", path.display()));
            status = false;
        }
    }

    let map_path = opts.map.as_ref().map(PathBuf::from);
    if let Some(path) = &map_path {
        if !path.is_file() {
            log::error(MODULE, format!("Map file '{}' is not a valid file", path.display()));
            status = false;
        }
    }

    let workdir = match &opts.workdir {
        None => PathBuf::from(".").join(util::default_workdir_name()),
        Some(parent) => {
            let parent = PathBuf::from(parent);
            if parent.exists() {
                parent.join(util::default_workdir_name())
            } else {
                log::warning(
                    MODULE,
                    format!(
                        "workdir parent path {} does not exist, defaulting to ./{}",
                        parent.display(),
                        util::default_workdir_name()
                    ),
                );
                PathBuf::from(".").join(util::default_workdir_name())
            }
        }
    };

    let mut signal_mapping = None;
    let mut trace_length: i64 = -1;
    if status {
        if let Some(path) = &trace_path {
            match frontend::process_trace_file(path, map_path.is_some()) {
                Ok((length, mapping)) => {
                    trace_length = length;
                    signal_mapping = mapping;
                }
                Err(err) => {
                    log::error(MODULE, err.to_string());
                    status = false;
                }
            }
        }
        if let Some(path) = &map_path {
            match frontend::process_map_file(path) {
                Ok(mapping) => signal_mapping = Some(mapping),
                Err(err) => {
                    log::warning(MODULE, err.to_string());
                    signal_mapping = None;
                }
            }
        }
    }

    let mission_time = match opts.mission_time {
        Some(custom) => {
            if trace_length > -1 && trace_length < custom {
                log::warning(
                    MODULE,
                    format!(
                        "Trace length is shorter than given mission time ({} < {})",
                        trace_length, custom
                    ),
                );
            }
            custom
        }
        None => trace_length,
    };

    if opts.implementation != Implementation::C && opts.extops {
        log::error(MODULE, "Extended operators only supported for the C implementation");
        status = false;
    }

    if opts.nnf && opts.bnf {
        log::warning(MODULE, "Attempting rewrite to both NNF and BNF, defaulting to NNF");
    }
    if !opts.extops && (opts.nnf || opts.bnf) {
        log::warning(
            MODULE,
            "NNF and BNF incompatible without extended operators, output will not be in either normal form",
        );
    }

    if opts.booleanizer && opts.atomic_checkers {
        log::error(MODULE, "Only one of atomic checkers and booleanizer can be enabled");
        status = false;
    } else if opts.booleanizer && opts.implementation != Implementation::C {
        log::error(MODULE, "Booleanizer only available for C implementation");
        status = false;
    }

    let frontend = if opts.booleanizer {
        Frontend::Booleanizer
    } else if opts.atomic_checkers {
        Frontend::AtomicChecker
    } else {
        Frontend::None
    };

    let mut stage = if opts.only_parse {
        Stage::Parse
    } else if opts.only_type_check {
        Stage::TypeCheck
    } else if opts.only_compile {
        Stage::Passes
    } else {
        Stage::Assemble
    };

    if stage == Stage::Assemble && !has_assembler {
        log::warning(MODULE, "No assembler linked; stopping after passes");
        stage = Stage::Passes;
    }

    if !status {
        return None;
    }

    let config = Config {
        input_path,
        output_path: PathBuf::from(&opts.output),
        workdir,
        implementation: opts.implementation,
        mission_time,
        endianness: opts.endian,
        frontend,
        assembly_enabled: stage == Stage::Assemble,
        int_width: opts.int_width,
        int_signed: opts.int_signed,
        float_width: opts.float_width,
        prediction_horizon: opts.prediction_horizon,
        signal_mapping: signal_mapping.unwrap_or_default(),
        timeout_egglog: opts.timeout_egglog,
        timeout_sat: opts.timeout_sat,
        ..Config::default()
    };

    let pass_opts = PassOptions {
        enable_rewrite: !opts.disable_rewrite,
        enable_cse: !opts.disable_cse,
        enable_extops: opts.extops,
        enable_eqsat: opts.eqsat,
        enable_nnf: opts.nnf,
        enable_bnf: opts.bnf,
        enable_sat: opts.check_sat,
    };

    Some((config, pass_opts, stage))
}

fn load_input(input_path: &Path) -> Result<Program, ReturnCode> {
    let extension = input_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");
    match extension {
        "pickle" | "json" => frontend::load_program(input_path).map_err(|err| {
            log::error(MODULE, err.to_string());
            err.return_code()
        }),
        "c2po" | "mltl" => {
            log::error(
                MODULE,
                format!(
                    "'{}' is concrete syntax; the surface-language parser is an external tool. \
                     Feed its saved-program output (.pickle/.json) instead",
                    input_path.display()
                ),
            );
            Err(ReturnCode::ParseErr)
        }
        other => {
            log::error(MODULE, format!("Unsupported input format ({})", other));
            Err(ReturnCode::InvalidInput)
        }
    }
}

/// Compile with no assembler linked: the run stops after the passes.
pub fn compile(opts: &Options) -> ReturnCode {
    compile_with(opts, None)
}

/// Compile, handing the final IR to `assembler` when one is linked.
pub fn compile_with(opts: &Options, assembler: Option<&dyn Assemble>) -> ReturnCode {
    log::set_debug(opts.debug);
    log::set_stats(opts.stats);
    log::set_quiet(opts.quiet);

    let Some((config, pass_opts, stage)) = validate_input(opts, assembler.is_some()) else {
        log::error(MODULE, "Input invalid");
        return ReturnCode::InvalidInput;
    };

    let input_path = config.input_path.clone();
    let mut program = match load_input(&input_path) {
        Ok(program) => program,
        Err(code) => return code,
    };

    if stage == Stage::Parse {
        let context = Context::new(config);
        return write_requested(&program, &context, &input_path, &opts.write);
    }

    let workdir_path = config.workdir.clone();
    let output_path = config.output_path.clone();

    let (well_typed, mut context) = typecheck::type_check(&mut program, config);
    if !well_typed {
        log::error(MODULE, "Failed type check");
        return ReturnCode::TypeCheckErr;
    }

    if stage == Stage::TypeCheck {
        return write_requested(&program, &context, &input_path, &opts.write);
    }

    let _workdir = match Workdir::create(&workdir_path, opts.keep) {
        Ok(workdir) => workdir,
        Err(err) => {
            log::error(MODULE, format!("cannot create workdir {}: {}", workdir_path.display(), err));
            return ReturnCode::FileIoErr;
        }
    };

    log::debug(MODULE, 1, "Performing passes");
    passes::run_passes(&mut program, &mut context, &pass_opts);

    let code = write_requested(&program, &context, &input_path, &opts.write);
    if code != ReturnCode::Success || stage == Stage::Passes {
        return code;
    }

    let Some(assembler) = assembler else {
        return ReturnCode::Success;
    };
    let binary = match assembler.assemble(&program, &context) {
        Ok(binary) => binary,
        Err(err) => {
            log::error(MODULE, err.to_string());
            return ReturnCode::AsmErr;
        }
    };
    if let Err(err) = std::fs::write(&output_path, binary) {
        log::error(MODULE, format!("cannot write {}: {}", output_path.display(), err));
        return ReturnCode::FileIoErr;
    }

    ReturnCode::Success
}

fn write_requested(
    program: &Program,
    context: &Context,
    input_path: &Path,
    write: &WriteOptions,
) -> ReturnCode {
    match serialize::write_outputs(program, context, input_path, write) {
        Ok(()) => ReturnCode::Success,
        Err(err) => {
            log::error(MODULE, err.to_string());
            ReturnCode::FileIoErr
        }
    }
}
