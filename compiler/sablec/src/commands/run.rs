//! The `run` command: lower an ESTree program and evaluate it.

use serde::Deserialize;

use sable_eval::{ContextBuilder, Evaluator, RunOutcome, Runner, RuntimeError, StrategyKind};
use sable_ir::estree::{lower_program, Node};
use sable_ir::{Chapter, NodeArena, NodeId, SharedArena, SharedInterner};

use super::read_file;

/// Settings for one `sable run`.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub chapter: Chapter,
    pub strategy: StrategyKind,
    pub step_limit: Option<u64>,
    /// `None` disables the limit.
    pub max_depth: Option<usize>,
    pub profile: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            chapter: Chapter::default(),
            strategy: StrategyKind::Strict,
            step_limit: None,
            max_depth: Some(sable_eval::DEFAULT_MAX_CALL_DEPTH),
            profile: false,
        }
    }
}

/// Parse `<program.json> [options]`. Flags taking a number accept both
/// `--flag N` and `--flag=N`.
pub fn parse_run_options(args: &[String]) -> Result<(String, RunOptions), String> {
    let mut options = RunOptions::default();
    let mut path = None;
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
            _ => (arg, None),
        };
        let takes_value = matches!(flag, "--chapter" | "--step-limit" | "--max-depth");
        let value = if takes_value {
            match inline {
                Some(value) => Some(value),
                None => {
                    i += 1;
                    Some(
                        args.get(i)
                            .map(String::as_str)
                            .ok_or_else(|| format!("{flag} needs a value"))?,
                    )
                }
            }
        } else {
            None
        };
        match (flag, value) {
            ("--chapter", Some(value)) => {
                options.chapter = value
                    .parse::<u8>()
                    .ok()
                    .and_then(Chapter::new)
                    .ok_or_else(|| format!("invalid chapter '{value}' (expected 1 to 4)"))?;
            }
            ("--step-limit", Some(value)) => {
                let limit = parse_number::<u64>(flag, value)?;
                options.step_limit = (limit > 0).then_some(limit);
            }
            ("--max-depth", Some(value)) => {
                let depth = parse_number::<usize>(flag, value)?;
                options.max_depth = (depth > 0).then_some(depth);
            }
            ("--lazy", None) => options.strategy = StrategyKind::Lazy,
            ("--strict", None) => options.strategy = StrategyKind::Strict,
            ("--profile", None) => options.profile = true,
            _ if arg.starts_with('-') => return Err(format!("unknown option '{arg}'")),
            _ if path.is_none() => path = Some(arg.to_owned()),
            _ => return Err(format!("unexpected argument '{arg}'")),
        }
        i += 1;
    }
    let path = path.ok_or_else(|| "missing program path".to_owned())?;
    Ok((path, options))
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{flag} expects a non-negative integer, got '{value}'"))
}

/// Parse ESTree JSON text and lower it into a fresh arena.
///
/// Nesting depth is not limited; deeply nested input grows the stack.
pub(super) fn lower_json(text: &str) -> Result<(SharedArena, SharedInterner, NodeId), String> {
    let mut json = serde_json::Deserializer::from_str(text);
    json.disable_recursion_limit();
    let tree = Node::deserialize(serde_stacker::Deserializer::new(&mut json))
        .and_then(|tree| json.end().map(|()| tree))
        .map_err(|e| format!("not an ESTree program: {e}"))?;
    let interner = SharedInterner::default();
    let mut arena = NodeArena::new();
    let program = lower_program(&tree, &mut arena, &interner).map_err(|e| e.to_string())?;
    Ok((SharedArena::new(arena), interner, program))
}

/// Run an ESTree JSON program and print its value.
///
/// Exits with status 1 on unreadable input, lowering errors, runtime
/// errors, and when the step limit stops the run.
pub fn run_file(path: &str, options: &RunOptions) {
    let content = read_file(path);
    let (arena, interner, program) = match lower_json(&content) {
        Ok(lowered) => lowered,
        Err(message) => {
            eprintln!("error: cannot run '{path}': {message}");
            std::process::exit(1);
        }
    };

    let ctx = ContextBuilder::new(arena, interner)
        .chapter(options.chapter)
        .strategy(options.strategy)
        .max_call_depth(options.max_depth)
        .profile(options.profile)
        .build();
    let mut evaluator = Evaluator::new(ctx);
    evaluator.load_program(program);

    let runner = match options.step_limit {
        Some(limit) => Runner::new().with_step_limit(limit),
        None => Runner::new(),
    };
    let outcome = runner.run(&mut evaluator);

    // Counters go to stderr before the result.
    if let Some(counters) = evaluator.context().counters() {
        eprintln!("{}", counters.report());
    }

    match outcome {
        Ok(RunOutcome::Finished(value)) => println!("{value}"),
        Ok(RunOutcome::StepLimitReached { steps }) => {
            eprintln!("error: stopped after {steps} steps (--step-limit)");
            std::process::exit(1);
        }
        Ok(RunOutcome::Paused { steps, .. }) => {
            eprintln!("error: run paused after {steps} steps");
            std::process::exit(1);
        }
        Err(err) => {
            report_runtime_error(path, &err);
            std::process::exit(1);
        }
    }
}

fn report_runtime_error(path: &str, err: &RuntimeError) {
    let severity = if err.is_fatal() { "fatal error" } else { "error" };
    eprintln!("{severity}: {err}");
    if let Some(span) = err.span {
        eprintln!("  --> {path}:{span}");
    }
    if let Some(backtrace) = err.backtrace.as_ref().filter(|bt| !bt.is_empty()) {
        eprintln!("{backtrace}");
    }
}
