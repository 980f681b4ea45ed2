//! Sable CLI
//!
//! Runs programs handed over as ESTree JSON under the Sable evaluator.

mod commands;

use std::sync::Once;

use commands::{parse_run_options, run_file};

static TRACING_INIT: Once = Once::new();

/// Install a subscriber when `RUST_LOG` is set, e.g.
/// `RUST_LOG=sable_eval=debug` or `RUST_LOG=sable_eval=trace`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "run" => {
            let (path, options) = match parse_run_options(&args[2..]) {
                Ok(parsed) => parsed,
                Err(message) => {
                    eprintln!("error: {message}");
                    eprintln!();
                    print_run_usage();
                    std::process::exit(1);
                }
            };
            tracing::debug!(path = %path, ?options, "run");
            run_file(&path, &options);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("Sable {}", env!("CARGO_PKG_VERSION"));
            println!("Strict and lazy evaluation for the Sable teaching language");
        }
        _ => {
            // A bare .json path runs with default options.
            if std::path::Path::new(command)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            {
                run_file(command, &commands::RunOptions::default());
            } else {
                eprintln!("Unknown command: {command}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }
}

fn print_run_usage() {
    eprintln!("Usage: sable run <program.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --chapter <n>       Language chapter, 1 to 4 (default: 1)");
    eprintln!("  --lazy              Lazy evaluation (default: strict)");
    eprintln!("  --step-limit <n>    Stop after n suspension points");
    eprintln!("  --max-depth <n>     Nested call limit, 0 for none (default: 100000)");
    eprintln!("  --profile           Print evaluation counters to stderr");
}

fn print_usage() {
    println!("Sable (strict and lazy evaluation for a chaptered teaching language)");
    println!();
    println!("Usage: sable <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <program.json>   Evaluate an ESTree program");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Run options:");
    println!("  --chapter <n>       Language chapter, 1 to 4 (default: 1)");
    println!("  --lazy              Lazy evaluation (default: strict)");
    println!("  --step-limit <n>    Stop after n suspension points");
    println!("  --max-depth <n>     Nested call limit, 0 for none (default: 100000)");
    println!("  --profile           Print evaluation counters to stderr");
    println!();
    println!("Examples:");
    println!("  sable run fib.json");
    println!("  sable run streams.json --chapter 2 --lazy");
    println!("  sable run loop.json --step-limit 100000 --profile");
    println!("  RUST_LOG=sable_eval=debug sable run fib.json");
}
