//! # Common Assembly Compiler (CAC) Executable
//!
//! The command-line interface of the Common Assembly compiler. It uses the
//! `clap` crate to parse user arguments and orchestrates the
//! [`compiler::Compiler`] to build, run, and test `.ca` source files.

use cac::{CompileError, Compiler, Diagnostic, Diagnostics};
use clap::{Arg, Command};
use std::path::PathBuf;
use std::process;

fn main() {
    let matches = Command::new("cac")
        .version("0.1.0")
        .about("Common Assembly compiler for x86-64 Linux")
        // --- 'build' Subcommand ---
        .subcommand(
            Command::new("build")
                .about("Compile a source file to a binary")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_name("FILE")
                        .help("Common Assembly source file to build"),
                )
                .arg(
                    Arg::new("emit-asm")
                        .long("emit-asm")
                        .action(clap::ArgAction::SetTrue)
                        .help("Print the generated assembly instead of assembling it"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Report diagnostics as JSON on stdout"),
                )
                .arg(
                    Arg::new("verbose")
                        .long("verbose")
                        .action(clap::ArgAction::SetTrue)
                        .help("Show the step-by-step compilation process"),
                ),
        )
        // --- 'run' Subcommand ---
        .subcommand(
            Command::new("run")
                .about("Compile and run a program")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_name("FILE")
                        .help("Common Assembly source file to run"),
                ),
        )
        // --- 'test' Subcommand ---
        .subcommand(
            Command::new("test")
                .about("Compile every .ca file under a directory")
                .arg(
                    Arg::new("path")
                        .value_name("PATH")
                        .help("Directory or specific file to test"),
                ),
        )
        .get_matches();

    let mut compiler = Compiler::new();

    match matches.subcommand() {
        Some(("build", sub_matches)) => {
            let file = sub_matches.get_one::<String>("file").expect("required");
            compiler.source_path = PathBuf::from(file);
            compiler.emit_asm = sub_matches.get_flag("emit-asm");
            compiler.verbose = sub_matches.get_flag("verbose");
            let json = sub_matches.get_flag("json");

            if let Err(error) = compiler.build() {
                report_error(&error, json);
                process::exit(1);
            }
        }
        Some(("run", sub_matches)) => {
            let file = sub_matches.get_one::<String>("file").expect("required");
            compiler.source_path = PathBuf::from(file);

            if let Err(error) = compiler.run() {
                report_error(&error, false);
                process::exit(1);
            }
        }
        Some(("test", sub_matches)) => {
            if let Some(path) = sub_matches.get_one::<String>("path") {
                compiler.source_path = PathBuf::from(path);
            }
            let specific = compiler.source_path.is_file().then(|| compiler.source_path.clone());

            if let Err(error) = compiler.test(specific) {
                report_error(&error, false);
                process::exit(1);
            }
        }
        _ => {
            println!("Common Assembly compiler (cac)");
            println!("Use 'cac --help' for usage information");
        }
    }
}

/// Prints a failure, as a JSON diagnostic list when requested and the
/// error is attributable to the source.
fn report_error(error: &CompileError, json: bool) {
    if json {
        if let Some(diagnostics) = diagnostics_of(error) {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(rendered) => println!("{}", rendered),
                Err(_) => eprintln!("error: {}", error),
            }
            return;
        }
    }
    eprintln!("error: {}", error);
}

fn diagnostics_of(error: &CompileError) -> Option<Diagnostics> {
    match error {
        CompileError::Diagnostics(diagnostics) => Some(diagnostics.clone()),
        CompileError::SyntaxError { location, message } => {
            Some(vec![Diagnostic::new(message.clone(), *location)])
        }
        _ => None,
    }
}
