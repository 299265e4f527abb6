//! # Compiler Module
//!
//! This module is the orchestrator of the Common Assembly compiler. It
//! aggregates the front-end phases (lexer, parser) and the error types, and
//! defines the [`Compiler`] struct that manages the build, run, and test
//! lifecycles of a `.ca` source file: compile to assembly, hand the result
//! to the system assembler (`as`), and link with `ld` (or `gcc` as a
//! fallback).

pub mod error;
pub mod lexer;
pub mod parser;

pub use lexer::tokenize;
pub use parser::parse;

use crate::debug::{self, PerfTimer};
use error::CompileError;
use std::path::{Path, PathBuf};
use std::process::Command;
use target_lexicon::{Architecture, OperatingSystem, HOST};

/// Manages the compilation, assembly, linking and execution of a Common
/// Assembly program.
pub struct Compiler {
    /// The path to the source file (or directory, for `test`).
    pub source_path: PathBuf,
    /// The directory where build artifacts (assembly, object, binary) land.
    pub build_path: PathBuf,
    /// Print the generated assembly to stdout instead of assembling it.
    pub emit_asm: bool,
    /// Print step-by-step progress during the build.
    pub verbose: bool,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            source_path: PathBuf::from("."),
            build_path: PathBuf::from("./build"),
            emit_asm: false,
            verbose: false,
        }
    }

    /// Compiles the source file to a binary (or to stdout with `emit_asm`).
    pub fn build(&self) -> Result<(), CompileError> {
        if !self.source_path.is_file() || !is_ca_file(&self.source_path) {
            return Err(CompileError::NoSourceFile {
                path: self.source_path.display().to_string(),
            });
        }
        self.build_single_file()
    }

    /// The full pipeline for one source file:
    /// read -> lex -> parse -> generate -> assemble -> link.
    fn build_single_file(&self) -> Result<(), CompileError> {
        self.log_verbose(&format!("Processing: {}", self.source_path.display()));

        let timer = PerfTimer::new("compile to assembly");
        let source = std::fs::read_to_string(&self.source_path)?;
        let assembly = crate::compile_to_assembly(&source)?;
        timer.finish();

        if self.emit_asm {
            println!("{}", assembly);
            return Ok(());
        }

        require_supported_host()?;

        std::fs::create_dir_all(&self.build_path)?;
        let assembly_path = self.build_path.join("out.s");
        std::fs::write(&assembly_path, &assembly)?;
        self.log_verbose(&format!(
            "Generated assembly: {} lines",
            assembly.lines().count()
        ));

        self.assemble_and_link(&assembly_path)?;

        println!("{} compiled successfully", self.source_path.display());
        Ok(())
    }

    /// Compiles and then executes the program, propagating its exit status.
    pub fn run(&self) -> Result<(), CompileError> {
        self.build()?;
        self.execute_binary()
    }

    /// Compiles every `.ca` file under the source path (or one specific
    /// file), reporting per-file results.
    pub fn test(&self, specific_file: Option<PathBuf>) -> Result<(), CompileError> {
        let files_to_test = match specific_file {
            Some(file) => vec![file],
            None => find_ca_files(&self.source_path)?,
        };

        println!("Testing {} files", files_to_test.len());

        let mut all_passed = true;
        for file in files_to_test {
            print!("Testing {}... ", file.display());
            match test_file(&file) {
                Ok(()) => println!("✓ PASSED"),
                Err(error) => {
                    println!("✗ FAILED");
                    eprintln!("  Error: {}", error);
                    all_passed = false;
                }
            }
        }

        if all_passed {
            println!("All tests passed!");
            Ok(())
        } else {
            Err(CompileError::TestFailed)
        }
    }

    /// Invokes the GNU assembler on the generated file, then links it.
    fn assemble_and_link(&self, assembly_path: &Path) -> Result<(), CompileError> {
        let object_path = self.build_path.join("out.o");
        let output_path = self.build_path.join("out");

        self.log_verbose("Assembling...");
        let assemble_status = Command::new("as")
            .arg("--64")
            .arg(assembly_path)
            .arg("-o")
            .arg(&object_path)
            .status()
            .map_err(CompileError::ExecutionError)?;
        if !assemble_status.success() {
            return Err(CompileError::ExecutionFailed(assemble_status));
        }

        self.log_verbose("Linking...");
        match self.link_binary("ld", &object_path, &output_path) {
            Ok(()) => {}
            // ld may be missing on hosts that only ship a gcc frontend.
            Err(error) => self
                .link_binary("gcc", &object_path, &output_path)
                .map_err(|_| error)?,
        }

        self.log_verbose(&format!("Binary generated: {}", output_path.display()));
        make_executable(&output_path)?;
        Ok(())
    }

    fn link_binary(
        &self,
        linker: &str,
        object_path: &Path,
        output_path: &Path,
    ) -> Result<(), CompileError> {
        let mut command = Command::new(linker);
        command.arg(object_path).arg("-o").arg(output_path);
        if linker == "gcc" {
            // Raw assembly objects have their own _start; keep the C
            // runtime's out of the link.
            command.arg("-nostartfiles");
        }

        let status = command.status().map_err(CompileError::ExecutionError)?;
        if status.success() {
            Ok(())
        } else {
            Err(CompileError::ExecutionFailed(status))
        }
    }

    fn execute_binary(&self) -> Result<(), CompileError> {
        let binary_path = self.build_path.join("out");
        if !binary_path.exists() {
            return Err(CompileError::BinaryNotFound);
        }

        let status = Command::new(&binary_path)
            .status()
            .map_err(CompileError::ExecutionError)?;
        if status.success() {
            Ok(())
        } else {
            Err(CompileError::ExecutionFailed(status))
        }
    }

    fn log_verbose(&self, message: &str) {
        if self.verbose {
            println!("{}", message);
        }
        debug::log_compiler(message);
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiles one file front-to-back without assembling, for `test`.
fn test_file(file_path: &Path) -> Result<(), CompileError> {
    let source = std::fs::read_to_string(file_path)?;
    crate::compile_to_assembly(&source)?;
    Ok(())
}

/// The emitted assembly is x86-64 Linux; refuse to assemble elsewhere.
fn require_supported_host() -> Result<(), CompileError> {
    if HOST.architecture == Architecture::X86_64
        && HOST.operating_system == OperatingSystem::Linux
    {
        return Ok(());
    }
    Err(CompileError::UnsupportedHost {
        host: HOST.to_string(),
    })
}

fn find_ca_files(directory: &Path) -> Result<Vec<PathBuf>, CompileError> {
    let mut files = Vec::new();

    if directory.is_dir() {
        for entry in std::fs::read_dir(directory)?.flatten() {
            let path = entry.path();
            if path.is_file() && is_ca_file(&path) {
                files.push(path);
            }
        }
        files.sort();
    } else if directory.is_file() && is_ca_file(directory) {
        files.push(directory.to_path_buf());
    }

    if files.is_empty() {
        Err(CompileError::NoSourceFile {
            path: directory.display().to_string(),
        })
    } else {
        Ok(files)
    }
}

fn is_ca_file(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == "ca")
}

fn make_executable(path: &Path) -> Result<(), CompileError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mut permissions = metadata.permissions();
            permissions.set_mode(0o755);
            std::fs::set_permissions(path, permissions)?;
        }
    }
    Ok(())
}
