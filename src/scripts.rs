//! Script transpiler pass.
//!
//! Runs over the finished output tree, after content and assets are in place,
//! so TypeScript can come from `content/`, `theme/static/` or `static/` alike.
//! Each `x.ts` becomes `x.js` in the same directory and `x.ts` is removed.
//! Declaration files (`x.d.ts`) carry no code and are left alone.
//!
//! The transpiler itself is behind [`ScriptTranspiler`]. The build uses
//! [`CommandTranspiler`], which pipes each source through an external program
//! (esbuild by default):
//!
//! ```text
//! public/js/app.ts ──stdin──▶ esbuild --loader=ts ──stdout──▶ public/js/app.js
//! ```

use crate::config::ScriptsConfig;
use crate::paths::with_extension;
use crate::walk::{SourceFile, WalkError, collect_files};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranspileError {
    #[error("No transpiler command configured")]
    EmptyCommand,
    #[error("Transpiler program `{0}` not found on PATH")]
    ProgramNotFound(String),
    #[error("Failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{program}` produced output that is not valid UTF-8")]
    InvalidOutput { program: String },
    /// Failure reported by a [`ScriptTranspiler`] other than
    /// [`CommandTranspiler`], such as an in-process compiler.
    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to transpile {path}: {source}")]
    Transpile {
        path: PathBuf,
        #[source]
        source: TranspileError,
    },
}

/// Turns one script source into its compiled form.
///
/// `path` is where the source lives, for implementations that need it to
/// resolve imports or to report errors.
pub trait ScriptTranspiler {
    fn transpile(&self, source: &str, path: &Path) -> Result<String, TranspileError>;
}

/// Runs an external program: source on stdin, compiled output on stdout.
#[derive(Debug, Clone)]
pub struct CommandTranspiler {
    command: Vec<String>,
}

impl CommandTranspiler {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn from_config(config: &ScriptsConfig) -> Self {
        Self::new(config.command.clone())
    }
}

impl ScriptTranspiler for CommandTranspiler {
    fn transpile(&self, source: &str, path: &Path) -> Result<String, TranspileError> {
        let (name, args) = self
            .command
            .split_first()
            .ok_or(TranspileError::EmptyCommand)?;
        // Resolved per call: a site without scripts never needs the program.
        let program =
            which::which(name).map_err(|_| TranspileError::ProgramNotFound(name.clone()))?;
        log::debug!("{} {} < {}", program.display(), args.join(" "), path.display());

        let spawn_err = |source| TranspileError::Spawn {
            program: name.clone(),
            source,
        };
        let mut child = Command::new(&program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_err(io::Error::other("stdin was not captured")))?;

        // Feed stdin from a second thread so a large output cannot fill the
        // stdout pipe while we are still writing.
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(source.as_bytes()));
            let output = child.wait_with_output();
            (output, writer.join())
        });
        let output = output.map_err(spawn_err)?;

        if !output.status.success() {
            return Err(TranspileError::Failed {
                program: name.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        match written {
            Ok(result) => result.map_err(spawn_err)?,
            Err(_) => return Err(spawn_err(io::Error::other("stdin writer panicked"))),
        }

        String::from_utf8(output.stdout).map_err(|_| TranspileError::InvalidOutput {
            program: name.clone(),
        })
    }
}

/// Whether `file` is a script source the pass should rewrite.
fn is_script_source(file: &SourceFile, config: &ScriptsConfig) -> bool {
    let Some(name) = file.relative.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let declaration_suffix = format!(".d{}", config.source_extension);
    file.has_extension(&config.source_extension) && !name.ends_with(&declaration_suffix)
}

/// Transpile every script source under `output_root` in place.
///
/// The tree is listed before anything is written, so files created by this
/// pass are never visited. Returns the number of scripts transpiled.
pub fn transpile_scripts(
    output_root: &Path,
    transpiler: &dyn ScriptTranspiler,
    config: &ScriptsConfig,
) -> Result<usize, ScriptError> {
    let sources: Vec<SourceFile> = collect_files(output_root)?
        .into_iter()
        .filter(|file| is_script_source(file, config))
        .collect();

    for file in &sources {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ScriptError::Io { path, source }
        };
        let source = fs::read_to_string(&file.path).map_err(io_err(&file.path))?;
        let compiled = transpiler
            .transpile(&source, &file.path)
            .map_err(|source| ScriptError::Transpile {
                path: file.path.clone(),
                source,
            })?;
        let target =
            with_extension(&file.path, &config.compiled_extension).map_err(io_err(&file.path))?;
        fs::write(&target, compiled).map_err(io_err(&target))?;
        fs::remove_file(&file.path).map_err(io_err(&file.path))?;
        log::debug!(
            "transpiled {} -> {}",
            file.relative.display(),
            target.display()
        );
    }

    Ok(sources.len())
}
