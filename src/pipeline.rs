//! Multi-stage streaming pipeline and the fence that joins it.
//!
//! A pipeline chains ordered stages through anonymous OS pipes: stage *i*
//! reads the output of stage *i−1*, the first stage is fed from a source
//! file by a dedicated copy unit, and the last stage writes to the
//! destination file. Each pipe has exactly one writer and one reader, so
//! backpressure and EOF propagation come from the pipe itself and no
//! cross-stage locking is needed.
//!
//! Every unit of execution (the source copy unit and one unit per stage)
//! is registered with a [`Fence`] before results are awaited. The fence
//! joins all of them unconditionally; a failed stage never leaves another
//! unit unjoined, since its neighbors terminate on pipe EOF or broken-pipe
//! errors and are then joined like any other unit.

use std::fmt;
use std::fs::File;
use std::io::{self, pipe, PipeReader, PipeWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use log::{debug, warn};

use crate::csv;
use crate::record::Provenance;
use crate::stats;

/// In-process stage body: read everything from the input, write the
/// transformed bytes to the output, return when done.
pub type StageFn = Box<dyn FnOnce(&mut dyn Read, &mut dyn Write) -> io::Result<()> + Send>;

enum StageKind {
    Exec { program: PathBuf, args: Vec<String> },
    Func(StageFn),
    PassThrough,
}

/// One named processing stage.
pub struct Stage {
    name: String,
    kind: StageKind,
}

impl Stage {
    /// An external-command stage; its stdin and stdout are wired to the
    /// adjacent connectors.
    pub fn command<P: Into<PathBuf>>(
        name: impl Into<String>,
        program: P,
        args: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Exec {
                program: program.into(),
                args: args.into_iter().collect(),
            },
        }
    }

    /// An in-process stage running `f` on this pipeline's byte streams.
    pub fn function(
        name: impl Into<String>,
        f: impl FnOnce(&mut dyn Read, &mut dyn Write) -> io::Result<()> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::Func(Box::new(f)),
        }
    }

    /// An identity stage copying its input to its output unchanged.
    pub fn pass_through(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StageKind::PassThrough,
        }
    }

    /// An external-command stage that degrades to [`Stage::pass_through`]
    /// when the program is not an executable file (missing optional tool).
    ///
    /// The pipeline topology is unchanged either way; only this stage's
    /// behavior switches to copy-through.
    pub fn command_or_pass_through<P: Into<PathBuf>>(
        name: impl Into<String>,
        program: P,
        args: impl IntoIterator<Item = String>,
    ) -> Self {
        let name = name.into();
        let program = program.into();
        if is_executable(&program) {
            Self::command(name, program, args)
        } else {
            warn!(
                "'{}' is not executable, stage '{}' degrades to pass-through",
                program.display(),
                name
            );
            Self::pass_through(name)
        }
    }

    /// The stage's name, as reported by the fence.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            StageKind::Exec { program, .. } => format!("exec {}", program.display()),
            StageKind::Func(_) => "function".to_string(),
            StageKind::PassThrough => "pass-through".to_string(),
        };
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Failure of a single execution unit.
#[derive(Debug)]
pub enum StageError {
    /// IO error moving or transforming bytes.
    Io(io::Error),

    /// The external program could not be started.
    Spawn {
        /// The program that failed to start.
        program: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The external program ran but exited with a non-success status.
    Exited {
        /// The exit status.
        status: ExitStatus,
    },

    /// The unit's thread panicked.
    Panicked,
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Io(e) => write!(f, "IO error: {}", e),
            StageError::Spawn { program, source } => {
                write!(f, "failed to spawn '{}': {}", program.display(), source)
            }
            StageError::Exited { status } => write!(f, "exited with {}", status),
            StageError::Panicked => write!(f, "unit panicked"),
        }
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StageError::Io(e) => Some(e),
            StageError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for StageError {
    fn from(e: io::Error) -> Self {
        StageError::Io(e)
    }
}

/// Terminal state of one registered unit.
#[derive(Debug)]
pub struct UnitOutcome {
    /// The unit's name.
    pub name: String,
    /// How it terminated.
    pub result: Result<(), StageError>,
}

/// The joined outcome of every unit registered with a fence.
#[derive(Debug)]
pub struct JoinReport {
    outcomes: Vec<UnitOutcome>,
}

impl JoinReport {
    /// Terminal outcomes, in registration order.
    pub fn outcomes(&self) -> &[UnitOutcome] {
        &self.outcomes
    }

    /// True only if every registered unit terminated successfully.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// The first failing unit in registration order, if any.
    pub fn first_failure(&self) -> Option<&UnitOutcome> {
        self.outcomes.iter().find(|o| o.result.is_err())
    }
}

/// A join barrier over the execution units of one or more pipeline
/// invocations.
///
/// The registry only grows; the only way to shrink it is [`Fence::wait`],
/// which joins every unit. Partial joins are impossible by construction.
#[derive(Default)]
pub struct Fence {
    units: Vec<(String, JoinHandle<Result<(), StageError>>)>,
}

impl Fence {
    /// Create an empty fence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-spawned unit.
    pub fn add(&mut self, name: impl Into<String>, handle: JoinHandle<Result<(), StageError>>) {
        self.units.push((name.into(), handle));
    }

    /// Spawn `f` on its own thread and register it.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        f: impl FnOnce() -> Result<(), StageError> + Send + 'static,
    ) {
        let name = name.into();
        debug!("registering unit '{}'", name);
        let handle = std::thread::spawn(f);
        self.add(name, handle);
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no units are registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Join every registered unit and report each terminal outcome.
    ///
    /// Waits for all units even when one fails early; downstream and
    /// upstream neighbors of a failed stage terminate via pipe EOF or
    /// broken-pipe errors and are joined like any other unit.
    pub fn wait(self) -> JoinReport {
        let mut outcomes = Vec::with_capacity(self.units.len());
        for (name, handle) in self.units {
            let result = match handle.join() {
                Ok(result) => result,
                Err(_) => Err(StageError::Panicked),
            };
            debug!(
                "unit '{}' terminated: {}",
                name,
                match &result {
                    Ok(()) => "ok".to_string(),
                    Err(e) => e.to_string(),
                }
            );
            outcomes.push(UnitOutcome { name, result });
        }
        JoinReport { outcomes }
    }
}

/// Errors from a pipeline invocation.
#[derive(Debug)]
pub enum PipelineError {
    /// Wiring failed before any unit started; nothing ran.
    Io(io::Error),

    /// At least one unit failed; every unit was still joined.
    StageFailed {
        /// Name of the first failing unit in registration order.
        stage: String,
        /// Terminal outcomes of every unit.
        report: JoinReport,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Io(e) => write!(f, "pipeline wiring failed: {}", e),
            PipelineError::StageFailed { stage, report } => {
                let detail = report
                    .outcomes()
                    .iter()
                    .find(|o| o.name == *stage)
                    .and_then(|o| o.result.as_ref().err())
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                write!(f, "stage '{}' failed: {}", stage, detail)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<io::Error> for PipelineError {
    fn from(e: io::Error) -> Self {
        PipelineError::Io(e)
    }
}

enum StageOutput {
    File(File),
    Pipe(PipeWriter),
}

impl StageOutput {
    fn into_stdio(self) -> Stdio {
        match self {
            StageOutput::File(f) => Stdio::from(f),
            StageOutput::Pipe(w) => Stdio::from(w),
        }
    }
}

impl Write for StageOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StageOutput::File(f) => f.write(buf),
            StageOutput::Pipe(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StageOutput::File(f) => f.flush(),
            StageOutput::Pipe(w) => w.flush(),
        }
    }
}

/// An ordered chain of stages. Order is fixed at construction.
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Create a pipeline from ordered stages.
    ///
    /// # Panics
    ///
    /// Panics if `stages` is empty.
    pub fn new(stages: Vec<Stage>) -> Self {
        assert!(!stages.is_empty(), "pipeline needs at least one stage");
        Self { stages }
    }

    /// Wire this pipeline from `src` to `dst` and register every unit with
    /// `fence`, leaving the join to the caller.
    ///
    /// All files and connectors are created before any unit starts; a
    /// wiring error here means nothing ran and nothing needs joining.
    pub fn spawn(self, fence: &mut Fence, src: &Path, dst: &Path) -> io::Result<()> {
        let source = File::open(src)?;
        let dest = File::create(dst)?;
        let count = self.stages.len();

        // Build every connector up front: feed → stage 0 → … → dest.
        let (first_read, feed_write) = pipe()?;
        let mut inputs: Vec<PipeReader> = Vec::with_capacity(count);
        let mut outputs: Vec<StageOutput> = Vec::with_capacity(count);
        inputs.push(first_read);
        for _ in 1..count {
            let (r, w) = pipe()?;
            outputs.push(StageOutput::Pipe(w));
            inputs.push(r);
        }
        outputs.push(StageOutput::File(dest));

        // Everything is constructed; now start the units.
        fence.register("source", move || {
            let mut source = source;
            let mut feed = feed_write;
            io::copy(&mut source, &mut feed)?;
            Ok(())
        });
        for ((stage, input), output) in self.stages.into_iter().zip(inputs).zip(outputs) {
            let name = stage.name.clone();
            debug!("starting stage '{}'", name);
            fence.register(name, move || run_stage(stage.kind, input, output));
        }
        Ok(())
    }

    /// Run the pipeline to completion with its own fence.
    ///
    /// Returns the join report on success. On failure the error carries
    /// the first failing unit and the full report; the destination must be
    /// treated as invalid.
    pub fn run(self, src: &Path, dst: &Path) -> Result<JoinReport, PipelineError> {
        let mut fence = Fence::new();
        self.spawn(&mut fence, src, dst)?;
        let report = fence.wait();
        match report.first_failure() {
            None => Ok(report),
            Some(failure) => {
                let stage = failure.name.clone();
                Err(PipelineError::StageFailed { stage, report })
            }
        }
    }
}

fn run_stage(kind: StageKind, input: PipeReader, output: StageOutput) -> Result<(), StageError> {
    match kind {
        StageKind::PassThrough => {
            let mut input = input;
            let mut output = output;
            io::copy(&mut input, &mut output)?;
            Ok(())
        }
        StageKind::Func(f) => {
            let mut input = input;
            let mut output = output;
            f(&mut input, &mut output)?;
            output.flush()?;
            Ok(())
        }
        StageKind::Exec { program, args } => {
            let mut child = Command::new(&program)
                .args(&args)
                .stdin(Stdio::from(input))
                .stdout(output.into_stdio())
                .spawn()
                .map_err(|source| StageError::Spawn { program, source })?;
            let status = child.wait()?;
            if status.success() {
                Ok(())
            } else {
                Err(StageError::Exited { status })
            }
        }
    }
}

/// The standard aggregation stage: parse a raw dataset from the input,
/// keep records of `keep` provenance, and write the statistics table.
pub fn aggregate_stage(keep: Option<Provenance>) -> Stage {
    Stage::function("aggregate", move |input, output| {
        let ingestion = csv::read_records(input, keep).map_err(csv_to_io)?;
        for issue in &ingestion.rejected {
            warn!("skipping bad row: {}", issue);
        }
        let groups = stats::aggregate(&ingestion.records)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        csv::write_stats(output, &groups)?;
        Ok(())
    })
}

fn csv_to_io(e: csv::CsvError) -> io::Error {
    match e {
        csv::CsvError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    }
}
