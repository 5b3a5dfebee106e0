//! Run reporting: per-run result directories, the run-info table and TSV
//! model dumps.
//!
//! Filesystem access goes through the [`OutputFs`] capability so tests can
//! substitute a failing or recording implementation. Directory creation
//! failure is deliberately non-fatal; a run whose results cannot be stored
//! still finishes, it just logs a warning.

use crate::error::Result;
use crate::hyper::HyperParams;
use crate::io::render_tsv;
use crate::model::ModelParams;
use crate::train::StatsTriple;
use std::fs;
use std::path::{Path, PathBuf};

/// Minimal filesystem surface the recorder needs.
pub trait OutputFs {
    /// Creates a directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error on failure.
    fn ensure_dir(&self, path: &Path) -> std::io::Result<()>;

    /// Writes a whole file, replacing any existing content.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error on failure.
    fn write_file(&self, path: &Path, contents: &str) -> std::io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl OutputFs for LocalFs {
    fn ensure_dir(&self, path: &Path) -> std::io::Result<()> {
        fs::create_dir_all(path)
    }

    fn write_file(&self, path: &Path, contents: &str) -> std::io::Result<()> {
        fs::write(path, contents)
    }
}

/// Writes one run's artifacts into `<results_root>/<hyper subdir>`:
/// `run_info` (invocation, hyperparameters and the per-sub-step table) and
/// the TSV dumps `W`, `Z`, `B`, `gamma`.
///
/// # Examples
///
/// ```no_run
/// use prototipo::report::RunRecorder;
/// use prototipo::prelude::*;
/// use std::path::Path;
///
/// let hyper = HyperParams::new(20, 3);
/// let mut recorder = RunRecorder::new(Path::new("results"), &hyper);
/// recorder.prepare();
/// ```
#[derive(Debug)]
pub struct RunRecorder<F: OutputFs = LocalFs> {
    fs: F,
    out_dir: PathBuf,
}

impl RunRecorder<LocalFs> {
    /// Recorder over the real filesystem.
    #[must_use]
    pub fn new(results_root: &Path, hyper: &HyperParams) -> Self {
        Self::with_fs(LocalFs, results_root, hyper)
    }
}

impl<F: OutputFs> RunRecorder<F> {
    /// Recorder over an arbitrary [`OutputFs`].
    #[must_use]
    pub fn with_fs(fs: F, results_root: &Path, hyper: &HyperParams) -> Self {
        Self {
            fs,
            out_dir: results_root.join(hyper.subdir_name()),
        }
    }

    /// The run's result directory.
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Creates the result directory. Failure is logged, not propagated; the
    /// subsequent writes will surface the error if it persists.
    pub fn prepare(&mut self) {
        if let Err(e) = self.fs.ensure_dir(&self.out_dir) {
            tracing::warn!(dir = %self.out_dir.display(), error = %e, "could not create results directory");
        }
    }

    /// Writes the `run_info` file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn record_run(
        &self,
        hyper: &HyperParams,
        invocation: &str,
        stats: &[StatsTriple],
    ) -> Result<()> {
        let text = render_run_info(hyper, invocation, stats);
        self.fs.write_file(&self.out_dir.join("run_info"), &text)?;
        Ok(())
    }

    /// Writes the `W`, `Z`, `B` and `gamma` TSV dumps.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if any file cannot be written.
    pub fn dump_model(&self, params: &ModelParams) -> Result<()> {
        self.fs
            .write_file(&self.out_dir.join("W"), &render_tsv(&params.w))?;
        self.fs
            .write_file(&self.out_dir.join("Z"), &render_tsv(&params.z))?;
        self.fs
            .write_file(&self.out_dir.join("B"), &render_tsv(&params.b))?;
        self.fs
            .write_file(&self.out_dir.join("gamma"), &format!("{}\n", params.gamma))?;
        Ok(())
    }
}

/// Renders the run-info text: the invocation, every hyperparameter, and one
/// table row per recorded sub-step.
///
/// Row 0 is the post-initialization measurement; after that rows cycle
/// W, Z, B within each outer round.
#[must_use]
pub fn render_run_info(hyper: &HyperParams, invocation: &str, stats: &[StatsTriple]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Invocation: {invocation}\n\n"));

    out.push_str("Hyperparameters\n");
    out.push_str(&format!("projection_dim: {}\n", hyper.projection_dim));
    out.push_str(&format!("input_dim: {}\n", hyper.input_dim));
    out.push_str(&format!("n_labels: {}\n", hyper.n_labels));
    out.push_str(&format!("n_prototypes: {}\n", hyper.n_prototypes));
    out.push_str(&format!("n_train: {}\n", hyper.n_train));
    out.push_str(&format!("n_test: {}\n", hyper.n_test));
    out.push_str(&format!("gamma: {}\n", hyper.gamma));
    out.push_str(&format!("gamma_numerator: {}\n", hyper.gamma_numerator));
    out.push_str(&format!("lambda_w: {}\n", hyper.lambda_w));
    out.push_str(&format!("lambda_z: {}\n", hyper.lambda_z));
    out.push_str(&format!("lambda_b: {}\n", hyper.lambda_b));
    out.push_str(&format!("batch_size: {}\n", hyper.batch_size));
    out.push_str(&format!("epochs: {}\n", hyper.epochs));
    out.push_str(&format!("iters: {}\n", hyper.iters));
    out.push_str(&format!("seed: {}\n", hyper.seed));
    out.push_str(&format!("learning_rate: {}\n", hyper.learning_rate));
    out.push_str(&format!("normalization: {}\n", hyper.normalization.as_str()));
    out.push_str(&format!(
        "initialization: {}\n",
        hyper.initialization.as_str()
    ));

    out.push_str("\nparam | iter | objective, training accuracy, testing accuracy\n");
    for (i, triple) in stats.iter().enumerate() {
        let (label, iter) = if i == 0 {
            ("init", 0)
        } else {
            let label = match i % 3 {
                1 => "W",
                2 => "Z",
                _ => "B",
            };
            (label, (i - 1) / 3)
        };
        out.push_str(&format!(
            "{label} | {iter} | {:.6}, {:.6}, {:.6}\n",
            triple.objective, triple.train_accuracy, triple.test_accuracy
        ));
    }
    out
}
