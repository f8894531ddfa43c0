/*
 * RecoContext
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

//! Control loop for iterative latent-variable models such as Gibbs samplers or EM procedures.
//!
//! The loop knows nothing about the model it trains. A model implements [`LatentModel`] and the
//! loop decides when each of its steps runs:
//!
//! ```text
//! for iteration in 1..=max_iterations
//!     infer, update hyper-parameters
//!     if iteration > burn_in and iteration % sample_lag == 0
//!         readout, estimate
//!         evaluate                          (configured checkpoints only)
//!         stop if converged
//! ```

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{DataError, Result};
use crate::evaluation::Measures;

/// Settings of a training run. A value of this type is owned by exactly one loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub num_factors: usize,
    pub max_iterations: usize,
    /// Number of initial iterations whose samples are discarded. Required, must be positive.
    pub burn_in: Option<usize>,
    /// Interval between readouts after the burn-in. Required, must be positive.
    pub sample_lag: Option<usize>,
    /// Interval between progress messages.
    pub log_interval: usize,
    /// Iterations at which the model is evaluated.
    pub checkpoints: Vec<usize>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    /// If set, every checkpoint record of a run is written to this file as a line of JSON.
    pub results_path: Option<PathBuf>,
}

impl TrainingConfig {

    pub fn new(num_factors: usize, max_iterations: usize) -> Self {
        TrainingConfig { num_factors, max_iterations, ..TrainingConfig::default() }
    }

    pub fn with_burn_in(mut self, burn_in: usize) -> Self {
        self.burn_in = Some(burn_in);
        self
    }

    pub fn with_sample_lag(mut self, sample_lag: usize) -> Self {
        self.sample_lag = Some(sample_lag);
        self
    }

    pub fn with_log_interval(mut self, log_interval: usize) -> Self {
        self.log_interval = log_interval;
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: Vec<usize>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = Some(beta);
        self
    }

    pub fn with_results_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.results_path = Some(path.into());
        self
    }

    /// Initial hyper-parameter alpha, `1 / num_factors` unless configured.
    pub fn initial_alpha(&self) -> f64 {
        self.alpha.unwrap_or(1.0 / self.num_factors as f64)
    }

    /// Initial hyper-parameter beta, `1 / num_factors` unless configured.
    pub fn initial_beta(&self) -> f64 {
        self.beta.unwrap_or(1.0 / self.num_factors as f64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_factors == 0 {
            return Err(DataError::Config(String::from("the number of factors must be positive")));
        }
        match self.burn_in {
            Some(burn_in) if burn_in > 0 => {}
            _ => return Err(DataError::Config(String::from("burn-in must be set and positive"))),
        }
        match self.sample_lag {
            Some(sample_lag) if sample_lag > 0 => {}
            _ => return Err(DataError::Config(String::from("sample lag must be set and positive"))),
        }
        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            num_factors: 10,
            max_iterations: 30,
            burn_in: None,
            sample_lag: None,
            log_interval: 10,
            checkpoints: Vec::new(),
            alpha: None,
            beta: None,
            results_path: None,
        }
    }
}

/// The steps a concrete model contributes to the training loop. Only `infer` and `evaluate` are
/// mandatory; the other steps default to doing nothing.
pub trait LatentModel {

    /// Name used in log messages and checkpoint records.
    fn name(&self) -> &str;

    /// One inference sweep over the training data, e.g. an E-step or a Gibbs sweep.
    fn infer(&mut self, iteration: usize) -> Result<()>;

    /// Updates the hyper-parameters, e.g. an M-step.
    fn update_hyperparameters(&mut self, _iteration: usize) -> Result<()> {
        Ok(())
    }

    /// Adds the current state to the accumulated posterior statistics.
    fn readout(&mut self) {}

    /// Recomputes the point estimates from the accumulated statistics.
    fn estimate(&mut self) {}

    /// Rating prediction or ranking measures of the current estimates.
    fn evaluate(&mut self) -> Result<Measures>;

    /// Early stopping criterion, consulted after every readout.
    fn is_converged(&mut self, _iteration: usize) -> Result<bool> {
        Ok(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopState {
    NotStarted,
    BurnIn,
    Sampling,
    /// Stopped early by the model's convergence test.
    Converged,
    /// Ran through all iterations.
    Exhausted,
    /// A model step returned an error.
    Failed,
}

/// Measures of the model at one checkpoint iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointRecord {
    pub model: String,
    pub iteration: usize,
    pub measures: Measures,
    pub num_factors: usize,
    pub burn_in: usize,
    pub sample_lag: usize,
    pub max_iterations: usize,
}

/// What a finished run reports back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingOutcome {
    pub state: LoopState,
    pub iterations: usize,
    pub readouts: Vec<usize>,
    pub checkpoints: Vec<CheckpointRecord>,
}

#[derive(Debug)]
pub struct IterativeTrainingLoop {
    config: TrainingConfig,
    burn_in: usize,
    sample_lag: usize,
    state: LoopState,
}

impl IterativeTrainingLoop {

    /// Fails if the configuration lacks a positive burn-in or sample lag, so a broken setup is
    /// reported before any iteration runs.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;

        let burn_in = config.burn_in.unwrap_or_default();
        let sample_lag = config.sample_lag.unwrap_or_default();

        Ok(IterativeTrainingLoop { config, burn_in, sample_lag, state: LoopState::NotStarted })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Trains `model`. A loop runs once; its terminal state cannot be left again. If a model
    /// step fails the loop ends in [`LoopState::Failed`] and the error is returned.
    ///
    /// A configured results file is recreated, so it only ever holds the records of this run.
    pub fn run<M: LatentModel>(&mut self, model: &mut M) -> Result<TrainingOutcome> {

        if self.state != LoopState::NotStarted {
            return Err(DataError::Config(format!(
                "training loop has already run and is {:?}", self.state)));
        }

        match self.iterate(model) {
            Ok(outcome) => Ok(outcome),
            Err(failure) => {
                self.state = LoopState::Failed;
                Err(failure)
            }
        }
    }

    fn iterate<M: LatentModel>(&mut self, model: &mut M) -> Result<TrainingOutcome> {

        if let Some(ref path) = self.config.results_path {
            File::create(path)?;
        }

        let mut readouts = Vec::new();
        let mut checkpoints = Vec::new();
        let mut iterations = 0;

        info!(
            model = model.name(),
            factors = self.config.num_factors,
            burn_in = self.burn_in,
            sample_lag = self.sample_lag,
            max_iterations = self.config.max_iterations,
            "starting training"
        );

        for iteration in 1..=self.config.max_iterations {
            iterations = iteration;
            self.state = if iteration > self.burn_in { LoopState::Sampling } else { LoopState::BurnIn };

            model.infer(iteration)?;
            model.update_hyperparameters(iteration)?;

            if self.state == LoopState::Sampling && iteration % self.sample_lag == 0 {
                model.readout();
                model.estimate();
                readouts.push(iteration);

                if self.config.checkpoints.contains(&iteration) {
                    let record = self.checkpoint(model, iteration)?;
                    checkpoints.push(record);
                }

                if model.is_converged(iteration)? {
                    self.state = LoopState::Converged;
                    debug!(model = model.name(), iteration, "converged");
                    break;
                }
            }

            if self.reports_progress_at(iteration) {
                debug!(
                    "{} runs at iter {}/{}",
                    model.name(),
                    iteration,
                    self.config.max_iterations
                );
            }
        }

        if self.state != LoopState::Converged {
            self.state = LoopState::Exhausted;
        }

        Ok(TrainingOutcome { state: self.state, iterations, readouts, checkpoints })
    }

    fn reports_progress_at(&self, iteration: usize) -> bool {
        self.config.log_interval > 0 && iteration % self.config.log_interval == 0
    }

    fn checkpoint<M: LatentModel>(&self, model: &mut M, iteration: usize)
        -> Result<CheckpointRecord> {

        let record = CheckpointRecord {
            model: model.name().to_owned(),
            iteration,
            measures: model.evaluate()?,
            num_factors: self.config.num_factors,
            burn_in: self.burn_in,
            sample_lag: self.sample_lag,
            max_iterations: self.config.max_iterations,
        };

        info!(model = %record.model, iteration, measures = %record.measures, "checkpoint");

        if let Some(ref path) = self.config.results_path {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{}", serde_json::to_string(&record)?)?;
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {

    use std::fs;

    use super::*;

    /// Records which steps ran in which iteration.
    #[derive(Default)]
    struct RecordingModel {
        inferred: Vec<usize>,
        updated: Vec<usize>,
        readouts: usize,
        estimates: usize,
        evaluations: usize,
        converge_at: Option<usize>,
        fail_at: Option<usize>,
    }

    impl LatentModel for RecordingModel {

        fn name(&self) -> &str {
            "recording"
        }

        fn infer(&mut self, iteration: usize) -> Result<()> {
            if self.fail_at == Some(iteration) {
                return Err(DataError::Model(format!("sweep {} diverged", iteration)));
            }
            self.inferred.push(iteration);
            Ok(())
        }

        fn update_hyperparameters(&mut self, iteration: usize) -> Result<()> {
            self.updated.push(iteration);
            Ok(())
        }

        fn readout(&mut self) {
            self.readouts += 1;
        }

        fn estimate(&mut self) {
            self.estimates += 1;
        }

        fn evaluate(&mut self) -> Result<Measures> {
            self.evaluations += 1;
            let mut measures = Measures::new();
            measures.insert("evaluations", self.evaluations as f64);
            Ok(measures)
        }

        fn is_converged(&mut self, iteration: usize) -> Result<bool> {
            Ok(self.converge_at.map_or(false, |at| iteration >= at))
        }
    }

    fn config() -> TrainingConfig {
        TrainingConfig::new(10, 10)
            .with_burn_in(5)
            .with_sample_lag(2)
            .with_checkpoints(vec![8, 10])
    }

    #[test]
    fn readouts_and_checkpoints() {
        let mut model = RecordingModel::default();
        let mut training = IterativeTrainingLoop::new(config()).unwrap();

        assert_eq!(training.state(), LoopState::NotStarted);

        let outcome = training.run(&mut model).unwrap();

        assert_eq!(outcome.readouts, vec![6, 8, 10]);
        let checkpoint_iterations: Vec<usize> =
            outcome.checkpoints.iter().map(|record| record.iteration).collect();
        assert_eq!(checkpoint_iterations, vec![8, 10]);

        assert_eq!(outcome.state, LoopState::Exhausted);
        assert_eq!(outcome.iterations, 10);
        assert_eq!(training.state(), LoopState::Exhausted);

        assert_eq!(model.inferred, (1..=10).collect::<Vec<usize>>());
        assert_eq!(model.updated.len(), 10);
        assert_eq!(model.readouts, 3);
        assert_eq!(model.estimates, 3);
        assert_eq!(model.evaluations, 2);
    }

    #[test]
    fn early_convergence() {
        let mut model = RecordingModel { converge_at: Some(8), ..RecordingModel::default() };
        let mut training = IterativeTrainingLoop::new(config()).unwrap();

        let outcome = training.run(&mut model).unwrap();

        assert_eq!(outcome.state, LoopState::Converged);
        assert_eq!(outcome.iterations, 8);
        assert_eq!(outcome.readouts, vec![6, 8]);
        assert_eq!(outcome.checkpoints.len(), 1);
        assert_eq!(model.inferred.len(), 8);
    }

    #[test]
    fn loop_runs_once() {
        let mut model = RecordingModel::default();
        let mut training = IterativeTrainingLoop::new(config()).unwrap();

        training.run(&mut model).unwrap();
        assert!(training.run(&mut model).is_err());
        assert_eq!(model.inferred.len(), 10);
    }

    #[test]
    fn failing_step_ends_the_loop() {
        let mut model = RecordingModel { fail_at: Some(7), ..RecordingModel::default() };
        let mut training = IterativeTrainingLoop::new(config()).unwrap();

        match training.run(&mut model) {
            Err(DataError::Model(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }

        assert_eq!(training.state(), LoopState::Failed);
        assert_eq!(model.inferred.len(), 6);
        assert!(training.run(&mut model).is_err());
        assert_eq!(model.inferred.len(), 6);
    }

    #[test]
    fn progress_every_log_interval() {
        let training =
            IterativeTrainingLoop::new(config().with_log_interval(3)).unwrap();
        let reported: Vec<usize> =
            (1..=10).filter(|iteration| training.reports_progress_at(*iteration)).collect();
        assert_eq!(reported, vec![3, 6, 9]);

        let silent = IterativeTrainingLoop::new(config().with_log_interval(0)).unwrap();
        assert!((1..=10).all(|iteration| !silent.reports_progress_at(iteration)));
    }

    #[test]
    fn invalid_configurations_fail_before_training() {
        let missing_burn_in = TrainingConfig::new(10, 10).with_sample_lag(2);
        assert!(IterativeTrainingLoop::new(missing_burn_in).is_err());

        let zero_lag = TrainingConfig::new(10, 10).with_burn_in(5).with_sample_lag(0);
        match IterativeTrainingLoop::new(zero_lag) {
            Err(DataError::Config(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }

        let no_factors = TrainingConfig::new(0, 10).with_burn_in(1).with_sample_lag(1);
        assert!(IterativeTrainingLoop::new(no_factors).is_err());
    }

    #[test]
    fn hyperparameter_defaults() {
        let config = TrainingConfig::new(4, 10);
        assert_eq!(config.initial_alpha(), 0.25);
        assert_eq!(config.initial_beta(), 0.25);

        let config = config.with_alpha(50.0 / 4.0).with_beta(0.01);
        assert_eq!(config.initial_alpha(), 12.5);
        assert_eq!(config.initial_beta(), 0.01);
    }

    #[test]
    fn config_from_json() {
        let config: TrainingConfig = serde_json::from_str(
            r#"{"num_factors": 20, "burn_in": 100, "sample_lag": 10, "checkpoints": [200]}"#
        ).unwrap();

        assert_eq!(config.num_factors, 20);
        assert_eq!(config.max_iterations, 30);
        assert_eq!(config.burn_in, Some(100));
        assert_eq!(config.checkpoints, vec![200]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn checkpoints_are_appended_to_results_file() {
        let directory = tempfile::tempdir().unwrap();
        let results = directory.path().join("results.jsonl");

        let mut model = RecordingModel::default();
        let mut training =
            IterativeTrainingLoop::new(config().with_results_path(&results)).unwrap();
        training.run(&mut model).unwrap();

        let written = fs::read_to_string(&results).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["iteration"], 8);
        assert_eq!(first["model"], "recording");
        assert_eq!(first["measures"]["evaluations"], 1.0);
    }

    #[test]
    fn results_file_holds_the_latest_run_only() {
        let directory = tempfile::tempdir().unwrap();
        let results = directory.path().join("results.jsonl");
        fs::write(&results, "stale\n").unwrap();

        for _ in 0..2 {
            let mut model = RecordingModel::default();
            let mut training =
                IterativeTrainingLoop::new(config().with_results_path(&results)).unwrap();
            training.run(&mut model).unwrap();
        }

        let written = fs::read_to_string(&results).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(!written.contains("stale"));
    }
}
