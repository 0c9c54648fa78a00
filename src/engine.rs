//! This module defines `Run`, the execution engine. A run owns its tape, borrows an immutable
//! `Machine`, and applies one transition per step until a halting state is entered or a fault
//! stops it.

use crate::analyzer::analyze;
use crate::config::RunConfig;
use crate::tape::Tape;
use crate::trace::{ExecutionTrace, StepEvent, TraceSink};
use crate::types::{
    DtmError, Fault, FaultKind, Halt, Lookup, Machine, Mode, RunStatus, State, Step, Symbol,
};
use std::path::Path;

/// A single simulation of a machine on one input.
///
/// Each run has its own tape and trace, so independent runs of the same machine never share
/// mutable state.
#[derive(Debug, Clone)]
pub struct Run<'m> {
    machine: &'m Machine,
    config: RunConfig,
    state: State,
    tape: Tape,
    initial_tape: Tape,
    step_count: usize,
    trace: ExecutionTrace,
    status: RunStatus,
}

impl<'m> Run<'m> {
    /// Prepares a run of `machine` on `input`.
    ///
    /// The machine is analyzed first, so a hand-built `Machine` gets the same checks as a parsed
    /// one. The input is then placed on a fresh tape according to `config`.
    ///
    /// # Returns
    ///
    /// * `Ok(Run)` positioned on the first input cell in the start state.
    /// * `Err(DtmError::ValidationError)` if the machine is inconsistent.
    /// * `Err(DtmError)` if the configuration is invalid or the input does not fit.
    pub fn new(machine: &'m Machine, input: &str, config: RunConfig) -> Result<Self, DtmError> {
        analyze(machine)?;

        let tape = Tape::load(machine, input, &config)?;

        Ok(Self {
            machine,
            config,
            state: machine.start_state.clone(),
            initial_tape: tape.clone(),
            tape,
            step_count: 0,
            trace: ExecutionTrace::new(),
            status: Self::initial_status(machine),
        })
    }

    fn initial_status(machine: &Machine) -> RunStatus {
        if machine.is_halting(&machine.start_state) {
            RunStatus::Halted(machine.start_state.clone())
        } else {
            RunStatus::Running
        }
    }

    /// Executes a single step without observing it.
    pub fn step(&mut self) -> Step {
        self.step_with(&mut |_: &StepEvent| {})
    }

    /// Executes a single step and reports it to `sink`.
    ///
    /// Once the run has halted or faulted, every further call returns the same outcome and
    /// changes nothing.
    pub fn step_with<S: TraceSink + ?Sized>(&mut self, sink: &mut S) -> Step {
        match &self.status {
            RunStatus::Running => {}
            RunStatus::Halted(state) => return Step::Halt(Halt::Ok(state.clone())),
            RunStatus::Faulted(fault) => return Step::Halt(Halt::Err(fault.clone())),
        }

        if let Some(limit) = self.config.step_limit {
            if self.step_count >= limit {
                return self.fault(FaultKind::StepLimitExceeded(limit));
            }
        }

        let machine = self.machine;
        let read = self.tape.read();
        if !machine.is_tape_symbol(read) {
            return self.fault(FaultKind::InvalidSymbol(read));
        }

        let action = match machine.lookup(&self.state, read) {
            Lookup::Found(action) => action,
            Lookup::NotFound => return self.missing_transition(read),
        };

        if !machine.is_tape_symbol(action.write) {
            return self.fault(FaultKind::InvalidSymbol(action.write));
        }

        if let Err(kind) = self.tape.apply(action.write, action.direction) {
            return self.fault(kind);
        }

        let from = std::mem::replace(&mut self.state, action.next_state.clone());
        let event = StepEvent {
            step: self.step_count,
            state: from,
            read,
            snapshot: self.tape.snapshot(),
        };

        tracing::trace!(
            "step {}: {} reads {:?}, writes {:?}, moves {:?} into {}",
            event.step,
            event.state,
            read,
            action.write,
            action.direction,
            self.state
        );

        self.trace.push(event.snapshot.clone());
        self.step_count += 1;
        sink.record(&event);

        if machine.is_halting(&self.state) {
            return self.halt(self.state.clone());
        }

        Step::Continue
    }

    /// Runs until the machine halts or faults.
    ///
    /// # Returns
    ///
    /// * `Ok(state)` with the halting state that was reached.
    /// * `Err(Fault)` describing why and where the run stopped.
    pub fn run(&mut self) -> Result<State, Fault> {
        self.run_with(&mut |_: &StepEvent| {})
    }

    /// Runs until the machine halts or faults, reporting every step to `sink`.
    pub fn run_with<S: TraceSink + ?Sized>(&mut self, sink: &mut S) -> Result<State, Fault> {
        loop {
            match self.step_with(sink) {
                Step::Continue => continue,
                Step::Halt(Halt::Ok(state)) => return Ok(state),
                Step::Halt(Halt::Err(fault)) => return Err(fault),
            }
        }
    }

    /// Restores the start state and the initial tape, and discards the trace.
    pub fn reset(&mut self) {
        self.state = self.machine.start_state.clone();
        self.tape = self.initial_tape.clone();
        self.step_count = 0;
        self.trace.clear();
        self.status = Self::initial_status(self.machine);
    }

    fn missing_transition(&mut self, read: Symbol) -> Step {
        let machine = self.machine;
        match &machine.mode {
            Mode::Strict => self.fault(FaultKind::UndefinedTransition {
                state: self.state.clone(),
                symbol: read,
            }),
            Mode::Reject(reject) => {
                tracing::debug!(
                    "no transition for {} on {:?}, rejecting into {}",
                    self.state,
                    read,
                    reject
                );
                self.state = reject.clone();
                self.halt(reject.clone())
            }
        }
    }

    fn halt(&mut self, state: State) -> Step {
        tracing::debug!(
            "{} halted in {} after {} steps",
            self.machine.name,
            state,
            self.step_count
        );
        self.status = RunStatus::Halted(state.clone());
        Step::Halt(Halt::Ok(state))
    }

    fn fault(&mut self, kind: FaultKind) -> Step {
        let fault = Fault {
            kind,
            step: self.step_count,
            state: self.state.clone(),
        };

        tracing::warn!("{} faulted: {}", self.machine.name, fault);
        self.status = RunStatus::Faulted(fault.clone());
        Step::Halt(Halt::Err(fault))
    }

    /// Returns `true` if the run halted normally and took more steps than the export threshold.
    pub fn should_export(&self) -> bool {
        matches!(self.status, RunStatus::Halted(_))
            && self.step_count > self.config.export_threshold
    }

    /// Writes the trace to `path` if [`Run::should_export`] allows it.
    ///
    /// Returns whether the file was written.
    pub fn export_trace(&self, path: &Path) -> Result<bool, DtmError> {
        if !self.should_export() {
            tracing::debug!(
                "skipping trace export: {} steps, threshold {}",
                self.step_count,
                self.config.export_threshold
            );
            return Ok(false);
        }

        self.trace.write_to_file(path)?;
        Ok(true)
    }

    /// Returns the current state.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Returns the machine being run.
    pub fn machine(&self) -> &'m Machine {
        self.machine
    }

    /// Returns the configuration the run was created with.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Returns the current tape.
    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Returns the current head position.
    pub fn head(&self) -> usize {
        self.tape.head()
    }

    /// Returns the number of transitions taken so far.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Returns whether the run is still going, halted or faulted.
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Returns `true` until the run halts or faults.
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Returns the snapshots recorded so far.
    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }
}
