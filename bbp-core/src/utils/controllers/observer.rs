//! Per-computation sample hooks.
//!
//! Every PID computation emits a [`Sample`] to the controller's observer.
//! The control law never depends on what the observer does with it.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

/// One PID computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Error fed into the control law.
    pub error: f32,
    /// Clamped action returned to the caller.
    pub action: f32,
    /// Measured position along the controller's axis.
    pub position: f32,
    /// Integral accumulator after this computation.
    pub integral: f32,
}

/// Receives a [`Sample`] after each computation.
pub trait SampleObserver {
    fn on_sample(
        &mut self,
        sample: &Sample,
    );
}

/// Observer that discards every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SampleObserver for NoopObserver {
    #[inline]
    fn on_sample(
        &mut self,
        _sample: &Sample,
    ) {
    }
}

impl<O: SampleObserver + ?Sized> SampleObserver for &mut O {
    fn on_sample(
        &mut self,
        sample: &Sample,
    ) {
        (**self).on_sample(sample)
    }
}

/// Keeps every sample in memory, e.g. for plotting after a run.
#[derive(Debug, Clone, Default)]
pub struct SampleRecorder {
    samples: Vec<Sample>,
}

impl SampleRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

impl SampleObserver for SampleRecorder {
    fn on_sample(
        &mut self,
        sample: &Sample,
    ) {
        self.samples.push(*sample);
    }
}
