//! # Link Driver
//!
//! Runs one transmit cycle across every configured module: builds the next
//! frame, writes non-empty frames to that module's own port and hands them
//! to the frame recorder when capture is enabled.
//!
//! PXX2 frames carry no module address, so each module owns its transport.

use tracing::{debug, warn};

use crate::capture::FrameRecorder;
use crate::error::{Pxx2Error, Result};
use crate::model::ModelSettings;
use crate::pxx2::protocol::ModuleMode;
use crate::pxx2::{CycleInputs, FrameGenerator, ModuleState, Notifier};
use crate::serial::{send_frame, SerialPortIO};

/// Counters kept across cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub cycles: u64,
    pub frames_sent: u64,
    /// Cycles where a module had nothing to send
    pub empty_frames: u64,
    pub send_errors: u64,
}

/// Drives the frame generator against the module ports
pub struct LinkDriver<P: SerialPortIO> {
    generator: FrameGenerator,
    model: ModelSettings,
    /// One port per module, indexed like `model.modules`
    ports: Vec<P>,
    recorder: Option<FrameRecorder>,
    stats: LinkStats,
}

impl<P: SerialPortIO> LinkDriver<P> {
    /// Create a driver with one state entry per module in `model`
    ///
    /// # Errors
    ///
    /// Returns [`Pxx2Error::PortCount`] unless there is exactly one port per
    /// module
    pub fn new(model: ModelSettings, ports: Vec<P>) -> Result<Self> {
        if ports.len() != model.modules.len() {
            return Err(Pxx2Error::PortCount {
                modules: model.modules.len(),
                ports: ports.len(),
            });
        }

        Ok(Self {
            generator: FrameGenerator::new(model.modules.len()),
            model,
            ports,
            recorder: None,
            stats: LinkStats::default(),
        })
    }

    /// Record every sent frame
    pub fn with_recorder(mut self, recorder: FrameRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn model(&self) -> &ModelSettings {
        &self.model
    }

    /// State of one module
    pub fn module(&self, module_id: usize) -> Result<&ModuleState> {
        self.generator.module(module_id)
    }

    /// Mutable state of one module, e.g. to fill in bind candidates
    pub fn module_mut(&mut self, module_id: usize) -> Result<&mut ModuleState> {
        self.generator.module_mut(module_id)
    }

    /// Switch a module to another mode
    ///
    /// # Errors
    ///
    /// Returns [`Pxx2Error::UnknownModule`] for a bad index
    pub fn request_mode(&mut self, module_id: usize, mode: ModuleMode) -> Result<()> {
        self.generator.module_mut(module_id)?.enter_mode(mode);
        Ok(())
    }

    /// Run one cycle for every module
    ///
    /// Transport and capture failures are logged and counted; the cycle
    /// carries on with the next module.
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - Number of frames written this cycle
    ///
    /// # Errors
    ///
    /// Returns error only if frame generation itself fails
    pub async fn run_cycle(
        &mut self,
        tick: u32,
        channel_outputs: &[i16],
        notifier: &mut dyn Notifier,
    ) -> Result<usize> {
        let inputs = CycleInputs { tick, channel_outputs };
        let mut sent = 0;

        for (module_id, port) in self.ports.iter_mut().enumerate() {
            let mode = self.generator.module(module_id)?.mode();
            let frame = self
                .generator
                .build_frame(module_id, &self.model, &inputs, notifier)?;

            if frame.is_empty() {
                self.stats.empty_frames += 1;
                continue;
            }

            if let Err(e) = send_frame(port, &frame).await {
                warn!("Module {}: {}", module_id, e);
                self.stats.send_errors += 1;
                continue;
            }
            self.stats.frames_sent += 1;
            sent += 1;

            if let Some(recorder) = self.recorder.as_mut() {
                if let Err(e) = recorder.record(module_id, mode, &frame) {
                    warn!("Failed to capture frame: {}", e);
                }
            }
        }

        self.stats.cycles += 1;
        debug!("Cycle {} done, {} frames sent", self.stats.cycles, sent);
        Ok(sent)
    }
}
