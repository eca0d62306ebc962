//! # PXX2 Frame Generator
//!
//! Produces the next outgoing frame for a module, once per cycle.
//!
//! Each call opens a frame, runs the sub-protocol for the module's current
//! mode, advances the module's periodic counter and closes the frame. Most
//! modes fall back to a channels frame whenever they have nothing to say, so
//! the receiver keeps getting control data. The bind wait state and the
//! spectrum lock-out are the only paths that return an empty frame.

use bytes::Bytes;
use tracing::{debug, info, warn};

use super::channels::encode_channel_group;
use super::frame::FrameWriter;
use super::module_state::ModuleState;
use super::notify::{LinkEvent, Notifier};
use super::protocol::*;
use crate::error::{Pxx2Error, Result};
use crate::model::{ModelSettings, ModuleData};

/// Inputs sampled from the rest of the transmitter for one cycle
#[derive(Debug, Clone, Copy)]
pub struct CycleInputs<'a> {
    /// Monotonic 10ms tick
    pub tick: u32,
    /// Mixer outputs, one per logical channel
    pub channel_outputs: &'a [i16],
}

/// Read-only context shared by the per-mode builders
struct Cycle<'a> {
    module_id: usize,
    model: &'a ModelSettings,
    module: &'a ModuleData,
    inputs: &'a CycleInputs<'a>,
}

/// Per-module state table plus the frame buffer
#[derive(Debug, Clone, Default)]
pub struct FrameGenerator {
    modules: Vec<ModuleState>,
    writer: FrameWriter,
}

impl FrameGenerator {
    /// Create a generator for `module_count` modules, all in normal mode
    pub fn new(module_count: usize) -> Self {
        Self {
            modules: vec![ModuleState::new(); module_count],
            writer: FrameWriter::new(),
        }
    }

    /// Number of modules in the table
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// State of one module
    pub fn module(&self, module_id: usize) -> Result<&ModuleState> {
        self.modules
            .get(module_id)
            .ok_or(Pxx2Error::UnknownModule(module_id))
    }

    /// Mutable state of one module, for external mode requests
    pub fn module_mut(&mut self, module_id: usize) -> Result<&mut ModuleState> {
        self.modules
            .get_mut(module_id)
            .ok_or(Pxx2Error::UnknownModule(module_id))
    }

    /// Build the next frame for a module
    ///
    /// # Arguments
    ///
    /// * `module_id` - Index into the module table and `model.modules`
    /// * `model` - Model settings
    /// * `inputs` - Tick and channel outputs for this cycle
    /// * `notifier` - Sink for one-shot events (bind success)
    ///
    /// # Returns
    ///
    /// * `Result<Bytes>` - Complete frame, or empty when nothing is sent
    ///
    /// # Errors
    ///
    /// Returns error if the module index is unknown or the frame overflows
    pub fn build_frame(
        &mut self,
        module_id: usize,
        model: &ModelSettings,
        inputs: &CycleInputs<'_>,
        notifier: &mut dyn Notifier,
    ) -> Result<Bytes> {
        let module = model.module(module_id)?;
        let state = self
            .modules
            .get_mut(module_id)
            .ok_or(Pxx2Error::UnknownModule(module_id))?;
        let cycle = Cycle {
            module_id,
            model,
            module,
            inputs,
        };
        let writer = &mut self.writer;

        writer.open();

        match state.mode() {
            ModuleMode::GetHardwareInfo => setup_hardware_info_frame(writer, state, &cycle)?,
            ModuleMode::ReceiverSettings => setup_receiver_settings_frame(writer, state, &cycle)?,
            ModuleMode::Register => setup_register_frame(writer, state, &cycle)?,
            ModuleMode::Bind => setup_bind_frame(writer, state, &cycle, notifier)?,
            ModuleMode::SpectrumAnalyser => setup_spectrum_frame(writer, state)?,
            ModuleMode::Share => setup_share_frame(writer, state)?,
            ModuleMode::Normal | ModuleMode::RangeCheck => {
                setup_channels_frame(writer, state, &cycle)?
            }
        }

        state.settings.counter.advance();

        writer.close()?;
        Ok(writer.take())
    }
}

/// Number of 8-channel groups needed for a channel count
fn channel_group_count(channels_count: u8) -> usize {
    if channels_count > 16 {
        3
    } else if channels_count > 8 {
        2
    } else {
        1
    }
}

fn channels_flag0(state: &ModuleState, module: &ModuleData) -> u8 {
    let mut flag0 = module.model_id & PXX2_CHANNELS_FLAG0_MODEL_ID_MASK;
    if module.failsafe_configured() && state.settings.counter.is_due() {
        flag0 |= PXX2_CHANNELS_FLAG0_FAILSAFE;
    }
    if state.mode() == ModuleMode::RangeCheck {
        flag0 |= PXX2_CHANNELS_FLAG0_RANGECHECK;
    }
    flag0
}

fn setup_channels_frame(writer: &mut FrameWriter, state: &ModuleState, cycle: &Cycle<'_>) -> Result<()> {
    writer.push_frame_type(PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_CHANNELS)?;

    let flag0 = channels_flag0(state, cycle.module);
    writer.push_byte(flag0)?;
    // flag1 is reserved
    writer.push_byte(0)?;

    let send_failsafe = flag0 & PXX2_CHANNELS_FLAG0_FAILSAFE != 0;
    let first = cycle.module.channels_start as usize;
    for group in 0..channel_group_count(cycle.module.channels_count) {
        encode_channel_group(
            writer,
            cycle.model,
            cycle.module,
            cycle.inputs.channel_outputs,
            send_failsafe,
            first + group * PXX2_CHANNELS_PER_GROUP,
        )?;
    }
    Ok(())
}

fn setup_hardware_info_frame(
    writer: &mut FrameWriter,
    state: &mut ModuleState,
    cycle: &Cycle<'_>,
) -> Result<()> {
    let discovery = state.hardware_info_mut();

    if !(-1..PXX2_MAX_RECEIVERS_PER_MODULE).contains(&discovery.step) {
        info!("Module {}: hardware discovery finished", cycle.module_id);
        state.reset_to_normal();
        return setup_channels_frame(writer, state, cycle);
    }

    if discovery.timeout > 0 {
        discovery.timeout -= 1;
        return setup_channels_frame(writer, state, cycle);
    }

    debug!("Module {}: hardware info query, step {}", cycle.module_id, discovery.step);
    writer.push_frame_type(PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_HW_INFO)?;
    writer.push_byte(discovery.step as u8)?;
    discovery.timeout = HARDWARE_INFO_QUERY_INTERVAL;
    discovery.step += 1;
    Ok(())
}

fn setup_register_frame(
    writer: &mut FrameWriter,
    state: &mut ModuleState,
    cycle: &Cycle<'_>,
) -> Result<()> {
    let register = *state.register_mut();

    writer.push_frame_type(PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_REGISTER)?;

    if register.step == RegisterStep::RxNameSelected {
        writer.push_byte(0x01)?;
        writer.push_bytes(&register.rx_name)?;
        writer.push_bytes(&cycle.model.registration_id_bytes())?;
        writer.push_byte(register.module_index)?;
    } else {
        writer.push_byte(0x00)?;
    }
    Ok(())
}

fn setup_bind_frame(
    writer: &mut FrameWriter,
    state: &mut ModuleState,
    cycle: &Cycle<'_>,
    notifier: &mut dyn Notifier,
) -> Result<()> {
    let bind = state.bind_mut();

    match bind.step {
        BindStep::Wait => {
            if cycle.inputs.tick > bind.wait_timeout {
                bind.step = BindStep::Ok;
                state.reset_to_normal();
                info!("Module {}: bind complete", cycle.module_id);
                notifier.notify(cycle.module_id, LinkEvent::BindSucceeded);
            }
            Ok(())
        }
        BindStep::RxNameSelected => {
            let receiver_id = bind.receiver_id;
            let selected = bind.selected;
            let name = bind.selected_name().copied();
            match name {
                Some(name) => {
                    writer.push_frame_type(PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_BIND)?;
                    writer.push_byte(0x01)?;
                    writer.push_bytes(&name)?;
                    writer.push_byte(receiver_id)?;
                    writer.push_byte(cycle.module.model_id)?;
                    Ok(())
                }
                None => {
                    warn!(
                        "Module {}: bind candidate {} does not exist, leaving bind mode",
                        cycle.module_id, selected
                    );
                    state.reset_to_normal();
                    setup_channels_frame(writer, state, cycle)
                }
            }
        }
        _ => {
            writer.push_frame_type(PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_BIND)?;
            writer.push_byte(0x00)?;
            writer.push_bytes(&cycle.model.registration_id_bytes())
        }
    }
}

fn setup_receiver_settings_frame(
    writer: &mut FrameWriter,
    state: &mut ModuleState,
    cycle: &Cycle<'_>,
) -> Result<()> {
    let settings = *state.receiver_settings_mut();

    if cycle.inputs.tick <= settings.timeout {
        return setup_channels_frame(writer, state, cycle);
    }

    writer.push_frame_type(PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_RX_SETTINGS)?;

    let mut flag0 = settings.receiver_id;
    if settings.access == SettingsAccess::Write {
        flag0 |= PXX2_RX_SETTINGS_FLAG0_WRITE;
    }
    writer.push_byte(flag0)?;

    let mut flag1 = 0;
    if settings.telemetry_disabled {
        flag1 |= PXX2_RX_SETTINGS_FLAG1_TELEMETRY_DISABLED;
    }
    if settings.fast_pwm {
        flag1 |= PXX2_RX_SETTINGS_FLAG1_FASTPWM;
    }
    writer.push_byte(flag1)?;

    let count = (cycle.module.channels_count as usize).min(settings.channel_mapping.len());
    writer.push_bytes(&settings.channel_mapping[..count])?;

    state.receiver_settings_mut().timeout = cycle
        .inputs
        .tick
        .wrapping_add(RECEIVER_SETTINGS_RETRY_TICKS);
    debug!("Module {}: receiver settings sent", cycle.module_id);
    Ok(())
}

fn setup_spectrum_frame(writer: &mut FrameWriter, state: &mut ModuleState) -> Result<()> {
    let counter = &mut state.settings.counter;
    if counter.is_locked() {
        counter.lock();
        return Ok(());
    }
    counter.lock();

    writer.push_frame_type(PXX2_TYPE_C_POWER_METER, PXX2_TYPE_ID_SPECTRUM)?;
    writer.push_byte(0x00)?;
    writer.push_word(SPECTRUM_CENTER_FREQUENCY_HZ)?;
    writer.push_word(SPECTRUM_SPAN_HZ)?;
    writer.push_word(SPECTRUM_STEP_HZ)
}

fn setup_share_frame(writer: &mut FrameWriter, state: &mut ModuleState) -> Result<()> {
    let receiver_id = state.share_mut().receiver_id;
    writer.push_frame_type(PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_SHARE)?;
    writer.push_byte(receiver_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FailsafeChannel, FailsafeMode};
    use crate::pxx2::counter::PeriodicCounter;
    use crate::pxx2::crc::pxx2_crc;
    use crate::pxx2::decoder::{decode_channels, decode_frame};
    use crate::pxx2::notify::MockNotifier;
    use mockall::predicate::eq;

    const CENTERED: [i16; 32] = [0; 32];

    fn model_with(module: ModuleData) -> ModelSettings {
        ModelSettings {
            registration_id: "REGID".to_string(),
            modules: vec![module],
            ..Default::default()
        }
    }

    fn inputs(tick: u32) -> CycleInputs<'static> {
        CycleInputs {
            tick,
            channel_outputs: &CENTERED,
        }
    }

    fn build(generator: &mut FrameGenerator, model: &ModelSettings, tick: u32) -> Bytes {
        let mut notifier = MockNotifier::new();
        generator.build_frame(0, model, &inputs(tick), &mut notifier).unwrap()
    }

    // ==================== Channels ====================

    #[test]
    fn test_normal_frame_layout() {
        let model = model_with(ModuleData {
            model_id: 5,
            channels_count: 8,
            ..Default::default()
        });
        let mut generator = FrameGenerator::new(1);
        let frame = build(&mut generator, &model, 0);

        assert_eq!(frame.len(), 2 + 2 + 2 + 12 + 2);
        assert_eq!(frame[0], 0x7E);
        assert_eq!(frame[1] as usize, frame.len() - 4);
        assert_eq!(&frame[2..4], &[PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_CHANNELS]);
        assert_eq!(frame[4], 5); // flag0 = model id
        assert_eq!(frame[5], 0); // flag1 reserved

        let end = frame.len() - 2;
        let crc = u16::from_be_bytes([frame[end], frame[end + 1]]);
        assert_eq!(crc, pxx2_crc(&frame[2..end]));
    }

    #[test]
    fn test_channel_group_count() {
        for (count, groups) in [(8u8, 1usize), (9, 2), (16, 2), (17, 3), (24, 3)] {
            let model = model_with(ModuleData {
                channels_count: count,
                ..Default::default()
            });
            let mut generator = FrameGenerator::new(1);
            let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
            let payload = decode_channels(&frame.payload).unwrap();
            assert_eq!(payload.channels.len(), groups * 8, "count {}", count);
        }
    }

    #[test]
    fn test_channels_start_offset() {
        let model = model_with(ModuleData {
            channels_start: 4,
            channels_count: 8,
            ..Default::default()
        });
        let mut outputs = [0i16; 16];
        outputs[4] = 1024;
        outputs[3] = -1024;
        let mut generator = FrameGenerator::new(1);
        let mut notifier = MockNotifier::new();
        let cycle = CycleInputs {
            tick: 0,
            channel_outputs: &outputs,
        };
        let frame = generator.build_frame(0, &model, &cycle, &mut notifier).unwrap();
        let payload = decode_channels(&decode_frame(&frame).unwrap().payload).unwrap();
        assert_eq!(payload.channels[0], 1792);
        assert!(payload.channels[1..].iter().all(|&v| v == 1024));
    }

    #[test]
    fn test_failsafe_hold_sixteen_channels() {
        let model = model_with(ModuleData {
            failsafe_mode: FailsafeMode::Hold,
            channels_count: 16,
            ..Default::default()
        });
        let mut generator = FrameGenerator::new(1);
        generator.module_mut(0).unwrap().settings.counter = PeriodicCounter::with_value(0);

        let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
        let payload = decode_channels(&frame.payload).unwrap();
        assert!(payload.is_failsafe());
        assert_eq!(payload.channels, vec![2047; 16]);
        assert_eq!(frame.payload.len(), 2 + 24);
    }

    #[test]
    fn test_failsafe_sent_once_per_window() {
        let model = model_with(ModuleData {
            failsafe_mode: FailsafeMode::Custom,
            ..Default::default()
        });
        let mut generator = FrameGenerator::new(1);
        let mut failsafe_frames = Vec::new();
        for cycle in 0..3003 {
            let frame = decode_frame(&build(&mut generator, &model, cycle)).unwrap();
            if decode_channels(&frame.payload).unwrap().is_failsafe() {
                failsafe_frames.push(cycle);
            }
        }
        assert_eq!(failsafe_frames, vec![1000, 2001, 3002]);
    }

    #[test]
    fn test_no_failsafe_when_not_configured() {
        for mode in [FailsafeMode::NotSet, FailsafeMode::Receiver] {
            let model = model_with(ModuleData {
                failsafe_mode: mode,
                ..Default::default()
            });
            let mut generator = FrameGenerator::new(1);
            generator.module_mut(0).unwrap().settings.counter = PeriodicCounter::with_value(0);
            let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
            assert!(!decode_channels(&frame.payload).unwrap().is_failsafe());
        }
    }

    #[test]
    fn test_custom_failsafe_values() {
        let mut model = model_with(ModuleData {
            failsafe_mode: FailsafeMode::Custom,
            channels_count: 8,
            ..Default::default()
        });
        model.failsafe_channels = vec![FailsafeChannel::NoPulse, FailsafeChannel::Value(1024)];
        let mut generator = FrameGenerator::new(1);
        generator.module_mut(0).unwrap().settings.counter = PeriodicCounter::with_value(0);

        let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
        let payload = decode_channels(&frame.payload).unwrap();
        assert_eq!(payload.channels[0], 0);
        assert_eq!(payload.channels[1], 1792);
        assert_eq!(payload.channels[2], 1024);
    }

    #[test]
    fn test_range_check_flag() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        generator.module_mut(0).unwrap().enter_mode(ModuleMode::RangeCheck);
        let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
        let payload = decode_channels(&frame.payload).unwrap();
        assert!(payload.is_range_check());
        assert_eq!(generator.module(0).unwrap().mode(), ModuleMode::RangeCheck);
    }

    #[test]
    fn test_counter_advances_every_frame() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        for _ in 0..1001 {
            build(&mut generator, &model, 0);
        }
        assert_eq!(generator.module(0).unwrap().settings.counter.value(), 1000);
    }

    #[test]
    fn test_unknown_module() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        let mut notifier = MockNotifier::new();
        let result = generator.build_frame(1, &model, &inputs(0), &mut notifier);
        assert!(matches!(result, Err(Pxx2Error::UnknownModule(1))));
        assert!(generator.module_mut(3).is_err());
    }

    // ==================== Hardware info ====================

    #[test]
    fn test_hardware_info_sequence() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        generator.module_mut(0).unwrap().enter_mode(ModuleMode::GetHardwareInfo);

        let mut queries = Vec::new();
        for cycle in 0..64 {
            let frame = decode_frame(&build(&mut generator, &model, cycle)).unwrap();
            if frame.type_id == PXX2_TYPE_ID_HW_INFO {
                assert_eq!(frame.type_c, PXX2_TYPE_C_MODULE);
                queries.push((cycle, frame.payload[0]));
            } else {
                assert!(frame.is_channels());
            }
        }
        assert_eq!(queries, vec![(0, 0xFF), (21, 0), (42, 1), (63, 2)]);
        assert_eq!(generator.module(0).unwrap().mode(), ModuleMode::GetHardwareInfo);

        let frame = decode_frame(&build(&mut generator, &model, 64)).unwrap();
        assert!(frame.is_channels());
        assert_eq!(generator.module(0).unwrap().mode(), ModuleMode::Normal);
    }

    #[test]
    fn test_hardware_info_out_of_range_step_resets() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        let module = generator.module_mut(0).unwrap();
        module.enter_mode(ModuleMode::GetHardwareInfo);
        module.hardware_info_mut().step = -5;

        let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
        assert!(frame.is_channels());
        assert_eq!(generator.module(0).unwrap().mode(), ModuleMode::Normal);
    }

    // ==================== Register ====================

    #[test]
    fn test_register_listening() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        generator.module_mut(0).unwrap().enter_mode(ModuleMode::Register);

        let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
        assert_eq!((frame.type_c, frame.type_id), (PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_REGISTER));
        assert_eq!(frame.payload, vec![0x00]);
    }

    #[test]
    fn test_register_selected_receiver() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        let module = generator.module_mut(0).unwrap();
        module.enter_mode(ModuleMode::Register);
        let register = module.register_mut();
        register.step = RegisterStep::RxNameSelected;
        register.rx_name = rx_name("RX8R");
        register.module_index = 1;

        let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
        let mut expected = vec![0x01];
        expected.extend_from_slice(b"RX8R\0\0\0\0");
        expected.extend_from_slice(b"REGID\0\0\0");
        expected.push(1);
        assert_eq!(frame.payload, expected);
    }

    // ==================== Bind ====================

    #[test]
    fn test_bind_broadcast() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        generator.module_mut(0).unwrap().enter_mode(ModuleMode::Bind);

        let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
        assert_eq!((frame.type_c, frame.type_id), (PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_BIND));
        assert_eq!(frame.payload, b"\x00REGID\0\0\0".to_vec());
    }

    #[test]
    fn test_bind_selected_receiver() {
        let model = model_with(ModuleData {
            model_id: 7,
            ..Default::default()
        });
        let mut generator = FrameGenerator::new(1);
        let module = generator.module_mut(0).unwrap();
        module.enter_mode(ModuleMode::Bind);
        let bind = module.bind_mut();
        bind.step = BindStep::RxNameSelected;
        bind.candidates = vec![rx_name("OTHER"), rx_name("RX01")];
        bind.selected = 1;
        bind.receiver_id = 3;

        let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
        assert_eq!(
            frame.payload,
            vec![0x01, b'R', b'X', b'0', b'1', 0, 0, 0, 0, 0x03, 0x07]
        );
    }

    #[test]
    fn test_bind_missing_candidate_returns_to_normal() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        let module = generator.module_mut(0).unwrap();
        module.enter_mode(ModuleMode::Bind);
        let bind = module.bind_mut();
        bind.step = BindStep::RxNameSelected;
        bind.selected = 2;

        let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
        assert!(frame.is_channels());
        assert_eq!(generator.module(0).unwrap().mode(), ModuleMode::Normal);
    }

    #[test]
    fn test_bind_wait_is_silent_until_timeout() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        let module = generator.module_mut(0).unwrap();
        module.enter_mode(ModuleMode::Bind);
        let bind = module.bind_mut();
        bind.step = BindStep::Wait;
        bind.wait_timeout = 100;

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .with(eq(0usize), eq(LinkEvent::BindSucceeded))
            .times(1)
            .return_const(());

        for tick in [50, 100] {
            let frame = generator
                .build_frame(0, &model, &inputs(tick), &mut notifier)
                .unwrap();
            assert!(frame.is_empty());
            assert_eq!(generator.module(0).unwrap().mode(), ModuleMode::Bind);
        }

        let frame = generator
            .build_frame(0, &model, &inputs(101), &mut notifier)
            .unwrap();
        assert!(frame.is_empty());

        let module = generator.module(0).unwrap();
        assert_eq!(module.mode(), ModuleMode::Normal);
        assert_eq!(module.bind().unwrap().step, BindStep::Ok);

        // Back to channels on the next cycle
        let frame = generator
            .build_frame(0, &model, &inputs(102), &mut notifier)
            .unwrap();
        assert!(decode_frame(&frame).unwrap().is_channels());
    }

    // ==================== Receiver settings ====================

    #[test]
    fn test_receiver_settings_before_timeout_matches_channels() {
        let model = model_with(ModuleData {
            model_id: 3,
            failsafe_mode: FailsafeMode::Hold,
            ..Default::default()
        });

        let mut settings_generator = FrameGenerator::new(1);
        let module = settings_generator.module_mut(0).unwrap();
        module.enter_mode(ModuleMode::ReceiverSettings);
        module.receiver_settings_mut().timeout = 500;

        let mut normal_generator = FrameGenerator::new(1);

        for tick in [100, 499, 500] {
            let settings_frame = build(&mut settings_generator, &model, tick);
            let normal_frame = build(&mut normal_generator, &model, tick);
            assert_eq!(settings_frame, normal_frame);
        }
    }

    #[test]
    fn test_receiver_settings_frame() {
        let model = model_with(ModuleData {
            channels_count: 8,
            ..Default::default()
        });
        let mut generator = FrameGenerator::new(1);
        let module = generator.module_mut(0).unwrap();
        module.enter_mode(ModuleMode::ReceiverSettings);
        let settings = module.receiver_settings_mut();
        settings.receiver_id = 2;
        settings.access = SettingsAccess::Write;
        settings.telemetry_disabled = true;
        settings.fast_pwm = true;
        settings.channel_mapping[0] = 0x10;

        let frame = decode_frame(&build(&mut generator, &model, 1)).unwrap();
        assert_eq!((frame.type_c, frame.type_id), (PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_RX_SETTINGS));
        assert_eq!(frame.payload[0], 0x42);
        assert_eq!(frame.payload[1], 0x90);
        assert_eq!(&frame.payload[2..], &[0x10, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(
            generator.module(0).unwrap().receiver_settings().unwrap().timeout,
            201
        );
    }

    #[test]
    fn test_receiver_settings_retry_after_two_seconds() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        generator.module_mut(0).unwrap().enter_mode(ModuleMode::ReceiverSettings);

        let first = decode_frame(&build(&mut generator, &model, 10)).unwrap();
        assert_eq!(first.type_id, PXX2_TYPE_ID_RX_SETTINGS);
        assert_eq!(first.payload[0], 0x00); // read, receiver 0
        assert_eq!(first.payload.len(), 2 + 16);

        assert!(decode_frame(&build(&mut generator, &model, 210)).unwrap().is_channels());
        let retry = decode_frame(&build(&mut generator, &model, 211)).unwrap();
        assert_eq!(retry.type_id, PXX2_TYPE_ID_RX_SETTINGS);
    }

    // ==================== Spectrum / share ====================

    #[test]
    fn test_spectrum_frame() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        generator.module_mut(0).unwrap().enter_mode(ModuleMode::SpectrumAnalyser);

        let frame = decode_frame(&build(&mut generator, &model, 0)).unwrap();
        assert_eq!((frame.type_c, frame.type_id), (PXX2_TYPE_C_POWER_METER, PXX2_TYPE_ID_SPECTRUM));

        let mut expected = vec![0x00];
        expected.extend_from_slice(&2_440_000_000u32.to_le_bytes());
        expected.extend_from_slice(&40_000_000u32.to_le_bytes());
        expected.extend_from_slice(&100_000u32.to_le_bytes());
        assert_eq!(frame.payload, expected);
        assert_eq!(generator.module(0).unwrap().settings.counter.value(), 1001);
    }

    #[test]
    fn test_spectrum_locked_after_request() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        generator.module_mut(0).unwrap().enter_mode(ModuleMode::SpectrumAnalyser);

        assert!(!build(&mut generator, &model, 0).is_empty());
        for tick in 1..50 {
            assert!(build(&mut generator, &model, tick).is_empty());
            assert!(generator.module(0).unwrap().settings.counter.is_locked());
        }
    }

    #[test]
    fn test_spectrum_rearms_after_leaving_mode() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        generator.module_mut(0).unwrap().enter_mode(ModuleMode::SpectrumAnalyser);
        assert!(!build(&mut generator, &model, 0).is_empty());

        generator.module_mut(0).unwrap().enter_mode(ModuleMode::Normal);
        build(&mut generator, &model, 1);

        generator.module_mut(0).unwrap().enter_mode(ModuleMode::SpectrumAnalyser);
        assert!(!build(&mut generator, &model, 2).is_empty());
    }

    #[test]
    fn test_share_frame() {
        let model = model_with(ModuleData::default());
        let mut generator = FrameGenerator::new(1);
        let module = generator.module_mut(0).unwrap();
        module.enter_mode(ModuleMode::Share);
        module.share_mut().receiver_id = 2;

        let frame = build(&mut generator, &model, 0);
        assert_eq!(frame.len(), 7);
        let frame = decode_frame(&frame).unwrap();
        assert_eq!((frame.type_c, frame.type_id), (PXX2_TYPE_C_MODULE, PXX2_TYPE_ID_SHARE));
        assert_eq!(frame.payload, vec![2]);
    }

    #[test]
    fn test_every_mode_produces_valid_checksum() {
        let model = model_with(ModuleData {
            model_id: 9,
            channels_count: 24,
            failsafe_mode: FailsafeMode::Custom,
            ..Default::default()
        });
        for mode in [
            ModuleMode::Normal,
            ModuleMode::RangeCheck,
            ModuleMode::GetHardwareInfo,
            ModuleMode::Register,
            ModuleMode::Bind,
            ModuleMode::ReceiverSettings,
            ModuleMode::SpectrumAnalyser,
            ModuleMode::Share,
        ] {
            let mut generator = FrameGenerator::new(1);
            generator.module_mut(0).unwrap().enter_mode(mode);
            let frame = build(&mut generator, &model, 1);
            assert!(decode_frame(&frame).is_ok(), "{:?}", mode);
        }
    }

    #[test]
    fn test_modules_are_independent() {
        let model = ModelSettings {
            modules: vec![ModuleData::default(), ModuleData::default()],
            ..Default::default()
        };
        let mut generator = FrameGenerator::new(2);
        generator.module_mut(1).unwrap().enter_mode(ModuleMode::Share);

        let mut notifier = MockNotifier::new();
        let first = generator.build_frame(0, &model, &inputs(0), &mut notifier).unwrap();
        let second = generator.build_frame(1, &model, &inputs(0), &mut notifier).unwrap();
        assert!(decode_frame(&first).unwrap().is_channels());
        assert_eq!(decode_frame(&second).unwrap().type_id, PXX2_TYPE_ID_SHARE);
    }
}
