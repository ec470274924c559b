//! VST3 process-call glue.
//!
//! Converts the raw structures a VST3 host passes to `IAudioProcessor::process`
//! into a [`PluginStream`] block. Channel slices are collected on the stack,
//! so nothing here allocates.

use std::slice;

use vst3::{ComRef, Steinberg::Vst::*, Steinberg::*};

use portbridge_core::{ChannelBuffers, HostPosition, MidiBuffer, MidiEvent, MAX_HOST_CHANNELS};

use crate::bus::BusTotals;
use crate::stream::PluginStream;

// VST3 event type constants
const K_NOTE_ON_EVENT: u16 = 0;
const K_NOTE_OFF_EVENT: u16 = 1;

// VST3 ProcessContext state flags
const K_PLAYING: u32 = 1 << 1;
const K_PROJECT_TIME_MUSIC_VALID: u32 = 1 << 9;
const K_TEMPO_VALID: u32 = 1 << 10;
const K_TIME_SIG_VALID: u32 = 1 << 13;

/// Helper macro for extracting optional values based on validity flags.
macro_rules! valid_if {
    ($state:expr, $flag:expr, $value:expr) => {
        if $state & $flag != 0 {
            Some($value)
        } else {
            None
        }
    };
}

/// Read host position from a VST3 `ProcessContext`.
///
/// Returns `None` when the host passed no context.
///
/// # Safety
///
/// `ctx_ptr` must be null or point to a valid `ProcessContext` for the
/// duration of the call.
pub unsafe fn position_from_context(ctx_ptr: *const ProcessContext) -> Option<HostPosition> {
    if ctx_ptr.is_null() {
        return None;
    }

    let ctx = &*ctx_ptr;
    let state = ctx.state;

    Some(HostPosition {
        is_playing: state & K_PLAYING != 0,
        tempo: valid_if!(state, K_TEMPO_VALID, ctx.tempo),
        time_sig_numerator: valid_if!(state, K_TIME_SIG_VALID, ctx.timeSigNumerator),
        time_sig_denominator: valid_if!(state, K_TIME_SIG_VALID, ctx.timeSigDenominator),
        sample_position: Some(ctx.projectTimeSamples),
        beat_position: valid_if!(state, K_PROJECT_TIME_MUSIC_VALID, ctx.projectTimeMusic),
    })
}

/// Refill `midi` with the note events of a VST3 event list.
///
/// Unsupported event types are skipped.
///
/// # Safety
///
/// `events` must be null or a valid `IEventList` pointer.
pub unsafe fn midi_from_event_list(events: *mut IEventList, midi: &mut MidiBuffer) {
    midi.clear();

    let Some(event_list) = ComRef::from_raw(events) else {
        return;
    };

    for i in 0..event_list.getEventCount() {
        let mut event: Event = std::mem::zeroed();
        if event_list.getEvent(i, &mut event) != kResultOk {
            continue;
        }
        if let Some(midi_event) = convert_event(&event) {
            midi.push(midi_event);
        }
    }
}

unsafe fn convert_event(event: &Event) -> Option<MidiEvent> {
    let sample_offset = event.sampleOffset.max(0) as u32;

    match event.r#type {
        K_NOTE_ON_EVENT => {
            let note_on = &event.__field0.noteOn;
            Some(MidiEvent::note_on(
                sample_offset,
                note_on.channel as u8,
                note_on.pitch as u8,
                velocity_to_7bit(note_on.velocity),
            ))
        }
        K_NOTE_OFF_EVENT => {
            let note_off = &event.__field0.noteOff;
            Some(MidiEvent::note_off(
                sample_offset,
                note_off.channel as u8,
                note_off.pitch as u8,
                velocity_to_7bit(note_off.velocity),
            ))
        }
        _ => None,
    }
}

/// VST3 velocities are normalized (0.0 - 1.0).
fn velocity_to_7bit(velocity: f32) -> u8 {
    (velocity.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// Visit every channel slot of `buses` in bus order, main first.
///
/// A bus without buffers, or a null channel pointer, is visited as a null
/// pointer so later channels keep their flat index.
unsafe fn for_each_channel(
    buses: *const AudioBusBuffers,
    bus_count: i32,
    mut visit: impl FnMut(*mut f32),
) {
    if bus_count <= 0 || buses.is_null() {
        return;
    }
    for bus in slice::from_raw_parts(buses, bus_count as usize) {
        let num_channels = bus.numChannels.max(0) as usize;
        let channels = bus.__field0.channelBuffers32;
        if channels.is_null() {
            (0..num_channels).for_each(|_| visit(std::ptr::null_mut()));
            continue;
        }
        for &ptr in slice::from_raw_parts(channels, num_channels) {
            visit(ptr);
        }
    }
}

/// Run one VST3 process call through `stream`.
///
/// Channels of every bus are laid out in bus order (main first), matching the
/// bus totals the stream reads. Missing buffers keep their slot as an empty
/// channel, which reads as silence and is never written. Channels beyond
/// [`MAX_HOST_CHANNELS`] are ignored. `midi` is refilled from the input event
/// list.
///
/// # Safety
///
/// `process_data` must be the structure passed to the current
/// `IAudioProcessor::process` call, with 32-bit sample buffers.
pub unsafe fn deliver_process_data<B: BusTotals>(
    stream: &mut PluginStream<B>,
    process_data: &ProcessData,
    midi: &mut MidiBuffer,
) {
    let num_samples = process_data.numSamples.max(0) as usize;

    let empty: &[f32] = &[];
    let mut inputs = [empty; MAX_HOST_CHANNELS];
    let mut num_inputs = 0;
    for_each_channel(process_data.inputs, process_data.numInputs, |ptr| {
        if num_inputs == MAX_HOST_CHANNELS {
            return;
        }
        if !ptr.is_null() {
            inputs[num_inputs] = slice::from_raw_parts(ptr, num_samples);
        }
        num_inputs += 1;
    });

    let mut outputs: [&mut [f32]; MAX_HOST_CHANNELS] =
        std::array::from_fn(|_| <&mut [f32]>::default());
    let mut num_outputs = 0;
    for_each_channel(process_data.outputs, process_data.numOutputs, |ptr| {
        if num_outputs == MAX_HOST_CHANNELS {
            return;
        }
        if !ptr.is_null() {
            outputs[num_outputs] = slice::from_raw_parts_mut(ptr, num_samples);
        }
        num_outputs += 1;
    });

    midi_from_event_list(process_data.inputEvents, midi);
    let position = position_from_context(process_data.processContext);

    let mut buffers = ChannelBuffers::new(
        &inputs[..num_inputs],
        &mut outputs[..num_outputs],
        num_samples,
    );
    stream.deliver_block_with_position(&mut buffers, midi, position.as_ref());
}
