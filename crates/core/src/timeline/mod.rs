use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    script::{LightEvent, LightScript, VibrationEvent, VibrationScript},
    waveform::{self, Waveform, DEFAULT_DUTY_CYCLE},
};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f64) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }
}

/// Scaling supplied by the thermal monitor at render time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalScaling {
    pub intensity_scale: f64,
    pub duty_scale: f64,
}

impl Default for ThermalScaling {
    fn default() -> Self {
        Self {
            intensity_scale: 1.0,
            duty_scale: 1.0,
        }
    }
}

/// Event fields a cursor needs, shared by both event kinds.
pub trait TimedEvent {
    fn timestamp(&self) -> f64;
    fn duration(&self) -> f64;
    fn intensity(&self) -> f64;
    fn waveform(&self) -> Waveform;
    fn frequency(&self) -> Option<f64>;
}

impl TimedEvent for LightEvent {
    fn timestamp(&self) -> f64 {
        LightEvent::timestamp(self)
    }
    fn duration(&self) -> f64 {
        LightEvent::duration(self)
    }
    fn intensity(&self) -> f64 {
        LightEvent::intensity(self)
    }
    fn waveform(&self) -> Waveform {
        LightEvent::waveform(self)
    }
    fn frequency(&self) -> Option<f64> {
        LightEvent::frequency(self)
    }
}

impl TimedEvent for VibrationEvent {
    fn timestamp(&self) -> f64 {
        VibrationEvent::timestamp(self)
    }
    fn duration(&self) -> f64 {
        VibrationEvent::duration(self)
    }
    fn intensity(&self) -> f64 {
        VibrationEvent::intensity(self)
    }
    fn waveform(&self) -> Waveform {
        VibrationEvent::waveform(self)
    }
    fn frequency(&self) -> Option<f64> {
        VibrationEvent::frequency(self)
    }
}

/// Read-only cursor over an ordered event list.
#[derive(Debug, Clone, Copy)]
pub struct ScriptCursor<'a, E> {
    events: &'a [E],
    target_frequency: f64,
    duty_cycle: f64,
}

impl<'a> ScriptCursor<'a, LightEvent> {
    pub fn light(script: &'a LightScript) -> Self {
        Self::new(script.events(), script.target_frequency())
    }
}

impl<'a> ScriptCursor<'a, VibrationEvent> {
    pub fn vibration(script: &'a VibrationScript) -> Self {
        Self::new(script.events(), script.target_frequency())
    }
}

impl<'a, E: TimedEvent> ScriptCursor<'a, E> {
    pub fn new(events: &'a [E], target_frequency: f64) -> Self {
        Self {
            events,
            target_frequency,
            duty_cycle: DEFAULT_DUTY_CYCLE,
        }
    }

    /// Square-wave duty cycle before thermal scaling, e.g. from
    /// [`crate::waveform::LightSourceCapability::duty_cycle_for`].
    pub fn with_duty_cycle(mut self, duty_cycle: f64) -> Self {
        self.duty_cycle = duty_cycle;
        self
    }

    /// Event covering `elapsed`, if any. Later events win on overlap.
    pub fn active_event(&self, elapsed: f64) -> Option<&'a E> {
        let index = match self.events.binary_search_by(|event| {
            event
                .timestamp()
                .partial_cmp(&elapsed)
                .unwrap_or(Ordering::Equal)
        }) {
            Ok(mut index) => {
                while index + 1 < self.events.len()
                    && self.events[index + 1].timestamp() <= elapsed
                {
                    index += 1;
                }
                index
            }
            Err(0) => return None,
            Err(index) => index - 1,
        };

        let event = &self.events[index];
        (elapsed < event.timestamp() + event.duration()).then_some(event)
    }

    /// Live intensity at `elapsed` seconds after session start.
    pub fn intensity_at(&self, elapsed: f64, thermal: ThermalScaling) -> f64 {
        let Some(event) = self.active_event(elapsed) else {
            return 0.0;
        };
        let frequency = event.frequency().unwrap_or(self.target_frequency);
        let value = waveform::intensity(
            event.waveform(),
            elapsed - event.timestamp(),
            frequency,
            event.intensity(),
            self.duty_cycle * thermal.duty_scale,
        );
        waveform::clamp_unit(value * thermal.intensity_scale)
    }

    /// Intensity at the clock's current time.
    pub fn sample(&self, clock: &PlaybackClock, thermal: ThermalScaling) -> f64 {
        self.intensity_at(clock.time_seconds, thermal)
    }
}
