pub mod journey;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    analysis::{tempo::fold_into_range, BeatDetector, TempoEstimator},
    audio::{AudioTrack, PcmBuffer},
    config::EngineConfig,
    mapping::{FrequencyMapper, FrequencyMapping, ABSOLUTE_MAX_FREQUENCY, ABSOLUTE_MIN_FREQUENCY},
    mode::{EntrainmentMode, FrequencyPolicy, ModeProfile},
    script::{
        LightEvent, LightScript, ScriptHeader, ScriptRendering, VibrationEvent, VibrationScript,
    },
    waveform::{LightSourceCapability, Waveform},
    Result,
};

use journey::{journey, longest_phase, slices, JourneyConfig, Phase, SynchronizedRandomTable};

/// Lowest accepted user vibration preference.
pub const MIN_VIBRATION_PREFERENCE: f64 = 0.1;
/// Highest accepted user vibration preference.
pub const MAX_VIBRATION_PREFERENCE: f64 = 1.0;
/// Weaker vibrations are not reliably felt, so scaled intensities never drop
/// below this.
pub const MIN_PERCEPTIBLE_VIBRATION: f64 = 0.15;

/// Per-session inputs that do not come from the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionParameters {
    pub light_source: LightSourceCapability,
    /// User vibration preference, clamped to `[0.1, 1.0]`.
    pub vibration_intensity: f64,
    /// Caller-supplied creation stamp (Unix milliseconds).
    pub created_at_ms: u64,
}

impl Default for SessionParameters {
    fn default() -> Self {
        Self {
            light_source: LightSourceCapability::default(),
            vibration_intensity: MAX_VIBRATION_PREFERENCE,
            created_at_ms: 0,
        }
    }
}

impl SessionParameters {
    fn vibration_preference(&self) -> f64 {
        if self.vibration_intensity.is_finite() {
            self.vibration_intensity
                .clamp(MIN_VIBRATION_PREFERENCE, MAX_VIBRATION_PREFERENCE)
        } else {
            MAX_VIBRATION_PREFERENCE
        }
    }

    fn scale_vibration(&self, intensity: f64) -> f64 {
        (intensity * self.vibration_preference()).max(MIN_PERCEPTIBLE_VIBRATION)
    }
}

/// One planned pulse before it becomes a channel-specific event.
#[derive(Debug, Clone, Copy)]
struct Pulse {
    timestamp: f64,
    duration: f64,
    frequency: f64,
    ramping: bool,
}

/// Turns an analysed track and a mode into light and vibration scripts. Light
/// generation clamps and never fails; vibration generation validates.
#[derive(Debug, Clone)]
pub struct EntrainmentEngine {
    detector: BeatDetector,
    mapper: FrequencyMapper,
    journey: JourneyConfig,
    random: SynchronizedRandomTable,
}

impl Default for EntrainmentEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl EntrainmentEngine {
    pub fn new(config: &EngineConfig) -> Self {
        let journey = config.journey.sanitized();
        let random = SynchronizedRandomTable::new(
            journey.random_seed,
            journey.random_interval,
            longest_phase(),
        );
        Self {
            detector: BeatDetector::new(config.detector),
            mapper: FrequencyMapper::new(config.mapping),
            journey,
            random,
        }
    }

    pub fn detector(&self) -> &BeatDetector {
        &self.detector
    }

    pub fn mapper(&self) -> &FrequencyMapper {
        &self.mapper
    }

    pub fn random_table(&self) -> &SynchronizedRandomTable {
        &self.random
    }

    /// Detects beats in a decoded buffer and packages the result as a track.
    /// A cancelled detection produces a track without beats, which the
    /// generators turn into a uniform pulse train.
    pub async fn analyze_pcm(
        &self,
        id: impl Into<String>,
        buffer: PcmBuffer,
        cancel: CancellationToken,
    ) -> AudioTrack {
        let duration = buffer.duration_seconds();
        let beats = self.detector.detect_async(buffer, cancel).await;
        let bpm = TempoEstimator::new().estimate(&beats);
        AudioTrack::new(id, duration, bpm, beats)
    }

    /// Target frequency and multiplier for `mode` at the track's tempo.
    pub fn resolve_frequency(
        &self,
        bpm: f64,
        mode: EntrainmentMode,
        max_frequency: f64,
    ) -> FrequencyMapping {
        let profile = mode.profile();
        match profile.frequency_policy {
            FrequencyPolicy::Fixed => FrequencyMapping {
                multiplier: 1,
                frequency: profile.default_frequency,
            },
            FrequencyPolicy::MappedFromTempo => {
                let mapping = self.mapper.map(bpm, profile.band, max_frequency);
                tracing::debug!(
                    mode = %mode,
                    bpm,
                    multiplier = mapping.multiplier,
                    frequency = mapping.frequency,
                    "resolved entrainment frequency"
                );
                mapping
            }
        }
    }

    /// Builds the light script. Never fails.
    pub fn generate_light_script(
        &self,
        track: &AudioTrack,
        mode: EntrainmentMode,
        params: &SessionParameters,
    ) -> LightScript {
        if let Some(script) = self.fixed_light_script(mode, params) {
            return script;
        }

        let profile = mode.profile();
        let ceiling = params.light_source.max_frequency;
        let mapping = self.resolve_frequency(track.bpm, mode, ceiling);
        let target = light_frequency(mapping.frequency, ceiling, profile.default_frequency);
        let header = ScriptHeader {
            track_id: Some(track.id.clone()),
            mode,
            target_frequency: target,
            multiplier: f64::from(mapping.multiplier),
            created_at_ms: params.created_at_ms,
        };

        if profile.light_rendering == ScriptRendering::AudioReactive {
            let span = LightEvent::new(
                0.0,
                profile.light.intensity,
                track.safe_duration(),
                profile.light.waveform,
            )
            .with_frequency(target);
            return LightScript::new(header, ScriptRendering::AudioReactive, vec![span]);
        }

        let events = plan_pulses(track, profile, target, profile.light.waveform, |frequency| {
            light_frequency(frequency, ceiling, target)
        })
        .into_iter()
        .map(|pulse| {
            let event = LightEvent::new(
                pulse.timestamp,
                profile.light.intensity,
                pulse.duration,
                profile.light.waveform,
            );
            if pulse.ramping {
                event.with_frequency(pulse.frequency)
            } else {
                event
            }
        })
        .collect();

        LightScript::new(header, ScriptRendering::Timeline, events)
    }

    /// Builds the vibration script, failing if any computed frequency or the
    /// multiplier is non-finite or non-positive.
    pub fn generate_vibration_script(
        &self,
        track: &AudioTrack,
        mode: EntrainmentMode,
        params: &SessionParameters,
    ) -> Result<VibrationScript> {
        if let Some(script) = self.fixed_vibration_script(mode, params) {
            return script;
        }

        let profile = mode.profile();
        let mapping = self.resolve_frequency(track.bpm, mode, params.light_source.max_frequency);
        let target = mapping.frequency;
        let intensity = params.scale_vibration(profile.vibration.intensity);
        let header = ScriptHeader {
            track_id: Some(track.id.clone()),
            mode,
            target_frequency: target,
            multiplier: f64::from(mapping.multiplier),
            created_at_ms: params.created_at_ms,
        };

        let events = plan_pulses(track, profile, target, profile.vibration.waveform, |frequency| {
            frequency
        })
        .into_iter()
        .map(|pulse| {
            let event = VibrationEvent::new(
                pulse.timestamp,
                intensity,
                pulse.duration,
                profile.vibration.waveform,
            );
            if pulse.ramping {
                event.with_frequency(pulse.frequency)
            } else {
                event
            }
        })
        .collect();

        VibrationScript::new(header, events).map_err(|err| {
            tracing::warn!(mode = %mode, track = %track.id, "vibration script rejected: {err}");
            err
        })
    }

    /// Light script of a fixed-script mode, or `None` for audio-driven modes.
    pub fn fixed_light_script(
        &self,
        mode: EntrainmentMode,
        params: &SessionParameters,
    ) -> Option<LightScript> {
        let phases = fixed_phases(mode)?;
        let ceiling = params.light_source.max_frequency;
        let mut events = Vec::new();
        let mut phase_start = 0.0;

        for phase in phases {
            for (elapsed, length) in slices(phase.duration, self.journey.light_step) {
                let frequency = phase_frequency(phase, elapsed);
                let mut event = LightEvent::new(
                    phase_start + elapsed,
                    phase.intensity.at(elapsed, &self.random),
                    length,
                    phase.light_waveform,
                )
                .with_frequency(light_frequency(frequency, ceiling, mode.default_frequency()));
                if let Some(color) = phase.color {
                    event = event.with_color(color);
                }
                events.push(event);
            }
            phase_start += phase.duration;
        }

        Some(LightScript::new(
            fixed_header(mode, params),
            ScriptRendering::Timeline,
            events,
        ))
    }

    /// Vibration script of a fixed-script mode, or `None` for audio-driven
    /// modes.
    pub fn fixed_vibration_script(
        &self,
        mode: EntrainmentMode,
        params: &SessionParameters,
    ) -> Option<Result<VibrationScript>> {
        let phases = fixed_phases(mode)?;
        let mut events = Vec::new();
        let mut phase_start = 0.0;

        for phase in phases {
            for (elapsed, length) in slices(phase.duration, self.journey.vibration_step) {
                events.push(
                    VibrationEvent::new(
                        phase_start + elapsed,
                        params.scale_vibration(phase.intensity.at(elapsed, &self.random)),
                        length,
                        phase.vibration_waveform,
                    )
                    .with_frequency(phase_frequency(phase, elapsed)),
                );
            }
            phase_start += phase.duration;
        }

        Some(VibrationScript::new(fixed_header(mode, params), events))
    }
}

fn fixed_phases(mode: EntrainmentMode) -> Option<&'static [Phase]> {
    if mode.uses_fixed_script() {
        journey(mode)
    } else {
        None
    }
}

fn fixed_header(mode: EntrainmentMode, params: &SessionParameters) -> ScriptHeader {
    ScriptHeader {
        track_id: None,
        mode,
        target_frequency: mode.default_frequency(),
        multiplier: 1.0,
        created_at_ms: params.created_at_ms,
    }
}

fn phase_frequency(phase: &Phase, elapsed: f64) -> f64 {
    let progress = if phase.duration > 0.0 {
        elapsed / phase.duration
    } else {
        1.0
    };
    phase.frequency.at(progress)
}

/// Usable light frequency: replaces unusable values with `fallback`, then
/// clamps to the device ceiling and the absolute safe range.
fn light_frequency(frequency: f64, ceiling: f64, fallback: f64) -> f64 {
    let frequency = if frequency.is_finite() && frequency > 0.0 {
        frequency
    } else {
        fallback
    };
    let frequency = if ceiling.is_finite() && ceiling > 0.0 {
        frequency.min(ceiling)
    } else {
        frequency
    };
    frequency.clamp(ABSOLUTE_MIN_FREQUENCY, ABSOLUTE_MAX_FREQUENCY)
}

/// Lays out one pulse per beat, shifted so the first beat lands at zero, or a
/// uniform train at the track tempo when there are no beats. Hard waveforms
/// last half a period; continuous ones run to the next pulse, never shorter
/// than one period.
fn plan_pulses(
    track: &AudioTrack,
    profile: &ModeProfile,
    target: f64,
    waveform: Waveform,
    limit: impl Fn(f64) -> f64,
) -> Vec<Pulse> {
    let duration = track.safe_duration();
    let mut beats: Vec<f64> = track
        .beats
        .iter()
        .copied()
        .filter(|beat| beat.is_finite() && *beat >= 0.0)
        .collect();
    beats.sort_by(f64::total_cmp);

    let (times, end) = match beats.first().copied() {
        Some(offset) => {
            let times: Vec<f64> = beats.iter().map(|beat| beat - offset).collect();
            (times, (duration - offset).max(0.0))
        }
        None => {
            tracing::warn!(track = %track.id, "no beats detected, using a uniform pulse train");
            (uniform_pulse_times(track.bpm, duration), duration)
        }
    };

    times
        .iter()
        .enumerate()
        .map(|(index, &timestamp)| {
            let frequency = limit(profile.ramped_frequency(timestamp, target));
            let period = 1.0 / frequency;
            let duration = if waveform.is_hard() {
                period * 0.5
            } else {
                let next = times.get(index + 1).copied().unwrap_or(end);
                (next - timestamp).max(period)
            };
            Pulse {
                timestamp,
                duration,
                frequency,
                ramping: profile.is_ramping(timestamp),
            }
        })
        .collect()
}

fn uniform_pulse_times(bpm: f64, duration: f64) -> Vec<f64> {
    let interval = 60.0 / fold_into_range(bpm);
    let count = (duration / interval).ceil().max(1.0) as usize;
    (0..count).map(|index| index as f64 * interval).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audio::MAX_TRACK_DURATION, error::VibrationParameter, EntrainError};

    fn track(beats: Vec<f64>) -> AudioTrack {
        AudioTrack::new("track-1", 10.0, 120.0, beats)
    }

    fn params() -> SessionParameters {
        SessionParameters {
            light_source: LightSourceCapability::screen(60.0),
            vibration_intensity: 1.0,
            created_at_ms: 42,
        }
    }

    #[test]
    fn alpha_places_one_light_event_per_beat() {
        let engine = EntrainmentEngine::default();
        let script = engine.generate_light_script(
            &track(vec![0.0, 0.5, 1.0, 1.5, 2.0]),
            EntrainmentMode::Alpha,
            &params(),
        );

        assert_eq!(script.multiplier(), 5.0);
        assert_eq!(script.target_frequency(), 10.0);
        assert_eq!(script.rendering(), ScriptRendering::Timeline);
        assert_eq!(script.events().len(), 5);
        let alpha = EntrainmentMode::Alpha.profile();
        for event in script.events() {
            assert_eq!(event.waveform(), alpha.light.waveform);
            assert_eq!(event.intensity(), alpha.light.intensity);
        }
    }

    #[test]
    fn beats_are_shifted_to_start_at_zero() {
        let engine = EntrainmentEngine::default();
        let script = engine.generate_light_script(
            &track(vec![3.0, 3.5, 4.0]),
            EntrainmentMode::Alpha,
            &params(),
        );
        let times: Vec<f64> = script.events().iter().map(LightEvent::timestamp).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0]);
        // The final beat runs to the shifted end of the track.
        assert!((script.total_duration() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn continuous_pulses_leave_no_gaps() {
        let engine = EntrainmentEngine::default();
        let script = engine.generate_light_script(
            &track(vec![0.0, 0.5, 1.0, 1.5, 2.0]),
            EntrainmentMode::Alpha,
            &params(),
        );
        for pair in script.events().windows(2) {
            assert!(pair[0].end() >= pair[1].timestamp() - 1e-9);
        }
    }

    #[test]
    fn continuous_pulses_are_at_least_one_period_long() {
        let engine = EntrainmentEngine::default();
        let script = engine.generate_light_script(
            &track(vec![0.0, 0.01, 0.02]),
            EntrainmentMode::Alpha,
            &params(),
        );
        for event in script.events() {
            let frequency = event.frequency().unwrap_or(script.target_frequency());
            assert!(event.duration() >= 1.0 / frequency - 1e-9);
        }
    }

    #[test]
    fn square_pulses_last_half_a_period() {
        let engine = EntrainmentEngine::default();
        let mut gamma_track = track(vec![0.0, 0.5, 1.0]);
        gamma_track.duration = 60.0;
        let script = engine.generate_light_script(&gamma_track, EntrainmentMode::Gamma, &params());

        for event in script.events() {
            assert_eq!(event.waveform(), Waveform::Square);
            let frequency = event.frequency().unwrap_or(script.target_frequency());
            assert!((event.duration() - 0.5 / frequency).abs() < 1e-12);
        }
    }

    #[test]
    fn ramp_starts_at_mode_start_frequency() {
        let engine = EntrainmentEngine::default();
        let script = engine.generate_light_script(
            &track(vec![0.0, 0.5, 1.0]),
            EntrainmentMode::Alpha,
            &params(),
        );
        let first = script.events()[0].frequency().unwrap();
        assert_eq!(first, EntrainmentMode::Alpha.profile().ramp_start_frequency);
        let second = script.events()[1].frequency().unwrap();
        assert!(second < first && second > script.target_frequency());
    }

    #[test]
    fn light_ramp_respects_device_ceiling() {
        let engine = EntrainmentEngine::default();
        let session = SessionParameters {
            light_source: LightSourceCapability::torch(12.0),
            ..params()
        };
        let script =
            engine.generate_light_script(&track(vec![0.0, 0.5]), EntrainmentMode::Alpha, &session);
        for event in script.events() {
            assert!(event.frequency().unwrap_or(0.0) <= 12.0);
        }
    }

    #[test]
    fn no_beats_fall_back_to_uniform_pulse_train() {
        let engine = EntrainmentEngine::default();
        let script =
            engine.generate_light_script(&track(Vec::new()), EntrainmentMode::Theta, &params());

        assert_eq!(script.events().len(), 20);
        assert_eq!(script.events()[1].timestamp(), 0.5);
        assert!((script.total_duration() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_track_still_produces_an_event() {
        let engine = EntrainmentEngine::default();
        let empty = AudioTrack::new("empty", 0.0, f64::NAN, Vec::new());
        let script = engine.generate_light_script(&empty, EntrainmentMode::Alpha, &params());
        assert_eq!(script.events().len(), 1);
    }

    #[test]
    fn cinematic_light_is_audio_reactive_span() {
        let engine = EntrainmentEngine::default();
        let script = engine.generate_light_script(
            &track(vec![0.0, 0.5, 1.0]),
            EntrainmentMode::Cinematic,
            &params(),
        );
        assert_eq!(script.rendering(), ScriptRendering::AudioReactive);
        assert_eq!(script.multiplier(), 1.0);
        assert_eq!(script.target_frequency(), 6.5);
        assert_eq!(script.events().len(), 1);
        assert_eq!(script.total_duration(), 10.0);

        let vibration = engine
            .generate_vibration_script(
                &track(vec![0.0, 0.5, 1.0]),
                EntrainmentMode::Cinematic,
                &params(),
            )
            .unwrap();
        assert_eq!(vibration.events().len(), 3);
        assert_eq!(vibration.multiplier(), 1.0);
    }

    #[test]
    fn vibration_mirrors_light_with_its_own_profile() {
        let engine = EntrainmentEngine::default();
        let beats = track(vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        let light = engine.generate_light_script(&beats, EntrainmentMode::Alpha, &params());
        let vibration = engine
            .generate_vibration_script(&beats, EntrainmentMode::Alpha, &params())
            .unwrap();

        assert_eq!(vibration.events().len(), light.events().len());
        assert_eq!(vibration.target_frequency(), 10.0);
        assert_eq!(vibration.multiplier(), 5.0);
        let profile = EntrainmentMode::Alpha.profile();
        for event in vibration.events() {
            assert_eq!(event.intensity(), profile.vibration.intensity);
        }
    }

    #[test]
    fn vibration_preference_is_floored() {
        let engine = EntrainmentEngine::default();
        let session = SessionParameters {
            vibration_intensity: 0.0,
            ..params()
        };
        let vibration = engine
            .generate_vibration_script(&track(vec![0.0, 1.0]), EntrainmentMode::Theta, &session)
            .unwrap();
        for event in vibration.events() {
            assert_eq!(event.intensity(), MIN_PERCEPTIBLE_VIBRATION);
        }
    }

    #[test]
    fn invalid_tempo_fails_vibration_but_not_light() {
        let engine = EntrainmentEngine::default();
        let broken = AudioTrack::new("broken", 10.0, f64::NAN, vec![0.0, 0.5]);

        let light = engine.generate_light_script(&broken, EntrainmentMode::Alpha, &params());
        assert_eq!(light.target_frequency(), EntrainmentMode::Alpha.default_frequency());
        assert_eq!(light.events().len(), 2);

        let err = engine
            .generate_vibration_script(&broken, EntrainmentMode::Alpha, &params())
            .unwrap_err();
        assert!(matches!(
            err,
            EntrainError::InvalidVibrationParameter {
                parameter: VibrationParameter::TargetFrequency,
                ..
            }
        ));
    }

    #[test]
    fn generation_is_idempotent() {
        let engine = EntrainmentEngine::default();
        let beats = track(vec![0.2, 0.7, 1.2, 1.7]);
        for mode in EntrainmentMode::ALL {
            let first = engine.generate_light_script(&beats, mode, &params());
            let second = engine.generate_light_script(&beats, mode, &params());
            assert_eq!(first, second);
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );

            let first = engine.generate_vibration_script(&beats, mode, &params()).unwrap();
            let second = engine.generate_vibration_script(&beats, mode, &params()).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn fixed_scripts_span_their_declared_phases() {
        let engine = EntrainmentEngine::default();
        for mode in [EntrainmentMode::DmnShutdown, EntrainmentMode::BeliefRewiring] {
            let expected = journey::journey_duration(journey(mode).unwrap());
            let light = engine.fixed_light_script(mode, &params()).unwrap();
            let vibration = engine.fixed_vibration_script(mode, &params()).unwrap().unwrap();

            assert!((light.total_duration() - expected).abs() < 1e-6);
            assert!((vibration.total_duration() - expected).abs() < 1e-6);
            assert!(vibration.events().len() > light.events().len());
            assert_eq!(light.track_id(), None);
        }
    }

    #[test]
    fn fixed_scripts_ignore_audio_input() {
        let engine = EntrainmentEngine::default();
        let a = engine.generate_light_script(
            &track(vec![0.0, 0.5]),
            EntrainmentMode::DmnShutdown,
            &params(),
        );
        let b = engine.generate_light_script(
            &AudioTrack::new("other", 300.0, 90.0, vec![1.0, 2.0, 3.0]),
            EntrainmentMode::DmnShutdown,
            &params(),
        );
        assert_eq!(a, b);
        assert!(engine.fixed_light_script(EntrainmentMode::Alpha, &params()).is_none());
    }

    #[test]
    fn fixed_script_events_are_contiguous() {
        let engine = EntrainmentEngine::default();
        let light = engine
            .fixed_light_script(EntrainmentMode::BeliefRewiring, &params())
            .unwrap();
        for pair in light.events().windows(2) {
            assert!((pair[0].end() - pair[1].timestamp()).abs() < 1e-6);
        }
    }

    #[test]
    fn randomized_phase_is_synchronized_across_channels() {
        let engine = EntrainmentEngine::default();
        let mode = EntrainmentMode::DmnShutdown;
        let phases = journey(mode).unwrap();
        let start: f64 = phases[..2].iter().map(|phase| phase.duration).sum();
        let end = start + phases[2].duration;

        let light = engine.fixed_light_script(mode, &params()).unwrap();
        let vibration = engine.fixed_vibration_script(mode, &params()).unwrap().unwrap();

        let mut matched = 0;
        let mut distinct = Vec::new();
        for event in light
            .events()
            .iter()
            .filter(|event| event.timestamp() >= start && event.timestamp() < end)
        {
            let partner = vibration
                .events()
                .iter()
                .find(|candidate| (candidate.timestamp() - event.timestamp()).abs() < 1e-9)
                .expect("vibration event at the same instant");
            assert!((partner.intensity() - event.intensity()).abs() < 1e-12);
            if !distinct.contains(&event.intensity()) {
                distinct.push(event.intensity());
            }
            matched += 1;
        }

        assert_eq!(matched, 120);
        assert!(distinct.len() > 10);
    }

    #[test]
    fn fixed_light_frequencies_respect_device_ceiling() {
        let engine = EntrainmentEngine::default();
        let session = SessionParameters {
            light_source: LightSourceCapability::torch(30.0),
            ..params()
        };
        let light = engine
            .fixed_light_script(EntrainmentMode::BeliefRewiring, &session)
            .unwrap();
        assert!(light
            .events()
            .iter()
            .all(|event| event.frequency().unwrap() <= 30.0));
    }

    #[test]
    fn tiny_journey_steps_in_config_stay_bounded() {
        let config = EngineConfig::from_json_str(
            r#"{"journey":{"random_interval":1e-9,"light_step":1e-9,"vibration_step":1e-9}}"#,
        )
        .unwrap();
        let engine = EntrainmentEngine::new(&config);
        let default = EntrainmentEngine::default();

        assert_eq!(engine.random_table().len(), default.random_table().len());
        let light = engine
            .fixed_light_script(EntrainmentMode::DmnShutdown, &params())
            .unwrap();
        let expected = default
            .fixed_light_script(EntrainmentMode::DmnShutdown, &params())
            .unwrap();
        assert_eq!(light.events().len(), expected.events().len());
    }

    #[test]
    fn beatless_track_with_huge_duration_still_renders() {
        let engine = EntrainmentEngine::default();
        let track = AudioTrack::new("endless", 1e300, 120.0, Vec::new());
        let light = engine.generate_light_script(&track, EntrainmentMode::Alpha, &params());

        assert!(!light.events().is_empty());
        assert!(light.total_duration() <= MAX_TRACK_DURATION + 1.0);
        assert!(engine
            .generate_vibration_script(&track, EntrainmentMode::Alpha, &params())
            .is_ok());
    }

    #[test]
    fn uniform_pulses_cover_duration() {
        assert_eq!(uniform_pulse_times(120.0, 2.0), vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(uniform_pulse_times(f64::NAN, 0.0), vec![0.0]);
        assert_eq!(uniform_pulse_times(30.0, 2.0), vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn analyze_pcm_builds_a_track() {
        let engine = EntrainmentEngine::default();
        let buffer = PcmBuffer::new(vec![0.0; 44_100], 44_100);
        let analysed = engine
            .analyze_pcm("silence", buffer, CancellationToken::new())
            .await;

        assert_eq!(analysed.id, "silence");
        assert!(analysed.beats.is_empty());
        assert_eq!(analysed.bpm, 120.0);
        assert!((analysed.duration - 1.0).abs() < 1e-12);
    }
}
