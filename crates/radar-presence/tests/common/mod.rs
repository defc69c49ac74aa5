//! Simulated sensor and scenes shared by the integration tests.

#![allow(dead_code)]

use std::f32::consts::PI;
use std::ops::Range;
use std::time::Duration;

use num_complex::{Complex, Complex32};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use radar_presence::port::acquire_frame;
use radar_presence::{
    encode_raw_frame, BufferLayout, CalibrationResult, FrameProcessing, PresenceConfig,
    PresenceDetector, PresenceReport, RadarSensor, RawTrailer, SensorConfig, SensorError,
};

/// A point reflector, possibly moving.
#[derive(Debug, Clone)]
pub struct Reflector {
    pub point: usize,
    pub amplitude: f32,
    /// Phase advance between sweeps, radians. Fast motion.
    pub sweep_phase_step: f32,
    /// Phase advance between frames, radians. Slow motion.
    pub frame_phase_step: f32,
    /// Frames during which the reflector is present.
    pub frames: Range<usize>,
}

impl Reflector {
    pub fn stationary(point: usize, amplitude: f32, frames: Range<usize>) -> Self {
        Self {
            point,
            amplitude,
            sweep_phase_step: 0.0,
            frame_phase_step: 0.0,
            frames,
        }
    }
}

/// Synthetic radar scene: complex white noise plus reflectors.
pub struct Scene {
    num_points: usize,
    sweeps: usize,
    noise_std: f32,
    rng: StdRng,
    reflectors: Vec<Reflector>,
}

impl Scene {
    pub fn new(num_points: usize, sweeps: usize, noise_std: f32, seed: u64) -> Self {
        Self {
            num_points,
            sweeps,
            noise_std,
            rng: StdRng::seed_from_u64(seed),
            reflectors: Vec::new(),
        }
    }

    pub fn with_reflector(mut self, reflector: Reflector) -> Self {
        self.reflectors.push(reflector);
        self
    }

    /// Standard normal sample via Box-Muller.
    fn gaussian(&mut self) -> f32 {
        let u1: f32 = self.rng.gen::<f32>().max(1e-10);
        let u2: f32 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Samples of frame `index`, sweep-major.
    pub fn frame(&mut self, index: usize) -> Vec<Complex<i16>> {
        let mut samples = Vec::with_capacity(self.num_points * self.sweeps);
        for sweep in 0..self.sweeps {
            for point in 0..self.num_points {
                let mut value = Complex32::new(0.0, 0.0);
                for r in &self.reflectors {
                    if r.point == point && r.frames.contains(&index) {
                        let phase = r.frame_phase_step * index as f32
                            + r.sweep_phase_step * (index * self.sweeps + sweep) as f32;
                        value += Complex32::from_polar(r.amplitude, phase);
                    }
                }
                let noise = Complex32::new(self.gaussian(), self.gaussian()) * self.noise_std;
                value += noise;
                samples.push(Complex::new(quantize(value.re), quantize(value.im)));
            }
        }
        samples
    }
}

fn quantize(v: f32) -> i16 {
    v.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// Sensor that serves frames from a [`Scene`].
pub struct SimulatedSensor {
    pub id: u32,
    pub fail_prepare: bool,
    pub temperature: i16,
    pub prepared: Option<SensorConfig>,
    scene: Scene,
    layout: Option<BufferLayout>,
    frame: usize,
    measuring: bool,
}

impl SimulatedSensor {
    pub fn new(scene: Scene) -> Self {
        Self {
            id: 1,
            fail_prepare: false,
            temperature: 25,
            prepared: None,
            scene,
            layout: None,
            frame: 0,
            measuring: false,
        }
    }

    pub fn frames_read(&self) -> usize {
        self.frame
    }
}

impl RadarSensor for SimulatedSensor {
    fn sensor_id(&self) -> u32 {
        self.id
    }

    fn prepare(
        &mut self,
        config: &SensorConfig,
        _calibration: &CalibrationResult,
        scratch: &mut [u8],
    ) -> Result<(), SensorError> {
        if self.fail_prepare {
            return Err(SensorError::prepare("injected prepare failure"));
        }
        scratch.fill(0);
        self.layout = Some(BufferLayout::new(
            usize::from(config.num_points),
            usize::from(config.sweeps_per_frame),
        ));
        self.prepared = Some(*config);
        Ok(())
    }

    fn measure(&mut self) -> Result<(), SensorError> {
        if self.layout.is_none() {
            return Err(SensorError::NotReady { sensor_id: self.id });
        }
        self.measuring = true;
        Ok(())
    }

    fn wait_for_interrupt(&mut self, timeout: Duration) -> Result<(), SensorError> {
        if !self.measuring {
            return Err(SensorError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), SensorError> {
        let layout = self.layout.ok_or(SensorError::NotReady { sensor_id: self.id })?;
        let samples = self.scene.frame(self.frame);
        let trailer = RawTrailer {
            temperature: self.temperature,
            frame_delayed: false,
        };
        encode_raw_frame(&layout, &samples, trailer, buffer)?;
        self.frame += 1;
        self.measuring = false;
        Ok(())
    }
}

pub fn calibration() -> CalibrationResult {
    CalibrationResult::new(vec![0x5a; 64], 25)
}

/// Create and prepare a detector on `sensor`.
pub fn prepared_detector(
    config: &PresenceConfig,
    sensor: &mut SimulatedSensor,
) -> (PresenceDetector, Vec<u8>) {
    let mut detector = PresenceDetector::create(config).unwrap();
    let mut buffer = vec![0u8; detector.buffer_size()];
    detector
        .prepare(config, sensor, &calibration(), &mut buffer)
        .unwrap();
    (detector, buffer)
}

/// Acquire and process `frames` frames.
pub fn run<P: FrameProcessing>(
    detector: &mut PresenceDetector<P>,
    sensor: &mut SimulatedSensor,
    buffer: &mut [u8],
    frames: usize,
) -> Vec<PresenceReport> {
    (0..frames)
        .map(|_| {
            acquire_frame(sensor, buffer, Duration::from_millis(100)).unwrap();
            detector.process(buffer).unwrap().to_report()
        })
        .collect()
}

/// Scene-driven detector run from a fresh handle.
pub fn run_scene(config: &PresenceConfig, scene: Scene, frames: usize) -> Vec<PresenceReport> {
    let mut sensor = SimulatedSensor::new(scene);
    let (mut detector, mut buffer) = prepared_detector(config, &mut sensor);
    run(&mut detector, &mut sensor, &mut buffer, frames)
}
