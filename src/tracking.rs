//! Seams to the capture device and the face-landmark model, and the
//! non-blocking sample sources the frame loop reads from.

use crate::{constants::NOSE_TIP_LANDMARK, stabilizer::HeadSample, Error, Result};
use image::RgbImage;
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;

/// One normalized face landmark as produced by the landmark model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Extract the head proxy from a detected face
///
/// Returns `None` when the landmark list is too short or the proxy is not finite.
pub fn head_sample_from_landmarks(landmarks: &[Landmark]) -> Option<HeadSample> {
    let nose = landmarks.get(NOSE_TIP_LANDMARK)?;
    HeadSample::new(nose.x, nose.y, nose.z).ok()
}

/// A captured video frame
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub timestamp: Duration,
    pub image: RgbImage,
}

/// Live video supplier
///
/// Implementations release the device when dropped.
pub trait FrameSource {
    /// Acquire the device
    ///
    /// # Errors
    ///
    /// Returns `Error::CaptureUnavailable` if permission is denied or the device is unsupported
    fn open(&mut self) -> Result<()>;

    /// Whether a decoded frame is available
    fn frame_ready(&self) -> bool;

    /// Presentation time of the current frame
    fn timestamp(&self) -> Duration;

    /// The current frame, if one is ready
    fn current_frame(&self) -> Option<&CapturedFrame>;
}

/// Face-landmark inference engine
pub trait LandmarkDetector {
    /// Detect at most one face; `Ok(None)` means no face in this frame
    ///
    /// # Errors
    ///
    /// Returns an error if inference itself fails
    fn detect(&mut self, frame: &CapturedFrame) -> Result<Option<Vec<Landmark>>>;
}

/// Anything the frame loop can poll for the newest head sample
pub trait SampleSource {
    /// Newest sample since the last poll, without blocking
    fn poll_latest(&mut self) -> Option<HeadSample>;
}

/// Runs inference inline, once per new capture frame
pub struct Tracker<F: FrameSource, D: LandmarkDetector> {
    frames: F,
    detector: D,
    last_timestamp: Option<Duration>,
    missed: u64,
}

impl<F: FrameSource, D: LandmarkDetector> Tracker<F, D> {
    /// Open the capture device and wrap it with the detector
    ///
    /// # Errors
    ///
    /// Returns the capture error; nothing is tracked until the device is open
    pub fn open(mut frames: F, detector: D) -> Result<Self> {
        frames.open()?;
        info!("Capture device opened");
        Ok(Self::new(frames, detector))
    }

    /// Wrap an already opened frame source
    pub fn new(frames: F, detector: D) -> Self {
        Self {
            frames,
            detector,
            last_timestamp: None,
            missed: 0,
        }
    }

    /// Frames in which no usable face was found
    pub const fn missed_frames(&self) -> u64 {
        self.missed
    }

    pub const fn frames(&self) -> &F {
        &self.frames
    }
}

impl<F: FrameSource, D: LandmarkDetector> SampleSource for Tracker<F, D> {
    fn poll_latest(&mut self) -> Option<HeadSample> {
        if !self.frames.frame_ready() {
            return None;
        }
        let timestamp = self.frames.timestamp();
        if self.last_timestamp.is_some_and(|last| timestamp <= last) {
            return None;
        }
        let frame = self.frames.current_frame()?;
        self.last_timestamp = Some(timestamp);

        match self.detector.detect(frame) {
            Ok(Some(landmarks)) => {
                let sample = head_sample_from_landmarks(&landmarks);
                if sample.is_none() {
                    self.missed += 1;
                    debug!("Discarding face without a usable head landmark at {timestamp:?}");
                }
                sample
            }
            Ok(None) => {
                self.missed += 1;
                None
            }
            Err(e) => {
                self.missed += 1;
                warn!("Landmark inference failed at {timestamp:?}: {e}");
                None
            }
        }
    }
}

/// Receives samples from an inference thread; only the newest is kept
pub struct ChannelSampleSource {
    receiver: Receiver<HeadSample>,
    disconnected: bool,
}

impl ChannelSampleSource {
    /// Create the source and the sender half for the producer
    pub fn new() -> (Sender<HeadSample>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                receiver,
                disconnected: false,
            },
        )
    }

    /// True once the producer has gone away
    pub const fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl SampleSource for ChannelSampleSource {
    fn poll_latest(&mut self) -> Option<HeadSample> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(sample) if sample.is_finite() => latest = Some(sample),
                Ok(_) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        info!("Tracking producer disconnected");
                    }
                    self.disconnected = true;
                    break;
                }
            }
        }
        latest
    }
}

/// Deterministic head path; `None` entries stand for frames without a face
pub struct ScriptedSource {
    samples: Vec<Option<HeadSample>>,
    cursor: usize,
    looping: bool,
}

impl ScriptedSource {
    pub fn new(samples: Vec<Option<HeadSample>>, looping: bool) -> Self {
        Self {
            samples,
            cursor: 0,
            looping,
        }
    }

    /// Side-to-side figure-eight sweep in front of the screen
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `frames` is zero
    #[allow(clippy::cast_precision_loss)]
    pub fn sweep(frames: usize, amplitude: f64) -> Result<Self> {
        if frames == 0 {
            return Err(Error::InvalidInput("Sweep needs at least one frame".to_string()));
        }
        let samples = (0..frames)
            .map(|i| {
                let t = i as f64 / frames as f64 * std::f64::consts::TAU;
                HeadSample::new(
                    amplitude.mul_add(t.sin(), 0.5),
                    (amplitude * 0.5).mul_add((2.0 * t).sin(), 0.5),
                    -0.05 * (1.0 - t.cos()),
                )
                .ok()
            })
            .collect();
        Ok(Self::new(samples, true))
    }
}

impl SampleSource for ScriptedSource {
    fn poll_latest(&mut self) -> Option<HeadSample> {
        if self.cursor >= self.samples.len() {
            if !self.looping || self.samples.is_empty() {
                return None;
            }
            self.cursor = 0;
        }
        let sample = self.samples[self.cursor];
        self.cursor += 1;
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubFrames {
        frame: Option<CapturedFrame>,
        denied: bool,
    }

    impl StubFrames {
        fn at(ms: u64) -> Self {
            Self {
                frame: Some(CapturedFrame {
                    timestamp: Duration::from_millis(ms),
                    image: RgbImage::new(2, 2),
                }),
                denied: false,
            }
        }
    }

    impl FrameSource for StubFrames {
        fn open(&mut self) -> Result<()> {
            if self.denied {
                return Err(Error::CaptureUnavailable("permission denied".to_string()));
            }
            Ok(())
        }

        fn frame_ready(&self) -> bool {
            self.frame.is_some()
        }

        fn timestamp(&self) -> Duration {
            self.frame.as_ref().map_or(Duration::ZERO, |f| f.timestamp)
        }

        fn current_frame(&self) -> Option<&CapturedFrame> {
            self.frame.as_ref()
        }
    }

    struct CountingDetector {
        calls: usize,
        face: Option<Vec<Landmark>>,
    }

    impl LandmarkDetector for CountingDetector {
        fn detect(&mut self, _frame: &CapturedFrame) -> Result<Option<Vec<Landmark>>> {
            self.calls += 1;
            Ok(self.face.clone())
        }
    }

    struct FailingDetector;

    impl LandmarkDetector for FailingDetector {
        fn detect(&mut self, _frame: &CapturedFrame) -> Result<Option<Vec<Landmark>>> {
            Err(Error::TrackingError("model returned no tensor".to_string()))
        }
    }

    fn face(x: f64, y: f64, z: f64) -> Vec<Landmark> {
        vec![
            Landmark { x: 0.0, y: 0.0, z: 0.0 },
            Landmark { x, y, z },
            Landmark { x: 1.0, y: 1.0, z: 0.0 },
        ]
    }

    #[test]
    fn test_head_proxy_uses_nose_tip() {
        let sample = head_sample_from_landmarks(&face(0.4, 0.6, -0.05)).unwrap();
        assert_eq!(sample, HeadSample { x: 0.4, y: 0.6, z: -0.05 });
        assert!(head_sample_from_landmarks(&face(f64::NAN, 0.6, 0.0)).is_none());
        assert!(head_sample_from_landmarks(&[]).is_none());
    }

    #[test]
    fn test_tracker_runs_once_per_frame() {
        let detector = CountingDetector {
            calls: 0,
            face: Some(face(0.5, 0.5, 0.0)),
        };
        let mut tracker = Tracker::new(StubFrames::at(16), detector);

        assert!(tracker.poll_latest().is_some());
        assert!(tracker.poll_latest().is_none());
        assert_eq!(tracker.detector.calls, 1);
    }

    #[test]
    fn test_tracker_counts_missing_faces() {
        let detector = CountingDetector { calls: 0, face: None };
        let mut tracker = Tracker::new(StubFrames::at(16), detector);

        assert!(tracker.poll_latest().is_none());
        assert_eq!(tracker.missed_frames(), 1);
    }

    #[test]
    fn test_tracker_waits_for_frame() {
        let detector = CountingDetector { calls: 0, face: None };
        let mut tracker = Tracker::new(StubFrames { frame: None, denied: false }, detector);

        assert!(tracker.poll_latest().is_none());
        assert_eq!(tracker.detector.calls, 0);
    }

    #[test]
    fn test_open_reports_unavailable_capture() {
        let frames = StubFrames {
            denied: true,
            ..StubFrames::at(0)
        };
        let result = Tracker::open(frames, CountingDetector { calls: 0, face: None });
        assert!(matches!(result, Err(Error::CaptureUnavailable(_))));

        assert!(Tracker::open(StubFrames::at(0), CountingDetector { calls: 0, face: None }).is_ok());
    }

    #[test]
    fn test_inference_failure_is_a_missed_frame() {
        let mut tracker = Tracker::new(StubFrames::at(16), FailingDetector);

        assert!(tracker.poll_latest().is_none());
        assert_eq!(tracker.missed_frames(), 1);
    }

    #[test]
    fn test_channel_keeps_latest() {
        let (sender, mut source) = ChannelSampleSource::new();
        sender.send(HeadSample { x: 0.1, y: 0.1, z: 0.0 }).unwrap();
        sender.send(HeadSample { x: 0.2, y: 0.2, z: 0.0 }).unwrap();
        sender.send(HeadSample { x: f64::NAN, y: 0.2, z: 0.0 }).unwrap();

        assert_eq!(source.poll_latest().map(|s| s.x), Some(0.2));
        assert!(source.poll_latest().is_none());

        drop(sender);
        assert!(source.poll_latest().is_none());
        assert!(source.is_disconnected());
    }

    #[test]
    fn test_scripted_source_loops() {
        let sample = HeadSample { x: 0.5, y: 0.5, z: 0.0 };
        let mut source = ScriptedSource::new(vec![Some(sample), None], true);

        assert_eq!(source.poll_latest(), Some(sample));
        assert_eq!(source.poll_latest(), None);
        assert_eq!(source.poll_latest(), Some(sample));
    }

    #[test]
    fn test_sweep_starts_centered() {
        let mut source = ScriptedSource::sweep(120, 0.2).unwrap();
        let first = source.poll_latest().unwrap();
        assert!((first.x - 0.5).abs() < 1e-12);
        assert!(first.z.abs() < 1e-12);
        assert!(ScriptedSource::sweep(0, 0.2).is_err());
    }
}
