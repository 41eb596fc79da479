//! Per-frame orchestration.
//!
//! Every frame, in order:
//!
//! 1. take the newest frame from the [`FieldSlot`] (or none)
//! 2. simulate: read-role buffer → write-role buffer
//! 3. render the write-role buffer (the positions just produced)
//! 4. swap roles
//!
//! The swap happens even when rendering fails, so a dropped presentation never
//! desynchronizes the buffers. The driver owns the role flag; backends only see
//! the two buffers they are handed.

use crate::clock::FrameClock;
use crate::field::{FieldSlot, VideoFrame};
use crate::state::{PingPong, Slot};

/// Whether a field source is currently attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    /// No source: luminance is zero everywhere, only noise and the home spring act.
    #[default]
    Idle,
    /// A source is attached and sampled every frame.
    Active,
}

impl DriverState {
    fn from_attached(attached: bool) -> Self {
        if attached {
            DriverState::Active
        } else {
            DriverState::Idle
        }
    }
}

/// Inputs shared by both passes of one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// Seconds since start.
    pub time: f32,
    /// Index of this frame, starting at 0.
    pub frame: u64,
    /// Newest video frame, if a source is attached.
    pub field: Option<&'a VideoFrame>,
}

/// Executes the two passes on some device.
pub trait FrameBackend {
    /// One state buffer. The driver owns two of them.
    type Buffer;
    /// Render failure. Simulation cannot fail.
    type Error;

    /// Advance every particle from `read` into `write`.
    fn simulate(&mut self, read: &Self::Buffer, write: &mut Self::Buffer, input: &FrameInput<'_>);

    /// Draw the particles in `latest`.
    fn render(&mut self, latest: &Self::Buffer, input: &FrameInput<'_>) -> Result<(), Self::Error>;
}

/// Runs the simulate → render → swap sequence once per call.
pub struct FrameDriver<B: FrameBackend> {
    backend: B,
    buffers: PingPong<B::Buffer>,
    field: FieldSlot,
    clock: FrameClock,
    state: DriverState,
    frames: u64,
}

impl<B: FrameBackend> FrameDriver<B> {
    /// Both buffers must hold the same initial positions.
    pub fn new(backend: B, buffers: PingPong<B::Buffer>, field: FieldSlot) -> Self {
        Self {
            backend,
            buffers,
            field,
            clock: FrameClock::new(),
            state: DriverState::Idle,
            frames: 0,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: FrameClock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one frame at the clock's next tick.
    pub fn frame(&mut self) -> Result<(), B::Error> {
        let time = self.clock.tick();
        self.frame_at(time)
    }

    /// Run one frame at an explicit time.
    pub fn frame_at(&mut self, time: f32) -> Result<(), B::Error> {
        let latest = self.field.latest();
        self.update_state(latest.is_some());

        let input = FrameInput {
            time,
            frame: self.frames,
            field: latest.as_deref(),
        };

        let (read, write) = self.buffers.split_mut();
        self.backend.simulate(read, write, &input);
        let rendered = self.backend.render(self.buffers.write(), &input);

        self.buffers.swap();
        self.frames += 1;
        rendered
    }

    fn update_state(&mut self, attached: bool) {
        let next = DriverState::from_attached(attached);
        if next != self.state {
            match next {
                DriverState::Active => log::info!("Field source attached, driver active"),
                DriverState::Idle => log::info!("Field source lost, driver idle"),
            }
            self.state = next;
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Physical slot holding the newest positions.
    pub fn read_slot(&self) -> Slot {
        self.buffers.read_slot()
    }

    /// The buffer holding the newest positions.
    pub fn latest(&self) -> &B::Buffer {
        self.buffers.read()
    }

    pub fn buffers(&self) -> &PingPong<B::Buffer> {
        &self.buffers
    }

    pub fn field(&self) -> &FieldSlot {
        &self.field
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Buffers are plain labels; the backend records what it was handed.
    #[derive(Default)]
    struct Recorder {
        simulated: Vec<(&'static str, &'static str)>,
        rendered: Vec<&'static str>,
        fields: Vec<bool>,
        fail_render: bool,
    }

    impl FrameBackend for Recorder {
        type Buffer = &'static str;
        type Error = ();

        fn simulate(
            &mut self,
            read: &&'static str,
            write: &mut &'static str,
            input: &FrameInput<'_>,
        ) {
            self.simulated.push((*read, *write));
            self.fields.push(input.field.is_some());
        }

        fn render(&mut self, latest: &&'static str, _input: &FrameInput<'_>) -> Result<(), ()> {
            self.rendered.push(*latest);
            if self.fail_render {
                Err(())
            } else {
                Ok(())
            }
        }
    }

    fn driver() -> FrameDriver<Recorder> {
        FrameDriver::new(Recorder::default(), PingPong::new("a", "b"), FieldSlot::new())
    }

    #[test]
    fn test_render_sees_fresh_write_buffer() {
        let mut driver = driver();
        driver.frame_at(0.0).unwrap();
        driver.frame_at(0.1).unwrap();

        let backend = driver.backend();
        assert_eq!(backend.simulated, vec![("a", "b"), ("b", "a")]);
        assert_eq!(backend.rendered, vec!["b", "a"]);
    }

    #[test]
    fn test_even_frames_restore_roles() {
        let mut driver = driver();
        assert_eq!(driver.read_slot(), Slot::A);
        driver.frame_at(0.0).unwrap();
        assert_eq!(driver.read_slot(), Slot::B);
        driver.frame_at(0.0).unwrap();
        assert_eq!(driver.read_slot(), Slot::A);
        assert_eq!(driver.frames(), 2);
    }

    #[test]
    fn test_swap_survives_render_error() {
        let mut driver = driver();
        driver.backend_mut().fail_render = true;
        assert!(driver.frame_at(0.0).is_err());
        assert_eq!(driver.read_slot(), Slot::B);
        assert_eq!(*driver.latest(), "b");
        assert_eq!(driver.frames(), 1);
    }

    #[test]
    fn test_state_follows_field_slot() {
        let mut driver = driver();
        let field = driver.field().clone();

        driver.frame_at(0.0).unwrap();
        assert_eq!(driver.state(), DriverState::Idle);

        field.publish(VideoFrame::solid(2, 2, [255, 255, 255]));
        driver.frame_at(0.1).unwrap();
        assert_eq!(driver.state(), DriverState::Active);

        field.detach();
        driver.frame_at(0.2).unwrap();
        assert_eq!(driver.state(), DriverState::Idle);

        assert_eq!(driver.backend().fields, vec![false, true, false]);
    }

    #[test]
    fn test_clock_drives_frame_time() {
        struct Times(Vec<f32>);
        impl FrameBackend for Times {
            type Buffer = ();
            type Error = ();
            fn simulate(&mut self, _: &(), _: &mut (), input: &FrameInput<'_>) {
                self.0.push(input.time);
            }
            fn render(&mut self, _: &(), _: &FrameInput<'_>) -> Result<(), ()> {
                Ok(())
            }
        }

        let mut driver =
            FrameDriver::new(Times(Vec::new()), PingPong::new((), ()), FieldSlot::new())
                .with_clock(FrameClock::fixed(0.5));
        driver.frame().unwrap();
        driver.frame().unwrap();
        assert_eq!(driver.backend().0, vec![0.5, 1.0]);
    }
}
