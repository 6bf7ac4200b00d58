//! Fixed per-frame pass order and the textures passes hand to each other
//!
//! Every frame runs Shadow, CameraDepth, Main, Skybox, Composite in that
//! order. Disabled features skip draws, never passes, so consumers always
//! find their inputs produced earlier in the same frame.

use crate::context::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PassKind {
    Shadow,
    CameraDepth,
    Main,
    Skybox,
    Composite,
}

impl PassKind {
    pub const ORDER: [PassKind; 5] = [
        Self::Shadow,
        Self::CameraDepth,
        Self::Main,
        Self::Skybox,
        Self::Composite,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::CameraDepth => "camera depth",
            Self::Main => "main",
            Self::Skybox => "skybox",
            Self::Composite => "composite",
        }
    }

    /// Intermediate texture this pass writes, if any
    pub fn output(self) -> Option<PassOutput> {
        match self {
            Self::Shadow => Some(PassOutput::ShadowDepth),
            Self::CameraDepth => Some(PassOutput::CameraDepth),
            Self::Main => Some(PassOutput::SceneColor),
            Self::Skybox | Self::Composite => None,
        }
    }

    /// Intermediate textures this pass reads
    pub fn inputs(self) -> &'static [PassOutput] {
        match self {
            Self::Shadow | Self::CameraDepth => &[],
            Self::Main => &[PassOutput::ShadowDepth, PassOutput::CameraDepth],
            Self::Skybox => &[PassOutput::SceneColor],
            Self::Composite => &[
                PassOutput::SceneColor,
                PassOutput::ShadowDepth,
                PassOutput::CameraDepth,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutput {
    ShadowDepth,
    CameraDepth,
    SceneColor,
}

/// Tracks progress through one frame and rejects out-of-order passes
#[derive(Debug, Default)]
pub struct FrameSchedule {
    frame: u64,
    next: usize,
    produced: Vec<PassOutput>,
    in_frame: bool,
}

impl FrameSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames completed so far
    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    pub fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.in_frame {
            return Err(RenderError::PassOrder {
                pass: PassKind::ORDER[self.next.min(PassKind::ORDER.len() - 1)].label(),
                message: "previous frame was not finished".into(),
            });
        }
        self.in_frame = true;
        self.next = 0;
        self.produced.clear();
        Ok(())
    }

    /// Abandon the current frame (e.g. the surface was lost mid-frame)
    pub fn abort_frame(&mut self) {
        self.in_frame = false;
        self.next = 0;
        self.produced.clear();
    }

    /// Enter `pass`; it must be the next one and its inputs must exist
    pub fn begin(&mut self, pass: PassKind) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::PassOrder {
                pass: pass.label(),
                message: "no frame in progress".into(),
            });
        }
        match PassKind::ORDER.get(self.next) {
            Some(expected) if *expected == pass => {}
            Some(expected) => {
                return Err(RenderError::PassOrder {
                    pass: pass.label(),
                    message: format!("expected the {} pass", expected.label()),
                })
            }
            None => {
                return Err(RenderError::PassOrder {
                    pass: pass.label(),
                    message: "all passes already ran this frame".into(),
                })
            }
        }
        if let Some(missing) = pass.inputs().iter().find(|i| !self.produced.contains(i)) {
            return Err(RenderError::PassOrder {
                pass: pass.label(),
                message: format!("{:?} was not produced this frame", missing),
            });
        }
        Ok(())
    }

    /// Leave `pass`, recording its output
    pub fn finish(&mut self, pass: PassKind) {
        if let Some(output) = pass.output() {
            self.produced.push(output);
        }
        self.next += 1;
    }

    pub fn end_frame(&mut self) -> Result<(), RenderError> {
        if self.next != PassKind::ORDER.len() {
            let pass = PassKind::ORDER[self.next.min(PassKind::ORDER.len() - 1)];
            self.abort_frame();
            return Err(RenderError::PassOrder {
                pass: pass.label(),
                message: "frame ended before this pass ran".into(),
            });
        }
        self.in_frame = false;
        self.frame += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_all(schedule: &mut FrameSchedule) {
        schedule.begin_frame().unwrap();
        for pass in PassKind::ORDER {
            schedule.begin(pass).unwrap();
            schedule.finish(pass);
        }
        schedule.end_frame().unwrap();
    }

    #[test]
    fn test_full_frame_in_order() {
        let mut schedule = FrameSchedule::new();
        run_all(&mut schedule);
        run_all(&mut schedule);
        assert_eq!(schedule.frame_index(), 2);
    }

    #[test]
    fn test_out_of_order_is_rejected() {
        let mut schedule = FrameSchedule::new();
        schedule.begin_frame().unwrap();
        let err = schedule.begin(PassKind::Main).unwrap_err();
        assert!(err.to_string().contains("shadow"), "{}", err);
    }

    #[test]
    fn test_outputs_do_not_carry_over_frames() {
        let mut schedule = FrameSchedule::new();
        run_all(&mut schedule);
        schedule.begin_frame().unwrap();
        assert!(schedule.produced.is_empty());
        assert!(schedule.begin(PassKind::Shadow).is_ok());
    }

    #[test]
    fn test_consumers_list_their_producers() {
        for (i, pass) in PassKind::ORDER.iter().enumerate() {
            for input in pass.inputs() {
                let producer = PassKind::ORDER
                    .iter()
                    .position(|p| p.output() == Some(*input))
                    .unwrap();
                assert!(producer < i, "{:?} reads {:?} before it exists", pass, input);
            }
        }
    }

    #[test]
    fn test_incomplete_frame_is_reported() {
        let mut schedule = FrameSchedule::new();
        schedule.begin_frame().unwrap();
        schedule.begin(PassKind::Shadow).unwrap();
        schedule.finish(PassKind::Shadow);
        assert!(schedule.end_frame().is_err());
        // The failed frame was abandoned, so a new one can start
        assert!(schedule.begin_frame().is_ok());
    }

    #[test]
    fn test_nested_frames_are_rejected() {
        let mut schedule = FrameSchedule::new();
        schedule.begin_frame().unwrap();
        assert!(schedule.begin_frame().is_err());
        schedule.abort_frame();
        assert!(schedule.begin_frame().is_ok());
    }
}
