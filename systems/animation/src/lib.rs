#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-accurate animation playback driven by the tick extrapolation factor.
//!
//! An [`Animator`] tracks a fractional frame position. Each update adds
//! `speed * extrp` to it, so playback depends only on accumulated simulated
//! time and never on the wall clock.

use lionengine_core::{AnimState, MINIMUM_FRAME};
use log::trace;
use serde::Deserialize;
use thiserror::Error;

const FRAME: f64 = 1.0;
const HALF_FRAME: f64 = 0.5;

/// Errors raised by invalid animation definitions or animator calls.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum AnimationError {
    /// The first frame is below [`MINIMUM_FRAME`].
    #[error("first frame {0} is below the minimum frame {MINIMUM_FRAME}")]
    FirstBelowMinimum(u32),
    /// The last frame precedes the first frame.
    #[error("last frame {last} precedes first frame {first}")]
    LastBeforeFirst {
        /// Declared first frame.
        first: u32,
        /// Declared last frame.
        last: u32,
    },
    /// The speed is negative, NaN or infinite.
    #[error("animation speed must be finite and non-negative, got {0}")]
    InvalidSpeed(f64),
    /// A frame below [`MINIMUM_FRAME`] was requested.
    #[error("frame {0} is below the minimum frame {MINIMUM_FRAME}")]
    FrameBelowMinimum(u32),
}

/// Immutable description of a frame sequence.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "AnimationDefinition")]
pub struct Animation {
    first: u32,
    last: u32,
    speed: f64,
    reverse: bool,
    repeat: bool,
}

impl Animation {
    /// Creates an animation playing frames `first..=last` at `speed` frames
    /// per tick.
    ///
    /// A reversed animation runs back to `first` after reaching `last`; a
    /// repeated animation starts over instead of finishing.
    pub fn new(
        first: u32,
        last: u32,
        speed: f64,
        reverse: bool,
        repeat: bool,
    ) -> Result<Self, AnimationError> {
        if first < MINIMUM_FRAME {
            return Err(AnimationError::FirstBelowMinimum(first));
        }
        if last < first {
            return Err(AnimationError::LastBeforeFirst { first, last });
        }
        check_speed(speed)?;
        Ok(Self {
            first,
            last,
            speed,
            reverse,
            repeat,
        })
    }

    /// First frame of the sequence.
    #[must_use]
    pub const fn first(&self) -> u32 {
        self.first
    }

    /// Last frame of the sequence.
    #[must_use]
    pub const fn last(&self) -> u32 {
        self.last
    }

    /// Frames advanced per unit of extrapolation.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Reports whether the animation plays back after reaching its end.
    #[must_use]
    pub const fn reverse(&self) -> bool {
        self.reverse
    }

    /// Reports whether the animation starts over instead of finishing.
    #[must_use]
    pub const fn repeat(&self) -> bool {
        self.repeat
    }
}

#[derive(Deserialize)]
struct AnimationDefinition {
    first: u32,
    last: u32,
    speed: f64,
    #[serde(default)]
    reverse: bool,
    #[serde(default)]
    repeat: bool,
}

impl TryFrom<AnimationDefinition> for Animation {
    type Error = AnimationError;

    fn try_from(raw: AnimationDefinition) -> Result<Self, Self::Error> {
        Animation::new(raw.first, raw.last, raw.speed, raw.reverse, raw.repeat)
    }
}

/// Playback cursor over the active [`Animation`].
#[derive(Clone, Debug, PartialEq)]
pub struct Animator {
    first: u32,
    last: u32,
    speed: f64,
    reverse: bool,
    repeat: bool,
    current: f64,
    state: AnimState,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator {
    /// Creates a stopped animator resting on the minimum frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            first: MINIMUM_FRAME,
            last: MINIMUM_FRAME,
            speed: 0.0,
            reverse: false,
            repeat: false,
            current: f64::from(MINIMUM_FRAME),
            state: AnimState::Stopped,
        }
    }

    /// Starts playing `animation` from its first frame.
    pub fn play(&mut self, animation: &Animation) {
        self.first = animation.first;
        self.last = animation.last;
        self.speed = animation.speed;
        self.reverse = animation.reverse;
        self.repeat = animation.repeat;
        self.current = f64::from(animation.first);
        self.state = AnimState::Playing;
    }

    /// Stops playback, keeping the current frame.
    pub fn stop(&mut self) {
        self.state = AnimState::Stopped;
    }

    /// Advances playback by `speed * extrp` frames.
    pub fn update(&mut self, extrp: f64) {
        match self.state {
            AnimState::Playing => self.update_playing(extrp),
            AnimState::Reversing => self.update_reversing(extrp),
            AnimState::Stopped | AnimState::Finished => {}
        }
    }

    /// Jumps to `frame`, whatever the playback state.
    pub fn set_frame(&mut self, frame: u32) -> Result<(), AnimationError> {
        if frame < MINIMUM_FRAME {
            return Err(AnimationError::FrameBelowMinimum(frame));
        }
        self.current = f64::from(frame);
        Ok(())
    }

    /// Changes the playback speed of the active animation.
    pub fn set_anim_speed(&mut self, speed: f64) -> Result<(), AnimationError> {
        check_speed(speed)?;
        self.speed = speed;
        Ok(())
    }

    /// Current frame.
    #[must_use]
    pub fn frame(&self) -> u32 {
        self.current.floor() as u32
    }

    /// Current frame relative to the active animation, starting at one.
    #[must_use]
    pub fn frame_anim(&self) -> u32 {
        let relative = (u64::from(self.frame()) + 1).saturating_sub(u64::from(self.first));
        u32::try_from(relative).unwrap_or(u32::MAX)
    }

    /// Playback state.
    #[must_use]
    pub const fn anim_state(&self) -> AnimState {
        self.state
    }

    /// Playback speed.
    #[must_use]
    pub const fn anim_speed(&self) -> f64 {
        self.speed
    }

    fn update_playing(&mut self, extrp: f64) {
        self.current += self.speed * extrp;

        if self.current >= f64::from(self.last) + FRAME {
            self.current = f64::from(self.last) + HALF_FRAME;
            if self.reverse {
                self.state = AnimState::Reversing;
            } else if self.repeat {
                self.current = f64::from(self.first);
            } else {
                self.state = AnimState::Finished;
            }
            trace!("animation reached last frame, now {:?}", self.state);
        }
    }

    fn update_reversing(&mut self, extrp: f64) {
        self.current -= self.speed * extrp;

        if self.current <= f64::from(self.first) {
            self.current = f64::from(self.first);
            if self.repeat {
                self.state = AnimState::Playing;
                self.current += FRAME;
            } else {
                self.state = AnimState::Finished;
            }
            trace!("animation reached first frame, now {:?}", self.state);
        }
    }
}

fn check_speed(speed: f64) -> Result<(), AnimationError> {
    if speed.is_finite() && speed >= 0.0 {
        Ok(())
    } else {
        Err(AnimationError::InvalidSpeed(speed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_definitions_fail_fast() {
        assert_eq!(
            Animation::new(0, 2, 1.0, false, false),
            Err(AnimationError::FirstBelowMinimum(0))
        );
        assert_eq!(
            Animation::new(4, 3, 1.0, false, false),
            Err(AnimationError::LastBeforeFirst { first: 4, last: 3 })
        );
        assert_eq!(
            Animation::new(1, 3, -0.5, false, false),
            Err(AnimationError::InvalidSpeed(-0.5))
        );
    }

    #[test]
    fn new_animator_is_stopped_on_minimum_frame() {
        let mut animator = Animator::new();
        animator.update(10.0);
        assert_eq!(animator.anim_state(), AnimState::Stopped);
        assert_eq!(animator.frame(), MINIMUM_FRAME);
    }

    #[test]
    fn play_resets_to_first_frame() {
        let mut animator = Animator::new();
        let animation = Animation::new(3, 5, 1.0, false, false).expect("animation");
        animator.play(&animation);
        animator.update(1.0);
        animator.play(&animation);
        assert_eq!(animator.frame(), 3);
        assert_eq!(animator.frame_anim(), 1);
        assert_eq!(animator.anim_state(), AnimState::Playing);
    }

    #[test]
    fn finished_animation_rests_on_last_frame() {
        let mut animator = Animator::new();
        animator.play(&Animation::new(2, 3, 1.0, false, false).expect("animation"));
        animator.update(1.0);
        animator.update(1.0);
        assert_eq!(animator.anim_state(), AnimState::Finished);
        assert_eq!(animator.frame(), 3);
        assert_eq!(animator.frame_anim(), 2);
    }

    #[test]
    fn set_frame_rejects_frames_below_minimum() {
        let mut animator = Animator::new();
        assert_eq!(
            animator.set_frame(0),
            Err(AnimationError::FrameBelowMinimum(0))
        );
    }

    #[test]
    fn frame_anim_handles_the_largest_frame() {
        let mut animator = Animator::new();
        animator.set_frame(u32::MAX).expect("valid frame");
        assert_eq!(animator.frame(), u32::MAX);
        assert_eq!(animator.frame_anim(), u32::MAX);

        animator.play(&Animation::new(4, 6, 1.0, false, false).expect("animation"));
        animator.set_frame(u32::MAX).expect("valid frame");
        assert_eq!(animator.frame_anim(), u32::MAX - 3);
    }

    #[test]
    fn stop_freezes_playback() {
        let mut animator = Animator::new();
        animator.play(&Animation::new(1, 8, 1.0, false, true).expect("animation"));
        animator.update(2.0);
        animator.stop();
        animator.update(2.0);
        assert_eq!(animator.frame(), 3);
        assert_eq!(animator.anim_state(), AnimState::Stopped);
    }

    #[test]
    fn anim_speed_can_be_changed_mid_playback() {
        let mut animator = Animator::new();
        animator.play(&Animation::new(1, 8, 1.0, false, false).expect("animation"));
        animator.set_anim_speed(2.0).expect("valid speed");
        animator.update(1.0);
        assert_eq!(animator.frame(), 3);
        assert!(animator.set_anim_speed(f64::NAN).is_err());
        assert_eq!(animator.anim_speed(), 2.0);
    }
}
