//! Layer timeline: raw-frame or named-animation playback stepped by time

use std::time::Duration;

use thiserror::Error;

use super::sheet::{LayerSheet, NextAnimation};

/// What to start playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayTarget {
    /// Sheet frame index, stepping through every frame of the sheet
    Raw(usize),
    /// Named animation, from its first frame
    Anim(String),
}

impl Default for PlayTarget {
    fn default() -> Self {
        PlayTarget::Raw(0)
    }
}

impl From<usize> for PlayTarget {
    fn from(index: usize) -> Self {
        PlayTarget::Raw(index)
    }
}

impl From<&str> for PlayTarget {
    fn from(name: &str) -> Self {
        PlayTarget::Anim(name.to_string())
    }
}

impl From<String> for PlayTarget {
    fn from(name: String) -> Self {
        PlayTarget::Anim(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineMode {
    Raw { index: usize },
    Anim { name: String, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndKind {
    /// A non-looping raw timeline ran off its last sheet frame
    Raw,
    /// A named animation stepped past its last frame
    Animation,
}

/// Emitted when a timeline finishes a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationEnd {
    pub kind: EndKind,
    pub animation: Option<String>,
    /// Last index reached (within the animation, or within the sheet for raw)
    pub end_frame: usize,
    /// Set for layered costumes
    pub layer: Option<String>,
}

impl AnimationEnd {
    pub fn is_layer(&self, name: &str) -> bool {
        self.layer.as_deref() == Some(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown animation '{0}'")]
pub struct UnknownAnimation(pub String);

#[derive(Debug, Clone)]
pub struct Timeline {
    mode: TimelineMode,
    elapsed: Duration,
    paused: bool,
    /// Raw playback wraps, and `NextAnimation::Loop` restarts, only when set
    looping: bool,
    end_fired: bool,
}

impl Timeline {
    pub fn new(looping: bool) -> Self {
        Self {
            mode: TimelineMode::Raw { index: 0 },
            elapsed: Duration::ZERO,
            paused: false,
            looping,
            end_fired: false,
        }
    }

    pub fn mode(&self) -> &TimelineMode {
        &self.mode
    }

    pub fn animation(&self) -> Option<&str> {
        match &self.mode {
            TimelineMode::Anim { name, .. } => Some(name),
            TimelineMode::Raw { .. } => None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn play(
        &mut self,
        target: PlayTarget,
        sheet: &LayerSheet,
    ) -> Result<(), UnknownAnimation> {
        self.mode = match target {
            PlayTarget::Raw(index) => TimelineMode::Raw {
                index: sheet.clamp(index),
            },
            PlayTarget::Anim(name) => {
                if !sheet.has_animation(&name) {
                    return Err(UnknownAnimation(name));
                }
                TimelineMode::Anim { name, index: 0 }
            }
        };
        self.elapsed = Duration::ZERO;
        self.paused = false;
        self.end_fired = false;
        Ok(())
    }

    /// Pause, optionally jumping to a raw sheet frame
    pub fn stop(&mut self, frame: Option<usize>, sheet: &LayerSheet) {
        self.paused = true;
        self.elapsed = Duration::ZERO;
        if let Some(frame) = frame {
            self.mode = TimelineMode::Raw {
                index: sheet.clamp(frame),
            };
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Sheet frame currently shown
    pub fn current_frame(&self, sheet: &LayerSheet) -> Option<usize> {
        if sheet.is_empty() {
            return None;
        }
        match &self.mode {
            TimelineMode::Raw { index } => Some(sheet.clamp(*index)),
            TimelineMode::Anim { name, index } => {
                let frame = sheet
                    .animation(name)
                    .and_then(|def| def.frames.get((*index).min(def.last_index())))
                    .copied()
                    .unwrap_or(0);
                Some(sheet.clamp(frame))
            }
        }
    }

    /// Advance by `dt`, returning every end event crossed on the way.
    pub fn advance(
        &mut self,
        dt: Duration,
        framerate: f64,
        sheet: &LayerSheet,
        layer: Option<&str>,
    ) -> Vec<AnimationEnd> {
        let mut ended = Vec::new();
        if self.paused || framerate <= 0.0 || sheet.is_empty() {
            return ended;
        }

        self.elapsed += dt;
        loop {
            let Some((len, speed)) = self.resolve(sheet) else {
                self.elapsed = Duration::ZERO;
                break;
            };
            if speed <= 0.0 {
                self.elapsed = Duration::ZERO;
                break;
            }
            let frame_duration = Duration::from_secs_f64(1.0 / (framerate * speed));
            if frame_duration.is_zero() || self.elapsed < frame_duration {
                break;
            }
            self.elapsed -= frame_duration;

            if let Some(end) = self.step(len, sheet, layer) {
                ended.push(end);
            }
            if self.paused {
                self.elapsed = Duration::ZERO;
                break;
            }
        }
        ended
    }

    /// Frame count and speed of whatever is playing
    fn resolve(&mut self, sheet: &LayerSheet) -> Option<(usize, f64)> {
        if let TimelineMode::Anim { name, .. } = &self.mode {
            match sheet.animation(name) {
                Some(def) if def.frames.is_empty() => return None,
                Some(def) => return Some((def.frames.len(), def.speed)),
                None => {
                    log::warn!("animation '{}' vanished from sheet; falling back to raw", name);
                    self.mode = TimelineMode::Raw { index: 0 };
                }
            }
        }
        Some((sheet.frame_count(), 1.0))
    }

    fn step(&mut self, len: usize, sheet: &LayerSheet, layer: Option<&str>) -> Option<AnimationEnd> {
        let looping = self.looping;
        match &mut self.mode {
            TimelineMode::Raw { index } => {
                if *index + 1 < len {
                    *index += 1;
                    return None;
                }
                if looping {
                    *index = 0;
                    return None;
                }
                *index = len - 1;
                self.paused = true;
                Some(AnimationEnd {
                    kind: EndKind::Raw,
                    animation: None,
                    end_frame: *index,
                    layer: layer.map(str::to_string),
                })
            }
            TimelineMode::Anim { name, index } => {
                let last = len - 1;
                if *index < last {
                    *index += 1;
                    self.end_fired = false;
                    return None;
                }

                let end = if self.end_fired {
                    None
                } else {
                    Some(AnimationEnd {
                        kind: EndKind::Animation,
                        animation: Some(name.clone()),
                        end_frame: last,
                        layer: layer.map(str::to_string),
                    })
                };
                self.end_fired = true;

                let next = sheet
                    .animation(name)
                    .map(|def| def.next.clone())
                    .unwrap_or_default();
                match next {
                    NextAnimation::Loop if looping => {
                        *index = 0;
                        self.end_fired = false;
                    }
                    NextAnimation::Loop | NextAnimation::Freeze => {
                        *index = last;
                        self.paused = true;
                    }
                    NextAnimation::Chain(next) if sheet.has_animation(&next) => {
                        *name = next;
                        *index = 0;
                        self.end_fired = false;
                    }
                    NextAnimation::Chain(next) => {
                        log::warn!("animation '{}' chains to unknown '{}'; looping", name, next);
                        *index = 0;
                        self.end_fired = false;
                    }
                }
                end
            }
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costume::sheet::{AnimationDef, SheetFrame};
    use crate::graphics::Point;
    use proptest::prelude::*;

    const FPS: f64 = 4.0;
    const FRAME: Duration = Duration::from_millis(250);

    fn sheet() -> LayerSheet {
        let frames = (0..5).map(|_| SheetFrame::blank(2, 2, Point::ORIGIN)).collect();
        LayerSheet::new(frames)
            .with_animation("wave", AnimationDef::new(vec![1, 2, 3]))
            .with_animation(
                "blink",
                AnimationDef::new(vec![3, 4]).with_next(NextAnimation::Freeze),
            )
            .with_animation(
                "intro",
                AnimationDef::new(vec![0, 1]).with_next(NextAnimation::Chain("wave".into())),
            )
            .with_animation("fast", AnimationDef::new(vec![0, 1]).with_speed(2.0))
            .with_animation("empty", AnimationDef::new(vec![]))
    }

    #[test]
    fn test_raw_play_clamps_index() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        tl.play(PlayTarget::Raw(42), &sheet).unwrap();
        assert_eq!(tl.current_frame(&sheet), Some(4));
    }

    #[test]
    fn test_unknown_animation_is_error() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        let err = tl.play("moonwalk".into(), &sheet).unwrap_err();
        assert_eq!(err, UnknownAnimation("moonwalk".into()));
    }

    #[test]
    fn test_raw_looping_wraps_without_events() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        tl.play(PlayTarget::Raw(3), &sheet).unwrap();
        let ends = tl.advance(FRAME * 2, FPS, &sheet, None);
        assert!(ends.is_empty());
        assert_eq!(tl.current_frame(&sheet), Some(0));
    }

    #[test]
    fn test_raw_non_looping_freezes_with_event() {
        let sheet = sheet();
        let mut tl = Timeline::new(false);
        tl.play(PlayTarget::Raw(3), &sheet).unwrap();
        let ends = tl.advance(FRAME * 3, FPS, &sheet, None);
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0].kind, EndKind::Raw);
        assert_eq!(ends[0].end_frame, 4);
        assert!(tl.is_paused());
        assert_eq!(tl.current_frame(&sheet), Some(4));
    }

    #[test]
    fn test_freeze_fires_exactly_once() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        tl.play("blink".into(), &sheet).unwrap();

        assert!(tl.advance(FRAME, FPS, &sheet, Some("lids")).is_empty());
        assert_eq!(tl.current_frame(&sheet), Some(4));

        let ends = tl.advance(FRAME, FPS, &sheet, Some("lids"));
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0].animation.as_deref(), Some("blink"));
        assert_eq!(ends[0].end_frame, 1);
        assert!(ends[0].is_layer("lids"));
        assert!(tl.is_paused());

        for _ in 0..10 {
            assert!(tl.advance(FRAME, FPS, &sheet, Some("lids")).is_empty());
        }
        assert_eq!(tl.current_frame(&sheet), Some(4));
    }

    #[test]
    fn test_chain_switches_on_same_step() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        tl.play("intro".into(), &sheet).unwrap();
        let ends = tl.advance(FRAME * 2, FPS, &sheet, None);
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0].animation.as_deref(), Some("intro"));
        assert_eq!(tl.animation(), Some("wave"));
        assert_eq!(tl.current_frame(&sheet), Some(1));
    }

    #[test]
    fn test_loop_fires_once_per_cycle() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        tl.play("wave".into(), &sheet).unwrap();
        let ends = tl.advance(FRAME * 6, FPS, &sheet, None);
        assert_eq!(ends.len(), 2);
        assert_eq!(tl.current_frame(&sheet), Some(1));
    }

    #[test]
    fn test_legacy_loop_directive_freezes() {
        let sheet = sheet();
        let mut tl = Timeline::new(false);
        tl.play("wave".into(), &sheet).unwrap();
        let ends = tl.advance(FRAME * 10, FPS, &sheet, None);
        assert_eq!(ends.len(), 1);
        assert!(tl.is_paused());
        assert_eq!(tl.current_frame(&sheet), Some(3));
    }

    #[test]
    fn test_speed_scales_frame_duration() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        tl.play("fast".into(), &sheet).unwrap();
        tl.advance(Duration::from_millis(125), FPS, &sheet, None);
        assert_eq!(tl.current_frame(&sheet), Some(1));
    }

    #[test]
    fn test_paused_and_zero_rate_do_not_advance() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        tl.play("wave".into(), &sheet).unwrap();
        assert!(tl.advance(FRAME * 4, 0.0, &sheet, None).is_empty());
        assert_eq!(tl.current_frame(&sheet), Some(1));

        tl.stop(None, &sheet);
        tl.advance(FRAME * 4, FPS, &sheet, None);
        assert_eq!(tl.current_frame(&sheet), Some(1));

        tl.resume();
        tl.advance(FRAME, FPS, &sheet, None);
        assert_eq!(tl.current_frame(&sheet), Some(2));
    }

    #[test]
    fn test_stop_with_frame_switches_to_raw() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        tl.play("wave".into(), &sheet).unwrap();
        tl.stop(Some(0), &sheet);
        assert_eq!(tl.mode(), &TimelineMode::Raw { index: 0 });
        assert!(tl.is_paused());
    }

    #[test]
    fn test_empty_animation_holds_first_sheet_frame() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        tl.play("empty".into(), &sheet).unwrap();
        assert!(tl.advance(FRAME * 3, FPS, &sheet, None).is_empty());
        assert_eq!(tl.current_frame(&sheet), Some(0));
    }

    #[test]
    fn test_replay_rearms_end_event() {
        let sheet = sheet();
        let mut tl = Timeline::new(true);
        tl.play("blink".into(), &sheet).unwrap();
        assert_eq!(tl.advance(FRAME * 2, FPS, &sheet, None).len(), 1);
        tl.play("blink".into(), &sheet).unwrap();
        assert_eq!(tl.advance(FRAME * 2, FPS, &sheet, None).len(), 1);
    }

    proptest! {
        #[test]
        fn prop_current_frame_stays_in_bounds(
            start in 0usize..20,
            steps in proptest::collection::vec(0u64..2_000, 1..20),
            looping in any::<bool>(),
        ) {
            let sheet = sheet();
            let mut tl = Timeline::new(looping);
            tl.play(PlayTarget::Raw(start), &sheet).unwrap();
            for ms in steps {
                tl.advance(Duration::from_millis(ms), FPS, &sheet, None);
                let frame = tl.current_frame(&sheet).unwrap();
                prop_assert!(frame < sheet.frame_count());
            }
        }
    }
}
