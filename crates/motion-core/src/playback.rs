//! Stateful playback driver.
//!
//! The controller is the only mutable, time-ordered state in the engine:
//! it maps externally driven delta-time ticks onto composition frames,
//! applies the loop-mode policy, and notifies listeners through a channel.
//! Everything it drives is pure, so one immutable composition can back any
//! number of controllers. A controller is owned by a single logical driver;
//! callers needing concurrent control must serialize externally.

use crate::decode::Composition;
use crate::evaluate::{evaluate_with_cache, EvalCache};
use crate::graph::{BuildError, SceneGraph};
use crate::render::RenderTree;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Clamp at the boundary and stop.
    PlayOnce,
    /// Wrap around indefinitely.
    Loop,
    /// Reflect at both boundaries indefinitely.
    AutoReverse,
    /// Wrap, stopping after N traversals.
    Repeat(u32),
    /// Reflect, stopping after N traversals.
    RepeatBackwards(u32),
}

impl Default for LoopMode {
    fn default() -> Self {
        LoopMode::PlayOnce
    }
}

/// Playback window as progress fractions of the full frame range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRange {
    pub from: f32,
    pub to: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct PlaybackConfig {
    /// Signed rate multiplier; negative plays backward.
    pub speed: f32,
    pub loop_mode: LoopMode,
    pub clip_range: Option<ClipRange>,
    pub autoplay: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            speed: 1.0,
            loop_mode: LoopMode::default(),
            clip_range: None,
            autoplay: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    FrameChanged { frame: f32 },
    /// `finished` is true only when playback reached a natural boundary;
    /// an external `stop()` during playback reports false.
    Completed { finished: bool },
}

pub struct PlaybackController {
    graph: SceneGraph,
    cache: EvalCache,
    state: PlayState,
    frame: f32,
    speed: f32,
    loop_mode: LoopMode,
    /// Active window in frames, derived from the clip range.
    clip: (f32, f32),
    /// Reflection state for the auto-reverse modes.
    direction: f32,
    cycles: u32,
    tx: Sender<PlaybackEvent>,
    rx: Receiver<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(comp: Arc<Composition>, config: PlaybackConfig) -> Result<Self, BuildError> {
        let clip = clip_frames(&comp, config.clip_range);
        let graph = SceneGraph::build(comp)?;
        let cache = EvalCache::new(&graph);
        let (tx, rx) = unbounded();

        let frame = if config.speed < 0.0 { clip.1 } else { clip.0 };
        Ok(PlaybackController {
            graph,
            cache,
            state: if config.autoplay {
                PlayState::Playing
            } else {
                PlayState::Stopped
            },
            frame,
            speed: config.speed,
            loop_mode: config.loop_mode,
            clip,
            direction: 1.0,
            cycles: 0,
            tx,
            rx,
        })
    }

    pub fn composition(&self) -> &Arc<Composition> {
        self.graph.composition()
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn frame(&self) -> f32 {
        self.frame
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Receiver for frame-change and completion notifications. May be
    /// cloned and read from any thread.
    pub fn events(&self) -> Receiver<PlaybackEvent> {
        self.rx.clone()
    }

    pub fn play(&mut self) {
        match self.state {
            PlayState::Stopped => {
                self.cycles = 0;
                self.direction = 1.0;
                self.state = PlayState::Playing;
            }
            PlayState::Paused => self.state = PlayState::Playing,
            PlayState::Playing => {}
        }
    }

    /// Pause, retaining the current frame.
    pub fn pause(&mut self) {
        if self.state == PlayState::Playing {
            self.state = PlayState::Paused;
        }
    }

    /// Stop and reset to the loop start. Interrupting active playback
    /// reports an unfinished completion.
    pub fn stop(&mut self) {
        let was_playing = self.state == PlayState::Playing;
        self.state = PlayState::Stopped;
        self.cycles = 0;
        self.direction = 1.0;
        self.set_frame(if self.speed < 0.0 { self.clip.1 } else { self.clip.0 });
        if was_playing {
            let _ = self.tx.send(PlaybackEvent::Completed { finished: false });
        }
    }

    /// Jump to a frame, clamped to the active window. Keeps the current
    /// play state.
    pub fn seek_frame(&mut self, frame: f32) {
        self.set_frame(frame.clamp(self.clip.0, self.clip.1));
    }

    /// Jump to a progress fraction of the active window.
    pub fn seek_progress(&mut self, progress: f32) {
        let (start, end) = self.clip;
        self.set_frame(start + progress.clamp(0.0, 1.0) * (end - start));
    }

    /// Advance the timeline by `dt` seconds of external time and apply the
    /// loop-mode policy.
    pub fn advance(&mut self, dt: f32) {
        if self.state != PlayState::Playing {
            return;
        }
        let (start, end) = self.clip;
        let len = end - start;
        if len <= 0.0 || dt == 0.0 || self.speed == 0.0 {
            return;
        }

        let fr = self.composition().frame_rate();
        let velocity = self.speed * self.direction;
        let mut t = self.frame + dt * velocity * fr;

        match self.loop_mode {
            LoopMode::PlayOnce => {
                if velocity > 0.0 && t >= end {
                    self.set_frame(end);
                    self.complete_natural();
                } else if velocity < 0.0 && t <= start {
                    self.set_frame(start);
                    self.complete_natural();
                } else {
                    self.set_frame(t);
                }
            }
            LoopMode::Loop | LoopMode::Repeat(_) => {
                let limit = match self.loop_mode {
                    LoopMode::Repeat(n) => Some(n),
                    _ => None,
                };
                let mut finished_at = None;
                if velocity > 0.0 {
                    while t >= end {
                        self.cycles += 1;
                        if limit.is_some_and(|n| self.cycles >= n) {
                            finished_at = Some(end);
                            break;
                        }
                        t -= len;
                    }
                } else {
                    while t <= start {
                        self.cycles += 1;
                        if limit.is_some_and(|n| self.cycles >= n) {
                            finished_at = Some(start);
                            break;
                        }
                        t += len;
                    }
                }
                match finished_at {
                    Some(boundary) => {
                        self.set_frame(boundary);
                        self.complete_natural();
                    }
                    None => self.set_frame(t),
                }
            }
            LoopMode::AutoReverse | LoopMode::RepeatBackwards(_) => {
                let limit = match self.loop_mode {
                    LoopMode::RepeatBackwards(n) => Some(n),
                    _ => None,
                };
                let mut finished_at = None;
                loop {
                    if t >= end {
                        self.cycles += 1;
                        if limit.is_some_and(|n| self.cycles >= n) {
                            finished_at = Some(end);
                            break;
                        }
                        self.direction = -self.direction;
                        if t == end {
                            break;
                        }
                        t = end - (t - end);
                    } else if t <= start {
                        self.cycles += 1;
                        if limit.is_some_and(|n| self.cycles >= n) {
                            finished_at = Some(start);
                            break;
                        }
                        self.direction = -self.direction;
                        if t == start {
                            break;
                        }
                        t = start + (start - t);
                    } else {
                        break;
                    }
                }
                match finished_at {
                    Some(boundary) => {
                        self.set_frame(boundary);
                        self.complete_natural();
                    }
                    None => self.set_frame(t.clamp(start, end)),
                }
            }
        }
    }

    /// Evaluate the scene graph at the current frame, reusing this
    /// controller's keyframe cursors.
    pub fn render_tree(&mut self) -> RenderTree {
        evaluate_with_cache(&self.graph, self.frame, &mut self.cache)
    }

    /// Pure evaluation at an arbitrary frame; does not touch controller
    /// state and is safe to call from other threads via a shared graph.
    pub fn evaluate_at(&self, frame: f32) -> RenderTree {
        crate::evaluate::evaluate(&self.graph, frame)
    }

    fn set_frame(&mut self, frame: f32) {
        if frame != self.frame {
            self.frame = frame;
            let _ = self.tx.send(PlaybackEvent::FrameChanged { frame });
        }
    }

    fn complete_natural(&mut self) {
        self.state = PlayState::Stopped;
        let _ = self.tx.send(PlaybackEvent::Completed { finished: true });
    }
}

/// Convert a progress clip range to frame bounds. Degenerate or reversed
/// ranges clamp rather than error.
fn clip_frames(comp: &Composition, clip: Option<ClipRange>) -> (f32, f32) {
    let ip = comp.start_frame();
    let len = comp.duration_frames();
    match clip {
        None => (ip, ip + len),
        Some(range) => {
            let from = range.from.clamp(0.0, 1.0);
            let to = range.to.clamp(from, 1.0);
            (ip + from * len, ip + to * len)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use serde_json::json;

    fn one_second_comp() -> Arc<Composition> {
        // 30 fps, frames 0..30.
        let doc = json!({
            "fr": 30, "ip": 0, "op": 30, "w": 100, "h": 100,
            "layers": [
                {"ty": 4, "ind": 1, "ip": 0, "op": 30, "shapes": []}
            ]
        });
        Arc::new(decode(doc.to_string().as_bytes()).unwrap())
    }

    fn drain(rx: &Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
        rx.try_iter().collect()
    }

    fn completions(events: &[PlaybackEvent]) -> Vec<bool> {
        events
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::Completed { finished } => Some(*finished),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn play_once_clamps_and_stops() {
        let mut ctl = PlaybackController::new(
            one_second_comp(),
            PlaybackConfig {
                autoplay: true,
                ..Default::default()
            },
        )
        .unwrap();
        let rx = ctl.events();

        ctl.advance(0.5);
        assert_eq!(ctl.state(), PlayState::Playing);
        assert!((ctl.frame() - 15.0).abs() < 1e-4);

        ctl.advance(10.0);
        assert_eq!(ctl.state(), PlayState::Stopped);
        assert_eq!(ctl.frame(), 30.0);
        assert_eq!(completions(&drain(&rx)), vec![true]);
    }

    #[test]
    fn loop_wraps_without_completing() {
        let mut ctl = PlaybackController::new(
            one_second_comp(),
            PlaybackConfig {
                loop_mode: LoopMode::Loop,
                autoplay: true,
                ..Default::default()
            },
        )
        .unwrap();
        let rx = ctl.events();

        for _ in 0..10 {
            ctl.advance(0.4); // 12 frames per tick
        }
        assert_eq!(ctl.state(), PlayState::Playing);
        assert!(ctl.frame() >= 0.0 && ctl.frame() < 30.0);
        assert!(completions(&drain(&rx)).is_empty());
    }

    #[test]
    fn repeat_two_finishes_after_exactly_two_durations() {
        let mut ctl = PlaybackController::new(
            one_second_comp(),
            PlaybackConfig {
                loop_mode: LoopMode::Repeat(2),
                autoplay: true,
                ..Default::default()
            },
        )
        .unwrap();
        let rx = ctl.events();

        // Drive forward in quarter-duration ticks: 8 ticks = 2 durations.
        for i in 0..7 {
            ctl.advance(0.25);
            assert!(
                completions(&drain(&rx)).is_empty(),
                "completed early at tick {i}"
            );
            assert_eq!(ctl.state(), PlayState::Playing);
        }
        ctl.advance(0.25);
        assert_eq!(ctl.state(), PlayState::Stopped);
        assert_eq!(completions(&drain(&rx)), vec![true]);
    }

    #[test]
    fn auto_reverse_reflects_and_flips() {
        let mut ctl = PlaybackController::new(
            one_second_comp(),
            PlaybackConfig {
                loop_mode: LoopMode::AutoReverse,
                autoplay: true,
                ..Default::default()
            },
        )
        .unwrap();

        ctl.advance(1.2); // 36 frames: reflect at 30, back to 24
        assert!((ctl.frame() - 24.0).abs() < 1e-3, "frame {}", ctl.frame());
        ctl.advance(0.2); // heading backward now
        assert!((ctl.frame() - 18.0).abs() < 1e-3, "frame {}", ctl.frame());
        assert_eq!(ctl.state(), PlayState::Playing);
    }

    #[test]
    fn external_stop_reports_unfinished() {
        let mut ctl = PlaybackController::new(
            one_second_comp(),
            PlaybackConfig {
                autoplay: true,
                ..Default::default()
            },
        )
        .unwrap();
        let rx = ctl.events();

        ctl.advance(0.3);
        ctl.stop();
        assert_eq!(ctl.state(), PlayState::Stopped);
        assert_eq!(ctl.frame(), 0.0);
        assert_eq!(completions(&drain(&rx)), vec![false]);

        // Stopping again is a no-op: no second event.
        ctl.stop();
        assert!(completions(&drain(&rx)).is_empty());
    }

    #[test]
    fn seek_clamps_to_clip_range() {
        let mut ctl = PlaybackController::new(
            one_second_comp(),
            PlaybackConfig {
                clip_range: Some(ClipRange { from: 0.25, to: 0.75 }),
                ..Default::default()
            },
        )
        .unwrap();

        ctl.seek_frame(0.0);
        assert_eq!(ctl.frame(), 7.5);
        ctl.seek_frame(100.0);
        assert_eq!(ctl.frame(), 22.5);
        ctl.seek_progress(0.5);
        assert_eq!(ctl.frame(), 15.0);
        assert_eq!(ctl.state(), PlayState::Stopped);
    }

    #[test]
    fn negative_speed_plays_backward_to_start() {
        let mut ctl = PlaybackController::new(
            one_second_comp(),
            PlaybackConfig {
                speed: -1.0,
                autoplay: true,
                ..Default::default()
            },
        )
        .unwrap();
        let rx = ctl.events();

        assert_eq!(ctl.frame(), 30.0);
        ctl.advance(0.5);
        assert!((ctl.frame() - 15.0).abs() < 1e-4);
        ctl.advance(1.0);
        assert_eq!(ctl.state(), PlayState::Stopped);
        assert_eq!(ctl.frame(), 0.0);
        assert_eq!(completions(&drain(&rx)), vec![true]);
    }

    #[test]
    fn pause_retains_frame() {
        let mut ctl = PlaybackController::new(
            one_second_comp(),
            PlaybackConfig {
                autoplay: true,
                ..Default::default()
            },
        )
        .unwrap();

        ctl.advance(0.5);
        ctl.pause();
        let frozen = ctl.frame();
        ctl.advance(0.5);
        assert_eq!(ctl.frame(), frozen);
        ctl.play();
        ctl.advance(0.1);
        assert!(ctl.frame() > frozen);
    }
}
