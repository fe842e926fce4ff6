//! Seam to the host media subsystem.
//!
//! Decoding and rendering stay with the host; the core only drives
//! position, play state and reads buffering progress through these traits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::StreamDescriptor;

/// Buffering progress of one stream; only ever moves forward.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ReadyState {
    #[default]
    Unstarted,
    Buffering,
    /// Enough data to play through without stalling
    Playable,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Focus {
    #[default]
    Normal,
    Enlarged,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    /// The host refused to start playback, e.g. an autoplay policy.
    #[error("playback blocked: {reason}")]
    PlaybackBlocked { reason: String },

    #[error("host cannot decode {codec}")]
    Unsupported { codec: String },
}

/// One host video element.
pub trait MediaElement: Send {
    /// Native playback position, seconds.
    fn position(&self) -> f64;

    fn set_position(&mut self, secs: f64);

    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn ready_state(&self) -> ReadyState;
}

/// Factory and capability oracle for media elements.
pub trait MediaHost: Send + Sync {
    fn can_play_type(&self, codec: &str) -> bool;

    fn create_element(&self, descriptor: &StreamDescriptor) -> Box<dyn MediaElement>;
}

/// A stream as the sync driver tracks it.
pub struct StreamHandle {
    pub descriptor: StreamDescriptor,
    pub visibility: Visibility,
    pub focus: Focus,
    ready_state: ReadyState,
    element: Box<dyn MediaElement>,
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.descriptor.id)
            .field("visibility", &self.visibility)
            .field("focus", &self.focus)
            .field("ready_state", &self.ready_state)
            .finish()
    }
}

impl StreamHandle {
    pub fn new(descriptor: StreamDescriptor, element: Box<dyn MediaElement>) -> Self {
        let ready_state = element.ready_state();
        Self {
            descriptor,
            visibility: Visibility::Visible,
            focus: Focus::Normal,
            ready_state,
            element,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    /// Record a buffering report. Returns `true` when the stream becomes
    /// playable for the first time; regressions are ignored.
    pub fn observe_ready(&mut self, state: ReadyState) -> bool {
        if state <= self.ready_state {
            return false;
        }
        self.ready_state = state;
        state == ReadyState::Playable
    }

    pub fn position(&self) -> f64 {
        self.element.position()
    }

    pub fn seek(&mut self, secs: f64) {
        self.element.set_position(secs);
    }

    pub fn play(&mut self) -> Result<(), MediaError> {
        self.element.play()
    }

    pub fn pause(&mut self) {
        self.element.pause();
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory media host recording every call, for tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default, Clone)]
    pub struct ElementLog {
        pub position: f64,
        pub playing: bool,
        pub seeks: Vec<f64>,
        pub play_calls: usize,
        pub pause_calls: usize,
        pub ready_state: ReadyState,
        pub block_play: bool,
    }

    #[derive(Clone, Default)]
    pub struct FakeHost {
        pub supports_codec: bool,
        elements: Arc<Mutex<HashMap<String, Arc<Mutex<ElementLog>>>>>,
        initial_ready: Arc<Mutex<HashMap<String, ReadyState>>>,
    }

    impl FakeHost {
        pub fn new() -> Self {
            Self {
                supports_codec: true,
                ..Self::default()
            }
        }

        pub fn without_codec() -> Self {
            Self {
                supports_codec: false,
                ..Self::default()
            }
        }

        /// Make the element created for `id` start in `state`.
        pub fn preload(&self, id: &str, state: ReadyState) {
            self.initial_ready.lock().unwrap().insert(id.to_string(), state);
        }

        pub fn element(&self, id: &str) -> Arc<Mutex<ElementLog>> {
            self.elements
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .unwrap_or_else(|| panic!("no element created for {id}"))
        }

        pub fn log(&self, id: &str) -> ElementLog {
            self.element(id).lock().unwrap().clone()
        }

        /// Simulate the element's native position moving on its own.
        pub fn set_native_position(&self, id: &str, secs: f64) {
            self.element(id).lock().unwrap().position = secs;
        }

        pub fn block_play(&self, id: &str, blocked: bool) {
            self.element(id).lock().unwrap().block_play = blocked;
        }
    }

    impl MediaHost for FakeHost {
        fn can_play_type(&self, _codec: &str) -> bool {
            self.supports_codec
        }

        fn create_element(&self, descriptor: &StreamDescriptor) -> Box<dyn MediaElement> {
            let ready_state = self
                .initial_ready
                .lock()
                .unwrap()
                .get(&descriptor.id)
                .copied()
                .unwrap_or_default();
            let log = Arc::new(Mutex::new(ElementLog {
                ready_state,
                ..ElementLog::default()
            }));
            self.elements
                .lock()
                .unwrap()
                .insert(descriptor.id.clone(), log.clone());
            Box::new(FakeElement { log })
        }
    }

    pub struct FakeElement {
        log: Arc<Mutex<ElementLog>>,
    }

    impl MediaElement for FakeElement {
        fn position(&self) -> f64 {
            self.log.lock().unwrap().position
        }

        fn set_position(&mut self, secs: f64) {
            let mut log = self.log.lock().unwrap();
            log.position = secs;
            log.seeks.push(secs);
        }

        fn play(&mut self) -> Result<(), MediaError> {
            let mut log = self.log.lock().unwrap();
            log.play_calls += 1;
            if log.block_play {
                return Err(MediaError::PlaybackBlocked {
                    reason: "autoplay disallowed".into(),
                });
            }
            log.playing = true;
            Ok(())
        }

        fn pause(&mut self) {
            let mut log = self.log.lock().unwrap();
            log.pause_calls += 1;
            log.playing = false;
        }

        fn ready_state(&self) -> ReadyState {
            self.log.lock().unwrap().ready_state
        }
    }
}
