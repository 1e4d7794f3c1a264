//! Simulated media element
//!
//! Headless stand-in for a real player: advances a virtual position in
//! monotonic time while playing and reports the same callbacks a browser
//! media element would. Every url is treated as media of the configured
//! duration.

use crate::boundary::{MediaElement, MediaEvent, PlayerProps};
use tokio::time::Instant;
use tracing::debug;

pub struct SimulatedElement {
    media_duration: f64,
    props: Option<PlayerProps>,
    position: f64,
    announced: bool,
    ended: bool,
    last_poll: Option<Instant>,
    pending: Vec<MediaEvent>,
}

impl SimulatedElement {
    pub fn new(media_duration: f64) -> Self {
        Self {
            media_duration: media_duration.max(0.0),
            props: None,
            position: 0.0,
            announced: false,
            ended: false,
            last_poll: None,
            pending: Vec::new(),
        }
    }

    /// Position in seconds
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn props(&self) -> Option<&PlayerProps> {
        self.props.as_ref()
    }

    fn fraction(&self) -> f64 {
        if self.media_duration > 0.0 {
            (self.position / self.media_duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl MediaElement for SimulatedElement {
    fn render(&mut self, props: &PlayerProps) {
        let previous = self.props.replace(props.clone());
        let switched = previous.as_ref().map_or(true, |p| p.url != props.url);
        if switched {
            debug!("Simulated element loading {:?}", props.url);
            self.position = 0.0;
            self.announced = false;
            self.ended = false;
            self.last_poll = None;
            self.pending.clear();
            return;
        }
        if let Some(previous) = previous {
            if previous.playing != props.playing && self.announced {
                self.pending.push(if props.playing {
                    MediaEvent::Play
                } else {
                    MediaEvent::Pause
                });
            }
        }
    }

    fn seek_to(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.media_duration);
        self.ended = false;
        self.pending.push(MediaEvent::Seeked);
    }

    fn poll(&mut self, now: Instant) -> Vec<MediaEvent> {
        let mut events = std::mem::take(&mut self.pending);
        let Some(props) = self.props.clone() else {
            return events;
        };
        if props.url.is_empty() {
            return events;
        }

        if !self.announced {
            self.announced = true;
            self.last_poll = Some(now);
            events.push(MediaEvent::Ready);
            events.push(MediaEvent::Duration(self.media_duration));
            return events;
        }

        let elapsed = self
            .last_poll
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_poll = Some(now);

        if !props.playing || self.ended {
            return events;
        }

        self.position += elapsed * props.playback_rate;
        if self.position >= self.media_duration {
            self.position = self.media_duration;
            self.ended = true;
            events.push(MediaEvent::Progress {
                played: 1.0,
                loaded: 1.0,
            });
            events.push(MediaEvent::Ended);
        } else {
            events.push(MediaEvent::Progress {
                played: self.fraction(),
                loaded: 1.0,
            });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn props(url: &str, playing: bool) -> PlayerProps {
        PlayerProps {
            url: url.to_string(),
            playing,
            looping: false,
            playback_rate: 1.0,
            volume: 0.3,
            muted: true,
            controls: false,
        }
    }

    #[test]
    fn test_announces_then_progresses() {
        let mut element = SimulatedElement::new(10.0);
        let t0 = Instant::now();
        element.render(&props("a", true));

        assert_eq!(
            element.poll(t0),
            vec![MediaEvent::Ready, MediaEvent::Duration(10.0)]
        );
        let events = element.poll(t0 + Duration::from_secs(4));
        assert_eq!(
            events,
            vec![MediaEvent::Progress {
                played: 0.4,
                loaded: 1.0
            }]
        );
    }

    #[test]
    fn test_reports_end() {
        let mut element = SimulatedElement::new(2.0);
        let t0 = Instant::now();
        element.render(&props("a", true));
        element.poll(t0);

        let events = element.poll(t0 + Duration::from_secs(5));
        assert_eq!(events.last(), Some(&MediaEvent::Ended));
        // Ended once, not on every poll
        assert!(element.poll(t0 + Duration::from_secs(6)).is_empty());
    }

    #[test]
    fn test_paused_does_not_advance() {
        let mut element = SimulatedElement::new(10.0);
        let t0 = Instant::now();
        element.render(&props("a", false));
        element.poll(t0);
        assert!(element.poll(t0 + Duration::from_secs(3)).is_empty());
        assert_eq!(element.position(), 0.0);
    }

    #[test]
    fn test_seek_and_url_switch() {
        let mut element = SimulatedElement::new(10.0);
        let t0 = Instant::now();
        element.render(&props("a", true));
        element.poll(t0);

        element.seek_to(7.0);
        assert_eq!(element.position(), 7.0);
        assert!(element.poll(t0).contains(&MediaEvent::Seeked));

        element.render(&props("b", true));
        assert_eq!(element.position(), 0.0);
        assert_eq!(
            element.poll(t0),
            vec![MediaEvent::Ready, MediaEvent::Duration(10.0)]
        );
    }
}
