// SPDX-FileCopyrightText: 2026 PingRelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anti-blocking delay calculation.
//!
//! WhatsApp flags accounts that fire messages at machine speed. The pacing
//! sequence mimics a human: a pause after opening the chat, a typing phase
//! proportional to the message length, and a short beat before hitting send.
//! Every delay carries random jitter so the timing never looks periodic.

use std::time::Duration;

use rand::Rng;

/// Milliseconds of simulated typing per character.
const TYPING_MS_PER_CHAR: u64 = 10;

/// Length-based typing time is capped here before jitter is added.
const TYPING_BASE_CAP: Duration = Duration::from_secs(3);

/// Hard ceiling on the total typing delay.
const TYPING_CEILING: Duration = Duration::from_secs(20);

/// Delay bounds for the pacing sequence.
///
/// [`Pacing::standard`] gives human-like timing; [`Pacing::none`] zeroes
/// every delay so tests run at full speed.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Pause between marking the chat seen and starting to type, in seconds.
    pub pre_typing: (f64, f64),
    /// Jitter added on top of the length-based typing time, in seconds.
    pub typing_jitter: (f64, f64),
    /// Pause between stopping typing and sending, in seconds.
    pub post_typing: (f64, f64),
    /// Lead-in before an image send, in seconds.
    pub image_lead: (f64, f64),
    /// Simulated upload time before the image request fires, in seconds.
    pub image_hold: (f64, f64),
    /// Lead-in before a video send, in seconds.
    pub video_lead: (f64, f64),
    /// Simulated upload time before the video request fires, in seconds.
    pub video_hold: (f64, f64),
    /// Whether typing time scales with message length.
    pub scale_with_length: bool,
}

impl Pacing {
    /// Human-like pacing used in production.
    pub fn standard() -> Self {
        Self {
            pre_typing: (1.0, 2.0),
            typing_jitter: (0.5, 1.5),
            post_typing: (0.5, 1.5),
            image_lead: (2.0, 4.0),
            image_hold: (3.0, 6.0),
            video_lead: (3.0, 6.0),
            video_hold: (5.0, 10.0),
            scale_with_length: true,
        }
    }

    /// All delays zeroed, for tests.
    pub fn none() -> Self {
        Self {
            pre_typing: (0.0, 0.0),
            typing_jitter: (0.0, 0.0),
            post_typing: (0.0, 0.0),
            image_lead: (0.0, 0.0),
            image_hold: (0.0, 0.0),
            video_lead: (0.0, 0.0),
            video_hold: (0.0, 0.0),
            scale_with_length: false,
        }
    }

    /// Pause after the chat is marked seen, before typing starts.
    pub fn pre_typing_delay(&self) -> Duration {
        random_delay(self.pre_typing.0, self.pre_typing.1)
    }

    /// How long to "type" a message of `text_len` characters.
    ///
    /// Base time is 10ms per character capped at 3 seconds, plus jitter,
    /// with a hard ceiling of 20 seconds.
    pub fn typing_delay(&self, text_len: usize) -> Duration {
        let base = if self.scale_with_length {
            Duration::from_millis(text_len as u64 * TYPING_MS_PER_CHAR).min(TYPING_BASE_CAP)
        } else {
            Duration::ZERO
        };
        let total = base + random_delay(self.typing_jitter.0, self.typing_jitter.1);
        total.min(TYPING_CEILING)
    }

    /// Pause after typing stops, before the send request fires.
    pub fn post_typing_delay(&self) -> Duration {
        random_delay(self.post_typing.0, self.post_typing.1)
    }

    /// Lead-in plus simulated upload time before an image send.
    pub fn image_delays(&self) -> (Duration, Duration) {
        (
            random_delay(self.image_lead.0, self.image_lead.1),
            random_delay(self.image_hold.0, self.image_hold.1),
        )
    }

    /// Lead-in plus simulated upload time before a video send.
    ///
    /// Longer than images; real uploads of video take noticeably longer.
    pub fn video_delays(&self) -> (Duration, Duration) {
        (
            random_delay(self.video_lead.0, self.video_lead.1),
            random_delay(self.video_hold.0, self.video_hold.1),
        )
    }
}

/// Uniform random duration between `min_secs` and `max_secs`.
pub fn random_delay(min_secs: f64, max_secs: f64) -> Duration {
    if max_secs <= min_secs {
        return Duration::from_secs_f64(min_secs.max(0.0));
    }
    let secs = rand::thread_rng().gen_range(min_secs..=max_secs);
    Duration::from_secs_f64(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_typing_delay_scales_with_length_up_to_cap() {
        let pacing = Pacing::standard();
        // 100 chars -> 1s base, plus 0.5-1.5s jitter.
        let d = pacing.typing_delay(100);
        assert!(d >= Duration::from_millis(1500), "got {d:?}");
        assert!(d <= Duration::from_millis(2500), "got {d:?}");
        // Very long messages bottom out at the 3s base cap.
        let d = pacing.typing_delay(100_000);
        assert!(d >= Duration::from_millis(3500), "got {d:?}");
        assert!(d <= Duration::from_millis(4500), "got {d:?}");
    }

    #[test]
    fn none_pacing_is_zero() {
        let pacing = Pacing::none();
        assert_eq!(pacing.pre_typing_delay(), Duration::ZERO);
        assert_eq!(pacing.typing_delay(10_000), Duration::ZERO);
        assert_eq!(pacing.post_typing_delay(), Duration::ZERO);
    }

    #[test]
    fn random_delay_stays_in_bounds() {
        for _ in 0..100 {
            let d = random_delay(0.5, 1.5);
            assert!(d >= Duration::from_millis(500));
            assert!(d <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn random_delay_handles_degenerate_bounds() {
        assert_eq!(random_delay(2.0, 2.0), Duration::from_secs(2));
        assert_eq!(random_delay(-1.0, -1.0), Duration::ZERO);
    }
}
