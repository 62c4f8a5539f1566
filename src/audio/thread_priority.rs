// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Default priority for the audio callback thread when nothing else is configured.
const DEFAULT_CALLBACK_THREAD_PRIORITY: u8 = 70;

/// Resolves the callback priority once, so the hot path never touches the environment.
///
/// A configured value wins over BEETBOX_THREAD_PRIORITY (0-99), which wins over the default.
pub fn callback_thread_priority(configured: Option<u8>) -> Option<ThreadPriorityValue> {
    configured
        .or_else(|| {
            std::env::var("BEETBOX_THREAD_PRIORITY")
                .ok()
                .and_then(|v| v.parse::<u8>().ok())
        })
        .filter(|n| *n < 100)
        .and_then(|n| ThreadPriorityValue::try_from(n).ok())
        .or_else(|| ThreadPriorityValue::try_from(DEFAULT_CALLBACK_THREAD_PRIORITY).ok())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Returns whether we should attempt RT (SCHED_FIFO) scheduling for the audio callback thread.
/// Default: enabled. Opt out with BEETBOX_DISABLE_RT_AUDIO=1.
pub fn rt_audio_enabled() -> bool {
    !env_flag("BEETBOX_DISABLE_RT_AUDIO")
}

/// Raises the priority of the calling thread. Only the first call does anything.
pub fn configure_audio_thread_priority(
    priority: Option<ThreadPriorityValue>,
    rt_audio: bool,
    priority_set: &mut bool,
) {
    if *priority_set {
        return;
    }
    *priority_set = true;

    let Some(priority) = priority else {
        return;
    };
    let tp = ThreadPriority::Crossplatform(priority);
    if let Err(e) = set_current_thread_priority(tp) {
        warn!(error = ?e, "Failed to raise audio callback thread priority");
    }

    #[cfg(unix)]
    if rt_audio {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        let tid = thread_native_id();
        match set_thread_priority_and_policy(
            tid,
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => {
                info!("Enabled RT SCHED_FIFO for audio callback thread");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to set RT SCHED_FIFO for audio callback thread"
                );
            }
        }
    }
    #[cfg(not(unix))]
    let _ = rt_audio;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_priority_wins() {
        assert_eq!(
            callback_thread_priority(Some(42)),
            ThreadPriorityValue::try_from(42u8).ok()
        );
    }

    #[test]
    fn test_out_of_range_priority_falls_back() {
        assert_eq!(
            callback_thread_priority(Some(150)),
            ThreadPriorityValue::try_from(DEFAULT_CALLBACK_THREAD_PRIORITY).ok()
        );
    }
}
