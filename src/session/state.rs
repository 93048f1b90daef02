//! Session state machine
//!
//! Pure transition table: `(state, event) -> (state, actions)`. All I/O
//! lives in the controller, so every row here is testable without devices
//! or sockets. Exactly one state is current at any time; `Idle` and
//! `Stopped` are both quiescent and transition-equivalent.

use crate::transport::EndpointRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting(EndpointRole),
    Broadcasting,
    Listening,
    Stopped,
}

impl SessionState {
    pub fn is_quiescent(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Broadcasting | Self::Listening)
    }

    /// Human-readable status for the UI surface.
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting(_) => "Connecting...",
            Self::Broadcasting => "Broadcasting...",
            Self::Listening => "Listening...",
            Self::Stopped => "Stopped",
        }
    }
}

/// Everything that can drive a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StartBroadcasting,
    StartListening,
    Stop,
    ChannelOpened(EndpointRole),
    ChannelClosed,
    /// Any component failure; the message names the cause for the status
    /// surface.
    Fault(String),
}

/// Side effects the controller performs after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Acquire audio resources for the role and open its channel.
    Connect(EndpointRole),
    /// Wire the capture encoder to the open broadcaster channel.
    StartCapture,
    /// Start playback decoding and the visualizer loop.
    StartPlayback,
    /// Stop whichever components exist, close the channel, drain queues.
    Teardown,
    /// Publish the status surface (text plus command availability).
    PublishStatus,
}

/// One step of the state machine.
pub fn transition(state: SessionState, event: &Event) -> (SessionState, Vec<Action>) {
    use Action::*;
    use SessionState::*;

    match (state, event) {
        (s, Event::StartBroadcasting) if s.is_quiescent() => (
            Connecting(EndpointRole::Broadcaster),
            vec![Connect(EndpointRole::Broadcaster), PublishStatus],
        ),
        (s, Event::StartListening) if s.is_quiescent() => (
            Connecting(EndpointRole::Listener),
            vec![Connect(EndpointRole::Listener), PublishStatus],
        ),
        // Exactly one role at a time: entry commands are rejected until
        // the current session has stopped.
        (s, Event::StartBroadcasting | Event::StartListening) => (s, vec![]),

        (Connecting(EndpointRole::Broadcaster), Event::ChannelOpened(EndpointRole::Broadcaster)) => {
            (Broadcasting, vec![StartCapture, PublishStatus])
        }
        (Connecting(EndpointRole::Listener), Event::ChannelOpened(EndpointRole::Listener)) => {
            (Listening, vec![StartPlayback, PublishStatus])
        }
        // An open event for a different role can only come from a stale
        // channel; treat it like a fault.
        (Connecting(_), Event::ChannelOpened(_)) => (Stopped, vec![Teardown, PublishStatus]),
        (s, Event::ChannelOpened(_)) => (s, vec![]),

        // Stop is idempotent from every state, including Stopped.
        (_, Event::Stop) => (Stopped, vec![Teardown, PublishStatus]),

        (Connecting(_) | Broadcasting | Listening, Event::ChannelClosed | Event::Fault(_)) => {
            (Stopped, vec![Teardown, PublishStatus])
        }
        (s, Event::ChannelClosed | Event::Fault(_)) => (s, vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::Action::*;
    use super::SessionState::*;
    use super::*;

    #[test]
    fn test_broadcast_happy_path() {
        let (s, actions) = transition(Idle, &Event::StartBroadcasting);
        assert_eq!(s, Connecting(EndpointRole::Broadcaster));
        assert_eq!(actions, vec![Connect(EndpointRole::Broadcaster), PublishStatus]);

        let (s, actions) = transition(s, &Event::ChannelOpened(EndpointRole::Broadcaster));
        assert_eq!(s, Broadcasting);
        assert_eq!(actions, vec![StartCapture, PublishStatus]);
    }

    #[test]
    fn test_listen_happy_path() {
        let (s, _) = transition(Stopped, &Event::StartListening);
        assert_eq!(s, Connecting(EndpointRole::Listener));

        let (s, actions) = transition(s, &Event::ChannelOpened(EndpointRole::Listener));
        assert_eq!(s, Listening);
        assert_eq!(actions, vec![StartPlayback, PublishStatus]);
    }

    #[test]
    fn test_stop_from_stopped_is_noop_transition() {
        let (s, actions) = transition(Stopped, &Event::Stop);
        assert_eq!(s, Stopped);
        // Teardown of an empty session is itself a no-op; the state never
        // leaves Stopped.
        assert!(actions.contains(&Teardown));
    }

    #[test]
    fn test_channel_closed_while_broadcasting_stops_everything() {
        let (s, actions) = transition(Broadcasting, &Event::ChannelClosed);
        assert_eq!(s, Stopped);
        assert_eq!(actions, vec![Teardown, PublishStatus]);
    }

    #[test]
    fn test_fault_from_every_non_quiescent_state_stops() {
        for from in [
            Connecting(EndpointRole::Broadcaster),
            Connecting(EndpointRole::Listener),
            Broadcasting,
            Listening,
        ] {
            let (s, actions) = transition(from, &Event::Fault("boom".to_string()));
            assert_eq!(s, Stopped);
            assert!(actions.contains(&Teardown));
        }
    }

    #[test]
    fn test_fault_in_quiescent_state_is_ignored() {
        for from in [Idle, Stopped] {
            let (s, actions) = transition(from, &Event::Fault("late".to_string()));
            assert_eq!(s, from);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn test_exclusive_role_commands_rejected_while_active() {
        for from in [
            Connecting(EndpointRole::Broadcaster),
            Broadcasting,
            Listening,
        ] {
            let (s, actions) = transition(from, &Event::StartListening);
            assert_eq!(s, from, "never two roles at once");
            assert!(actions.is_empty());

            let (s, actions) = transition(from, &Event::StartBroadcasting);
            assert_eq!(s, from);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn test_wrong_role_open_tears_down() {
        let (s, actions) = transition(
            Connecting(EndpointRole::Listener),
            &Event::ChannelOpened(EndpointRole::Broadcaster),
        );
        assert_eq!(s, Stopped);
        assert!(actions.contains(&Teardown));
    }

    #[test]
    fn test_idle_and_stopped_are_equivalent_entry_points() {
        for from in [Idle, Stopped] {
            let (s, _) = transition(from, &Event::StartBroadcasting);
            assert_eq!(s, Connecting(EndpointRole::Broadcaster));
        }
    }

    #[test]
    fn test_late_closed_after_stop_is_ignored() {
        let (s, actions) = transition(Stopped, &Event::ChannelClosed);
        assert_eq!(s, Stopped);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_status_text() {
        assert_eq!(Connecting(EndpointRole::Listener).status_text(), "Connecting...");
        assert_eq!(Broadcasting.status_text(), "Broadcasting...");
        assert_eq!(Listening.status_text(), "Listening...");
        assert_eq!(Stopped.status_text(), "Stopped");
    }
}
