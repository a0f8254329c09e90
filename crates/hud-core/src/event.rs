#![forbid(unsafe_code)]

//! Event model: typed payloads grouped into closed families.
//!
//! Every event kind is a plain struct carrying its payload and a `NAME`
//! constant, the stable string used to key subscriptions. Kinds that travel
//! together are folded into one enum per family ([`RemoteEvent`] for
//! link-originated traffic, [`InputEvent`] for gestures), so a dispatcher
//! fans out exactly one family and handlers match on the variant instead of
//! downcasting.
//!
//! # Design
//!
//! Names are data, not types: a subscription for `"connection_state"` and
//! the [`ConnectionState`] payload are related only by convention, enforced
//! at the publish site by [`Event::name`]. This keeps the registry a plain
//! string-keyed map and lets callers mint names at runtime (timers do).
//!
//! The enums are exhaustive on purpose. Adding a kind is a compile-time
//! event: every `match` in the tree gets revisited.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A payload that can be published under a well-known name.
///
/// `name` must be constant per kind; the registry keys subscriptions by it.
pub trait Event: Clone + Send + 'static {
    /// Subscription key this payload is published under.
    fn name(&self) -> &'static str;
}

// ─── Remote link events ─────────────────────────────────────────────────────

/// Link phase reported by the wireless stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionPhase {
    Connected,
    Disconnected,
}

/// The companion link went up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
}

impl ConnectionState {
    pub const NAME: &'static str = "connection_state";

    #[must_use]
    pub fn connected() -> Self {
        Self {
            phase: ConnectionPhase::Connected,
        }
    }

    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
        }
    }
}

/// Where pairing currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BondingPhase {
    Bonded,
    NotBonded,
    Bonding,
}

/// Pairing progress, including the passkey to show while `Bonding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BondingState {
    pub phase: BondingPhase,
    /// Six-digit confirmation code; only meaningful while bonding.
    pub passkey: u32,
}

impl BondingState {
    pub const NAME: &'static str = "bonding_state";
}

/// Screens the companion can steer the device to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PageKind {
    Home,
    Weather,
    Translation,
    Connection,
    MessageNotification,
}

/// Companion asked the device to switch pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChangePage {
    pub page: PageKind,
}

impl ChangePage {
    pub const NAME: &'static str = "change_page";
}

/// Free-form text pushed from the companion (captions, translations).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateMessage {
    pub text: String,
}

impl UpdateMessage {
    pub const NAME: &'static str = "message_from_remote";

    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A message arrived on the paired phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MessageNotification;

impl MessageNotification {
    pub const NAME: &'static str = "message_notification";
}

/// An incoming call is ringing on the paired phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CallNotification;

impl CallNotification {
    pub const NAME: &'static str = "call_notification";
}

/// Everything the wireless link can report, as one closed family.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RemoteEvent {
    Connection(ConnectionState),
    Bonding(BondingState),
    ChangePage(ChangePage),
    Message(UpdateMessage),
    MessageNotification(MessageNotification),
    CallNotification(CallNotification),
}

impl Event for RemoteEvent {
    fn name(&self) -> &'static str {
        match self {
            RemoteEvent::Connection(_) => ConnectionState::NAME,
            RemoteEvent::Bonding(_) => BondingState::NAME,
            RemoteEvent::ChangePage(_) => ChangePage::NAME,
            RemoteEvent::Message(_) => UpdateMessage::NAME,
            RemoteEvent::MessageNotification(_) => MessageNotification::NAME,
            RemoteEvent::CallNotification(_) => CallNotification::NAME,
        }
    }
}

impl From<ConnectionState> for RemoteEvent {
    fn from(value: ConnectionState) -> Self {
        RemoteEvent::Connection(value)
    }
}

impl From<BondingState> for RemoteEvent {
    fn from(value: BondingState) -> Self {
        RemoteEvent::Bonding(value)
    }
}

impl From<ChangePage> for RemoteEvent {
    fn from(value: ChangePage) -> Self {
        RemoteEvent::ChangePage(value)
    }
}

impl From<UpdateMessage> for RemoteEvent {
    fn from(value: UpdateMessage) -> Self {
        RemoteEvent::Message(value)
    }
}

impl From<MessageNotification> for RemoteEvent {
    fn from(value: MessageNotification) -> Self {
        RemoteEvent::MessageNotification(value)
    }
}

impl From<CallNotification> for RemoteEvent {
    fn from(value: CallNotification) -> Self {
        RemoteEvent::CallNotification(value)
    }
}

// ─── Input events ───────────────────────────────────────────────────────────

/// Touch bar pressed and held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Press;

impl Press {
    pub const NAME: &'static str = "press";
}

/// Single tap on the touch bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Click;

impl Click {
    pub const NAME: &'static str = "click";
}

/// Two taps in quick succession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DoubleClick;

impl DoubleClick {
    pub const NAME: &'static str = "double_click";
}

/// Forward swipe along the touch bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwipeClockwise;

impl SwipeClockwise {
    pub const NAME: &'static str = "swipe_clockwise";
}

/// Backward swipe along the touch bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SwipeAnticlockwise;

impl SwipeAnticlockwise {
    pub const NAME: &'static str = "swipe_anti_clockwise";
}

/// Gesture family reported by the touch sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InputEvent {
    Press(Press),
    Click(Click),
    DoubleClick(DoubleClick),
    SwipeClockwise(SwipeClockwise),
    SwipeAnticlockwise(SwipeAnticlockwise),
}

impl Event for InputEvent {
    fn name(&self) -> &'static str {
        match self {
            InputEvent::Press(_) => Press::NAME,
            InputEvent::Click(_) => Click::NAME,
            InputEvent::DoubleClick(_) => DoubleClick::NAME,
            InputEvent::SwipeClockwise(_) => SwipeClockwise::NAME,
            InputEvent::SwipeAnticlockwise(_) => SwipeAnticlockwise::NAME,
        }
    }
}

impl From<Press> for InputEvent {
    fn from(value: Press) -> Self {
        InputEvent::Press(value)
    }
}

impl From<Click> for InputEvent {
    fn from(value: Click) -> Self {
        InputEvent::Click(value)
    }
}

impl From<DoubleClick> for InputEvent {
    fn from(value: DoubleClick) -> Self {
        InputEvent::DoubleClick(value)
    }
}

impl From<SwipeClockwise> for InputEvent {
    fn from(value: SwipeClockwise) -> Self {
        InputEvent::SwipeClockwise(value)
    }
}

impl From<SwipeAnticlockwise> for InputEvent {
    fn from(value: SwipeAnticlockwise) -> Self {
        InputEvent::SwipeAnticlockwise(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_names_are_stable() {
        assert_eq!(
            RemoteEvent::from(ConnectionState::connected()).name(),
            "connection_state"
        );
        assert_eq!(
            RemoteEvent::from(BondingState {
                phase: BondingPhase::Bonding,
                passkey: 123_456,
            })
            .name(),
            "bonding_state"
        );
        assert_eq!(
            RemoteEvent::from(ChangePage {
                page: PageKind::Weather
            })
            .name(),
            "change_page"
        );
        assert_eq!(
            RemoteEvent::from(UpdateMessage::new("hi")).name(),
            "message_from_remote"
        );
        assert_eq!(
            RemoteEvent::from(MessageNotification).name(),
            "message_notification"
        );
        assert_eq!(
            RemoteEvent::from(CallNotification).name(),
            "call_notification"
        );
    }

    #[test]
    fn input_names_are_stable() {
        assert_eq!(InputEvent::from(Press).name(), "press");
        assert_eq!(InputEvent::from(Click).name(), "click");
        assert_eq!(InputEvent::from(DoubleClick).name(), "double_click");
        assert_eq!(InputEvent::from(SwipeClockwise).name(), "swipe_clockwise");
        assert_eq!(
            InputEvent::from(SwipeAnticlockwise).name(),
            "swipe_anti_clockwise"
        );
    }

    #[test]
    fn names_within_a_family_are_distinct() {
        let remote = [
            ConnectionState::NAME,
            BondingState::NAME,
            ChangePage::NAME,
            UpdateMessage::NAME,
            MessageNotification::NAME,
            CallNotification::NAME,
        ];
        for (i, a) in remote.iter().enumerate() {
            for b in &remote[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn payloads_round_trip_through_the_family() {
        let event = RemoteEvent::from(BondingState {
            phase: BondingPhase::Bonded,
            passkey: 0,
        });
        match event {
            RemoteEvent::Bonding(state) => assert_eq!(state.phase, BondingPhase::Bonded),
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
