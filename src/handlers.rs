//! Panel-control handlers.
//!
//! One [`Controller`] owns the reaction to every inbound avatar
//! parameter: the fifteen sound-pad buttons, the volume radial, the page
//! selector, the master panel-control switch, and the data-driven custom
//! float mappings. Handlers are registered on the [`Router`] and run in
//! spawned tasks, so each one is a short self-contained reaction.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::CustomMapping;
use crate::debounce::DebouncedToggle;
use crate::device::{Channel, DeviceSession, StrengthOp};
use crate::fire::FireController;
use crate::osc::{OscMessage, OscPublisher};
use crate::router::{self, Handler, RouteKind, Router};
use crate::scheduler;
use crate::state::CoordinatorState;

/// Address prefix of the sound-pad panel.
pub const SOUNDPAD_PREFIX: &str = "/avatar/parameters/SoundPad";

/// Pattern matching all fifteen pad buttons.
pub const BUTTON_PATTERN: &str = "/avatar/parameters/SoundPad/Button/*";

/// Volume radial, mapped to the fire-mode step.
pub const VOLUME_ADDRESS: &str = "/avatar/parameters/SoundPad/Volume";

/// Page selector, mapped to channel selection.
pub const PAGE_ADDRESS: &str = "/avatar/parameters/SoundPad/Page";

/// Master enable for the whole panel; also the router's gate address.
pub const PANEL_CONTROL_ADDRESS: &str = "/avatar/parameters/SoundPad/PanelControl";

/// Strength change per press of the +/- buttons.
pub const STRENGTH_BUTTON_STEP: u32 = 5;

/// Catalog indices behind the waveform-select buttons 7 through 15.
const WAVEFORM_BUTTONS: [usize; 9] = [2, 14, 4, 5, 6, 7, 8, 9, 1];

/// Fraction of the limit used as the interactive-output floor.
const INTERACTIVE_FLOOR: f64 = 0.2;

/// Maps a proximity value in `[0, 1]` onto `[20 % of limit, limit]`,
/// rounded up so any contact at all registers above the floor.
#[must_use]
pub fn mapped_strength(value: f32, limit: u32) -> u32 {
    let min = f64::from(limit) * INTERACTIVE_FLOOR;
    let max = f64::from(limit);
    let mapped = (max - min).mul_add(f64::from(value).clamp(0.0, 1.0), min);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = mapped.ceil() as u32;
    rounded
}

/// Reaction logic for every inbound panel message.
pub struct Controller {
    state: Arc<CoordinatorState>,
    device: Arc<dyn DeviceSession>,
    publisher: Arc<dyn OscPublisher>,
    fire: Arc<FireController>,
    chatbox_toggle: DebouncedToggle,
    mode_toggle_a: DebouncedToggle,
    mode_toggle_b: DebouncedToggle,
}

impl Controller {
    /// Creates a controller over the shared collaborators.
    #[must_use]
    pub fn new(
        state: Arc<CoordinatorState>,
        device: Arc<dyn DeviceSession>,
        publisher: Arc<dyn OscPublisher>,
        fire: Arc<FireController>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            device,
            publisher,
            fire,
            chatbox_toggle: DebouncedToggle::default(),
            mode_toggle_a: DebouncedToggle::default(),
            mode_toggle_b: DebouncedToggle::default(),
        })
    }

    /// Registers the built-in panel routes.
    pub fn install_routes(self: &Arc<Self>, router: &Router) {
        let buttons = Arc::clone(self);
        router.register(
            BUTTON_PATTERN,
            RouteKind::Panel,
            router::handler(move |msg| {
                let buttons = Arc::clone(&buttons);
                async move { buttons.handle_button(msg).await }
            }),
        );

        let volume = Arc::clone(self);
        router.register(
            VOLUME_ADDRESS,
            RouteKind::Panel,
            router::handler(move |msg| {
                let volume = Arc::clone(&volume);
                async move { volume.handle_volume(&msg) }
            }),
        );

        let page = Arc::clone(self);
        router.register(
            PAGE_ADDRESS,
            RouteKind::Panel,
            router::handler(move |msg| {
                let page = Arc::clone(&page);
                async move { page.handle_page(&msg) }
            }),
        );

        let panel = Arc::clone(self);
        router.register(
            PANEL_CONTROL_ADDRESS,
            RouteKind::Panel,
            router::handler(move |msg| {
                let panel = Arc::clone(&panel);
                async move { panel.handle_panel_control(&msg) }
            }),
        );
    }

    /// Builds route entries for the configured custom float mappings,
    /// suitable for [`Router::replace_custom`].
    #[must_use]
    pub fn custom_routes(self: &Arc<Self>, mappings: &[CustomMapping]) -> Vec<(String, Handler)> {
        mappings
            .iter()
            .map(|mapping| {
                let controller = Arc::clone(self);
                let (to_a, to_b) = (mapping.channel_a, mapping.channel_b);
                let handler = router::handler(move |msg: OscMessage| {
                    let controller = Arc::clone(&controller);
                    async move {
                        let Some(value) = msg.value.as_float() else {
                            debug!(address = %msg.address, value = %msg.value,
                                "custom mapping expects a float");
                            return;
                        };
                        if to_a {
                            controller.interactive_output(value, Channel::A).await;
                        }
                        if to_b {
                            controller.interactive_output(value, Channel::B).await;
                        }
                    }
                });
                (mapping.address.clone(), handler)
            })
            .collect()
    }

    async fn handle_button(&self, msg: OscMessage) {
        let Some(index) = msg
            .address
            .rsplit('/')
            .next()
            .and_then(|s| s.parse::<u8>().ok())
        else {
            debug!(address = %msg.address, "button address without a numeric suffix");
            return;
        };

        let pressed = msg.value.pressed();
        let channel = self.state.selected_channel();
        match index {
            1 => self.toggle_mode(pressed, channel),
            2 => {
                if pressed {
                    self.issue_strength(channel, StrengthOp::SetTo, 0).await;
                }
            }
            3 => {
                if pressed {
                    self.issue_strength(channel, StrengthOp::Decrease, STRENGTH_BUTTON_STEP)
                        .await;
                }
            }
            4 => {
                if pressed {
                    self.issue_strength(channel, StrengthOp::Increase, STRENGTH_BUTTON_STEP)
                        .await;
                }
            }
            5 => {
                let step = self.state.fire_step();
                if let Err(e) = self
                    .fire
                    .set_active(pressed, channel, step, &self.state, self.device.as_ref())
                    .await
                {
                    warn!(%channel, error = %e, "fire transition failed");
                }
            }
            6 => self.toggle_chatbox(pressed),
            7..=15 => {
                if pressed {
                    let catalog_index = WAVEFORM_BUTTONS[usize::from(index) - 7];
                    if let Err(e) = scheduler::set_waveform_now(
                        &self.state,
                        self.device.as_ref(),
                        channel,
                        catalog_index,
                    )
                    .await
                    {
                        warn!(%channel, error = %e, "waveform override failed");
                    }
                }
            }
            _ => debug!(button = index, "unmapped pad button"),
        }
    }

    /// Buttons 1 and 6 act on the hold-to-confirm debounce; a release
    /// before expiry cancels without effect.
    fn toggle_mode(&self, pressed: bool, channel: Channel) {
        let toggle = match channel {
            Channel::A => &self.mode_toggle_a,
            Channel::B => &self.mode_toggle_b,
        };
        if pressed {
            let state = Arc::clone(&self.state);
            toggle.press(move || async move {
                let interactive = state.channel(channel).toggle_interactive();
                info!(%channel, interactive, "channel mode toggled");
            });
        } else {
            // The selection may have changed mid-hold; clear both.
            self.mode_toggle_a.release();
            self.mode_toggle_b.release();
        }
    }

    fn toggle_chatbox(&self, pressed: bool) {
        if pressed {
            let state = Arc::clone(&self.state);
            let publisher = Arc::clone(&self.publisher);
            self.chatbox_toggle.press(move || async move {
                let enabled = state.toggle_chatbox();
                info!(enabled, "status broadcasting toggled");
                if !enabled {
                    // Clear the remote display right away instead of
                    // waiting for the broadcaster's next tick.
                    if let Err(e) = publisher.publish_status("").await {
                        warn!(error = %e, "failed to clear remote display");
                    }
                }
            });
        } else {
            self.chatbox_toggle.release();
        }
    }

    async fn issue_strength(&self, channel: Channel, op: StrengthOp, value: u32) {
        if let Err(e) = self.device.set_strength(channel, op, value).await {
            warn!(%channel, ?op, value, error = %e, "strength command failed");
        }
    }

    fn handle_volume(&self, msg: &OscMessage) {
        let Some(value) = msg.value.as_float() else {
            debug!(value = %msg.value, "volume expects a float");
            return;
        };
        // Zero means the radial snapped shut, not a chosen step.
        if value <= 0.0 {
            return;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let step = (f64::from(value.clamp(0.0, 1.0)) * 100.0).ceil() as u32;
        self.state.set_fire_step(step);
        info!(step, "fire step updated");
    }

    fn handle_page(&self, msg: &OscMessage) {
        let Some(page) = msg.value.as_int() else {
            debug!(value = %msg.value, "page expects an integer");
            return;
        };
        if page < 0 {
            return;
        }
        let channel = if page <= 1 { Channel::A } else { Channel::B };
        self.state.select_channel(channel);
        info!(page, %channel, "channel selected");
    }

    fn handle_panel_control(&self, msg: &OscMessage) {
        let enabled = msg.value.pressed();
        self.state.set_panel_control(enabled);
        info!(enabled, "panel control switched");
    }

    /// Proximity-driven output: while a channel is in interactive mode,
    /// every float sample maps straight to a strength command.
    async fn interactive_output(&self, value: f32, channel: Channel) {
        if value < 0.0 || !self.state.channel(channel).interactive() {
            return;
        }
        let limit = self.state.channel(channel).limit();
        let target = mapped_strength(value, limit);
        if let Err(e) = self
            .device
            .set_strength(channel, StrengthOp::SetTo, target)
            .await
        {
            warn!(%channel, target, error = %e, "interactive output failed");
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("chatbox_pending", &self.chatbox_toggle.is_pending())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceEvent, SimSession, StrengthOp};
    use crate::error::SessionError;
    use crate::osc::OscValue;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct RecordingPublisher {
        statuses: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl OscPublisher for RecordingPublisher {
        async fn publish_status(&self, message: &str) -> Result<(), SessionError> {
            self.statuses
                .lock()
                .unwrap()
                .push(message.to_string());
            Ok(())
        }

        async fn publish_value(
            &self,
            _address: &str,
            _value: OscValue,
        ) -> Result<(), SessionError> {
            Ok(())
        }
    }

    struct Rig {
        controller: Arc<Controller>,
        state: Arc<CoordinatorState>,
        session: Arc<SimSession>,
        publisher: Arc<RecordingPublisher>,
        rx: tokio::sync::mpsc::Receiver<DeviceEvent>,
    }

    fn rig() -> Rig {
        let state = Arc::new(CoordinatorState::new());
        let (session, rx) = SimSession::new(100, 100);
        let session = Arc::new(session);
        let publisher = Arc::new(RecordingPublisher::default());
        let controller = Controller::new(
            Arc::clone(&state),
            Arc::clone(&session) as _,
            Arc::clone(&publisher) as _,
            Arc::new(FireController::new()),
        );
        Rig {
            controller,
            state,
            session,
            publisher,
            rx,
        }
    }

    fn button(index: u8, pressed: bool) -> OscMessage {
        OscMessage::new(
            format!("{SOUNDPAD_PREFIX}/Button/{index}"),
            OscValue::Bool(pressed),
        )
    }

    // Lets spawned debounce timers register their sleeps; required both
    // before and after moving the paused clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_mapped_strength_floor_and_ceiling() {
        assert_eq!(mapped_strength(0.0, 100), 20);
        assert_eq!(mapped_strength(1.0, 100), 100);
        assert_eq!(mapped_strength(0.5, 100), 60);
        // Rounds up so faint contact still clears the floor
        assert_eq!(mapped_strength(0.01, 100), 21);
        assert_eq!(mapped_strength(0.5, 0), 0);
    }

    #[tokio::test]
    async fn test_reset_button_zeroes_selected_channel() {
        let mut r = rig();
        r.session
            .set_strength(Channel::A, StrengthOp::SetTo, 40)
            .await
            .unwrap();
        let _ = r.rx.recv().await;

        r.controller.handle_button(button(2, true)).await;
        let Some(DeviceEvent::Strength(snap)) = r.rx.recv().await else {
            panic!("expected a snapshot");
        };
        assert_eq!(snap.a, 0);
    }

    #[tokio::test]
    async fn test_plus_minus_buttons_step_by_five() {
        let mut r = rig();
        r.controller.handle_button(button(4, true)).await;
        r.controller.handle_button(button(4, true)).await;
        r.controller.handle_button(button(3, true)).await;

        let mut last = None;
        while let Ok(event) = r.rx.try_recv() {
            if let DeviceEvent::Strength(snap) = event {
                last = Some(snap);
            }
        }
        assert_eq!(last.unwrap().a, 5);
    }

    #[tokio::test]
    async fn test_button_release_is_ignored_for_strength() {
        let mut r = rig();
        r.controller.handle_button(button(4, false)).await;
        assert!(r.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_page_selects_channel() {
        let r = rig();
        r.controller
            .handle_page(&OscMessage::new(PAGE_ADDRESS, OscValue::Int(2)));
        assert_eq!(r.state.selected_channel(), Channel::B);

        r.controller
            .handle_page(&OscMessage::new(PAGE_ADDRESS, OscValue::Int(0)));
        assert_eq!(r.state.selected_channel(), Channel::A);

        // Negative pages are VRChat init noise
        r.state.select_channel(Channel::B);
        r.controller
            .handle_page(&OscMessage::new(PAGE_ADDRESS, OscValue::Int(-1)));
        assert_eq!(r.state.selected_channel(), Channel::B);
    }

    #[tokio::test]
    async fn test_volume_sets_fire_step() {
        let r = rig();
        r.controller
            .handle_volume(&OscMessage::new(VOLUME_ADDRESS, OscValue::Float(0.42)));
        assert_eq!(r.state.fire_step(), 42);

        // Snapped-shut radial leaves the step alone
        r.controller
            .handle_volume(&OscMessage::new(VOLUME_ADDRESS, OscValue::Float(0.0)));
        assert_eq!(r.state.fire_step(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_mode_button_toggles_interactive() {
        let r = rig();
        r.controller.handle_button(button(1, true)).await;
        settle().await;
        tokio::time::advance(Duration::from_millis(1100)).await;
        settle().await;
        assert!(r.state.channel(Channel::A).interactive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tapped_mode_button_does_nothing() {
        let r = rig();
        r.controller.handle_button(button(1, true)).await;
        settle().await;
        tokio::time::advance(Duration::from_millis(200)).await;
        r.controller.handle_button(button(1, false)).await;
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert!(!r.state.channel(Channel::A).interactive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chatbox_disable_clears_display_immediately() {
        let r = rig();
        r.controller.handle_button(button(6, true)).await;
        settle().await;
        tokio::time::advance(Duration::from_millis(1100)).await;
        settle().await;

        assert!(!r.state.chatbox_enabled());
        assert_eq!(r.publisher.statuses.lock().unwrap().as_slice(), &[""]);
    }

    #[tokio::test]
    async fn test_waveform_button_selects_catalog_entry() {
        let mut r = rig();
        r.state.select_channel(Channel::B);
        r.controller.handle_button(button(8, true)).await;

        // Button 8 is the second select button: catalog index 14
        assert_eq!(r.state.channel(Channel::B).waveform_index(), 14);
        assert!(r.session.pulses_queued() > 0);
        drop(r.rx);
    }

    #[tokio::test]
    async fn test_interactive_output_requires_mode() {
        let mut r = rig();
        r.session
            .set_strength(Channel::A, StrengthOp::SetTo, 0)
            .await
            .unwrap();
        if let Some(DeviceEvent::Strength(snap)) = r.rx.recv().await {
            r.state.apply_snapshot(snap);
        }

        r.controller.interactive_output(0.5, Channel::A).await;
        assert!(r.rx.try_recv().is_err(), "panel mode ignores proximity");

        r.state.channel(Channel::A).toggle_interactive();
        r.controller.interactive_output(0.5, Channel::A).await;
        let Some(DeviceEvent::Strength(snap)) = r.rx.recv().await else {
            panic!("expected a snapshot");
        };
        assert_eq!(snap.a, 60);
    }

    #[tokio::test]
    async fn test_custom_routes_follow_channel_flags() {
        let r = rig();
        let routes = r.controller.custom_routes(&[CustomMapping {
            address: "/avatar/parameters/Tail_Stretch".to_string(),
            channel_a: false,
            channel_b: true,
        }]);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].0, "/avatar/parameters/Tail_Stretch");
    }
}
