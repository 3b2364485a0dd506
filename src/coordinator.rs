//! Coordinator runtime.
//!
//! Wires the shared state, the router, the panel controller, the fire
//! controller, the periodic tasks, and (optionally) the damage bridge,
//! then drives the device event loop until cancellation or the event
//! stream ends. Everything here is composition; the behavior lives in
//! the component modules.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::config::Settings;
use crate::damage::{self, DamageBridge, DamageSettings};
use crate::device::{Channel, DeviceEvent, DeviceSession};
use crate::error::{PulselinkError, Result};
use crate::fire::FireController;
use crate::handlers::{self, Controller};
use crate::osc::{OscMessage, OscPublisher, OscValue};
use crate::router::Router;
use crate::scheduler;
use crate::state::CoordinatorState;
use crate::status;

/// The assembled coordinator.
pub struct Coordinator {
    state: Arc<CoordinatorState>,
    device: Arc<dyn DeviceSession>,
    publisher: Arc<dyn OscPublisher>,
    router: Arc<Router>,
    damage: Option<Arc<DamageBridge>>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Assembles a coordinator from validated settings and the session
    /// collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`PulselinkError::Config`] if the damage section cannot
    /// be resolved.
    pub fn new(
        settings: &Settings,
        device: Arc<dyn DeviceSession>,
        publisher: Arc<dyn OscPublisher>,
    ) -> Result<Self> {
        let state = Arc::new(CoordinatorState::new());
        state.set_fire_step(settings.controller.fire_step);
        state.set_chatbox_enabled(settings.controller.chatbox_enabled);
        state.set_panel_control(settings.controller.panel_control);
        state
            .channel(Channel::A)
            .select_waveform(settings.controller.waveform_a);
        state
            .channel(Channel::B)
            .select_waveform(settings.controller.waveform_b);

        let fire = Arc::new(FireController::new());
        let router = Arc::new(Router::new(
            Arc::clone(&state),
            handlers::PANEL_CONTROL_ADDRESS,
        ));
        let controller = Controller::new(
            Arc::clone(&state),
            Arc::clone(&device),
            Arc::clone(&publisher),
            Arc::clone(&fire),
        );
        controller.install_routes(&router);
        router.replace_custom(controller.custom_routes(&settings.mappings));

        let damage = if settings.damage.enabled {
            Some(DamageBridge::new(
                Arc::clone(&state),
                Arc::clone(&device),
                Arc::clone(&fire),
                DamageSettings::from_config(&settings.damage)?,
            ))
        } else {
            None
        };

        Ok(Self {
            state,
            device,
            publisher,
            router,
            damage,
            cancel: CancellationToken::new(),
        })
    }

    /// The shared coordinator state.
    #[must_use]
    pub fn state(&self) -> &Arc<CoordinatorState> {
        &self.state
    }

    /// The damage bridge, when enabled.
    #[must_use]
    pub fn damage(&self) -> Option<&Arc<DamageBridge>> {
        self.damage.as_ref()
    }

    /// A token that stops [`Self::run`] and all spawned tasks.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Dispatches one inbound avatar message through the router.
    pub fn dispatch(&self, msg: OscMessage) {
        self.router.dispatch(msg);
    }

    /// Runs the coordinator: spawns the periodic tasks and consumes
    /// device events until cancellation or the stream ends.
    ///
    /// # Errors
    ///
    /// Returns [`PulselinkError::Session`] if a rebind after a reported
    /// disconnect fails; everything else is contained in the tasks.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<DeviceEvent>,
        damage_frames: Option<mpsc::Receiver<String>>,
    ) -> Result<()> {
        let mut tasks: Vec<JoinHandle<()>> = vec![
            scheduler::spawn(
                Arc::clone(&self.state),
                Arc::clone(&self.device),
                self.cancel.child_token(),
            ),
            status::spawn(
                Arc::clone(&self.state),
                Arc::clone(&self.publisher),
                self.cancel.child_token(),
            ),
        ];
        if let (Some(bridge), Some(frames)) = (&self.damage, damage_frames) {
            tasks.push(damage::spawn(
                Arc::clone(bridge),
                frames,
                self.cancel.child_token(),
            ));
        }

        self.state.set_online(true);
        self.mirror_panel_state().await;
        info!(routes = self.router.route_count(), "coordinator running");

        let result = loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("coordinator stopping");
                    break Ok(());
                }
                event = events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_device_event(event).await {
                            break Err(e);
                        }
                    }
                    None => {
                        info!("device event stream ended");
                        break Ok(());
                    }
                },
            }
        };

        self.cancel.cancel();
        for task in tasks {
            let _ = task.await;
        }
        self.state.set_online(false);
        result
    }

    /// Mirrors the configured fire step and panel-control gate back to
    /// the game, so the in-world controls start in sync with the config.
    async fn mirror_panel_state(&self) {
        #[allow(clippy::cast_precision_loss)]
        let volume = self.state.fire_step() as f32 / 100.0;
        let mirrors = [
            (handlers::VOLUME_ADDRESS, OscValue::Float(volume)),
            (
                handlers::PANEL_CONTROL_ADDRESS,
                OscValue::Bool(self.state.panel_control()),
            ),
        ];
        for (address, value) in mirrors {
            if let Err(e) = self.publisher.publish_value(address, value).await {
                warn!(address, error = %e, "panel state mirror failed");
            }
        }
    }

    async fn handle_device_event(&self, event: DeviceEvent) -> Result<()> {
        match event {
            DeviceEvent::Strength(snap) => {
                trace!(?snap, "strength snapshot");
                self.state.apply_snapshot(snap);
            }
            DeviceEvent::Feedback(button) => {
                info!(button, "remote feedback button pressed");
            }
            DeviceEvent::Disconnected => {
                warn!("device disconnected; rebinding");
                self.state.set_online(false);
                self.device.rebind().await.map_err(PulselinkError::from)?;
                self.state.set_online(true);
                info!("session rebound");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("router", &self.router)
            .field("damage_enabled", &self.damage.is_some())
            .finish_non_exhaustive()
    }
}
