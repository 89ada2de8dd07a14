//! Runtime wiring: the long-lived reducer container and effect executor.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use board_contract::{BoardId, WindowId, WindowRecord};
use platform_remote::{BoardStore, RemoteConfig, TaskScheduler, ViewportProvider};

use crate::gateway::{GatewayState, RENAME_RELOAD_DELAY_MS};
use crate::icons;
use crate::model::{CanvasState, InteractionState};
use crate::reducer::{reduce_canvas, CanvasAction, RuntimeEffect};

/// Host service bundle injected into the canvas runtime.
///
/// All environment-specific selection (HTTP transport, event loop timers,
/// DOM measurement) happens before this bundle crosses into the runtime.
#[derive(Clone)]
pub struct RemoteServices {
    /// Remote board store.
    pub store: Rc<dyn BoardStore>,
    /// Cancellable timer service.
    pub scheduler: Rc<dyn TaskScheduler>,
    /// Canvas bounds source for grid placement.
    pub viewport: Rc<dyn ViewportProvider>,
    /// Remote endpoint configuration.
    pub config: RemoteConfig,
}

/// Handle to a registered store listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

pub(crate) struct RuntimeInner {
    pub(crate) store: Rc<dyn BoardStore>,
    pub(crate) scheduler: Rc<dyn TaskScheduler>,
    pub(crate) config: RemoteConfig,
    pub(crate) state: RefCell<CanvasState>,
    pub(crate) interaction: RefCell<InteractionState>,
    pub(crate) gateway: GatewayState,
    subscribers: RefCell<Vec<(SubscriptionId, Box<dyn Fn()>)>>,
    next_subscription: Cell<u64>,
}

/// The canvas window-manager runtime.
///
/// Cloning yields another handle to the same runtime; scheduled tasks hold
/// such handles. All methods assume the single-threaded, event-driven model:
/// synchronous dispatch, suspension only at awaited store calls and timers.
#[derive(Clone)]
pub struct CanvasRuntime {
    pub(crate) inner: Rc<RuntimeInner>,
}

impl CanvasRuntime {
    /// Creates a runtime over the injected services and arms the periodic
    /// flush.
    pub fn new(services: RemoteServices) -> Self {
        let state = CanvasState::new(Rc::clone(&services.viewport), services.config.clone());
        let runtime = Self {
            inner: Rc::new(RuntimeInner {
                store: services.store,
                scheduler: services.scheduler,
                config: services.config,
                state: RefCell::new(state),
                interaction: RefCell::new(InteractionState::default()),
                gateway: GatewayState::default(),
                subscribers: RefCell::new(Vec::new()),
                next_subscription: Cell::new(0),
            }),
        };
        runtime.install_periodic_flush();
        runtime
    }

    /// Applies an action, re-derives desktop icons, and executes the
    /// resulting persistence effects.
    ///
    /// Actions referencing missing windows are logged no-ops.
    pub fn dispatch(&self, action: CanvasAction) {
        let effects = {
            let mut state = self.inner.state.borrow_mut();
            let mut interaction = self.inner.interaction.borrow_mut();
            match reduce_canvas(&mut state, &mut interaction, action) {
                Ok(effects) => {
                    icons::sync_icons(&mut state);
                    effects
                }
                Err(error) => {
                    tracing::warn!(%error, "canvas action ignored");
                    return;
                }
            }
        };
        self.notify_subscribers();
        for effect in effects {
            self.run_effect(effect);
        }
    }

    /// Registers a listener invoked after every store mutation.
    ///
    /// Listeners must not register or remove subscriptions from inside the
    /// callback; read state through [`CanvasRuntime::with_state`] instead.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.get());
        self.inner.next_subscription.set(id.0 + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Box::new(listener)));
        id
    }

    /// Removes a listener; unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .subscribers
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
    }

    pub(crate) fn notify_subscribers(&self) {
        for (_, listener) in self.inner.subscribers.borrow().iter() {
            listener();
        }
    }

    fn run_effect(&self, effect: RuntimeEffect) {
        match effect {
            RuntimeEffect::PersistWindow { window_id, channel } => {
                self.schedule_debounced_save(channel, window_id);
            }
            RuntimeEffect::PersistWindowNow { window_id } => {
                self.schedule_immediate_save(window_id);
            }
            RuntimeEffect::PersistPlacements => self.schedule_placement_save(),
            RuntimeEffect::ScheduleReload => self.schedule_reload(RENAME_RELOAD_DELAY_MS),
        }
    }

    /// Reads the canvas state. The closure must not dispatch.
    pub fn with_state<R>(&self, f: impl FnOnce(&CanvasState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Reads the interaction state. The closure must not dispatch.
    pub fn with_interaction<R>(&self, f: impl FnOnce(&InteractionState) -> R) -> R {
        f(&self.inner.interaction.borrow())
    }

    /// The active board, if one has been switched in.
    pub fn current_board(&self) -> Option<BoardId> {
        self.inner.state.borrow().board_id().cloned()
    }

    /// Snapshot of one window's persisted record.
    pub fn window_record(&self, window_id: &WindowId) -> Option<WindowRecord> {
        self.inner
            .state
            .borrow()
            .window(window_id)
            .map(|w| w.record.clone())
    }
}
