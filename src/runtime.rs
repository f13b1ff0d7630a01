//! Script runtime: session tokens, per-entity dispatch and broadcast fan-out.
//!
//! Everything runs on one thread. Scripts are spawned with `spawn_local`, so
//! the runtime must be driven from inside a `tokio::task::LocalSet`.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::blocks::{Block, ScriptDocument};
use crate::config::{AppConfig, TimingConfig};
use crate::error::ScriptError;
use crate::events::{Console, KernelEvent};
use crate::project::Project;
use crate::runtime_host::PlayState;
use crate::scripts::ScriptContext;
use crate::world::{EntityId, Stage, World};

struct RuntimeInner {
    world: RefCell<World>,
    console: RefCell<Console>,
    session: RefCell<Option<CancellationToken>>,
    tasks: TaskTracker,
    timing: TimingConfig,
}

/// Handle to the shared kernel state. Cloning is cheap; every script task
/// holds one.
///
/// `world()` and `world_mut()` hand out `RefCell` guards. Never hold one
/// across an `.await`.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Fresh kernel: the stage plus `Sprite1`, which starts active.
    pub fn new(config: &AppConfig) -> Self {
        let runtime = Self::with_world(config, World::new(Stage::from(&config.stage)));
        runtime.create_sprite(Some("Sprite1"));
        runtime
    }

    pub fn with_world(config: &AppConfig, world: World) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                world: RefCell::new(world),
                console: RefCell::new(Console::new(&config.console)),
                session: RefCell::new(None),
                tasks: TaskTracker::new(),
                timing: config.timing.clone(),
            }),
        }
    }

    pub fn from_project(config: &AppConfig, project: &Project) -> anyhow::Result<Self> {
        let world = World::from_project(project, Stage::from(&config.stage))?;
        Ok(Self::with_world(config, world))
    }

    pub fn export_project(&self) -> Project {
        self.world().export_project()
    }

    pub fn world(&self) -> Ref<'_, World> {
        self.inner.world.borrow()
    }

    pub fn world_mut(&self) -> RefMut<'_, World> {
        self.inner.world.borrow_mut()
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.inner.timing
    }

    pub fn log(&self, event: KernelEvent) {
        self.inner.console.borrow_mut().push(event);
    }

    pub fn take_console(&self) -> Vec<KernelEvent> {
        self.inner.console.borrow_mut().drain()
    }

    pub fn console_lines(&self) -> Vec<String> {
        self.inner.console.borrow().events().map(ToString::to_string).collect()
    }

    pub fn play_state(&self) -> PlayState {
        match self.inner.session.borrow().as_ref() {
            Some(token) if !token.is_cancelled() => PlayState::Running,
            _ => PlayState::Idle,
        }
    }

    /// Token of the live session, if any.
    pub fn session_token(&self) -> Option<CancellationToken> {
        self.inner.session.borrow().clone()
    }

    /// Script tasks that have not finished yet.
    pub fn live_scripts(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Resolves once every spawned script task has ended.
    pub async fn settle(&self) {
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.tasks.reopen();
    }

    pub fn create_sprite(&self, name: Option<&str>) -> EntityId {
        let (id, name) = {
            let mut world = self.world_mut();
            let id = world.create_sprite(name);
            let name = world.entity(id).map(|entity| entity.name.clone()).unwrap_or_default();
            (id, name)
        };
        debug!(entity = %id, %name, "sprite created");
        self.log(KernelEvent::SpriteCreated { name });
        id
    }

    /// Operator "add sprite": each whitespace run becomes `_`. An empty name
    /// creates nothing.
    pub fn add_sprite(&self, raw_name: &str) -> Option<EntityId> {
        let mut name = String::with_capacity(raw_name.len());
        let mut in_whitespace = false;
        for ch in raw_name.chars() {
            if ch.is_whitespace() {
                if !in_whitespace {
                    name.push('_');
                }
                in_whitespace = true;
            } else {
                name.push(ch);
                in_whitespace = false;
            }
        }
        if name.is_empty() {
            return None;
        }
        Some(self.create_sprite(Some(&name)))
    }

    /// Cancels the previous session, commits the workspace and starts every
    /// `when flag clicked` script. Returns the number of scripts started.
    pub fn run(&self) -> usize {
        let token = CancellationToken::new();
        if let Some(previous) = self.inner.session.replace(Some(token.clone())) {
            previous.cancel();
        }
        self.world_mut().commit_workspace();

        let mut started = 0;
        for (id, document) in self.decode_documents() {
            for body in document.flag_bodies() {
                self.spawn_script(id, Rc::<[Block]>::from(body), token.clone());
                started += 1;
            }
        }
        info!(scripts = started, "run started");
        started
    }

    /// Cancels the session and puts every sprite back at the stage center.
    pub fn stop(&self) {
        if let Some(token) = self.inner.session.borrow_mut().take() {
            token.cancel();
        }
        self.world_mut().reset_sprites();
        info!("run stopped");
    }

    /// Operator broadcast. Receivers join the live session; when idle a new
    /// session is opened for them.
    pub fn broadcast(&self, message: &str) -> usize {
        self.log(KernelEvent::Broadcast { message: message.to_string() });
        let receivers = self.receivers(message);
        if receivers.is_empty() {
            debug!(%message, "broadcast has no receivers");
            return 0;
        }
        let token = self.live_session();
        self.spawn_receivers(message, receivers, &token)
    }

    /// Broadcast issued from a script; receivers share the sender's token.
    pub(crate) fn broadcast_under(&self, message: &str, token: &CancellationToken) -> usize {
        self.log(KernelEvent::Broadcast { message: message.to_string() });
        let receivers = self.receivers(message);
        self.spawn_receivers(message, receivers, token)
    }

    fn spawn_receivers(
        &self,
        message: &str,
        receivers: Vec<(EntityId, Rc<[Block]>)>,
        token: &CancellationToken,
    ) -> usize {
        let count = receivers.len();
        for (id, body) in receivers {
            self.spawn_script(id, body, token.clone());
        }
        debug!(%message, receivers = count, "broadcast delivered");
        count
    }

    fn receivers(&self, message: &str) -> Vec<(EntityId, Rc<[Block]>)> {
        self.decode_documents()
            .into_iter()
            .flat_map(|(id, document)| {
                document.receiver_bodies(message).map(|body| (id, Rc::<[Block]>::from(body))).collect::<Vec<_>>()
            })
            .collect()
    }

    fn live_session(&self) -> CancellationToken {
        let mut session = self.inner.session.borrow_mut();
        match session.as_ref() {
            Some(token) if !token.is_cancelled() => token.clone(),
            _ => {
                let token = CancellationToken::new();
                *session = Some(token.clone());
                token
            }
        }
    }

    /// Decodes every entity's stored document in dispatch order. Documents
    /// that fail to decode are reported and skipped.
    fn decode_documents(&self) -> Vec<(EntityId, ScriptDocument)> {
        let sources: Vec<_> = {
            let world = self.world();
            world
                .dispatch_order()
                .into_iter()
                .filter_map(|id| world.entity(id).map(|entity| (id, entity.name.clone(), entity.script.clone())))
                .collect()
        };
        let mut documents = Vec::with_capacity(sources.len());
        for (id, name, text) in sources {
            match ScriptDocument::parse(&text) {
                Ok(document) => documents.push((id, document)),
                Err(err) => {
                    warn!(entity = %id, "skipping script document: {err}");
                    self.log(KernelEvent::DocumentRejected { entity: name, error: err.to_string() });
                }
            }
        }
        documents
    }

    fn spawn_script(&self, subject: EntityId, blocks: Rc<[Block]>, token: CancellationToken) {
        let runtime = self.clone();
        self.inner.tasks.spawn_local(async move {
            if token.is_cancelled() {
                return;
            }
            let context = ScriptContext::new(runtime.clone(), subject, token);
            match context.execute(&blocks).await {
                Ok(()) => debug!(entity = %subject, "script finished"),
                Err(ScriptError::Cancelled) => debug!(entity = %subject, "script cancelled"),
                Err(err) => runtime.report_fault(subject, &err),
            }
        });
    }

    fn report_fault(&self, subject: EntityId, err: &ScriptError) {
        let entity = self
            .world()
            .entity(subject)
            .map(|entity| entity.name.clone())
            .unwrap_or_else(|| subject.to_string());
        error!(entity = %subject, "script fault: {err}");
        self.log(KernelEvent::ScriptFault { entity, error: err.to_string() });
    }
}
