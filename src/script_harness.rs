//! Deterministic fixture runner: plays timed operator actions against a
//! project on a paused clock and reports what happened.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::task::LocalSet;
use tokio::time::Instant;

use crate::config::AppConfig;
use crate::project::Project;
use crate::runtime::Runtime;
use crate::runtime_host::{PlayState, RuntimeHost};
use crate::world::EntityId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessFixture {
    #[serde(default)]
    pub project: Project,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_actions")]
    pub actions: Vec<TimedAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimedAction {
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: HarnessAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HarnessAction {
    Run,
    Stop,
    Broadcast { message: String },
    AddSprite { name: String },
    Drag { entity: String, x: f64, y: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessOutput {
    pub duration_ms: u64,
    pub play_state: String,
    pub backdrop: String,
    pub console: Vec<String>,
    pub final_entities: Vec<EntitySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySummary {
    pub id: String,
    pub name: String,
    pub position: [f64; 2],
    pub direction: f64,
}

const fn default_duration_ms() -> u64 {
    1_000
}

fn default_actions() -> Vec<TimedAction> {
    vec![TimedAction { at_ms: 0, action: HarnessAction::Run }]
}

pub fn load_fixture<P: AsRef<Path>>(path: P) -> Result<HarnessFixture> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("opening fixture '{}'", path.as_ref().display()))?;
    serde_json::from_reader(file).with_context(|| "parsing fixture JSON")
}

pub fn run_fixture(fixture: &HarnessFixture) -> Result<HarnessOutput> {
    run_fixture_with_config(fixture, &AppConfig::default())
}

/// Runs on a private current-thread runtime whose clock only advances when
/// every script is waiting, so output does not depend on wall time.
pub fn run_fixture_with_config(fixture: &HarnessFixture, config: &AppConfig) -> Result<HarnessOutput> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .context("building harness runtime")?;
    LocalSet::new().block_on(&rt, drive(fixture, config))
}

async fn drive(fixture: &HarnessFixture, config: &AppConfig) -> Result<HarnessOutput> {
    let runtime = Runtime::from_project(config, &fixture.project)?;
    let start = Instant::now();

    let mut actions: Vec<_> = fixture.actions.iter().filter(|a| a.at_ms <= fixture.duration_ms).collect();
    actions.sort_by_key(|a| a.at_ms);
    for timed in actions {
        tokio::time::sleep_until(start + Duration::from_millis(timed.at_ms)).await;
        apply(&runtime, &timed.action)?;
    }
    tokio::time::sleep_until(start + Duration::from_millis(fixture.duration_ms)).await;

    let output = summarize(&runtime, fixture.duration_ms);
    runtime.stop();
    runtime.settle().await;
    Ok(output)
}

fn apply(host: &impl RuntimeHost, action: &HarnessAction) -> Result<()> {
    match action {
        HarnessAction::Run => {
            host.start_run();
        }
        HarnessAction::Stop => host.stop_run(),
        HarnessAction::Broadcast { message } => {
            host.trigger_broadcast(message);
        }
        HarnessAction::AddSprite { name } => {
            host.add_entity(name).ok_or_else(|| anyhow!("sprite name must not be empty"))?;
        }
        HarnessAction::Drag { entity, x, y } => {
            let id = EntityId::parse(entity).ok_or_else(|| anyhow!("invalid entity id '{entity}'"))?;
            if !host.drag_entity(id, *x, *y) {
                return Err(anyhow!("entity {id} cannot be dragged"));
            }
        }
    }
    Ok(())
}

fn round(value: f64) -> f64 {
    let rounded = (value * 1_000.0).round() / 1_000.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn summarize(runtime: &Runtime, duration_ms: u64) -> HarnessOutput {
    let play_state = match runtime.play_state() {
        PlayState::Idle => "idle",
        PlayState::Running => "running",
    };
    let world = runtime.world();
    let final_entities = world
        .sprites()
        .iter()
        .map(|entity| EntitySummary {
            id: entity.id.to_string(),
            name: entity.name.clone(),
            position: [round(entity.position.x), round(entity.position.y)],
            direction: round(entity.direction),
        })
        .collect();
    HarnessOutput {
        duration_ms,
        play_state: play_state.to_string(),
        backdrop: world.backdrop().to_string(),
        console: runtime.console_lines(),
        final_entities,
    }
}
