use anyhow::{bail, Context, Result};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

use crate::world::{EntityId, Stage, World, DEFAULT_BACKDROP, DEFAULT_COSTUME, DEFAULT_DIRECTION};

/// On-disk form of a stage and its sprites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<ProjectStage>,
    #[serde(default = "default_backdrop")]
    pub backdrop: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
    #[serde(default = "empty_script")]
    pub stage_script: JsonValue,
    #[serde(default)]
    pub sprites: Vec<ProjectSprite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectStage {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSprite {
    pub name: String,
    /// Screen position; omitted means the stage center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 2]>,
    #[serde(default = "default_direction")]
    pub direction: f64,
    #[serde(default = "default_costume")]
    pub costume: String,
    #[serde(default = "empty_script")]
    pub script: JsonValue,
}

fn default_backdrop() -> String {
    DEFAULT_BACKDROP.to_string()
}

const fn default_direction() -> f64 {
    DEFAULT_DIRECTION
}

fn default_costume() -> String {
    DEFAULT_COSTUME.to_string()
}

fn empty_script() -> JsonValue {
    serde_json::json!({ "scripts": [] })
}

/// Documents that parse to a JSON object or array are embedded as JSON and come
/// back re-serialized. Any other text is embedded as a string and comes back
/// byte for byte.
fn embed_script(text: &str) -> JsonValue {
    match serde_json::from_str::<JsonValue>(text) {
        Ok(value @ (JsonValue::Object(_) | JsonValue::Array(_))) => value,
        _ => JsonValue::String(text.to_string()),
    }
}

fn extract_script(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Default for Project {
    fn default() -> Self {
        Self {
            stage: None,
            backdrop: default_backdrop(),
            active: None,
            stage_script: empty_script(),
            sprites: Vec::new(),
        }
    }
}

impl Project {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Reading project {}", path.display()))?;
        let project = serde_json::from_slice(&bytes)
            .with_context(|| format!("Parsing project {}", path.display()))?;
        Ok(project)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Creating project directory {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Serializing project")?;
        fs::write(path, json).with_context(|| format!("Writing project {}", path.display()))?;
        Ok(())
    }
}

impl World {
    /// Builds a world from a project. `fallback` sizes the stage when the
    /// project does not.
    pub fn from_project(project: &Project, fallback: Stage) -> Result<Self> {
        let stage = project.stage.map(|s| Stage::new(s.width, s.height)).unwrap_or(fallback);
        if stage.width <= 0.0 || stage.height <= 0.0 {
            bail!("Stage size must be positive, got {}x{}", stage.width, stage.height);
        }
        let mut world = World::new(stage);
        if !world.set_backdrop(&project.backdrop) {
            bail!("Unknown backdrop '{}'", project.backdrop);
        }
        world.set_script(EntityId::Stage, extract_script(&project.stage_script));

        for sprite in &project.sprites {
            let id = world.create_sprite(Some(&sprite.name));
            world.set_script(id, extract_script(&sprite.script));
            if world.costume_path(&sprite.costume).is_none() {
                bail!("Sprite '{}' uses unknown costume '{}'", sprite.name, sprite.costume);
            }
            if let Some(entity) = world.entity_mut(id) {
                if let Some([x, y]) = sprite.position {
                    entity.position = DVec2::new(x, y);
                }
                entity.direction = sprite.direction;
                entity.costume = sprite.costume.clone();
            }
        }

        let active = match project.active.as_deref() {
            Some(raw) => EntityId::parse(raw).with_context(|| format!("Invalid active entity '{raw}'"))?,
            None => world.sprites().first().map(|entity| entity.id).unwrap_or(EntityId::Stage),
        };
        if !world.set_active(active) {
            bail!("Active entity {active} does not exist");
        }
        Ok(world)
    }

    /// Snapshot of the world, including uncommitted workspace edits.
    pub fn export_project(&self) -> Project {
        let mut world = self.clone();
        world.commit_workspace();
        let stage = world.stage();
        Project {
            stage: Some(ProjectStage { width: stage.width, height: stage.height }),
            backdrop: world.backdrop().to_string(),
            active: Some(world.active_id().to_string()),
            stage_script: embed_script(&world.stage_entity().script),
            sprites: world
                .sprites()
                .iter()
                .map(|entity| ProjectSprite {
                    name: entity.name.clone(),
                    position: Some([entity.position.x, entity.position.y]),
                    direction: entity.direction,
                    costume: entity.costume.clone(),
                    script: embed_script(&entity.script),
                })
                .collect(),
        }
    }
}
