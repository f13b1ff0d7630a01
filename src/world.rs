use glam::DVec2;
use std::collections::BTreeMap;
use std::fmt;

use crate::blocks::EMPTY_DOCUMENT;
use crate::config::StageConfig;

pub const DEFAULT_DIRECTION: f64 = 90.0;
pub const DEFAULT_COSTUME: &str = "star";
pub const DEFAULT_BACKDROP: &str = "Deep Space";

const STAR_PATH: &str = "M50 15 L58 42 L85 42 L63 58 L71 85 L50 68 L29 85 L37 58 L15 42 L42 42 Z";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Stage,
    Sprite(usize),
}

impl EntityId {
    /// Accepts the display form: `STAGE` or `s_<index>`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == "STAGE" {
            return Some(EntityId::Stage);
        }
        raw.strip_prefix("s_").and_then(|index| index.parse().ok()).map(EntityId::Sprite)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Stage => f.write_str("STAGE"),
            EntityId::Sprite(index) => write!(f, "s_{index}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    pub width: f64,
    pub height: f64,
}

impl Stage {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn clamp(&self, point: DVec2) -> DVec2 {
        point.clamp(DVec2::ZERO, DVec2::new(self.width, self.height))
    }
}

impl From<&StageConfig> for Stage {
    fn from(config: &StageConfig) -> Self {
        Stage::new(config.width, config.height)
    }
}

/// A sprite or the stage background.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    /// Screen coordinates: origin top-left, y grows downward.
    pub position: DVec2,
    /// Degrees; 90 points right, 0 points up.
    pub direction: f64,
    pub costume: String,
    /// Serialized script document. Opaque until a run or broadcast decodes it.
    pub script: String,
    pub is_stage: bool,
}

impl Entity {
    fn stage(stage: &Stage) -> Self {
        Self {
            id: EntityId::Stage,
            name: "Stage".to_string(),
            position: stage.center(),
            direction: DEFAULT_DIRECTION,
            costume: String::new(),
            script: EMPTY_DOCUMENT.to_string(),
            is_stage: true,
        }
    }

    fn sprite(index: usize, name: String, stage: &Stage) -> Self {
        Self {
            id: EntityId::Sprite(index),
            name,
            position: stage.center(),
            direction: DEFAULT_DIRECTION,
            costume: DEFAULT_COSTUME.to_string(),
            script: EMPTY_DOCUMENT.to_string(),
            is_stage: false,
        }
    }
}

/// Shared state every script sees: the stage, its entities, and the editor buffer.
#[derive(Debug, Clone)]
pub struct World {
    stage: Stage,
    sprites: Vec<Entity>,
    stage_entity: Entity,
    active: EntityId,
    workspace: String,
    backdrops: BTreeMap<String, String>,
    current_backdrop: String,
    costumes: BTreeMap<String, String>,
}

impl World {
    pub fn new(stage: Stage) -> Self {
        let stage_entity = Entity::stage(&stage);
        let workspace = stage_entity.script.clone();
        let backdrops = [
            ("Void", "#000000"),
            ("Deep Space", "linear-gradient(45deg, #020617 0%, #1e1b4b 100%)"),
            (
                "Neon Grid",
                "linear-gradient(rgba(99, 102, 241, 0.1) 1px, transparent 1px), \
                 linear-gradient(90deg, rgba(99, 102, 241, 0.1) 1px, transparent 1px), #020617",
            ),
        ]
        .into_iter()
        .map(|(name, paint)| (name.to_string(), paint.to_string()))
        .collect();
        let costumes = [(DEFAULT_COSTUME.to_string(), STAR_PATH.to_string())].into_iter().collect();
        Self {
            stage,
            sprites: Vec::new(),
            stage_entity,
            active: EntityId::Stage,
            workspace,
            backdrops,
            current_backdrop: DEFAULT_BACKDROP.to_string(),
            costumes,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn sprites(&self) -> &[Entity] {
        &self.sprites
    }

    pub fn stage_entity(&self) -> &Entity {
        &self.stage_entity
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        match id {
            EntityId::Stage => Some(&self.stage_entity),
            EntityId::Sprite(_) => self.sprites.iter().find(|entity| entity.id == id),
        }
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match id {
            EntityId::Stage => Some(&mut self.stage_entity),
            EntityId::Sprite(_) => self.sprites.iter_mut().find(|entity| entity.id == id),
        }
    }

    /// Sprites in insertion order, then the stage.
    pub fn dispatch_order(&self) -> Vec<EntityId> {
        self.sprites.iter().map(|entity| entity.id).chain(std::iter::once(EntityId::Stage)).collect()
    }

    /// Adds a sprite at the stage center and makes it the active entity.
    pub fn create_sprite(&mut self, name: Option<&str>) -> EntityId {
        let index = self.sprites.len();
        let name = name.map(str::to_string).unwrap_or_else(|| format!("Sprite{}", index + 1));
        let entity = Entity::sprite(index, name, &self.stage);
        let id = entity.id;
        self.sprites.push(entity);
        self.set_active(id);
        id
    }

    pub fn active_id(&self) -> EntityId {
        self.active
    }

    /// Saves the workspace into the outgoing entity, then loads the incoming
    /// one. Re-selecting the active entity keeps the buffer as edited.
    pub fn set_active(&mut self, id: EntityId) -> bool {
        if self.entity(id).is_none() {
            return false;
        }
        self.commit_workspace();
        self.active = id;
        if let Some(entity) = self.entity(id) {
            self.workspace = entity.script.clone();
        }
        true
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn set_workspace(&mut self, document: impl Into<String>) {
        self.workspace = document.into();
    }

    /// Persists the workspace buffer into the active entity.
    pub fn commit_workspace(&mut self) {
        let document = self.workspace.clone();
        if let Some(entity) = self.entity_mut(self.active) {
            entity.script = document;
        }
    }

    /// Replaces an entity's stored document. When the entity is active the
    /// workspace is reloaded too.
    pub fn set_script(&mut self, id: EntityId, document: impl Into<String>) -> bool {
        let document = document.into();
        let Some(entity) = self.entity_mut(id) else {
            return false;
        };
        entity.script = document.clone();
        if self.active == id {
            self.workspace = document;
        }
        true
    }

    /// Positions a sprite from a pointer drag; the only clamped motion.
    pub fn drag_to(&mut self, id: EntityId, x: f64, y: f64) -> bool {
        let target = self.stage.clamp(DVec2::new(x, y));
        match self.entity_mut(id) {
            Some(entity) if !entity.is_stage => entity.position = target,
            _ => return false,
        }
        self.set_active(id)
    }

    /// Moves along the heading. The result is not clamped to the stage.
    pub fn move_steps(&mut self, id: EntityId, steps: f64) -> bool {
        match self.entity_mut(id) {
            Some(entity) if !entity.is_stage => {
                let radians = (entity.direction - 90.0).to_radians();
                entity.position += DVec2::new(radians.cos(), radians.sin()) * steps;
                true
            }
            _ => false,
        }
    }

    pub fn turn(&mut self, id: EntityId, degrees: f64) -> bool {
        match self.entity_mut(id) {
            Some(entity) if !entity.is_stage => {
                entity.direction += degrees;
                true
            }
            _ => false,
        }
    }

    /// Jumps to a point given in stage-centered coordinates (y up).
    pub fn go_to_xy(&mut self, id: EntityId, x: f64, y: f64) -> bool {
        let center = self.stage.center();
        match self.entity_mut(id) {
            Some(entity) if !entity.is_stage => {
                entity.position = DVec2::new(x + center.x, center.y - y);
                true
            }
            _ => false,
        }
    }

    /// Returns every sprite to the stage center facing right.
    pub fn reset_sprites(&mut self) {
        let center = self.stage.center();
        for entity in &mut self.sprites {
            entity.position = center;
            entity.direction = DEFAULT_DIRECTION;
        }
    }

    pub fn backdrop(&self) -> &str {
        &self.current_backdrop
    }

    pub fn backdrop_paint(&self) -> Option<&str> {
        self.backdrops.get(&self.current_backdrop).map(String::as_str)
    }

    pub fn backdrop_names(&self) -> impl Iterator<Item = &str> {
        self.backdrops.keys().map(String::as_str)
    }

    pub fn set_backdrop(&mut self, name: &str) -> bool {
        if !self.backdrops.contains_key(name) {
            return false;
        }
        self.current_backdrop = name.to_string();
        true
    }

    pub fn costume_path(&self, costume: &str) -> Option<&str> {
        self.costumes.get(costume).map(String::as_str)
    }
}
