use blockstage::config::AppConfig;
use blockstage::project::Project;
use blockstage::world::EntityId;
use blockstage::Runtime;
use glam::DVec2;

const SCRIPT: &str = r#"{"scripts":[{"trigger":{"opcode":"event_whenflagclicked"},"blocks":[{"opcode":"looks_say","message":"hi"}]}]}"#;

#[test]
fn project_roundtrip_preserves_sprites_and_scripts() {
    let config = AppConfig::default();
    let runtime = Runtime::new(&config);
    let cat = runtime.add_sprite("Cat").expect("cat created");
    {
        let mut world = runtime.world_mut();
        world.set_script(cat, SCRIPT);
        world.drag_to(cat, 40.0, 60.0);
        world.turn(cat, 45.0);
        world.set_backdrop("Neon Grid");
        world.set_script(EntityId::Stage, "{ half a document");
    }

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("demo.json");
    runtime.export_project().save_to_path(&path).expect("project save should succeed");

    let loaded = Project::load_from_path(&path).expect("project load should succeed");
    assert_eq!(loaded.sprites.len(), 2);
    let restored = Runtime::from_project(&config, &loaded).expect("project builds a runtime");
    let world = restored.world();

    assert_eq!(world.backdrop(), "Neon Grid");
    assert_eq!(world.active_id(), cat);
    assert_eq!(world.stage_entity().script, "{ half a document");
    let entity = world.entity(cat).expect("cat restored");
    assert_eq!(entity.name, "Cat");
    assert_eq!(entity.position, DVec2::new(40.0, 60.0));
    assert_eq!(entity.direction, 135.0);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&entity.script).expect("script is json"),
        serde_json::from_str::<serde_json::Value>(SCRIPT).expect("source is json"),
    );
    assert!(restored.console_lines().is_empty(), "loading a project logs no creations");
}

#[test]
fn loading_rejects_unknown_backdrops_and_missing_files() {
    let config = AppConfig::default();
    let project: Project = serde_json::from_str(r#"{ "backdrop": "Mars" }"#).expect("parses");
    let err = Runtime::from_project(&config, &project).err().expect("unknown backdrop fails");
    assert!(err.to_string().contains("Unknown backdrop"));

    let dir = tempfile::tempdir().expect("temp dir");
    assert!(Project::load_from_path(dir.path().join("missing.json")).is_err());
}

#[test]
fn demo_project_loads_into_a_runtime() {
    let project = Project::load_from_path("demos/orbit.json").expect("demo project parses");
    let runtime = Runtime::from_project(&AppConfig::default(), &project).expect("demo project builds");
    let world = runtime.world();
    let names: Vec<_> = world.sprites().iter().map(|entity| entity.name.as_str()).collect();
    assert_eq!(names, ["Orbiter", "Beacon"]);
    assert_eq!(world.entity(EntityId::Sprite(1)).expect("beacon").position, DVec2::new(60.0, 60.0));
    assert_eq!(world.active_id(), EntityId::Sprite(0));
}
