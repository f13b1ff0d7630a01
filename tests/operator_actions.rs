use blockstage::config::AppConfig;
use blockstage::world::EntityId;
use blockstage::{PlayState, Runtime, RuntimeHost};
use glam::DVec2;
use tokio::task::LocalSet;

const SAY_HI: &str = r#"{"scripts":[{"trigger":{"opcode":"event_whenflagclicked"},"blocks":[{"opcode":"looks_say","message":"hi"}]}]}"#;

#[test]
fn fresh_runtime_has_stage_and_first_sprite() {
    let runtime = Runtime::new(&AppConfig::default());
    let world = runtime.world();
    assert_eq!(world.sprites().len(), 1);
    assert_eq!(world.sprites()[0].name, "Sprite1");
    assert_eq!(world.active_id(), EntityId::Sprite(0));
    assert_eq!(world.stage_entity().name, "Stage");
    drop(world);
    assert_eq!(runtime.play_state(), PlayState::Idle);
    assert_eq!(runtime.console_lines(), vec!["Kernel: Created sprite <Sprite1>".to_string()]);
}

#[test]
fn add_entity_replaces_whitespace_runs() {
    let runtime = Runtime::new(&AppConfig::default());
    runtime.take_console();
    let id = runtime.add_entity("  Space \t Cat ").expect("sprite created");
    assert_eq!(id, EntityId::Sprite(1));
    assert_eq!(runtime.world().entity(id).expect("sprite").name, "_Space_Cat_");
    assert_eq!(runtime.world().active_id(), id);
    assert!(runtime.add_entity("").is_none());
    assert_eq!(runtime.world().sprites().len(), 2);
    assert_eq!(runtime.console_lines(), vec!["Kernel: Created sprite <_Space_Cat_>".to_string()]);
}

#[test]
fn selecting_an_entity_saves_the_workspace() {
    let runtime = Runtime::new(&AppConfig::default());
    let first = runtime.world().active_id();
    runtime.edit_workspace("draft");
    assert!(runtime.select_entity(EntityId::Stage));
    assert_eq!(runtime.world().entity(first).expect("sprite").script, "draft");
    assert_eq!(runtime.world().workspace(), r#"{"scripts":[]}"#);
    assert!(runtime.select_entity(first));
    assert_eq!(runtime.world().workspace(), "draft");
    assert!(!runtime.select_entity(EntityId::Sprite(9)));
}

#[test]
fn dragging_clamps_to_the_stage_and_activates() {
    let runtime = Runtime::new(&AppConfig::default());
    let second = runtime.add_entity("Two").expect("sprite created");
    assert!(runtime.drag_entity(EntityId::Sprite(0), -50.0, 900.0));
    assert_eq!(runtime.world().active_id(), EntityId::Sprite(0));
    assert_eq!(runtime.world().entity(EntityId::Sprite(0)).expect("sprite").position, DVec2::new(0.0, 285.0));
    assert!(!runtime.drag_entity(EntityId::Stage, 10.0, 10.0));
    assert_eq!(runtime.world().entity(second).expect("sprite").position, DVec2::new(190.0, 142.5));
}

#[tokio::test(start_paused = true)]
async fn reselecting_the_active_sprite_keeps_unsaved_edits() {
    LocalSet::new()
        .run_until(async {
            let runtime = Runtime::new(&AppConfig::default());
            runtime.take_console();
            let sprite = runtime.world().active_id();
            runtime.edit_workspace(SAY_HI);
            assert!(runtime.select_entity(sprite));
            assert_eq!(runtime.world().workspace(), SAY_HI);

            assert_eq!(runtime.start_run(), 1);
            runtime.settle().await;
            assert_eq!(runtime.console_lines(), vec!["[Sprite1] hi".to_string()]);
            assert_eq!(runtime.world().entity(sprite).expect("sprite").script, SAY_HI);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn dragging_the_active_sprite_keeps_unsaved_edits() {
    LocalSet::new()
        .run_until(async {
            let runtime = Runtime::new(&AppConfig::default());
            runtime.take_console();
            let sprite = runtime.world().active_id();
            runtime.edit_workspace(SAY_HI);
            assert!(runtime.drag_entity(sprite, 10.0, 10.0));

            assert_eq!(runtime.start_run(), 1);
            runtime.settle().await;
            assert_eq!(runtime.console_lines(), vec!["[Sprite1] hi".to_string()]);
            assert_eq!(runtime.world().entity(sprite).expect("sprite").script, SAY_HI);
        })
        .await;
}
