use std::time::Duration;

use cgmath::Vector2;
use labs_showcase::{
    interaction::{FrameInput, InteractionMode, InteractiveModel, TransformOptions},
    page::{
        Page, SCROLL_DURATION,
        navbar::{BUTTON_PICK_BASE, button_rects},
        root::{HERO_ID, SECTION_PICK_BASE, nav_items, page_layout, showcase_sections},
    },
};

const WINDOW: [f32; 2] = [1280.0, 800.0];

fn showcase_page() -> Page {
    let sections = showcase_sections().expect("literal sections are valid");
    Page::new(page_layout(&sections), WINDOW)
}

#[test]
fn sections_carry_their_models() {
    let sections = showcase_sections().unwrap();
    let summary: Vec<_> = sections
        .iter()
        .map(|s| {
            (
                s.id.as_str(),
                s.model.asset_path(),
                s.model.interaction_mode(),
                s.model.follow_cursor(),
                s.model.scale(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("section1", "cute_robot.glb", InteractionMode::Vibrate, true, 0.8),
            ("section2", "second_model.glb", InteractionMode::Rotate, false, 1.0),
            ("section3", "animated_character.glb", InteractionMode::Animate, false, 1.2),
        ]
    );
}

#[test]
fn every_nav_item_targets_a_page_block() {
    let page = showcase_page();
    let layout = page.layout();
    assert_eq!(layout.blocks()[0].id, HERO_ID);
    assert_eq!(layout.blocks().len(), 4);
    for item in nav_items() {
        assert!(layout.index_of(&item.target).is_some(), "{} has no block", item.target);
    }
}

#[test]
fn pick_ids_do_not_collide() {
    let sections = showcase_sections().unwrap().len() as u32;
    let buttons = button_rects(WINDOW[0], nav_items().len()).len() as u32;
    let section_ids = SECTION_PICK_BASE..SECTION_PICK_BASE + sections;
    let button_ids = BUTTON_PICK_BASE..BUTTON_PICK_BASE + buttons;
    assert!(SECTION_PICK_BASE > 0);
    assert!(section_ids.end <= button_ids.start);
}

#[test]
fn navigation_drives_model_height_through_scroll() {
    let sections = showcase_sections().unwrap();
    let mut page = showcase_page();
    let mut model = InteractiveModel::new(sections[1].model.clone(), TransformOptions::default());

    let frame = |ms: u64| FrameInput {
        pointer: Vector2::new(0.0, 0.0),
        elapsed: Duration::from_millis(ms),
        dt: Duration::from_millis(16),
    };

    assert_eq!(model.on_frame(&frame(0)).position.y, -1.0);

    assert!(page.navigate_to("section2", Duration::ZERO));
    page.tick(SCROLL_DURATION);
    assert_eq!(page.position(), 2.0 * WINDOW[1]);
    assert_eq!(page.active_block().map(|b| b.id.as_str()), Some("section2"));

    model.on_scroll(page.position());
    let y = model.on_frame(&frame(700)).position.y;
    assert!((y - (2.0 * WINDOW[1] / 500.0 - 1.0)).abs() < 1e-5);
}

#[test]
fn section_blocks_stack_one_window_apart() {
    let mut page = showcase_page();
    page.scroll_by(WINDOW[1] / 2.0);
    let first = page.block_rect("section1").unwrap();
    let third = page.block_rect("section3").unwrap();
    assert_eq!(first.y, WINDOW[1] / 2.0);
    assert_eq!(third.y - first.y, 2.0 * WINDOW[1]);
    assert_eq!(page.max_scroll(), 3.0 * WINDOW[1]);
}
