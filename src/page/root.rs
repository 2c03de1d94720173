//! Composition of the showcase page: its blocks, the model each section
//! mounts and the order in which the flows run.

use std::{future::Future, pin::Pin};

use crate::{
    context::InitContext,
    flow::{self, FlowConsturctor, GraphicsFlow, WindowSettings},
    interaction::{InteractionMode, ModelConfiguration, TransformOptions},
    page::{
        Block, PageLayout,
        hero::Hero,
        navbar::{NavItem, NavigationBar},
        section::{SectionDescriptor, SectionView},
    },
};

pub const HERO_ID: &str = "hero";
pub const HERO_TITLE: &str = "Welcome to AI Labs";
pub const HERO_SUBTITLE: &str = "Experience the future of interactive AI models.";

/// Pick id of the first section's model; the others follow consecutively.
pub const SECTION_PICK_BASE: u32 = 1;

/// State shared by every flow of the page.
#[derive(Debug, Default)]
pub struct ShowcaseState {
    /// Id of the block under the middle of the window.
    pub active_block: Option<String>,
}

/// The three sections in page order.
pub fn showcase_sections() -> anyhow::Result<Vec<SectionDescriptor>> {
    Ok(vec![
        SectionDescriptor {
            id: "section1".into(),
            title: "Your AI Robot".into(),
            description: "Interact and chat with your AI companion.".into(),
            side_text: "An advanced voice AI that understands and learns.".into(),
            model: ModelConfiguration::new(
                "cute_robot.glb",
                InteractionMode::Vibrate,
                true,
                0.8,
                [0.0, -1.0, 0.0],
            )?,
        },
        SectionDescriptor {
            id: "section2".into(),
            title: "AI Assistant".into(),
            description: "An intelligent assistant to help you daily.".into(),
            side_text: "Assisting you with smart automation.".into(),
            model: ModelConfiguration::new(
                "second_model.glb",
                InteractionMode::Rotate,
                false,
                1.0,
                [0.0, 0.0, 0.0],
            )?,
        },
        SectionDescriptor {
            id: "section3".into(),
            title: "Advanced AI".into(),
            description: "A fully interactive AI with real-time animation.".into(),
            side_text: "Bringing AI intelligence to life.".into(),
            model: ModelConfiguration::new(
                "animated_character.glb",
                InteractionMode::Animate,
                false,
                1.2,
                [0.0, -1.0, 0.0],
            )?,
        },
    ])
}

pub fn nav_items() -> Vec<NavItem> {
    vec![
        NavItem::new("section1", "AI Robot"),
        NavItem::new("section2", "AI Assistant"),
        NavItem::new("section3", "Advanced AI"),
    ]
}

/// Hero followed by the sections, each one window tall.
pub fn page_layout(sections: &[SectionDescriptor]) -> PageLayout {
    let hero = Block::new(HERO_ID, HERO_TITLE, 1.0);
    let blocks = sections
        .iter()
        .map(|section| Block::new(section.id.clone(), section.title.clone(), 1.0));
    PageLayout::new(std::iter::once(hero).chain(blocks).collect())
}

fn constructor<F, Fut>(build: F) -> FlowConsturctor<ShowcaseState>
where
    F: FnOnce(InitContext) -> Fut + 'static,
    Fut: Future<Output = Box<dyn GraphicsFlow<ShowcaseState>>> + 'static,
{
    Box::new(
        move |ctx: InitContext| -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<ShowcaseState>>>>> {
            Box::pin(build(ctx))
        },
    )
}

/// Flow constructors in dispatch order: navbar, hero, then the sections.
pub fn flows(options: TransformOptions) -> anyhow::Result<Vec<FlowConsturctor<ShowcaseState>>> {
    let sections = showcase_sections()?;
    let layout = page_layout(&sections);

    let mut constructors = vec![
        constructor(move |ctx| async move {
            Box::new(NavigationBar::new(ctx, nav_items(), layout).await) as Box<dyn GraphicsFlow<ShowcaseState>>
        }),
        constructor(|ctx| async move {
            Box::new(Hero::new(ctx, HERO_ID, HERO_TITLE, HERO_SUBTITLE).await)
                as Box<dyn GraphicsFlow<ShowcaseState>>
        }),
    ];
    constructors.extend(sections.into_iter().enumerate().map(|(i, descriptor)| {
        let pick_id = SECTION_PICK_BASE + i as u32;
        constructor(move |ctx| async move {
            Box::new(SectionView::new(ctx, descriptor, options, pick_id).await)
                as Box<dyn GraphicsFlow<ShowcaseState>>
        })
    }));
    Ok(constructors)
}

/// Builds the page and runs it until the window closes.
pub fn run(options: TransformOptions, settings: WindowSettings) -> anyhow::Result<()> {
    flow::run_with(flows(options)?, settings)
}
