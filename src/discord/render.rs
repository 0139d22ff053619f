//! Cards and navigator controls as Discord builders.

use poise::serenity_prelude as serenity;
use uuid::Uuid;

use crate::navigator::{NavEvent, Navigator, Render};
use crate::recap::{Card, Page};

/// Discord accepts at most this many embeds per message
const MAX_EMBEDS: usize = 10;
/// ...and this many options per select menu
const MAX_SELECT_OPTIONS: usize = 25;

const ID_PREFIX: &str = "recap";

pub fn card_embed(card: &Card) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(&card.title)
        .color(card.color);
    if let Some(description) = &card.description {
        embed = embed.description(description);
    }
    if let Some(url) = &card.thumbnail {
        embed = embed.thumbnail(url);
    }
    for field in &card.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    embed
}

pub fn page_embeds(page: &Page) -> Vec<serenity::CreateEmbed> {
    page.cards.iter().take(MAX_EMBEDS).map(card_embed).collect()
}

fn custom_id(session: Uuid, action: &str) -> String {
    format!("{}:{}:{}", ID_PREFIX, session, action)
}

/// Map a component interaction back to a navigation event.
///
/// Returns `None` for ids that belong to another session or are malformed.
pub fn parse_nav_event(session: Uuid, custom_id: &str, values: &[String]) -> Option<NavEvent> {
    let mut parts = custom_id.splitn(3, ':');
    if parts.next()? != ID_PREFIX {
        return None;
    }
    if parts.next()?.parse::<Uuid>().ok()? != session {
        return None;
    }
    match parts.next()? {
        "prev" => Some(NavEvent::Previous),
        "next" => Some(NavEvent::Next),
        "reset" => Some(NavEvent::Reset),
        "jump" => values
            .first()
            .and_then(|v| v.parse::<usize>().ok())
            .map(NavEvent::JumpTo),
        _ => None,
    }
}

/// Week picker entries as `(label, page index)`, limited to the most recent pages
pub fn jump_choices(navigator: &Navigator) -> Vec<(String, usize)> {
    let pages = navigator.pages();
    let start = pages.len().saturating_sub(MAX_SELECT_OPTIONS);
    pages
        .iter()
        .enumerate()
        .skip(start)
        .map(|(index, page)| (page.label(), index))
        .collect()
}

pub fn navigator_components(
    session: Uuid,
    navigator: &Navigator,
    render: Render,
) -> Vec<serenity::CreateActionRow> {
    let buttons = vec![
        serenity::CreateButton::new(custom_id(session, "prev"))
            .label("⬅️ Previous")
            .style(serenity::ButtonStyle::Secondary)
            .disabled(render.previous_disabled),
        serenity::CreateButton::new(custom_id(session, "reset"))
            .label("⏹ Latest")
            .style(serenity::ButtonStyle::Primary),
        serenity::CreateButton::new(custom_id(session, "next"))
            .label("Next ➡️")
            .style(serenity::ButtonStyle::Secondary)
            .disabled(render.next_disabled),
    ];

    let options = jump_choices(navigator)
        .into_iter()
        .map(|(label, index)| {
            serenity::CreateSelectMenuOption::new(label, index.to_string())
                .default_selection(index == render.index)
        })
        .collect();
    let select = serenity::CreateSelectMenu::new(
        custom_id(session, "jump"),
        serenity::CreateSelectMenuKind::String { options },
    )
    .placeholder("Jump to week…");

    vec![
        serenity::CreateActionRow::Buttons(buttons),
        serenity::CreateActionRow::SelectMenu(select),
    ]
}
