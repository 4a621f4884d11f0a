use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter};

use super::database::{InteractionDraft, InteractionOption, InteractionStatus, TrackedInteraction};

pub const RESULTS_PER_PAGE: usize = 20;

fn tally_lines(options: &[InteractionOption], counts: &[usize]) -> String {
    options
        .iter()
        .zip(counts)
        .map(|(option, count)| format!("{} {} --- {} votes", option.emoji, option.label, count))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full recount of every option. Safe to call after each mutation.
pub fn tally(interaction: &TrackedInteraction) -> String {
    tally_lines(&interaction.options, &interaction.counts())
}

/// Message body of a freshly created interaction, every count at zero.
pub fn draft_tally(draft: &InteractionDraft) -> String {
    tally_lines(&draft.options, &vec![0; draft.options.len()])
}

pub fn draft_embed(draft: &InteractionDraft) -> CreateEmbed {
    CreateEmbed::new()
        .title(&draft.title)
        .description(draft_tally(draft))
        .colour(draft.kind.colour())
}

pub fn title(interaction: &TrackedInteraction) -> String {
    match interaction.status {
        InteractionStatus::Open => interaction.title.clone(),
        InteractionStatus::Closed | InteractionStatus::Archived => {
            format!("{} (closed)", interaction.title)
        }
    }
}

pub fn embed(interaction: &TrackedInteraction) -> CreateEmbed {
    CreateEmbed::new()
        .title(title(interaction))
        .description(tally(interaction))
        .colour(interaction.kind.colour())
        .footer(CreateEmbedFooter::new(
            interaction.kind.footer().render(interaction.message_id),
        ))
}

/// Participant listing split into pages of `per_page` lines.
pub fn result_pages(interaction: &TrackedInteraction, per_page: usize) -> Vec<String> {
    let mut participants: Vec<u64> = interaction.choices.keys().copied().collect();
    participants.sort_unstable();

    let lines: Vec<String> = participants
        .into_iter()
        .map(|id| format!("<@{}> --- {}", id, interaction.choice_labels(id).join(", ")))
        .collect();

    if lines.is_empty() {
        return vec!["No votes yet.".to_string()];
    }

    lines
        .chunks(per_page.max(1))
        .map(|chunk| chunk.join("\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::{NO, YES};
    use crate::modules::interactions::database::{ChoiceMode, InteractionKind};

    fn interaction(labels: &[&str], mode: ChoiceMode) -> TrackedInteraction {
        let draft = InteractionDraft::new(
            InteractionKind::Poll,
            mode,
            "Pizza?",
            labels.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        TrackedInteraction::from_draft(55, 7, 1, 2, draft)
    }

    #[test]
    fn tally_format_matches_the_message_layout() {
        let mut poll = interaction(&["Oui", "Non"], ChoiceMode::Single);
        poll.apply_choice(1, YES).unwrap();
        assert_eq!(tally(&poll), format!("{YES} Oui --- 1 votes\n{NO} Non --- 0 votes"));

        poll.apply_choice(1, NO).unwrap();
        assert_eq!(tally(&poll), format!("{YES} Oui --- 0 votes\n{NO} Non --- 1 votes"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut poll = interaction(&["a", "b", "c"], ChoiceMode::Multi);
        poll.apply_choice(1, "1️⃣").unwrap();
        poll.apply_choice(2, "3️⃣").unwrap();
        assert_eq!(tally(&poll), tally(&poll));
    }

    #[test]
    fn draft_starts_at_zero() {
        let poll = interaction(&["a", "b"], ChoiceMode::Single);
        assert_eq!(tally(&poll), "1️⃣ a --- 0 votes\n2️⃣ b --- 0 votes");
    }

    #[test]
    fn closed_title_keeps_the_question() {
        let mut poll = interaction(&["a"], ChoiceMode::Single);
        poll.status = InteractionStatus::Closed;
        assert_eq!(title(&poll), "Pizza? (closed)");
    }

    #[test]
    fn results_are_paginated() {
        let mut poll = interaction(&["Oui", "Non"], ChoiceMode::Single);
        for participant in 0..45 {
            poll.apply_choice(participant, YES).unwrap();
        }
        let pages = result_pages(&poll, RESULTS_PER_PAGE);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].lines().count(), 20);
        assert_eq!(pages[2].lines().count(), 5);
        assert!(pages[0].starts_with("<@0> --- Oui"));
    }

    #[test]
    fn empty_results_have_one_page() {
        let poll = interaction(&["a"], ChoiceMode::Single);
        assert_eq!(result_pages(&poll, RESULTS_PER_PAGE), vec!["No votes yet."]);
    }
}
