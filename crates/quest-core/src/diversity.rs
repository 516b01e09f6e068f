//! Category-diverse top-N selection.

use std::collections::HashSet;

use crate::model::ScoredQuest;

/// Pick up to `count` quests from a score-sorted list, preferring one quest
/// per category.
///
/// First pass walks the list once, taking each quest whose category is not
/// yet used. If that leaves slots open (fewer distinct categories than
/// `count`), a second pass fills them in score order regardless of category.
/// A quest id is never taken twice.
pub fn select_diverse(sorted: &[ScoredQuest], count: usize) -> Vec<ScoredQuest> {
    let mut selected: Vec<ScoredQuest> = Vec::with_capacity(count);
    let mut chosen_ids: HashSet<&str> = HashSet::new();
    let mut used_categories = HashSet::new();

    for candidate in sorted {
        if selected.len() >= count {
            break;
        }
        if used_categories.contains(&candidate.quest.category)
            || chosen_ids.contains(candidate.quest.id.as_str())
        {
            continue;
        }
        used_categories.insert(candidate.quest.category);
        chosen_ids.insert(candidate.quest.id.as_str());
        selected.push(candidate.clone());
    }

    for candidate in sorted {
        if selected.len() >= count {
            break;
        }
        if chosen_ids.insert(candidate.quest.id.as_str()) {
            selected.push(candidate.clone());
        }
    }

    selected
}
