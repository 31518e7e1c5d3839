//! Policy-gated field merge.
//!
//! Each mergeable profile field is one row of FIELD_RULES: a switch read
//! from the policy and a function that copies the post-session value onto
//! the profile being built. Rows run in table order. Adding a field means
//! adding a row, never another branch in the merge loop.

use crate::{
    config::KeepConfig,
    counters::{validate_counters, Discrepancy},
    profile::ProfileSnapshot,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Level,
    Skills,
    Stats,
    Encyclopedia,
    QuestProgress,
    SurvivorClass,
    Experience,
}

/// Scratch space a rule may write findings into.
#[derive(Debug, Default)]
pub struct MergeNotes {
    pub discrepancies: Vec<Discrepancy>,
}

pub struct FieldRule {
    pub field: ProfileField,
    pub enabled: fn(&KeepConfig) -> bool,
    pub apply: fn(&mut ProfileSnapshot, &ProfileSnapshot, &mut MergeNotes),
}

pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: ProfileField::Level,
        enabled: |c| c.profile_saving.level,
        apply: |pre, post, _| pre.info.level = post.info.level,
    },
    FieldRule {
        field: ProfileField::Skills,
        enabled: |c| c.profile_saving.skills,
        apply: |pre, post, _| pre.skills = post.skills.clone(),
    },
    FieldRule {
        field: ProfileField::Stats,
        enabled: |c| c.profile_saving.stats,
        apply: |pre, post, _| pre.stats.eft = post.stats.eft.clone(),
    },
    FieldRule {
        field: ProfileField::Encyclopedia,
        enabled: |c| c.profile_saving.encyclopedia,
        apply: |pre, post, _| pre.encyclopedia = post.encyclopedia.clone(),
    },
    FieldRule {
        field: ProfileField::QuestProgress,
        // Dropping quest items must also roll back the progress they made.
        enabled: |c| c.profile_saving.quest_progress || !c.keep_quest_items,
        apply: apply_quest_progress,
    },
    FieldRule {
        field: ProfileField::SurvivorClass,
        enabled: |c| c.profile_saving.survivor_class,
        apply: |pre, post, _| pre.survivor_class = post.survivor_class,
    },
    // Must stay after Stats: it consumes whichever session experience won.
    FieldRule {
        field: ProfileField::Experience,
        enabled: |c| c.profile_saving.experience,
        apply: apply_experience,
    },
];

fn apply_quest_progress(pre: &mut ProfileSnapshot, post: &ProfileSnapshot, notes: &mut MergeNotes) {
    notes.discrepancies.extend(validate_counters(
        &pre.task_condition_counters,
        &post.task_condition_counters,
    ));
    pre.task_condition_counters = post.task_condition_counters.clone();
    pre.quests = post.quests.clone();
}

fn apply_experience(pre: &mut ProfileSnapshot, _post: &ProfileSnapshot, _: &mut MergeNotes) {
    pre.info.experience += pre.stats.eft.total_session_experience;
    pre.stats.eft.total_session_experience = 0;
}

#[derive(Debug, Clone)]
pub struct FieldMerge {
    pub profile: ProfileSnapshot,
    pub applied: Vec<ProfileField>,
    pub discrepancies: Vec<Discrepancy>,
}

/// Build the merged profile from `pre` and the post-session profile.
///
/// Skill fatigue on `post` is reset first, whatever the policy says, and
/// the wishlist is always taken from `post`.
pub fn merge_fields(
    pre: ProfileSnapshot,
    post: &mut ProfileSnapshot,
    config: &KeepConfig,
) -> FieldMerge {
    for skill in &mut post.skills.common {
        skill.points_earned_during_session = 0.0;
    }

    let mut profile = pre;
    let mut notes = MergeNotes::default();
    let mut applied = Vec::new();

    for rule in FIELD_RULES {
        if (rule.enabled)(config) {
            (rule.apply)(&mut profile, post, &mut notes);
            applied.push(rule.field);
        }
    }

    profile.wish_list = post.wish_list.clone();

    FieldMerge {
        profile,
        applied,
        discrepancies: notes.discrepancies,
    }
}
