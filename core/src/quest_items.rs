//! Quest item loss handling.
//!
//! When quest items are not kept, any "pick up this item" condition a quest
//! already counted as complete has to be reopened, otherwise the quest
//! could be handed in without the item.

use crate::{
    error::ReconcileResult,
    profile::{Item, QuestStatus},
    types::TemplateId,
};
use serde::{Deserialize, Serialize};

pub trait QuestRepair {
    /// Reopen pickup conditions satisfied by `lost` items. Returns the
    /// number of conditions reopened.
    fn repair_pickup_quests_after_loss(
        &mut self,
        session_id: &str,
        lost: &[Item],
        quests: &mut [QuestStatus],
    ) -> ReconcileResult<usize>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupCondition {
    pub quest_id: String,
    pub condition_id: String,
    /// Templates that satisfy the condition.
    pub targets: Vec<TemplateId>,
}

/// Pickup conditions known to the runner, usually exported from the
/// server's quest database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickupConditionTable {
    pub conditions: Vec<PickupCondition>,
}

impl PickupConditionTable {
    pub fn new(conditions: Vec<PickupCondition>) -> Self {
        Self { conditions }
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl QuestRepair for PickupConditionTable {
    fn repair_pickup_quests_after_loss(
        &mut self,
        session_id: &str,
        lost: &[Item],
        quests: &mut [QuestStatus],
    ) -> ReconcileResult<usize> {
        let mut reopened = 0;
        for item in lost {
            for condition in self.conditions.iter().filter(|c| c.targets.contains(&item.tpl)) {
                let Some(quest) = quests
                    .iter_mut()
                    .find(|q| q.qid == condition.quest_id && q.status.is_active())
                else {
                    continue;
                };
                let before = quest.completed_conditions.len();
                quest
                    .completed_conditions
                    .retain(|c| c != &condition.condition_id);
                if quest.completed_conditions.len() != before {
                    reopened += 1;
                    log::info!(
                        "session={session_id} quests: reopened {} on {} after losing {}",
                        condition.condition_id,
                        quest.qid,
                        item.tpl
                    );
                }
            }
        }
        Ok(reopened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::QuestState;

    #[test]
    fn reopens_only_active_quests() {
        let mut table = PickupConditionTable::new(vec![
            PickupCondition {
                quest_id: "q-active".into(),
                condition_id: "find-flash".into(),
                targets: vec!["tpl-flash".into()],
            },
            PickupCondition {
                quest_id: "q-done".into(),
                condition_id: "find-flash-2".into(),
                targets: vec!["tpl-flash".into()],
            },
        ]);
        let mut quests = vec![
            QuestStatus {
                qid: "q-active".into(),
                status: QuestState::Started,
                completed_conditions: vec!["find-flash".into(), "other".into()],
                ..QuestStatus::default()
            },
            QuestStatus {
                qid: "q-done".into(),
                status: QuestState::Success,
                completed_conditions: vec!["find-flash-2".into()],
                ..QuestStatus::default()
            },
        ];

        let lost = vec![Item::new("flash", "tpl-flash")];
        let n = table
            .repair_pickup_quests_after_loss("s", &lost, &mut quests)
            .unwrap();

        assert_eq!(n, 1);
        assert_eq!(quests[0].completed_conditions, vec!["other".to_string()]);
        assert_eq!(quests[1].completed_conditions, vec!["find-flash-2".to_string()]);
    }
}
