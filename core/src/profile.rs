//! Profile documents exchanged with the game server.
//!
//! Field names follow the server's JSON (PascalCase profile keys,
//! camelCase inventory keys, `_id`/`_tpl` on items). Every record keeps
//! the keys it does not model in a flattened `extra` map, so a record that
//! passes through reconciliation untouched serializes back unchanged.

use crate::types::{ItemId, TemplateId, TraderId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Slot tag of the protected ("secure") container.
pub const PROTECTED_CONTAINER_SLOT: &str = "SecuredContainer";

/// Fence. The only trader whose standing is reconciled after a death.
pub const FENCE_TRADER_ID: &str = "579dc571d53a0658a154fbec";

/// Roubles, dollars, euros, GP coins.
pub const MONEY_TEMPLATES: [&str; 4] = [
    "5449016a4bdc2d6f028b456f",
    "5696686a4bdc2da3298b456a",
    "569668774bdc2da2298b4568",
    "5d235b4d86f7742e017bc88a",
];

pub type Extra = BTreeMap<String, Value>;

// ── Account ─────────────────────────────────────────────────────────

/// The unit of persistence: both personas of one account plus the
/// account's in-session bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub characters: Characters,
    #[serde(default)]
    pub inraid: InRaidState,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Characters {
    pub pmc: ProfileSnapshot,
    /// The secondary persona, when the account has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scav: Option<ProfileSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InRaidState {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub character: String,
}

// ── Profile ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfileSnapshot {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub info: ProfileInfo,
    #[serde(default)]
    pub skills: Skills,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub encyclopedia: BTreeMap<TemplateId, bool>,
    #[serde(default)]
    pub task_condition_counters: BTreeMap<String, TaskConditionCounter>,
    #[serde(default)]
    pub quests: Vec<QuestStatus>,
    #[serde(default)]
    pub survivor_class: SurvivorClass,
    #[serde(default)]
    pub wish_list: Value,
    #[serde(default)]
    pub traders_info: BTreeMap<TraderId, TraderInfo>,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub insured_items: Vec<InsuredItem>,
    #[serde(default)]
    pub health: Health,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ProfileSnapshot {
    pub fn standing(&self, trader_id: &str) -> Option<f64> {
        self.traders_info.get(trader_id).map(|t| t.standing)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfileInfo {
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub experience: i64,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Skills {
    #[serde(default)]
    pub common: Vec<SkillRecord>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SkillRecord {
    pub id: String,
    #[serde(default)]
    pub progress: f64,
    /// Skill fatigue accumulated during the last session.
    #[serde(default)]
    pub points_earned_during_session: f64,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stats {
    #[serde(default)]
    pub eft: EftStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EftStats {
    #[serde(default)]
    pub total_session_experience: i64,
    #[serde(default)]
    pub overall_counters: CounterList,
    #[serde(default)]
    pub victims: Vec<Victim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggressor: Option<Aggressor>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CounterList {
    #[serde(default)]
    pub items: Vec<CounterKeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CounterKeyValue {
    pub key: Vec<String>,
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Victim {
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub role: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Victim {
    /// Roles the server assigns to player-like opponents.
    pub const PLAYER_ROLES: [&'static str; 2] = ["sptBear", "sptUsec"];

    pub fn is_player_opponent(&self) -> bool {
        Self::PLAYER_ROLES
            .iter()
            .any(|r| r.eq_ignore_ascii_case(&self.role))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Aggressor {
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub role: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConditionCounter {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestStatus {
    pub qid: String,
    #[serde(default)]
    pub status: QuestState,
    #[serde(default)]
    pub completed_conditions: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestState {
    #[default]
    Locked,
    AvailableForStart,
    Started,
    AvailableForFinish,
    Success,
    Fail,
    FailRestartable,
    MarkedAsFailed,
    Expired,
    AvailableAfter,
}

impl QuestState {
    /// Quests in these states can still lose pickup progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::AvailableForStart | Self::Success | Self::Expired)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurvivorClass {
    #[default]
    Unknown,
    Neutralizer,
    Marauder,
    Paramedic,
    Survivor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderInfo {
    #[serde(default)]
    pub standing: f64,
    #[serde(default)]
    pub loyalty_level: i32,
    #[serde(default)]
    pub sales_sum: f64,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuredItem {
    /// Trader holding the insurance.
    pub tid: TraderId,
    pub item_id: ItemId,
}

// ── Inventory ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub equipment: ItemId,
    #[serde(default)]
    pub stash: ItemId,
    #[serde(default)]
    pub sorting_table: ItemId,
    #[serde(default)]
    pub quest_raid_items: ItemId,
    #[serde(default)]
    pub quest_stash_items: ItemId,
    /// Quick-access slot name → item identity.
    #[serde(default)]
    pub fast_panel: BTreeMap<String, ItemId>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Inventory {
    /// Container roots whose identities are owned by the profile and never
    /// reissued.
    pub fn fixed_container_ids(&self) -> Vec<ItemId> {
        [
            &self.equipment,
            &self.stash,
            &self.sorting_table,
            &self.quest_raid_items,
            &self.quest_stash_items,
        ]
        .into_iter()
        .filter(|id| !id.is_empty())
        .cloned()
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: ItemId,
    #[serde(rename = "_tpl", default)]
    pub tpl: TemplateId,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(rename = "slotId", default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upd: Option<ItemUpd>,
}

impl Item {
    pub fn new(id: &str, tpl: &str) -> Self {
        Self {
            id: id.to_string(),
            tpl: tpl.to_string(),
            ..Self::default()
        }
    }

    pub fn child_of(mut self, parent_id: &str, slot_id: &str) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self.slot_id = Some(slot_id.to_string());
        self
    }

    pub fn is_money(&self) -> bool {
        MONEY_TEMPLATES.contains(&self.tpl.as_str())
    }

    pub fn found_in_session(&self) -> bool {
        self.upd
            .as_ref()
            .and_then(|u| u.spawned_in_session)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemUpd {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_objects_count: Option<u64>,
    /// The "found in raid" status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawned_in_session: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── Health ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Health {
    #[serde(default)]
    pub hydration: Vital,
    #[serde(default)]
    pub energy: Vital,
    #[serde(default)]
    pub temperature: Vital,
    #[serde(default)]
    pub body_parts: BTreeMap<String, BodyPartHealth>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vital {
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub maximum: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BodyPartHealth {
    #[serde(default)]
    pub health: Vital,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<BTreeMap<String, Value>>,
}

// ── Session result ──────────────────────────────────────────────────

/// How a session ended for the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitStatus {
    Survived,
    Killed,
    Left,
    Runner,
    #[serde(rename = "missinginaction")]
    MissingInAction,
    Transit,
}

impl ExitStatus {
    pub fn is_favorable(&self) -> bool {
        matches!(self, Self::Survived)
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, Self::Killed | Self::Left | Self::MissingInAction)
    }
}

/// Body-part health as reported by the session runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthSyncPayload {
    #[serde(default)]
    pub health: BTreeMap<String, BodyPartSync>,
    #[serde(default)]
    pub is_alive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hydration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BodyPartSync {
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub maximum: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<BTreeMap<String, Value>>,
}

/// Everything the session runtime hands over once a session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSessionResult {
    pub exit: ExitStatus,
    pub profile: ProfileSnapshot,
    #[serde(default)]
    pub health: HealthSyncPayload,
    #[serde(default)]
    pub location_name: String,
    #[serde(default)]
    pub is_player_scav: bool,
}

impl PostSessionResult {
    pub fn aggressor(&self) -> Option<&Aggressor> {
        self.profile.stats.eft.aggressor.as_ref()
    }

    /// Victims that count as player-like opponents.
    pub fn player_victims(&self) -> Vec<Victim> {
        self.profile
            .stats
            .eft
            .victims
            .iter()
            .filter(|v| v.is_player_opponent())
            .cloned()
            .collect()
    }
}
