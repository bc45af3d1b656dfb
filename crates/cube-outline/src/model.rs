use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Index of a member inside its [`Dimension`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub(crate) usize);

impl MemberId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Storage/share option of a member.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareOption {
    #[default]
    StoreData,
    NeverShare,
    LabelOnly,
    Shared,
    DynamicCalc,
    DynamicCalcAndStore,
}

impl ShareOption {
    pub fn is_shared(self) -> bool {
        self == ShareOption::Shared
    }

    pub fn is_dynamic(self) -> bool {
        matches!(
            self,
            ShareOption::DynamicCalc | ShareOption::DynamicCalcAndStore
        )
    }

    /// Whether cells for the member occupy storage of their own.
    pub fn is_stored(self) -> bool {
        matches!(
            self,
            ShareOption::StoreData | ShareOption::NeverShare | ShareOption::DynamicCalcAndStore
        )
    }
}

impl FromStr for ShareOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "" | "store" | "storedata" | "normal" => Ok(ShareOption::StoreData),
            "nevershare" => Ok(ShareOption::NeverShare),
            "labelonly" | "label" => Ok(ShareOption::LabelOnly),
            "shared" | "sharedmember" => Ok(ShareOption::Shared),
            "dynamiccalc" | "dynamic" => Ok(ShareOption::DynamicCalc),
            "dynamiccalcandstore" => Ok(ShareOption::DynamicCalcAndStore),
            _ => Err(format!("unknown share option: {s}")),
        }
    }
}

/// Consolidation operator applied when a member rolls up into its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Consolidation {
    #[default]
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "~")]
    Ignore,
    #[serde(rename = "^")]
    NoRollup,
}

impl Consolidation {
    pub fn symbol(self) -> char {
        match self {
            Consolidation::Add => '+',
            Consolidation::Subtract => '-',
            Consolidation::Multiply => '*',
            Consolidation::Divide => '/',
            Consolidation::Percent => '%',
            Consolidation::Ignore => '~',
            Consolidation::NoRollup => '^',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        Some(match symbol {
            '+' => Consolidation::Add,
            '-' => Consolidation::Subtract,
            '*' => Consolidation::Multiply,
            '/' => Consolidation::Divide,
            '%' => Consolidation::Percent,
            '~' => Consolidation::Ignore,
            '^' => Consolidation::NoRollup,
            _ => return None,
        })
    }
}

impl fmt::Display for Consolidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionStorage {
    Dense,
    #[default]
    Sparse,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionTag {
    #[default]
    None,
    Accounts,
    Time,
    Country,
    Currency,
    Attribute,
}

/// Cube-level description of a dimension, available before its members are fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionInfo {
    pub name: String,
    #[serde(default)]
    pub storage: DimensionStorage,
    #[serde(default)]
    pub tag: DimensionTag,
}

impl DimensionInfo {
    pub fn new(name: impl Into<String>, storage: DimensionStorage) -> Self {
        Self {
            name: name.into(),
            storage,
            tag: DimensionTag::None,
        }
    }

    pub fn with_tag(mut self, tag: DimensionTag) -> Self {
        self.tag = tag;
        self
    }

    pub fn is_dense(&self) -> bool {
        self.storage == DimensionStorage::Dense
    }

    pub fn is_attribute(&self) -> bool {
        self.tag == DimensionTag::Attribute
    }
}

/// One node of a dimension hierarchy.
#[derive(Clone, Debug)]
pub struct Member {
    pub(crate) id: MemberId,
    pub(crate) name: String,
    pub(crate) unique_name: Option<String>,
    pub(crate) aliases: BTreeMap<String, String>,
    pub(crate) share_option: ShareOption,
    pub(crate) consolidation: Consolidation,
    pub(crate) generation: u32,
    pub(crate) level: u32,
    pub(crate) formula: Option<String>,
    pub(crate) udas: Vec<String>,
    pub(crate) parent: Option<MemberId>,
    pub(crate) children: Vec<MemberId>,
    pub(crate) primary: Option<MemberId>,
    pub(crate) shared_instances: Vec<MemberId>,
}

impl Member {
    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_name(&self) -> Option<&str> {
        self.unique_name.as_deref()
    }

    pub fn alias(&self, table: &str) -> Option<&str> {
        self.aliases.get(table).map(String::as_str)
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn share_option(&self) -> ShareOption {
        self.share_option
    }

    pub fn consolidation(&self) -> Consolidation {
        self.consolidation
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    pub fn udas(&self) -> &[String] {
        &self.udas
    }

    pub fn has_uda(&self, uda: &str) -> bool {
        self.udas.iter().any(|u| u.eq_ignore_ascii_case(uda))
    }

    pub fn parent(&self) -> Option<MemberId> {
        self.parent
    }

    /// Children in outline order. Always empty for shared members.
    pub fn children(&self) -> &[MemberId] {
        &self.children
    }

    pub fn is_shared(&self) -> bool {
        self.share_option.is_shared()
    }

    pub fn is_dynamic(&self) -> bool {
        self.share_option.is_dynamic()
    }

    /// The primary member for a shared instance; the member itself otherwise.
    pub fn non_shared_member(&self) -> MemberId {
        self.primary.unwrap_or(self.id)
    }

    /// Shared instances of this (primary) member, in outline order.
    pub fn shared_instances(&self) -> &[MemberId] {
        &self.shared_instances
    }
}

/// The member graph of a single dimension.
///
/// Members live in one arena (`members`) and refer to each other by [`MemberId`], which keeps the
/// member ↔ primary ↔ shared-instance links free of ownership cycles.
#[derive(Clone, Debug)]
pub struct Dimension {
    pub(crate) info: DimensionInfo,
    pub(crate) members: Vec<Member>,
    pub(crate) root: MemberId,
    pub(crate) by_name: HashMap<String, MemberId>,
    pub(crate) by_alias: BTreeMap<String, HashMap<String, MemberId>>,
}

impl Dimension {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &DimensionInfo {
        &self.info
    }

    pub fn storage(&self) -> DimensionStorage {
        self.info.storage
    }

    pub fn tag(&self) -> DimensionTag {
        self.info.tag
    }

    pub fn is_dense(&self) -> bool {
        self.info.is_dense()
    }

    pub fn root(&self) -> MemberId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Panics when `id` belongs to another dimension's arena.
    pub fn member(&self, id: MemberId) -> &Member {
        &self.members[id.0]
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    /// Case-insensitive lookup of a non-shared member by name, then by alias in any alias table.
    pub fn lookup(&self, name: &str) -> Option<MemberId> {
        let key = normalize_name(name);
        if let Some(id) = self.by_name.get(&key) {
            return Some(*id);
        }
        self.by_alias
            .values()
            .find_map(|aliases| aliases.get(&key).copied())
    }

    /// Like [`Dimension::lookup`] but restricted to one alias table.
    pub fn lookup_alias(&self, table: &str, alias: &str) -> Option<MemberId> {
        self.by_alias.get(table)?.get(&normalize_name(alias)).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Member> {
        self.lookup(name).map(|id| self.member(id))
    }

    pub fn names(&self, ids: &[MemberId]) -> Vec<&str> {
        ids.iter().map(|id| self.member(*id).name()).collect()
    }
}

impl std::ops::Index<&str> for Dimension {
    type Output = Member;

    fn index(&self, name: &str) -> &Member {
        match self.get(name) {
            Some(member) => member,
            None => panic!("no member {name} in dimension {}", self.name()),
        }
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}
