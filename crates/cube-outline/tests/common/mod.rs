#![allow(dead_code)]

use cube_outline::{
    Consolidation, DimensionBuilder, DimensionInfo, DimensionStorage, Dimension, MemberQueryRow,
    MemberRecord, MemberSource, NativeError, NativeResult, ShareOption,
};
use std::cell::Cell;
use std::collections::HashMap;

/// Product records in a deliberately scrambled order: children arrive before their parents.
pub fn product_records() -> Vec<MemberRecord> {
    vec![
        MemberRecord::new("100-10", Some("100"), 3, 0).with_alias("Default", "Cola"),
        MemberRecord::new("100-20", Some("100"), 3, 0).with_alias("Default", "Diet Cola"),
        MemberRecord::new("100", Some("Product"), 2, 1).with_alias("Default", "Colas"),
        MemberRecord::new("Product", None, 1, 2),
        MemberRecord::new("100-30", Some("100"), 3, 0),
        MemberRecord::new("200", Some("Product"), 2, 1).with_alias("Long Names", "Root Beer"),
        MemberRecord::new("200-10", Some("200"), 3, 0),
        MemberRecord::new("200-20", Some("200"), 3, 0).with_uda("Caffeine Free"),
        MemberRecord::new("300", Some("Product"), 2, 1),
        MemberRecord::new("300-10", Some("300"), 3, 0).with_uda("Caffeine Free"),
        MemberRecord::new("300-20", Some("300"), 3, 0),
        MemberRecord::new("Diet", Some("Product"), 2, 1)
            .with_share_option(ShareOption::DynamicCalc)
            .with_consolidation(Consolidation::Ignore),
        MemberRecord::new("100-20", Some("Diet"), 3, 0).shared(),
        MemberRecord::new("200-20", Some("Diet"), 3, 0).shared(),
    ]
}

pub fn market_records() -> Vec<MemberRecord> {
    vec![
        MemberRecord::new("Market", None, 1, 2),
        MemberRecord::new("East", Some("Market"), 2, 1),
        MemberRecord::new("New York", Some("East"), 3, 0).with_uda("Major Market"),
        MemberRecord::new("Massachusetts", Some("East"), 3, 0),
        MemberRecord::new("West", Some("Market"), 2, 1).with_uda("Major Market"),
        MemberRecord::new("California", Some("West"), 3, 0).with_uda("Major Market"),
        MemberRecord::new("Oregon", Some("West"), 3, 0),
    ]
}

pub fn product() -> Dimension {
    DimensionBuilder::new(DimensionInfo::new("Product", DimensionStorage::Sparse))
        .build(product_records())
        .unwrap()
}

pub fn market() -> Dimension {
    DimensionBuilder::new(DimensionInfo::new("Market", DimensionStorage::Sparse))
        .build(market_records())
        .unwrap()
}

/// In-memory stand-in for a live session.
#[derive(Debug, Default)]
pub struct FixtureSource {
    pub dimensions: Vec<DimensionInfo>,
    pub members: HashMap<String, Vec<MemberRecord>>,
    pub variables: HashMap<String, String>,
    pub member_queries: HashMap<String, Vec<MemberQueryRow>>,
    pub traversals: Cell<usize>,
}

impl FixtureSource {
    pub fn sample() -> Self {
        let mut source = FixtureSource {
            dimensions: vec![
                DimensionInfo::new("Product", DimensionStorage::Sparse),
                DimensionInfo::new("Market", DimensionStorage::Sparse),
            ],
            ..Self::default()
        };
        source
            .members
            .insert("Product".to_string(), product_records());
        source.members.insert("Market".to_string(), market_records());
        source
            .variables
            .insert("CurrProduct".to_string(), "200".to_string());
        source
    }

    pub fn with_member_query(mut self, query: &str, rows: &[(&str, &str)]) -> Self {
        let rows = rows
            .iter()
            .map(|(name, parent)| MemberQueryRow {
                name: name.to_string(),
                parent: Some(parent.to_string()),
                dimension: "Product".to_string(),
            })
            .collect();
        self.member_queries.insert(query.to_string(), rows);
        self
    }
}

impl MemberSource for FixtureSource {
    fn dimensions(&self) -> NativeResult<Vec<DimensionInfo>> {
        Ok(self.dimensions.clone())
    }

    fn traverse_descendants(&self, root: &str) -> NativeResult<Vec<MemberRecord>> {
        self.traversals.set(self.traversals.get() + 1);
        self.members
            .get(root)
            .cloned()
            .ok_or_else(|| NativeError::new(format!("no such member {root}")))
    }

    fn execute_member_query(
        &self,
        _dimension: &str,
        spec: &str,
    ) -> NativeResult<Vec<MemberQueryRow>> {
        self.member_queries
            .get(spec)
            .cloned()
            .ok_or_else(|| NativeError::new(format!("bad member query {spec}")))
    }

    fn resolve_substitution_variable(&self, name: &str) -> NativeResult<String> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| NativeError::new(format!("no substitution variable {name}")))
    }
}

pub fn names(dim: &Dimension, ids: &[cube_outline::MemberId]) -> Vec<String> {
    dim.names(ids).into_iter().map(str::to_string).collect()
}
