use cube_outline::{
    DimensionInfo, MemberQueryRow, MemberRecord, MemberSource, NativeError, NativeResult,
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// One dimension of an outline file: its cube-level description plus every member record.
#[derive(Debug, Deserialize)]
pub struct DimensionFile {
    #[serde(flatten)]
    pub info: DimensionInfo,
    #[serde(default)]
    pub members: Vec<MemberRecord>,
}

/// A cube outline saved as JSON, standing in for a live session when compiling queries.
#[derive(Debug, Deserialize)]
pub struct OutlineFile {
    pub cube: String,
    pub dimensions: Vec<DimensionFile>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl MemberSource for OutlineFile {
    fn dimensions(&self) -> NativeResult<Vec<DimensionInfo>> {
        Ok(self.dimensions.iter().map(|d| d.info.clone()).collect())
    }

    fn traverse_descendants(&self, root: &str) -> NativeResult<Vec<MemberRecord>> {
        self.dimensions
            .iter()
            .find(|d| d.info.name.eq_ignore_ascii_case(root))
            .map(|d| d.members.clone())
            .ok_or_else(|| NativeError::new(format!("outline file has no dimension {root}")))
    }

    fn execute_member_query(
        &self,
        dimension: &str,
        spec: &str,
    ) -> NativeResult<Vec<MemberQueryRow>> {
        Err(NativeError::new(format!(
            "native selection {spec} on {dimension} needs a live session"
        )))
    }

    fn resolve_substitution_variable(&self, name: &str) -> NativeResult<String> {
        self.variables
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
            .ok_or_else(|| NativeError::new(format!("unknown substitution variable {name}")))
    }
}
