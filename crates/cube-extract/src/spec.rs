use serde::{Deserialize, Deserializer, Serialize};

/// Member selection strings for one dimension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSelection {
    pub dimension: String,
    /// One selection string or a list of them.
    #[serde(deserialize_with = "one_or_many")]
    pub members: Vec<String>,
}

impl DimensionSelection {
    pub fn new<I, S>(dimension: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dimension: dimension.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(spec) => vec![spec],
        OneOrMany::Many(specs) => specs,
    })
}

/// Explicit axis placement. `columns` must be present; the other axes default to empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisSpec {
    #[serde(default)]
    pub pov: Vec<DimensionSelection>,
    #[serde(default)]
    pub pages: Vec<DimensionSelection>,
    #[serde(default)]
    pub rows: Vec<DimensionSelection>,
    pub columns: Vec<DimensionSelection>,
}

/// Selections keyed by dimension; axes are derived from the outline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlatSpec {
    pub members: Vec<DimensionSelection>,
    #[serde(default)]
    pub column_dimension: Option<String>,
}

/// What to extract from a cube.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractSpec {
    Axes(AxisSpec),
    Flat(FlatSpec),
}
