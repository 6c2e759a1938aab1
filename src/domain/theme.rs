use serde::{Deserialize, Serialize};

/// Layout theme; defines the regions a node can place sections in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    /// Region identifiers in layout order.
    pub regions: Vec<String>,
}

impl Theme {
    pub fn new<I, S>(id: impl Into<String>, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            regions: regions.into_iter().map(Into::into).collect(),
        }
    }
}
