//! Structural normalization table.

use crate::config::DriverConfig;
use crate::transformer::{Mapping, RuleTable};

pub fn preprocessors(config: &DriverConfig) -> Vec<Mapping> {
    vec![config.object_to_node().mapping()]
}

/// Indexed by the native type key, since `@type` does not exist yet.
pub fn table(config: &DriverConfig) -> RuleTable {
    RuleTable::new("preprocess", &config.type_key, preprocessors(config))
}
