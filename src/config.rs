//! Driver configuration.
//!
//! Configuration is an explicit value handed to
//! [`Transforms::new`](crate::normalizer::Transforms::new); nothing here is
//! global. It is usually loaded from a YAML file:
//!
//! ```yaml
//! mode: semantic
//! type_key: IASTClass
//! offset_key: LocOffsetStart
//! end_offset_key: LocOffsetEnd
//! offset_encoding: utf16
//! fill_line_col: true
//! top_level_is_root: false
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{ErrorContext, UastError};
use crate::normalizer::Mode;
use crate::uast::ObjectToNode;

/// How the native parser counts offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetEncoding {
    /// Byte offsets into the UTF-8 source.
    Utf8,
    /// Offsets in UTF-16 code units, as reported by Java-based parsers.
    #[default]
    Utf16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    pub mode: Mode,
    pub type_key: String,
    pub offset_key: String,
    pub end_offset_key: String,
    pub offset_encoding: OffsetEncoding,
    pub fill_line_col: bool,
    pub top_level_is_root: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        let keys = ObjectToNode::default();
        Self {
            mode: Mode::Semantic,
            type_key: keys.internal_type_key,
            offset_key: keys.offset_key,
            end_offset_key: keys.end_offset_key,
            offset_encoding: OffsetEncoding::Utf16,
            fill_line_col: true,
            top_level_is_root: false,
        }
    }
}

impl DriverConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, UastError> {
        let config: DriverConfig = serde_yaml::from_str(text).map_err(|e| UastError::Config {
            message: format!("invalid driver configuration: {}", e),
            ctx: ErrorContext::with_help("see the configuration keys documented in `uastify::config`"),
            source: Some(Box::new(e)),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, UastError> {
        let text = fs::read_to_string(path)
            .map_err(|e| UastError::from(e).context(format!("reading {}", path.display())))?;
        Self::from_yaml_str(&text).map_err(|e| e.context(path.display()))
    }

    fn validate(&self) -> Result<(), UastError> {
        for (name, value) in [
            ("type_key", &self.type_key),
            ("offset_key", &self.offset_key),
            ("end_offset_key", &self.end_offset_key),
        ] {
            if value.is_empty() {
                return Err(crate::err_msg!(Config, "'{}' must not be empty", name));
            }
        }
        if self.type_key == self.offset_key || self.type_key == self.end_offset_key {
            return Err(crate::err_msg!(
                Config,
                "'type_key' must differ from the offset keys"
            ));
        }
        Ok(())
    }

    /// The structural-normalization keys this configuration names.
    pub fn object_to_node(&self) -> ObjectToNode {
        ObjectToNode {
            internal_type_key: self.type_key.clone(),
            offset_key: self.offset_key.clone(),
            end_offset_key: self.end_offset_key.clone(),
        }
    }
}
