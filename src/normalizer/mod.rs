//! # C++ Driver Transforms
//!
//! The three rule tables of the C++ driver and the [`Transforms`] bundle that
//! sequences them:
//!
//! 1. [`preprocess`]: structural normalization (pre-order).
//! 2. [`normalize`]: native shapes to canonical shapes (post-order).
//! 3. [`annotation`]: role tags (post-order), followed by role deduplication.
//!
//! Tables are built once per [`Transforms`] and only read afterwards, so one
//! bundle can serve any number of documents, including from several threads.

use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::DriverConfig;
use crate::diagnostics::UastError;
use crate::node::{Node, Order};
use crate::positioner::FillLineCol;
use crate::transformer::{Pipeline, RoundTrip, RuleTable, Stage, Transformer};
use crate::uast::{ResponseMetadata, RolesDedup};

pub mod annotation;
pub mod normalize;
pub mod preprocess;

/// How far the pipeline runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Parser output with the response envelope removed.
    Native,
    /// Native nodes with `@type` and `@pos`.
    Preprocessed,
    /// Native nodes with roles, without semantic rewriting.
    Annotated,
    /// Canonical nodes where a rule exists, annotated native nodes elsewhere.
    #[default]
    Semantic,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Native => "native",
            Mode::Preprocessed => "preprocessed",
            Mode::Annotated => "annotated",
            Mode::Semantic => "semantic",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every stage of the driver, built from one configuration.
#[derive(Clone)]
pub struct Transforms {
    config: DriverConfig,
    response: Arc<dyn Transformer>,
    preprocess: Arc<Stage>,
    normalize: Arc<Stage>,
    annotations: Arc<Stage>,
}

impl Transforms {
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            config: config.clone(),
            response: Arc::new(ResponseMetadata {
                top_level_is_root: config.top_level_is_root,
            }),
            preprocess: Arc::new(Stage::new(preprocess::table(config), Order::PreOrder)),
            normalize: Arc::new(Stage::new(normalize::table(), Order::PostOrder)),
            annotations: Arc::new(Stage::new(annotation::table(), Order::PostOrder)),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The rule tables in the order they run.
    pub fn tables(&self) -> [&RuleTable; 3] {
        [
            self.preprocess.table(),
            self.normalize.table(),
            self.annotations.table(),
        ]
    }

    /// The stages `mode` runs, without position resolution.
    pub fn pipeline(&self, mode: Mode) -> Pipeline {
        let mut pipeline = Pipeline::new().then_shared(Arc::clone(&self.response));
        if mode == Mode::Native {
            return pipeline;
        }
        pipeline = pipeline.then_shared(self.preprocess.clone());
        match mode {
            Mode::Native | Mode::Preprocessed => pipeline,
            Mode::Annotated => pipeline
                .then_shared(self.annotations.clone())
                .then(RolesDedup),
            Mode::Semantic => pipeline
                .then_shared(self.normalize.clone())
                .then_shared(self.annotations.clone())
                .then(RolesDedup),
        }
    }

    /// Runs `mode` over a parser response. When `source` is given and the
    /// configuration asks for it, positions are resolved against it last.
    pub fn run(&self, tree: Node, source: Option<&str>, mode: Mode) -> Result<Node, UastError> {
        let mut pipeline = self.pipeline(mode);
        if let Some(source) = source {
            if self.config.fill_line_col && mode != Mode::Native {
                pipeline = pipeline.then(FillLineCol::new(source, self.config.offset_encoding));
            }
        }
        pipeline.transform(tree)
    }

    /// Preprocesses a parser response, then runs semantic normalization
    /// recording a forward/reverse report for every rewritten node.
    pub fn round_trip(&self, tree: Node) -> Result<(Node, Vec<RoundTrip>), UastError> {
        let tree = self.response.transform(tree)?;
        let tree = self.preprocess.transform(tree)?;
        self.normalize.round_trip(tree)
    }
}

impl Default for Transforms {
    fn default() -> Self {
        Self::new(&DriverConfig::default())
    }
}

impl std::fmt::Debug for Transforms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transforms")
            .field("config", &self.config)
            .field(
                "tables",
                &self.tables().iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(root: serde_json::Value) -> Node {
        Node::from(json!({ "CPPASTTranslationUnit": root }))
    }

    #[test]
    fn test_pipeline_stages_per_mode() {
        let t = Transforms::default();
        assert_eq!(t.pipeline(Mode::Native).stage_names(), vec!["response-metadata"]);
        assert_eq!(
            t.pipeline(Mode::Preprocessed).stage_names(),
            vec!["response-metadata", "preprocess"]
        );
        assert_eq!(
            t.pipeline(Mode::Annotated).stage_names(),
            vec!["response-metadata", "preprocess", "annotations", "roles-dedup"]
        );
        assert_eq!(
            t.pipeline(Mode::Semantic).stage_names(),
            vec!["response-metadata", "preprocess", "normalize", "annotations", "roles-dedup"]
        );
    }

    #[test]
    fn test_native_mode_only_unwraps() {
        let t = Transforms::default();
        let out = t
            .run(response(json!({"IASTClass": "CPPASTName", "Name": "x"})), Some("x"), Mode::Native)
            .unwrap();
        assert_eq!(out, Node::from(json!({"IASTClass": "CPPASTName", "Name": "x"})));
    }

    #[test]
    fn test_annotated_mode_keeps_native_names() {
        let t = Transforms::default();
        let out = t
            .run(
                response(json!({"IASTClass": "CPPASTName", "Name": "x", "IsQualified": false})),
                None,
                Mode::Annotated,
            )
            .unwrap();
        assert_eq!(
            out,
            Node::from(json!({
                "@type": "CPPASTName",
                "@role": ["Identifier"],
                "@token": "x",
                "IsQualified": false
            }))
        );
    }

    #[test]
    fn test_semantic_mode_resolves_positions() {
        let t = Transforms::default();
        let out = t
            .run(
                response(json!({
                    "IASTClass": "CPPASTName",
                    "LocOffsetStart": 4,
                    "LocOffsetEnd": 5,
                    "Name": "x"
                })),
                Some("int x;"),
                Mode::Semantic,
            )
            .unwrap();
        assert_eq!(
            out,
            Node::from(json!({
                "@type": "uast:Identifier",
                "@pos": {
                    "@type": "uast:Positions",
                    "start": {"@type": "uast:Position", "offset": 4, "line": 1, "col": 5},
                    "end": {"@type": "uast:Position", "offset": 5, "line": 1, "col": 6}
                },
                "Name": "x"
            }))
        );
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(Mode::default(), Mode::Semantic);
        assert_eq!(Mode::Preprocessed.to_string(), "preprocessed");
    }
}
