//! # vdiff-engine
//!
//! Variation diffs of C-preprocessor annotated source code.
//!
//! A textual diff says which lines changed. A variation diff additionally says how the
//! variability of the code changed: which `#if` blocks were added, removed or left alone, and
//! under which feature formula every edited line is present before and after the edit.
//!
//! ## Approach
//!
//! 1. **Parsing**: a full unified diff of one file is read line by line while two stacks track
//!    the annotations open before and after the edit. The result is a [`DiffTree`] whose nodes
//!    may have a different parent before than after the edit.
//!
//! 2. **Transformation**: named, in-place [`transform::DiffTreeTransformer`]s simplify trees,
//!    for example by cutting unchanged subtrees or detecting moved code.
//!
//! 3. **Postprocessing**: mined trees are filtered by named predicates, simplified and
//!    deduplicated by ordered structural equality.
//!
//! 4. **Serialization**: trees are written to and read from the line-graph text format with
//!    pluggable node and tree label formats.
//!
//! ## Example
//!
//! ```rust
//! use vdiff_engine::{parse_diff, ParseOptions, Time};
//!
//! let tree = parse_diff(" #ifdef A\n+int x;\n #endif\n", &ParseOptions::default()).unwrap();
//! let x = tree.compute_artifact_nodes()[0];
//! let pc = tree.presence_condition(x, Time::After).unwrap();
//! println!("int x; is present if {}", pc);
//! ```

pub mod annotation;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod format;
pub mod formula;
pub mod line_number;
pub mod linegraph;
pub mod multiline_macro;
pub mod node;
pub mod parser;
pub mod postprocess;
pub mod transform;
pub mod traverse;
pub mod tree;
pub mod types;

// Re-export primary public API
pub use error::{DiffErrorKind, DiffParseError, GraphError, LineGraphError, PatchError, TransformError};
pub use formula::Formula;
pub use line_number::DiffLineNumber;
pub use node::{DiffNode, NodeId};
pub use parser::{
    diff_versions, parse_diff, parse_patch_file, parse_variation_tree, DiffTreeParser, ParseOptions,
};
pub use tree::{DiffTree, DiffTreeSource};
pub use types::{DiffType, NodeType, Time};
