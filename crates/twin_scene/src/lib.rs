//! # Twin Scene - Layered Scene Store
//!
//! A hierarchical scene is described by a stack of sparse layers. Readers see
//! the composed result; writers are confined to one layer at a time.
//!
//! ## Architecture
//!
//! ```text
//! base layer ─┐
//! looks layer ├──► SceneView (strongest wins) ──► readers
//! live layer ─┘          ▲
//!      ▲                 │ staged reads
//!      └── commit ── EditContext ◄── writers
//! ```
//!
//! ## Key Concepts
//!
//! - **NodePath**: Slash-delimited address of a node
//! - **Layer**: Sparse per-node opinions (type name, attributes, children)
//! - **SceneView**: Strongest-wins attribute resolution, union of existence and children
//! - **Edit target**: All-or-nothing writes to exactly one layer, journaled

pub mod compose;
pub mod edit;
pub mod error;
pub mod journal;
pub mod layer;
pub mod node;
pub mod path;
pub mod persist;
pub mod stage;
pub mod traverse;
pub mod value;

pub use compose::SceneView;
pub use edit::EditContext;
pub use error::{ErrorClass, Result, SceneError};
pub use journal::{Edit, EditLog, EditOp};
pub use layer::{Layer, LayerId, LayerStack};
pub use node::NodeSpec;
pub use path::NodePath;
pub use persist::{write_atomic, LayerFile, RootManifest, FORMAT_VERSION};
pub use stage::Stage;
pub use traverse::Descendants;
pub use value::{AttrType, Transform, Value};
