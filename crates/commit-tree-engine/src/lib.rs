//! Incremental commit graph engine.
//!
//! Each view of a repository owns a [`CommitGraph`]: cells on a row/column
//! grid joined by parent-to-child edges. A [`TreeAdapter`] keeps one graph in
//! sync with a [`DataSource`](commit_tree_core::DataSource), and the
//! [`TreeController`] coordinates the single selection, hover highlighting
//! and refreshes across every registered view.
//!
//! ```text
//! DataSource -> TreeAdapter (diff + head tags) -> CommitGraph (layout)
//!            -> TreeController (selection / hover) -> Renderer
//! ```
//!
//! Background work only produces snapshots; they reach the controller
//! through a [`RefreshQueue`] drained on the owning thread.

mod adapter;
mod controller;
mod error;
pub mod graph;
pub mod highlight;
mod layout;
mod refresh;
mod render;

pub use adapter::{SyncStats, TreeAdapter, TreeKind, TreeSource};
pub use controller::{Selection, TreeController, TreeId};
pub use error::{EngineError, EngineResult};
pub use graph::{Cell, CommitGraph, Edge, GraphExport, HeadTag, Interaction, StyleTag};
pub use layout::{LaneLayout, PlacementRequest};
pub use refresh::{RefreshEvent, RefreshQueue, RefreshSender};
pub use render::{GraphView, NullRenderer, NullSession, Renderer, Session};
