//! ldshape engine - recursive resolution of shape trees against linked data
//!
//! A `TreeNode` receives a `Focus` (graph + resource), asks the `Resolver`
//! for the items its property path yields, materializes them through a
//! `Surface`, and hands each node item's sub-graph to its child nodes.

pub mod engine;
pub mod lifecycle;
pub mod node;
pub mod resolve;
pub mod surface;

pub use engine::Engine;
pub use node::TreeNode;
pub use resolve::{locate, ResolvedItem, Resolver};
pub use surface::{MemorySurface, NodeView, Placement, SlotView, Surface};
