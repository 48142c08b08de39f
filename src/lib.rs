//! # rivet
//!
//! A component framework that binds behavior objects to DOM elements, manages
//! their lifecycle, and routes native and component-emitted events through a
//! single delegated dispatcher.
//!
//! All state lives in a [`Runtime`]: the document, the registry of component
//! definitions, the element -> instance cache, per-instance event bindings
//! and process-wide global handlers.
//!
//! ## Core Systems
//!
//! - **[`dom`]**: Slotmap-backed document arena, queries, markup parse/serialize
//! - **[`selector`]**: Selector tokenizer, parser and right-to-left matcher
//! - **[`event`]**: Native/synthetic event objects, binding tables, root subscriptions
//! - **[`component`]**: `Behavior` trait, definitions, lifecycle state
//! - **[`runtime`]**: Registry, parser, renderer and the dispatch engine
//! - **[`testing`]**: Headless `Pilot` driver
//!
//! ```
//! use rivet::component::ComponentDef;
//! use rivet::Runtime;
//!
//! let mut rt = Runtime::new();
//! rt.register("greeting", ComponentDef::plain().with_template(|_| "<p>hi</p>".into()));
//! let id = rt.create("greeting", Default::default()).unwrap();
//! assert_eq!(rt.dom().text_content(rt.element(id).unwrap()), "hi");
//! ```

pub mod error;

// Substrate
pub mod dom;
pub mod selector;

// Components and events
pub mod component;
pub mod event;
pub mod runtime;

// Test support
pub mod testing;

pub use component::{Behavior, ComponentDef, ComponentId, Lifecycle};
pub use dom::{Dom, NodeData, NodeId};
pub use error::{Error, Result};
pub use event::{Event, HandlerId, NativeEvent};
pub use runtime::{Runtime, RuntimeConfig, Selection};
