//! Event system: event objects, binding tables, root-listener dispatch state.

pub mod binding;
pub mod handler;
pub mod object;

pub use binding::{Binding, BindingTable, GlobalHandlers, Handler, HandlerId};
pub use handler::EventDispatcher;
pub use object::{Event, EventKind, NativeEvent, SyntheticEvent};
