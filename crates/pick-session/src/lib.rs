//! Interactive element picking.
//!
//! The hover/highlight capability is an opaque port ([`HoverInspector`]);
//! this crate owns the state machine around it: engage on start, turn a
//! click into exactly one captured-element event, fall back to idle on
//! escape or stop.

pub mod capture;
pub mod errors;
pub mod inspector;
pub mod session;

pub use capture::capture_element;
pub use errors::PickError;
pub use inspector::{
    ChannelInspector, ClickEvent, HoverInspector, InspectOptions, InspectorEvent, PICK_EXCLUDES,
};
pub use session::{Captured, PickSession};
