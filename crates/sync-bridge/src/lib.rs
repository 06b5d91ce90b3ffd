//! Cross-context synchronization.
//!
//! Three contexts run independently and meet only through channels: the
//! per-page injected context (owns the pick session and the live DOM), the
//! persistent background context (owns the transient completion
//! indicators), and the ephemeral panel context (rebuilt from the store on
//! every open). Commands are typed request/response pairs; captures fan out
//! on a broadcast feed; store changes arrive through the store's own
//! subscription channel.

pub mod background;
pub mod errors;
pub mod injected;
pub mod message;
pub mod panel;
pub mod ports;
pub mod router;

pub use background::{BackgroundContext, NotifyCfg, BADGE_COLOR, BADGE_TEXT};
pub use errors::BridgeError;
pub use injected::InjectedContext;
pub use message::{CommandAck, ElementCaptured, PageCommand};
pub use panel::PanelContext;
pub use ports::{
    BadgeSurface, FixedTabQuery, MemoryBadgeSurface, MemoryNotificationSurface, NotificationId,
    NotificationSurface, NotificationView, TabQuery,
};
pub use router::{CommandEnvelope, CommandRouter};
