//! Navigation-position recording and restoration.
//!
//! The descriptor tree names the portal's navigable levels. The
//! [`Navigator`] instruments matching elements, records the user's path as a
//! [`NavigationStack`], persists it with scroll offsets in a
//! [`SessionRecord`], and replays both after a reload.

mod config;
mod descriptor;
mod messenger;
mod navigator;
mod scroll;
mod session;
mod stack;

pub use config::{NavigatorConfig, DEFAULT_STORAGE_KEY};
pub use descriptor::{render_tree, resolve_path, NavElement, PORTAL_NAVIGATION};
pub use messenger::{
    ChannelMessenger, NoopChannel, PrivilegedChannel, PrivilegedRequest, PrivilegedRequestKind,
};
pub use navigator::{Navigator, NavigatorBuilder};
pub use session::{FileStorage, MemoryStorage, SessionRecord, SessionStorage};
pub use stack::{NavEntry, NavigationStack};
