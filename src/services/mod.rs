pub mod causal_resolver;
pub mod notice_writer;
pub mod portal;
pub mod sigae_portal;

pub use causal_resolver::{resolve, resolve_code, MatchKind, Resolution};
pub use notice_writer::{DocumentGenerator, NoticeFields, NoticeWriter};
pub use portal::{ActionForm, Lookup, PortalDriver, PortalLauncher};
pub use sigae_portal::{BrowserLauncher, SigaePortal};
