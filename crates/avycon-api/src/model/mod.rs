// Domain types built from decoded DVR payloads.

pub mod channel;
pub mod playback;
pub mod record;

pub use channel::{Channel, ConnectStatus};
pub use playback::{IdKey, PlaybackUrls, PrivateKeys};
pub use record::{DATE_FORMAT, SearchRecord, TIME_FORMAT, split_timestamp};
