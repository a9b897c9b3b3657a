pub mod channel;
pub mod id;
pub mod package;
pub mod profile;
pub mod server;
pub mod session;
pub mod stream;
pub mod subscription;
pub mod transcode;

pub use channel::{Channel, ChannelSource};
pub use id::{
    generate_id, ChannelId, PackageId, ServerId, SessionId, StreamId, SubscriptionId, UserId,
};
pub use package::Package;
pub use profile::{Profile, ProfileRole, ProfileStatus};
pub use server::EdgeServer;
pub use session::Session;
pub use stream::{Stream, StreamState};
pub use subscription::{Subscription, SubscriptionStatus};
pub use transcode::{AudioSettings, OutputFormat, TranscodeProfile, VideoSettings};
