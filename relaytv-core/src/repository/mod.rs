pub mod channel;
pub mod profile;
pub mod server;
pub mod session;
pub mod stream;
pub mod subscription;

pub use channel::ChannelRepository;
pub use profile::ProfileRepository;
pub use server::EdgeServerRepository;
pub use session::SessionRepository;
pub use stream::StreamRepository;
pub use subscription::SubscriptionRepository;
