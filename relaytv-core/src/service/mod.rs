pub mod admission;
pub mod audit;
pub mod auth;
pub mod credential_encryption;
pub mod entitlement;
pub mod lifecycle;
pub mod remote_exec;
pub mod session_recorder;
pub mod transcode;
pub mod upstream;

pub use admission::AdmissionController;
pub use audit::{AuditAction, AuditEvent, AuditLog, AuditService, AuditTargetType};
pub use auth::{hash_password, verify_password, Claims, TokenService};
pub use credential_encryption::CredentialVault;
pub use entitlement::{Credentials, Entitlement, EntitlementGate};
pub use lifecycle::{StartResult, StreamLifecycleManager, StreamStatus};
pub use remote_exec::{
    is_command_allowed, ActorContext, RemoteExecutionService, ALLOWED_COMMANDS,
};
pub use session_recorder::{ClientInfo, SessionRecorder};
pub use transcode::{CommandOptions, ProcessRegistry, TranscodeSupervisor};
pub use upstream::{NormalizedPlaylist, UpstreamFormat, UpstreamNormalizer};
