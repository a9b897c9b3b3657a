//! Service initialization and dependency injection

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    repository::{
        ChannelRepository, EdgeServerRepository, ProfileRepository, SessionRepository,
        StreamRepository, SubscriptionRepository,
    },
    service::{
        AdmissionController, AuditService, CredentialVault, EntitlementGate, ProcessRegistry,
        RemoteExecutionService, SessionRecorder, StreamLifecycleManager, TokenService,
        TranscodeSupervisor, UpstreamNormalizer,
    },
    Config,
};

/// Container for all initialized services
#[derive(Clone)]
pub struct Services {
    /// Entitlement checks (auth, subscription, channel access)
    pub gate: Arc<EntitlementGate>,
    /// Stream start/stop/status orchestration
    pub lifecycle: Arc<StreamLifecycleManager>,
    /// Upstream source normalization for relay delivery
    pub normalizer: Arc<UpstreamNormalizer>,
    /// Transcoder process supervision
    pub supervisor: Arc<TranscodeSupervisor>,
    /// Operator remote execution channel
    pub remote_exec: Arc<RemoteExecutionService>,
    /// Audit trail writer
    pub audit: Arc<AuditService>,
    /// Channel catalog reads (playlist and Xtream endpoints)
    pub channels: ChannelRepository,
    /// Stream row reads (connection counts for the catalog API)
    pub streams: StreamRepository,
    /// Bearer token issuing and verification
    pub tokens: TokenService,
}

/// Initialize all core services
pub fn init_services(pool: PgPool, config: &Config) -> Result<Services, anyhow::Error> {
    info!("Initializing services...");

    let tokens = load_token_service(config)?;
    info!("Token service initialized");

    let profiles = ProfileRepository::new(pool.clone());
    let subscriptions = SubscriptionRepository::new(pool.clone());
    let channels = ChannelRepository::new(pool.clone());
    let streams = StreamRepository::new(pool.clone());
    let sessions = SessionRepository::new(pool.clone());
    let servers = EdgeServerRepository::new(pool.clone());

    let gate = Arc::new(EntitlementGate::new(
        profiles,
        subscriptions,
        channels.clone(),
        tokens.clone(),
    ));
    info!("Entitlement gate initialized");

    let admission = AdmissionController::new(streams.clone());

    let normalizer = Arc::new(UpstreamNormalizer::new(Duration::from_secs(
        config.streaming.upstream_timeout_seconds,
    ))?);
    info!("Upstream normalizer initialized");

    let registry = Arc::new(ProcessRegistry::new());
    let supervisor = Arc::new(TranscodeSupervisor::new(
        streams.clone(),
        sessions.clone(),
        registry,
        config.streaming.clone(),
    ));
    info!(
        "Transcode supervisor initialized (ffmpeg: {}, {} profiles)",
        config.streaming.ffmpeg_path,
        config.transcode_profiles.len()
    );

    let recorder = SessionRecorder::new(sessions);
    let audit = Arc::new(AuditService::new(pool));

    let lifecycle = Arc::new(StreamLifecycleManager::new(
        gate.clone(),
        admission,
        normalizer.clone(),
        supervisor.clone(),
        recorder,
        streams.clone(),
        channels.clone(),
        audit.clone(),
        config.transcode_profiles.clone(),
        config.streaming.public_base_url.clone(),
    ));
    info!("Stream lifecycle manager initialized");

    let vault = match &config.security.credential_key_hex {
        Some(hex_key) => Some(CredentialVault::from_hex_key(hex_key)?),
        None => {
            warn!("No credential master key configured; remote execution channel disabled");
            None
        }
    };
    let remote_exec = Arc::new(RemoteExecutionService::new(
        servers,
        vault,
        audit.clone(),
    )?);
    info!("Remote execution service initialized");

    Ok(Services {
        gate,
        lifecycle,
        normalizer,
        supervisor,
        remote_exec,
        audit,
        channels,
        streams,
        tokens,
    })
}

/// Load token service from the signing secret in configuration
fn load_token_service(config: &Config) -> Result<TokenService, anyhow::Error> {
    if config.security.jwt_secret.is_empty() {
        return Err(anyhow::anyhow!(
            "JWT secret is empty. Please set RELAYTV_SECURITY__JWT_SECRET or configure security.jwt_secret in the config file"
        ));
    }

    if config.security.jwt_secret == "change-me-in-production" {
        warn!("Using default JWT secret! This is insecure for production use.");
    }

    TokenService::new(
        config.security.jwt_secret.as_bytes(),
        config.security.access_token_duration_hours,
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize token service: {e}"))
}
