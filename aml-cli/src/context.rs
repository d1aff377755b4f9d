//! Shared setup: opening a [`MemoryStore`] and resolving the calling
//! [`Principal`] from the CLI's global flags.

use aml_core::cache::{AmlCacheManager, CachePolicy};
use aml_core::learning::LearningCoordinator;
use aml_core::memory::MemoryStore;
use aml_core::security::audit::AuditLogger;
use aml_core::security::roles::{Principal, Role};
use aml_core::storage::{EncryptionKey, FsStorageEngine, StorageOptions};
use aml_core::types::{AgentName, ProjectId};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;

/// Global flags shared by every subcommand, resolved once in `main`.
#[derive(Debug, Clone, clap::Args)]
pub struct GlobalArgs {
    /// Root of the on-disk memory tree (created if absent).
    #[arg(long, global = true, default_value = "./memory", env = "AML_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Calling project id.
    #[arg(long, global = true, default_value = "default", env = "AML_PROJECT")]
    pub project: String,

    /// Calling user id, recorded on every audit event.
    #[arg(long, global = true, default_value = "cli", env = "AML_USER")]
    pub user: String,

    /// Calling role: `read-only`, `developer`, or `admin`. Unknown values
    /// default to `developer`.
    #[arg(long, global = true, default_value = "developer", env = "AML_ROLE")]
    pub role: String,

    /// Disable encryption-at-rest (useful for local experimentation; the
    /// default assumes a key is provisioned out of band).
    #[arg(long, global = true)]
    pub no_encryption: bool,

    /// Passphrase the encryption key is derived from (SHA-256). Required
    /// unless `--no-encryption` is set; falls back to disabling encryption
    /// with a warning if omitted, rather than failing every write.
    #[arg(long, global = true, env = "AML_ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: Option<String>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = crate::output::OutputFormat::Human)]
    pub format: crate::output::OutputFormat,
}

/// Everything a command needs to talk to the store.
pub struct Context {
    pub store: MemoryStore,
    pub learning: Arc<LearningCoordinator>,
    pub principal: Principal,
    /// When this process started; used as the default window start for
    /// `aml health` since usage counters only cover the current process.
    pub started_at: DateTime<Utc>,
}

impl Context {
    /// Opens storage/cache/audit at `args.data_dir`, wires the learning
    /// coordinator as the facade's usage-event sink, and resolves the
    /// calling principal.
    pub fn open(args: &GlobalArgs) -> anyhow::Result<Self> {
        let encryption_key = args.encryption_key.as_ref().map(|passphrase| {
                let digest = Sha256::digest(passphrase.as_bytes());
                let mut key_bytes = [0u8; 32];
                key_bytes.copy_from_slice(&digest);
                EncryptionKey(key_bytes)
        });
        let encryption = !args.no_encryption && encryption_key.is_some();
        if !args.no_encryption && encryption_key.is_none() {
            tracing::warn!("no --encryption-key provided; storing records unencrypted");
        }

        let storage = FsStorageEngine::open(
            &args.data_dir,
            ProjectId::from(args.project.clone()),
            StorageOptions {
                compression: true,
                encryption,
            },
            encryption_key,
            1.0,
        )?;
        let cache = AmlCacheManager::new(1000, Some(std::time::Duration::from_secs(3600)), CachePolicy::Lru);
        let audit = Arc::new(AuditLogger::new(args.data_dir.join("audit")));
        let mut store = MemoryStore::new(storage, cache, audit, ProjectId::from(args.project.clone()));

        let learning = Arc::new(LearningCoordinator::new());
        store.set_learning_sink(learning.clone());

        let principal = Principal {
            user_id: args.user.clone(),
            role: Role::parse_or_default(&args.role),
            project_id: ProjectId::from(args.project.clone()),
            agent_name: None,
        };

        Ok(Self {
                store,
                learning,
                principal,
                started_at: Utc::now(),
        })
    }

    /// Principal scoped to `agent`, for commands that act on one agent's
    /// partition.
    #[must_use]
    pub fn principal_for(&self, agent: &str) -> Principal {
        Principal {
            agent_name: Some(AgentName::from(agent)),
            ..self.principal.clone()
        }
    }
}
