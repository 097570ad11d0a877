use authz::DenyReason;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::error::{Result, UserError};

const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Outcome recorded with an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied(DenyReason),
}

impl AuditOutcome {
    fn as_result(&self) -> String {
        match self {
            AuditOutcome::Success => "success".to_string(),
            AuditOutcome::Failure => "failure".to_string(),
            AuditOutcome::Denied(reason) => format!("denied:{}", reason),
        }
    }
}

/// Represents a single entry in the admin audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureLogEntry {
    /// Unique ID for this log entry
    pub id: String,
    /// Timestamp of the event
    pub timestamp: DateTime<Utc>,
    /// External uid of the admin who acted (None for anonymous or system)
    pub actor: Option<String>,
    /// Type of action performed
    pub action: String,
    /// Target of the action (e.g., the admin user being modified)
    pub target: Option<String>,
    /// Additional details about the action
    pub details: Option<serde_json::Value>,
    /// IP address of the request
    pub ip_address: Option<String>,
    /// `success`, `failure` or `denied:<reason>`
    pub result: String,
    /// Hash of the previous log entry for chain verification
    pub previous_hash: String,
    /// Hash of this log entry
    pub entry_hash: String,
}

impl SecureLogEntry {
    /// Create a new log entry chained to `previous_hash`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        actor: Option<String>,
        action: String,
        target: Option<String>,
        details: Option<serde_json::Value>,
        ip_address: Option<String>,
        result: String,
        previous_hash: String,
    ) -> Self {
        let mut entry = Self {
            id: ulid::Ulid::new().to_string(),
            timestamp: Utc::now(),
            actor,
            action,
            target,
            details,
            ip_address,
            result,
            previous_hash,
            entry_hash: String::new(),
        };

        entry.entry_hash = entry.calculate_hash();
        entry
    }

    /// Calculate the SHA256 hash of this log entry
    fn calculate_hash(&self) -> String {
        let mut hasher = Sha256::new();

        // Every field except entry_hash; optional fields are tagged so that a
        // missing value never hashes like an empty one.
        hasher.update(self.id.as_bytes());
        hasher.update(self.timestamp.to_rfc3339().as_bytes());

        for field in [&self.actor, &self.target, &self.ip_address] {
            match field {
                Some(value) => {
                    hasher.update(b"1");
                    hasher.update(value.as_bytes());
                }
                None => hasher.update(b"0"),
            }
        }

        hasher.update(self.action.as_bytes());

        if let Some(ref details) = self.details {
            hasher.update(details.to_string().as_bytes());
        }

        hasher.update(self.result.as_bytes());
        hasher.update(self.previous_hash.as_bytes());

        hex::encode(hasher.finalize())
    }

    /// Verify the hash of this log entry
    pub fn verify_hash(&self) -> bool {
        self.entry_hash == self.calculate_hash()
    }
}

/// Configuration for the secure logger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureLogConfig {
    /// Path to the audit log file
    pub log_path: PathBuf,
    /// Maximum size of the log file before rotation (in MB)
    pub max_size_mb: u64,
    /// Number of rotated log files to keep
    pub max_rotations: u32,
}

impl Default for SecureLogConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("data/admin/audit.log"),
            max_size_mb: 100,
            max_rotations: 10,
        }
    }
}

/// Action of the entry that opens a file after rotation. It links to the
/// last entry of the rotated file named in its details.
pub const ROTATION_ACTION: &str = "audit_log_rotated";

/// Hash and length of the active file as of the last append
#[derive(Debug)]
struct ChainTail {
    hash: String,
    file_len: u64,
}

/// Append-only, hash-chained audit log of admin actions and access denials.
///
/// Several processes (the server, `sfadm`) may append to the same file.
/// Appends take an exclusive lock on a sibling `.lock` file and re-read the
/// tail whenever the file changed since this logger last wrote it.
pub struct SecureLogger {
    config: SecureLogConfig,
    chain: RwLock<ChainTail>,
}

impl SecureLogger {
    /// Create a new secure logger, continuing the chain of an existing file
    pub fn new(config: SecureLogConfig) -> Result<Self> {
        if let Some(parent) = config.log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut tail = ChainTail {
            hash: GENESIS_HASH.to_string(),
            file_len: 0,
        };
        sync_tail(&config.log_path, &mut tail)?;

        Ok(Self {
            config,
            chain: RwLock::new(tail),
        })
    }

    /// Path of the active log file
    pub fn path(&self) -> &Path {
        &self.config.log_path
    }

    fn lock_path(&self) -> PathBuf {
        self.config.log_path.with_extension("lock")
    }

    /// Append an entry
    pub async fn log_action(
        &self,
        actor: Option<&str>,
        action: &str,
        target: Option<String>,
        details: Option<serde_json::Value>,
        ip_address: Option<String>,
        outcome: AuditOutcome,
    ) -> Result<()> {
        let mut tail = self.chain.write().await;

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        FileExt::lock_exclusive(&lock_file)?;

        sync_tail(&self.config.log_path, &mut tail)?;
        self.rotate_if_needed(&mut tail)?;

        let entry = SecureLogEntry::new(
            actor.map(str::to_string),
            action.to_string(),
            target,
            details,
            ip_address,
            outcome.as_result(),
            tail.hash.clone(),
        );
        self.append(&entry, &mut tail)?;

        drop(lock_file);

        info!(
            "Audit entry recorded: action={}, actor={}, result={}",
            action,
            actor.unwrap_or("-"),
            entry.result
        );

        Ok(())
    }

    /// Record an access denial with its reason
    pub async fn log_denial(
        &self,
        actor: Option<&str>,
        action: &str,
        target: Option<String>,
        reason: DenyReason,
    ) -> Result<()> {
        self.log_action(actor, action, target, None, None, AuditOutcome::Denied(reason))
            .await
    }

    fn append(&self, entry: &SecureLogEntry, tail: &mut ChainTail) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.log_path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        file.flush()?;

        tail.hash = entry.entry_hash.clone();
        tail.file_len = file.metadata()?.len();
        Ok(())
    }

    fn rotate_if_needed(&self, tail: &mut ChainTail) -> Result<()> {
        if tail.file_len == 0 {
            return Ok(());
        }

        if tail.file_len / (1024 * 1024) >= self.config.max_size_mb {
            self.rotate_logs(tail)?;
        }

        Ok(())
    }

    /// Move the active file aside and open the new one with an anchor entry
    /// linking to the last hash of the rotated file.
    fn rotate_logs(&self, tail: &mut ChainTail) -> Result<()> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%6f");
        let rotated_path = self
            .config
            .log_path
            .with_extension(format!("{}.log", timestamp));

        std::fs::rename(&self.config.log_path, &rotated_path)?;
        info!("Rotated audit log to: {:?}", rotated_path);

        let rotated_name = rotated_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let anchor = SecureLogEntry::new(
            None,
            ROTATION_ACTION.to_string(),
            None,
            Some(serde_json::json!({ "rotated_to": rotated_name })),
            None,
            AuditOutcome::Success.as_result(),
            tail.hash.clone(),
        );
        self.append(&anchor, tail)?;

        self.cleanup_old_rotations()
    }

    fn cleanup_old_rotations(&self) -> Result<()> {
        let Some(parent) = self.config.log_path.parent() else {
            return Ok(());
        };
        let active_name = self
            .config
            .log_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("audit.log")
            .to_string();
        let rotated_prefix = format!(
            "{}.",
            self.config
                .log_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("audit")
        );

        let mut rotated_files: Vec<_> = std::fs::read_dir(parent)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_name().to_str().is_some_and(|name| {
                    name.starts_with(&rotated_prefix) && name.ends_with(".log") && name != active_name
                })
            })
            .collect();

        rotated_files.sort_by_key(|entry| entry.file_name());

        let excess = rotated_files
            .len()
            .saturating_sub(self.config.max_rotations as usize);
        for old_file in rotated_files.iter().take(excess) {
            std::fs::remove_file(old_file.path())?;
            info!("Removed old audit rotation: {:?}", old_file.path());
        }

        Ok(())
    }

    /// Read every entry of the active file
    pub async fn entries(&self) -> Result<Vec<SecureLogEntry>> {
        let _chain = self.chain.read().await;
        read_entries(&self.config.log_path)
    }

    /// Verify the integrity of the active file's chain
    pub async fn verify_log_chain(&self) -> Result<bool> {
        let _chain = self.chain.read().await;
        verify_chain_file(&self.config.log_path)
    }
}

/// Re-read the tail hash when the file is not the length this logger left it at
fn sync_tail(path: &Path, tail: &mut ChainTail) -> Result<()> {
    let file_len = match std::fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };

    if file_len != tail.file_len {
        tail.hash = if file_len == 0 {
            GENESIS_HASH.to_string()
        } else {
            last_hash(path)?
        };
        tail.file_len = file_len;
    }

    Ok(())
}

fn last_hash(path: &Path) -> Result<String> {
    let reader = BufReader::new(File::open(path)?);

    let mut last_hash = GENESIS_HASH.to_string();
    for line in reader.lines().map_while(|r| r.ok()) {
        if let Ok(entry) = serde_json::from_str::<SecureLogEntry>(&line) {
            last_hash = entry.entry_hash;
        }
    }

    Ok(last_hash)
}

/// Whether the first entry of a file may start there: either the chain's
/// genesis, or a rotation anchor that links to the end of its predecessor.
/// A predecessor already pruned by rotation is taken as given.
fn is_chain_start(path: &Path, entry: &SecureLogEntry) -> Result<bool> {
    if entry.previous_hash == GENESIS_HASH {
        return Ok(true);
    }
    if entry.action != ROTATION_ACTION {
        return Ok(false);
    }

    let predecessor = entry
        .details
        .as_ref()
        .and_then(|details| details.get("rotated_to"))
        .and_then(|name| name.as_str())
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| path.parent().map(|dir| dir.join(name)));

    match predecessor {
        Some(predecessor) if predecessor.exists() => {
            Ok(last_hash(&predecessor)? == entry.previous_hash)
        }
        Some(_) => Ok(true),
        None => Ok(false),
    }
}

/// Parse a log file, rejecting any entry whose hash does not verify
pub fn read_entries(path: &Path) -> Result<Vec<SecureLogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let entry: SecureLogEntry = serde_json::from_str(&line).map_err(|e| {
            UserError::SecureLogError(format!("Failed to parse line {}: {}", index + 1, e))
        })?;

        if !entry.verify_hash() {
            return Err(UserError::HashVerificationFailed);
        }

        entries.push(entry);
    }

    Ok(entries)
}

/// Verify that every entry of a log file hashes correctly and links to the
/// one before it, and that the first entry opens the chain.
pub fn verify_chain_file(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }

    let reader = BufReader::new(File::open(path)?);
    let mut expected_previous_hash: Option<String> = None;
    let mut line_number = 0;

    for line in reader.lines() {
        line_number += 1;
        let line = line?;

        let entry: SecureLogEntry = serde_json::from_str(&line).map_err(|e| {
            UserError::SecureLogError(format!("Failed to parse line {}: {}", line_number, e))
        })?;

        if !entry.verify_hash() {
            error!(
                "Hash verification failed at line {}: entry_id={}",
                line_number, entry.id
            );
            return Ok(false);
        }

        match &expected_previous_hash {
            Some(expected) if &entry.previous_hash != expected => {
                error!(
                    "Chain verification failed at line {}: expected_previous={}, got={}",
                    line_number, expected, entry.previous_hash
                );
                return Ok(false);
            }
            Some(_) => {}
            None => {
                if !is_chain_start(path, &entry)? {
                    error!(
                        "Chain verification failed: first entry {} does not open the chain",
                        entry.id
                    );
                    return Ok(false);
                }
            }
        }

        expected_previous_hash = Some(entry.entry_hash);
    }

    info!(
        "Audit chain verification successful: {} entries verified",
        line_number
    );
    Ok(true)
}
