//! Build sessions (spec §4.6): a session pins a document id and remembers,
//! per part, which `PartBuild` key last succeeded, so a caller re-editing
//! one part of a multi-part document can reuse every other part's cached
//! build without resubmitting the whole document.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use truform_ir::{CoreError, CoreResult, ErrorCode, KernelObject};
use uuid::Uuid;

use crate::key::CacheKey;

/// A feature's last successful output within a session: the input hash it
/// was computed under, and the `KernelObject`s it produced. A partial
/// build reuses this verbatim when the feature's recomputed input hash
/// still matches (spec §4.6 partial build request).
#[derive(Debug, Clone)]
pub struct FeatureBuildRecord {
    pub input_hash: CacheKey,
    pub objects: Vec<KernelObject>,
}

/// Session ids are process-local bookkeeping, never part of the wire
/// format (spec's IR uses plain string ids throughout) — `uuid` is scoped
/// to exactly this purpose in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct BuildSession {
    pub id: SessionId,
    pub document_id: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    /// The `PartBuild` key that succeeded last, per part id. A caller may
    /// skip re-running a part whose current `part_build_key` still matches
    /// the recorded one (spec §4.6 partial-build reuse).
    part_builds: BTreeMap<String, CacheKey>,
    /// Keyed by `"{part_id}/{feature_id}"`, the last successful per-feature
    /// build — the finer-grained counterpart to `part_builds` that lets
    /// `partial_build` reuse individual features instead of a whole part.
    feature_builds: BTreeMap<String, FeatureBuildRecord>,
}

fn feature_key(part_id: &str, feature_id: &str) -> String {
    format!("{part_id}/{feature_id}")
}

impl BuildSession {
    fn new(id: SessionId, document_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        BuildSession {
            id,
            document_id: document_id.into(),
            created_at: now,
            last_used_at: now,
            part_builds: BTreeMap::new(),
            feature_builds: BTreeMap::new(),
        }
    }

    /// True if `candidate` matches the last successful build key recorded
    /// for `part_id` — the part can be skipped and its cached outputs
    /// reused as-is.
    pub fn can_reuse(&self, part_id: &str, candidate: CacheKey) -> bool {
        self.part_builds.get(part_id) == Some(&candidate)
    }

    pub fn record_part_build(&mut self, part_id: impl Into<String>, key: CacheKey) {
        self.part_builds.insert(part_id.into(), key);
    }

    /// The last recorded build of one feature within one part, if any.
    pub fn feature_build(&self, part_id: &str, feature_id: &str) -> Option<&FeatureBuildRecord> {
        self.feature_builds.get(&feature_key(part_id, feature_id))
    }

    pub fn record_feature_build(&mut self, part_id: &str, feature_id: &str, input_hash: CacheKey, objects: Vec<KernelObject>) {
        self.feature_builds
            .insert(feature_key(part_id, feature_id), FeatureBuildRecord { input_hash, objects });
    }
}

/// Owns every live session for a backend process, expiring ones idle past
/// their TTL and rejecting new sessions once `max_sessions` is reached
/// (spec §4.6 session expiry, per-tenant quota).
pub struct BuildSessionStore {
    sessions: BTreeMap<Uuid, BuildSession>,
    ttl: Duration,
    max_sessions: usize,
}

impl BuildSessionStore {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        BuildSessionStore {
            sessions: BTreeMap::new(),
            ttl,
            max_sessions,
        }
    }

    /// Default policy: 30 minute idle TTL, 256 concurrent sessions.
    pub fn with_defaults() -> Self {
        BuildSessionStore::new(Duration::minutes(30), 256)
    }

    pub fn create(&mut self, document_id: impl Into<String>, now: DateTime<Utc>) -> CoreResult<SessionId> {
        self.expire_stale(now);
        if self.sessions.len() >= self.max_sessions {
            return Err(CoreError::new(
                ErrorCode::QuotaExceeded,
                format!("session quota of {} reached", self.max_sessions),
            ));
        }
        let id = SessionId(Uuid::new_v4());
        self.sessions.insert(id.0, BuildSession::new(id, document_id, now));
        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> CoreResult<&BuildSession> {
        self.sessions
            .get(&id.0)
            .ok_or_else(|| CoreError::new(ErrorCode::BuildSessionNotFound, format!("no session {id}")))
    }

    pub fn touch(&mut self, id: SessionId, now: DateTime<Utc>) -> CoreResult<&mut BuildSession> {
        let session = self
            .sessions
            .get_mut(&id.0)
            .ok_or_else(|| CoreError::new(ErrorCode::BuildSessionNotFound, format!("no session {id}")))?;
        session.last_used_at = now;
        Ok(session)
    }

    pub fn close(&mut self, id: SessionId) {
        self.sessions.remove(&id.0);
    }

    /// Drops every session whose last use is older than the TTL. Called
    /// opportunistically on `create` so a long-idle backend never needs a
    /// background sweeper (spec §5 no hidden background work).
    pub fn expire_stale(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.sessions.retain(|_, s| now - s.last_used_at < ttl);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}
