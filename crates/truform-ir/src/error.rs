use std::collections::BTreeMap;
use std::fmt;

/// A stable, coded error taxonomy shared by every stage of the pipeline.
///
/// Codes are grouped by the stage that raises them; see the module docs in
/// `validate`, `truform-graph`, `truform-eval` and `truform-cache` for which
/// stage owns which code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[non_exhaustive]
pub enum ErrorCode {
    ValidationSchema,
    ValidationContext,
    ValidationDuplicateId,
    ValidationScalar,
    ValidationSelector,
    ValidationStagedFeature,
    ValidationTolerance,
    ValidationEnum,
    DepMissing,
    ProfileDuplicate,
    ProfileMissing,
    PatternMissing,
    DatumAxisMissing,
    DatumPlaneMissing,
    SelectorAnchorMissing,
    SelectorNamedMissing,
    PredCreatedByMissing,
    Cycle,
    MissingFeature,
    BackendUnsupportedFeature,
    BackendMissingShape,
    BackendMissingCapability,
    SelectorEmpty,
    SelectorResolveFailed,
    BuildSessionNotFound,
    QuotaExceeded,
    JobTimeout,
    JobCanceled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationSchema => "validation_schema",
            ErrorCode::ValidationContext => "validation_context",
            ErrorCode::ValidationDuplicateId => "validation_duplicate_id",
            ErrorCode::ValidationScalar => "validation_scalar",
            ErrorCode::ValidationSelector => "validation_selector",
            ErrorCode::ValidationStagedFeature => "validation_staged_feature",
            ErrorCode::ValidationTolerance => "validation_tolerance",
            ErrorCode::ValidationEnum => "validation_enum",
            ErrorCode::DepMissing => "dep_missing",
            ErrorCode::ProfileDuplicate => "profile_duplicate",
            ErrorCode::ProfileMissing => "profile_missing",
            ErrorCode::PatternMissing => "pattern_missing",
            ErrorCode::DatumAxisMissing => "datum_axis_missing",
            ErrorCode::DatumPlaneMissing => "datum_plane_missing",
            ErrorCode::SelectorAnchorMissing => "selector_anchor_missing",
            ErrorCode::SelectorNamedMissing => "selector_named_missing",
            ErrorCode::PredCreatedByMissing => "pred_created_by_missing",
            ErrorCode::Cycle => "cycle",
            ErrorCode::MissingFeature => "missing_feature",
            ErrorCode::BackendUnsupportedFeature => "backend_unsupported_feature",
            ErrorCode::BackendMissingShape => "backend_missing_shape",
            ErrorCode::BackendMissingCapability => "backend_missing_capability",
            ErrorCode::SelectorEmpty => "selector_empty",
            ErrorCode::SelectorResolveFailed => "selector_resolve_failed",
            ErrorCode::BuildSessionNotFound => "build_session_not_found",
            ErrorCode::QuotaExceeded => "quota_exceeded",
            ErrorCode::JobTimeout => "job_timeout",
            ErrorCode::JobCanceled => "job_canceled",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error envelope surfaced by every core function: a stable code, a
/// human-readable message, and optional context naming the offending
/// feature/reference.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct CoreError {
    pub code: ErrorCode,
    pub message: String,
    pub context: BTreeMap<String, String>,
}

impl CoreError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    pub fn feature(self, feature_id: &str, feature_kind: &str) -> Self {
        self.with("featureId", feature_id).with("featureKind", feature_kind)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
