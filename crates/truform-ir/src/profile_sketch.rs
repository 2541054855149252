use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult, ErrorCode};
use crate::feature::FeatureKind;
use crate::part::Part;
use crate::sketch::Profile;

/// Which sketch feature owns a named profile, recorded while indexing a
/// part so both the validator and the graph builder can resolve
/// `profile.ref` indirections without re-scanning every feature.
#[derive(Debug, Clone)]
pub struct ProfileOwner {
    pub sketch_feature_id: String,
}

/// Build the name -> owning-sketch index for a part's inline (non-ref)
/// profiles. The name->sketch mapping must be injective: two sketches
/// defining the same profile name is a `profile_duplicate` error.
pub fn index_profiles(part: &Part) -> CoreResult<BTreeMap<String, ProfileOwner>> {
    let mut index = BTreeMap::new();
    for f in &part.features {
        let FeatureKind::Sketch(s) = &f.kind else {
            continue;
        };
        for profile in &s.profiles {
            if matches!(profile, Profile::ProfileRef { .. }) {
                continue;
            }
            let name = profile.name().to_string();
            if index
                .insert(
                    name.clone(),
                    ProfileOwner {
                        sketch_feature_id: f.id.clone(),
                    },
                )
                .is_some()
            {
                return Err(CoreError::new(
                    ErrorCode::ProfileDuplicate,
                    format!("profile name {:?} is defined by more than one sketch", name),
                )
                .feature(&f.id, f.kind.name())
                .with("referenceKind", "profile")
                .with("referenceId", name));
            }
        }
    }
    Ok(index)
}
