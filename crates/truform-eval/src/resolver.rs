//! Selector resolution (spec §4.5): turning a declarative [`Selector`] into
//! a concrete [`KernelSelection`] against the objects accumulated so far in
//! a build. Two paths: `named` selectors look up an existing output by
//! name; typed selectors (`face`/`edge`/`solid`) filter the live object
//! pool by predicate, then rank with a stable, last-rule-dominant sort.

use std::collections::BTreeMap;

use truform_ir::selector::{Predicate, Rank};
use truform_ir::{CoreError, CoreResult, ErrorCode, KernelObject, KernelSelection, Selector};

/// Output-name prefixes that never correspond to a feature's declared
/// `result` and so are resolved by id lookup against the live pool instead
/// of the named-output index (mirrors `truform_graph::is_implicit_sentinel`,
/// which is why such references carry no dependency edge).
fn is_implicit_sentinel(name: &str) -> bool {
    ["face:", "edge:", "solid:", "surface:"].iter().any(|p| name.starts_with(p))
}

/// Resolves selectors against a snapshot of the build's live objects. Built
/// fresh before each feature's `execute` call so it only ever sees objects
/// produced by features earlier in the schedule.
pub struct SelectorResolver<'a> {
    outputs: &'a BTreeMap<String, Vec<KernelObject>>,
    pool: Vec<&'a KernelObject>,
}

impl<'a> SelectorResolver<'a> {
    pub fn new(outputs: &'a BTreeMap<String, Vec<KernelObject>>) -> Self {
        let mut pool: Vec<&KernelObject> = outputs.values().flatten().collect();
        pool.sort_by(|a, b| a.id.cmp(&b.id));
        SelectorResolver { outputs, pool }
    }

    pub fn resolve(&self, selector: &Selector) -> CoreResult<KernelSelection> {
        match selector {
            Selector::Named { name } => self.resolve_named(name),
            Selector::Face { predicates, rank } | Selector::Edge { predicates, rank } | Selector::Solid { predicates, rank } => {
                let kind = selector.kind().expect("typed selector always has a kind");
                let mut candidates: Vec<&KernelObject> = self.pool.iter().copied().filter(|o| o.kind == kind).collect();
                for p in predicates {
                    candidates.retain(|o| predicate_matches(o, p));
                }
                for r in rank {
                    self.apply_rank(&mut candidates, r);
                }
                if candidates.is_empty() {
                    return Err(CoreError::new(
                        ErrorCode::SelectorEmpty,
                        format!("selector matched no {kind:?} objects after predicates/rank"),
                    ));
                }
                Ok(KernelSelection {
                    objects: candidates.into_iter().cloned().collect(),
                })
            }
        }
    }

    /// A selector `name` may carry multi-ref syntax: several candidate
    /// names separated by commas or newlines, resolved to the first one
    /// that matches a live output (spec §4.5 step 1).
    fn resolve_named(&self, name: &str) -> CoreResult<KernelSelection> {
        if let Some(objects) = self.outputs.get(name) {
            return Ok(KernelSelection { objects: objects.clone() });
        }
        if name.contains(',') || name.contains('\n') {
            for candidate in name.split([',', '\n']).map(str::trim).filter(|c| !c.is_empty()) {
                if let Some(objects) = self.outputs.get(candidate) {
                    return Ok(KernelSelection { objects: objects.clone() });
                }
            }
        }
        if is_implicit_sentinel(name) {
            // An implicit-sentinel name references a specific prior object
            // by its own id rather than an owner key (e.g. a face handle
            // captured in a cache artifact). First match wins, per the
            // named-selector ambiguity rule.
            if let Some(obj) = self.pool.iter().find(|o| o.id == name) {
                return Ok(KernelSelection {
                    objects: vec![(*obj).clone()],
                });
            }
        }
        Err(CoreError::new(
            ErrorCode::SelectorNamedMissing,
            format!("named selector {name:?} does not match any live output"),
        )
        .with("referenceKind", "namedSelector")
        .with("referenceId", name.to_string()))
    }

    /// Stable-sorts `candidates` by one rank rule. Applying rules in the
    /// order the caller lists them makes the last rule dominant: earlier
    /// sorts only break ties the later sort leaves untouched.
    fn apply_rank(&self, candidates: &mut [&KernelObject], rank: &Rank) {
        match rank {
            Rank::MaxArea => {
                candidates.sort_by(|a, b| {
                    b.area
                        .unwrap_or(0.0)
                        .partial_cmp(&a.area.unwrap_or(0.0))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            Rank::MinZ => {
                candidates.sort_by(|a, b| {
                    z_of(a)
                        .partial_cmp(&z_of(b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            Rank::MaxZ => {
                candidates.sort_by(|a, b| {
                    z_of(b)
                        .partial_cmp(&z_of(a))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            Rank::ClosestTo { selector } => {
                if let Ok(reference) = self.resolve(selector) {
                    if let Some(target) = reference.first().and_then(|o| o.centroid) {
                        candidates.sort_by(|a, b| {
                            distance(a.centroid, target)
                                .partial_cmp(&distance(b.centroid, target))
                                .unwrap_or(std::cmp::Ordering::Equal)
                        });
                    }
                }
            }
        }
    }
}

fn z_of(o: &KernelObject) -> f64 {
    o.centroid.map(|c| c[2]).unwrap_or(0.0)
}

fn distance(centroid: Option<[f64; 3]>, target: [f64; 3]) -> f64 {
    match centroid {
        Some(c) => {
            let dx = c[0] - target[0];
            let dy = c[1] - target[1];
            let dz = c[2] - target[2];
            (dx * dx + dy * dy + dz * dz).sqrt()
        }
        None => f64::MAX,
    }
}

fn predicate_matches(o: &KernelObject, p: &Predicate) -> bool {
    match p {
        Predicate::Normal { axis } => o.normal == Some(axis.unit_vector()),
        Predicate::Planar => o.planar,
        Predicate::CreatedBy { feature_id } => &o.created_by == feature_id,
        Predicate::Role { role } => o.role.as_deref() == Some(role.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use truform_ir::selector::{Axis, SelectorKind};

    fn face(id: &str, owner: &str, created_by: &str, normal: [f64; 3], area: f64, z: f64) -> KernelObject {
        KernelObject {
            id: id.into(),
            kind: SelectorKind::Face,
            owner_key: owner.into(),
            created_by: created_by.into(),
            role: None,
            planar: true,
            normal: Some(normal),
            area: Some(area),
            centroid: Some([0.0, 0.0, z]),
        }
    }

    fn outputs_with(objects: Vec<KernelObject>) -> BTreeMap<String, Vec<KernelObject>> {
        let mut m: BTreeMap<String, Vec<KernelObject>> = BTreeMap::new();
        for o in objects {
            m.entry(o.owner_key.clone()).or_default().push(o);
        }
        m
    }

    #[test]
    fn named_selector_resolves_to_owner_bucket() {
        let objs = vec![face("body:main:face#0", "body:main", "base", [0.0, 0.0, 1.0], 50.0, 2.0)];
        let outputs = outputs_with(objs);
        let resolver = SelectorResolver::new(&outputs);
        let sel = resolver.resolve(&Selector::Named { name: "body:main".into() }).unwrap();
        assert_eq!(sel.objects.len(), 1);
    }

    #[test]
    fn max_area_rank_picks_largest_face() {
        let objs = vec![
            face("f1", "body:main", "base", [0.0, 0.0, 1.0], 10.0, 0.0),
            face("f2", "body:main", "base", [0.0, 0.0, 1.0], 99.0, 0.0),
        ];
        let outputs = outputs_with(objs);
        let resolver = SelectorResolver::new(&outputs);
        let sel = resolver
            .resolve(&Selector::Face {
                predicates: vec![Predicate::Normal { axis: Axis::PlusZ }],
                rank: vec![Rank::MaxArea],
            })
            .unwrap();
        assert_eq!(sel.first().unwrap().id, "f2");
    }

    #[test]
    fn created_by_predicate_prunes_other_features_faces() {
        let objs = vec![
            face("f1", "body:main", "base", [0.0, 0.0, 1.0], 10.0, 0.0),
            face("f2", "body:main", "other", [0.0, 0.0, 1.0], 99.0, 0.0),
        ];
        let outputs = outputs_with(objs);
        let resolver = SelectorResolver::new(&outputs);
        let sel = resolver
            .resolve(&Selector::Face {
                predicates: vec![Predicate::CreatedBy { feature_id: "base".into() }],
                rank: vec![],
            })
            .unwrap();
        assert_eq!(sel.objects.len(), 1);
        assert_eq!(sel.first().unwrap().id, "f1");
    }

    #[test]
    fn empty_match_is_selector_empty_error() {
        let outputs: BTreeMap<String, Vec<KernelObject>> = BTreeMap::new();
        let resolver = SelectorResolver::new(&outputs);
        let err = resolver
            .resolve(&Selector::Face {
                predicates: vec![],
                rank: vec![],
            })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SelectorEmpty);
    }

    #[test]
    fn comma_separated_name_resolves_to_first_match() {
        let objs = vec![face("f1", "body:second", "base", [0.0, 0.0, 1.0], 10.0, 0.0)];
        let outputs = outputs_with(objs);
        let resolver = SelectorResolver::new(&outputs);
        let sel = resolver
            .resolve(&Selector::Named {
                name: "body:first, body:second".into(),
            })
            .unwrap();
        assert_eq!(sel.objects.len(), 1);
        assert_eq!(sel.first().unwrap().owner_key, "body:second");
    }

    #[test]
    fn newline_separated_name_resolves_to_first_match() {
        let objs = vec![face("f1", "body:second", "base", [0.0, 0.0, 1.0], 10.0, 0.0)];
        let outputs = outputs_with(objs);
        let resolver = SelectorResolver::new(&outputs);
        let sel = resolver
            .resolve(&Selector::Named {
                name: "body:first\nbody:second".into(),
            })
            .unwrap();
        assert_eq!(sel.objects.len(), 1);
    }

    #[test]
    fn unknown_named_selector_is_an_error() {
        let outputs: BTreeMap<String, Vec<KernelObject>> = BTreeMap::new();
        let resolver = SelectorResolver::new(&outputs);
        let err = resolver.resolve(&Selector::Named { name: "body:nope".into() }).unwrap_err();
        assert_eq!(err.code, ErrorCode::SelectorNamedMissing);
    }
}
