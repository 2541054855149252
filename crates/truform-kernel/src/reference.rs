//! A deterministic, synthetic-topology kernel adapter. It does not run a
//! real B-rep engine — it fabricates box-shaped solids with exactly the
//! metadata contract in spec §3, which is all the evaluator and selector
//! resolver ever look at. Grounded on the same synthetic-topology approach
//! a real kernel integration test double would use: hand-built face/edge
//! tables with explicit normals, areas and centroids so every downstream
//! property (Euler's formula, deterministic ids, selection stability) is
//! checkable without a geometry library.

use std::collections::{BTreeMap, BTreeSet};

use truform_ir::feature::{BooleanOp, FeatureKind};
use truform_ir::selector::SelectorKind;
use truform_ir::{CoreError, CoreResult, ErrorCode, KernelObject, KernelResult, Stage, ValueType};

use crate::traits::{
    Capabilities, ExecuteInput, ExportCapabilities, FeatureCapability, KernelAdapter, MeshOptions, StepExportOptions,
    StlExportOptions,
};
use truform_ir::kernel_result::{FaceRange, KernelDiagnostics, RenderMesh};

/// A deterministic per-build id counter. IDs are derived from it, never
/// from wall-clock time or randomness, so two builds of the same document
/// produce byte-identical output (spec §8 Determinism).
#[derive(Debug, Default)]
pub struct ReferenceKernel {
    next_id: u64,
}

impl ReferenceKernel {
    pub fn new() -> Self {
        ReferenceKernel { next_id: 0 }
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}#{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// Six planar faces plus an opaque solid handle for an axis-aligned
    /// box of size `(w, h, d)` with one corner at the origin, extruded
    /// along +Z. Matches the face table a box-topology test double would
    /// hand-build: end caps at z=0/z=d, four side faces in XY.
    fn box_topology(&mut self, owner_key: &str, created_by: &str, w: f64, h: f64, d: f64) -> Vec<KernelObject> {
        let solid = KernelObject {
            id: self.fresh_id(&format!("{owner_key}:solid")),
            kind: SelectorKind::Solid,
            owner_key: owner_key.to_string(),
            created_by: created_by.to_string(),
            role: Some("solid".into()),
            planar: false,
            normal: None,
            area: Some(w * h * d),
            centroid: Some([w / 2.0, h / 2.0, d / 2.0]),
        };

        let face = |id: String, role: &str, normal: [f64; 3], area: f64, centroid: [f64; 3]| KernelObject {
            id,
            kind: SelectorKind::Face,
            owner_key: owner_key.to_string(),
            created_by: created_by.to_string(),
            role: Some(role.to_string()),
            planar: true,
            normal: Some(normal),
            area: Some(area),
            centroid: Some(centroid),
        };

        let faces = vec![
            face(
                self.fresh_id(&format!("{owner_key}:face")),
                "end_cap_negative",
                [0.0, 0.0, -1.0],
                w * h,
                [w / 2.0, h / 2.0, 0.0],
            ),
            face(
                self.fresh_id(&format!("{owner_key}:face")),
                "end_cap_positive",
                [0.0, 0.0, 1.0],
                w * h,
                [w / 2.0, h / 2.0, d],
            ),
            face(
                self.fresh_id(&format!("{owner_key}:face")),
                "side_face:0",
                [0.0, -1.0, 0.0],
                w * d,
                [w / 2.0, 0.0, d / 2.0],
            ),
            face(
                self.fresh_id(&format!("{owner_key}:face")),
                "side_face:1",
                [1.0, 0.0, 0.0],
                h * d,
                [w, h / 2.0, d / 2.0],
            ),
            face(
                self.fresh_id(&format!("{owner_key}:face")),
                "side_face:2",
                [0.0, 1.0, 0.0],
                w * d,
                [w / 2.0, h, d / 2.0],
            ),
            face(
                self.fresh_id(&format!("{owner_key}:face")),
                "side_face:3",
                [-1.0, 0.0, 0.0],
                h * d,
                [0.0, h / 2.0, d / 2.0],
            ),
        ];

        let edge_centroids: [[f64; 3]; 12] = [
            [0.0, 0.0, d / 2.0],
            [w, 0.0, d / 2.0],
            [w, h, d / 2.0],
            [0.0, h, d / 2.0],
            [w / 2.0, 0.0, 0.0],
            [w, h / 2.0, 0.0],
            [w / 2.0, h, 0.0],
            [0.0, h / 2.0, 0.0],
            [w / 2.0, 0.0, d],
            [w, h / 2.0, d],
            [w / 2.0, h, d],
            [0.0, h / 2.0, d],
        ];
        let edges = edge_centroids.into_iter().enumerate().map(|(i, centroid)| KernelObject {
            id: self.fresh_id(&format!("{owner_key}:edge")),
            kind: SelectorKind::Edge,
            owner_key: owner_key.to_string(),
            created_by: created_by.to_string(),
            role: Some(format!("edge:{i}")),
            planar: false,
            normal: None,
            area: None,
            centroid: Some(centroid),
        });

        let mut objects = vec![solid];
        objects.extend(faces);
        objects.extend(edges);
        objects
    }

    fn bounding_box_of(&self, objects: &[KernelObject], owner_key: &str) -> (f64, f64, f64) {
        let centroids: Vec<[f64; 3]> = objects
            .iter()
            .filter(|o| o.owner_key == owner_key && o.kind == SelectorKind::Face)
            .filter_map(|o| o.centroid)
            .collect();
        if centroids.is_empty() {
            return (10.0, 10.0, 10.0);
        }
        let max = |f: fn(&[f64; 3]) -> f64| centroids.iter().map(f).fold(f64::MIN, f64::max);
        (
            max(|c| c[0]) * 2.0,
            max(|c| c[1]) * 2.0,
            max(|c| c[2]) * 2.0,
        )
    }
}

fn unsupported(kind: &str) -> CoreError {
    CoreError::new(ErrorCode::BackendUnsupportedFeature, format!("reference kernel has no rule for {kind:?}"))
}

impl KernelAdapter for ReferenceKernel {
    fn capabilities(&self) -> Capabilities {
        let stable = [
            "plane.datum",
            "axis.datum",
            "frame.datum",
            "sketch",
            "extrude",
            "revolve",
            "sweep",
            "pipe",
            "pipe_sweep",
            "plane",
            "surface",
            "boolean",
            "hole",
            "fillet",
            "chamfer",
            "shell",
            "thicken",
            "mirror",
            "draft",
            "linear_pattern",
            "circular_pattern",
        ];
        let mut feature_kinds = BTreeSet::new();
        let mut feature_stages = BTreeMap::new();
        for k in stable {
            feature_kinds.insert(k.to_string());
            feature_stages.insert(
                k.to_string(),
                FeatureCapability {
                    stage: Stage::Stable,
                    notes: None,
                },
            );
        }
        for (k, notes) in [
            ("loft", "approximated as a box spanning the first and last profile bounds"),
            ("thread", "cosmetic only, no geometric thread cut"),
        ] {
            feature_kinds.insert(k.to_string());
            feature_stages.insert(
                k.to_string(),
                FeatureCapability {
                    stage: Stage::Beta,
                    notes: Some(notes.to_string()),
                },
            );
        }

        Capabilities {
            name: "truform-reference-kernel".into(),
            feature_kinds,
            feature_stages,
            mesh: true,
            exports: ExportCapabilities { step: true, stl: true },
            assertions: vec!["solid_count".into()],
        }
    }

    fn execute(&mut self, input: ExecuteInput<'_>) -> CoreResult<KernelResult> {
        let feature = input.feature;
        match &feature.kind {
            FeatureKind::PlaneDatum(p) => Ok(single(datum_object(self, &p.result, &feature.id, "datum_plane"))),
            FeatureKind::AxisDatum(p) => Ok(single(datum_object(self, &p.result, &feature.id, "datum_axis"))),
            FeatureKind::FrameDatum(p) => Ok(single(datum_object(self, &p.result, &feature.id, "datum_frame"))),
            FeatureKind::Sketch(_) => Ok(KernelResult::default()),
            FeatureKind::Extrude(p) => {
                let depth = (input.resolve_scalar)(&p.depth, ValueType::Length)?;
                let (w, h) = profile_extent(&p.profile, input.resolve_scalar)?;
                let owner = p.result.clone();
                let created = self.box_topology(&owner, &feature.id, w, h, depth);
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::Revolve(p) => {
                let angle = (input.resolve_scalar)(&p.angle, ValueType::Angle)?;
                let (w, h) = profile_extent(&p.profile, input.resolve_scalar)?;
                let owner = p.result.clone();
                let created = self.box_topology(&owner, &feature.id, w, h, w.max(h) * (angle / std::f64::consts::TAU).max(0.1));
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::Boolean(p) => {
                let a = (input.resolve)(&p.body_a)?;
                let b = (input.resolve)(&p.body_b)?;
                let owner = p.result.clone();
                let (w, h, d) = match p.operation {
                    BooleanOp::Union => {
                        let owner_a = a.first().map(|o| o.owner_key.clone()).unwrap_or_default();
                        self.bounding_box_of(input.upstream, &owner_a)
                    }
                    BooleanOp::Subtract | BooleanOp::Intersect => {
                        let owner_a = a.first().map(|o| o.owner_key.clone()).unwrap_or_default();
                        self.bounding_box_of(input.upstream, &owner_a)
                    }
                };
                let _ = &b;
                let created = self.box_topology(&owner, &feature.id, w, h, d);
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::Loft(p) => {
                let (w, h) = p
                    .profiles
                    .first()
                    .map(|pr| profile_extent(pr, input.resolve_scalar))
                    .transpose()?
                    .unwrap_or((10.0, 10.0));
                let owner = p.result.clone();
                let created = self.box_topology(&owner, &feature.id, w, h, 10.0);
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::Thread(p) => {
                let target = (input.resolve)(&p.target_body)?;
                let owner = target
                    .first()
                    .map(|o| o.owner_key.clone())
                    .ok_or_else(|| unsupported("thread: target body has no owner"))?;
                let (w, h, d) = self.bounding_box_of(input.upstream, &owner);
                let mut created = self.box_topology(&owner, &feature.id, w, h, d);
                for o in created.iter_mut().filter(|o| o.kind == SelectorKind::Face) {
                    o.role = Some("thread_applied".into());
                }
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::Hole(p) => {
                let target = (input.resolve)(&p.target_body)?;
                let placement = (input.resolve)(&p.placement)?;
                let _ = placement;
                let owner = target
                    .first()
                    .map(|o| o.owner_key.clone())
                    .ok_or_else(|| unsupported("hole: target body has no owner"))?;
                let (w, h, d) = self.bounding_box_of(input.upstream, &owner);
                let mut created = self.box_topology(&owner, &feature.id, w, h, d);
                for o in created.iter_mut().filter(|o| o.kind == SelectorKind::Face) {
                    o.role = Some(format!("{}:holed", o.role.clone().unwrap_or_default()));
                }
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::Fillet(p) => re_key_mutation(self, input.upstream, &(input.resolve)(&p.target_body)?, "fillet_face", &feature.id),
            FeatureKind::Chamfer(p) => re_key_mutation(self, input.upstream, &(input.resolve)(&p.target_body)?, "chamfer_face", &feature.id),
            FeatureKind::Shell(p) => re_key_mutation(self, input.upstream, &(input.resolve)(&p.target_body)?, "shell_inner_face", &feature.id),
            FeatureKind::Mirror(p) => re_key_mutation(self, input.upstream, &(input.resolve)(&p.target_body)?, "mirrored_face", &feature.id),
            FeatureKind::Thicken(p) => re_key_mutation(self, input.upstream, &(input.resolve)(&p.target_body)?, "thickened_face", &feature.id),
            FeatureKind::Draft(p) => re_key_mutation(self, input.upstream, &(input.resolve)(&p.target_body)?, "drafted_face", &feature.id),
            FeatureKind::Sweep(p) => {
                let (w, h) = profile_extent(&p.profile, input.resolve_scalar)?;
                let (pw, ph) = profile_extent(&p.path, input.resolve_scalar)?;
                let owner = p.result.clone();
                let created = self.box_topology(&owner, &feature.id, w, h, pw.max(ph).max(1.0));
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::Pipe(p) => {
                let outer = (input.resolve_scalar)(&p.outer_diameter, ValueType::Length)?;
                let (pw, ph) = profile_extent(&p.path, input.resolve_scalar)?;
                let owner = p.result.clone();
                let created = self.box_topology(&owner, &feature.id, outer, outer, pw.max(ph).max(1.0));
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::PipeSweep(p) => {
                let outer = (input.resolve_scalar)(&p.outer_diameter, ValueType::Length)?;
                let (pw, ph) = profile_extent(&p.path, input.resolve_scalar)?;
                let owner = p.result.clone();
                let created = self.box_topology(&owner, &feature.id, outer, outer, pw.max(ph).max(1.0));
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::PlaneOp(p) => {
                let w = (input.resolve_scalar)(&p.width, ValueType::Length)?;
                let h = (input.resolve_scalar)(&p.height, ValueType::Length)?;
                let owner = p.result.clone();
                let created = self.box_topology(&owner, &feature.id, w, h, 0.1);
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::Surface(p) => {
                let (w, h) = profile_extent(&p.profile, input.resolve_scalar)?;
                let owner = p.result.clone();
                let created = self.box_topology(&owner, &feature.id, w, h, 0.1);
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::LinearPattern(p) => {
                let seed = (input.resolve)(&p.seed)?;
                let count = (input.resolve_scalar)(&p.count, ValueType::Count)?.max(1.0) as usize;
                let owner = format!("{}:instances", feature.id);
                let mut created = Vec::new();
                let (w, h, d) = seed
                    .first()
                    .map(|o| self.bounding_box_of(input.upstream, &o.owner_key))
                    .unwrap_or((10.0, 10.0, 10.0));
                for _ in 0..count {
                    created.extend(self.box_topology(&owner, &feature.id, w, h, d));
                }
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            FeatureKind::CircularPattern(p) => {
                let seed = (input.resolve)(&p.seed)?;
                let count = (input.resolve_scalar)(&p.count, ValueType::Count)?.max(1.0) as usize;
                let owner = format!("{}:instances", feature.id);
                let mut created = Vec::new();
                let (w, h, d) = seed
                    .first()
                    .map(|o| self.bounding_box_of(input.upstream, &o.owner_key))
                    .unwrap_or((10.0, 10.0, 10.0));
                for _ in 0..count {
                    created.extend(self.box_topology(&owner, &feature.id, w, h, d));
                }
                Ok(KernelResult {
                    created,
                    deleted: vec![],
                    diagnostics: KernelDiagnostics::default(),
                })
            }
            other => Err(unsupported(other.name())),
        }
    }

    fn mesh(&self, object: &KernelObject, _options: &MeshOptions) -> CoreResult<RenderMesh> {
        if object.kind != SelectorKind::Solid {
            return Err(CoreError::new(ErrorCode::BackendMissingShape, "mesh() requires a solid KernelObject"));
        }
        let (w, h, d) = object.centroid.map(|c| (c[0] * 2.0, c[1] * 2.0, c[2] * 2.0)).unwrap_or((1.0, 1.0, 1.0));
        let corners: [[f64; 3]; 8] = [
            [0.0, 0.0, 0.0],
            [w, 0.0, 0.0],
            [w, h, 0.0],
            [0.0, h, 0.0],
            [0.0, 0.0, d],
            [w, 0.0, d],
            [w, h, d],
            [0.0, h, d],
        ];
        let quads: [[u32; 4]; 6] = [
            [0, 1, 2, 3],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        let mut indices = Vec::new();
        let mut face_ranges = Vec::new();
        for (i, quad) in quads.iter().enumerate() {
            let start = indices.len() as u32;
            indices.extend([quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]);
            face_ranges.push(FaceRange {
                face_id: format!("{}:face:{i}", object.id),
                start_index: start,
                end_index: indices.len() as u32,
            });
        }
        Ok(RenderMesh {
            vertices: corners.to_vec(),
            normals: vec![[0.0, 0.0, 1.0]; corners.len()],
            indices,
            face_ranges,
        })
    }

    fn export_step(&self, object: &KernelObject, _options: &StepExportOptions) -> CoreResult<Vec<u8>> {
        Ok(format!("ISO-10303-21;\nHEADER;\n/* synthetic export of {} */\nENDSEC;\nEND-ISO-10303-21;\n", object.id).into_bytes())
    }

    fn export_stl(&self, object: &KernelObject, options: &StlExportOptions) -> CoreResult<Vec<u8>> {
        use crate::traits::StlFormat;
        match options.format {
            StlFormat::Ascii => Ok(format!("solid {}\nendsolid {}\n", object.id, object.id).into_bytes()),
            StlFormat::Binary => Ok(vec![0u8; 84]),
        }
    }
}

fn single(o: KernelObject) -> KernelResult {
    KernelResult {
        created: vec![o],
        deleted: vec![],
        diagnostics: KernelDiagnostics::default(),
    }
}

fn datum_object(kernel: &mut ReferenceKernel, result: &str, feature_id: &str, role: &str) -> KernelObject {
    KernelObject {
        id: kernel.fresh_id(&format!("{result}:datum")),
        kind: SelectorKind::Solid,
        owner_key: result.to_string(),
        created_by: feature_id.to_string(),
        role: Some(role.to_string()),
        planar: true,
        normal: None,
        area: None,
        centroid: Some([0.0, 0.0, 0.0]),
    }
}

fn re_key_mutation(
    kernel: &mut ReferenceKernel,
    upstream: &[KernelObject],
    target: &truform_ir::KernelSelection,
    role: &str,
    feature_id: &str,
) -> CoreResult<KernelResult> {
    let owner = target
        .first()
        .map(|o| o.owner_key.clone())
        .ok_or_else(|| unsupported("mutation has no owner to re-key"))?;
    let (w, h, d) = {
        let centroids: Vec<[f64; 3]> = upstream
            .iter()
            .filter(|o| o.owner_key == owner && o.kind == SelectorKind::Face)
            .filter_map(|o| o.centroid)
            .collect();
        if centroids.is_empty() {
            (10.0, 10.0, 10.0)
        } else {
            let max = |f: fn(&[f64; 3]) -> f64| centroids.iter().map(f).fold(f64::MIN, f64::max);
            (max(|c| c[0]) * 2.0, max(|c| c[1]) * 2.0, max(|c| c[2]) * 2.0)
        }
    };
    let mut created = kernel.box_topology(&owner, feature_id, w, h, d);
    for o in created.iter_mut().filter(|o| o.kind == SelectorKind::Face) {
        o.role = Some(role.to_string());
    }
    Ok(KernelResult {
        created,
        deleted: vec![],
        diagnostics: KernelDiagnostics::default(),
    })
}

fn profile_extent(
    profile: &truform_ir::Profile,
    resolve_scalar: &dyn Fn(&truform_ir::Scalar, ValueType) -> CoreResult<f64>,
) -> CoreResult<(f64, f64)> {
    use truform_ir::Profile;
    match profile {
        Profile::Rectangle { width, height, .. } => Ok((
            resolve_scalar(width, ValueType::Length)?,
            resolve_scalar(height, ValueType::Length)?,
        )),
        Profile::Circle { radius, .. } => {
            let r = resolve_scalar(radius, ValueType::Length)?;
            Ok((r * 2.0, r * 2.0))
        }
        Profile::Poly { points, .. } => {
            let max_x = points.iter().map(|p| p[0]).fold(f64::MIN, f64::max);
            let max_y = points.iter().map(|p| p[1]).fold(f64::MIN, f64::max);
            Ok((max_x.max(1.0), max_y.max(1.0)))
        }
        Profile::Sketch { .. } | Profile::ProfileRef { .. } => Ok((10.0, 10.0)),
    }
}
