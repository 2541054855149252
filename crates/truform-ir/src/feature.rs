use serde::{Deserialize, Serialize};

use crate::expr::Scalar;
use crate::selector::{Axis, Selector};
use crate::sketch::{Profile, SketchEntity};

/// A common-or-garden plane/axis reference: either given inline, or
/// inherited from a named datum feature (creating an implicit dependency
/// edge resolved by the graph builder, §4.3 rule 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaneRef {
    Inline { origin: [f64; 3], normal: Axis },
    Datum { feature_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AxisRef {
    Inline { origin: [f64; 3], direction: Axis },
    Datum { feature_id: String },
}

/// Which side a linear extrude/pattern step runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtrudeMode {
    Blind,
    Symmetric,
    ThroughAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepOrientation {
    Fixed,
    Frenet,
    PathNormal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellDirection {
    Inward,
    Outward,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadHandedness {
    Right,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternFill {
    Count,
    Spacing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaneDatumParams {
    pub result: String,
    pub plane: PlaneRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisDatumParams {
    pub result: String,
    pub axis: AxisRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDatumParams {
    pub result: String,
    pub face: Selector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SketchParams {
    pub plane: PlaneRef,
    pub entities: Vec<SketchEntity>,
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtrudeParams {
    pub result: String,
    pub profile: Profile,
    pub depth: Scalar,
    #[serde(default)]
    pub direction: Option<Axis>,
    #[serde(default)]
    pub mode: Option<ExtrudeMode>,
    #[serde(default)]
    pub cut: bool,
    #[serde(default)]
    pub target_body: Option<Selector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevolveParams {
    pub result: String,
    pub profile: Profile,
    pub axis: AxisRef,
    pub angle: Scalar,
    #[serde(default)]
    pub cut: bool,
    #[serde(default)]
    pub target_body: Option<Selector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoftParams {
    pub result: String,
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub ruled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepParams {
    pub result: String,
    pub profile: Profile,
    pub path: Profile,
    #[serde(default)]
    pub orientation: Option<SweepOrientation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipeParams {
    pub result: String,
    pub path: Profile,
    pub outer_diameter: Scalar,
    pub inner_diameter: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipeSweepParams {
    pub result: String,
    pub path: Profile,
    pub outer_diameter: Scalar,
    pub inner_diameter: Scalar,
    #[serde(default)]
    pub orientation: Option<SweepOrientation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HexTubeSweepParams {
    pub result: String,
    pub path: Profile,
    pub across_flats: Scalar,
    pub wall_thickness: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaneOpParams {
    pub result: String,
    pub plane: PlaneRef,
    pub width: Scalar,
    pub height: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceParams {
    pub result: String,
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellParams {
    pub target_body: Selector,
    pub faces_to_remove: Selector,
    pub thickness: Scalar,
    #[serde(default)]
    pub direction: Option<ShellDirection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThickenParams {
    pub target_body: Selector,
    pub faces: Selector,
    pub thickness: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorParams {
    pub target_body: Selector,
    pub plane: PlaneRef,
    #[serde(default)]
    pub merge: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftParams {
    pub target_body: Selector,
    pub faces: Selector,
    pub neutral_plane: PlaneRef,
    pub angle: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadParams {
    pub target_body: Selector,
    pub edge: Selector,
    pub pitch: Scalar,
    pub length: Scalar,
    #[serde(default)]
    pub handedness: Option<ThreadHandedness>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleParams {
    pub target_body: Selector,
    pub placement: Selector,
    pub axis: AxisRef,
    pub diameter: Scalar,
    pub depth: Scalar,
    #[serde(default)]
    pub pattern_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilletParams {
    pub target_body: Selector,
    pub edges: Selector,
    pub radius: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChamferParams {
    pub target_body: Selector,
    pub edges: Selector,
    pub distance: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanParams {
    pub result: String,
    pub body_a: Selector,
    pub body_b: Selector,
    pub operation: BooleanOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearPatternParams {
    pub result: String,
    pub seed: Selector,
    pub direction: Axis,
    pub spacing: Scalar,
    pub count: Scalar,
    #[serde(default)]
    pub fill: Option<PatternFill>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircularPatternParams {
    pub result: String,
    pub seed: Selector,
    pub axis: AxisRef,
    pub angle: Scalar,
    pub count: Scalar,
}

/// The closed, exhaustively-matched feature kind set. Three groups: datums,
/// sketches, operations — see §3 of the document model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeatureKind {
    PlaneDatum(PlaneDatumParams),
    AxisDatum(AxisDatumParams),
    FrameDatum(FrameDatumParams),
    Sketch(SketchParams),
    Extrude(ExtrudeParams),
    Revolve(RevolveParams),
    Loft(LoftParams),
    Sweep(SweepParams),
    Pipe(PipeParams),
    PipeSweep(PipeSweepParams),
    HexTubeSweep(HexTubeSweepParams),
    PlaneOp(PlaneOpParams),
    Surface(SurfaceParams),
    Shell(ShellParams),
    Thicken(ThickenParams),
    Mirror(MirrorParams),
    Draft(DraftParams),
    Thread(ThreadParams),
    Hole(HoleParams),
    Fillet(FilletParams),
    Chamfer(ChamferParams),
    Boolean(BooleanParams),
    LinearPattern(LinearPatternParams),
    CircularPattern(CircularPatternParams),
}

/// Stability tier gating admission of a feature kind under the
/// `stagedFeatures` policy (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Stable,
    Beta,
    Staging,
}

impl FeatureKind {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::PlaneDatum(_) => "plane.datum",
            FeatureKind::AxisDatum(_) => "axis.datum",
            FeatureKind::FrameDatum(_) => "frame.datum",
            FeatureKind::Sketch(_) => "sketch",
            FeatureKind::Extrude(_) => "extrude",
            FeatureKind::Revolve(_) => "revolve",
            FeatureKind::Loft(_) => "loft",
            FeatureKind::Sweep(_) => "sweep",
            FeatureKind::Pipe(_) => "pipe",
            FeatureKind::PipeSweep(_) => "pipe_sweep",
            FeatureKind::HexTubeSweep(_) => "hex_tube_sweep",
            FeatureKind::PlaneOp(_) => "plane",
            FeatureKind::Surface(_) => "surface",
            FeatureKind::Shell(_) => "shell",
            FeatureKind::Thicken(_) => "thicken",
            FeatureKind::Mirror(_) => "mirror",
            FeatureKind::Draft(_) => "draft",
            FeatureKind::Thread(_) => "thread",
            FeatureKind::Hole(_) => "hole",
            FeatureKind::Fillet(_) => "fillet",
            FeatureKind::Chamfer(_) => "chamfer",
            FeatureKind::Boolean(_) => "boolean",
            FeatureKind::LinearPattern(_) => "linear_pattern",
            FeatureKind::CircularPattern(_) => "circular_pattern",
        }
    }

    /// Stability tier. Loft/sweep/thread/hex-tube-sweep are staging-tier in
    /// this implementation; everything else ships stable. Matches the
    /// `stagedFeatures` admission policy in §4.1.
    pub fn stage(&self) -> Stage {
        match self {
            FeatureKind::Loft(_) | FeatureKind::Thread(_) => Stage::Beta,
            FeatureKind::HexTubeSweep(_) => Stage::Staging,
            _ => Stage::Stable,
        }
    }

    /// The `result` output name this feature introduces, if any. Features
    /// that mutate an existing owning solid (hole/fillet/chamfer/shell/...)
    /// have no `result` of their own — they re-key an existing output.
    pub fn result_name(&self) -> Option<&str> {
        match self {
            FeatureKind::PlaneDatum(p) => Some(&p.result),
            FeatureKind::AxisDatum(p) => Some(&p.result),
            FeatureKind::FrameDatum(p) => Some(&p.result),
            FeatureKind::Extrude(p) => Some(&p.result),
            FeatureKind::Revolve(p) => Some(&p.result),
            FeatureKind::Loft(p) => Some(&p.result),
            FeatureKind::Sweep(p) => Some(&p.result),
            FeatureKind::Pipe(p) => Some(&p.result),
            FeatureKind::PipeSweep(p) => Some(&p.result),
            FeatureKind::HexTubeSweep(p) => Some(&p.result),
            FeatureKind::PlaneOp(p) => Some(&p.result),
            FeatureKind::Surface(p) => Some(&p.result),
            FeatureKind::Boolean(p) => Some(&p.result),
            FeatureKind::LinearPattern(p) => Some(&p.result),
            FeatureKind::CircularPattern(p) => Some(&p.result),
            FeatureKind::Sketch(_)
            | FeatureKind::Shell(_)
            | FeatureKind::Thicken(_)
            | FeatureKind::Mirror(_)
            | FeatureKind::Draft(_)
            | FeatureKind::Thread(_)
            | FeatureKind::Hole(_)
            | FeatureKind::Fillet(_)
            | FeatureKind::Chamfer(_) => None,
        }
    }

    /// The selector that anchors this feature to the solid it mutates, for
    /// kinds that re-key an existing owner rather than producing a fresh
    /// `result`.
    pub fn target_body(&self) -> Option<&Selector> {
        match self {
            FeatureKind::Shell(p) => Some(&p.target_body),
            FeatureKind::Thicken(p) => Some(&p.target_body),
            FeatureKind::Mirror(p) => Some(&p.target_body),
            FeatureKind::Draft(p) => Some(&p.target_body),
            FeatureKind::Thread(p) => Some(&p.target_body),
            FeatureKind::Hole(p) => Some(&p.target_body),
            FeatureKind::Fillet(p) => Some(&p.target_body),
            FeatureKind::Chamfer(p) => Some(&p.target_body),
            _ => None,
        }
    }

    /// Every selector embedded anywhere in this feature's parameters, used
    /// by the graph builder (implicit selector deps) and the validator
    /// (anchoring invariant).
    pub fn selectors(&self) -> Vec<&Selector> {
        let mut out = Vec::new();
        match self {
            FeatureKind::FrameDatum(p) => out.push(&p.face),
            FeatureKind::Extrude(p) => {
                if let Some(s) = &p.target_body {
                    out.push(s);
                }
            }
            FeatureKind::Revolve(p) => {
                if let Some(s) = &p.target_body {
                    out.push(s);
                }
            }
            FeatureKind::Shell(p) => {
                out.push(&p.target_body);
                out.push(&p.faces_to_remove);
            }
            FeatureKind::Thicken(p) => {
                out.push(&p.target_body);
                out.push(&p.faces);
            }
            FeatureKind::Mirror(p) => out.push(&p.target_body),
            FeatureKind::Draft(p) => {
                out.push(&p.target_body);
                out.push(&p.faces);
            }
            FeatureKind::Thread(p) => {
                out.push(&p.target_body);
                out.push(&p.edge);
            }
            FeatureKind::Hole(p) => {
                out.push(&p.target_body);
                out.push(&p.placement);
            }
            FeatureKind::Fillet(p) => {
                out.push(&p.target_body);
                out.push(&p.edges);
            }
            FeatureKind::Chamfer(p) => {
                out.push(&p.target_body);
                out.push(&p.edges);
            }
            FeatureKind::Boolean(p) => {
                out.push(&p.body_a);
                out.push(&p.body_b);
            }
            FeatureKind::LinearPattern(p) => out.push(&p.seed),
            FeatureKind::CircularPattern(p) => out.push(&p.seed),
            FeatureKind::PlaneDatum(_)
            | FeatureKind::AxisDatum(_)
            | FeatureKind::Sketch(_)
            | FeatureKind::Loft(_)
            | FeatureKind::Sweep(_)
            | FeatureKind::Pipe(_)
            | FeatureKind::PipeSweep(_)
            | FeatureKind::HexTubeSweep(_)
            | FeatureKind::PlaneOp(_)
            | FeatureKind::Surface(_) => {}
        }
        out
    }

    pub fn plane_refs(&self) -> Vec<&PlaneRef> {
        match self {
            FeatureKind::PlaneDatum(p) => vec![&p.plane],
            FeatureKind::Sketch(p) => vec![&p.plane],
            FeatureKind::PlaneOp(p) => vec![&p.plane],
            FeatureKind::Mirror(p) => vec![&p.plane],
            FeatureKind::Draft(p) => vec![&p.neutral_plane],
            _ => Vec::new(),
        }
    }

    pub fn axis_refs(&self) -> Vec<&AxisRef> {
        match self {
            FeatureKind::AxisDatum(p) => vec![&p.axis],
            FeatureKind::Revolve(p) => vec![&p.axis],
            FeatureKind::Hole(p) => vec![&p.axis],
            FeatureKind::CircularPattern(p) => vec![&p.axis],
            _ => Vec::new(),
        }
    }

    /// `profile.ref` indirections embedded in this feature, for the
    /// implicit profile-dependency rule (§4.3 rule 2).
    pub fn profile_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        fn push<'a>(p: &'a Profile, out: &mut Vec<&'a str>) {
            if let Profile::ProfileRef { name } = p {
                out.push(name.as_str());
            }
        }
        match self {
            FeatureKind::Extrude(p) => push(&p.profile, &mut out),
            FeatureKind::Revolve(p) => push(&p.profile, &mut out),
            FeatureKind::Loft(p) => p.profiles.iter().for_each(|pr| push(pr, &mut out)),
            FeatureKind::Sweep(p) => {
                push(&p.profile, &mut out);
                push(&p.path, &mut out);
            }
            FeatureKind::Pipe(p) => push(&p.path, &mut out),
            FeatureKind::PipeSweep(p) => push(&p.path, &mut out),
            FeatureKind::HexTubeSweep(p) => push(&p.path, &mut out),
            FeatureKind::Surface(p) => push(&p.profile, &mut out),
            _ => {}
        }
        out
    }

    pub fn pattern_ref(&self) -> Option<&str> {
        match self {
            FeatureKind::Hole(p) => p.pattern_ref.as_deref(),
            _ => None,
        }
    }

    /// Every `Profile` value this feature carries directly, whatever shape
    /// it takes (`profile.ref` indirection, an inline rectangle/circle/poly,
    /// or a raw `Profile::Sketch`). Used to reject an inline
    /// `Profile::Sketch` anywhere a feature expects `profile.ref` to reach
    /// a sketch's profile instead (§4.1: sketch profiles are only reachable
    /// by reference).
    pub fn inline_profiles(&self) -> Vec<&Profile> {
        match self {
            FeatureKind::Extrude(p) => vec![&p.profile],
            FeatureKind::Revolve(p) => vec![&p.profile],
            FeatureKind::Loft(p) => p.profiles.iter().collect(),
            FeatureKind::Sweep(p) => vec![&p.profile, &p.path],
            FeatureKind::Pipe(p) => vec![&p.path],
            FeatureKind::PipeSweep(p) => vec![&p.path],
            FeatureKind::HexTubeSweep(p) => vec![&p.path],
            FeatureKind::Surface(p) => vec![&p.profile],
            _ => Vec::new(),
        }
    }
}

/// A feature node in a part's construction history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,
    #[serde(flatten)]
    pub kind: FeatureKind,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
