//! The kernel adapter contract (spec §6.1) and a deterministic reference
//! implementation used for testing the rest of the pipeline without a real
//! B-rep geometry engine.

pub mod reference;
pub mod traits;

pub use reference::ReferenceKernel;
pub use traits::{
    Capabilities, ExecuteInput, ExportCapabilities, FeatureCapability, KernelAdapter, MeshOptions, StepExportOptions,
    StlExportOptions, StlFormat,
};
