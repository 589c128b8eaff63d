mod dependency_index;
mod permission_policy;
mod string_set;

pub use dependency_index::DependencyIndex;
pub use permission_policy::{PermissionPolicy, PolicyDecision};
pub use string_set::StringSet;
