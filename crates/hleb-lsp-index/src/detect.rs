//! HLEB2 project detection.

use crate::composer::ComposerManifest;
use crate::tree::ProjectTree;

/// File every HLEB2 project ships with.
pub const BOOTSTRAP_MARKER: &str = "app/Bootstrap/BaseContainer.php";

/// Whether the project looks like an HLEB2 project.
///
/// Without a known root there is nothing to check and the answer is `true`.
pub fn is_framework_project(
    has_root: bool,
    tree: &ProjectTree,
    composer: Option<&ComposerManifest>,
) -> bool {
    if !has_root {
        return true;
    }
    tree.is_file(BOOTSTRAP_MARKER) || composer.is_some_and(|c| c.requires_framework)
}
