//! Mock implementations for isolating the view layer in tests.

use std::path::Path;

use mockall::mock;

use crate::resolver::TemplateProbe;

pub use crate::compress::MockOutputTransform;

mock! {
    pub Probe {}

    impl TemplateProbe for Probe {
        fn is_file(&self, path: &Path) -> bool;
        fn is_dir(&self, path: &Path) -> bool;
    }
}
