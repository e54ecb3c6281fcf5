//! Selection block rules.
//!
//! Some selections are not worth spending a panel on (folders, plugin
//! binaries, assembly definitions). The rules here decide which selections the
//! rotation scheduler ignores.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;

use crate::host::{ObjectCatalog, ObjectDescriptor, ObjectId, ObjectKind};

const NATIVE_PLUGIN_EXTENSIONS: &[&str] = &["dll", "so", "bundle"];
const ASSEMBLY_DEFINITION_EXTENSIONS: &[&str] = &["asmdef", "asmref"];

/// Predicate returning `true` for selections the scheduler should ignore.
pub type SelectionPredicate = Rc<dyn Fn(ObjectId) -> bool>;

/// `[filter]` section: which categories of selection to ignore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockRules {
    pub block_folders: bool,
    pub block_default_assets: bool,
    pub block_assembly_definitions: bool,
    pub block_native_plugins: bool,
    pub block_text_assets: bool,
    pub block_lighting_settings: bool,
    pub block_shaders: bool,
    pub block_fonts: bool,
}

impl Default for BlockRules {
    fn default() -> Self {
        Self {
            block_folders: true,
            block_default_assets: true,
            block_assembly_definitions: true,
            block_native_plugins: true,
            block_text_assets: false,
            block_lighting_settings: false,
            block_shaders: false,
            block_fonts: false,
        }
    }
}

impl BlockRules {
    /// Rules that block nothing.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            block_folders: false,
            block_default_assets: false,
            block_assembly_definitions: false,
            block_native_plugins: false,
            block_text_assets: false,
            block_lighting_settings: false,
            block_shaders: false,
            block_fonts: false,
        }
    }

    /// Whether a selection described by `desc` should be ignored.
    #[must_use]
    pub fn blocks(&self, desc: &ObjectDescriptor) -> bool {
        let ext = extension(desc);
        let ext = ext.as_deref();

        if self.block_folders && desc.is_asset() && desc.kind == ObjectKind::Folder {
            return true;
        }

        // The specific rules only widen the default-asset rule.
        if desc.kind == ObjectKind::DefaultAsset {
            if self.block_native_plugins && is_one_of(ext, NATIVE_PLUGIN_EXTENSIONS) {
                return true;
            }
            if self.block_assembly_definitions && is_one_of(ext, ASSEMBLY_DEFINITION_EXTENSIONS) {
                return true;
            }
            if self.block_default_assets {
                return true;
            }
        }

        if self.block_assembly_definitions
            && (desc.kind == ObjectKind::AssemblyDefinition
                || is_one_of(ext, ASSEMBLY_DEFINITION_EXTENSIONS))
        {
            return true;
        }

        match desc.kind {
            ObjectKind::TextAsset => self.block_text_assets,
            ObjectKind::LightingSettings => self.block_lighting_settings,
            ObjectKind::Shader | ObjectKind::ComputeShader => self.block_shaders,
            ObjectKind::Font => self.block_fonts,
            _ => false,
        }
    }
}

/// Lowercased file extension of the object's asset path.
fn extension(desc: &ObjectDescriptor) -> Option<String> {
    let path = desc.asset_path.as_deref()?;
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn is_one_of(ext: Option<&str>, set: &[&str]) -> bool {
    ext.is_some_and(|e| set.contains(&e))
}

/// Build the scheduler's filter predicate. Objects the catalog cannot describe
/// are never blocked.
#[must_use]
pub fn selection_predicate(catalog: Rc<dyn ObjectCatalog>, rules: BlockRules) -> SelectionPredicate {
    Rc::new(move |object| {
        catalog
            .describe(object)
            .is_some_and(|desc| rules.blocks(&desc))
    })
}
