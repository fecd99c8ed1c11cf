//! Collaborators shared by export and import

use crate::extensions::ExtensionCodecs;
use crate::settings::WeldPolicy;
use crate::skeleton::SkeletonKnowledgeBase;

/// Everything a conversion needs besides the scene and the document
pub struct ConversionContext<'a> {
    pub skeleton: &'a dyn SkeletonKnowledgeBase,
    pub codecs: ExtensionCodecs,
    pub weld: WeldPolicy,
}

impl<'a> ConversionContext<'a> {
    /// Context with passthrough codecs and the default weld policy
    pub fn new(skeleton: &'a dyn SkeletonKnowledgeBase) -> Self {
        Self {
            skeleton,
            codecs: ExtensionCodecs::default(),
            weld: WeldPolicy::default(),
        }
    }

    pub fn with_weld_policy(mut self, weld: WeldPolicy) -> Self {
        self.weld = weld;
        self
    }

    pub fn with_codecs(mut self, codecs: ExtensionCodecs) -> Self {
        self.codecs = codecs;
        self
    }
}

