//! Optional extension codecs
//!
//! Each codec is a document-to-document transform applied after export and
//! undone before import. The concrete codecs live with the binary
//! serializer; this crate only drives them in the right order.

use fmdl_common::FmdlDocument;
use tracing::info;

use crate::error::Result;
use crate::settings::ExtensionFlags;

/// Reversible document transform
pub trait DocumentCodec {
    fn name(&self) -> &str;

    fn encode(&self, doc: FmdlDocument) -> Result<FmdlDocument>;

    fn decode(&self, doc: FmdlDocument) -> Result<FmdlDocument>;
}

/// Codec that leaves documents untouched
#[derive(Debug, Clone)]
pub struct Passthrough {
    name: String,
}

impl Passthrough {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl DocumentCodec for Passthrough {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, doc: FmdlDocument) -> Result<FmdlDocument> {
        Ok(doc)
    }

    fn decode(&self, doc: FmdlDocument) -> Result<FmdlDocument> {
        Ok(doc)
    }
}

/// The three extension codecs, in the order they are encoded
pub struct ExtensionCodecs {
    pub antiblur: Box<dyn DocumentCodec>,
    pub vertex_loop_preservation: Box<dyn DocumentCodec>,
    pub mesh_splitting: Box<dyn DocumentCodec>,
}

impl Default for ExtensionCodecs {
    fn default() -> Self {
        Self {
            antiblur: Box::new(Passthrough::new("antiblur")),
            vertex_loop_preservation: Box::new(Passthrough::new("vertex loop preservation")),
            mesh_splitting: Box::new(Passthrough::new("mesh splitting")),
        }
    }
}

impl ExtensionCodecs {
    fn stages<'a>(&'a self, flags: &ExtensionFlags) -> [(bool, &'a dyn DocumentCodec); 3] {
        [
            (flags.antiblur(), self.antiblur.as_ref()),
            (flags.vertex_loop_preservation(), self.vertex_loop_preservation.as_ref()),
            (flags.mesh_splitting(), self.mesh_splitting.as_ref()),
        ]
    }

    /// Antiblur, then vertex loop preservation, then mesh splitting
    pub fn encode(&self, mut doc: FmdlDocument, flags: &ExtensionFlags) -> Result<FmdlDocument> {
        for (enabled, codec) in self.stages(flags) {
            if enabled {
                info!("Encoding {}", codec.name());
                doc = codec.encode(doc)?;
            }
        }
        Ok(doc)
    }

    /// Reverse of [`ExtensionCodecs::encode`]
    pub fn decode(&self, mut doc: FmdlDocument, flags: &ExtensionFlags) -> Result<FmdlDocument> {
        for (enabled, codec) in self.stages(flags).into_iter().rev() {
            if enabled {
                info!("Decoding {}", codec.name());
                doc = codec.decode(doc)?;
            }
        }
        Ok(doc)
    }
}
