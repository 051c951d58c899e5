#![no_main]

use libfuzzer_sys::fuzz_target;
use scholar::artifact::{Artifact, ArtifactFormat};
use scholar::lookup::Lookup;

fuzz_target!(|data: &[u8]| {
    // Hosts load artifacts from disk; no byte sequence may panic the loader
    for format in [ArtifactFormat::Json, ArtifactFormat::MessagePack] {
        if let Ok(artifact) = Artifact::from_bytes(data, format) {
            // Anything that verifies must also be queryable
            let _ = Lookup::from_artifact(artifact);
        }
    }
});
