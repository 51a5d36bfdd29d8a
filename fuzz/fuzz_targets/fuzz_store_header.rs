#![no_main]

use libfuzzer_sys::fuzz_target;
use samplestore::schema::StoreManifest;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode or fail cleanly, never panic
    if let Ok(manifest) = StoreManifest::decode_header(data) {
        // Anything that decodes must describe a layout we can size and re-encode
        let _ = manifest.file_len();
        for field in &manifest.fields {
            let _ = field.record_offset(manifest.capacity);
        }
        let _ = manifest.encode_header();
    }
});
