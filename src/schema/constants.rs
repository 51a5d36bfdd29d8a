/// samplestore format version - follows semantic versioning
pub const STORE_FORMAT_VERSION: &str = "1.0.0";

/// Magic bytes at the start of every store file
pub const STORE_MAGIC: &[u8; 8] = b"SMPSTORE";

/// Size of the reserved header region (magic + manifest length + manifest JSON)
pub const HEADER_SIZE: u64 = 4096;

/// Byte offset of the manifest JSON inside the header region
pub const MANIFEST_OFFSET: u64 = 16;

/// Alignment of each field region inside the data section
pub const FIELD_ALIGNMENT: u64 = 64;

/// Default file extension for store files
pub const STORE_EXTENSION: &str = "samples";

/// Default key of the image field
pub const DEFAULT_IMAGE_KEY: &str = "images";

/// Default key of the label field
pub const DEFAULT_LABEL_KEY: &str = "labels";

/// Default number of records buffered before an automatic flush
pub const DEFAULT_BUFFER_THRESHOLD: usize = 512;
