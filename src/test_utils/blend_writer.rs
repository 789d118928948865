//! Minimal `.blend` files for tests
//!
//! [`BlendFileBuilder`] writes a little-endian, 64-bit `BLENDER-v300` file: one `Library`
//! block per linked library, one `Image` block per image, optional `REND` blocks and the
//! SDNA block describing the structs. The layout follows what Blender writes, cut down to
//! the fields the extractor reads.

const POINTER_SIZE: usize = 8;
const ID_NAME_LEN: usize = 66;
const PATH_LEN: usize = 1024;
const FIRST_ADDRESS: u64 = 0x1000;

/// Primitive types, in the order Blender writes them at the start of the type table.
const PRIMITIVE_TYPES: &[(&str, u16)] = &[
    ("char", 1),
    ("uchar", 1),
    ("short", 2),
    ("ushort", 2),
    ("int", 4),
    ("long", 4),
    ("ulong", 4),
    ("float", 4),
    ("double", 8),
    ("int64_t", 8),
    ("uint64_t", 8),
    ("void", 0),
];

const TYPE_CHAR: u16 = 0;
const TYPE_VOID: u16 = 11;
const TYPE_ID: u16 = 12;
const TYPE_LIBRARY: u16 = 13;
const TYPE_IMAGE: u16 = 14;

const FIELD_NAMES: &[&str] = &["*next", "*prev", "name[66]", "id", "filepath[1024]", "*packedfile"];
const NAME_NEXT: u16 = 0;
const NAME_PREV: u16 = 1;
const NAME_ID_NAME: u16 = 2;
const NAME_ID: u16 = 3;
const NAME_FILEPATH: u16 = 4;
const NAME_PACKEDFILE: u16 = 5;

const STRUCT_LIBRARY: u32 = 1;
const STRUCT_IMAGE: u32 = 2;

const ID_LEN: usize = 2 * POINTER_SIZE + ID_NAME_LEN;
const LIBRARY_LEN: usize = ID_LEN + PATH_LEN;
const IMAGE_LEN: usize = ID_LEN + PATH_LEN + POINTER_SIZE;

#[derive(Debug, Clone)]
struct ImageBlock {
    filepath: String,
    packed: bool,
}

/// Builder for a `.blend` file with the given external references.
///
/// ```rust,ignore
/// let data = BlendFileBuilder::new()
///     .library("//rig/arm.blend")
///     .image("//tex/wood.png")
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlendFileBuilder {
    libraries: Vec<String>,
    images: Vec<ImageBlock>,
    render_outputs: Vec<String>,
}

impl BlendFileBuilder {
    /// A file with no blocks besides the SDNA.
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a library stored at `filepath`.
    #[must_use]
    pub fn library(mut self, filepath: &str) -> Self {
        self.libraries.push(filepath.to_string());
        self
    }

    /// Add an image read from `filepath`.
    #[must_use]
    pub fn image(mut self, filepath: &str) -> Self {
        self.images.push(ImageBlock {
            filepath: filepath.to_string(),
            packed: false,
        });
        self
    }

    /// Add an image whose data is packed into the file.
    #[must_use]
    pub fn packed_image(mut self, filepath: &str) -> Self {
        self.images.push(ImageBlock {
            filepath: filepath.to_string(),
            packed: true,
        });
        self
    }

    /// Add a `REND` block naming `output` as the render target.
    #[must_use]
    pub fn render_output(mut self, output: &str) -> Self {
        self.render_outputs.push(output.to_string());
        self
    }

    /// Serialize the file.
    pub fn build(&self) -> Vec<u8> {
        let mut out = b"BLENDER-v300".to_vec();
        let mut address = FIRST_ADDRESS;
        let mut next_address = || {
            address += 0x100;
            address
        };

        for output in &self.render_outputs {
            let mut data = vec![0x01];
            data.extend_from_slice(&fixed_str(output, PATH_LEN));
            push_block(&mut out, b"REND", next_address(), 0, &data);
        }

        for (index, filepath) in self.libraries.iter().enumerate() {
            let mut data = id_data(&format!("LIlib{index}"));
            data.extend_from_slice(&fixed_str(filepath, PATH_LEN));
            debug_assert_eq!(data.len(), LIBRARY_LEN);
            push_block(&mut out, b"LI\0\0", next_address(), STRUCT_LIBRARY, &data);
        }

        for (index, image) in self.images.iter().enumerate() {
            let packed_address = image.packed.then(&mut next_address);

            let mut data = id_data(&format!("IMimage{index}"));
            data.extend_from_slice(&fixed_str(&image.filepath, PATH_LEN));
            data.extend_from_slice(&packed_address.unwrap_or(0).to_le_bytes());
            debug_assert_eq!(data.len(), IMAGE_LEN);
            push_block(&mut out, b"IM\0\0", next_address(), STRUCT_IMAGE, &data);

            if let Some(packed_address) = packed_address {
                push_block(&mut out, b"DATA", packed_address, 0, b"PNG packed data");
            }
        }

        push_block(&mut out, b"DNA1", next_address(), 0, &sdna());
        out.extend_from_slice(b"ENDB");
        out.extend_from_slice(&[0u8; 20]);
        out
    }
}

/// Bytes of a `.blend` file referencing each of `references`.
///
/// References ending in `.blend` become linked libraries, everything else an image.
pub fn blend_file(references: &[&str]) -> Vec<u8> {
    references
        .iter()
        .fold(BlendFileBuilder::new(), |builder, reference| {
            if reference.ends_with(".blend") {
                builder.library(reference)
            } else {
                builder.image(reference)
            }
        })
        .build()
}

fn push_block(out: &mut Vec<u8>, code: &[u8; 4], address: u64, sdna_index: u32, data: &[u8]) {
    out.extend_from_slice(code);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&address.to_le_bytes());
    out.extend_from_slice(&sdna_index.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(data);
}

/// An `ID` with null list pointers.
fn id_data(name: &str) -> Vec<u8> {
    let mut data = vec![0u8; 2 * POINTER_SIZE];
    data.extend_from_slice(&fixed_str(name, ID_NAME_LEN));
    data
}

/// `value` as a NUL-padded `char[len]`.
fn fixed_str(value: &str, len: usize) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut field = bytes[..bytes.len().min(len - 1)].to_vec();
    field.resize(len, 0);
    field
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn sdna() -> Vec<u8> {
    let mut out = b"SDNA".to_vec();

    out.extend_from_slice(b"NAME");
    out.extend_from_slice(&(FIELD_NAMES.len() as u32).to_le_bytes());
    for name in FIELD_NAMES {
        out.extend_from_slice(name.as_bytes());
        out.push(0);
    }
    pad4(&mut out);

    let struct_types: [(&str, u16); 3] = [
        ("ID", ID_LEN as u16),
        ("Library", LIBRARY_LEN as u16),
        ("Image", IMAGE_LEN as u16),
    ];
    let types: Vec<(&str, u16)> =
        PRIMITIVE_TYPES.iter().copied().chain(struct_types).collect();

    out.extend_from_slice(b"TYPE");
    out.extend_from_slice(&(types.len() as u32).to_le_bytes());
    for (name, _) in &types {
        out.extend_from_slice(name.as_bytes());
        out.push(0);
    }
    pad4(&mut out);

    out.extend_from_slice(b"TLEN");
    for (_, len) in &types {
        out.extend_from_slice(&len.to_le_bytes());
    }
    pad4(&mut out);

    let structs: [(u16, &[(u16, u16)]); 3] = [
        (TYPE_ID, &[(TYPE_VOID, NAME_NEXT), (TYPE_VOID, NAME_PREV), (TYPE_CHAR, NAME_ID_NAME)]),
        (TYPE_LIBRARY, &[(TYPE_ID, NAME_ID), (TYPE_CHAR, NAME_FILEPATH)]),
        (
            TYPE_IMAGE,
            &[(TYPE_ID, NAME_ID), (TYPE_CHAR, NAME_FILEPATH), (TYPE_VOID, NAME_PACKEDFILE)],
        ),
    ];

    out.extend_from_slice(b"STRC");
    out.extend_from_slice(&(structs.len() as u32).to_le_bytes());
    for (type_index, fields) in structs {
        out.extend_from_slice(&type_index.to_le_bytes());
        out.extend_from_slice(&(fields.len() as u16).to_le_bytes());
        for (field_type, field_name) in fields {
            out.extend_from_slice(&field_type.to_le_bytes());
            out.extend_from_slice(&field_name.to_le_bytes());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_layout() {
        let data = BlendFileBuilder::new().library("//a.blend").build();

        assert!(data.starts_with(b"BLENDER-v300"));
        assert_eq!(&data[12..16], b"LI\0\0");
        assert_eq!(&data[16..20], &(LIBRARY_LEN as u32).to_le_bytes());
        assert_eq!(&data[data.len() - 24..data.len() - 20], b"ENDB");
    }

    #[test]
    fn test_blend_file_splits_libraries_and_images() {
        let data = blend_file(&["//rig/arm.blend", "//tex/wood.png"]);
        let libraries = data.windows(4).filter(|w| *w == b"LI\0\0").count();
        let images = data.windows(4).filter(|w| *w == b"IM\0\0").count();
        assert_eq!((libraries, images), (1, 1));
    }
}
