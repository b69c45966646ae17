//! Tar member lookup over an in-memory archive.
//!
//! Walks the 512-byte block structure, reading only the NUL-terminated
//! member name and the octal size from each header. Checksums are not
//! verified; unknown members are skipped.

const BLOCK_SIZE: usize = 512;

const NAME_OFFSET: usize = 0;
const NAME_LEN: usize = 100;
const SIZE_OFFSET: usize = 124;
const SIZE_LEN: usize = 12;

fn header_name(header: &[u8]) -> &[u8] {
    let field = &header[NAME_OFFSET..NAME_OFFSET + NAME_LEN];
    let end = field.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    &field[..end]
}

fn header_size(header: &[u8]) -> usize {
    let field = &header[SIZE_OFFSET..SIZE_OFFSET + SIZE_LEN];
    let mut size = 0usize;
    for &byte in field {
        if !byte.is_ascii_digit() {
            break;
        }
        size = size * 8 + usize::from(byte - b'0');
    }
    size
}

/// Returns the content of the named member, or an empty slice if the
/// member is not present (or the block structure ends early).
pub(crate) fn member<'a>(data: &'a [u8], name: &str) -> &'a [u8] {
    let mut rest = data;
    while rest.len() >= BLOCK_SIZE {
        let (header, after_header) = rest.split_at(BLOCK_SIZE);

        let size = header_size(header);
        let block_count = size.div_ceil(BLOCK_SIZE);
        if after_header.len() < block_count * BLOCK_SIZE {
            return &[];
        }
        let (blocks, after_member) = after_header.split_at(block_count * BLOCK_SIZE);

        if header_name(header) == name.as_bytes() {
            return &blocks[..size];
        }
        rest = after_member;
    }
    &[]
}
