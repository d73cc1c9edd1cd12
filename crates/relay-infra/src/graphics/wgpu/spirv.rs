// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SPIR-V bytecode checks.
//!
//! Shaders arrive as raw bytes. Before anything reaches the device the stream
//! is checked for word alignment and a valid header, then decoded into host
//! order words for `wgpu::ShaderSource::SpirV`.

use relay_core::renderer::ShaderError;
use relay_core::ShaderHandle;

/// The first word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Magic, version, generator, bound and schema.
pub const HEADER_WORDS: usize = 5;

/// Decodes `bytecode` into words, validating the header.
///
/// Modules written on a machine of the other endianness are byte-swapped.
pub fn decode_words(handle: ShaderHandle, bytecode: &[u8]) -> Result<Vec<u32>, ShaderError> {
    let invalid = |reason: String| ShaderError::InvalidBytecode { handle, reason };

    if bytecode.len() % 4 != 0 {
        return Err(invalid(format!(
            "length {} is not a multiple of 4",
            bytecode.len()
        )));
    }
    if bytecode.len() < HEADER_WORDS * 4 {
        return Err(invalid(format!(
            "{} bytes is shorter than the {}-word header",
            bytecode.len(),
            HEADER_WORDS
        )));
    }

    let mut words: Vec<u32> = bytecode
        .chunks_exact(4)
        .map(bytemuck::pod_read_unaligned::<u32>)
        .collect();

    match words[0] {
        SPIRV_MAGIC => {}
        magic if magic.swap_bytes() == SPIRV_MAGIC => {
            words.iter_mut().for_each(|word| *word = word.swap_bytes());
        }
        magic => return Err(invalid(format!("bad magic number {magic:#010x}"))),
    }

    // The id bound must be non-zero for any real module.
    if words[3] == 0 {
        return Err(invalid("id bound is zero".to_string()));
    }

    Ok(words)
}

/// The version field of a validated module as `(major, minor)`.
pub fn version(words: &[u32]) -> Option<(u8, u8)> {
    let version = *words.get(1)?;
    Some((((version >> 16) & 0xff) as u8, ((version >> 8) & 0xff) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::Handle;

    fn module_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_ne_bytes()).collect()
    }

    fn minimal_module() -> Vec<u32> {
        vec![SPIRV_MAGIC, 0x0001_0300, 0, 8, 0, 0x0002_0011, 1]
    }

    #[test]
    fn valid_module_decodes() {
        let words = decode_words(ShaderHandle::from_raw(0), &module_bytes(&minimal_module()))
            .expect("module should decode");
        assert_eq!(words, minimal_module());
        assert_eq!(version(&words), Some((1, 3)));
    }

    #[test]
    fn byte_swapped_module_is_normalized() {
        let swapped: Vec<u32> = minimal_module().iter().map(|w| w.swap_bytes()).collect();
        let words = decode_words(ShaderHandle::from_raw(1), &module_bytes(&swapped)).unwrap();
        assert_eq!(words, minimal_module());
    }

    #[test]
    fn unaligned_length_is_rejected() {
        let mut bytes = module_bytes(&minimal_module());
        bytes.push(0);
        let err = decode_words(ShaderHandle::from_raw(2), &bytes).unwrap_err();
        assert!(err.to_string().contains("not a multiple of 4"));
    }

    #[test]
    fn truncated_header_is_rejected() {
        let bytes = module_bytes(&[SPIRV_MAGIC, 0x0001_0000]);
        assert!(matches!(
            decode_words(ShaderHandle::from_raw(0), &bytes),
            Err(ShaderError::InvalidBytecode { .. })
        ));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut words = minimal_module();
        words[0] = 0xdead_beef;
        let err = decode_words(ShaderHandle::from_raw(3), &module_bytes(&words)).unwrap_err();
        assert!(err.to_string().contains("0xdeadbeef"));
    }
}
