use std::{fs::File, ops::Deref, path::Path};

use anyhow::{Context, Result};
use ash::{
    util::read_spv,
    vk::{self, ShaderModuleCreateInfo},
    Device,
};

use crate::BootstrapError;

/// Compiled SPIR-V for the two programmable stages.
#[derive(Debug, Clone, Default)]
pub struct ShaderCode {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

impl ShaderCode {
    pub fn load(vertex: impl AsRef<Path>, fragment: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            vertex: read_spirv(vertex.as_ref())?,
            fragment: read_spirv(fragment.as_ref())?,
        })
    }
}

/// Reads a SPIR-V file into aligned words.
pub fn read_spirv(path: &Path) -> Result<Vec<u32>> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open file: {}", path.display()))?;
    let code = read_spv(&mut file)
        .with_context(|| format!("invalid SPIR-V in {}", path.display()))?;
    Ok(code)
}

/// Shader module that only lives while the pipeline is being created.
pub struct ShaderModule {
    device: Device,
    shader_module: vk::ShaderModule,
}

impl ShaderModule {
    pub fn new(device: &Device, code: &[u32]) -> Result<Self, BootstrapError> {
        let create_info = ShaderModuleCreateInfo::default().code(code);
        let shader_module = unsafe { device.create_shader_module(&create_info, None) }
            .map_err(BootstrapError::ShaderModule)?;
        Ok(Self {
            device: device.clone(),
            shader_module,
        })
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device
                .destroy_shader_module(self.shader_module, None)
        }
    }
}

impl Deref for ShaderModule {
    type Target = vk::ShaderModule;

    fn deref(&self) -> &Self::Target {
        &self.shader_module
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    fn temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{}", std::process::id(), name));
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn reads_words_from_file() {
        let words = [SPIRV_MAGIC, 0x0001_0000, 7, 42];
        let bytes = words
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .collect::<Vec<_>>();
        let path = temp_file("valid.spv", &bytes);

        let code = read_spirv(&path).unwrap();
        assert_eq!(code, words);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn rejects_truncated_code() {
        let path = temp_file("truncated.spv", &[0x03, 0x02, 0x23]);
        assert!(read_spirv(&path).is_err());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_spirv(Path::new("does/not/exist.spv")).unwrap_err();
        assert!(format!("{:#}", err).contains("does/not/exist.spv"));
    }
}
