//! Build environment flags read once from the host.

/// Opt-in switch for arm64 optimizer images and artifact names
pub const ARM64_ENV_VAR: &str = "TERRARIUMS_ARCH_ARM64";

/// Host facts that change optimizer images and artifact file names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildEnv {
    /// Build with arm64 optimizer images, producing `-aarch64` artifacts
    pub arm64: bool,
}

impl BuildEnv {
    /// arm64 mode needs both an aarch64 host and the opt-in variable.
    pub fn detect() -> Self {
        let arm64 = cfg!(target_arch = "aarch64") && std::env::var_os(ARM64_ENV_VAR).is_some();
        Self { arm64 }
    }
}
