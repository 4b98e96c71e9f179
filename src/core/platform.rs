//! Platform context.
//!
//! A `PlatformContext` is the immutable snapshot of settings a resolution
//! pass runs against. It replaces any implicit host detection inside the
//! resolver: callers build one explicitly (from the host, from config, or
//! from CLI flags) and pass it into every evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Settings fixed for the duration of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformContext {
    /// Operating system: "Linux", "Windows", "Macos", "Emscripten", ...
    pub os: String,

    /// Compiler family: "gcc", "clang", "msvc", "apple-clang", ...
    pub compiler: String,

    /// CPU architecture: "x86_64", "armv8", "wasm", ...
    pub arch: String,

    /// Build type: "Release", "Debug", ...
    pub build_type: String,

    /// C++ standard level the compiler is configured for, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cppstd: Option<String>,
}

/// A platform field that conditions can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformField {
    Os,
    Compiler,
    Arch,
    BuildType,
}

impl fmt::Display for PlatformField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformField::Os => write!(f, "os"),
            PlatformField::Compiler => write!(f, "compiler"),
            PlatformField::Arch => write!(f, "arch"),
            PlatformField::BuildType => write!(f, "build_type"),
        }
    }
}

/// Architecture assumed when none is given.
pub const DEFAULT_ARCH: &str = "x86_64";

impl PlatformContext {
    /// Create a platform for the given OS with conventional defaults for
    /// the remaining settings.
    pub fn new(os: impl Into<String>) -> Self {
        let os = os.into();
        let compiler = default_compiler(&os).to_string();
        let arch = if os == "Emscripten" {
            "wasm".to_string()
        } else {
            DEFAULT_ARCH.to_string()
        };

        PlatformContext {
            os,
            compiler,
            arch,
            build_type: "Release".to_string(),
            cppstd: None,
        }
    }

    /// Detect the current host platform.
    pub fn host() -> Self {
        let os = normalize_os(std::env::consts::OS);
        let mut platform = PlatformContext::new(os);
        platform.arch = normalize_arch(std::env::consts::ARCH);
        platform
    }

    /// Set the compiler family.
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Set the architecture.
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Set the build type.
    pub fn with_build_type(mut self, build_type: impl Into<String>) -> Self {
        self.build_type = build_type.into();
        self
    }

    /// Set the C++ standard level.
    pub fn with_cppstd(mut self, cppstd: impl Into<String>) -> Self {
        self.cppstd = Some(cppstd.into());
        self
    }

    /// Read one of the testable fields.
    pub fn field(&self, field: PlatformField) -> &str {
        match field {
            PlatformField::Os => &self.os,
            PlatformField::Compiler => &self.compiler,
            PlatformField::Arch => &self.arch,
            PlatformField::BuildType => &self.build_type,
        }
    }
}

impl fmt::Display for PlatformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.os, self.arch, self.compiler, self.build_type
        )?;
        if let Some(ref std) = self.cppstd {
            write!(f, " (c++{})", std)?;
        }
        Ok(())
    }
}

/// Map Rust's `std::env::consts::OS` names onto recipe vocabulary.
pub fn normalize_os(os: &str) -> String {
    match os {
        "linux" => "Linux",
        "macos" => "Macos",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        "android" => "Android",
        "ios" => "iOS",
        "emscripten" => "Emscripten",
        other => other,
    }
    .to_string()
}

/// Map Rust's `std::env::consts::ARCH` names onto recipe vocabulary.
pub fn normalize_arch(arch: &str) -> String {
    match arch {
        "aarch64" => "armv8",
        "arm" => "armv7",
        "wasm32" => "wasm",
        other => other,
    }
    .to_string()
}

fn default_compiler(os: &str) -> &'static str {
    match os {
        "Windows" => "msvc",
        "Macos" | "iOS" => "apple-clang",
        "Emscripten" => "emcc",
        _ => "gcc",
    }
}

/// Convert a C++ standard spelling ("17", "gnu20", "98") to a year for
/// ordering. Returns `None` for anything unrecognised.
pub fn cppstd_year(std: &str) -> Option<u32> {
    let digits = std.trim().trim_start_matches("gnu");
    let n: u32 = digits.parse().ok()?;
    match n {
        0..=49 => Some(2000 + n),
        50..=99 => Some(1900 + n),
        1998..=2099 => Some(n),
        _ => None,
    }
}
