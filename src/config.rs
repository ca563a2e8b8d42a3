use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tool::ToolKind;

/// Explicit config file location, overridden by `--config`
pub const CONFIG_ENV: &str = "DEVBOOTSTRAP_CONFIG";

/// Probe timeout override in seconds
pub const PROBE_TIMEOUT_ENV: &str = "DEVBOOTSTRAP_PROBE_TIMEOUT";

/// Top‑level configuration. Every section falls back to platform defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub probe: ProbeSettings,
    pub fetch: FetchSettings,
    pub install: InstallSettings,
    pub build: BuildSettings,
    pub tools: ToolCatalog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub timeout_secs: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub connect_timeout_secs: u64,
    /// Abort when no bytes arrive for this long
    pub inactivity_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            inactivity_timeout_secs: 300,
            user_agent: format!("devbootstrap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    pub process_timeout_secs: u64,
    /// Shell profile holding persistent PATH entries (ignored on Windows)
    pub profile_file: String,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            process_timeout_secs: 2 * 60 * 60,
            profile_file: "~/.profile".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    pub script_name: String,
    pub interpreter: String,
    /// Arguments placed before the script path
    pub interpreter_args: Vec<String>,
    pub root_marker_files: Vec<String>,
    pub root_marker_dirs: Vec<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        let (script_name, interpreter, interpreter_args) = if cfg!(windows) {
            (
                "build.ps1",
                "powershell.exe",
                strings(&["-ExecutionPolicy", "Bypass", "-File"]),
            )
        } else {
            ("build.sh", "sh", Vec::new())
        };

        Self {
            script_name: script_name.to_string(),
            interpreter: interpreter.to_string(),
            interpreter_args,
            root_marker_files: vec!["CMakeLists.txt".to_string()],
            root_marker_dirs: vec![".git".to_string(), "src".to_string(), "include".to_string()],
        }
    }
}

impl BuildSettings {
    /// Extension used to filter the interactive picker, e.g. `ps1`
    pub fn script_extension(&self) -> Option<&str> {
        Path::new(&self.script_name)
            .extension()
            .and_then(|e| e.to_str())
    }
}

/// Per-tool probe and install recipes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCatalog {
    #[serde(default = "default_generator")]
    pub generator: ToolSpec,
    #[serde(default = "default_executor")]
    pub executor: ToolSpec,
    #[serde(default = "default_compiler")]
    pub compiler: ToolSpec,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self {
            generator: default_generator(),
            executor: default_executor(),
            compiler: default_compiler(),
        }
    }
}

impl ToolCatalog {
    pub fn get(&self, kind: ToolKind) -> &ToolSpec {
        match kind {
            ToolKind::Generator => &self.generator,
            ToolKind::Executor => &self.executor,
            ToolKind::Compiler => &self.compiler,
        }
    }
}

/// How to detect and install one tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Display name, e.g. "CMake"
    pub name: String,
    /// Primary executable probed on the search path
    pub command: String,
    #[serde(default = "default_version_args")]
    pub version_args: Vec<String>,
    /// Further executables accepted in place of `command` (gcc → clang)
    #[serde(default)]
    pub alternate_commands: Vec<String>,
    /// Conventional executable locations checked when the search path fails
    #[serde(default)]
    pub fallback_paths: Vec<String>,
    /// Directories whose existence proves an installed toolchain
    #[serde(default)]
    pub marker_dirs: Vec<String>,
    /// Consult the native toolchain registry (Windows only)
    #[serde(default)]
    pub registry_markers: bool,
    #[serde(default)]
    pub install: Option<InstallRecipe>,
}

/// Fetch-and-run recipe for one tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallRecipe {
    pub url: String,
    /// File name of the downloaded artifact inside the job's temp directory
    pub artifact: String,
    pub method: InstallMethod,
    /// Directory appended to the persistent PATH after install
    #[serde(default)]
    pub path_entry: Option<String>,
    #[serde(default)]
    pub fallback_copy: Option<FallbackCopy>,
}

/// How the downloaded artifact is turned into an installed tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallMethod {
    /// Run a vendor installer unattended. Without `program` the artifact
    /// itself is executed. `{artifact}` in `args` is replaced by its path.
    Run {
        #[serde(default)]
        program: Option<String>,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Unpack a zip archive into `destination`, replacing previous content
    ExtractZip { destination: String },
}

/// Copy an installed executable into a directory already on PATH
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackCopy {
    pub source: String,
    pub directory: String,
}

fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn default_generator() -> ToolSpec {
            ToolSpec {
                name: "CMake".to_string(),
                command: "cmake".to_string(),
                version_args: default_version_args(),
                alternate_commands: Vec::new(),
                fallback_paths: strings(&[
                    r"C:\Program Files\CMake\bin\cmake.exe",
                    r"C:\Program Files (x86)\CMake\bin\cmake.exe",
                ]),
                marker_dirs: Vec::new(),
                registry_markers: false,
                install: Some(InstallRecipe {
                    url: "https://github.com/Kitware/CMake/releases/download/v3.27.7/cmake-3.27.7-windows-x86_64.msi".to_string(),
                    artifact: "cmake-installer.msi".to_string(),
                    method: InstallMethod::Run {
                        program: Some("msiexec".to_string()),
                        args: strings(&["/i", "{artifact}", "/quiet", "ADD_CMAKE_TO_PATH=System"]),
                    },
                    path_entry: None,
                    fallback_copy: None,
                }),
            }
        }

        fn default_executor() -> ToolSpec {
            ToolSpec {
                name: "Ninja".to_string(),
                command: "ninja".to_string(),
                version_args: default_version_args(),
                alternate_commands: Vec::new(),
                fallback_paths: strings(&[
                    r"C:\ninja\ninja.exe",
                    r"{local_data}\Microsoft\WindowsApps\ninja.exe",
                ]),
                marker_dirs: Vec::new(),
                registry_markers: false,
                install: Some(InstallRecipe {
                    url: "https://github.com/ninja-build/ninja/releases/download/v1.11.1/ninja-win.zip".to_string(),
                    artifact: "ninja.zip".to_string(),
                    method: InstallMethod::ExtractZip {
                        destination: r"C:\ninja".to_string(),
                    },
                    path_entry: Some(r"C:\ninja".to_string()),
                    fallback_copy: Some(FallbackCopy {
                        source: r"C:\ninja\ninja.exe".to_string(),
                        directory: r"{local_data}\Microsoft\WindowsApps".to_string(),
                    }),
                }),
            }
        }

        fn default_compiler() -> ToolSpec {
            ToolSpec {
                name: "C++ Build Tools".to_string(),
                command: "gcc".to_string(),
                version_args: default_version_args(),
                alternate_commands: strings(&["clang"]),
                fallback_paths: Vec::new(),
                marker_dirs: strings(&[
                    r"C:\Program Files (x86)\Microsoft Visual Studio\2019\BuildTools",
                    r"C:\Program Files (x86)\Microsoft Visual Studio\2022\BuildTools",
                    r"C:\Program Files\Microsoft Visual Studio\2019\BuildTools",
                    r"C:\Program Files\Microsoft Visual Studio\2022\BuildTools",
                ]),
                registry_markers: true,
                install: Some(InstallRecipe {
                    url: "https://aka.ms/vs/17/release/vs_buildtools.exe".to_string(),
                    artifact: "vs_buildtools.exe".to_string(),
                    method: InstallMethod::Run {
                        program: None,
                        args: strings(&[
                            "--quiet",
                            "--wait",
                            "--add",
                            "Microsoft.VisualStudio.Workload.VCTools",
                            "--includeRecommended",
                        ]),
                    },
                    path_entry: None,
                    fallback_copy: None,
                }),
            }
        }
    } else {
        /// The default vendor artifacts are x86_64 Linux builds. Other targets
        /// get no recipe and report "no installer configured" when asked.
        fn prebuilt(recipe: InstallRecipe) -> Option<InstallRecipe> {
            match (std::env::consts::OS, std::env::consts::ARCH) {
                ("linux", "x86_64") => Some(recipe),
                (os, arch) => {
                    log::debug!("No prebuilt {} for {os} {arch}", recipe.artifact);
                    None
                }
            }
        }

        fn default_generator() -> ToolSpec {
            ToolSpec {
                name: "CMake".to_string(),
                command: "cmake".to_string(),
                version_args: default_version_args(),
                alternate_commands: Vec::new(),
                fallback_paths: strings(&[
                    "~/.local/bin/cmake",
                    "/usr/local/bin/cmake",
                    "/opt/homebrew/bin/cmake",
                ]),
                marker_dirs: Vec::new(),
                registry_markers: false,
                install: prebuilt(InstallRecipe {
                    url: "https://github.com/Kitware/CMake/releases/download/v3.27.7/cmake-3.27.7-linux-x86_64.sh".to_string(),
                    artifact: "cmake-installer.sh".to_string(),
                    method: InstallMethod::Run {
                        program: Some("sh".to_string()),
                        args: strings(&[
                            "{artifact}",
                            "--skip-license",
                            "--exclude-subdir",
                            "--prefix={home}/.local",
                        ]),
                    },
                    path_entry: Some("~/.local/bin".to_string()),
                    fallback_copy: None,
                }),
            }
        }

        fn default_executor() -> ToolSpec {
            ToolSpec {
                name: "Ninja".to_string(),
                command: "ninja".to_string(),
                version_args: default_version_args(),
                alternate_commands: Vec::new(),
                fallback_paths: strings(&[
                    "~/.local/bin/ninja",
                    "~/.local/share/devbootstrap/ninja/ninja",
                    "/usr/local/bin/ninja",
                ]),
                marker_dirs: Vec::new(),
                registry_markers: false,
                install: prebuilt(InstallRecipe {
                    url: "https://github.com/ninja-build/ninja/releases/download/v1.11.1/ninja-linux.zip".to_string(),
                    artifact: "ninja.zip".to_string(),
                    method: InstallMethod::ExtractZip {
                        destination: "~/.local/share/devbootstrap/ninja".to_string(),
                    },
                    path_entry: Some("~/.local/share/devbootstrap/ninja".to_string()),
                    fallback_copy: Some(FallbackCopy {
                        source: "~/.local/share/devbootstrap/ninja/ninja".to_string(),
                        directory: "~/.local/bin".to_string(),
                    }),
                }),
            }
        }

        fn default_compiler() -> ToolSpec {
            ToolSpec {
                name: "C/C++ compiler".to_string(),
                command: "gcc".to_string(),
                version_args: default_version_args(),
                alternate_commands: strings(&["clang"]),
                fallback_paths: Vec::new(),
                marker_dirs: strings(&[
                    "~/.local/opt/clang/bin",
                    "/Library/Developer/CommandLineTools/usr/bin",
                ]),
                registry_markers: false,
                install: prebuilt(InstallRecipe {
                    url: "https://github.com/llvm/llvm-project/releases/download/llvmorg-17.0.6/clang+llvm-17.0.6-x86_64-linux-gnu-ubuntu-22.04.tar.xz".to_string(),
                    artifact: "clang.tar.xz".to_string(),
                    method: InstallMethod::Run {
                        program: Some("sh".to_string()),
                        args: strings(&[
                            "-c",
                            "mkdir -p \"$1\" && tar -xJf \"$0\" -C \"$1\" --strip-components=1",
                            "{artifact}",
                            "{home}/.local/opt/clang",
                        ]),
                    },
                    path_entry: Some("~/.local/opt/clang/bin".to_string()),
                    fallback_copy: None,
                }),
            }
        }
    }
}

/// Expand `~`, `{home}` and `{local_data}` in a configured path or argument.
/// Unknown placeholders are left untouched.
pub fn expand(raw: &str) -> String {
    let mut out = raw.to_string();

    if let Some(home) = dirs::home_dir() {
        let home = home.to_string_lossy();
        if out == "~" {
            out = home.to_string();
        } else if let Some(rest) = out.strip_prefix("~/") {
            out = format!("{home}/{rest}");
        }
        out = out.replace("{home}", &home);
    }
    if let Some(local) = dirs::data_local_dir() {
        out = out.replace("{local_data}", &local.to_string_lossy());
    }

    out
}

pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(expand(raw))
}

impl Config {
    /// `dirs::config_dir()/devbootstrap/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("devbootstrap").join("config.toml"))
    }

    /// Resolve and load configuration.
    ///
    /// Order: explicit path, `$DEVBOOTSTRAP_CONFIG`, the default path if it
    /// exists, then built-in defaults. Returns the file that was used.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let chosen = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| Self::default_path().filter(|p| p.is_file()));

        let mut config = match &chosen {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();

        Ok((config, chosen))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(secs) = std::env::var(PROBE_TIMEOUT_ENV)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            log::debug!("Probe timeout overridden by {PROBE_TIMEOUT_ENV}: {secs}s");
            self.probe.timeout_secs = secs;
        }
    }
}
