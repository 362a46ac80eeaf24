//! Host platform conventions: script suffixes, path-list separators and which
//! characters a directory name may legally contain.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    pub fn script_suffix(&self) -> &'static str {
        match self {
            Platform::Unix => "sh",
            Platform::Windows => "bat",
        }
    }

    /// `standalone` -> `standalone.sh` / `standalone.bat`
    pub fn script_name(&self, prefix: &str) -> String {
        format!("{}.{}", prefix, self.script_suffix())
    }

    pub fn path_list_separator(&self) -> char {
        match self {
            Platform::Unix => ':',
            Platform::Windows => ';',
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Unix => write!(f, "unix"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if matches!(
            lower.as_str(),
            "unix" | "linux" | "macos" | "darwin" | "freebsd" | "openbsd" | "netbsd"
        ) {
            Ok(Platform::Unix)
        } else if lower.starts_with("win") {
            Ok(Platform::Windows)
        } else {
            Err(format!("Unknown platform: {}", s))
        }
    }
}
