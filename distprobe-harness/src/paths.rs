//! Catalog of scratch directory names that exercise path handling in the
//! server start scripts.

use crate::platform::Platform;

/// Names legal on every supported platform.
pub const DEFAULT_PATH_NAMES: &[&str] = &[
    "wildfly spaced",
    "wildfly double  spaced",
    "bi\u{00df}chen-dir",
    "ni\u{00f1}o-dir",
    "wildfly%home",
    "wildfly#home",
    "wildfly$home",
    "wildfly@home",
    "wildfly(home)",
    "wildfly!home",
    "wildfly^home",
    "wildfly=home",
    "wildfly'home",
    "wildfly- (home)",
];

/// Names containing characters Windows reserves (`< > : " / \ | ? *`), plus
/// one that trips console encoding on Windows.
pub const UNIX_ONLY_PATH_NAMES: &[&str] = &[
    "wildfly?home",
    "wildfly\\home",
    "wildfly<home",
    "wildfly>home",
    "wildfly-\u{017d}lut\u{00fd}K\u{016f}\u{0148}",
    "wildfly|path",
];

/// Build the list of directory names to test.
///
/// A non-empty `overrides` list replaces the built-in catalog entirely.
pub fn catalog(platform: Platform, overrides: Option<&[String]>) -> Vec<String> {
    if let Some(names) = overrides
        && !names.is_empty()
    {
        return names.to_vec();
    }

    let mut names: Vec<String> = DEFAULT_PATH_NAMES.iter().map(|s| s.to_string()).collect();
    if !platform.is_windows() {
        names.extend(UNIX_ONLY_PATH_NAMES.iter().map(|s| s.to_string()));
    }
    names
}

/// Split a path-list value (e.g. from an environment variable) on the
/// platform separator, dropping empty entries.
pub fn split_path_list(value: &str, platform: Platform) -> Vec<String> {
    value
        .split(platform.path_list_separator())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
