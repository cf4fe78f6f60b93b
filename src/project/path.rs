//! Logical template paths.
//!
//! Logical paths are `/`-separated, case-sensitive and rooted at the
//! project root (`/Views/Home/Index.cshtml`). A `~/` prefix means
//! "application root" and is equivalent to `/`.

use std::path::{Component, Path};

/// Strip a single leading `~` from a `~/`-prefixed path.
///
/// This is the only transformation applied to cache keys.
#[inline]
pub fn strip_app_root(path: &str) -> &str {
    if path.starts_with("~/") {
        &path[1..]
    } else {
        path
    }
}

/// Normalize a logical path.
///
/// Converts backslashes, collapses duplicate separators and `.` segments,
/// resolves `..` and guarantees a leading `/`. Returns `None` when `..`
/// would climb above the project root.
pub fn normalize(path: &str) -> Option<String> {
    let path = strip_app_root(path);
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            segment => segments.push(segment),
        }
    }

    Some(format!("/{}", segments.join("/")))
}

/// Parent directory of a normalized logical path (`None` for the root).
pub fn parent_dir(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(index) => Some(&trimmed[..index]),
        None => None,
    }
}

/// Final segment of a logical path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Join a directory and a file name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Candidate import paths for `path`, root-most directory first.
///
/// ```text
/// hierarchical_paths("/Views/Home/Index.cshtml", "_ViewImports.cshtml")
///   → /_ViewImports.cshtml
///   → /Views/_ViewImports.cshtml
///   → /Views/Home/_ViewImports.cshtml
/// ```
///
/// The template itself is skipped when it is an import file.
pub fn hierarchical_paths(path: &str, file_name: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut dir = parent_dir(path);

    while let Some(current) = dir {
        let candidate = join(current, file_name);
        if candidate != path {
            paths.push(candidate);
        }
        dir = parent_dir(current);
    }

    paths.reverse();
    paths
}

/// Map a physical path under `root` to its logical path.
pub fn to_logical(root: &Path, physical: &Path) -> Option<String> {
    let relative = physical.strip_prefix(root).ok()?;
    let mut logical = String::new();

    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                logical.push('/');
                logical.push_str(segment.to_str()?);
            }
            Component::CurDir => {}
            _ => return None,
        }
    }

    if logical.is_empty() {
        logical.push('/');
    }
    Some(logical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_app_root() {
        assert_eq!(strip_app_root("~/Foo/Bar.ext"), "/Foo/Bar.ext");
        assert_eq!(strip_app_root("/Foo/Bar.ext"), "/Foo/Bar.ext");
        // Only `~/` is recognised
        assert_eq!(strip_app_root("~Foo"), "~Foo");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Views/Home/Index.cshtml").unwrap(), "/Views/Home/Index.cshtml");
        assert_eq!(normalize("~/Foo/Bar.ext").unwrap(), "/Foo/Bar.ext");
        assert_eq!(normalize("/Views//Home/./x.cshtml").unwrap(), "/Views/Home/x.cshtml");
        assert_eq!(normalize("\\Views\\Shared\\_Layout.cshtml").unwrap(), "/Views/Shared/_Layout.cshtml");
        assert_eq!(normalize("/Views/Home/../Shared/a.cshtml").unwrap(), "/Views/Shared/a.cshtml");
        assert_eq!(normalize("/").unwrap(), "/");
    }

    #[test]
    fn test_normalize_rejects_escape() {
        assert!(normalize("/../secret.txt").is_none());
        assert!(normalize("/Views/../../x").is_none());
    }

    #[test]
    fn test_normalize_is_case_sensitive() {
        assert_ne!(normalize("/views/a.cshtml"), normalize("/Views/a.cshtml"));
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("/Views/Home/Index.cshtml"), Some("/Views/Home"));
        assert_eq!(parent_dir("/Views"), Some("/"));
        assert_eq!(parent_dir("/Index.cshtml"), Some("/"));
        assert_eq!(parent_dir("/"), None);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/Views/Home/Index.cshtml"), "Index.cshtml");
        assert_eq!(file_name("/a"), "a");
    }

    #[test]
    fn test_hierarchical_paths_root_first() {
        let paths = hierarchical_paths("/Views/Home/Index.cshtml", "_ViewImports.cshtml");
        assert_eq!(
            paths,
            vec![
                "/_ViewImports.cshtml",
                "/Views/_ViewImports.cshtml",
                "/Views/Home/_ViewImports.cshtml",
            ]
        );
    }

    #[test]
    fn test_hierarchical_paths_at_root() {
        let paths = hierarchical_paths("/Index.cshtml", "_ViewImports.cshtml");
        assert_eq!(paths, vec!["/_ViewImports.cshtml"]);
    }

    #[test]
    fn test_hierarchical_paths_skips_self() {
        let paths = hierarchical_paths("/Views/_ViewImports.cshtml", "_ViewImports.cshtml");
        assert_eq!(paths, vec!["/_ViewImports.cshtml"]);
    }

    #[test]
    fn test_to_logical() {
        let root = Path::new("/srv/app");
        assert_eq!(
            to_logical(root, Path::new("/srv/app/Views/Index.cshtml")).as_deref(),
            Some("/Views/Index.cshtml")
        );
        assert_eq!(to_logical(root, Path::new("/srv/app")).as_deref(), Some("/"));
        assert_eq!(to_logical(root, Path::new("/srv/other/a.cshtml")), None);
    }
}
