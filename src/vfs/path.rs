/// Join a request-relative `selection` onto `base` and normalize the result.
///
/// `.` segments and empty segments are dropped, `..` pops one segment. Returns `None`
/// when a `..` would climb above `base`, or when a segment contains a NUL byte.
pub fn join_checked(base: &str, selection: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/') {
        match segment {
            "" | "." => {}
            ".." => { segments.pop(); }
            s => segments.push(s),
        }
    }
    let floor = segments.len();
    for segment in selection.split('/') {
        if segment.contains('\0') {
            return None;
        }
        match segment {
            "" | "." => {}
            ".." => {
                if segments.len() <= floor {
                    return None;
                }
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    Some(format!("/{}", segments.join("/")))
}

/// Last segment of a normalized VFS path, `None` for the root.
pub fn basename(path: &str) -> Option<&str> {
    path.rsplit('/').find(|s| !s.is_empty())
}

pub fn child(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Names a VFS may hand back from `readdir` that cannot be placed in an archive.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_checked() {
        assert_eq!(join_checked("/srv", "/test/dir1"), Some("/srv/test/dir1".to_string()));
        assert_eq!(join_checked("/", ""), Some("/".to_string()));
        assert_eq!(join_checked("/srv/", "a//./b/"), Some("/srv/a/b".to_string()));
        assert_eq!(join_checked("/srv", "a/../b"), Some("/srv/b".to_string()));
    }

    #[test]
    fn test_join_checked_rejects_escape() {
        assert_eq!(join_checked("/srv", ".."), None);
        assert_eq!(join_checked("/srv", "a/../../etc"), None);
        assert_eq!(join_checked("/", "/.."), None);
        assert_eq!(join_checked("/srv", "a\0b"), None);
    }

    #[test]
    fn test_basename_and_child() {
        assert_eq!(basename("/srv/test"), Some("test"));
        assert_eq!(basename("/"), None);
        assert_eq!(child("/", "a"), "/a");
        assert_eq!(child("/a", "b"), "/a/b");
        assert!(is_plain_name("x.txt"));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("a/b"));
    }
}
