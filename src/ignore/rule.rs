use bstr::ByteSlice;
use std::fmt::{self, Debug};

/// One pattern compiled from a line of a gitignore-style file.
///
/// The pattern is kept as its `/`-separated segments. A rule is *anchored*
/// when the original pattern contained a non-trailing slash; anchored rules
/// match against the whole path relative to the rule's scope root, while
/// unanchored rules match the basename at any depth below it.
pub struct IgnoreRule {
    segments: Vec<Segment>,
    negated: bool,
    dir_only: bool,
    anchored: bool,
}

enum Segment {
    /// `**`: spans any number of path components, including zero.
    DoubleStar,
    /// A glob over a single component, `*`/`?`/`[...]` never match `/`.
    Glob(Vec<u8>),
}

impl IgnoreRule {
    /// Parses a single line. Returns None for lines carrying no pattern:
    /// blank lines and `#` comments.
    pub fn parse(line: &[u8]) -> Option<IgnoreRule> {
        let mut line = line.strip_suffix(b"\r").unwrap_or(line);

        if line.is_empty() || line[0] == b'#' {
            return None;
        }

        let mut negated = false;
        if line[0] == b'!' {
            negated = true;
            line = &line[1..];
        } else if line.starts_with(b"\\!") || line.starts_with(b"\\#") {
            // An escaped leading '!' or '#' is a literal.
            line = &line[1..];
        }

        // Trailing spaces are ignored unless backslash-escaped.
        while line.ends_with(b" ") && !line.ends_with(b"\\ ") {
            line = &line[..line.len() - 1];
        }

        let mut dir_only = false;
        if let Some(stripped) = line.strip_suffix(b"/") {
            dir_only = true;
            line = stripped;
        }

        let mut anchored = line.contains(&b'/');
        if let Some(stripped) = line.strip_prefix(b"/") {
            anchored = true;
            line = stripped;
        }

        if line.is_empty() {
            return None;
        }

        let segments = line
            .split_str(b"/")
            .map(|segment| {
                if segment == b"**" {
                    Segment::DoubleStar
                } else {
                    Segment::Glob(segment.to_vec())
                }
            })
            .collect();

        Some(IgnoreRule {
            segments,
            negated,
            dir_only,
            anchored,
        })
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_dir_only(&self) -> bool {
        self.dir_only
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Whether this rule matches a candidate path, given as its components
    /// relative to the rule's scope root.
    ///
    /// Exclusion of everything below an excluded directory is not this
    /// rule's business: the diff engine forces that during descent.
    pub fn matches(&self, components: &[&[u8]], is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }

        if self.anchored {
            match_segments(&self.segments, components)
        } else {
            // A single-segment pattern, matched against the basename.
            match (self.segments.first(), components.last()) {
                (Some(Segment::DoubleStar), Some(_)) => true,
                (Some(Segment::Glob(pattern)), Some(name)) => glob_match(pattern, name),
                _ => false,
            }
        }
    }
}

impl Debug for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IgnoreRule")
            .field("negated", &self.negated)
            .field("dir_only", &self.dir_only)
            .field("anchored", &self.anchored)
            .field("segments", &self.segments.len())
            .finish()
    }
}

fn match_segments(segments: &[Segment], components: &[&[u8]]) -> bool {
    match segments.split_first() {
        None => components.is_empty(),
        Some((Segment::DoubleStar, rest)) => {
            if rest.is_empty() {
                // A trailing `**` matches what lies inside the directory,
                // never the directory itself.
                !components.is_empty()
            } else {
                (0..=components.len()).any(|skip| match_segments(rest, &components[skip..]))
            }
        }
        Some((Segment::Glob(pattern), rest)) => match components.split_first() {
            Some((name, tail)) => glob_match(pattern, name) && match_segments(rest, tail),
            None => false,
        },
    }
}

/// Matches a glob over a single path component, with `*`, `?`, `[...]`
/// classes and backslash escapes. Iterative with one backtrack point per
/// `*`, so pathological patterns stay linear-ish.
fn glob_match(pattern: &[u8], name: &[u8]) -> bool {
    let mut p = 0;
    let mut n = 0;
    let mut backtrack: Option<(usize, usize)> = None;

    loop {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    // A run of '*' collapses; within one component '**'
                    // behaves like '*'.
                    while p < pattern.len() && pattern[p] == b'*' {
                        p += 1;
                    }
                    backtrack = Some((p, n));
                    continue;
                }
                b'?' if n < name.len() => {
                    p += 1;
                    n += 1;
                    continue;
                }
                b'[' if n < name.len() => {
                    if let Some((consumed, matched)) = match_class(&pattern[p..], name[n]) {
                        if matched {
                            p += consumed;
                            n += 1;
                            continue;
                        }
                    } else if name[n] == b'[' {
                        // Unterminated class, treat '[' as a literal.
                        p += 1;
                        n += 1;
                        continue;
                    }
                }
                b'\\' if p + 1 < pattern.len() => {
                    if n < name.len() && name[n] == pattern[p + 1] {
                        p += 2;
                        n += 1;
                        continue;
                    }
                }
                c => {
                    if n < name.len() && name[n] == c {
                        p += 1;
                        n += 1;
                        continue;
                    }
                }
            }
        } else if n == name.len() {
            return true;
        }

        // Mismatch. Resume at the most recent '*', letting it swallow one
        // more byte of the name.
        match backtrack {
            Some((bp, bn)) if bn < name.len() => {
                p = bp;
                n = bn + 1;
                backtrack = Some((bp, bn + 1));
            }
            _ => return false,
        }
    }
}

/// Matches a `[...]` character class starting at `pat[0] == b'['` against a
/// single byte. Returns the number of pattern bytes the class occupies and
/// whether it matched, or None if the class is unterminated.
fn match_class(pat: &[u8], c: u8) -> Option<(usize, bool)> {
    let mut i = 1;
    let mut negated = false;
    if i < pat.len() && (pat[i] == b'!' || pat[i] == b'^') {
        negated = true;
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    loop {
        if i >= pat.len() {
            return None;
        }
        let ch = pat[i];
        // ']' terminates the class, except as its very first member.
        if ch == b']' && !first {
            i += 1;
            break;
        }
        first = false;

        let lo = if ch == b'\\' && i + 1 < pat.len() {
            i += 1;
            pat[i]
        } else {
            ch
        };

        if i + 2 < pat.len() && pat[i + 1] == b'-' && pat[i + 2] != b']' {
            let mut hi_i = i + 2;
            let hi = if pat[hi_i] == b'\\' && hi_i + 1 < pat.len() {
                hi_i += 1;
                pat[hi_i]
            } else {
                pat[hi_i]
            };
            if lo <= c && c <= hi {
                matched = true;
            }
            i = hi_i + 1;
        } else {
            if c == lo {
                matched = true;
            }
            i += 1;
        }
    }

    Some((i, if negated { !matched } else { matched }))
}
