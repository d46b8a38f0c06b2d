use std::collections::{HashMap, HashSet};

/// Statistics of an [`optimize_patterns`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    /// Domains whose sub-paths were collapsed into `domain/*`
    pub wildcarded: usize,
}

/// Collapse raw patterns per leading domain segment.
///
/// A domain with more than one distinct sub-path becomes `domain/*`; a domain
/// with exactly one becomes `domain/path`, so a bare domain gains a trailing
/// slash. Output order follows
/// the first appearance of each domain.
pub fn optimize_patterns(patterns: &mut Vec<String>) -> OptimizeStats {
    let before = patterns.len();

    let (optimized, wildcarded) = {
        let mut groups: Vec<DomainGroup<'_>> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for pattern in patterns.iter() {
            let (domain, path) = split_pattern(pattern);
            let slot = *index.entry(domain).or_insert_with(|| {
                groups.push(DomainGroup {
                    domain,
                    first_path: path,
                    paths: HashSet::new(),
                });
                groups.len() - 1
            });
            groups[slot].paths.insert(path);
        }

        let mut wildcarded = 0usize;
        let optimized: Vec<String> = groups
            .iter()
            .map(|group| {
                if group.paths.len() > 1 {
                    wildcarded += 1;
                    format!("{}/*", group.domain)
                } else {
                    format!("{}/{}", group.domain, group.first_path)
                }
            })
            .collect();
        (optimized, wildcarded)
    };

    *patterns = optimized;

    OptimizeStats {
        before,
        after: patterns.len(),
        wildcarded,
    }
}

struct DomainGroup<'a> {
    domain: &'a str,
    first_path: &'a str,
    paths: HashSet<&'a str>,
}

/// Split at the first `/` into domain and sub-path; no slash means an empty path.
fn split_pattern(pattern: &str) -> (&str, &str) {
    pattern.split_once('/').unwrap_or((pattern, ""))
}
