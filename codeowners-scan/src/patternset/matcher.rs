use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use super::nfa::{Nfa, StateId};

/// Matches a path against a set of patterns. Includes a thread-safe transition
/// cache to speed up subsequent lookups. Created using a [`super::Builder`].
#[derive(Clone)]
pub struct Matcher {
    nfa: Nfa,
    transition_cache: Arc<RwLock<HashMap<String, Vec<StateId>>>>,
}

impl Matcher {
    pub(crate) fn new(nfa: Nfa) -> Matcher {
        Self {
            nfa,
            transition_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Match a repository-relative path (using `/` separators) against the
    /// patterns in the set. Each pattern is tested in isolation, so every
    /// matching pattern is returned, not just the last one. The returned ids
    /// are sorted and match the order in which patterns were added.
    pub fn matching_patterns(&self, path: &str) -> Vec<usize> {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return Vec::new();
        }

        let components = path.split('/').collect::<Vec<_>>();
        let final_states = self.next_states(&components, self.nfa.initial_states());

        let mut matches = Vec::new();
        for state_id in final_states {
            matches.extend(
                self.nfa
                    .state(state_id)
                    .terminal_for_patterns
                    .iter()
                    .copied(),
            );
        }
        matches.sort_unstable();
        matches.dedup();
        matches
    }

    /// Whether any pattern in the set matches the path.
    pub fn is_match(&self, path: &str) -> bool {
        !self.matching_patterns(path).is_empty()
    }

    fn next_states(&self, path_segments: &[&str], start_states: Vec<StateId>) -> Vec<StateId> {
        // Base case - no more path segments to match
        let Some((segment, subpath_segments)) = path_segments.split_last() else {
            return start_states;
        };

        // Get the states for the current path's prefix, checking the cache first
        let subpath = subpath_segments.join("/");
        let states = match self.get_cached_states_for(&subpath) {
            Some(states) => states,
            None => {
                let states = self.next_states(subpath_segments, start_states);
                self.set_cached_states_for(subpath, states.clone());
                states
            }
        };

        // Follow the matching transitions out of the prefix states
        let mut next_states = Vec::new();
        for state_id in states {
            self.nfa
                .transitions_from(state_id)
                .filter(|transition| transition.is_match(segment))
                .for_each(|transition| next_states.push(transition.target));
        }

        // Automatically traverse epsilon edges
        let epsilon_nodes = next_states
            .iter()
            .flat_map(|&state_id| self.nfa.epsilon_transitions_from(state_id))
            .collect::<Vec<_>>();
        next_states.extend(epsilon_nodes);
        next_states.sort_unstable();
        next_states.dedup();
        next_states
    }

    fn get_cached_states_for(&self, path: &str) -> Option<Vec<StateId>> {
        self.transition_cache
            .read()
            .expect("valid lock")
            .get(path)
            .cloned()
    }

    fn set_cached_states_for(&self, path: String, states: Vec<StateId>) {
        self.transition_cache
            .write()
            .expect("valid lock")
            .insert(path, states);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::patternset::Builder;

    use super::*;

    #[test]
    fn test_literals() {
        let patterns = [
            "/src/parser/mod.rs",
            "/lib/parser/parse.rs",
            "/bin/parser/mod.rs",
            "mod.rs",
        ];
        let expected = &[
            ("src/parser/mod.rs", vec![0, 3]),
            ("lib/parser/parse.rs", vec![1]),
            ("lib/parser/mod.rs", vec![3]),
            ("lib/parser/util.rs", vec![]),
            ("src/lexer/mod.rs", vec![3]),
            ("src/parser/mod.go", vec![]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_prefixes() {
        let patterns = ["src", "src/parser", "src/parser/"];
        let expected = &[
            ("src/parser/mod.rs", vec![0, 1, 2]),
            ("src/parser", vec![0, 1]),
            ("foo/src/parser/mod.rs", vec![0]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_anchoring() {
        let patterns = ["/script/foo", "script/foo", "/foo", "foo"];
        let expected = &[
            ("script/foo", vec![0, 1, 3]),
            ("foo", vec![2, 3]),
            ("bar/script/foo", vec![3]),
            ("/script/foo", vec![0, 1, 3]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_wildcards() {
        let patterns = [
            "src/*/mod.rs",
            "src/parser/*",
            "*/*/mod.rs",
            "src/parser/*/",
        ];
        let expected = &[
            ("src/parser/mod.rs", vec![0, 1, 2]),
            ("src/lexer/mod.rs", vec![0, 2]),
            ("src/parser/parser.rs", vec![1]),
            ("test/lexer/mod.rs", vec![2]),
            ("parser/mod.rs", vec![]),
            ("src/parser/subdir/thing.rs", vec![3]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_trailing_wildcards() {
        let patterns = ["/mammals/*", "/fish/*/"];
        let expected = &[
            ("mammals", vec![]),
            ("mammals/equus", vec![0]),
            ("mammals/equus/zebra", vec![]),
            ("fish", vec![]),
            ("fish/gaddus", vec![]),
            ("fish/gaddus/cod", vec![1]),
            ("fish/gaddus/roe/cod", vec![1]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_complex_patterns() {
        let patterns = ["/src/parser/*.rs", "/src/p*/*.*"];
        let expected = &[
            ("src/parser/mod.rs", vec![0, 1]),
            ("src/p/lib.go", vec![1]),
            ("src/parser/README", vec![]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_leading_double_stars() {
        let patterns = ["/**/baz", "/**/bar/baz"];
        let expected = &[
            ("x/y/baz", vec![0]),
            ("x/bar/baz", vec![0, 1]),
            ("baz", vec![0]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_infix_double_stars() {
        let patterns = ["/foo/**/qux", "/foo/qux"];
        let expected = &[
            ("foo/qux", vec![0, 1]),
            ("foo/bar/qux", vec![0]),
            ("foo/bar/baz/qux", vec![0]),
            ("foo/bar", vec![]),
            ("bar/qux", vec![]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_trailing_double_stars() {
        let patterns = ["foo/**", "**"];
        let expected = &[
            ("foo", vec![1]),
            ("bar", vec![1]),
            ("foo/bar", vec![0, 1]),
            ("x/y/baz", vec![1]),
            ("foo/bar/baz", vec![0, 1]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_escape_sequences() {
        let patterns = ["f\\*o", "a*b\\??", "\\*qux", "bar\\*", "\\*"];
        let expected = &[
            ("f*o", vec![0]),
            ("foo", vec![]),
            ("axb?!", vec![1]),
            ("axb?", vec![]),
            ("axbc!", vec![]),
            ("*qux", vec![2]),
            ("xqux", vec![]),
            ("bar*", vec![3]),
            ("bar", vec![]),
            ("*", vec![4]),
            ("a", vec![]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_star_matches_everything() {
        let patterns = ["*"];
        let expected = &[
            ("README.md", vec![0]),
            ("src/api.go", vec![0]),
            ("a/b/c/d.txt", vec![0]),
            ("", vec![]),
        ];

        assert_all_matches(expected, &patterns);
    }

    #[test]
    fn test_repeated_lookups_use_cache() {
        let matcher = matcher_for_patterns(&["/src/**/*.go"]);
        for _ in 0..3 {
            assert_eq!(matcher.matching_patterns("src/a/b/api.go"), vec![0]);
            assert_eq!(matcher.matching_patterns("src/a/b/api.rs"), Vec::<usize>::new());
        }
        assert!(matcher.clone().is_match("src/a/c/main.go"));
    }

    fn assert_all_matches(expected: &[(&str, Vec<usize>)], patterns: &[&str]) {
        let matcher = matcher_for_patterns(patterns);
        for (path, expected) in expected {
            assert_eq!(
                HashSet::<usize>::from_iter(matcher.matching_patterns(path)),
                HashSet::from_iter(expected.iter().copied()),
                "expected {:?} to match {:?}",
                path,
                expected.iter().map(|&i| patterns[i]).collect::<Vec<_>>(),
            );
        }
    }

    fn matcher_for_patterns(patterns: &[&str]) -> Matcher {
        let mut builder = Builder::new();
        for pattern in patterns {
            builder.add(pattern).unwrap();
        }
        builder.build()
    }
}
