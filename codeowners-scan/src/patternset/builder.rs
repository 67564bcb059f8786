use super::{
    nfa::{Nfa, StateId, Transition, TransitionCondition},
    Matcher, PatternError,
};

/// Builder for a patternset [`Matcher`]. Calling [`Builder::build`] will
/// consume the builder.
#[derive(Clone, Default)]
pub struct Builder {
    nfa: Nfa,
    next_pattern_id: usize,
}

enum Segment<'p> {
    DoubleStar,
    Glob(&'p str, TransitionCondition),
}

impl Builder {
    /// Create a new `Builder`.
    pub fn new() -> Self {
        Self {
            nfa: Nfa::new(),
            next_pattern_id: 0,
        }
    }

    /// Build the `Matcher` from the patterns added to the builder. This will
    /// consume the builder.
    pub fn build(self) -> Matcher {
        Matcher::new(self.nfa)
    }

    /// Number of patterns successfully added so far.
    pub fn len(&self) -> usize {
        self.next_pattern_id
    }

    pub fn is_empty(&self) -> bool {
        self.next_pattern_id == 0
    }

    /// Add a pattern to the builder, returning its id. Ids are assigned
    /// sequentially to accepted patterns only; a rejected pattern leaves the
    /// builder untouched.
    pub fn add(&mut self, pattern: &str) -> Result<usize, PatternError> {
        validate(pattern)?;

        // Remove the leading slash if present. It forces left-anchoring so we
        // need to remember whether it was present or not.
        let (pattern, leading_slash) = match pattern.strip_prefix('/') {
            Some(pattern) => (pattern, true),
            None => (pattern, false),
        };

        // We only match files (as opposed to directories), so the trailing slash
        // has no effect except adding an extra empty path component at the end.
        let (pattern, trailing_slash) = match pattern.strip_suffix('/') {
            Some(pattern) => (pattern, true),
            None => (pattern, false),
        };
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        // Compile every segment before touching the NFA.
        let segments = pattern
            .split('/')
            .map(|segment| match segment {
                "**" => Ok(Segment::DoubleStar),
                _ => TransitionCondition::new(segment).map(|c| Segment::Glob(segment, c)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let last_segment = pattern.rsplit('/').next().unwrap_or_default();

        let pattern_id = self.next_pattern_id;
        self.next_pattern_id += 1;

        // All patterns are left-anchored unless they're a single component with
        // no leading slash (but a trailing slash is permitted).
        let mut start_state_id = Nfa::START_STATE;
        if !leading_slash && segments.len() == 1 {
            start_state_id = self.add_epsilon_transition(Nfa::START_STATE);
        }

        let mut end_state_id =
            segments
                .into_iter()
                .fold(start_state_id, |from_id, segment| match segment {
                    Segment::DoubleStar => self.add_epsilon_transition(from_id),
                    Segment::Glob(glob, condition) => self.add_transition(from_id, glob, condition),
                });

        // A trailing slash or /** matches everything under the directory, but
        // not the directory itself, so we need one more segment.
        if trailing_slash || last_segment == "**" {
            end_state_id = self.add_transition(end_state_id, "*", TransitionCondition::Unconditional);
        }

        // Patterns are prefix-matched, which effectively means they end in a /**.
        // The exception is a trailing lone wildcard, which only matches direct
        // children.
        if trailing_slash || last_segment != "*" {
            end_state_id = self.add_epsilon_transition(end_state_id);
        }

        self.nfa
            .state_mut(end_state_id)
            .mark_as_terminal(pattern_id);

        Ok(pattern_id)
    }

    // Add a regular (non-epsilon) transition from a given state via the
    // provided path segment, reusing an identical existing transition.
    fn add_transition(
        &mut self,
        from_id: StateId,
        segment: &str,
        condition: TransitionCondition,
    ) -> StateId {
        let existing_transition = self
            .nfa
            .transitions_from(from_id)
            .find(|t| t.path_segment == segment && t.target != from_id);
        if let Some(t) = existing_transition {
            t.target
        } else {
            let state_id = self.nfa.add_state();
            self.nfa
                .state_mut(from_id)
                .add_transition(Transition::new(segment.to_owned(), condition, state_id));
            state_id
        }
    }

    // Add an epsilon transition from a given state to a new state. If an epsilon transition
    // already exists, return the id of its target.
    fn add_epsilon_transition(&mut self, from_id: StateId) -> StateId {
        // Consecutive double stars collapse into one: a double star state
        // already loops on every segment.
        let has_existing_transition = self
            .nfa
            .transitions_from(from_id)
            .any(|t| t.path_segment == "*" && t.target == from_id);
        if has_existing_transition {
            return from_id;
        }

        match self.nfa.state(from_id).epsilon_transition {
            Some(to_id) => to_id,
            None => {
                let state_id = self.nfa.add_state();
                self.nfa.state_mut(state_id).add_transition(Transition::new(
                    "*".to_owned(),
                    TransitionCondition::Unconditional,
                    state_id,
                ));
                self.nfa.state_mut(from_id).epsilon_transition = Some(state_id);
                state_id
            }
        }
    }
}

// Reject syntax that the CODEOWNERS dialect does not support.
fn validate(pattern: &str) -> Result<(), PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }
    if pattern.starts_with('!') {
        return Err(PatternError::Negation);
    }

    let mut escaped = false;
    for c in pattern.chars() {
        match c {
            '\0' => return Err(PatternError::NullByte),
            '\\' if !escaped => {
                escaped = true;
                continue;
            }
            '[' | ']' if !escaped => return Err(PatternError::CharacterRange),
            _ => {}
        }
        escaped = false;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nfa_builder() {
        let mut builder = Builder::new();

        builder.add("/foo/*").unwrap();
        assert_eq!(
            transitions_for(&builder.nfa),
            vec![(0, "foo".to_owned(), 1), (1, "*".to_owned(), 2)]
        );

        builder.add("/foo/bar").unwrap();
        assert_eq!(
            transitions_for(&builder.nfa),
            vec![
                (0, "foo".to_owned(), 1),
                (1, "*".to_owned(), 2),
                (1, "bar".to_owned(), 3),
                (4, "*".to_owned(), 4)
            ]
        );
    }

    #[test]
    fn test_pattern_ids() {
        let mut builder = Builder::new();
        assert_eq!(builder.add("src/**"), Ok(0));
        assert_eq!(builder.add("!src/legacy.go"), Err(PatternError::Negation));
        assert_eq!(builder.add("*.go"), Ok(1));
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn test_rejected_patterns() {
        let examples = [
            ("", PatternError::Empty),
            ("/", PatternError::Empty),
            ("!foo", PatternError::Negation),
            ("f\0oo", PatternError::NullByte),
            ("src/[ab].go", PatternError::CharacterRange),
            ("docs]", PatternError::CharacterRange),
        ];

        for (pattern, expected) in examples {
            let mut builder = Builder::new();
            assert_eq!(builder.add(pattern), Err(expected), "pattern {:?}", pattern);
            assert_eq!(transitions_for(&builder.nfa), vec![]);
        }
    }

    #[test]
    fn test_escaped_brackets_are_accepted() {
        let mut builder = Builder::new();
        assert_eq!(builder.add("src/\\[id\\].go"), Ok(0));
    }

    #[test]
    fn test_double_stars_collapse() {
        let mut single = Builder::new();
        single.add("/a/**/b").unwrap();
        let mut double = Builder::new();
        double.add("/a/**/**/b").unwrap();
        assert_eq!(transitions_for(&single.nfa), transitions_for(&double.nfa));
    }

    fn transitions_for(nfa: &Nfa) -> Vec<(usize, String, usize)> {
        nfa.states_iter()
            .enumerate()
            .flat_map(|(idx, s)| {
                s.transitions
                    .iter()
                    .map(|t| (idx, t.path_segment.clone(), t.target.0 as usize))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
