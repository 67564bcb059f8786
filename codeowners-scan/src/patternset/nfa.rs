use super::PatternError;

/// A segment-wise NFA. Each transition consumes exactly one path segment;
/// epsilon transitions lead to "double star" states that loop on any segment.
#[derive(Clone, Debug)]
pub(crate) struct Nfa {
    states: Vec<State>,
}

impl Nfa {
    pub(crate) const START_STATE: StateId = StateId(0);

    pub(crate) fn new() -> Self {
        Self {
            states: vec![State::new()],
        }
    }

    pub(crate) fn add_state(&mut self) -> StateId {
        let id = self.states.len();
        self.states.push(State::new());
        StateId(id as u32)
    }

    #[inline]
    pub(crate) fn state(&self, id: StateId) -> &State {
        &self.states[usize::from(id)]
    }

    #[inline]
    pub(crate) fn state_mut(&mut self, id: StateId) -> &mut State {
        &mut self.states[usize::from(id)]
    }

    #[cfg(test)]
    pub(crate) fn states_iter(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub(crate) fn initial_states(&self) -> Vec<StateId> {
        let mut states = vec![Self::START_STATE];
        if let Some(epsilon_node_id) = self.state(Self::START_STATE).epsilon_transition {
            states.push(epsilon_node_id);
        }
        states
    }

    pub(crate) fn transitions_from(&self, state_id: StateId) -> impl Iterator<Item = &Transition> {
        self.state(state_id).transitions.iter()
    }

    pub(crate) fn epsilon_transitions_from(&self, state_id: StateId) -> Option<StateId> {
        self.state(state_id).epsilon_transition
    }
}

impl Default for Nfa {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct StateId(pub(crate) u32);

impl From<StateId> for usize {
    fn from(id: StateId) -> usize {
        id.0 as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) struct State {
    pub(crate) terminal_for_patterns: Vec<usize>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) epsilon_transition: Option<StateId>,
}

impl State {
    fn new() -> Self {
        Self {
            terminal_for_patterns: Vec::new(),
            transitions: Vec::new(),
            epsilon_transition: None,
        }
    }

    pub(crate) fn add_transition(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub(crate) fn mark_as_terminal(&mut self, pattern_id: usize) {
        self.terminal_for_patterns.push(pattern_id);
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Transition {
    pub(crate) path_segment: String,
    condition: TransitionCondition,
    pub(crate) target: StateId,
}

impl Transition {
    pub(crate) fn new(path_segment: String, condition: TransitionCondition, target: StateId) -> Self {
        Self {
            path_segment,
            condition,
            target,
        }
    }

    pub(crate) fn is_match(&self, candidate: &str) -> bool {
        self.condition.is_match(candidate)
    }
}

/// How a single pattern segment is tested against a single path segment.
/// Simple globs avoid the regex engine entirely.
#[derive(Debug, Clone)]
pub(crate) enum TransitionCondition {
    Unconditional,
    Literal(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Regex(regex::Regex),
}

impl TransitionCondition {
    pub(crate) fn new(glob: &str) -> Result<Self, PatternError> {
        if glob == "*" {
            return Ok(Self::Unconditional);
        }
        if glob.contains('\\') {
            return segment_to_regex(glob).map(Self::Regex);
        }

        let leading_star = glob.starts_with('*');
        let trailing_star = glob.len() > 1 && glob.ends_with('*');
        let start = usize::from(leading_star);
        let end = glob.len() - usize::from(trailing_star);
        let inner = &glob[start..end];

        match (leading_star, trailing_star, has_wildcard(inner.chars())) {
            (false, false, false) => Ok(Self::Literal(inner.to_owned())),
            (false, true, false) => Ok(Self::Prefix(inner.to_owned())),
            (true, false, false) => Ok(Self::Suffix(inner.to_owned())),
            (true, true, false) => Ok(Self::Contains(inner.to_owned())),
            _ => segment_to_regex(glob).map(Self::Regex),
        }
    }

    fn is_match(&self, candidate: &str) -> bool {
        match self {
            Self::Unconditional => true,
            Self::Literal(literal) => literal == candidate,
            Self::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => candidate.ends_with(suffix.as_str()),
            Self::Contains(needle) => {
                memchr::memmem::find(candidate.as_bytes(), needle.as_bytes()).is_some()
            }
            Self::Regex(re) => re.is_match(candidate),
        }
    }
}

fn segment_to_regex(segment: &str) -> Result<regex::Regex, PatternError> {
    let mut regex = String::with_capacity(segment.len() + 8);
    regex.push_str(r#"\A"#);
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => regex.push_str(r#"[^/]*"#),
            '?' => regex.push_str(r#"[^/]"#),
            '\\' => {
                let Some(escaped) = chars.next() else {
                    return Err(PatternError::InvalidSegment {
                        segment: segment.to_owned(),
                        reason: "trailing escape character".to_owned(),
                    });
                };
                push_literal(&mut regex, escaped);
            }
            _ => push_literal(&mut regex, c),
        }
    }
    regex.push_str(r#"\z"#);
    regex::Regex::new(&regex).map_err(|err| PatternError::InvalidSegment {
        segment: segment.to_owned(),
        reason: err.to_string(),
    })
}

fn push_literal(regex: &mut String, c: char) {
    if regex_syntax::is_meta_character(c) {
        regex.push('\\');
    }
    regex.push(c);
}

fn has_wildcard(mut char_iter: impl Iterator<Item = char>) -> bool {
    char_iter.any(|c| c == '*' || c == '?')
}
