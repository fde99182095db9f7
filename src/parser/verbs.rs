//! Command vocabulary: verbs, aliases, usage lines and suggestions.

use serde::Serialize;

/// A recognized command verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verb {
    AddNode,
    AddEdge,
    RemoveNode,
    RemoveEdge,
    SetAttribute,
    Render,
    Reset,
    Undo,
    Help,
}

impl Verb {
    /// Every verb, in help order.
    pub const ALL: [Verb; 9] = [
        Self::AddNode,
        Self::AddEdge,
        Self::RemoveNode,
        Self::RemoveEdge,
        Self::SetAttribute,
        Self::Render,
        Self::Reset,
        Self::Undo,
        Self::Help,
    ];

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddNode => "add-node",
            Self::AddEdge => "add-edge",
            Self::RemoveNode => "remove-node",
            Self::RemoveEdge => "remove-edge",
            Self::SetAttribute => "set-attribute",
            Self::Render => "render",
            Self::Reset => "reset",
            Self::Undo => "undo",
            Self::Help => "help",
        }
    }

    /// Accepted spellings besides the canonical name.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::AddNode => &["node", "add"],
            Self::AddEdge => &["edge", "link", "connect"],
            Self::RemoveNode => &["rm-node", "delete-node"],
            Self::RemoveEdge => &["rm-edge", "delete-edge", "unlink"],
            Self::SetAttribute => &["set", "attr"],
            Self::Render => &["draw", "show"],
            Self::Reset => &["clear"],
            Self::Undo => &[],
            Self::Help => &["?"],
        }
    }

    /// Parse a verb from its name or an alias, case-insensitively.
    /// Underscores are accepted in place of dashes.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|verb| verb.name() == name || verb.aliases().contains(&name.as_str()))
    }

    /// Argument grammar shown in help and arity errors.
    pub fn usage(&self) -> &'static str {
        match self {
            Self::AddNode => "add-node <id> [label] [key=value ...]",
            Self::AddEdge => {
                "add-edge <src> <dst> [label] [key=value ...] [--undirected] [--unique]"
            }
            Self::RemoveNode => "remove-node <id>",
            Self::RemoveEdge => "remove-edge <src> <dst> [label]",
            Self::SetAttribute => {
                "set-attribute graph <key> <value> | node <id> <key> <value> | edge <src> <dst> <key> <value>"
            }
            Self::Render => "render [png|svg|pdf]",
            Self::Reset => "reset",
            Self::Undo => "undo",
            Self::Help => "help",
        }
    }

    /// One-line description.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::AddNode => "Create a node, or relabel an existing one",
            Self::AddEdge => "Connect two existing nodes",
            Self::RemoveNode => "Delete a node and every edge touching it",
            Self::RemoveEdge => "Delete the edges between two nodes",
            Self::SetAttribute => "Set a layout attribute (shape, color, rankdir, ...)",
            Self::Render => "Draw the diagram",
            Self::Reset => "Start over with an empty diagram",
            Self::Undo => "Revert the last change",
            Self::Help => "Show this list",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Help listing for the whole vocabulary.
pub fn help_text() -> String {
    let mut out = String::from("Commands:\n");
    for verb in Verb::ALL {
        out.push_str(&format!("  {}\n      {}\n", verb.usage(), verb.summary()));
    }
    out.push_str("Quote labels that contain spaces: add-edge A B \"depends on\"");
    out
}

/// Suggest the verb closest to an unrecognized word, if any is within
/// edit distance 2 of its name or an alias.
///
/// A candidate only counts when fewer edits than its own length separate
/// it from the input, so short aliases like `?` never match arbitrary words.
pub fn suggest(input: &str) -> Option<Verb> {
    let input = input.to_lowercase();
    if input.is_empty() {
        return None;
    }
    let mut best: Option<(Verb, usize)> = None;

    for verb in Verb::ALL {
        let names = std::iter::once(verb.name()).chain(verb.aliases().iter().copied());
        for name in names {
            let dist = levenshtein(&input, name);
            if dist <= 2 && dist < name.chars().count() && best.map_or(true, |(_, d)| dist < d) {
                best = Some((verb, dist));
            }
        }
    }

    best.map(|(verb, _)| verb)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
